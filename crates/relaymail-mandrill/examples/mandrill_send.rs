//! Example: send one message through the Mandrill API
//!
//! This example demonstrates how to:
//! 1. Build a Mandrill backend from an API key
//! 2. Send a message with an HTML alternative
//! 3. Read the delivery status report attached to the message
//!
//! ## Prerequisites
//!
//! Set environment variables:
//! ```bash
//! export MANDRILL_API_KEY="your-api-key"
//! export MANDRILL_FROM="from@example.com"
//! export MANDRILL_TO="to@example.com"
//! ```
//!
//! A Mandrill test key accepts the request without delivering anything.
//!
//! ## Running
//!
//! ```bash
//! cargo run --example mandrill_send
//! ```

use relaymail_core::{BackendOptions, EmailMessage, Outcome};
use relaymail_mandrill::MandrillBackend;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key =
        env::var("MANDRILL_API_KEY").expect("MANDRILL_API_KEY environment variable not set");
    let from = env::var("MANDRILL_FROM").expect("MANDRILL_FROM environment variable not set");
    let to = env::var("MANDRILL_TO").expect("MANDRILL_TO environment variable not set");

    println!("relaymail Mandrill example");
    println!("==========================\n");

    let backend = MandrillBackend::new(api_key)?.into_backend(BackendOptions::default());

    let mut message =
        EmailMessage::new("Hello from relaymail", "Plain text content", from, [to]).tag("example");
    message.attach_alternative("<p>HTML content</p>", "text/html");

    let sent = message.send(&backend).await?;
    println!("Sent: {sent}");

    if let Some(status) = message.status() {
        println!("Statuses: {:?}", status.status());
        println!("Message id: {:?}", status.message_id());
        if status.outcome() == Some(Outcome::Queued) {
            println!("Mandrill queued the message; the final status is not known yet.");
        }
        for (email, recipient) in status.recipients() {
            println!("  {email}: {}", recipient.status);
        }
    }

    Ok(())
}
