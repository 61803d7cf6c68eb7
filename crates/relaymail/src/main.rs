//! `relaymail` command-line sender.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use relaymail::{BackendKind, EmailMessage, Error, Settings, connect};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "relaymail")]
#[command(about = "Send one email through the configured backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured backend
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Sender address
    #[arg(long)]
    from: String,

    /// Recipient address (repeatable)
    #[arg(long, required = true)]
    to: Vec<String>,

    /// CC address (repeatable)
    #[arg(long)]
    cc: Vec<String>,

    /// Subject line
    #[arg(short, long, default_value = "")]
    subject: String,

    /// Plain text body
    #[arg(short, long, default_value = "")]
    body: String,

    /// HTML body
    #[arg(long)]
    html: Option<String>,

    /// Tag (repeatable)
    #[arg(long)]
    tag: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relaymail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&path)
        .await
        .with_context(|| format!("loading {}", path.display()))?
        .with_env()?;
    if let Some(kind) = cli.backend {
        settings = settings.with_backend(kind);
    }

    let backend = connect(&settings)?;
    info!(backend = %settings.email_backend, "Sending");

    let mut message = EmailMessage::new(cli.subject, cli.body, cli.from, cli.to);
    message.cc = cli.cc;
    message.tags = cli.tag;
    if let Some(html) = cli.html {
        message.attach_alternative(html, "text/html");
    }

    let result = message.send(backend.as_ref()).await;

    if let Some(status) = message.status() {
        for (email, recipient) in status.recipients() {
            println!(
                "{email}\t{}\t{}",
                recipient.status,
                recipient.message_id.as_deref().unwrap_or("-")
            );
        }
    }

    match result {
        Ok(sent) => {
            println!("sent: {sent}");
            Ok(())
        }
        Err(err @ Error::RecipientsRefused { .. }) => {
            warn!("{err}");
            Err(err.into())
        }
        Err(err) => Err(err).context("send failed"),
    }
}
