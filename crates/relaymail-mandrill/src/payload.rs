//! Mandrill request payloads.
//!
//! Builds the JSON body for `messages/send.json` and
//! `messages/send-template.json` from an [`EmailMessage`].

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use relaymail_core::{Address, EmailMessage, Error, Result, parse_address_list};
use serde::Serialize;
use serde_json::{Map, Value};

/// Endpoint for plain sends.
pub const SEND_PATH: &str = "messages/send.json";
/// Endpoint for sends that render a stored template.
pub const SEND_TEMPLATE_PATH: &str = "messages/send-template.json";

/// Format Mandrill expects for `send_at` (always UTC).
const SEND_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Full request body.
#[derive(Debug, Serialize)]
struct SendRequest {
    key: String,
    message: MessagePayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    send_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_content: Option<Vec<MergeVar>>,
}

/// The `message` object.
#[derive(Debug, Default, Serialize)]
struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<String>,
    from_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_name: Option<String>,
    to: Vec<Recipient>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<FilePart>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<FilePart>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track_opens: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track_clicks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    merge_vars: Vec<RecipientMergeVars>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    global_merge_vars: Vec<MergeVar>,
}

#[derive(Debug, Serialize)]
struct Recipient {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: RecipientKind,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum RecipientKind {
    To,
    Cc,
    Bcc,
}

#[derive(Debug, Serialize)]
struct FilePart {
    #[serde(rename = "type")]
    mimetype: String,
    name: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MergeVar {
    name: String,
    content: Value,
}

#[derive(Debug, Serialize)]
struct RecipientMergeVars {
    rcpt: String,
    vars: Vec<MergeVar>,
}

/// A request ready to post.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Endpoint path relative to the API root.
    pub path: &'static str,
    /// JSON request body.
    pub body: Value,
}

impl Payload {
    /// Builds the request for `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid or the message uses an
    /// alternative body Mandrill cannot carry.
    pub fn build(api_key: &str, message: &EmailMessage) -> Result<Self> {
        let from = Address::parse(&message.from_email)?;

        let mut payload = MessagePayload {
            subject: (!message.subject.is_empty()).then(|| message.subject.clone()),
            text: (!message.body.is_empty()).then(|| message.body.clone()),
            html: html_alternative(&message.alternatives)?,
            from_email: from.email().to_string(),
            from_name: from.name,
            tags: message.tags.clone(),
            metadata: message.metadata.clone(),
            track_opens: message.track_opens,
            track_clicks: message.track_clicks,
            headers: message.headers.clone(),
            ..MessagePayload::default()
        };

        for (addrs, kind) in [
            (&message.to, RecipientKind::To),
            (&message.cc, RecipientKind::Cc),
            (&message.bcc, RecipientKind::Bcc),
        ] {
            for addr in parse_address_list(addrs)? {
                payload.to.push(Recipient {
                    email: addr.email().to_string(),
                    name: addr.name,
                    kind,
                });
            }
        }

        if !message.reply_to.is_empty() {
            let reply_to: Vec<String> = parse_address_list(&message.reply_to)?
                .iter()
                .map(ToString::to_string)
                .collect();
            payload
                .headers
                .insert("Reply-To".to_string(), reply_to.join(", "));
        }

        for attachment in &message.attachments {
            let part = FilePart {
                mimetype: attachment.mimetype.clone(),
                name: attachment
                    .content_id
                    .clone()
                    .unwrap_or_else(|| attachment.filename.clone()),
                content: STANDARD.encode(&attachment.content),
            };
            if attachment.is_inline() {
                payload.images.push(part);
            } else {
                payload.attachments.push(part);
            }
        }

        payload.global_merge_vars = merge_vars(&message.merge_global_data);
        payload.merge_vars = message
            .merge_data
            .iter()
            .map(|(rcpt, vars)| RecipientMergeVars {
                rcpt: rcpt.clone(),
                vars: merge_vars(vars),
            })
            .collect();
        if !payload.merge_vars.is_empty() || !payload.global_merge_vars.is_empty() {
            payload.merge = Some(true);
        }

        let request = SendRequest {
            key: api_key.to_string(),
            message: payload,
            send_at: message.send_at.as_ref().map(format_send_at),
            template_content: message.template_id.as_ref().map(|_| Vec::new()),
            template_name: message.template_id.clone(),
        };

        let mut body = serde_json::to_value(request)?;
        if let Value::Object(obj) = &mut body {
            merge_object(obj, &message.esp_extra);
        }

        Ok(Self {
            path: if message.template_id.is_some() {
                SEND_TEMPLATE_PATH
            } else {
                SEND_PATH
            },
            body,
        })
    }
}

/// Picks the HTML body out of the alternatives.
fn html_alternative(alternatives: &[(String, String)]) -> Result<Option<String>> {
    let mut html = None;
    for (content, mimetype) in alternatives {
        if mimetype.eq_ignore_ascii_case("text/html") && html.is_none() {
            html = Some(content.clone());
        } else {
            return Err(Error::UnsupportedFeature(format!(
                "Mandrill accepts a single text/html alternative, not {mimetype}"
            )));
        }
    }
    Ok(html)
}

fn format_send_at(when: &DateTime<Utc>) -> String {
    when.format(SEND_AT_FORMAT).to_string()
}

fn merge_vars(vars: &Map<String, Value>) -> Vec<MergeVar> {
    vars.iter()
        .map(|(name, content)| MergeVar {
            name: name.clone(),
            content: content.clone(),
        })
        .collect()
}

/// Deep-merges `extra` into `target`; nested objects merge, anything else replaces.
fn merge_object(target: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        if let (Some(Value::Object(existing)), Value::Object(inner)) = (target.get_mut(key), value)
        {
            merge_object(existing, inner);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}
