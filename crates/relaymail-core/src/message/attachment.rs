//! Message attachments.

/// A file attached to a message.
///
/// Attachments with a `content_id` are inline parts referenced from the
/// HTML body as `cid:<content_id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// Raw content.
    pub content: Vec<u8>,
    /// MIME type (e.g., "application/pdf").
    pub mimetype: String,
    /// Content-ID for inline images.
    pub content_id: Option<String>,
}

impl Attachment {
    /// Creates a regular attachment.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
        mimetype: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            mimetype: mimetype.into(),
            content_id: None,
        }
    }

    /// Creates an inline attachment referenced by `cid:<content_id>`.
    #[must_use]
    pub fn inline(
        content_id: impl Into<String>,
        content: impl Into<Vec<u8>>,
        mimetype: impl Into<String>,
    ) -> Self {
        let content_id = content_id.into();
        Self {
            filename: content_id.clone(),
            content: content.into(),
            mimetype: mimetype.into(),
            content_id: Some(content_id),
        }
    }

    /// Returns true if this is an inline part.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.content_id.is_some()
    }
}
