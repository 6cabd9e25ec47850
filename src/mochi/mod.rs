//! Remote card service.
//!
//! [`CardService`] is the only way the sync engine talks to the remote deck.
//! [`MochiClient`] implements it against the Mochi REST API; tests plug in an
//! in-memory fake.

mod api;

use serde::{Deserialize, Serialize};

pub use api::{DEFAULT_API_URL, MochiClient, PAGE_LIMIT};

use crate::attachments::{Attachment, sha256_hex};
use crate::error::{Error, Result};

/// Card operations the sync engine needs.
///
/// Every call is a single blocking round trip. Any non-success response is
/// an error; nothing is retried.
pub trait CardService {
    /// Every card of a deck, following pagination to the end.
    fn list_cards(&self, deck_id: &str) -> Result<Vec<RemoteCard>>;

    fn create_card(
        &self,
        deck_id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<RemoteCard>;

    fn update_card(
        &self,
        id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<RemoteCard>;

    fn delete_card(&self, id: &str) -> Result<()>;
}

/// Attachment as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAttachment {
    #[serde(rename = "file-name")]
    pub file_name: String,
    #[serde(rename = "content-type")]
    pub content_type: String,
    /// Base64 bytes; listings may leave this out.
    #[serde(default)]
    pub data: String,
}

impl From<&Attachment> for ApiAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            file_name: attachment.name.clone(),
            content_type: attachment.content_type.mime().to_string(),
            data: attachment.encoded(),
        }
    }
}

impl ApiAttachment {
    /// Whether this remote attachment holds the same image as `local`.
    ///
    /// Without data only name and type can be compared.
    #[must_use]
    pub fn matches(&self, local: &Attachment) -> bool {
        use base64::Engine;

        if self.file_name != local.name || self.content_type != local.content_type.mime() {
            return false;
        }
        if self.data.is_empty() {
            return true;
        }
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .is_ok_and(|bytes| sha256_hex(&bytes) == local.content_hash)
    }
}

/// A card as observed on the remote deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCard {
    pub id: String,
    pub content: String,
    pub attachments: Vec<ApiAttachment>,
}

/// Raw card document returned by the API.
#[derive(Debug, Deserialize)]
struct CardDoc {
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    attachments: Option<Vec<ApiAttachment>>,
    #[serde(default, rename = "archived?")]
    archived: Option<bool>,
    #[serde(default, rename = "trashed?")]
    trashed: Option<serde_json::Value>,
    #[serde(default, rename = "review-reverse?")]
    review_reverse: Option<bool>,
    #[serde(default, rename = "template-id")]
    template_id: Option<String>,
}

/// Decode one raw API card document.
///
/// Cards whose state the sync model cannot represent are rejected.
///
/// # Errors
///
/// Returns `Json` for documents without an id and `UnsupportedRemoteCard`
/// for archived, trashed, reversed or templated cards.
pub fn card_from_value(value: serde_json::Value) -> Result<RemoteCard> {
    let doc: CardDoc = serde_json::from_value(value)?;

    let reason = if doc.archived.unwrap_or(false) {
        Some("archived")
    } else if doc.trashed.as_ref().is_some_and(is_set) {
        Some("trashed")
    } else if doc.review_reverse.unwrap_or(false) {
        Some("review-reverse is enabled")
    } else if doc.template_id.is_some() {
        Some("uses a template")
    } else {
        None
    };
    if let Some(reason) = reason {
        return Err(Error::UnsupportedRemoteCard {
            id: doc.id,
            reason: reason.to_string(),
        });
    }

    Ok(RemoteCard {
        id: doc.id,
        content: doc.content,
        attachments: doc.attachments.unwrap_or_default(),
    })
}

/// `trashed?` is a timestamp on some cards and a flag on others.
fn is_set(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        _ => true,
    }
}
