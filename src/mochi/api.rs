//! Mochi REST client.
//!
//! Authenticates with HTTP basic auth, the API token as user name and an
//! empty password. Listing is paginated with a bookmark and stops at the
//! first empty page.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ApiAttachment, CardService, RemoteCard, card_from_value};
use crate::attachments::Attachment;
use crate::error::{Error, Result};

/// Mochi API root.
pub const DEFAULT_API_URL: &str = "https://app.mochi.cards/api/";

/// Cards requested per listing page.
pub const PAGE_LIMIT: usize = 100;

const TIMEOUT: Duration = Duration::from_secs(60);

/// One page of `GET cards`.
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    bookmark: Option<String>,
    #[serde(default)]
    docs: Vec<serde_json::Value>,
}

/// Body of card creation and update requests.
#[derive(Debug, Serialize)]
struct CardBody<'a> {
    #[serde(rename = "deck-id", skip_serializing_if = "Option::is_none")]
    deck_id: Option<&'a str>,
    content: &'a str,
    attachments: Vec<ApiAttachment>,
}

impl<'a> CardBody<'a> {
    fn new(deck_id: Option<&'a str>, content: &'a str, attachments: &[Attachment]) -> Self {
        Self {
            deck_id,
            content,
            attachments: attachments.iter().map(ApiAttachment::from).collect(),
        }
    }
}

/// Blocking client for one Mochi account.
#[derive(Debug, Clone)]
pub struct MochiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl MochiClient {
    /// Create a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Http` if the TLS backend cannot be initialized.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, at: &str) -> String {
        format!("{}/{at}", self.base_url)
    }

    fn send(&self, method: &str, url: &str, request: RequestBuilder) -> Result<Response> {
        debug!(method, url, "mochi request");
        let response = request.basic_auth(&self.token, Some("")).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(Error::RemoteCall {
            method: method.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    /// Every card document of a deck, exactly as the API returns it.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCall` on any non-success page.
    pub fn list_card_values(&self, deck_id: &str) -> Result<Vec<serde_json::Value>> {
        let url = self.url("cards");
        collect_pages(|bookmark| {
            let mut request = self
                .client
                .get(&url)
                .query(&[("deck-id", deck_id)])
                .query(&[("limit", PAGE_LIMIT)]);
            if let Some(bookmark) = bookmark {
                request = request.query(&[("bookmark", bookmark)]);
            }
            let page: Page = self.send("GET", &url, request)?.json()?;
            debug!(deck_id, count = page.docs.len(), "listed page");
            Ok(page)
        })
    }
}

/// Follow bookmarks until a page comes back empty or without a bookmark.
fn collect_pages<F>(mut fetch: F) -> Result<Vec<serde_json::Value>>
where
    F: FnMut(Option<&str>) -> Result<Page>,
{
    let mut docs = Vec::new();
    let mut bookmark: Option<String> = None;
    loop {
        let page = fetch(bookmark.as_deref())?;
        if page.docs.is_empty() {
            break;
        }
        docs.extend(page.docs);
        match page.bookmark {
            Some(next) => bookmark = Some(next),
            None => break,
        }
    }
    Ok(docs)
}

impl CardService for MochiClient {
    fn list_cards(&self, deck_id: &str) -> Result<Vec<RemoteCard>> {
        self.list_card_values(deck_id)?
            .into_iter()
            .map(card_from_value)
            .collect()
    }

    fn create_card(
        &self,
        deck_id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<RemoteCard> {
        let url = self.url("cards");
        let body = CardBody::new(Some(deck_id), content, attachments);
        let request = self.client.post(&url).json(&body);
        card_from_value(self.send("POST", &url, request)?.json()?)
    }

    fn update_card(
        &self,
        id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<RemoteCard> {
        let url = self.url(&format!("cards/{id}"));
        let body = CardBody::new(None, content, attachments);
        let request = self.client.post(&url).json(&body);
        card_from_value(self.send("POST", &url, request)?.json()?)
    }

    fn delete_card(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("cards/{id}"));
        let request = self.client.delete(&url);
        self.send("DELETE", &url, request)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::{ContentType, sha256_hex};
    use serde_json::json;

    fn page(bookmark: Option<&str>, ids: &[&str]) -> Page {
        Page {
            bookmark: bookmark.map(String::from),
            docs: ids.iter().map(|id| json!({ "id": id })).collect(),
        }
    }

    fn ids(docs: &[serde_json::Value]) -> Vec<&str> {
        docs.iter().filter_map(|doc| doc["id"].as_str()).collect()
    }

    #[test]
    fn test_pages_follow_bookmarks() {
        let mut seen = Vec::new();
        let docs = collect_pages(|bookmark| {
            seen.push(bookmark.map(String::from));
            Ok(match bookmark {
                None => page(Some("b1"), &["a", "b"]),
                Some("b1") => page(Some("b2"), &["c"]),
                Some("b2") => page(Some("b3"), &["d"]),
                Some(_) => page(Some("b4"), &[]),
            })
        })
        .unwrap();

        assert_eq!(ids(&docs), vec!["a", "b", "c", "d"]);
        assert_eq!(
            seen,
            vec![None, Some("b1".into()), Some("b2".into()), Some("b3".into())]
        );
    }

    #[test]
    fn test_first_page_empty() {
        let mut calls = 0;
        let docs = collect_pages(|_| {
            calls += 1;
            Ok(page(Some("b1"), &[]))
        })
        .unwrap();
        assert!(docs.is_empty());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_pages_stop_without_bookmark() {
        let mut calls = 0;
        let docs = collect_pages(|_| {
            calls += 1;
            Ok(page(None, &["a"]))
        })
        .unwrap();
        assert_eq!(ids(&docs), vec!["a"]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_page_error_is_returned() {
        let err = collect_pages(|bookmark| match bookmark {
            None => Ok(page(Some("b1"), &["a"])),
            Some(_) => Err(Error::RemoteCall {
                method: "GET".into(),
                url: "cards".into(),
                status: 503,
                body: String::new(),
            }),
        })
        .unwrap_err();
        assert!(matches!(err, Error::RemoteCall { status: 503, .. }));
    }

    #[test]
    fn test_page_deserializes_without_bookmark() {
        let page: Page = serde_json::from_value(json!({ "docs": [{ "id": "x" }] })).unwrap();
        assert_eq!(page.bookmark, None);
        assert_eq!(page.docs.len(), 1);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = MochiClient::new(DEFAULT_API_URL, "token").unwrap();
        assert_eq!(client.url("cards/abc"), "https://app.mochi.cards/api/cards/abc");
    }

    #[test]
    fn test_create_body_shape() {
        let attachment = Attachment {
            name: "i00000000.jpg".into(),
            content_type: ContentType::Jpeg,
            bytes: vec![1, 2, 3],
            content_hash: sha256_hex(&[1, 2, 3]),
        };
        let body = CardBody::new(Some("deck"), "Q\n\n---\n\nA", &[attachment]);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["deck-id"], "deck");
        assert_eq!(json["attachments"][0]["file-name"], "i00000000.jpg");
        assert_eq!(json["attachments"][0]["content-type"], "image/jpeg");
        assert_eq!(json["attachments"][0]["data"], "AQID");
    }

    #[test]
    fn test_update_body_omits_deck() {
        let body = CardBody::new(None, "x", &[]);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("deck-id").is_none());
    }
}
