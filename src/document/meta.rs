//! Per-document record of remote card ids.
//!
//! Two on-disk layouts exist:
//!
//! - **Header**: a fenced JSON block occupying exactly the first four lines
//!   of the document (`` ``` {.json} ``, one line of JSON, `` ``` ``, blank).
//! - **Sidecar**: documents named `content.md` keep their ids in a
//!   `meta.json` next to them and are never rewritten.
//!
//! The header is recognized by exact line matching (a trailing `\r` is
//! ignored), so body text can never be mistaken for metadata.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::file::atomic_write;
use crate::error::{Error, Result};
use crate::markdown::Direction;

const HEADER_OPEN: &str = "``` {.json}";
const HEADER_CLOSE: &str = "```";

/// File name of a document that uses a sidecar.
pub const SIDECAR_DOCUMENT: &str = "content.md";
/// File name of the sidecar itself.
pub const SIDECAR_META: &str = "meta.json";

/// Remote card ids assigned to a document's orientations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub forward_id: Option<String>,
    pub backward_id: Option<String>,
}

impl Meta {
    #[must_use]
    pub fn id(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Forward => self.forward_id.as_deref(),
            Direction::Backward => self.backward_id.as_deref(),
        }
    }

    #[must_use]
    pub fn with_id(&self, direction: Direction, id: Option<String>) -> Self {
        let mut meta = self.clone();
        match direction {
            Direction::Forward => meta.forward_id = id,
            Direction::Backward => meta.backward_id = id,
        }
        meta
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.forward_id.is_none() && self.backward_id.is_none()
    }
}

/// Embedded header JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HeaderRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "reverse-id")]
    reverse_id: Option<String>,
}

/// Sidecar JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SidecarRecord {
    #[serde(default)]
    forward: Option<String>,
    #[serde(default)]
    backward: Option<String>,
}

/// Where a document keeps its [`Meta`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Header,
    Sidecar(PathBuf),
}

impl Layout {
    #[must_use]
    pub fn of(path: &Path) -> Self {
        if path.file_name().is_some_and(|name| name == SIDECAR_DOCUMENT) {
            Self::Sidecar(path.with_file_name(SIDECAR_META))
        } else {
            Self::Header
        }
    }
}

/// Split document text into its header JSON line (if any) and body.
#[must_use]
pub fn split_header(text: &str) -> (Option<&str>, &str) {
    // Header lines may end in `\r\n`; the body is returned untouched.
    let parts: Vec<&str> = text.splitn(5, '\n').collect();
    match parts.as_slice() {
        [open, json, close, blank, rest @ ..]
            if line(open) == HEADER_OPEN
                && line(close) == HEADER_CLOSE
                && blank.trim().is_empty() =>
        {
            (Some(line(json)), rest.first().copied().unwrap_or(""))
        }
        _ => (None, text),
    }
}

fn line(raw: &str) -> &str {
    raw.strip_suffix('\r').unwrap_or(raw)
}

/// Join a header JSON line and a body back into document text.
#[must_use]
pub fn merge_header(header: Option<&str>, body: &str) -> String {
    let body = body.trim_start_matches(['\r', '\n']);
    match header {
        Some(json) => format!("{HEADER_OPEN}\n{json}\n{HEADER_CLOSE}\n\n{body}"),
        None => body.to_string(),
    }
}

/// Metadata of a document whose current text is `text`.
///
/// # Errors
///
/// Returns `MalformedDocument` if the header or sidecar holds invalid JSON.
pub fn read_text(path: &Path, text: &str) -> Result<Meta> {
    match Layout::of(path) {
        Layout::Header => match split_header(text).0 {
            Some(json) => {
                let record: HeaderRecord = serde_json::from_str(json)
                    .map_err(|e| Error::malformed(path, format!("invalid metadata header: {e}")))?;
                Ok(Meta {
                    forward_id: record.id,
                    backward_id: record.reverse_id,
                })
            }
            None => Ok(Meta::default()),
        },
        Layout::Sidecar(sidecar) => {
            if !sidecar.exists() {
                return Ok(Meta::default());
            }
            let record: SidecarRecord = serde_json::from_str(&fs::read_to_string(&sidecar)?)
                .map_err(|e| Error::malformed(&sidecar, format!("invalid metadata: {e}")))?;
            Ok(Meta {
                forward_id: record.forward,
                backward_id: record.backward,
            })
        }
    }
}

/// Markdown body of a document, without any metadata header.
#[must_use]
pub fn body_of<'a>(path: &Path, text: &'a str) -> &'a str {
    match Layout::of(path) {
        Layout::Header => split_header(text).1,
        Layout::Sidecar(_) => text,
    }
}

/// Read the metadata of the document at `path`.
///
/// A document without stored metadata reads as an empty [`Meta`].
///
/// # Errors
///
/// Returns an error if the document cannot be read or its metadata is invalid.
pub fn read(path: &Path) -> Result<Meta> {
    read_text(path, &fs::read_to_string(path)?)
}

/// Persist `meta` for the document at `path`.
///
/// The document body is re-read from disk and kept as is. Writing an empty
/// [`Meta`] to a header document removes the header.
///
/// # Errors
///
/// Returns an error if the document or sidecar cannot be read or written.
pub fn write(path: &Path, meta: &Meta) -> Result<()> {
    match Layout::of(path) {
        Layout::Header => {
            let text = fs::read_to_string(path)?;
            let (_, body) = split_header(&text);
            let header = if meta.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&HeaderRecord {
                    id: meta.forward_id.clone(),
                    reverse_id: meta.backward_id.clone(),
                })?)
            };
            atomic_write(path, &merge_header(header.as_deref(), body))?;
        }
        Layout::Sidecar(sidecar) => {
            let record = SidecarRecord {
                forward: meta.forward_id.clone(),
                backward: meta.backward_id.clone(),
            };
            let mut json = serde_json::to_string_pretty(&record)?;
            json.push('\n');
            atomic_write(&sidecar, &json)?;
        }
    }
    debug!(
        path = %path.display(),
        forward = ?meta.forward_id,
        backward = ?meta.backward_id,
        "wrote meta"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn meta(forward: Option<&str>, backward: Option<&str>) -> Meta {
        Meta {
            forward_id: forward.map(String::from),
            backward_id: backward.map(String::from),
        }
    }

    #[test]
    fn test_missing_header_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("card.md");
        fs::write(&path, "Q\n\n---\n\nA").unwrap();

        assert_eq!(read(&path).unwrap(), Meta::default());
    }

    #[test]
    fn test_header_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("card.md");
        fs::write(&path, "\n\nQ\n\n---\n\nA\n").unwrap();

        write(&path, &meta(Some("abc"), None)).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "``` {.json}\n{\"id\":\"abc\",\"reverse-id\":null}\n```\n\nQ\n\n---\n\nA\n"
        );
        assert_eq!(read(&path).unwrap(), meta(Some("abc"), None));

        write(&path, &meta(Some("abc"), Some("def"))).unwrap();
        assert_eq!(read(&path).unwrap(), meta(Some("abc"), Some("def")));
        assert_eq!(
            body_of(&path, &fs::read_to_string(&path).unwrap()),
            "Q\n\n---\n\nA\n"
        );
    }

    #[test]
    fn test_crlf_header_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("card.md");
        fs::write(
            &path,
            "``` {.json}\r\n{\"id\":\"abc\",\"reverse-id\":null}\r\n```\r\n\r\nQ\r\n\r\n---\r\n\r\nA\r\n",
        )
        .unwrap();

        assert_eq!(read(&path).unwrap(), meta(Some("abc"), None));

        write(&path, &meta(Some("new"), None)).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "``` {.json}\n{\"id\":\"new\",\"reverse-id\":null}\n```\n\nQ\r\n\r\n---\r\n\r\nA\r\n"
        );
        assert_eq!(read(&path).unwrap(), meta(Some("new"), None));
        assert_eq!(body_of(&path, &text), "Q\r\n\r\n---\r\n\r\nA\r\n");
    }

    #[test]
    fn test_empty_meta_removes_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("card.md");
        fs::write(
            &path,
            "``` {.json}\n{\"id\":\"x\",\"reverse-id\":null}\n```\n\nQ\n\n---\n\nA",
        )
        .unwrap();

        write(&path, &Meta::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Q\n\n---\n\nA");
    }

    #[test]
    fn test_json_code_block_later_in_body_is_not_a_header() {
        let text = "Q\n``` {.json}\n{\"id\":\"x\"}\n```\n\n---\n\nA";
        assert_eq!(split_header(text), (None, text));
    }

    #[test]
    fn test_header_needs_blank_fourth_line() {
        let text = "``` {.json}\n{\"id\":\"x\"}\n```\nQ\n\n---\n\nA";
        assert_eq!(split_header(text).0, None);
    }

    #[test]
    fn test_invalid_header_json_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("card.md");
        fs::write(&path, "``` {.json}\n{not json}\n```\n\nQ\n\n---\n\nA").unwrap();

        assert!(matches!(read(&path), Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn test_sidecar_layout() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("rich");
        fs::create_dir_all(&folder).unwrap();
        let path = folder.join(SIDECAR_DOCUMENT);
        fs::write(&path, "Q\n\n---\n\nA").unwrap();

        assert_eq!(read(&path).unwrap(), Meta::default());
        write(&path, &meta(None, Some("back"))).unwrap();

        assert_eq!(read(&path).unwrap(), meta(None, Some("back")));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Q\n\n---\n\nA");
        let sidecar: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(folder.join(SIDECAR_META)).unwrap()).unwrap();
        assert_eq!(sidecar["backward"], "back");
        assert!(sidecar["forward"].is_null());
    }

    #[test]
    fn test_meta_with_id() {
        let m = Meta::default().with_id(Direction::Backward, Some("b".into()));
        assert_eq!(m.id(Direction::Backward), Some("b"));
        assert_eq!(m.id(Direction::Forward), None);
        assert!(!m.is_empty());
    }
}
