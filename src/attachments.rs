//! Images referenced by a card, prepared for upload.
//!
//! An [`ImageCollector`] is created fresh for every card orientation. Each
//! local image it sees gets the next positional name (`i00000000.png`,
//! `i00000001.jpg`, ...), so the same document always produces the same
//! names. The SHA-256 of the bytes is returned alongside the remote
//! reference and ends up in the rendered card, which makes a changed image
//! show up as changed content.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::error::{Error, Result};

/// Prefix Mochi uses for card-local attachment references.
pub const MEDIA_PREFIX: &str = "@media/";

/// Image formats Mochi accepts as attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Png,
    Jpeg,
}

impl ContentType {
    /// Recognize a file by its extension, ignoring case.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// An image ready to be attached to a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: ContentType,
    pub bytes: Vec<u8>,
    pub content_hash: String,
}

impl Attachment {
    /// Base64 transport encoding of the bytes.
    #[must_use]
    pub fn encoded(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Hex SHA-256 digest of some bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Collects the images of one card in traversal order.
#[derive(Debug)]
pub struct ImageCollector {
    base: PathBuf,
    collected: Vec<Attachment>,
}

impl ImageCollector {
    /// Resolve image references relative to `base`.
    #[must_use]
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
            collected: Vec::new(),
        }
    }

    /// Record the image at `reference` and return `(remote reference, hash)`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAttachment` for anything but PNG or JPEG and
    /// `AttachmentNotFound` if the file does not exist.
    pub fn collect(&mut self, reference: &str) -> Result<(String, String)> {
        let local = self.base.join(reference);
        let content_type = ContentType::from_path(&local)
            .ok_or_else(|| Error::UnsupportedAttachment { path: local.clone() })?;
        if !local.is_file() {
            return Err(Error::AttachmentNotFound { path: local });
        }

        let bytes = fs::read(&local)?;
        let content_hash = sha256_hex(&bytes);
        let suffix = local
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let name = format!("i{:08}{suffix}", self.collected.len());
        let remote = format!("{MEDIA_PREFIX}{name}");
        trace!(reference, %remote, hash = %content_hash, "collected image");

        self.collected.push(Attachment {
            name,
            content_type,
            bytes,
            content_hash: content_hash.clone(),
        });
        Ok((remote, content_hash))
    }

    /// Everything collected, in collection order.
    #[must_use]
    pub fn finalize(self) -> Vec<Attachment> {
        self.collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sequential_names_and_hashes() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.png"), b"png bytes").unwrap();
        fs::create_dir(temp_dir.path().join("img")).unwrap();
        fs::write(temp_dir.path().join("img").join("b.JPEG"), b"jpeg bytes").unwrap();

        let mut images = ImageCollector::new(temp_dir.path());
        let (first, first_hash) = images.collect("a.png").unwrap();
        let (second, _) = images.collect("img/b.JPEG").unwrap();
        let (third, third_hash) = images.collect("a.png").unwrap();

        assert_eq!(first, "@media/i00000000.png");
        assert_eq!(second, "@media/i00000001.JPEG");
        assert_eq!(third, "@media/i00000002.png");
        assert_eq!(first_hash, third_hash);
        assert_eq!(first_hash, sha256_hex(b"png bytes"));

        let attachments = images.finalize();
        assert_eq!(attachments.len(), 3);
        assert_eq!(attachments[1].content_type, ContentType::Jpeg);
        assert_eq!(attachments[1].name, "i00000001.JPEG");
        assert_eq!(attachments[0].encoded(), "cG5nIGJ5dGVz");
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("anim.gif"), b"gif").unwrap();

        let mut images = ImageCollector::new(temp_dir.path());
        assert!(matches!(
            images.collect("anim.gif"),
            Err(Error::UnsupportedAttachment { .. })
        ));
        assert!(images.finalize().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut images = ImageCollector::new(temp_dir.path());
        assert!(matches!(
            images.collect("missing.png"),
            Err(Error::AttachmentNotFound { .. })
        ));
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
