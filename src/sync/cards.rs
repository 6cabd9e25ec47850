//! Cards the local documents want on the remote deck.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::attachments::{Attachment, ImageCollector};
use crate::document::Document;
use crate::error::Result;
use crate::markdown::Direction;

/// One orientation of one document, rendered for Mochi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrientedCard {
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub source: PathBuf,
    pub direction: Direction,
}

impl OrientedCard {
    /// Render `document` asked in `direction`, collecting its images.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` for invalid pages and attachment errors
    /// for images that cannot be uploaded.
    pub fn render(document: &Document, direction: Direction) -> Result<Self> {
        let mut images = ImageCollector::new(document.base_dir());
        let markdown = document
            .markdown()
            .oriented(direction)
            .and_then(|md| md.maybe_prompted())
            .and_then(|md| md.with_rewritten_images(|path| images.collect(path)))
            .map_err(|e| e.in_document(document.path()))?;

        Ok(Self {
            content: markdown.as_mochi_md(),
            attachments: images.finalize(),
            source: document.path().to_path_buf(),
            direction,
        })
    }
}

/// A card the deck should contain, with or without a known remote id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredCard {
    NeedsCreation(OrientedCard),
    HasRemoteId { id: String, card: OrientedCard },
}

impl DesiredCard {
    #[must_use]
    pub const fn card(&self) -> &OrientedCard {
        match self {
            Self::NeedsCreation(card) | Self::HasRemoteId { card, .. } => card,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::NeedsCreation(_) => None,
            Self::HasRemoteId { id, .. } => Some(id),
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.card().source
    }
}

/// Every card `documents` produce, in document order, forward before backward.
///
/// # Errors
///
/// Fails on the first card that cannot be rendered.
pub fn desired_cards(documents: &[Document]) -> Result<Vec<DesiredCard>> {
    let mut desired = Vec::new();
    for document in documents {
        for direction in document.directions() {
            let card = OrientedCard::render(document, direction)?;
            desired.push(match document.meta().id(direction) {
                Some(id) => DesiredCard::HasRemoteId {
                    id: id.to_string(),
                    card,
                },
                None => DesiredCard::NeedsCreation(card),
            });
        }
    }
    debug!(documents = documents.len(), cards = desired.len(), "rendered desired cards");
    Ok(desired)
}
