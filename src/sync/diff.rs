//! Remote mutations needed to make the deck match the documents.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cards::{DesiredCard, OrientedCard};
use crate::error::{Error, Result};
use crate::mochi::RemoteCard;

/// What to do when a locally known id is missing from the remote deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingRemotePolicy {
    /// Stop with `RemoteConsistency`.
    #[default]
    Fail,
    /// Create the card again; the new id replaces the stale one.
    Recreate,
}

/// Planned mutations, each category in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Remote id and the content it should get.
    pub changed: Vec<(String, OrientedCard)>,
    pub removed: Vec<RemoteCard>,
    pub new: Vec<OrientedCard>,
}

impl Diff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty() && self.new.is_empty()
    }

    /// Number of remote calls applying this diff takes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.changed.len() + self.removed.len() + self.new.len()
    }
}

/// Compare the desired cards against what the remote deck holds.
///
/// Content is compared as exact strings. Attachments are compared by name,
/// type and, when the listing includes data, by content hash.
///
/// # Errors
///
/// Returns `DuplicateCardId` when two cards claim the same id, and
/// `RemoteConsistency` for a known id missing remotely under
/// [`MissingRemotePolicy::Fail`].
pub fn compute(
    remote: &[RemoteCard],
    desired: Vec<DesiredCard>,
    policy: MissingRemotePolicy,
) -> Result<Diff> {
    let by_id: HashMap<&str, &RemoteCard> =
        remote.iter().map(|card| (card.id.as_str(), card)).collect();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut diff = Diff::default();

    for card in desired {
        match card {
            DesiredCard::NeedsCreation(card) => diff.new.push(card),
            DesiredCard::HasRemoteId { id, card } => {
                if !claimed.insert(id.clone()) {
                    return Err(Error::DuplicateCardId { id });
                }
                match by_id.get(id.as_str()) {
                    Some(existing) => {
                        if differs(existing, &card) {
                            debug!(%id, source = %card.source.display(), "content changed");
                            diff.changed.push((id, card));
                        }
                    }
                    None => match policy {
                        MissingRemotePolicy::Fail => return Err(Error::RemoteConsistency { id }),
                        MissingRemotePolicy::Recreate => {
                            warn!(
                                %id,
                                source = %card.source.display(),
                                "card missing remotely, recreating"
                            );
                            diff.new.push(card);
                        }
                    },
                }
            }
        }
    }

    diff.removed = remote
        .iter()
        .filter(|card| !claimed.contains(&card.id))
        .cloned()
        .collect();

    debug!(
        changed = diff.changed.len(),
        removed = diff.removed.len(),
        new = diff.new.len(),
        "computed diff"
    );
    Ok(diff)
}

fn differs(remote: &RemoteCard, desired: &OrientedCard) -> bool {
    if remote.content != desired.content || remote.attachments.len() != desired.attachments.len() {
        return true;
    }
    !desired.attachments.iter().all(|local| {
        remote
            .attachments
            .iter()
            .any(|attachment| attachment.matches(local))
    })
}
