//! Applying a [`Diff`] one remote call at a time.
//!
//! [`ApplyDiff`] is a lazy iterator: each `next()` performs exactly one
//! update, deletion or creation and yields what happened. Updates and
//! deletions run first because replaying them is harmless. Creations run
//! last and each new id is written to the document before the step is
//! yielded, so an interrupted run duplicates at most one card.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use super::cards::OrientedCard;
use super::diff::Diff;
use crate::document;
use crate::error::Result;
use crate::markdown::Direction;
use crate::mochi::{CardService, RemoteCard};

/// One performed remote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedStep {
    Updated {
        card: RemoteCard,
        source: PathBuf,
    },
    Removed {
        card: RemoteCard,
    },
    Created {
        card: RemoteCard,
        source: PathBuf,
        direction: Direction,
    },
}

impl AppliedStep {
    /// Remote card touched by this step.
    #[must_use]
    pub const fn card(&self) -> &RemoteCard {
        match self {
            Self::Updated { card, .. } | Self::Removed { card } | Self::Created { card, .. } => {
                card
            }
        }
    }
}

/// Lazy application of a diff against a card service.
///
/// Stops for good after the first error.
pub struct ApplyDiff<'a, S: CardService + ?Sized> {
    service: &'a S,
    deck_id: &'a str,
    changed: std::vec::IntoIter<(String, OrientedCard)>,
    removed: std::vec::IntoIter<RemoteCard>,
    new: std::vec::IntoIter<OrientedCard>,
    state: BTreeMap<String, RemoteCard>,
    total: usize,
    completed: usize,
    failed: bool,
}

/// Start applying `diff` to the deck whose current cards are `remote`.
pub fn apply<'a, S: CardService + ?Sized>(
    service: &'a S,
    deck_id: &'a str,
    remote: Vec<RemoteCard>,
    diff: Diff,
) -> ApplyDiff<'a, S> {
    let total = diff.total();
    ApplyDiff {
        service,
        deck_id,
        changed: diff.changed.into_iter(),
        removed: diff.removed.into_iter(),
        new: diff.new.into_iter(),
        state: remote.into_iter().map(|card| (card.id.clone(), card)).collect(),
        total,
        completed: 0,
        failed: false,
    }
}

impl<S: CardService + ?Sized> ApplyDiff<'_, S> {
    /// Steps planned in total.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Steps performed successfully so far.
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// Remote deck as it stands after the steps performed so far.
    #[must_use]
    pub const fn state(&self) -> &BTreeMap<String, RemoteCard> {
        &self.state
    }

    fn update(&mut self, id: &str, card: OrientedCard) -> Result<AppliedStep> {
        let updated = self.service.update_card(id, &card.content, &card.attachments)?;
        debug!(%id, source = %card.source.display(), "updated card");
        self.state.insert(updated.id.clone(), updated.clone());
        Ok(AppliedStep::Updated {
            card: updated,
            source: card.source,
        })
    }

    fn remove(&mut self, card: RemoteCard) -> Result<AppliedStep> {
        self.service.delete_card(&card.id)?;
        debug!(id = %card.id, "deleted card");
        self.state.remove(&card.id);
        Ok(AppliedStep::Removed { card })
    }

    fn create(&mut self, card: OrientedCard) -> Result<AppliedStep> {
        let created = self
            .service
            .create_card(self.deck_id, &card.content, &card.attachments)?;
        document::record_id(&card.source, card.direction, &created.id)?;
        info!(
            id = %created.id,
            source = %card.source.display(),
            direction = %card.direction,
            "created card"
        );
        self.state.insert(created.id.clone(), created.clone());
        Ok(AppliedStep::Created {
            card: created,
            source: card.source,
            direction: card.direction,
        })
    }
}

impl<S: CardService + ?Sized> Iterator for ApplyDiff<'_, S> {
    type Item = Result<AppliedStep>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let step = if let Some((id, card)) = self.changed.next() {
            self.update(&id, card)
        } else if let Some(card) = self.removed.next() {
            self.remove(card)
        } else if let Some(card) = self.new.next() {
            self.create(card)
        } else {
            return None;
        };

        match step {
            Ok(_) => self.completed += 1,
            Err(_) => self.failed = true,
        }
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = self.total - self.completed;
        (0, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::Attachment;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Records calls; fails the call numbered `fail_at`.
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
        fail_at: Option<usize>,
    }

    impl Recorder {
        fn record(&self, call: String) -> Result<()> {
            let mut calls = self.calls.borrow_mut();
            calls.push(call);
            if self.fail_at == Some(calls.len()) {
                return Err(Error::RemoteCall {
                    method: "POST".into(),
                    url: "test".into(),
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(())
        }
    }

    impl CardService for Recorder {
        fn list_cards(&self, _deck_id: &str) -> Result<Vec<RemoteCard>> {
            Ok(Vec::new())
        }

        fn create_card(
            &self,
            _deck_id: &str,
            content: &str,
            _: &[Attachment],
        ) -> Result<RemoteCard> {
            self.record(format!("create {content}"))?;
            let id = format!("new{}", self.calls.borrow().len());
            Ok(RemoteCard { id, content: content.into(), attachments: Vec::new() })
        }

        fn update_card(&self, id: &str, content: &str, _: &[Attachment]) -> Result<RemoteCard> {
            self.record(format!("update {id}"))?;
            Ok(RemoteCard { id: id.into(), content: content.into(), attachments: Vec::new() })
        }

        fn delete_card(&self, id: &str) -> Result<()> {
            self.record(format!("delete {id}"))
        }
    }

    fn card(source: PathBuf, content: &str) -> OrientedCard {
        OrientedCard {
            content: content.into(),
            attachments: Vec::new(),
            source,
            direction: Direction::Forward,
        }
    }

    fn remote(id: &str) -> RemoteCard {
        RemoteCard { id: id.into(), content: "old".into(), attachments: Vec::new() }
    }

    fn fixture(temp_dir: &TempDir) -> (Vec<RemoteCard>, Diff) {
        let one = temp_dir.path().join("one.md");
        let two = temp_dir.path().join("two.md");
        fs::write(&one, "one\n\n---\n\nA").unwrap();
        fs::write(&two, "two\n\n---\n\nA").unwrap();

        let diff = Diff {
            changed: vec![("u1".into(), card(one.clone(), "changed"))],
            removed: vec![remote("d1")],
            new: vec![card(one, "one"), card(two, "two")],
        };
        (vec![remote("u1"), remote("d1")], diff)
    }

    #[test]
    fn test_order_updates_removals_creations() {
        let temp_dir = TempDir::new().unwrap();
        let (remote_cards, diff) = fixture(&temp_dir);
        let service = Recorder::default();

        let mut steps = apply(&service, "deck", remote_cards, diff);
        assert_eq!(steps.total(), 4);
        let results: Vec<_> = steps.by_ref().collect::<Result<_>>().unwrap();

        assert_eq!(
            *service.calls.borrow(),
            vec!["update u1", "delete d1", "create one", "create two"]
        );
        assert!(matches!(results[3], AppliedStep::Created { .. }));
        assert_eq!(steps.completed(), 4);

        let state = steps.state();
        assert!(!state.contains_key("d1"));
        assert_eq!(state["u1"].content, "changed");
        assert!(state.contains_key("new3") && state.contains_key("new4"));
    }

    #[test]
    fn test_creation_persists_before_yield() {
        let temp_dir = TempDir::new().unwrap();
        let (remote_cards, diff) = fixture(&temp_dir);
        let service = Recorder::default();
        let one = temp_dir.path().join("one.md");

        let mut steps = apply(&service, "deck", remote_cards, diff);
        steps.next().unwrap().unwrap();
        steps.next().unwrap().unwrap();
        assert_eq!(document::meta::read(&one).unwrap().forward_id, None);

        steps.next().unwrap().unwrap();
        assert_eq!(
            document::meta::read(&one).unwrap().forward_id.as_deref(),
            Some("new3")
        );
    }

    #[test]
    fn test_stops_after_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let (remote_cards, diff) = fixture(&temp_dir);
        let service = Recorder {
            fail_at: Some(4),
            ..Recorder::default()
        };

        let results: Vec<_> = apply(&service, "deck", remote_cards, diff).collect();
        assert_eq!(results.len(), 4);
        assert!(results[..3].iter().all(Result::is_ok));
        assert!(matches!(results[3], Err(Error::RemoteCall { .. })));

        let two = temp_dir.path().join("two.md");
        assert_eq!(document::meta::read(&two).unwrap().forward_id, None);
        assert_eq!(
            document::meta::read(&temp_dir.path().join("one.md"))
                .unwrap()
                .forward_id
                .as_deref(),
            Some("new3")
        );
    }
}
