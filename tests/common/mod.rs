//! In-memory deck shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cards::Result;
use cards::attachments::Attachment;
use cards::error::Error;
use cards::mochi::{ApiAttachment, CardService, RemoteCard};
use cards::sync::Confirm;

/// A deck held in memory. Ids are handed out as `card-1`, `card-2`, ...
#[derive(Default)]
pub struct FakeDeck {
    pub cards: RefCell<BTreeMap<String, RemoteCard>>,
    pub calls: RefCell<Vec<String>>,
    next_id: Cell<usize>,
    /// Fail the n-th creation (1-based) with a server error.
    pub fail_creation: Cell<Option<usize>>,
    creations: Cell<usize>,
}

impl FakeDeck {
    pub fn ids(&self) -> Vec<String> {
        self.cards.borrow().keys().cloned().collect()
    }

    pub fn content(&self, id: &str) -> Option<String> {
        self.cards.borrow().get(id).map(|card| card.content.clone())
    }

    pub fn len(&self) -> usize {
        self.cards.borrow().len()
    }

    fn server_error(method: &str, url: String) -> Error {
        Error::RemoteCall {
            method: method.into(),
            url,
            status: 500,
            body: "internal error".into(),
        }
    }
}

fn wire(attachments: &[Attachment]) -> Vec<ApiAttachment> {
    attachments.iter().map(ApiAttachment::from).collect()
}

impl CardService for FakeDeck {
    fn list_cards(&self, deck_id: &str) -> Result<Vec<RemoteCard>> {
        self.calls.borrow_mut().push(format!("list {deck_id}"));
        Ok(self.cards.borrow().values().cloned().collect())
    }

    fn create_card(
        &self,
        _deck_id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<RemoteCard> {
        let creation = self.creations.get() + 1;
        self.creations.set(creation);
        if self.fail_creation.get() == Some(creation) {
            return Err(Self::server_error("POST", "cards".into()));
        }

        let id = format!("card-{}", self.next_id.get() + 1);
        self.next_id.set(self.next_id.get() + 1);
        self.calls.borrow_mut().push(format!("create {id}"));
        let card = RemoteCard {
            id: id.clone(),
            content: content.into(),
            attachments: wire(attachments),
        };
        self.cards.borrow_mut().insert(id, card.clone());
        Ok(card)
    }

    fn update_card(
        &self,
        id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<RemoteCard> {
        self.calls.borrow_mut().push(format!("update {id}"));
        let mut cards = self.cards.borrow_mut();
        let Some(card) = cards.get_mut(id) else {
            return Err(Self::server_error("POST", format!("cards/{id}")));
        };
        card.content = content.into();
        card.attachments = wire(attachments);
        Ok(card.clone())
    }

    fn delete_card(&self, id: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("delete {id}"));
        self.cards.borrow_mut().remove(id);
        Ok(())
    }
}

/// Answers from a fixed script, then no; records every question.
#[derive(Default)]
pub struct Scripted {
    pub answers: Vec<bool>,
    pub questions: Vec<String>,
}

impl Scripted {
    pub fn yes() -> Self {
        Self {
            answers: vec![true; 8],
            questions: Vec::new(),
        }
    }

    pub fn no() -> Self {
        Self::default()
    }
}

impl Confirm for Scripted {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.answers.get(self.questions.len()).copied().unwrap_or(false);
        self.questions.push(question.to_string());
        Ok(answer)
    }
}

pub fn write_doc(root: &Path, name: &str, content: &str) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
