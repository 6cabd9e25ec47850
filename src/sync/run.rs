//! A full sync run: realign, plan, confirm, apply.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use super::apply::{ApplyDiff, AppliedStep, apply};
use super::cards::{DesiredCard, desired_cards};
use super::confirm::Confirm;
use super::diff::{Diff, MissingRemotePolicy, compute};
use crate::document::{self, Document};
use crate::error::{Error, Result};
use crate::mochi::{CardService, RemoteCard};

/// All documents below a root folder.
#[derive(Debug)]
pub struct Workspace {
    documents: Vec<Document>,
}

impl Workspace {
    /// Discover and load every document below `root`.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed document.
    pub fn load(root: &Path) -> Result<Self> {
        Ok(Self {
            documents: document::load_all(root)?,
        })
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Documents holding a backward id without a reverse prompt.
    #[must_use]
    pub fn misaligned(&self) -> Vec<&Path> {
        self.documents
            .iter()
            .filter(|doc| doc.detect_misalignment())
            .map(Document::path)
            .collect()
    }

    /// Clear stale backward ids after one confirmation.
    ///
    /// Returns how many documents were realigned.
    ///
    /// # Errors
    ///
    /// Returns `MetaMisalignment` naming the first affected document when
    /// the confirmation is declined.
    pub fn realign(&mut self, confirm: &mut dyn Confirm) -> Result<usize> {
        let misaligned = self.misaligned();
        let Some(first) = misaligned.first() else {
            return Ok(0);
        };
        let first = first.to_path_buf();
        let count = misaligned.len();

        let question = format!(
            "Clear the backward id of {count} document(s) that no longer have a reverse prompt?"
        );
        if !confirm.confirm(&question)? {
            return Err(Error::MetaMisalignment { path: first });
        }

        for doc in self.documents.iter_mut().filter(|doc| doc.detect_misalignment()) {
            doc.realign()?;
        }
        Ok(count)
    }

    /// Cards the documents want, rendered for Mochi.
    ///
    /// # Errors
    ///
    /// Fails on the first card that cannot be rendered.
    pub fn desired_cards(&self) -> Result<Vec<DesiredCard>> {
        desired_cards(&self.documents)
    }

    /// Render all cards, list the remote deck and diff the two.
    ///
    /// Local rendering happens first so document errors surface before any
    /// network traffic.
    ///
    /// # Errors
    ///
    /// Returns rendering, listing and diff errors.
    pub fn plan<S: CardService + ?Sized>(
        &self,
        service: &S,
        deck_id: &str,
        policy: MissingRemotePolicy,
    ) -> Result<Plan> {
        let desired = self.desired_cards()?;
        let remote = service.list_cards(deck_id)?;
        info!(deck_id, remote = remote.len(), desired = desired.len(), "listed deck");
        let diff = compute(&remote, desired, policy)?;
        Ok(Plan { remote, diff })
    }
}

/// Remote snapshot and the diff computed against it.
#[derive(Debug, Clone)]
pub struct Plan {
    pub remote: Vec<RemoteCard>,
    pub diff: Diff,
}

impl Plan {
    /// Lazily apply the diff; see [`ApplyDiff`].
    pub fn apply<'a, S: CardService + ?Sized>(
        self,
        service: &'a S,
        deck_id: &'a str,
    ) -> ApplyDiff<'a, S> {
        apply(service, deck_id, self.remote, self.diff)
    }
}

/// Hooks for showing progress of a run.
pub trait Observer {
    fn realigning(&mut self, _paths: &[&Path]) {}
    fn planned(&mut self, _diff: &Diff) {}
    fn applied(&mut self, _completed: usize, _total: usize, _step: &AppliedStep) {}
}

/// Observer that shows nothing.
#[derive(Debug, Default)]
pub struct Silent;

impl Observer for Silent {}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub deck_id: String,
    pub policy: MissingRemotePolicy,
    /// Plan only: no realignment, no remote mutation.
    pub dry_run: bool,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub realigned: usize,
    pub misaligned: usize,
    pub planned: usize,
    /// Cards on the deck once the run is over; only counted when applying.
    pub remote_cards: usize,
    pub updated: usize,
    pub removed: usize,
    pub created: usize,
    pub dry_run: bool,
}

/// Bring the remote deck in line with the documents below `root`.
///
/// # Errors
///
/// Returns the first error of any stage. Steps applied before a failure
/// stay applied; running again continues from there.
pub fn sync<S: CardService + ?Sized>(
    root: &Path,
    service: &S,
    options: &SyncOptions,
    confirm: &mut dyn Confirm,
    observer: &mut dyn Observer,
) -> Result<SyncReport> {
    let mut workspace = Workspace::load(root)?;
    let mut report = SyncReport {
        dry_run: options.dry_run,
        ..SyncReport::default()
    };

    let misaligned = workspace.misaligned();
    report.misaligned = misaligned.len();
    if !misaligned.is_empty() {
        observer.realigning(&misaligned);
        if !options.dry_run {
            report.realigned = workspace.realign(confirm)?;
        }
    }

    let plan = workspace.plan(service, &options.deck_id, options.policy)?;
    report.planned = plan.diff.total();
    observer.planned(&plan.diff);
    if plan.diff.is_empty() || options.dry_run {
        return Ok(report);
    }

    let question = format!(
        "Apply {} change(s) to deck {}?",
        plan.diff.total(),
        options.deck_id
    );
    if !confirm.confirm(&question)? {
        return Err(Error::Aborted);
    }

    let mut steps = plan.apply(service, &options.deck_id);
    let total = steps.total();
    while let Some(step) = steps.next() {
        let step = step?;
        debug!(id = %step.card().id, "applied step");
        match step {
            AppliedStep::Updated { .. } => report.updated += 1,
            AppliedStep::Removed { .. } => report.removed += 1,
            AppliedStep::Created { .. } => report.created += 1,
        }
        observer.applied(steps.completed(), total, &step);
    }
    report.remote_cards = steps.state().len();
    info!(
        updated = report.updated,
        removed = report.removed,
        created = report.created,
        "sync finished"
    );
    Ok(report)
}
