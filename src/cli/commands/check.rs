//! Check command implementation.
//!
//! Runs every local stage of a sync (discovery, parsing, card rendering,
//! attachment collection) without contacting the remote.

use std::collections::BTreeSet;
use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use crate::config::{Config, Settings};
use crate::error::{Error, Result};
use crate::sync::{DesiredCard, Workspace};

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub documents: usize,
    pub cards: usize,
    pub attachments: usize,
    pub pending_creations: usize,
    pub misaligned: Vec<PathBuf>,
}

/// Execute the check command.
///
/// # Errors
///
/// Returns the first configuration or document error found.
pub fn execute(settings: &Settings, json: bool, quiet: bool) -> Result<()> {
    let base = settings.base_dir();
    let config = Config::load(&base)?;
    let report = check(&Workspace::load(&config.documents_root(&base))?)?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!("Documents:         {}", report.documents);
    println!("Cards:             {}", report.cards);
    println!("Attachments:       {}", report.attachments);
    println!("Pending creations: {}", report.pending_creations);
    if report.misaligned.is_empty() {
        println!("{}", "All documents are well formed.".green());
    } else {
        println!();
        println!("{}", "Backward id without reverse prompt:".yellow().bold());
        for path in &report.misaligned {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

/// Render every card of `workspace` and count what a sync would send.
///
/// # Errors
///
/// Returns rendering errors and `DuplicateCardId` when two cards claim the
/// same remote id.
pub fn check(workspace: &Workspace) -> Result<CheckReport> {
    let desired = workspace.desired_cards()?;

    let mut seen = BTreeSet::new();
    for id in desired.iter().filter_map(DesiredCard::id) {
        if !seen.insert(id) {
            return Err(Error::DuplicateCardId { id: id.to_string() });
        }
    }

    let report = CheckReport {
        documents: workspace.documents().len(),
        cards: desired.len(),
        attachments: desired.iter().map(|d| d.card().attachments.len()).sum(),
        pending_creations: desired
            .iter()
            .filter(|d| matches!(d, DesiredCard::NeedsCreation(_)))
            .count(),
        misaligned: workspace.misaligned().into_iter().map(PathBuf::from).collect(),
    };
    debug!(documents = report.documents, cards = report.cards, "checked workspace");
    Ok(report)
}
