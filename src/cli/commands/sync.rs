//! Sync command implementation.
//!
//! Loads `config.toml` and the Mochi credentials from the base directory,
//! then runs [`crate::sync::sync`] with an interactive confirmation (or
//! `--yes`) and a terminal progress observer.

use std::path::Path;

use colored::Colorize;

use crate::config::{Config, Credentials, Settings};
use crate::error::Result;
use crate::mochi::MochiClient;
use crate::sync::{
    self, AppliedStep, AssumeYes, Confirm, Diff, Observer, Silent, SyncOptions, SyncReport,
    Terminal,
};

/// Execute the sync command.
///
/// # Errors
///
/// Returns configuration, document, remote and confirmation errors.
pub fn execute(
    settings: &Settings,
    dry_run: bool,
    yes: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let base = settings.base_dir();
    let config = Config::load(&base)?;
    let credentials = Credentials::load(&base)?;
    let client = MochiClient::new(&config.sync.api_url, &credentials.mochi.token)?;

    let options = SyncOptions {
        deck_id: config.sync.deck_id.clone(),
        policy: config.sync.on_missing_remote,
        dry_run,
    };

    let mut terminal = Terminal;
    let mut assume_yes = AssumeYes;
    let confirm: &mut dyn Confirm = if yes { &mut assume_yes } else { &mut terminal };

    let mut progress = Progress::new(&base);
    let mut silent = Silent;
    let observer: &mut dyn Observer = if json || quiet { &mut silent } else { &mut progress };

    let report = sync::sync(&config.documents_root(&base), &client, &options, confirm, observer)?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else if !quiet {
        print_report(&report);
    }
    Ok(())
}

/// Prints each stage of a run to stdout.
struct Progress<'a> {
    base: &'a Path,
}

impl<'a> Progress<'a> {
    const fn new(base: &'a Path) -> Self {
        Self { base }
    }

    fn show(&self, path: &Path) -> String {
        path.strip_prefix(self.base).unwrap_or(path).display().to_string()
    }
}

impl Observer for Progress<'_> {
    fn realigning(&mut self, paths: &[&Path]) {
        println!("{}", "Backward id without reverse prompt:".yellow().bold());
        for path in paths {
            println!("  {}", self.show(path));
        }
        println!();
    }

    fn planned(&mut self, diff: &Diff) {
        if diff.is_empty() {
            return;
        }
        for (_, card) in &diff.changed {
            println!(
                "{} from {} ({})",
                "changed".yellow(),
                self.show(&card.source),
                card.direction
            );
        }
        for card in &diff.removed {
            println!("{} {}", "removed".red(), card.id);
        }
        for card in &diff.new {
            println!("{} from {} ({})", "new".green(), self.show(&card.source), card.direction);
        }
        println!();
        println!(
            "{} changed, {} removed, {} new",
            diff.changed.len(),
            diff.removed.len(),
            diff.new.len()
        );
    }

    fn applied(&mut self, completed: usize, total: usize, step: &AppliedStep) {
        let progress = format!("[{completed}/{total}]").dimmed();
        match step {
            AppliedStep::Updated { card, source } => {
                println!("{progress} updated {} from {}", card.id, self.show(source));
            }
            AppliedStep::Removed { card } => println!("{progress} removed {}", card.id),
            AppliedStep::Created { card, source, direction } => {
                println!("{progress} created {} from {} ({direction})", card.id, self.show(source));
            }
        }
    }
}

fn print_report(report: &SyncReport) {
    if report.planned == 0 {
        println!("{}", "Deck is up to date.".green());
    } else if report.dry_run {
        println!("{}", "Dry run: nothing was changed.".dimmed());
    } else {
        println!(
            "{} {} updated, {} removed, {} created",
            "Done:".green().bold(),
            report.updated,
            report.removed,
            report.created
        );
    }
    if report.realigned > 0 {
        println!("Cleared {} stale backward id(s).", report.realigned);
    }
}
