//! Backup command implementation.
//!
//! Dumps the raw JSON of every card in the configured deck, unvalidated, so
//! a backup also covers cards the sync refuses to manage.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use colored::Colorize;
use tracing::info;

use crate::config::{Config, Credentials, Settings};
use crate::document::atomic_write;
use crate::error::{Error, Result};
use crate::mochi::MochiClient;
use crate::sync::{AssumeYes, Confirm, Terminal};

/// Default backup file name for `deck_id` on `date`.
#[must_use]
pub fn backup_file_name(deck_id: &str, date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("backup-mochi-deck-{deck_id}-from-{date}.json"))
}

/// Execute the backup command.
///
/// # Errors
///
/// Returns configuration and remote errors, and `Aborted` when overwriting
/// an existing file is declined.
pub fn execute(settings: &Settings, output: Option<&Path>, yes: bool, json: bool) -> Result<()> {
    let base = settings.base_dir();
    let config = Config::load(&base)?;
    let credentials = Credentials::load(&base)?;
    let client = MochiClient::new(&config.sync.api_url, &credentials.mochi.token)?;

    let path = output.map_or_else(
        || backup_file_name(&config.sync.deck_id, chrono::Local::now().date_naive()),
        Path::to_path_buf,
    );

    let mut terminal = Terminal;
    let mut assume_yes = AssumeYes;
    let confirm: &mut dyn Confirm = if yes { &mut assume_yes } else { &mut terminal };
    if path.exists() && !confirm.confirm(&format!("Overwrite {}?", path.display()))? {
        return Err(Error::Aborted);
    }

    let cards = client.list_card_values(&config.sync.deck_id)?;
    atomic_write(&path, &serde_json::to_string_pretty(&cards)?)?;
    info!(path = %path.display(), cards = cards.len(), "wrote backup");

    if json {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "deck_id": config.sync.deck_id,
            "cards": cards.len(),
        });
        println!("{output}");
    } else {
        println!(
            "{} {} card(s) to {}",
            "Saved".green().bold(),
            cards.len(),
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            backup_file_name("AbC", date),
            PathBuf::from("backup-mochi-deck-AbC-from-2024-03-09.json")
        );
    }
}
