//! Asking the user before anything irreversible happens.

use std::io::{self, BufRead, Write};

use crate::error::Result;

/// Source of yes/no answers.
pub trait Confirm {
    /// Ask `question`; `Ok(false)` means declined.
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Interactive `[y/N]` prompt on stderr, answered on stdin.
#[derive(Debug, Default)]
pub struct Terminal;

impl Confirm for Terminal {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let mut stderr = io::stderr();
        write!(stderr, "{question} [y/N] ")?;
        stderr.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }
}

/// Answers every question with yes (`--yes`).
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _question: &str) -> Result<bool> {
        Ok(true)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        for yes in ["y", "Y\n", " yes ", "YES"] {
            assert!(is_yes(yes), "{yes:?}");
        }
        for no in ["", "\n", "n", "no", "yep", "1"] {
            assert!(!is_yes(no), "{no:?}");
        }
    }

    #[test]
    fn test_assume_yes() {
        assert!(AssumeYes.confirm("Continue?").unwrap());
    }
}
