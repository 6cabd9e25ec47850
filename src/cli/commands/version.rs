//! Version command implementation.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::mochi::DEFAULT_API_URL;

/// What `cards version` reports.
#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    /// `dev` for debug builds, `release` otherwise.
    pub profile: &'static str,
    pub default_api_url: &'static str,
}

impl VersionInfo {
    #[must_use]
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            profile: if cfg!(debug_assertions) { "dev" } else { "release" },
            default_api_url: DEFAULT_API_URL,
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cards {} ({} build, default API {})",
            self.version, self.profile, self.default_api_url
        )
    }
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let info = VersionInfo::current();
    if json {
        println!("{}", serde_json::to_string(&info)?);
    } else {
        println!("{info}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_line() {
        let info = VersionInfo {
            version: "1.2.3",
            profile: "release",
            default_api_url: "https://example.test/api/",
        };
        assert_eq!(
            info.to_string(),
            "cards 1.2.3 (release build, default API https://example.test/api/)"
        );
    }

    #[test]
    fn test_json_fields() {
        let json = serde_json::to_value(VersionInfo::current()).unwrap();
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["default_api_url"], DEFAULT_API_URL);
    }
}
