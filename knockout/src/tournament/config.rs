//! Tournament defaults.

use serde::{Deserialize, Serialize};

/// Side labels given to new tournaments when none are configured
pub const DEFAULT_POSITIONS: [&str; 2] = ["East", "West"];

/// Defaults applied when creating a tournament record.
///
/// `positions` is display vocabulary only; the bracket engine never reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentDefaults {
    pub positions: Vec<String>,
}

impl TournamentDefaults {
    /// Read `TOURNAMENT_POSITIONS` (comma separated), falling back to
    /// [`DEFAULT_POSITIONS`] when unset or blank
    pub fn from_env() -> Self {
        std::env::var("TOURNAMENT_POSITIONS")
            .ok()
            .map(|raw| Self::parse_positions(&raw))
            .filter(|positions| !positions.is_empty())
            .map(|positions| Self { positions })
            .unwrap_or_default()
    }

    fn parse_positions(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for TournamentDefaults {
    fn default() -> Self {
        Self {
            positions: DEFAULT_POSITIONS.iter().map(|p| p.to_string()).collect(),
        }
    }
}
