//! Simulator configuration management.
//!
//! Merges command-line flags with environment variables and validates the
//! result.

use knockout::bracket::PatternKind;
use knockout::db::{self, DatabaseConfig};
use knockout::tournament::TournamentDefaults;
use pico_args::Arguments;
use std::str::FromStr;

/// Which bye layout to seed when the field is not a power of two
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByePattern {
    Distributed,
    Concentrated,
}

impl ByePattern {
    /// Layout to request for a field of `participants`
    pub fn kind_for(&self, participants: usize) -> PatternKind {
        if participants.is_power_of_two() {
            return PatternKind::NoSeedBaseline;
        }
        match self {
            Self::Distributed => PatternKind::DistributedBye,
            Self::Concentrated => PatternKind::ConcentratedBye,
        }
    }
}

impl FromStr for ByePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "distributed" => Ok(Self::Distributed),
            "concentrated" => Ok(Self::Concentrated),
            other => Err(format!(
                "unknown pattern '{other}', expected distributed or concentrated"
            )),
        }
    }
}

/// Complete simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of participants to register
    pub participants: usize,
    /// RNG seed for shuffling and match results
    pub seed: Option<u64>,
    /// Bye layout for round 1
    pub pattern: ByePattern,
    /// Database configuration, `None` runs in memory
    pub database: Option<DatabaseConfig>,
    /// Tournament record defaults
    pub tournament: TournamentDefaults,
    /// Print the result as JSON
    pub json: bool,
}

impl SimulatorConfig {
    /// Load configuration from flags, falling back to environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a flag or variable is present but invalid
    pub fn from_args(mut pargs: Arguments) -> Result<Self, ConfigError> {
        let json = pargs.contains("--json");

        let participants = match flag(&mut pargs, "--participants")? {
            Some(n) => n,
            None => db::config::parse_env_or("KNOCKOUT_PARTICIPANTS", 8)?,
        };

        let seed = match flag(&mut pargs, "--seed")? {
            Some(seed) => Some(seed),
            None => match std::env::var("KNOCKOUT_SEED") {
                Ok(_) => Some(db::config::parse_env_or("KNOCKOUT_SEED", 0)?),
                Err(_) => None,
            },
        };

        let pattern = flag(&mut pargs, "--pattern")?.unwrap_or(ByePattern::Distributed);

        let database = match flag::<String>(&mut pargs, "--db-url")? {
            Some(url) => Some(DatabaseConfig::with_url(url)),
            None => match DatabaseConfig::from_env() {
                Ok(config) => Some(config),
                Err(db::ConfigError::MissingRequired { .. }) => None,
                Err(e) => return Err(e.into()),
            },
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(ConfigError::UnknownArguments(
                remaining
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(" "),
            ));
        }

        Ok(Self {
            participants,
            seed,
            pattern,
            database,
            tournament: TournamentDefaults::from_env(),
            json,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.participants < 2 {
            return Err(ConfigError::Invalid {
                var: "--participants".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Unrecognized arguments: {0}")]
    UnknownArguments(String),

    #[error(transparent)]
    Environment(#[from] db::ConfigError),
}

/// Optional flag value
fn flag<T>(pargs: &mut Arguments, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    pargs
        .opt_value_from_str(name)
        .map_err(|e| ConfigError::Invalid {
            var: name.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::ffi::OsString;

    fn args(list: &[&str]) -> Arguments {
        Arguments::from_vec(list.iter().map(OsString::from).collect())
    }

    fn clear_env() {
        for var in ["KNOCKOUT_PARTICIPANTS", "KNOCKOUT_SEED", "DATABASE_URL"] {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_run_in_memory() {
        clear_env();
        let config = SimulatorConfig::from_args(args(&[])).unwrap();

        assert_eq!(config.participants, 8);
        assert_eq!(config.seed, None);
        assert_eq!(config.pattern, ByePattern::Distributed);
        assert!(config.database.is_none());
        assert!(!config.json);
    }

    #[test]
    #[serial]
    fn test_flags_override_env() {
        clear_env();
        unsafe { std::env::set_var("KNOCKOUT_PARTICIPANTS", "12") };
        unsafe { std::env::set_var("KNOCKOUT_SEED", "5") };

        let config = SimulatorConfig::from_args(args(&[
            "--participants",
            "6",
            "--pattern",
            "concentrated",
            "--db-url",
            "postgres://localhost/sim",
            "--json",
        ]))
        .unwrap();

        assert_eq!(config.participants, 6);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.pattern, ByePattern::Concentrated);
        assert_eq!(
            config.database.map(|db| db.database_url),
            Some("postgres://localhost/sim".to_string())
        );
        assert!(config.json);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        clear_env();
        assert!(matches!(
            SimulatorConfig::from_args(args(&["--pattern", "random"])),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            SimulatorConfig::from_args(args(&["--bogus"])),
            Err(ConfigError::UnknownArguments(_))
        ));

        unsafe { std::env::set_var("KNOCKOUT_SEED", "abc") };
        assert!(matches!(
            SimulatorConfig::from_args(args(&[])),
            Err(ConfigError::Environment(db::ConfigError::Invalid { .. }))
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_validate_participants() {
        clear_env();
        let config = SimulatorConfig::from_args(args(&["--participants", "1"])).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_pattern_kind_for_field() {
        assert_eq!(ByePattern::Concentrated.kind_for(8), PatternKind::NoSeedBaseline);
        assert_eq!(ByePattern::Concentrated.kind_for(9), PatternKind::ConcentratedBye);
        assert_eq!(ByePattern::Distributed.kind_for(3), PatternKind::DistributedBye);
    }
}
