//! # Knockout
//!
//! A single-elimination tournament bracket engine.
//!
//! Participants are laid into a power-of-two bracket, with byes filling
//! the gaps when the field is not a power of two. Each completed round
//! produces the next one until a champion remains; when the semifinals are
//! played by two real matches a third-place match is generated alongside
//! the final.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Pure seeding and progression logic
//! - [`db`]: Tournament persistence (PostgreSQL and in-memory)
//! - [`tournament`]: Orchestration with per-tournament serialization
//!
//! ## Example
//!
//! ```
//! use knockout::bracket::{Participant, first_round_patterns};
//!
//! let field: Vec<Participant> = ["Ann", "Ben", "Cho"].into_iter().map(Participant::new).collect();
//! let patterns = first_round_patterns(&field).unwrap();
//!
//! // Two candidate layouts, each with one bye
//! assert!(patterns.iter().all(|p| p.bye_count() == 1));
//! ```

/// Bracket seeding and progression.
pub mod bracket;
pub use bracket::{
    BracketError, BracketResult, Match, MatchType, Participant, PatternKind, Standings, Tournament,
};

/// Tournament persistence.
pub mod db;
pub use db::{Database, DatabaseConfig, InMemoryTournamentRepository, TournamentRepository};

/// Tournament orchestration.
pub mod tournament;
pub use tournament::{RoundOutcome, TournamentManager};
