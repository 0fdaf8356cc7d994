//! Tournament module orchestrating the bracket engine.
//!
//! This module provides:
//! - Tournament creation with configurable position labels
//! - Participant registration until the bracket is seeded
//! - First-round seeding from a chosen candidate layout
//! - Round advancement, winner recording and final standings
//!
//! ## Example
//!
//! ```
//! use knockout::{
//!     bracket::{KeepOrder, PatternKind},
//!     db::InMemoryTournamentRepository,
//!     tournament::{RoundOutcome, TournamentManager},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(InMemoryTournamentRepository::new()));
//!     let cup = manager.create_tournament("Office Cup", "Table tennis").await?;
//!     for name in ["Ann", "Ben"] {
//!         manager.register_participant(cup.id, name).await?;
//!     }
//!
//!     let round1 = manager
//!         .seed_with_pattern(cup.id, PatternKind::NoSeedBaseline, &mut KeepOrder)
//!         .await?;
//!     manager
//!         .record_winner(cup.id, round1[0].id, round1[0].player1.id)
//!         .await?;
//!
//!     let RoundOutcome::Complete(standings) = manager.advance(cup.id, &mut KeepOrder).await? else {
//!         unreachable!("a two-player bracket ends after one match");
//!     };
//!     assert_eq!(standings.champion.name, "Ann");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod manager;

pub use config::{DEFAULT_POSITIONS, TournamentDefaults};
pub use manager::{RoundOutcome, TournamentManager};
