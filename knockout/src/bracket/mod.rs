//! Single-elimination bracket engine.
//!
//! The engine is a set of pure functions over match data:
//! - [`seeder`] lays a participant ordering into candidate first-round layouts
//!   of power-of-two size, filling the gaps with byes
//! - [`progressor`] turns a completed round into the next round, adds the
//!   third-place match after the semifinals, and detects the final standings
//! - [`shuffler`] supplies the pairing order, so tests can pin it down
//!
//! ## Example
//!
//! ```
//! use knockout::bracket::{Participant, PatternKind, first_round_patterns};
//!
//! let field: Vec<Participant> = ["Ann", "Ben", "Cho", "Dee", "Eve"]
//!     .into_iter()
//!     .map(Participant::new)
//!     .collect();
//!
//! let patterns = first_round_patterns(&field).unwrap();
//! assert_eq!(patterns.len(), 2);
//! assert_eq!(patterns[0].kind, PatternKind::DistributedBye);
//! assert_eq!(patterns[0].bye_count(), 3);
//! ```

pub mod errors;
pub mod models;
pub mod progressor;
pub mod seeder;
pub mod shape;
pub mod shuffler;

pub use errors::{BracketError, BracketResult};
pub use models::{
    Advancement, BracketSlot, FirstRoundPattern, Match, MatchId, MatchPosition, MatchType, NewMatch,
    Participant, ParticipantId, PatternKind, ResolvedMatch, RoundState, RoundView, SlotRequest,
    Standings, Tournament, TournamentId,
};
pub use progressor::{advance, round_state, terminal_standings};
pub use seeder::first_round_patterns;
pub use shape::BracketShape;
pub use shuffler::{KeepOrder, RandomShuffler, Shuffler};
