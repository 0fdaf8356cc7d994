//! Bracket error types.

use thiserror::Error;

use super::models::{MatchId, ParticipantId, TournamentId};

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Too few participants, or a malformed pairing request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Advancement requested while the round still has undecided matches
    #[error("Round {round} is not complete: {pending} match(es) undecided")]
    NotReady { round: u32, pending: usize },

    /// Winner already recorded for this match
    #[error("Match {0} already has a winner")]
    AlreadyDecided(MatchId),

    /// Winner is neither of the match's participants
    #[error("Participant {winner_id} did not play in match {match_id:?}")]
    InvalidWinner {
        match_id: Option<MatchId>,
        winner_id: ParticipantId,
    },

    /// Stored matches contradict the bracket structure
    #[error("Inconsistent bracket: {0}")]
    InconsistentBracket(String),

    /// Tournament not found
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Match not found
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Participant not found
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Participant still referenced by a match
    #[error("Participant {0} is referenced by existing matches")]
    ParticipantInUse(ParticipantId),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BracketError {
    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::Serialization(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
