//! Bracket data models: participants, matches, tournaments and seeding slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

use super::errors::{BracketError, BracketResult};

/// Tournament ID type
pub type TournamentId = Uuid;

/// Participant ID type
pub type ParticipantId = Uuid;

/// Match ID type
pub type MatchId = Uuid;

/// A registered participant.
///
/// Identity is by `id` only; the name is a mutable label with no uniqueness
/// constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Participant ID
    pub id: ParticipantId,
    /// Display name
    pub name: String,
}

impl Participant {
    /// Create a participant with a fresh ID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Participant {}

impl Hash for Participant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Kind of match within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Contested match between two participants
    Normal,
    /// Uncontested advancement of a single participant
    Bye,
    /// Match between the two semifinal losers
    ThirdPlace,
}

impl MatchType {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Normal => "normal",
            MatchType::Bye => "bye",
            MatchType::ThirdPlace => "third_place",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(MatchType::Normal),
            "bye" => Some(MatchType::Bye),
            "third_place" => Some(MatchType::ThirdPlace),
            _ => None,
        }
    }
}

/// A match as stored by the persistence layer.
///
/// A bye has `player1 == player2 == winner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match ID
    pub id: MatchId,
    /// Owning tournament
    pub tournament_id: TournamentId,
    /// Round number (1-indexed)
    pub round: u32,
    /// Match type
    pub match_type: MatchType,
    /// First participant
    pub player1: Participant,
    /// Second participant (equal to `player1` for a bye)
    pub player2: Participant,
    /// Recorded winner
    pub winner: Option<Participant>,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Whether a winner has been recorded
    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    /// Whether the participant occupies either slot
    pub fn involves(&self, participant_id: ParticipantId) -> bool {
        self.player1.id == participant_id || self.player2.id == participant_id
    }

    /// The non-winner of a decided, contested match.
    ///
    /// Byes and undecided matches have no loser.
    pub fn loser(&self) -> Option<&Participant> {
        if self.match_type == MatchType::Bye {
            return None;
        }
        let winner = self.winner.as_ref()?;
        if winner.id == self.player1.id {
            Some(&self.player2)
        } else {
            Some(&self.player1)
        }
    }
}

/// Position label held by one participant of a contested match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPosition {
    pub match_id: MatchId,
    pub participant_id: ParticipantId,
    pub label: String,
}

/// A tournament together with its registered participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Tournament name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Display labels for the sides of a match (e.g. compass points)
    pub positions: Vec<String>,
    /// Registered participants in registration order
    pub participants: Vec<Participant>,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    /// Look up a registered participant
    pub fn participant(&self, participant_id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }
}

/// One first-round slot produced by the seeder. `player2 = None` is a bye.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlot {
    pub player1: Participant,
    pub player2: Option<Participant>,
}

impl BracketSlot {
    pub fn is_bye(&self) -> bool {
        self.player2.is_none()
    }
}

/// Candidate first-round layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Power-of-two field, consecutive pairs, no byes
    NoSeedBaseline,
    /// Byes spread evenly across the slots
    DistributedBye,
    /// Byes packed into the last slots
    ConcentratedBye,
}

impl PatternKind {
    /// Human-readable candidate name
    pub fn label(&self) -> &'static str {
        match self {
            PatternKind::NoSeedBaseline => "no-seed baseline",
            PatternKind::DistributedBye => "distributed-bye",
            PatternKind::ConcentratedBye => "concentrated-bye",
        }
    }
}

/// A named candidate layout for round 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstRoundPattern {
    pub kind: PatternKind,
    pub slots: Vec<BracketSlot>,
}

impl FirstRoundPattern {
    /// Candidate name
    pub fn name(&self) -> &'static str {
        self.kind.label()
    }

    /// Number of bye slots
    pub fn bye_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_bye()).count()
    }

    /// Every placed participant, slot by slot
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.slots
            .iter()
            .flat_map(|slot| std::iter::once(&slot.player1).chain(slot.player2.as_ref()))
    }

    /// Convert into persistable slot requests
    pub fn to_requests(&self) -> Vec<SlotRequest> {
        self.slots.iter().map(SlotRequest::from).collect()
    }
}

/// Caller-chosen first-round slot, by participant ID.
///
/// `player2 = None` requests a bye. `player1 = None` is malformed and is
/// rejected at seeding time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequest {
    pub player1: Option<ParticipantId>,
    pub player2: Option<ParticipantId>,
}

impl From<&BracketSlot> for SlotRequest {
    fn from(slot: &BracketSlot) -> Self {
        Self {
            player1: Some(slot.player1.id),
            player2: slot.player2.as_ref().map(|p| p.id),
        }
    }
}

/// A match to be created by the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub player1: ParticipantId,
    pub player2: Option<ParticipantId>,
    pub match_type: MatchType,
    pub winner: Option<ParticipantId>,
}

impl NewMatch {
    /// Contested match
    pub fn normal(player1: ParticipantId, player2: ParticipantId) -> Self {
        Self {
            player1,
            player2: Some(player2),
            match_type: MatchType::Normal,
            winner: None,
        }
    }

    /// Bye, auto-resolved in favor of its sole occupant
    pub fn bye(player: ParticipantId) -> Self {
        Self {
            player1: player,
            player2: None,
            match_type: MatchType::Bye,
            winner: Some(player),
        }
    }

    /// Third-place match between two semifinal losers
    pub fn third_place(player1: ParticipantId, player2: ParticipantId) -> Self {
        Self {
            player1,
            player2: Some(player2),
            match_type: MatchType::ThirdPlace,
            winner: None,
        }
    }

    /// Normalize into the stored shape.
    ///
    /// A missing `player2` always becomes a bye with `player2 = winner = player1`.
    pub fn resolve(self) -> BracketResult<ResolvedMatch> {
        let Some(player2) = self.player2 else {
            if let Some(winner) = self.winner
                && winner != self.player1
            {
                return Err(BracketError::InvalidWinner {
                    match_id: None,
                    winner_id: winner,
                });
            }
            return Ok(ResolvedMatch {
                match_type: MatchType::Bye,
                player1: self.player1,
                player2: self.player1,
                winner: Some(self.player1),
            });
        };

        match self.match_type {
            MatchType::Bye if player2 != self.player1 => {
                return Err(BracketError::InvalidInput(
                    "a bye must have a single occupant".to_string(),
                ));
            }
            MatchType::Bye => {
                return Ok(ResolvedMatch {
                    match_type: MatchType::Bye,
                    player1: self.player1,
                    player2: self.player1,
                    winner: Some(self.player1),
                });
            }
            _ if player2 == self.player1 => {
                return Err(BracketError::InvalidInput(format!(
                    "participant {} cannot play against themselves",
                    self.player1
                )));
            }
            _ => {}
        }

        if let Some(winner) = self.winner
            && winner != self.player1
            && winner != player2
        {
            return Err(BracketError::InvalidWinner {
                match_id: None,
                winner_id: winner,
            });
        }

        Ok(ResolvedMatch {
            match_type: self.match_type,
            player1: self.player1,
            player2,
            winner: self.winner,
        })
    }
}

/// A `NewMatch` after normalization, ready to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub match_type: MatchType,
    pub player1: ParticipantId,
    pub player2: ParticipantId,
    pub winner: Option<ParticipantId>,
}

/// Final placement of a resolved tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    /// 1st place
    pub champion: Participant,
    /// 2nd place (loser of the final)
    pub runner_up: Option<Participant>,
    /// 3rd place (winner of the third-place match)
    pub third: Option<Participant>,
}

/// Result of evaluating a completed round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancement {
    /// Matches to create for the following round
    NextRound { round: u32, matches: Vec<NewMatch> },
    /// The tournament is fully resolved
    Complete(Standings),
}

/// Progress state of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    /// At least one match lacks a winner
    InProgress { round: u32, pending: usize },
    /// Every match has a winner
    Complete { round: u32 },
}

/// Matches of one round, in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub round: u32,
    pub matches: Vec<Match>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decided(match_type: MatchType, p1: &Participant, p2: &Participant, winner: &Participant) -> Match {
        Match {
            id: Uuid::new_v4(),
            tournament_id: Uuid::new_v4(),
            round: 1,
            match_type,
            player1: p1.clone(),
            player2: p2.clone(),
            winner: Some(winner.clone()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_participant_identity_is_by_id() {
        let alice = Participant::new("Alice");
        let mut renamed = alice.clone();
        renamed.name = "Alicia".to_string();
        assert_eq!(alice, renamed);
        assert_ne!(alice, Participant::new("Alice"));
    }

    #[test]
    fn test_match_type_storage_names() {
        for kind in [MatchType::Normal, MatchType::Bye, MatchType::ThirdPlace] {
            assert_eq!(MatchType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MatchType::parse("final"), None);
    }

    #[test]
    fn test_loser_of_decided_match() {
        let a = Participant::new("A");
        let b = Participant::new("B");
        let m = decided(MatchType::Normal, &a, &b, &b);
        assert_eq!(m.loser(), Some(&a));
    }

    #[test]
    fn test_bye_has_no_loser() {
        let a = Participant::new("A");
        let m = decided(MatchType::Bye, &a, &a, &a);
        assert_eq!(m.loser(), None);
    }

    #[test]
    fn test_missing_player2_resolves_to_bye() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let request = NewMatch {
            player1: id,
            player2: None,
            match_type: MatchType::Normal,
            winner: None,
        };
        let resolved = request.resolve().expect("bye should resolve");
        assert_eq!(resolved.match_type, MatchType::Bye);
        assert_eq!(resolved.player2, id);
        assert_eq!(resolved.winner, Some(id));

        let bad = NewMatch {
            winner: Some(other),
            ..request
        };
        assert!(matches!(
            bad.resolve(),
            Err(BracketError::InvalidWinner { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_self_pairing_and_foreign_winner() {
        let a = Uuid::new_v4();
        assert!(matches!(
            NewMatch::normal(a, a).resolve(),
            Err(BracketError::InvalidInput(_))
        ));

        let mut m = NewMatch::normal(a, Uuid::new_v4());
        m.winner = Some(Uuid::new_v4());
        assert!(matches!(
            m.resolve(),
            Err(BracketError::InvalidWinner { .. })
        ));
    }

    #[test]
    fn test_pattern_participants_iterates_both_slots() {
        let a = Participant::new("A");
        let b = Participant::new("B");
        let c = Participant::new("C");
        let pattern = FirstRoundPattern {
            kind: PatternKind::DistributedBye,
            slots: vec![
                BracketSlot {
                    player1: a.clone(),
                    player2: None,
                },
                BracketSlot {
                    player1: b.clone(),
                    player2: Some(c.clone()),
                },
            ],
        };
        let placed: Vec<_> = pattern.participants().cloned().collect();
        assert_eq!(placed, vec![a, b, c]);
        assert_eq!(pattern.bye_count(), 1);
        assert_eq!(pattern.name(), "distributed-bye");
        assert_eq!(pattern.to_requests()[0].player2, None);
    }
}
