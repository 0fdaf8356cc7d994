//! In-memory `TournamentRepository` for tests and the simulator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::repository::{TournamentRepository, check_placement, check_position, require_name};
use crate::bracket::{
    BracketError, BracketResult, Match, MatchId, MatchPosition, MatchType, NewMatch, Participant,
    ParticipantId, Tournament, TournamentId,
};

/// Stored form of a match; participants are looked up on read so renames show
#[derive(Debug, Clone)]
struct StoredMatch {
    id: MatchId,
    round: u32,
    match_type: MatchType,
    player1: ParticipantId,
    player2: ParticipantId,
    winner: Option<ParticipantId>,
    created_at: DateTime<Utc>,
    /// Position labels in assignment order
    positions: Vec<(ParticipantId, String)>,
}

#[derive(Debug, Default)]
struct Store {
    tournaments: HashMap<TournamentId, Tournament>,
    /// Matches per tournament, in creation order
    matches: HashMap<TournamentId, Vec<StoredMatch>>,
}

impl Store {
    fn tournament(&self, tournament_id: TournamentId) -> BracketResult<&Tournament> {
        self.tournaments
            .get(&tournament_id)
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    fn owner_of(&self, participant_id: ParticipantId) -> Option<TournamentId> {
        self.tournaments
            .values()
            .find(|t| t.participant(participant_id).is_some())
            .map(|t| t.id)
    }

    fn hydrate(&self, tournament: &Tournament, stored: &StoredMatch) -> BracketResult<Match> {
        let lookup = |id: ParticipantId| {
            tournament.participant(id).cloned().ok_or_else(|| {
                BracketError::InconsistentBracket(format!(
                    "match {} refers to unknown participant {id}",
                    stored.id
                ))
            })
        };

        Ok(Match {
            id: stored.id,
            tournament_id: tournament.id,
            round: stored.round,
            match_type: stored.match_type,
            player1: lookup(stored.player1)?,
            player2: lookup(stored.player2)?,
            winner: stored.winner.map(lookup).transpose()?,
            created_at: stored.created_at,
        })
    }

    fn list(&self, tournament_id: TournamentId, round: Option<u32>) -> BracketResult<Vec<Match>> {
        let tournament = self.tournament(tournament_id)?;
        let mut stored: Vec<&StoredMatch> = self
            .matches
            .get(&tournament_id)
            .into_iter()
            .flatten()
            .filter(|m| round.is_none_or(|r| m.round == r))
            .collect();
        // Stable sort keeps creation order within a round
        stored.sort_by_key(|m| m.round);

        stored.into_iter().map(|m| self.hydrate(tournament, m)).collect()
    }

    fn find_match(&self, match_id: MatchId) -> BracketResult<(TournamentId, &StoredMatch)> {
        self.matches
            .iter()
            .find_map(|(tid, ms)| ms.iter().find(|m| m.id == match_id).map(|m| (*tid, m)))
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    fn find_match_mut(
        &mut self,
        match_id: MatchId,
    ) -> BracketResult<(TournamentId, &mut StoredMatch)> {
        self.matches
            .iter_mut()
            .find_map(|(tid, ms)| ms.iter_mut().find(|m| m.id == match_id).map(|m| (*tid, m)))
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    /// Validate every request before touching the store.
    ///
    /// `kept` selects the stored matches that survive the write.
    fn prepare(
        &self,
        tournament_id: TournamentId,
        round: u32,
        matches: Vec<NewMatch>,
        kept: impl Fn(&StoredMatch) -> bool,
    ) -> BracketResult<Vec<StoredMatch>> {
        let tournament = self.tournament(tournament_id)?;
        let survivors = || {
            self.matches
                .get(&tournament_id)
                .into_iter()
                .flatten()
                .filter(|m| kept(m))
        };
        check_placement(
            round,
            survivors().map(|m| m.round).max(),
            survivors()
                .filter(|m| m.match_type == MatchType::ThirdPlace)
                .count(),
            &matches,
        )?;
        let now = Utc::now();

        matches
            .into_iter()
            .map(|new_match| {
                let resolved = new_match.resolve()?;
                for participant in [resolved.player1, resolved.player2] {
                    if tournament.participant(participant).is_none() {
                        return Err(BracketError::ParticipantNotFound(participant));
                    }
                }
                Ok(StoredMatch {
                    id: Uuid::new_v4(),
                    round,
                    match_type: resolved.match_type,
                    player1: resolved.player1,
                    player2: resolved.player2,
                    winner: resolved.winner,
                    created_at: now,
                    positions: Vec::new(),
                })
            })
            .collect()
    }
}

/// Mutex-guarded in-memory store.
///
/// Every operation runs under one lock, so `replace_round` is atomic with
/// respect to concurrent readers.
#[derive(Debug, Default)]
pub struct InMemoryTournamentRepository {
    store: Mutex<Store>,
}

impl InMemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TournamentRepository for InMemoryTournamentRepository {
    async fn create_tournament(
        &self,
        name: &str,
        description: &str,
        positions: &[String],
    ) -> BracketResult<Tournament> {
        let tournament = Tournament {
            id: Uuid::new_v4(),
            name: require_name("tournament", name)?,
            description: description.to_string(),
            positions: positions.to_vec(),
            participants: Vec::new(),
            created_at: Utc::now(),
        };

        self.store()
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn load_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.store().tournament(tournament_id).cloned()
    }

    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> BracketResult<Participant> {
        let participant = Participant::new(require_name("participant", name)?);
        let mut store = self.store();
        let tournament = store
            .tournaments
            .get_mut(&tournament_id)
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        tournament.participants.push(participant.clone());
        Ok(participant)
    }

    async fn rename_participant(
        &self,
        participant_id: ParticipantId,
        name: &str,
    ) -> BracketResult<Participant> {
        let name = require_name("participant", name)?;
        let mut store = self.store();
        let participant = store
            .tournaments
            .values_mut()
            .flat_map(|t| t.participants.iter_mut())
            .find(|p| p.id == participant_id)
            .ok_or(BracketError::ParticipantNotFound(participant_id))?;
        participant.name = name;
        Ok(participant.clone())
    }

    async fn remove_participant(&self, participant_id: ParticipantId) -> BracketResult<()> {
        let mut store = self.store();
        let tournament_id = store
            .owner_of(participant_id)
            .ok_or(BracketError::ParticipantNotFound(participant_id))?;

        let referenced = store
            .matches
            .get(&tournament_id)
            .is_some_and(|ms| {
                ms.iter()
                    .any(|m| m.player1 == participant_id || m.player2 == participant_id)
            });
        if referenced {
            return Err(BracketError::ParticipantInUse(participant_id));
        }

        if let Some(tournament) = store.tournaments.get_mut(&tournament_id) {
            tournament.participants.retain(|p| p.id != participant_id);
        }
        Ok(())
    }

    async fn list_matches(
        &self,
        tournament_id: TournamentId,
        round: Option<u32>,
    ) -> BracketResult<Vec<Match>> {
        self.store().list(tournament_id, round)
    }

    async fn create_matches(
        &self,
        tournament_id: TournamentId,
        round: u32,
        matches: Vec<NewMatch>,
    ) -> BracketResult<Vec<Match>> {
        let mut store = self.store();
        let prepared = store.prepare(tournament_id, round, matches, |_| true)?;
        store
            .matches
            .entry(tournament_id)
            .or_default()
            .extend(prepared);
        store.list(tournament_id, Some(round))
    }

    async fn replace_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
        matches: Vec<NewMatch>,
    ) -> BracketResult<Vec<Match>> {
        let mut store = self.store();
        let prepared = store.prepare(tournament_id, round, matches, |m| m.round < round)?;
        let existing = store.matches.entry(tournament_id).or_default();
        existing.retain(|m| m.round < round);
        existing.extend(prepared);
        store.list(tournament_id, Some(round))
    }

    async fn record_winner(
        &self,
        match_id: MatchId,
        winner_id: ParticipantId,
    ) -> BracketResult<Match> {
        let mut store = self.store();
        let (tournament_id, stored) = store.find_match_mut(match_id)?;

        if stored.winner.is_some() {
            return Err(BracketError::AlreadyDecided(match_id));
        }
        if stored.player1 != winner_id && stored.player2 != winner_id {
            return Err(BracketError::InvalidWinner {
                match_id: Some(match_id),
                winner_id,
            });
        }
        stored.winner = Some(winner_id);
        let stored = stored.clone();

        let tournament = store.tournament(tournament_id)?;
        store.hydrate(tournament, &stored)
    }

    async fn delete_matches(
        &self,
        tournament_id: TournamentId,
        round: Option<u32>,
    ) -> BracketResult<u64> {
        let mut store = self.store();
        let Some(existing) = store.matches.get_mut(&tournament_id) else {
            return Ok(0);
        };
        let before = existing.len();
        existing.retain(|m| round.is_some_and(|r| m.round != r));
        Ok((before - existing.len()) as u64)
    }

    async fn set_position(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        label: &str,
    ) -> BracketResult<MatchPosition> {
        let label = require_name("position", label)?;
        let mut store = self.store();
        let (tournament_id, stored) = store.find_match(match_id)?;
        let tournament = store.tournament(tournament_id)?;
        check_position(&store.hydrate(tournament, stored)?, participant_id)?;

        let (_, stored) = store.find_match_mut(match_id)?;
        match stored.positions.iter_mut().find(|(id, _)| *id == participant_id) {
            Some((_, existing)) => existing.clone_from(&label),
            None => stored.positions.push((participant_id, label.clone())),
        }

        Ok(MatchPosition {
            match_id,
            participant_id,
            label,
        })
    }

    async fn list_positions(&self, match_id: MatchId) -> BracketResult<Vec<MatchPosition>> {
        let store = self.store();
        let (_, stored) = store.find_match(match_id)?;
        Ok(stored
            .positions
            .iter()
            .map(|(participant_id, label)| MatchPosition {
                match_id,
                participant_id: *participant_id,
                label: label.clone(),
            })
            .collect())
    }
}
