//! Tournament manager driving the bracket engine against a repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::config::TournamentDefaults;
use crate::bracket::{
    Advancement, BracketError, BracketResult, BracketShape, FirstRoundPattern, Match, MatchId,
    MatchPosition, MatchType, NewMatch, Participant, ParticipantId, PatternKind, RoundView, Shuffler,
    SlotRequest, Standings, Tournament, TournamentId, first_round_patterns, progressor,
};
use crate::db::TournamentRepository;

/// What advancing a round produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The next round was (re)generated
    Created { round: u32, matches: Vec<Match> },
    /// The tournament is fully resolved
    Complete(Standings),
}

/// Tournament manager
///
/// All mutating operations on one tournament are serialized through a
/// per-tournament lock; different tournaments proceed independently.
pub struct TournamentManager<R: TournamentRepository> {
    /// Persistence collaborator
    repo: Arc<R>,

    /// Defaults for new tournaments
    defaults: TournamentDefaults,

    /// Per-tournament write locks.
    ///
    /// Holds one entry for every tournament this manager has written to and
    /// is never pruned, so memory grows with the number of tournaments touched
    /// over the manager's lifetime.
    locks: Arc<RwLock<HashMap<TournamentId, Arc<Mutex<()>>>>>,
}

impl<R: TournamentRepository> Clone for TournamentManager<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            defaults: self.defaults.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<R: TournamentRepository> TournamentManager<R> {
    /// Create a new tournament manager
    pub fn new(repo: Arc<R>) -> Self {
        Self::with_defaults(repo, TournamentDefaults::default())
    }

    /// Create a manager with explicit tournament defaults
    pub fn with_defaults(repo: Arc<R>, defaults: TournamentDefaults) -> Self {
        Self {
            repo,
            defaults,
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The underlying repository
    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    async fn lock_for(&self, tournament_id: TournamentId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(&tournament_id) {
            return lock.clone();
        }
        self.locks
            .write()
            .await
            .entry(tournament_id)
            .or_default()
            .clone()
    }

    /// Create a tournament using the configured position labels
    pub async fn create_tournament(&self, name: &str, description: &str) -> BracketResult<Tournament> {
        let tournament = self
            .repo
            .create_tournament(name, description, &self.defaults.positions)
            .await?;
        log::info!("Created tournament {} '{}'", tournament.id, tournament.name);
        Ok(tournament)
    }

    /// Load a tournament with its participants
    pub async fn tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.repo.load_tournament(tournament_id).await
    }

    /// Register a participant before the bracket is seeded
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidInput` - blank name, or round 1 already exists
    pub async fn register_participant(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> BracketResult<Participant> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        if !self.repo.list_matches(tournament_id, Some(1)).await?.is_empty() {
            return Err(BracketError::InvalidInput(
                "registration is closed once the bracket is seeded".to_string(),
            ));
        }
        self.repo.add_participant(tournament_id, name).await
    }

    /// Remove a participant that no match refers to
    pub async fn remove_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> BracketResult<()> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let tournament = self.repo.load_tournament(tournament_id).await?;
        if tournament.participant(participant_id).is_none() {
            return Err(BracketError::ParticipantNotFound(participant_id));
        }
        self.repo.remove_participant(participant_id).await
    }

    /// Candidate first-round layouts for the current field. Nothing is stored.
    pub async fn preview_first_round(
        &self,
        tournament_id: TournamentId,
        shuffler: &mut dyn Shuffler,
    ) -> BracketResult<Vec<FirstRoundPattern>> {
        let tournament = self.repo.load_tournament(tournament_id).await?;
        let mut order = tournament.participants;
        shuffler.shuffle(&mut order);
        first_round_patterns(&order)
    }

    /// Persist a caller-chosen first round, replacing any existing bracket.
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidInput` - wrong slot count, a slot without
    ///   `player1`, a participant placed twice or not at all
    /// * `BracketError::ParticipantNotFound` - a slot names an outsider
    pub async fn seed_first_round(
        &self,
        tournament_id: TournamentId,
        slots: Vec<SlotRequest>,
    ) -> BracketResult<Vec<Match>> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let tournament = self.repo.load_tournament(tournament_id).await?;
        self.store_first_round(&tournament, &slots).await
    }

    /// Shuffle the field, generate the candidates and persist the one of `kind`
    pub async fn seed_with_pattern(
        &self,
        tournament_id: TournamentId,
        kind: PatternKind,
        shuffler: &mut dyn Shuffler,
    ) -> BracketResult<Vec<Match>> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let tournament = self.repo.load_tournament(tournament_id).await?;
        let mut order = tournament.participants.clone();
        shuffler.shuffle(&mut order);

        let pattern = first_round_patterns(&order)?
            .into_iter()
            .find(|p| p.kind == kind)
            .ok_or_else(|| {
                BracketError::InvalidInput(format!(
                    "{} layout is not available for {} participants",
                    kind.label(),
                    order.len()
                ))
            })?;

        self.store_first_round(&tournament, &pattern.to_requests())
            .await
    }

    async fn store_first_round(
        &self,
        tournament: &Tournament,
        slots: &[SlotRequest],
    ) -> BracketResult<Vec<Match>> {
        let new_matches = validate_first_round(tournament, slots)?;
        let created = self.repo.replace_round(tournament.id, 1, new_matches).await?;

        log::info!(
            "Seeded tournament {} with {} first-round slot(s), {} bye(s)",
            tournament.id,
            created.len(),
            created
                .iter()
                .filter(|m| m.match_type == MatchType::Bye)
                .count()
        );
        Ok(created)
    }

    /// Generate round `round + 1` from completed round `round`.
    ///
    /// Any existing matches after `round` are replaced, so repeating the call
    /// never duplicates a round.
    pub async fn advance_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
        shuffler: &mut dyn Shuffler,
    ) -> BracketResult<RoundOutcome> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        self.advance_locked(tournament_id, round, shuffler).await
    }

    /// Advance from the latest round
    pub async fn advance(
        &self,
        tournament_id: TournamentId,
        shuffler: &mut dyn Shuffler,
    ) -> BracketResult<RoundOutcome> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let round = self
            .latest_round(tournament_id)
            .await?
            .ok_or_else(|| BracketError::InvalidInput("bracket has not been seeded".to_string()))?;
        self.advance_locked(tournament_id, round, shuffler).await
    }

    async fn advance_locked(
        &self,
        tournament_id: TournamentId,
        round: u32,
        shuffler: &mut dyn Shuffler,
    ) -> BracketResult<RoundOutcome> {
        let matches = self.repo.list_matches(tournament_id, Some(round)).await?;
        if matches.is_empty() {
            return Err(BracketError::InvalidInput(format!(
                "round {round} has not been generated"
            )));
        }

        match progressor::advance(round, &matches, shuffler)? {
            Advancement::Complete(standings) => {
                log::info!(
                    "Tournament {} complete: champion {}",
                    tournament_id,
                    standings.champion.name
                );
                Ok(RoundOutcome::Complete(standings))
            }
            Advancement::NextRound {
                round: next,
                matches: new_matches,
            } => {
                let discarded = self
                    .repo
                    .list_matches(tournament_id, Some(next))
                    .await?
                    .iter()
                    .filter(|m| m.is_decided() && m.match_type != MatchType::Bye)
                    .count();
                if discarded > 0 {
                    log::warn!(
                        "Regenerating round {next} of tournament {tournament_id} discards {discarded} recorded result(s)"
                    );
                }

                let created = self
                    .repo
                    .replace_round(tournament_id, next, new_matches)
                    .await?;
                log::info!(
                    "Generated round {next} of tournament {tournament_id} with {} match(es)",
                    created.len()
                );
                Ok(RoundOutcome::Created {
                    round: next,
                    matches: created,
                })
            }
        }
    }

    /// Record the winner of a match. Only the first recording is accepted.
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - no such match in this tournament
    /// * `BracketError::AlreadyDecided` - a winner is already recorded
    /// * `BracketError::InvalidWinner` - `winner_id` did not play in the match
    pub async fn record_winner(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner_id: ParticipantId,
    ) -> BracketResult<Match> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        self.require_match(tournament_id, match_id).await?;
        let updated = self.repo.record_winner(match_id, winner_id).await?;
        log::debug!(
            "Recorded winner {} for match {} (round {})",
            winner_id,
            match_id,
            updated.round
        );
        Ok(updated)
    }

    /// Give a participant of a contested match one of the tournament's
    /// position labels, replacing the label it had in that match.
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - no such match in this tournament
    /// * `BracketError::InvalidInput` - unknown label, a bye, or a participant
    ///   who does not play in the match
    pub async fn set_position(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        participant_id: ParticipantId,
        label: &str,
    ) -> BracketResult<MatchPosition> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let tournament = self.repo.load_tournament(tournament_id).await?;
        let label = label.trim();
        if !tournament.positions.iter().any(|p| p == label) {
            return Err(BracketError::InvalidInput(format!(
                "'{label}' is not a position of tournament {tournament_id}"
            )));
        }
        self.require_match(tournament_id, match_id).await?;

        let position = self
            .repo
            .set_position(match_id, participant_id, label)
            .await?;
        log::debug!("Placed {participant_id} at {label} in match {match_id}");
        Ok(position)
    }

    /// Position labels of a match in this tournament
    pub async fn positions(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Vec<MatchPosition>> {
        self.require_match(tournament_id, match_id).await?;
        self.repo.list_positions(match_id).await
    }

    async fn require_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<()> {
        let belongs = self
            .repo
            .list_matches(tournament_id, None)
            .await?
            .iter()
            .any(|m| m.id == match_id);
        if !belongs {
            return Err(BracketError::MatchNotFound(match_id));
        }
        Ok(())
    }

    /// Final placement, or `None` while play continues
    pub async fn standings(&self, tournament_id: TournamentId) -> BracketResult<Option<Standings>> {
        let Some(round) = self.latest_round(tournament_id).await? else {
            return Ok(None);
        };
        let matches = self.repo.list_matches(tournament_id, Some(round)).await?;

        match progressor::terminal_standings(round, &matches) {
            Err(BracketError::NotReady { .. }) => Ok(None),
            other => other,
        }
    }

    /// Every match grouped by round
    pub async fn bracket(&self, tournament_id: TournamentId) -> BracketResult<Vec<RoundView>> {
        let mut rounds: Vec<RoundView> = Vec::new();
        for m in self.repo.list_matches(tournament_id, None).await? {
            match rounds.last_mut() {
                Some(view) if view.round == m.round => view.matches.push(m),
                _ => rounds.push(RoundView {
                    round: m.round,
                    matches: vec![m],
                }),
            }
        }
        Ok(rounds)
    }

    async fn latest_round(&self, tournament_id: TournamentId) -> BracketResult<Option<u32>> {
        self.repo.load_tournament(tournament_id).await?;
        Ok(self
            .repo
            .list_matches(tournament_id, None)
            .await?
            .iter()
            .map(|m| m.round)
            .max())
    }
}

/// Check a caller-supplied first round against the field and bracket shape
fn validate_first_round(
    tournament: &Tournament,
    slots: &[SlotRequest],
) -> BracketResult<Vec<NewMatch>> {
    let shape = BracketShape::for_participants(tournament.participants.len())?;
    if slots.len() != shape.slots {
        return Err(BracketError::InvalidInput(format!(
            "{} participants need {} first-round slots, got {}",
            shape.participants,
            shape.slots,
            slots.len()
        )));
    }

    let mut placed = HashSet::with_capacity(shape.participants);
    let mut place = |id: ParticipantId| {
        if tournament.participant(id).is_none() {
            return Err(BracketError::ParticipantNotFound(id));
        }
        if !placed.insert(id) {
            return Err(BracketError::InvalidInput(format!(
                "participant {id} is placed more than once"
            )));
        }
        Ok(id)
    };

    let mut new_matches = Vec::with_capacity(slots.len());
    for (idx, slot) in slots.iter().enumerate() {
        let player1 = slot.player1.ok_or_else(|| {
            BracketError::InvalidInput(format!("slot {idx} has no first player"))
        })?;
        let player1 = place(player1)?;
        let new_match = match slot.player2 {
            Some(player2) => NewMatch::normal(player1, place(player2)?),
            None => NewMatch::bye(player1),
        };
        new_matches.push(new_match);
    }

    let unplaced = shape.participants - placed.len();
    if unplaced > 0 {
        return Err(BracketError::InvalidInput(format!(
            "{unplaced} participant(s) have no first-round slot"
        )));
    }

    Ok(new_matches)
}
