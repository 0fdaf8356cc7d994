//! Repository trait definitions for testability and dependency injection.
//!
//! [`TournamentRepository`] is the persistence contract the bracket manager
//! drives. [`PgTournamentRepository`] backs it with PostgreSQL; the in-memory
//! implementation lives in [`super::memory`].

#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::bracket::{
    BracketError, BracketResult, Match, MatchId, MatchPosition, MatchType, NewMatch, Participant,
    ParticipantId, Tournament, TournamentId,
};

/// Trait for tournament, participant and match persistence
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Create a tournament with no participants
    async fn create_tournament(
        &self,
        name: &str,
        description: &str,
        positions: &[String],
    ) -> BracketResult<Tournament>;

    /// Load a tournament and its participants
    async fn load_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament>;

    /// Register a participant
    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> BracketResult<Participant>;

    /// Change a participant's display name
    async fn rename_participant(
        &self,
        participant_id: ParticipantId,
        name: &str,
    ) -> BracketResult<Participant>;

    /// Remove a participant no match refers to
    async fn remove_participant(&self, participant_id: ParticipantId) -> BracketResult<()>;

    /// List matches ordered by round, then creation order
    async fn list_matches(
        &self,
        tournament_id: TournamentId,
        round: Option<u32>,
    ) -> BracketResult<Vec<Match>>;

    /// Append matches to a round.
    ///
    /// `round` may be at most one past the latest stored round, and the
    /// tournament keeps at most one third-place match.
    async fn create_matches(
        &self,
        tournament_id: TournamentId,
        round: u32,
        matches: Vec<NewMatch>,
    ) -> BracketResult<Vec<Match>>;

    /// Atomically delete every match in `round` and later, then create `matches`.
    ///
    /// Placement rules are those of `create_matches`, applied to the rounds
    /// before `round`.
    async fn replace_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
        matches: Vec<NewMatch>,
    ) -> BracketResult<Vec<Match>>;

    /// Record a winner if none is recorded yet
    async fn record_winner(
        &self,
        match_id: MatchId,
        winner_id: ParticipantId,
    ) -> BracketResult<Match>;

    /// Delete the matches of one round, or all of them
    async fn delete_matches(
        &self,
        tournament_id: TournamentId,
        round: Option<u32>,
    ) -> BracketResult<u64>;

    /// Give a participant of a contested match a position label, replacing
    /// any label it already had in that match
    async fn set_position(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        label: &str,
    ) -> BracketResult<MatchPosition>;

    /// Position labels of a match, in assignment order
    async fn list_positions(&self, match_id: MatchId) -> BracketResult<Vec<MatchPosition>>;
}

/// Reject blank names
pub(crate) fn require_name(kind: &str, name: &str) -> BracketResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BracketError::InvalidInput(format!("{kind} name is required")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn require_round(round: u32) -> BracketResult<()> {
    if round == 0 {
        return Err(BracketError::InvalidInput(
            "rounds are numbered from 1".to_string(),
        ));
    }
    Ok(())
}

/// Check new matches against the rounds that stay in place.
///
/// `latest_kept` is the highest kept round, `kept_third_place` the number of
/// kept third-place matches.
pub(crate) fn check_placement(
    round: u32,
    latest_kept: Option<u32>,
    kept_third_place: usize,
    matches: &[NewMatch],
) -> BracketResult<()> {
    require_round(round)?;

    let next = latest_kept.map_or(1, |latest| latest + 1);
    if round > next {
        return Err(BracketError::InvalidInput(format!(
            "round {round} cannot be created before round {next}"
        )));
    }

    let third_place = matches
        .iter()
        .filter(|m| m.match_type == MatchType::ThirdPlace)
        .count();
    if kept_third_place + third_place > 1 {
        return Err(BracketError::InconsistentBracket(
            "a tournament has at most one third-place match".to_string(),
        ));
    }

    Ok(())
}

/// Check that `participant_id` may hold a position in `m`
pub(crate) fn check_position(m: &Match, participant_id: ParticipantId) -> BracketResult<()> {
    if m.match_type == MatchType::Bye {
        return Err(BracketError::InvalidInput(format!(
            "match {} is a bye and has no positions",
            m.id
        )));
    }
    if !m.involves(participant_id) {
        return Err(BracketError::InvalidInput(format!(
            "participant {participant_id} does not play in match {}",
            m.id
        )));
    }
    Ok(())
}

const MATCH_SELECT: &str = r#"
    SELECT m.id, m.tournament_id, m.round, m.match_type, m.created_at,
           p1.id AS p1_id, p1.name AS p1_name,
           p2.id AS p2_id, p2.name AS p2_name,
           w.id AS w_id, w.name AS w_name
    FROM matches m
    JOIN participants p1 ON p1.id = m.player1_id
    JOIN participants p2 ON p2.id = m.player2_id
    LEFT JOIN participants w ON w.id = m.winner_id
"#;

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn match_from_row(row: &PgRow) -> BracketResult<Match> {
        let match_type: String = row.get("match_type");
        let match_type = MatchType::parse(&match_type).ok_or_else(|| {
            BracketError::InconsistentBracket(format!("unknown match type '{match_type}'"))
        })?;
        let round: i32 = row.get("round");

        let winner = match row.get::<Option<Uuid>, _>("w_id") {
            Some(id) => Some(Participant {
                id,
                name: row.get("w_name"),
            }),
            None => None,
        };

        Ok(Match {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            round: round as u32,
            match_type,
            player1: Participant {
                id: row.get("p1_id"),
                name: row.get("p1_name"),
            },
            player2: Participant {
                id: row.get("p2_id"),
                name: row.get("p2_name"),
            },
            winner,
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        })
    }

    async fn fetch_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let row = sqlx::query(&format!("{MATCH_SELECT} WHERE m.id = $1"))
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::match_from_row).transpose()
    }

    /// Lock the tournament row so concurrent writers queue behind this transaction
    async fn lock_tournament(
        tx: &mut Transaction<'_, Postgres>,
        tournament_id: TournamentId,
    ) -> BracketResult<()> {
        sqlx::query("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
            .bind(tournament_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        Ok(())
    }

    async fn insert_matches(
        tx: &mut Transaction<'_, Postgres>,
        tournament_id: TournamentId,
        round: u32,
        matches: Vec<NewMatch>,
    ) -> BracketResult<()> {
        let kept = sqlx::query(
            r#"
            SELECT MAX(round) AS latest,
                   COUNT(*) FILTER (WHERE match_type = 'third_place') AS third_place
            FROM matches WHERE tournament_id = $1
            "#,
        )
        .bind(tournament_id)
        .fetch_one(&mut **tx)
        .await?;
        check_placement(
            round,
            kept.get::<Option<i32>, _>("latest").map(|r| r as u32),
            kept.get::<i64, _>("third_place") as usize,
            &matches,
        )?;

        let next_slot: i32 = sqlx::query(
            "SELECT COALESCE(MAX(slot) + 1, 0) AS next_slot FROM matches WHERE tournament_id = $1 AND round = $2",
        )
        .bind(tournament_id)
        .bind(round as i32)
        .fetch_one(&mut **tx)
        .await?
        .get("next_slot");

        for (offset, new_match) in matches.into_iter().enumerate() {
            let resolved = new_match.resolve()?;
            for participant in [resolved.player1, resolved.player2] {
                let registered = sqlx::query(
                    "SELECT 1 FROM participants WHERE id = $1 AND tournament_id = $2",
                )
                .bind(participant)
                .bind(tournament_id)
                .fetch_optional(&mut **tx)
                .await?;
                if registered.is_none() {
                    return Err(BracketError::ParticipantNotFound(participant));
                }
            }

            sqlx::query(
                r#"
                INSERT INTO matches (id, tournament_id, round, slot, match_type, player1_id, player2_id, winner_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(tournament_id)
            .bind(round as i32)
            .bind(next_slot + offset as i32)
            .bind(resolved.match_type.as_str())
            .bind(resolved.player1)
            .bind(resolved.player2)
            .bind(resolved.winner)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn create_tournament(
        &self,
        name: &str,
        description: &str,
        positions: &[String],
    ) -> BracketResult<Tournament> {
        let name = require_name("tournament", name)?;
        let id = Uuid::new_v4();
        let positions_json = serde_json::to_value(positions)?;

        let row = sqlx::query(
            r#"
            INSERT INTO tournaments (id, name, description, positions)
            VALUES ($1, $2, $3, $4)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(description)
        .bind(positions_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(Tournament {
            id,
            name,
            description: description.to_string(),
            positions: positions.to_vec(),
            participants: Vec::new(),
            created_at: row.get("created_at"),
        })
    }

    async fn load_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        let row = sqlx::query(
            "SELECT id, name, description, positions, created_at FROM tournaments WHERE id = $1",
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;

        let positions: Vec<String> = serde_json::from_value(row.get("positions"))?;

        let participants = sqlx::query(
            "SELECT id, name FROM participants WHERE tournament_id = $1 ORDER BY seq",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| Participant {
            id: r.get("id"),
            name: r.get("name"),
        })
        .collect();

        Ok(Tournament {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            positions,
            participants,
            created_at: row.get("created_at"),
        })
    }

    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> BracketResult<Participant> {
        let name = require_name("participant", name)?;
        let id = Uuid::new_v4();

        let inserted = sqlx::query(
            r#"
            INSERT INTO participants (id, tournament_id, name)
            SELECT $1, id, $3 FROM tournaments WHERE id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(tournament_id)
        .bind(&name)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_none() {
            return Err(BracketError::TournamentNotFound(tournament_id));
        }

        Ok(Participant { id, name })
    }

    async fn rename_participant(
        &self,
        participant_id: ParticipantId,
        name: &str,
    ) -> BracketResult<Participant> {
        let name = require_name("participant", name)?;

        let result = sqlx::query("UPDATE participants SET name = $1 WHERE id = $2")
            .bind(&name)
            .bind(participant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::ParticipantNotFound(participant_id));
        }

        Ok(Participant {
            id: participant_id,
            name,
        })
    }

    async fn remove_participant(&self, participant_id: ParticipantId) -> BracketResult<()> {
        let mut tx = self.pool.begin().await?;

        let referenced = sqlx::query(
            "SELECT 1 FROM matches WHERE player1_id = $1 OR player2_id = $1 LIMIT 1",
        )
        .bind(participant_id)
        .fetch_optional(&mut *tx)
        .await?;

        if referenced.is_some() {
            return Err(BracketError::ParticipantInUse(participant_id));
        }

        let result = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(participant_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::ParticipantNotFound(participant_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_matches(
        &self,
        tournament_id: TournamentId,
        round: Option<u32>,
    ) -> BracketResult<Vec<Match>> {
        let rows = match round {
            Some(round) => {
                sqlx::query(&format!(
                    "{MATCH_SELECT} WHERE m.tournament_id = $1 AND m.round = $2 ORDER BY m.round, m.slot"
                ))
                .bind(tournament_id)
                .bind(round as i32)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{MATCH_SELECT} WHERE m.tournament_id = $1 ORDER BY m.round, m.slot"
                ))
                .bind(tournament_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::match_from_row).collect()
    }

    async fn create_matches(
        &self,
        tournament_id: TournamentId,
        round: u32,
        matches: Vec<NewMatch>,
    ) -> BracketResult<Vec<Match>> {
        require_round(round)?;
        let mut tx = self.pool.begin().await?;
        Self::lock_tournament(&mut tx, tournament_id).await?;
        Self::insert_matches(&mut tx, tournament_id, round, matches).await?;
        tx.commit().await?;

        self.list_matches(tournament_id, Some(round)).await
    }

    async fn replace_round(
        &self,
        tournament_id: TournamentId,
        round: u32,
        matches: Vec<NewMatch>,
    ) -> BracketResult<Vec<Match>> {
        require_round(round)?;
        let mut tx = self.pool.begin().await?;
        Self::lock_tournament(&mut tx, tournament_id).await?;

        let deleted = sqlx::query("DELETE FROM matches WHERE tournament_id = $1 AND round >= $2")
            .bind(tournament_id)
            .bind(round as i32)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        Self::insert_matches(&mut tx, tournament_id, round, matches).await?;
        tx.commit().await?;

        if deleted > 0 {
            log::debug!(
                "replaced {deleted} match(es) from round {round} onward in tournament {tournament_id}"
            );
        }

        self.list_matches(tournament_id, Some(round)).await
    }

    async fn record_winner(
        &self,
        match_id: MatchId,
        winner_id: ParticipantId,
    ) -> BracketResult<Match> {
        let updated = sqlx::query(
            r#"
            UPDATE matches
            SET winner_id = $2
            WHERE id = $1 AND winner_id IS NULL AND (player1_id = $2 OR player2_id = $2)
            RETURNING id
            "#,
        )
        .bind(match_id)
        .bind(winner_id)
        .fetch_optional(&self.pool)
        .await?;

        let current = self
            .fetch_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if updated.is_some() {
            return Ok(current);
        }

        if current.is_decided() {
            Err(BracketError::AlreadyDecided(match_id))
        } else {
            Err(BracketError::InvalidWinner {
                match_id: Some(match_id),
                winner_id,
            })
        }
    }

    async fn delete_matches(
        &self,
        tournament_id: TournamentId,
        round: Option<u32>,
    ) -> BracketResult<u64> {
        let result = match round {
            Some(round) => {
                sqlx::query("DELETE FROM matches WHERE tournament_id = $1 AND round = $2")
                    .bind(tournament_id)
                    .bind(round as i32)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
                    .bind(tournament_id)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn set_position(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        label: &str,
    ) -> BracketResult<MatchPosition> {
        let label = require_name("position", label)?;
        let m = self
            .fetch_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;
        check_position(&m, participant_id)?;

        sqlx::query(
            r#"
            INSERT INTO match_positions (match_id, participant_id, label)
            VALUES ($1, $2, $3)
            ON CONFLICT (match_id, participant_id) DO UPDATE SET label = EXCLUDED.label
            "#,
        )
        .bind(match_id)
        .bind(participant_id)
        .bind(&label)
        .execute(&self.pool)
        .await?;

        Ok(MatchPosition {
            match_id,
            participant_id,
            label,
        })
    }

    async fn list_positions(&self, match_id: MatchId) -> BracketResult<Vec<MatchPosition>> {
        if self.fetch_match(match_id).await?.is_none() {
            return Err(BracketError::MatchNotFound(match_id));
        }

        let rows = sqlx::query(
            "SELECT match_id, participant_id, label FROM match_positions WHERE match_id = $1 ORDER BY seq",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| MatchPosition {
                match_id: r.get("match_id"),
                participant_id: r.get("participant_id"),
                label: r.get("label"),
            })
            .collect())
    }
}
