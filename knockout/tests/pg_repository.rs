//! Integration tests for the PostgreSQL repository.
//!
//! These need a running database (`DATABASE_URL`, default
//! `postgres://postgres@localhost/knockout_test`) and are ignored by default:
//! `cargo test -- --ignored`.

use knockout::bracket::{BracketError, MatchType, NewMatch, Tournament};
use knockout::db::{Database, DatabaseConfig, PgTournamentRepository, TournamentRepository};

/// Helper to create a repository over a migrated test database
async fn setup_repo() -> PgTournamentRepository {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/knockout_test".to_string());

    let config = DatabaseConfig {
        database_url,
        max_connections: 5,
        min_connections: 1,
        connection_timeout_secs: 5,
        idle_timeout_secs: 300,
        max_lifetime_secs: 1800,
    };

    let db = Database::new(&config)
        .await
        .expect("Failed to create test database");
    sqlx::raw_sql(include_str!("../migrations/001_initial_schema.sql"))
        .execute(db.pool())
        .await
        .expect("Failed to apply schema");

    db.repository()
}

async fn tournament_with_field(repo: &PgTournamentRepository, n: usize) -> Tournament {
    let positions = vec!["North".to_string(), "South".to_string()];
    let tournament = repo
        .create_tournament("pg test", "", &positions)
        .await
        .unwrap();
    for i in 0..n {
        repo.add_participant(tournament.id, &format!("P{i}")).await.unwrap();
    }
    repo.load_tournament(tournament.id).await.unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_tournament_round_trip() {
    let repo = setup_repo().await;
    let t = tournament_with_field(&repo, 3).await;

    assert_eq!(t.positions, vec!["North", "South"]);
    assert_eq!(
        t.participants.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["P0", "P1", "P2"]
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_bye_is_stored_decided() {
    let repo = setup_repo().await;
    let t = tournament_with_field(&repo, 3).await;
    let p = &t.participants;

    let created = repo
        .create_matches(t.id, 1, vec![NewMatch::bye(p[0].id), NewMatch::normal(p[1].id, p[2].id)])
        .await
        .unwrap();

    assert_eq!(created[0].match_type, MatchType::Bye);
    assert_eq!(created[0].player2, p[0]);
    assert_eq!(created[0].winner.as_ref(), Some(&p[0]));
    assert!(!created[1].is_decided());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_record_winner_only_once() {
    let repo = setup_repo().await;
    let t = tournament_with_field(&repo, 2).await;
    let p = &t.participants;

    let created = repo
        .create_matches(t.id, 1, vec![NewMatch::normal(p[0].id, p[1].id)])
        .await
        .unwrap();
    let m = &created[0];

    repo.record_winner(m.id, p[1].id).await.unwrap();
    assert!(matches!(
        repo.record_winner(m.id, p[0].id).await,
        Err(BracketError::AlreadyDecided(_))
    ));

    let stored = repo.list_matches(t.id, Some(1)).await.unwrap();
    assert_eq!(stored[0].winner.as_ref(), Some(&p[1]));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_replace_round_clears_later_rounds() {
    let repo = setup_repo().await;
    let t = tournament_with_field(&repo, 4).await;
    let p = &t.participants;

    repo.create_matches(
        t.id,
        1,
        vec![NewMatch::normal(p[0].id, p[1].id), NewMatch::normal(p[2].id, p[3].id)],
    )
    .await
    .unwrap();
    repo.create_matches(t.id, 2, vec![NewMatch::normal(p[0].id, p[2].id)])
        .await
        .unwrap();

    let replaced = repo
        .replace_round(t.id, 1, vec![NewMatch::normal(p[0].id, p[3].id), NewMatch::normal(p[1].id, p[2].id)])
        .await
        .unwrap();

    assert_eq!(repo.list_matches(t.id, None).await.unwrap(), replaced);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_remove_referenced_participant() {
    let repo = setup_repo().await;
    let t = tournament_with_field(&repo, 2).await;
    let p = &t.participants;

    repo.create_matches(t.id, 1, vec![NewMatch::normal(p[0].id, p[1].id)])
        .await
        .unwrap();
    assert!(matches!(
        repo.remove_participant(p[0].id).await,
        Err(BracketError::ParticipantInUse(_))
    ));

    assert_eq!(repo.delete_matches(t.id, None).await.unwrap(), 1);
    repo.remove_participant(p[0].id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_round_placement_rules() {
    let repo = setup_repo().await;
    let t = tournament_with_field(&repo, 4).await;
    let p = &t.participants;

    assert!(matches!(
        repo.create_matches(t.id, 2, vec![NewMatch::normal(p[0].id, p[1].id)])
            .await,
        Err(BracketError::InvalidInput(_))
    ));

    repo.create_matches(
        t.id,
        1,
        vec![NewMatch::normal(p[0].id, p[1].id), NewMatch::normal(p[2].id, p[3].id)],
    )
    .await
    .unwrap();
    repo.create_matches(
        t.id,
        2,
        vec![NewMatch::normal(p[0].id, p[2].id), NewMatch::third_place(p[1].id, p[3].id)],
    )
    .await
    .unwrap();

    assert!(matches!(
        repo.create_matches(t.id, 2, vec![NewMatch::third_place(p[3].id, p[1].id)])
            .await,
        Err(BracketError::InconsistentBracket(_))
    ));
    let replaced = repo
        .replace_round(
            t.id,
            2,
            vec![NewMatch::normal(p[0].id, p[2].id), NewMatch::third_place(p[3].id, p[1].id)],
        )
        .await
        .unwrap();
    assert_eq!(replaced[1].match_type, MatchType::ThirdPlace);
    assert_eq!(repo.list_matches(t.id, Some(2)).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_set_position_upserts() {
    let repo = setup_repo().await;
    let t = tournament_with_field(&repo, 3).await;
    let p = &t.participants;

    let created = repo
        .create_matches(t.id, 1, vec![NewMatch::normal(p[0].id, p[1].id), NewMatch::bye(p[2].id)])
        .await
        .unwrap();
    let match_id = created[0].id;

    repo.set_position(match_id, p[0].id, "North").await.unwrap();
    repo.set_position(match_id, p[1].id, "North").await.unwrap();
    repo.set_position(match_id, p[0].id, "South").await.unwrap();

    let positions = repo.list_positions(match_id).await.unwrap();
    assert_eq!(positions.len(), 2);
    assert_eq!((positions[0].participant_id, positions[0].label.as_str()), (p[0].id, "South"));
    assert_eq!((positions[1].participant_id, positions[1].label.as_str()), (p[1].id, "North"));

    assert!(matches!(
        repo.set_position(created[1].id, p[2].id, "North").await,
        Err(BracketError::InvalidInput(_))
    ));
    assert!(matches!(
        repo.set_position(match_id, p[2].id, "North").await,
        Err(BracketError::InvalidInput(_))
    ));

    // Positions go with their match
    repo.delete_matches(t.id, None).await.unwrap();
    assert!(matches!(
        repo.list_positions(match_id).await,
        Err(BracketError::MatchNotFound(_))
    ));
}
