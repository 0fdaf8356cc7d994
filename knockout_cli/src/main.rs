//! Single-elimination bracket simulator.
//!
//! Registers a field of participants, seeds round 1, plays every match with
//! a random winner and prints the bracket and standings.

mod config;

use std::sync::Arc;

use anyhow::Error;
use config::SimulatorConfig;
use knockout::{
    BracketError, MatchType, RoundOutcome, Standings, TournamentManager, TournamentRepository,
    bracket::{RandomShuffler, RoundView},
    db::{Database, InMemoryTournamentRepository},
};
use log::{error, info};
use pico_args::Arguments;
use rand::{Rng, SeedableRng, rngs::StdRng};

const HELP: &str = "\
Simulate a single-elimination tournament

USAGE:
  knockout [OPTIONS]

OPTIONS:
  --participants N         Field size, at least 2      [default: env KNOCKOUT_PARTICIPANTS or 8]
  --seed         S         RNG seed for a repeatable run [default: env KNOCKOUT_SEED or random]
  --pattern      NAME      Bye layout: distributed | concentrated  [default: distributed]
  --db-url       URL       PostgreSQL connection string [default: env DATABASE_URL or in memory]

FLAGS:
  --json                   Print the bracket and standings as JSON
  -h, --help               Print help information

ENVIRONMENT:
  KNOCKOUT_PARTICIPANTS    Field size
  KNOCKOUT_SEED            RNG seed
  DATABASE_URL             PostgreSQL connection string
  TOURNAMENT_POSITIONS     Comma-separated position labels (e.g., East,West)
  RUST_LOG                 Log filter (e.g., info, knockout=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    env_logger::builder().format_target(false).init();

    let config = SimulatorConfig::from_args(pargs)?;
    config.validate()?;

    match &config.database {
        Some(db_config) => {
            info!("Connecting to database: {}", db_config.database_url);
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.health_check().await?;
            info!("Database connected successfully");

            let manager = TournamentManager::with_defaults(
                Arc::new(db.repository()),
                config.tournament.clone(),
            );
            let result = simulate(&manager, &config).await.map_err(report);
            db.close().await;
            result
        }
        None => {
            info!("No database configured, running in memory");
            let manager = TournamentManager::with_defaults(
                Arc::new(InMemoryTournamentRepository::new()),
                config.tournament.clone(),
            );
            simulate(&manager, &config).await.map_err(report)
        }
    }
}

/// Log a bracket failure in full and keep only its client-facing message
fn report(e: Error) -> Error {
    match e.downcast_ref::<BracketError>() {
        Some(err) => {
            error!("Simulation failed: {err}");
            anyhow::anyhow!(err.client_message())
        }
        None => e,
    }
}

async fn simulate<R: TournamentRepository>(
    manager: &TournamentManager<R>,
    config: &SimulatorConfig,
) -> Result<(), Error> {
    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffler = RandomShuffler::seeded(rng.random());
    info!(
        "Simulating {} participants with seed {}",
        config.participants, seed
    );

    let tournament = manager
        .create_tournament(
            "Simulated Cup",
            &format!("{} participants, seed {seed}", config.participants),
        )
        .await?;
    for i in 1..=config.participants {
        manager
            .register_participant(tournament.id, &format!("Player {i}"))
            .await?;
    }

    let kind = config.pattern.kind_for(config.participants);
    let mut pending = manager
        .seed_with_pattern(tournament.id, kind, &mut shuffler)
        .await?;

    let standings = loop {
        for m in pending.iter().filter(|m| !m.is_decided()) {
            let winner = if rng.random_bool(0.5) {
                &m.player1
            } else {
                &m.player2
            };
            manager.record_winner(tournament.id, m.id, winner.id).await?;
        }

        match manager.advance(tournament.id, &mut shuffler).await? {
            RoundOutcome::Created { matches, .. } => pending = matches,
            RoundOutcome::Complete(standings) => break standings,
        }
    };

    let rounds = manager.bracket(tournament.id).await?;
    if config.json {
        let report = serde_json::json!({
            "tournament": tournament.id,
            "layout": kind.label(),
            "positions": tournament.positions,
            "rounds": rounds,
            "standings": standings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} ({} layout)", tournament.name, kind.label());
        print_rounds(&rounds);
        print_standings(&standings);
    }

    Ok(())
}

fn print_rounds(rounds: &[RoundView]) {
    for view in rounds {
        println!("\nRound {}", view.round);
        for m in &view.matches {
            let winner = m.winner.as_ref().map_or("-", |w| w.name.as_str());
            match m.match_type {
                MatchType::Bye => println!("  {} (bye)", m.player1.name),
                MatchType::Normal => {
                    println!("  {} vs {} -> {}", m.player1.name, m.player2.name, winner)
                }
                MatchType::ThirdPlace => println!(
                    "  {} vs {} -> {} (third place)",
                    m.player1.name, m.player2.name, winner
                ),
            }
        }
    }
}

fn print_standings(standings: &Standings) {
    println!("\nChampion:  {}", standings.champion.name);
    if let Some(runner_up) = &standings.runner_up {
        println!("Runner-up: {}", runner_up.name);
    }
    if let Some(third) = &standings.third {
        println!("Third:     {}", third.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_hides_internal_errors() {
        let parse = serde_json::from_str::<u32>("x").unwrap_err();
        let reported = report(BracketError::from(parse).into());
        assert_eq!(reported.to_string(), "Internal server error");
    }

    #[test]
    fn test_report_keeps_client_errors() {
        let err =
            BracketError::InvalidInput("round 3 cannot be created before round 2".to_string());
        let reported = report(err.into());
        assert_eq!(
            reported.to_string(),
            "Invalid input: round 3 cannot be created before round 2"
        );
    }

    #[test]
    fn test_report_passes_other_errors() {
        let reported = report(anyhow::anyhow!("Failed to connect to database"));
        assert_eq!(reported.to_string(), "Failed to connect to database");
    }
}
