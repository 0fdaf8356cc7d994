use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use knockout::bracket::{
    KeepOrder, Match, MatchType, Participant, RandomShuffler, Shuffler, advance,
    first_round_patterns,
};
use std::hint::black_box;
use uuid::Uuid;

/// Helper to create a field of N participants
fn field(n: usize) -> Vec<Participant> {
    (0..n).map(|i| Participant::new(format!("player{i}"))).collect()
}

/// Helper to build a fully decided round of normal matches
fn decided_round(round: u32, players: &[Participant]) -> Vec<Match> {
    let tournament_id = Uuid::new_v4();
    players
        .chunks_exact(2)
        .map(|pair| Match {
            id: Uuid::new_v4(),
            tournament_id,
            round,
            match_type: MatchType::Normal,
            player1: pair[0].clone(),
            player2: pair[1].clone(),
            winner: Some(pair[0].clone()),
            created_at: Utc::now(),
        })
        .collect()
}

/// Benchmark first-round layout generation across field sizes
fn bench_first_round_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_round_patterns");

    for n in [8usize, 37, 129, 1000] {
        let players = field(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &players, |b, players| {
            b.iter(|| first_round_patterns(black_box(players)));
        });
    }

    group.finish();
}

/// Benchmark shuffling a field with the seeded shuffler
fn bench_shuffle(c: &mut Criterion) {
    let mut players = field(256);
    let mut shuffler = RandomShuffler::seeded(42);

    c.bench_function("shuffle_256", |b| {
        b.iter(|| shuffler.shuffle(black_box(&mut players)));
    });
}

/// Benchmark generating the next round from a completed one
fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance");

    for n in [4usize, 64, 512] {
        let matches = decided_round(1, &field(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &matches, |b, matches| {
            b.iter(|| advance(1, black_box(matches), &mut KeepOrder));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_first_round_patterns, bench_shuffle, bench_advance);
criterion_main!(benches);
