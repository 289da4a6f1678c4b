use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::hint::black_box;

use chkobba::{
    bot::FallbackPlayer,
    game::{ChkobbaEngine, Deck, GameMode, Phase, PlayerId},
    matchmaking::Matchmaker,
};
use chrono::{TimeDelta, Utc};

fn players(mode: GameMode) -> Vec<PlayerId> {
    (0..mode.required_players())
        .map(|i| PlayerId::new(&format!("bot-{i:08x}")))
        .collect()
}

/// Plays a whole match with fallback players only.
fn play_match(mode: GameMode, seed: u64) -> u8 {
    let ids = players(mode);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut deck = Deck::standard();
    deck.shuffle_with(&mut rng);

    let mut engine = ChkobbaEngine::with_deck("bench", mode, 1, &ids, deck).unwrap();
    engine.deal_initial_cards().unwrap();
    let bots: Vec<FallbackPlayer> = ids
        .iter()
        .map(|id| FallbackPlayer::new(id.clone(), false))
        .collect();

    while engine.status() != Phase::MatchEnd {
        let idx = engine.state().current_player_index;
        let hand = engine.hand(&ids[idx]).unwrap().to_vec();
        if let Some(mv) = bots[idx].choose_move_with(&hand, &mut rng) {
            engine.apply_move(&ids[idx], &mv).unwrap();
        }
        engine.end_turn().unwrap();
    }
    engine.state().round
}

/// Benchmark a full deck shuffle
fn bench_shuffle(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    c.bench_function("deck_shuffle", |b| {
        b.iter(|| {
            let mut deck = Deck::standard();
            deck.shuffle_with(&mut rng);
            black_box(deck)
        });
    });
}

/// Benchmark complete matches for both modes
fn bench_full_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_match");
    for mode in GameMode::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, &mode| {
            let mut seed = 0u64;
            b.iter(|| {
                seed += 1;
                black_box(play_match(mode, seed))
            });
        });
    }
    group.finish();
}

/// Benchmark a matching pass over many waiting entries
fn bench_matching_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching_pass");
    for queued in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(queued), &queued, |b, &queued| {
            let t0 = Utc::now();
            let mut rng = StdRng::seed_from_u64(queued as u64);
            b.iter(|| {
                let mut mm = Matchmaker::default();
                for i in 0..queued {
                    let mode = if rng.random_bool(0.5) {
                        GameMode::OneVsOne
                    } else {
                        GameMode::TwoVsTwo
                    };
                    let stake = [1, 3, 5, 10][i % 4];
                    let joined = t0 + TimeDelta::milliseconds(rng.random_range(0..40_000));
                    mm.enqueue(PlayerId::new(&format!("p{i}")), stake, mode, joined)
                        .unwrap();
                }
                black_box(mm.run_matching_pass(t0 + TimeDelta::seconds(45)))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_shuffle, bench_full_match, bench_matching_pass);
criterion_main!(benches);
