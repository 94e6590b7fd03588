use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use three_card_tango::{
    GameSettings, TableSession,
    entities::{BettingAction, Card, Phase, Suit},
    functional::{argmax, best_hand, compute_side_pots, eval},
};

/// Table with `n_players` seated and the first hand waiting for antes
fn setup_session(n_players: usize) -> TableSession {
    let mut session = TableSession::new(1, 1, GameSettings::new(10, 5));
    for i in 0..n_players {
        let id = i as i64 + 1;
        session
            .seat_player(id, &format!("player{i}"), 1000)
            .unwrap();
    }
    session
}

/// Drive a hand to the end with antes posted and every other decision
/// left to the timers
fn play_hand(mut session: TableSession) -> TableSession {
    let ids: Vec<_> = session.data().players.iter().map(|p| p.id).collect();
    for _ in 0..64 {
        match session.phase() {
            Phase::End | Phase::Waiting => break,
            Phase::Ante => {
                for &id in &ids {
                    let _ = session.apply_betting_action(id, BettingAction::Bet(10));
                }
            }
            phase => {
                let _ = session.on_timer_expired(phase);
            }
        }
    }
    session
}

/// Benchmark scoring a full seven-card showdown hand
fn bench_hand_eval_7_cards(c: &mut Criterion) {
    let cards = vec![
        Card(14, Suit::Spade),  // Kept card
        Card(6, Suit::Club),    // Turn card
        Card(13, Suit::Spade),  // Board
        Card(12, Suit::Spade),  // Board
        Card(11, Suit::Spade),  // Board
        Card(10, Suit::Spade),  // Board: royal flush
        Card(3, Suit::Diamond), // Board
    ];

    c.bench_function("hand_eval_7_cards", |b| {
        b.iter(|| eval(&cards));
    });
    c.bench_function("best_hand_7_cards", |b| {
        b.iter(|| best_hand(&cards));
    });
}

/// Benchmark picking the winners among five showdown hands
fn bench_hand_comparison(c: &mut Criterion) {
    let board = [
        Card(2, Suit::Heart),
        Card(7, Suit::Club),
        Card(9, Suit::Diamond),
        Card(11, Suit::Heart),
        Card(13, Suit::Spade),
    ];
    let holdings = [
        [Card(14, Suit::Spade), Card(14, Suit::Heart)],
        [Card(13, Suit::Heart), Card(12, Suit::Heart)],
        [Card(9, Suit::Club), Card(9, Suit::Spade)],
        [Card(8, Suit::Diamond), Card(10, Suit::Club)],
        [Card(3, Suit::Club), Card(4, Suit::Club)],
    ];

    c.bench_function("hand_comparison_5_hands", |b| {
        b.iter(|| {
            let strengths: Vec<_> = holdings
                .iter()
                .map(|held| {
                    let mut cards = board.to_vec();
                    cards.extend_from_slice(held);
                    eval(&cards)
                })
                .collect();
            argmax(&strengths)
        });
    });
}

/// Benchmark layering side pots for all-in players
fn bench_side_pots(c: &mut Criterion) {
    let contributions = [(1, 50), (2, 200), (3, 120), (4, 200), (5, 10)];

    c.bench_function("side_pots_5_players", |b| {
        b.iter(|| compute_side_pots(&contributions));
    });
}

/// Benchmark snapshot generation with different player counts
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for n_players in [2, 3, 5].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_players", n_players)),
            n_players,
            |b, &n| {
                let session = setup_session(n);
                b.iter(|| session.snapshot(Some(1)));
            },
        );
    }

    group.finish();
}

/// Benchmark a whole hand from antes to pot distribution
fn bench_full_hand(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_hand");

    for n_players in [2, 5].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_players", n_players)),
            n_players,
            |b, &n| {
                b.iter_batched(
                    || setup_session(n),
                    play_hand,
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    hand_evaluation,
    bench_hand_eval_7_cards,
    bench_hand_comparison,
    bench_side_pots,
);

criterion_group!(game_operations, bench_snapshot, bench_full_hand);

criterion_main!(hand_evaluation, game_operations);
