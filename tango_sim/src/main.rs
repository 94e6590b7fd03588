//! Three Card Tango table simulator.
//!
//! Seats automated players at a table through the registry and lets them
//! play until enough hands are done.

mod strategy;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use anyhow::{Error, bail};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use rand::{SeedableRng, rngs::StdRng};
use three_card_tango::{
    AccountStore, HandRecordStore, InMemoryAccountStore, InMemoryHandRecordStore, RegistryConfig,
    TableManager,
    constants::{MAX_PLAYERS, MIN_PLAYERS},
    entities::{Phase, PlayerId},
    table::{Notification, PhaseTimers},
};
use uuid::Uuid;

use strategy::{Move, Strategy};

const HELP: &str = "\
Simulate a Three Card Tango table with automated players

USAGE:
  tango_sim [OPTIONS]

OPTIONS:
  --players    N           Players at the table (2-5)       [default: 3]
  --hands      N           Hands to play before stopping    [default: 10]
  --seed       N           Seed for the players' decisions  [default: random]

FLAGS:
  --fast                   One-second phases ticking every 50ms
  -h, --help               Print help information

ENVIRONMENT:
  TANGO_TIMER_<PHASE>      Seconds for a phase (e.g. TANGO_TIMER_BETTING=30)
  TANGO_TICK_INTERVAL_MS   Milliseconds per countdown tick
  TANGO_DISABLE_TIMERS     Set to true to turn automatic countdowns off
  RUST_LOG                 Log filter (e.g. info, three_card_tango=debug)
";

struct Args {
    players: usize,
    hands: u64,
    seed: Option<u64>,
    fast: bool,
}

struct Bot {
    name: String,
    token: String,
    player_id: PlayerId,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        fast: pargs.contains("--fast"),
        players: pargs.opt_value_from_str("--players")?.unwrap_or(3),
        hands: pargs.opt_value_from_str("--hands")?.unwrap_or(10),
        seed: pargs.opt_value_from_str("--seed")?,
    };

    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&args.players) {
        bail!("--players must be between {MIN_PLAYERS} and {MAX_PLAYERS}");
    }

    // Catching signals for exit.
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    set_handler(move || stop_handler.store(true, Ordering::SeqCst))?;

    env_logger::builder().format_target(false).init();

    let mut config = RegistryConfig::from_env();
    if args.fast {
        config.timers = PhaseTimers::uniform(1);
        config.tick_interval_ms = 50;
        config.auto_tick = true;
    }
    // Without automatic countdowns the simulator drives the timers itself
    let manual_ticks = !config.auto_tick;
    info!(
        "Simulating {} hands with {} players",
        args.hands, args.players
    );

    let accounts = Arc::new(InMemoryAccountStore::new());
    let records = Arc::new(InMemoryHandRecordStore::new());
    let manager = Arc::new(TableManager::new(
        config,
        Arc::clone(&accounts) as Arc<dyn AccountStore>,
        Arc::clone(&records) as Arc<dyn HandRecordStore>,
    )?);

    let mut bots = Vec::with_capacity(args.players);
    let mut table_id = None;
    for i in 0..args.players {
        let name = format!("bot-{}", i + 1);
        let token = Uuid::new_v4().to_string();
        let snapshot = manager.join_table(&token, &name).await?;
        let player_id = accounts
            .find_by_token(&token)
            .await?
            .map(|account| account.id)
            .ok_or_else(|| anyhow::anyhow!("no account for {name}"))?;
        if let Some(seat) = snapshot.player(player_id).map(|p| p.seat_idx) {
            info!("{} joined {} in seat {}", name, snapshot.name, seat);
        }
        table_id = Some(snapshot.table_id);
        bots.push(Bot {
            name,
            token,
            player_id,
        });
    }
    let Some(table_id) = table_id else {
        bail!("no table was created");
    };

    for (i, bot) in bots.iter().enumerate() {
        let notifications = manager.subscribe(&bot.token).await?;
        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
            None => StdRng::from_os_rng(),
        };
        tokio::spawn(play(
            Arc::clone(&manager),
            bot.token.clone(),
            bot.player_id,
            notifications,
            rng,
        ));
    }

    let mut game_id = None;
    loop {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if stop.load(Ordering::SeqCst) {
            info!("Interrupted, wrapping up");
            break;
        }
        let snapshot = if manual_ticks {
            manager.tick(table_id).await?
        } else {
            manager.snapshot(table_id, None).await?
        };
        game_id = Some(snapshot.game_id);
        if snapshot.phase == Phase::Waiting && snapshot.hand_number > 0 {
            info!("Not enough funded players left after {} hands", snapshot.hand_number);
            break;
        }
        if snapshot.hand_number >= args.hands && snapshot.phase == Phase::End {
            break;
        }
    }

    for bot in &bots {
        if let Err(e) = manager.leave_table(&bot.token).await {
            log::warn!("{} could not leave: {}", bot.name, e);
        }
    }

    if let Some(game_id) = game_id {
        let hands = records.hands_for_game(game_id).await;
        println!("Hands played: {}", hands.len());
        if let Some(last) = hands.last()
            && log::log_enabled!(log::Level::Debug)
        {
            log::debug!("Last hand: {}", serde_json::to_string_pretty(last)?);
        }
    }
    println!("Final balances:");
    for bot in &bots {
        let balance = accounts
            .find_by_id(bot.player_id)
            .await?
            .map(|account| account.balance)
            .unwrap_or_default();
        println!("  {:<8} {:>6}", bot.name, balance);
    }

    Ok(())
}

/// React to table notifications on behalf of one player
async fn play(
    manager: Arc<TableManager>,
    token: String,
    player_id: PlayerId,
    mut notifications: tokio::sync::mpsc::Receiver<Notification>,
    mut rng: StdRng,
) {
    let strategy = Strategy::default();
    while let Some(notification) = notifications.recv().await {
        match notification {
            Notification::Snapshot(snapshot) => {
                let Some(next) = strategy.decide(&snapshot, player_id, &mut rng) else {
                    continue;
                };
                let result = match next {
                    Move::Classify { kind, card_idx } => {
                        manager
                            .submit_classification_action(&token, kind, card_idx)
                            .await
                    }
                    Move::Bet(action) => manager.submit_betting_action(&token, action).await,
                };
                if let Err(e) = result {
                    log::debug!("Player {} move {:?} rejected: {}", player_id, next, e);
                }
            }
            Notification::Winners(winners) => {
                for winner in &winners {
                    info!("{} won {}", winner.name, winner.amount);
                }
                if winners.iter().any(|w| w.player_id == player_id) {
                    let _ = manager.send_chat(&token, "gg").await;
                }
            }
            Notification::Chat(chat) => {
                log::debug!("[{}] {}: {}", chat.sent_at.format("%H:%M:%S"), chat.name, chat.message);
            }
            Notification::TimerTick { .. }
            | Notification::PlayerJoined { .. }
            | Notification::PlayerLeft { .. } => {}
        }
    }
}
