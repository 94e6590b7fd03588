//! Countdown supervision for a single table.
//!
//! At most one countdown is armed per table. Arming a new one bumps a
//! generation counter, so ticks still in flight for the old countdown are
//! recognised as stale when they reach the actor.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::sync::mpsc;

use super::messages::TableMessage;
use crate::game::{TimerKey, entities::Phase};

/// The countdown currently armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub generation: u64,
    pub key: TimerKey,
    pub remaining: u32,
}

/// Result of feeding a tick to the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belongs to a countdown that was replaced or disarmed
    Stale,
    Running { phase: Phase, remaining: u32 },
    /// The countdown ran out and has been disarmed
    Expired { phase: Phase },
}

#[derive(Debug)]
pub struct TimerSupervisor {
    generation: Arc<AtomicU64>,
    armed: Option<ArmedTimer>,
    tick_interval: Duration,
    auto_tick: bool,
}

impl TimerSupervisor {
    pub fn new(tick_interval: Duration, auto_tick: bool) -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            armed: None,
            tick_interval,
            auto_tick,
        }
    }

    pub fn armed(&self) -> Option<ArmedTimer> {
        self.armed
    }

    pub fn armed_key(&self) -> Option<TimerKey> {
        self.armed.map(|timer| timer.key)
    }

    /// Start a countdown of `secs` ticks for `key`, replacing any other.
    /// With auto ticking on, a task sends a tick to the table every
    /// interval until the countdown is superseded or the table goes away.
    pub fn arm(&mut self, key: TimerKey, secs: u32, table: mpsc::WeakSender<TableMessage>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.armed = Some(ArmedTimer {
            generation,
            key,
            remaining: secs,
        });
        if self.auto_tick {
            self.spawn_ticker(generation, table);
        }
    }

    fn spawn_ticker(&self, generation: u64, table: mpsc::WeakSender<TableMessage>) {
        let current = Arc::clone(&self.generation);
        let interval = self.tick_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if current.load(Ordering::SeqCst) != generation {
                    break;
                }
                let Some(sender) = table.upgrade() else {
                    break;
                };
                let tick = TableMessage::TimerTick {
                    generation: Some(generation),
                };
                if sender.send(tick).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Count one tick down. Ticks without a generation always apply to the
    /// armed countdown.
    pub fn tick(&mut self, generation: Option<u64>) -> TickOutcome {
        let Some(armed) = self.armed.as_mut() else {
            return TickOutcome::Stale;
        };
        if let Some(generation) = generation
            && generation != armed.generation
        {
            return TickOutcome::Stale;
        }
        armed.remaining = armed.remaining.saturating_sub(1);
        let phase = armed.key.phase;
        if armed.remaining == 0 {
            self.disarm();
            TickOutcome::Expired { phase }
        } else {
            TickOutcome::Running {
                phase,
                remaining: armed.remaining,
            }
        }
    }

    /// Drop the armed countdown. Its ticker stops at its next wake.
    pub fn disarm(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.armed = None;
    }
}
