//! Benchmark profiles and utilities for the Duel coordination layer.
//!
//! Provides deterministic producers and cheap consumers for benchmarks
//! and examples:
//!
//! - [`SimulatedDuel`]: a seeded stand-in rules engine that plays a
//!   two-player game as a realistic notification stream
//! - [`notification_burst`]: a seeded batch of mixed notifications
//! - [`CountingView`]: a consumer that only counts what it receives

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::thread;
use std::time::Duration;

use duel_core::{
    CardId, Game, GameContext, GameError, GameOutcome, MatchView, Notification, Phase, PlayerId,
    PlayerZone, ViewResult, ZoneKind,
};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smallvec::smallvec;

const PHASES: [Phase; 5] = [
    Phase::Untap,
    Phase::Upkeep,
    Phase::Draw,
    Phase::Main1,
    Phase::Cleanup,
];

/// A seeded two-player game that emits a plausible event stream.
///
/// Each turn walks the phases, taps and casts a few cards, moves cards
/// between zones, and deals some damage. The first player to reach zero
/// life loses. Cancellation is checked once per phase.
pub struct SimulatedDuel {
    name: String,
    players: [String; 2],
    rng: ChaCha8Rng,
    max_turns: u32,
    step_delay: Option<Duration>,
}

impl SimulatedDuel {
    /// A duel between two AI players, fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            name: format!("duel-{seed}"),
            players: ["Ai(1)".to_owned(), "Ai(2)".to_owned()],
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_turns: 40,
            step_delay: None,
        }
    }

    /// Sleep this long after every phase, to emulate thinking time.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// Stop without an outcome after this many turns.
    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    fn roll(&mut self, n: u32) -> u32 {
        self.rng.next_u32() % n
    }

    fn card(&mut self) -> CardId {
        CardId(self.roll(120))
    }
}

impl Game for SimulatedDuel {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &GameContext) -> Result<(), GameError> {
        let mut life = [20i32, 20];
        for turn in 1..=self.max_turns {
            let active = PlayerId((turn - 1) % 2);
            let defending = PlayerId(turn % 2);
            ctx.notify(Notification::TurnBegan {
                player: active,
                turn,
            });

            for phase in PHASES {
                ctx.check_cancelled()?;
                ctx.notify(Notification::PhaseChanged {
                    player: active,
                    phase,
                    dev_mode: false,
                    refresh_battlefield: phase == Phase::Untap,
                });
                match phase {
                    Phase::Draw => {
                        let card = self.card();
                        ctx.notify(Notification::CardMoved {
                            card,
                            from: Some(PlayerZone::new(active, ZoneKind::Library)),
                            to: Some(PlayerZone::new(active, ZoneKind::Hand)),
                        });
                    }
                    Phase::Main1 => {
                        let land = self.card();
                        ctx.notify(Notification::LandPlayed {
                            player: active,
                            card: land,
                        });
                        for _ in 0..=self.roll(3) {
                            let spell = self.card();
                            ctx.notify(Notification::CardTapped { card: land });
                            ctx.notify(Notification::ManaPoolChanged { player: active });
                            ctx.notify(Notification::SpellCast { card: spell });
                            ctx.notify(Notification::SpellResolved { card: spell });
                            ctx.notify(Notification::CardMoved {
                                card: spell,
                                from: Some(PlayerZone::new(active, ZoneKind::Stack)),
                                to: Some(PlayerZone::new(active, ZoneKind::Battlefield)),
                            });
                        }
                        let attackers = smallvec![self.card(), self.card()];
                        ctx.notify(Notification::AttackersDeclared {
                            cards: attackers,
                        });
                        ctx.notify(Notification::CombatChanged);
                        let damage = self.roll(6) as i32;
                        life[defending.0 as usize] -= damage;
                        ctx.notify(Notification::PlayerDamaged { player: defending });
                        ctx.notify(Notification::PlayerLifeChanged { player: defending });
                    }
                    _ => {}
                }
                if let Some(delay) = self.step_delay {
                    thread::sleep(delay);
                }
            }

            if life[defending.0 as usize] <= 0 {
                let winner = active.0 as usize;
                ctx.conclude(GameOutcome::win(active, self.players[winner].clone()));
                return Ok(());
            }
        }
        Ok(())
    }
}

/// `count` mixed notifications drawn from a small id space, so bursts
/// coalesce the way a busy game's do.
pub fn notification_burst(seed: u64, count: usize) -> Vec<Notification> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let card = CardId(rng.next_u32() % 64);
            let player = PlayerId(rng.next_u32() % 2);
            match rng.next_u32() % 6 {
                0 => Notification::CardChanged { card },
                1 => Notification::CardTapped { card },
                2 => Notification::PlayerLifeChanged { player },
                3 => Notification::ZoneChanged {
                    zone: PlayerZone::new(player, ZoneKind::Battlefield),
                },
                4 => Notification::SpellCast { card },
                _ => Notification::CombatChanged,
            }
        })
        .collect()
}

/// A consumer that counts batches and items and otherwise does nothing.
#[derive(Debug, Default)]
pub struct CountingView {
    /// Batch-apply calls received.
    pub batches: u64,
    /// Items delivered across all set-like batches.
    pub items: u64,
}

impl CountingView {
    fn batch(&mut self, items: usize) -> ViewResult {
        self.batches += 1;
        self.items += items as u64;
        Ok(())
    }
}

impl MatchView for CountingView {
    fn update_cards(&mut self, cards: &[CardId]) -> ViewResult {
        self.batch(cards.len())
    }
    fn refresh_card_details(&mut self, cards: &[CardId]) -> ViewResult {
        self.batch(cards.len())
    }
    fn update_lives(&mut self, players: &[PlayerId]) -> ViewResult {
        self.batch(players.len())
    }
    fn update_mana_pool(&mut self, players: &[PlayerId]) -> ViewResult {
        self.batch(players.len())
    }
    fn update_zones(&mut self, zones: &[PlayerZone]) -> ViewResult {
        self.batch(zones.len())
    }
    fn update_stack(&mut self) -> ViewResult {
        self.batch(1)
    }
    fn show_combat(&mut self) -> ViewResult {
        self.batch(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_are_deterministic() {
        assert_eq!(notification_burst(7, 100), notification_burst(7, 100));
        assert_ne!(notification_burst(7, 100), notification_burst(8, 100));
    }

    #[test]
    fn burst_has_requested_length() {
        assert_eq!(notification_burst(1, 0).len(), 0);
        assert_eq!(notification_burst(1, 257).len(), 257);
    }
}
