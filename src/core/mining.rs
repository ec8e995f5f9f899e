//! Mining simulator for the mining lesson
//!
//! This is a simulation, not proof-of-work. Each tick adds a random batch of
//! "attempts" and flips a fixed-probability coin; on success a nonce and a
//! zero-prefixed hash are fabricated for display. No hash is ever compared
//! against a target.

use crate::config::GLOBAL_CONFIG;
use crate::utils::to_hex;
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Largest number of attempts a single tick can add
pub const MAX_ATTEMPTS_PER_TICK: u64 = 5000;

/// Leading hex zeros are capped to the length of a SHA-256 hex digest
const MAX_DIFFICULTY: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedBlock {
    pub nonce: u64,
    pub hash: String,
    pub ticks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningTick {
    Searching { attempts: u64 },
    Found(SimulatedBlock),
}

pub struct MiningSimulator {
    difficulty: u32,
    success_probability: f64,
    attempts: u64,
    ticks: u64,
    found: Option<SimulatedBlock>,
}

impl MiningSimulator {
    pub fn new(difficulty: u32, success_probability: f64) -> MiningSimulator {
        let success_probability = if success_probability.is_finite() {
            success_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        MiningSimulator {
            difficulty: difficulty.min(MAX_DIFFICULTY),
            success_probability,
            attempts: 0,
            ticks: 0,
            found: None,
        }
    }

    /// Simulator using the configured success probability
    pub fn with_config(difficulty: u32) -> MiningSimulator {
        Self::new(difficulty, GLOBAL_CONFIG.get_mining_success_probability())
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn found(&self) -> Option<&SimulatedBlock> {
        self.found.as_ref()
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> MiningTick {
        if let Some(block) = &self.found {
            return MiningTick::Found(block.clone());
        }

        self.ticks += 1;
        self.attempts += rng.gen_range(1..=MAX_ATTEMPTS_PER_TICK);

        if rng.gen_bool(self.success_probability) {
            let block = SimulatedBlock {
                nonce: self.attempts,
                hash: self.fabricate_hash(rng),
                ticks: self.ticks,
            };
            info!(
                "Simulated block found after {} attempts ({} ticks)",
                self.attempts, self.ticks
            );
            self.found = Some(block.clone());
            return MiningTick::Found(block);
        }

        MiningTick::Searching {
            attempts: self.attempts,
        }
    }

    /// Tick until a block is "found" or `max_ticks` runs out
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R, max_ticks: u64) -> Option<SimulatedBlock> {
        for _ in 0..max_ticks {
            if let MiningTick::Found(block) = self.tick(rng) {
                return Some(block);
            }
        }
        self.found.clone()
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.ticks = 0;
        self.found = None;
    }

    fn fabricate_hash<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes[..]);
        let random_hex = to_hex(&bytes);
        let zeros = self.difficulty as usize;
        format!("{}{}", "0".repeat(zeros), &random_hex[zeros..])
    }
}
