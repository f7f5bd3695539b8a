//! # Game State Engine
//!
//! The authoritative rules of Hugoland. A [`GameState`] is a plain aggregate; every
//! transition is a method on it that takes `&mut self` plus whatever randomness or time it
//! needs, validates all preconditions first, and only then mutates.
//!
//! ## Failure contract
//!
//! Expected business-rule violations (can't afford it, unknown item id, relic cap reached,
//! ...) return `Err(ActionError)` and leave the state untouched. Nothing in this module
//! performs I/O; persistence and scheduling are layered on top by
//! [`crate::storage`] and [`crate::runtime`].
//!
//! ## Modules
//!
//! - [`types`]: the data model
//! - [`formulas`]: research, leveling and escalation curves
//! - [`generator`]: items, enemies and relics
//! - [`stats`]: derived-stat recomputation
//! - [`combat`]: combat state machine
//! - [`economy`]: purchases, upgrades and progression operations
//! - [`timed`]: background systems driven by the scheduler
//! - [`achievements`]: unlock catalogue and evaluators
//! - [`snapshot`]: versioned save format and load-time repair

pub mod achievements;
pub mod combat;
pub mod economy;
pub mod formulas;
pub mod generator;
pub mod snapshot;
pub mod stats;
pub mod timed;
pub mod types;

use thiserror::Error;

pub use achievements::{AchievementId, TagId, Unlocks};
pub use combat::AnswerOutcome;
pub use types::*;

/// Rejection of a game operation. The state is unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("not enough coins: need {needed}, have {available}")]
    InsufficientCoins { needed: u64, available: u64 },

    #[error("not enough gems: need {needed}, have {available}")]
    InsufficientGems { needed: u64, available: u64 },

    #[error("not enough shiny gems: need {needed}, have {available}")]
    InsufficientShinyGems { needed: u64, available: u64 },

    #[error("not enough skill points: need {needed}, have {available}")]
    InsufficientSkillPoints { needed: u32, available: u32 },

    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// Equipped items cannot be sold or discarded.
    #[error("item is equipped: {0}")]
    ItemEquipped(String),

    #[error("item already equipped: {0}")]
    AlreadyEquipped(String),

    #[error("relic cap reached ({0} equipped)")]
    RelicCapReached(usize),

    #[error("already in combat")]
    AlreadyInCombat,

    #[error("not in combat")]
    NotInCombat,

    #[error("no survival lives remaining")]
    NoLivesRemaining,

    #[error("requires level {required}, currently {current}")]
    LevelTooLow { required: u32, current: u32 },

    #[error("garden already planted")]
    GardenAlreadyPlanted,

    #[error("garden not planted")]
    GardenNotPlanted,

    #[error("no water tier for {0} hours")]
    InvalidWaterTier(u32),

    #[error("no reward available")]
    NoRewardAvailable,

    #[error("skill already unlocked: {0}")]
    SkillAlreadyUnlocked(String),

    #[error("unknown skill: {0}")]
    UnknownSkill(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(u64),

    #[error("no items selected")]
    EmptySelection,

    #[error("cheat is not enabled")]
    CheatInactive,
}

pub type ActionResult<T> = Result<T, ActionError>;

impl GameState {
    /// Fresh game with derived stats already computed.
    pub fn new() -> Self {
        let mut state = Self::default();
        state.recompute_stats();
        state
    }

    /// Affordability check for a coin price; the `infinite_coins` cheat skips it.
    pub fn check_coins(&self, cost: u64) -> ActionResult<()> {
        if self.cheats.infinite_coins || self.coins >= cost {
            Ok(())
        } else {
            Err(ActionError::InsufficientCoins {
                needed: cost,
                available: self.coins,
            })
        }
    }

    pub fn check_gems(&self, cost: u64) -> ActionResult<()> {
        if self.cheats.infinite_gems || self.gems >= cost {
            Ok(())
        } else {
            Err(ActionError::InsufficientGems {
                needed: cost,
                available: self.gems,
            })
        }
    }

    /// Deduct a coin price that already passed [`check_coins`](Self::check_coins).
    /// Under the `infinite_coins` cheat the balance is left alone.
    pub(crate) fn spend_coins(&mut self, cost: u64) {
        if !self.cheats.infinite_coins {
            self.coins = self.coins.saturating_sub(cost);
        }
    }

    pub(crate) fn spend_gems(&mut self, cost: u64) {
        if !self.cheats.infinite_gems {
            self.gems = self.gems.saturating_sub(cost);
        }
    }

    /// Credit coins and record them as earned.
    pub(crate) fn earn_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
        self.statistics.coins_earned = self.statistics.coins_earned.saturating_add(amount);
    }

    pub(crate) fn earn_gems(&mut self, amount: u64) {
        self.gems = self.gems.saturating_add(amount);
        self.statistics.gems_earned = self.statistics.gems_earned.saturating_add(amount);
    }
}
