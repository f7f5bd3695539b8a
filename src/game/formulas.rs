//! Progression and economy formulas.
//!
//! Everything here is a pure function of its arguments so the engine, the offline
//! calculator and the tests all agree on the same numbers.

use super::types::{Progression, Research, ResearchTrack};

/// Upgrade cost grows by half on every upgrade (compounding).
pub const UPGRADE_COST_FACTOR: f64 = 1.5;
/// Sell price grows by a fifth on every upgrade (compounding).
pub const SELL_PRICE_FACTOR: f64 = 1.2;
/// Character level required to prestige.
pub const PRESTIGE_MIN_LEVEL: u32 = 50;

/// Percentage bonus granted by a research level. Linear in level.
pub fn research_bonus(level: u32) -> f64 {
    10.0 * f64::from(level)
}

/// Coin price of the next research upgrade from `level`.
///
/// Exponential in level while [`research_bonus`] is linear, so every extra coin buys
/// strictly less bonus than the one before it.
pub fn research_cost(level: u32) -> u64 {
    (100.0 * 1.5f64.powi(level as i32)).floor() as u64
}

/// Sum of the three research bonuses, used by offline progress.
pub fn total_research_bonus(research: &Research) -> f64 {
    ResearchTrack::ALL
        .iter()
        .map(|t| research_bonus(research.track(*t).level))
        .sum()
}

pub fn experience_to_next(level: u32) -> u64 {
    (100.0 * 1.1f64.powi(level.saturating_sub(1) as i32)).floor() as u64
}

/// Add experience, cascading through as many level-ups as the grant covers.
/// Each level-up awards one skill point. Returns the number of levels gained.
pub fn grant_experience(progression: &mut Progression, amount: u64) -> u32 {
    progression.experience += amount;
    let mut gained = 0;
    while progression.experience >= progression.experience_to_next {
        progression.experience -= progression.experience_to_next;
        progression.level += 1;
        progression.skill_points += 1;
        progression.experience_to_next = experience_to_next(progression.level);
        gained += 1;
    }
    gained
}

/// (next upgrade cost, next sell price) after one upgrade.
pub fn escalate(upgrade_cost: u64, sell_price: u64) -> (u64, u64) {
    (
        (upgrade_cost as f64 * UPGRADE_COST_FACTOR).floor() as u64,
        (sell_price as f64 * SELL_PRICE_FACTOR).floor() as u64,
    )
}

/// clamp(1 + floor(streak / 5) * 0.1, 1, 2)
pub fn streak_multiplier(streak: u32) -> f64 {
    let steps = f64::from(streak / 5);
    // Round to one decimal so repeated 0.1 steps compare exactly.
    let raw = ((10.0 + steps) / 10.0).min(2.0);
    raw.max(1.0)
}

/// Prestige points awarded when prestiging at `level`.
pub fn prestige_points(level: u32) -> u32 {
    level / 10
}
