//! Background systems: play time, passive gems, garden growth, market rotation,
//! daily rewards, offline progress and the time-attack clock.
//!
//! Each system is a plain transition taking `now` (and an RNG where needed). The
//! scheduler in [`crate::runtime`] decides when to call them; here they only need to be
//! safe to call repeatedly.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rand::Rng;

use super::formulas::total_research_bonus;
use super::generator::{generate_item, generate_market_offers, generate_mythical};
use super::types::{DailyReward, DailySpecial, GameState, Item, ItemKind, ModeKind, Rarity};
use super::{ActionError, ActionResult};

/// Gems granted per passive trickle interval.
pub const GEM_TRICKLE: u64 = 2;
/// Garden growth per elapsed hour of watering.
pub const GROWTH_CM_PER_HOUR: f64 = 0.5;
/// Percent stat bonus per centimetre of growth.
pub const BONUS_PER_CM: f64 = 5.0;
/// Water included with a fresh seed.
pub const SEED_WATER_HOURS: f64 = 24.0;
pub const MARKET_REFRESH_MINUTES: i64 = 5;
/// Offline gaps shorter than this yield nothing.
pub const MIN_OFFLINE_SECS: i64 = 300;
pub const OFFLINE_COINS_PER_HOUR: f64 = 50.0;
pub const OFFLINE_GEMS_PER_HOUR: f64 = 5.0;
/// A daily claim older than this breaks the streak.
pub const DAILY_STREAK_GRACE_HOURS: i64 = 48;

/// Coin price of a water tier, or `None` when `hours` is not a tier.
pub fn water_cost(hours: u32) -> Option<u64> {
    match hours {
        24 => Some(1_000),
        72 => Some(2_800),
        168 => Some(6_500),
        720 => Some(25_000),
        _ => None,
    }
}

/// The reward offered for streak day `day`.
pub fn daily_reward_for(day: u32) -> DailyReward {
    let special = match day {
        7 => Some(DailySpecial::LegendaryChest),
        14 => Some(DailySpecial::MythicalItem),
        _ => None,
    };
    DailyReward {
        day,
        coins: 50 + 25 * u64::from(day),
        gems: 5 + u64::from(day / 2),
        special,
        claimed: false,
        claim_date: None,
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds().max(0) as f64 / 3_600_000.0
}

/// A claimed daily reward and the item its special produced, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyClaim {
    pub reward: DailyReward,
    pub item: Option<Item>,
}

impl GameState {
    pub fn tick_play_time(&mut self, seconds: u64) {
        self.statistics.total_play_time += seconds;
    }

    /// Passive AFK income, `intervals` times over.
    pub fn gem_trickle(&mut self, intervals: u64) {
        self.earn_gems(GEM_TRICKLE * intervals);
    }

    /// Advance garden growth. Batches sub-hour gaps: nothing happens until at least one
    /// hour has passed since the last update. Returns whether the garden changed.
    pub fn garden_tick(&mut self, now: DateTime<Utc>) -> bool {
        let garden = &mut self.garden_of_growth;
        if !garden.is_planted || garden.water_hours_remaining <= 0.0 {
            return false;
        }
        let last = garden.last_watered.or(garden.planted_at).unwrap_or(now);
        let hours = hours_between(last, now);
        if hours < 1.0 {
            return false;
        }

        garden.water_hours_remaining = (garden.water_hours_remaining - hours).max(0.0);
        garden.growth_cm = (garden.growth_cm + hours * GROWTH_CM_PER_HOUR).min(garden.max_growth_cm);
        garden.total_growth_bonus = garden.growth_cm * BONUS_PER_CM;
        garden.last_watered = Some(now);
        debug!(
            "garden grew to {:.2} cm ({:.1}h water left)",
            garden.growth_cm, garden.water_hours_remaining
        );
        self.recompute_stats();
        true
    }

    pub fn plant_seed(&mut self, now: DateTime<Utc>) -> ActionResult<()> {
        if self.garden_of_growth.is_planted {
            return Err(ActionError::GardenAlreadyPlanted);
        }
        let cost = self.garden_of_growth.seed_cost;
        self.check_coins(cost)?;
        self.spend_coins(cost);

        let garden = &mut self.garden_of_growth;
        garden.is_planted = true;
        garden.planted_at = Some(now);
        garden.last_watered = Some(now);
        garden.water_hours_remaining = SEED_WATER_HOURS;
        info!("Garden planted");
        Ok(())
    }

    /// Buy one of the fixed water tiers. Growth accrued so far is applied first. A garden
    /// that still had water keeps its growth timestamp, so a sub-hour remainder carries
    /// over; a dry one restarts its clock at `now`.
    pub fn buy_water(&mut self, hours: u32, now: DateTime<Utc>) -> ActionResult<()> {
        let cost = water_cost(hours).ok_or(ActionError::InvalidWaterTier(hours))?;
        if !self.garden_of_growth.is_planted {
            return Err(ActionError::GardenNotPlanted);
        }
        self.check_coins(cost)?;
        self.spend_coins(cost);

        self.garden_tick(now);
        let garden = &mut self.garden_of_growth;
        if garden.water_hours_remaining <= 0.0 {
            garden.last_watered = Some(now);
        }
        garden.water_hours_remaining += f64::from(hours);
        Ok(())
    }

    /// Replace market offers once `next_refresh` has passed. Returns whether it rotated.
    pub fn refresh_market<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> bool {
        let market = &mut self.yojef_market;
        if matches!(market.next_refresh, Some(next) if now < next) {
            return false;
        }
        market.items = generate_market_offers(rng);
        market.last_refresh = Some(now);
        market.next_refresh = Some(now + interval);
        debug!("market refreshed with {} relics", market.items.len());
        true
    }

    /// Expose a claimable daily reward when at least 24 hours and a calendar day have
    /// passed since the last claim. Never auto-claims. Returns whether a reward appeared.
    pub fn check_daily_reward(&mut self, now: DateTime<Utc>) -> bool {
        let daily = &mut self.daily_rewards;
        if daily.available_reward.is_some() {
            return false;
        }
        let day = match daily.last_claim_date {
            None => 1,
            Some(last) => {
                let elapsed = now - last;
                if last.date_naive() == now.date_naive() || elapsed < Duration::hours(24) {
                    return false;
                }
                if elapsed > Duration::hours(DAILY_STREAK_GRACE_HOURS) {
                    1
                } else {
                    daily.current_streak + 1
                }
            }
        };
        daily.available_reward = Some(daily_reward_for(day));
        debug!("daily reward for day {} available", day);
        true
    }

    pub fn claim_daily_reward<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> ActionResult<DailyClaim> {
        let mut reward = self
            .daily_rewards
            .available_reward
            .take()
            .ok_or(ActionError::NoRewardAvailable)?;

        self.earn_coins(reward.coins);
        self.earn_gems(reward.gems);
        let item = reward.special.map(|special| match special {
            DailySpecial::LegendaryChest => {
                let kind = if rng.gen_bool(0.5) {
                    ItemKind::Weapon
                } else {
                    ItemKind::Armor
                };
                generate_item(rng, kind, Rarity::Legendary, false)
            }
            DailySpecial::MythicalItem => generate_mythical(rng),
        });
        if let Some(item) = &item {
            self.obtain_item(item.clone());
        }

        reward.claimed = true;
        reward.claim_date = Some(now);
        let daily = &mut self.daily_rewards;
        daily.last_claim_date = Some(now);
        daily.current_streak = reward.day;
        daily.max_streak = daily.max_streak.max(reward.day);
        daily.reward_history.push(reward.clone());
        info!("Claimed daily reward day {}", reward.day);
        Ok(DailyClaim { reward, item })
    }

    /// Accrue offline earnings for the gap since `last_save_time` (capped at
    /// `max_offline_hours`) and move the marker to `now`. Returns the credited seconds.
    pub fn calculate_offline_progress(&mut self, now: DateTime<Utc>) -> u64 {
        let factor = 1.0 + total_research_bonus(&self.research) / 300.0;
        let offline = &mut self.offline_progress;
        let last = offline.last_save_time.replace(now);
        let Some(last) = last else {
            return 0;
        };

        let gap = (now - last).num_seconds().max(0);
        let secs = gap.min(i64::from(offline.max_offline_hours) * 3600);
        if secs < MIN_OFFLINE_SECS {
            return 0;
        }
        let hours = secs as f64 / 3600.0;
        let coins = (hours * OFFLINE_COINS_PER_HOUR * factor).floor() as u64;
        let gems = (hours * OFFLINE_GEMS_PER_HOUR * factor).floor() as u64;
        offline.offline_coins += coins;
        offline.offline_gems += gems;
        offline.offline_time_secs += secs as u64;
        info!(
            "Offline for {}s: {} coins and {} gems waiting",
            secs, coins, gems
        );
        secs as u64
    }

    /// Move accrued offline earnings into the wallet.
    pub fn claim_offline_rewards(&mut self) -> ActionResult<(u64, u64)> {
        let coins = self.offline_progress.offline_coins;
        let gems = self.offline_progress.offline_gems;
        if coins == 0 && gems == 0 {
            return Err(ActionError::NoRewardAvailable);
        }
        self.earn_coins(coins);
        self.earn_gems(gems);
        let offline = &mut self.offline_progress;
        offline.offline_coins = 0;
        offline.offline_gems = 0;
        offline.offline_time_secs = 0;
        Ok((coins, gems))
    }

    /// Record that the game was alive at `now` so the next load measures its gap from here.
    pub fn mark_saved(&mut self, now: DateTime<Utc>) {
        self.offline_progress.last_save_time = Some(now);
    }

    /// Count the time-attack clock down by `seconds`. Returns true on the tick that
    /// runs it out.
    pub fn time_attack_tick(&mut self, seconds: u32) -> bool {
        let gm = &mut self.game_mode;
        if gm.current != ModeKind::TimeAttack || gm.time_attack_time_left == 0 {
            return false;
        }
        gm.time_attack_time_left = gm.time_attack_time_left.saturating_sub(seconds);
        if gm.time_attack_time_left == 0 {
            info!("Time attack over with score {}", gm.time_attack_score);
            return true;
        }
        false
    }
}
