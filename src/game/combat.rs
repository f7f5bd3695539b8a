//! Combat state machine.
//!
//! `idle -> in combat -> (victory | defeat | revived | lost a survival life) -> idle`.
//! [`GameState::resolve_answer`] is the only operation that advances a fight; the trivia
//! layer supplies whether the answer was right and, optionally, its category.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::Rng;

use super::formulas::{grant_experience, streak_multiplier};
use super::generator::{chest_rarity_weights, generate_enemy, roll_item};
use super::types::{Enemy, GameState, Item, ItemKind, ModeKind};
use super::{ActionError, ActionResult};

/// Chance of an item drop from a drop-eligible enemy.
pub const DROP_CHANCE: f64 = 0.15;
pub const XP_CORRECT: u64 = 10;
pub const XP_INCORRECT: u64 = 5;

/// Result of one answered question.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// Enemy took damage and survived.
    Hit { damage: u64 },
    /// Player took damage and survived.
    Missed { damage: u64 },
    Victory {
        coins: u64,
        gems: u64,
        drop: Option<Item>,
    },
    /// Player hit zero hp and the one-time revival restored half of max hp.
    Revived { hp: u64 },
    /// Combat ended in defeat. `lives_remaining` is set in survival mode.
    Defeat { lives_remaining: Option<u32> },
}

/// (coin multiplier, gem multiplier) for the active mode, before the streak multiplier.
pub fn mode_reward_multipliers(mode: ModeKind) -> (f64, f64) {
    match mode {
        ModeKind::Blitz => (1.25, 1.1),
        ModeKind::Crazy => (6.0, 6.0),
        _ => (1.0, 1.0),
    }
}

/// Base victory payout before multipliers: coins in `[8z, 8z + 15)`, gems in `[1, 4)`.
pub fn roll_base_rewards<R: Rng + ?Sized>(rng: &mut R, zone: u32) -> (u64, u64) {
    let coins = u64::from(zone) * 8 + rng.gen_range(0..15);
    let gems = rng.gen_range(1..4);
    (coins, gems)
}

impl GameState {
    /// Generate an enemy for the current zone and enter combat at full hp.
    pub fn start_combat<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ActionResult<Enemy> {
        if self.in_combat {
            return Err(ActionError::AlreadyInCombat);
        }
        if self.game_mode.current == ModeKind::Survival && self.game_mode.survival_lives == 0 {
            return Err(ActionError::NoLivesRemaining);
        }

        let mut enemy = generate_enemy(rng, self.zone);
        if self.game_mode.current == ModeKind::Crazy {
            enemy.max_hp *= 3;
            enemy.hp = enemy.max_hp;
            enemy.atk *= 3;
            enemy.def *= 2;
        }

        self.recompute_stats();
        self.player_stats.hp = self.player_stats.max_hp;
        self.combat_log = vec![format!(
            "You encounter a {} in Zone {}!",
            enemy.name, self.zone
        )];
        self.current_enemy = Some(enemy.clone());
        self.in_combat = true;
        debug!("combat started: {} (zone {}, hp {})", enemy.name, self.zone, enemy.hp);
        Ok(enemy)
    }

    /// Apply one answered question to the current fight.
    pub fn resolve_answer<R: Rng + ?Sized>(
        &mut self,
        correct: bool,
        category: Option<&str>,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> ActionResult<AnswerOutcome> {
        let enemy = match (&self.current_enemy, self.in_combat) {
            (Some(enemy), true) => enemy.clone(),
            _ => return Err(ActionError::NotInCombat),
        };

        self.record_answer(correct, category);
        self.advance_streak(correct, now);
        let xp = if correct { XP_CORRECT } else { XP_INCORRECT };
        let gained = grant_experience(&mut self.progression, xp);
        if gained > 0 {
            info!("Level up! Now level {}", self.progression.level);
        }

        let outcome = if correct {
            self.player_hits(enemy, rng)
        } else {
            self.enemy_hits(enemy)
        };

        self.evaluate_unlocks(now);
        Ok(outcome)
    }

    fn record_answer(&mut self, correct: bool, category: Option<&str>) {
        let stats = &mut self.statistics;
        stats.total_questions_answered += 1;
        if correct {
            stats.correct_answers += 1;
        }
        if let Some(category) = category {
            let entry = stats
                .accuracy_by_category
                .entry(category.to_string())
                .or_default();
            entry.total += 1;
            if correct {
                entry.correct += 1;
            }
        }
        stats.average_accuracy =
            stats.correct_answers as f64 / stats.total_questions_answered as f64 * 100.0;
    }

    fn advance_streak(&mut self, correct: bool, now: DateTime<Utc>) {
        let streak = &mut self.knowledge_streak;
        if correct {
            streak.current += 1;
            streak.best = streak.best.max(streak.current);
            streak.last_correct_time = Some(now);
            self.statistics.longest_streak = self.statistics.longest_streak.max(streak.current);
        } else {
            streak.current = 0;
        }
        streak.multiplier = streak_multiplier(streak.current);
    }

    fn player_hits<R: Rng + ?Sized>(&mut self, enemy: Enemy, rng: &mut R) -> AnswerOutcome {
        let damage = self.player_stats.atk.saturating_sub(enemy.def).max(1);
        self.statistics.total_damage_dealt += damage;

        for kind in [ItemKind::Weapon, ItemKind::Armor] {
            if let Some(item) = self.inventory.equipped_mut(kind) {
                item.durability = item.durability.saturating_sub(1);
            }
        }

        self.combat_log
            .push(format!("You deal {} damage to the {}!", damage, enemy.name));

        if enemy.hp > damage {
            if let Some(current) = self.current_enemy.as_mut() {
                current.hp = enemy.hp - damage;
            }
            return AnswerOutcome::Hit { damage };
        }

        self.win_combat(enemy, rng)
    }

    fn win_combat<R: Rng + ?Sized>(&mut self, enemy: Enemy, rng: &mut R) -> AnswerOutcome {
        self.combat_log.push(format!("You defeated the {}!", enemy.name));

        let (mode_coins, mode_gems) = mode_reward_multipliers(self.game_mode.current);
        let streak = self.knowledge_streak.multiplier;
        let (base_coins, base_gems) = roll_base_rewards(rng, self.zone);
        let coins = (base_coins as f64 * mode_coins * streak).floor() as u64;
        let gems = (base_gems as f64 * mode_gems * streak).floor() as u64;
        self.earn_coins(coins);
        self.earn_gems(gems);
        self.combat_log
            .push(format!("You earned {} coins and {} gems!", coins, gems));

        let drop = if enemy.can_drop_items && rng.gen_bool(DROP_CHANCE) {
            let item = roll_item(rng, &chest_rarity_weights(0));
            self.combat_log
                .push(format!("The {} dropped a {}!", enemy.name, item.name));
            self.obtain_item(item.clone());
            Some(item)
        } else {
            None
        };

        self.zone += 1;
        self.statistics.zones_reached = self.statistics.zones_reached.max(self.zone);
        self.statistics.total_victories += 1;
        if self.zone >= 50 {
            self.is_premium = true;
        }
        match self.game_mode.current {
            ModeKind::TimeAttack if self.game_mode.time_attack_time_left > 0 => {
                self.game_mode.time_attack_score += 1
            }
            ModeKind::Boss => self.game_mode.boss_progress += 1,
            _ => {}
        }

        self.current_enemy = None;
        self.in_combat = false;
        info!(
            "Defeated {} in zone {} (+{} coins, +{} gems)",
            enemy.name, enemy.zone, coins, gems
        );
        AnswerOutcome::Victory { coins, gems, drop }
    }

    fn enemy_hits(&mut self, enemy: Enemy) -> AnswerOutcome {
        let damage = enemy.atk.saturating_sub(self.player_stats.def).max(1);
        self.statistics.total_damage_taken += damage;
        self.player_stats.hp = self.player_stats.hp.saturating_sub(damage);
        self.combat_log.push(format!(
            "You missed! The {} deals {} damage to you!",
            enemy.name, damage
        ));

        if self.player_stats.hp > 0 {
            return AnswerOutcome::Missed { damage };
        }

        if !self.has_used_revival {
            let hp = self.player_stats.max_hp / 2;
            self.player_stats.hp = hp;
            self.has_used_revival = true;
            self.statistics.revivals += 1;
            self.combat_log
                .push(format!("You used your free revival! You're back with {} HP!", hp));
            return AnswerOutcome::Revived { hp };
        }

        self.combat_log
            .push(format!("You were defeated by the {}...", enemy.name));
        self.statistics.total_deaths += 1;
        self.current_enemy = None;
        self.in_combat = false;

        let lives_remaining = if self.game_mode.current == ModeKind::Survival {
            self.game_mode.survival_lives = self.game_mode.survival_lives.saturating_sub(1);
            Some(self.game_mode.survival_lives)
        } else {
            None
        };
        info!("Defeated by {} in zone {}", enemy.name, enemy.zone);
        AnswerOutcome::Defeat { lives_remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn weak_enemy(state: &mut GameState, hp: u64, atk: u64) {
        let enemy = state.current_enemy.as_mut().unwrap();
        enemy.hp = hp;
        enemy.max_hp = hp;
        enemy.atk = atk;
        enemy.def = 0;
    }

    #[test]
    fn victory_advances_zone_and_logs() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut s = GameState::new();
        s.start_combat(&mut rng).unwrap();
        weak_enemy(&mut s, 50, 1);

        let out = s.resolve_answer(true, None, &mut rng, Utc::now()).unwrap();
        match out {
            AnswerOutcome::Victory { coins, gems, .. } => {
                // zone 1, streak 1 => multiplier 1.0
                assert!((8..23).contains(&coins));
                assert!((1..4).contains(&gems));
            }
            other => panic!("expected victory, got {:?}", other),
        }
        assert_eq!(s.zone, 2);
        assert!(!s.in_combat);
        assert!(s.current_enemy.is_none());
        assert!(s.combat_log.iter().any(|l| l.contains("defeated")));
    }

    #[test]
    fn hit_wears_equipped_gear() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut s = GameState::new();
        let sword = crate::game::generator::generate_item(
            &mut rng,
            ItemKind::Weapon,
            crate::game::Rarity::Common,
            false,
        );
        s.inventory.current_weapon = Some(sword.id.clone());
        s.inventory.weapons.push(sword);
        s.start_combat(&mut rng).unwrap();
        weak_enemy(&mut s, 10_000, 1);

        let out = s.resolve_answer(true, Some("history"), &mut rng, Utc::now()).unwrap();
        assert!(matches!(out, AnswerOutcome::Hit { .. }));
        assert_eq!(s.inventory.weapons[0].durability, 99);
        assert_eq!(s.statistics.accuracy_by_category["history"].correct, 1);
        assert!(s.in_combat);
    }

    #[test]
    fn revival_then_defeat() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut s = GameState::new();
        s.start_combat(&mut rng).unwrap();
        weak_enemy(&mut s, 10_000, 10_000);

        let out = s.resolve_answer(false, None, &mut rng, Utc::now()).unwrap();
        assert_eq!(out, AnswerOutcome::Revived { hp: 100 });
        assert!(s.has_used_revival);
        assert!(s.in_combat);
        assert_eq!(s.player_stats.hp, s.player_stats.max_hp / 2);

        let out = s.resolve_answer(false, None, &mut rng, Utc::now()).unwrap();
        assert_eq!(out, AnswerOutcome::Defeat { lives_remaining: None });
        assert!(!s.in_combat);
        assert_eq!(s.statistics.total_deaths, 1);
    }

    #[test]
    fn survival_defeat_costs_a_life() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut s = GameState::new();
        s.progression.level = 5;
        s.set_game_mode(ModeKind::Survival).unwrap();
        s.has_used_revival = true;
        s.start_combat(&mut rng).unwrap();
        weak_enemy(&mut s, 10_000, 10_000);

        let out = s.resolve_answer(false, None, &mut rng, Utc::now()).unwrap();
        assert_eq!(out, AnswerOutcome::Defeat { lives_remaining: Some(2) });
    }

    #[test]
    fn wrong_answer_resets_streak() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut s = GameState::new();
        s.start_combat(&mut rng).unwrap();
        weak_enemy(&mut s, 1_000_000, 1);
        for _ in 0..7 {
            s.resolve_answer(true, None, &mut rng, Utc::now()).unwrap();
        }
        assert_eq!(s.knowledge_streak.current, 7);
        assert_eq!(s.knowledge_streak.multiplier, 1.1);
        s.resolve_answer(false, None, &mut rng, Utc::now()).unwrap();
        assert_eq!(s.knowledge_streak.current, 0);
        assert_eq!(s.knowledge_streak.multiplier, 1.0);
        assert_eq!(s.knowledge_streak.best, 7);
    }

    #[test]
    fn crazy_mode_triples_enemy() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = GameState::new();
        s.progression.level = 25;
        s.set_game_mode(ModeKind::Crazy).unwrap();
        let e = s.start_combat(&mut rng).unwrap();
        assert_eq!(e.max_hp, 3 * (80 + 20));
        assert_eq!(e.atk, 3 * (15 + 4));
        assert_eq!(e.def, 2 * 2);
    }

    #[test]
    fn answering_outside_combat_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = GameState::new();
        let before = s.clone();
        let err = s.resolve_answer(true, None, &mut rng, Utc::now()).unwrap_err();
        assert_eq!(err, ActionError::NotInCombat);
        assert_eq!(s, before);
    }

    #[test]
    fn crazy_rewards_are_six_times_normal() {
        assert_eq!(mode_reward_multipliers(ModeKind::Crazy), (6.0, 6.0));
        assert_eq!(mode_reward_multipliers(ModeKind::Normal), (1.0, 1.0));
        assert_eq!(mode_reward_multipliers(ModeKind::Blitz), (1.25, 1.1));
    }

    #[test]
    fn time_attack_scores_only_while_clock_runs() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut s = GameState::new();
        s.progression.level = 10;
        s.set_game_mode(ModeKind::TimeAttack).unwrap();

        s.start_combat(&mut rng).unwrap();
        weak_enemy(&mut s, 1, 1);
        s.resolve_answer(true, None, &mut rng, Utc::now()).unwrap();
        assert_eq!(s.game_mode.time_attack_score, 1);

        s.time_attack_tick(60);
        assert_eq!(s.game_mode.time_attack_time_left, 0);
        s.start_combat(&mut rng).unwrap();
        weak_enemy(&mut s, 1, 1);
        let out = s.resolve_answer(true, None, &mut rng, Utc::now()).unwrap();
        assert!(matches!(out, AnswerOutcome::Victory { .. }));
        assert_eq!(s.game_mode.time_attack_score, 1);
    }
}
