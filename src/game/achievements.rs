//! Achievement and player-tag catalogue.
//!
//! The catalogue is fixed at compile time. Evaluation is split in two:
//! - [`qualifying_achievements`] / [`qualifying_tags`] are pure: they inspect a snapshot
//!   and report which still-locked entries now qualify.
//! - [`GameState::evaluate_unlocks`] marks those entries unlocked and credits rewards.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::types::{Achievement, GameState, PlayerTag, Rarity};

/// Coin/gem payout credited when an achievement unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reward {
    pub coins: u64,
    pub gems: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstVictory,
    Zone10,
    Zone25,
    Zone50,
    Streak10,
    Streak25,
    FirstChest,
    ResearchLevel10,
    Collector10,
    Collector50,
    FirstMythical,
    ShinyHunter,
    FirstPrestige,
}

impl AchievementId {
    pub const ALL: [AchievementId; 13] = [
        AchievementId::FirstVictory,
        AchievementId::Zone10,
        AchievementId::Zone25,
        AchievementId::Zone50,
        AchievementId::Streak10,
        AchievementId::Streak25,
        AchievementId::FirstChest,
        AchievementId::ResearchLevel10,
        AchievementId::Collector10,
        AchievementId::Collector50,
        AchievementId::FirstMythical,
        AchievementId::ShinyHunter,
        AchievementId::FirstPrestige,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AchievementId::FirstVictory => "First Blood",
            AchievementId::Zone10 => "Explorer",
            AchievementId::Zone25 => "Pathfinder",
            AchievementId::Zone50 => "Conqueror",
            AchievementId::Streak10 => "Sharp Mind",
            AchievementId::Streak25 => "Walking Encyclopedia",
            AchievementId::FirstChest => "Treasure Hunter",
            AchievementId::ResearchLevel10 => "Scientist",
            AchievementId::Collector10 => "Collector",
            AchievementId::Collector50 => "Hoarder",
            AchievementId::FirstMythical => "Myth Maker",
            AchievementId::ShinyHunter => "Shiny Hunter",
            AchievementId::FirstPrestige => "Reborn",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AchievementId::FirstVictory => "Defeat your first enemy",
            AchievementId::Zone10 => "Reach zone 10",
            AchievementId::Zone25 => "Reach zone 25",
            AchievementId::Zone50 => "Reach zone 50",
            AchievementId::Streak10 => "Answer 10 questions in a row correctly",
            AchievementId::Streak25 => "Answer 25 questions in a row correctly",
            AchievementId::FirstChest => "Open your first chest",
            AchievementId::ResearchLevel10 => "Raise any research track to level 10",
            AchievementId::Collector10 => "Discover 10 different items",
            AchievementId::Collector50 => "Discover 50 different items",
            AchievementId::FirstMythical => "Obtain a mythical item",
            AchievementId::ShinyHunter => "Mine a shiny gem",
            AchievementId::FirstPrestige => "Prestige for the first time",
        }
    }

    pub fn reward(&self) -> Reward {
        let (coins, gems) = match self {
            AchievementId::FirstVictory => (50, 0),
            AchievementId::Zone10 => (500, 10),
            AchievementId::Zone25 => (2_000, 25),
            AchievementId::Zone50 => (10_000, 100),
            AchievementId::Streak10 => (250, 5),
            AchievementId::Streak25 => (1_000, 20),
            AchievementId::FirstChest => (100, 0),
            AchievementId::ResearchLevel10 => (0, 50),
            AchievementId::Collector10 => (300, 0),
            AchievementId::Collector50 => (2_500, 30),
            AchievementId::FirstMythical => (0, 100),
            AchievementId::ShinyHunter => (0, 20),
            AchievementId::FirstPrestige => (5_000, 200),
        };
        Reward { coins, gems }
    }

    fn qualifies(&self, state: &GameState) -> bool {
        let stats = &state.statistics;
        let discovered =
            state.collection_book.weapons.len() + state.collection_book.armor.len();
        match self {
            AchievementId::FirstVictory => stats.total_victories >= 1,
            AchievementId::Zone10 => state.zone >= 10,
            AchievementId::Zone25 => state.zone >= 25,
            AchievementId::Zone50 => state.zone >= 50,
            AchievementId::Streak10 => state.knowledge_streak.best >= 10,
            AchievementId::Streak25 => state.knowledge_streak.best >= 25,
            AchievementId::FirstChest => stats.chests_opened >= 1,
            AchievementId::ResearchLevel10 => {
                let r = &state.research;
                r.atk.level >= 10 || r.def.level >= 10 || r.hp.level >= 10
            }
            AchievementId::Collector10 => discovered >= 10,
            AchievementId::Collector50 => discovered >= 50,
            AchievementId::FirstMythical => state
                .collection_book
                .rarity_stats
                .get(&Rarity::Mythical)
                .map_or(false, |n| *n >= 1),
            AchievementId::ShinyHunter => state.mining.total_shiny_gems_mined >= 1,
            AchievementId::FirstPrestige => state.progression.prestige_level >= 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagId {
    Newcomer,
    Scholar,
    Veteran,
    TreasureSeeker,
    Unstoppable,
    GemBaron,
    Gardener,
    Legend,
}

impl TagId {
    pub const ALL: [TagId; 8] = [
        TagId::Newcomer,
        TagId::Scholar,
        TagId::Veteran,
        TagId::TreasureSeeker,
        TagId::Unstoppable,
        TagId::GemBaron,
        TagId::Gardener,
        TagId::Legend,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TagId::Newcomer => "Newcomer",
            TagId::Scholar => "Scholar",
            TagId::Veteran => "Veteran",
            TagId::TreasureSeeker => "Treasure Seeker",
            TagId::Unstoppable => "Unstoppable",
            TagId::GemBaron => "Gem Baron",
            TagId::Gardener => "Gardener",
            TagId::Legend => "Legend",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TagId::Newcomer => "Answered your first question",
            TagId::Scholar => "Answered 100 questions correctly",
            TagId::Veteran => "Won 100 battles",
            TagId::TreasureSeeker => "Opened 25 chests",
            TagId::Unstoppable => "Reached a 50 answer streak",
            TagId::GemBaron => "Earned 1000 gems",
            TagId::Gardener => "Grew the garden to full height",
            TagId::Legend => "Prestiged three times",
        }
    }

    fn qualifies(&self, state: &GameState) -> bool {
        let stats = &state.statistics;
        match self {
            TagId::Newcomer => stats.total_questions_answered >= 1,
            TagId::Scholar => stats.correct_answers >= 100,
            TagId::Veteran => stats.total_victories >= 100,
            TagId::TreasureSeeker => stats.chests_opened >= 25,
            TagId::Unstoppable => state.knowledge_streak.best >= 50,
            TagId::GemBaron => stats.gems_earned >= 1_000,
            TagId::Gardener => {
                let g = &state.garden_of_growth;
                g.max_growth_cm > 0.0 && g.growth_cm >= g.max_growth_cm
            }
            TagId::Legend => state.progression.prestige_level >= 3,
        }
    }
}

/// Every catalogue achievement, locked.
pub fn initial_achievements() -> Vec<Achievement> {
    AchievementId::ALL
        .iter()
        .map(|id| Achievement {
            id: *id,
            unlocked: false,
            unlocked_at: None,
        })
        .collect()
}

/// Every catalogue tag, locked.
pub fn initial_player_tags() -> Vec<PlayerTag> {
    TagId::ALL
        .iter()
        .map(|id| PlayerTag {
            id: *id,
            unlocked: false,
            unlocked_at: None,
        })
        .collect()
}

fn achievement_unlocked(state: &GameState, id: AchievementId) -> bool {
    state.achievements.iter().any(|a| a.id == id && a.unlocked)
}

fn tag_unlocked(state: &GameState, id: TagId) -> bool {
    state.player_tags.iter().any(|t| t.id == id && t.unlocked)
}

/// Locked achievements whose condition holds for `state`.
pub fn qualifying_achievements(state: &GameState) -> Vec<AchievementId> {
    AchievementId::ALL
        .iter()
        .copied()
        .filter(|id| !achievement_unlocked(state, *id) && id.qualifies(state))
        .collect()
}

/// Locked tags whose condition holds for `state`.
pub fn qualifying_tags(state: &GameState) -> Vec<TagId> {
    TagId::ALL
        .iter()
        .copied()
        .filter(|id| !tag_unlocked(state, *id) && id.qualifies(state))
        .collect()
}

/// What a single evaluation pass unlocked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unlocks {
    pub achievements: Vec<AchievementId>,
    pub tags: Vec<TagId>,
}

impl Unlocks {
    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty() && self.tags.is_empty()
    }
}

impl GameState {
    /// Unlock everything that now qualifies and credit achievement rewards.
    pub fn evaluate_unlocks(&mut self, now: DateTime<Utc>) -> Unlocks {
        let achievements = qualifying_achievements(self);
        let tags = qualifying_tags(self);

        for id in &achievements {
            match self.achievements.iter_mut().find(|a| a.id == *id) {
                Some(entry) => {
                    entry.unlocked = true;
                    entry.unlocked_at = Some(now);
                }
                None => self.achievements.push(Achievement {
                    id: *id,
                    unlocked: true,
                    unlocked_at: Some(now),
                }),
            }
            let reward = id.reward();
            self.earn_coins(reward.coins);
            self.earn_gems(reward.gems);
            info!("Achievement unlocked: {} (+{} coins, +{} gems)", id.name(), reward.coins, reward.gems);
        }

        for id in &tags {
            match self.player_tags.iter_mut().find(|t| t.id == *id) {
                Some(entry) => {
                    entry.unlocked = true;
                    entry.unlocked_at = Some(now);
                }
                None => self.player_tags.push(PlayerTag {
                    id: *id,
                    unlocked: true,
                    unlocked_at: Some(now),
                }),
            }
            info!("Player tag earned: {}", id.name());
        }

        Unlocks { achievements, tags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_full_locked_catalogue() {
        let s = GameState::default();
        assert_eq!(s.achievements.len(), AchievementId::ALL.len());
        assert_eq!(s.player_tags.len(), TagId::ALL.len());
        assert!(s.achievements.iter().all(|a| !a.unlocked));
        assert!(qualifying_achievements(&s).is_empty());
        assert!(qualifying_tags(&s).is_empty());
    }

    #[test]
    fn unlock_credits_reward_once() {
        let mut s = GameState::default();
        s.statistics.total_victories = 1;
        let now = Utc::now();
        let first = s.evaluate_unlocks(now);
        assert_eq!(first.achievements, vec![AchievementId::FirstVictory]);
        assert_eq!(s.coins, 100 + 50);

        let second = s.evaluate_unlocks(now);
        assert!(second.is_empty());
        assert_eq!(s.coins, 150);
    }

    #[test]
    fn zone_milestones_unlock_together() {
        let mut s = GameState::default();
        s.zone = 26;
        let unlocked = s.evaluate_unlocks(Utc::now());
        assert!(unlocked.achievements.contains(&AchievementId::Zone10));
        assert!(unlocked.achievements.contains(&AchievementId::Zone25));
        assert!(!unlocked.achievements.contains(&AchievementId::Zone50));
    }

    #[test]
    fn tags_have_no_reward() {
        let mut s = GameState::default();
        s.statistics.total_questions_answered = 1;
        let before = (s.coins, s.gems);
        let unlocked = s.evaluate_unlocks(Utc::now());
        assert_eq!(unlocked.tags, vec![TagId::Newcomer]);
        assert_eq!((s.coins, s.gems), before);
        assert!(s.player_tags.iter().any(|t| t.id == TagId::Newcomer && t.unlocked));
    }

    #[test]
    fn missing_entries_are_appended_on_unlock() {
        let mut s = GameState::default();
        s.achievements.clear();
        s.mining.total_shiny_gems_mined = 1;
        s.evaluate_unlocks(Utc::now());
        assert!(s
            .achievements
            .iter()
            .any(|a| a.id == AchievementId::ShinyHunter && a.unlocked));
    }
}
