//! Data model for a Hugoland save.
//!
//! [`GameState`] is the single root aggregate. Every track hanging off it is plain data:
//! the rules that mutate it live in the sibling modules (`combat`, `economy`, `timed`, ...).
//!
//! Serialization notes:
//! - Every struct carries `#[serde(default)]` so that older or partial saves deserialize
//!   with missing fields backfilled from defaults.
//! - Combat session fields (`current_enemy`, `in_combat`, `combat_log`) are never written;
//!   a reload always resumes outside combat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::achievements::{initial_achievements, initial_player_tags, AchievementId, TagId};

/// Maximum number of relics that may be equipped at once.
pub const MAX_EQUIPPED_RELICS: usize = 5;
/// Starting (and post-reset) coin balance.
pub const STARTING_COINS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythical,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythical => "mythical",
        }
    }
}

/// Discriminates weapons from armor. Relics reuse it for their bonus type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Weapon,
    Armor,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Weapon => "weapon",
            ItemKind::Armor => "armor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "weapon" | "w" => Some(ItemKind::Weapon),
            "armor" | "armour" | "a" => Some(ItemKind::Armor),
            _ => None,
        }
    }
}

/// A weapon or a piece of armor. `base_stat` is attack for weapons and defense for armor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub rarity: Rarity,
    pub base_stat: u64,
    pub level: u32,
    pub upgrade_cost: u64,
    pub sell_price: u64,
    pub durability: u32,
    pub max_durability: u32,
    #[serde(default)]
    pub enchanted: bool,
}

impl Item {
    /// Stat contributed while equipped: +10 atk per weapon level, +5 def per armor level.
    pub fn stat_bonus(&self) -> u64 {
        let per_level = match self.kind {
            ItemKind::Weapon => 10,
            ItemKind::Armor => 5,
        };
        self.base_stat + u64::from(self.level.saturating_sub(1)) * per_level
    }
}

/// An equippable relic bought from the Yojef market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relic {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub rarity: Rarity,
    pub base_stat: u64,
    pub level: u32,
    /// Purchase price in gems.
    pub cost: u64,
    pub upgrade_cost: u64,
    #[serde(default)]
    pub sell_price: u64,
}

impl Relic {
    pub fn stat_bonus(&self) -> u64 {
        let per_level = match self.kind {
            ItemKind::Weapon => 22,
            ItemKind::Armor => 15,
        };
        self.base_stat + u64::from(self.level.saturating_sub(1)) * per_level
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub zone: u32,
    pub hp: u64,
    pub max_hp: u64,
    pub atk: u64,
    pub def: u64,
    /// Source of truth for item-drop eligibility on defeat.
    pub can_drop_items: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub hp: u64,
    pub max_hp: u64,
    pub atk: u64,
    pub def: u64,
    pub base_atk: u64,
    pub base_def: u64,
    pub base_hp: u64,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            hp: 200,
            max_hp: 200,
            atk: 50,
            def: 0,
            base_atk: 50,
            base_def: 0,
            base_hp: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub weapons: Vec<Item>,
    pub armor: Vec<Item>,
    pub relics: Vec<Relic>,
    pub current_weapon: Option<String>,
    pub current_armor: Option<String>,
    pub equipped_relics: Vec<String>,
}

impl Inventory {
    pub fn items(&self, kind: ItemKind) -> &Vec<Item> {
        match kind {
            ItemKind::Weapon => &self.weapons,
            ItemKind::Armor => &self.armor,
        }
    }

    pub fn items_mut(&mut self, kind: ItemKind) -> &mut Vec<Item> {
        match kind {
            ItemKind::Weapon => &mut self.weapons,
            ItemKind::Armor => &mut self.armor,
        }
    }

    pub fn equipped_id(&self, kind: ItemKind) -> Option<&str> {
        match kind {
            ItemKind::Weapon => self.current_weapon.as_deref(),
            ItemKind::Armor => self.current_armor.as_deref(),
        }
    }

    pub fn equipped_slot_mut(&mut self, kind: ItemKind) -> &mut Option<String> {
        match kind {
            ItemKind::Weapon => &mut self.current_weapon,
            ItemKind::Armor => &mut self.current_armor,
        }
    }

    pub fn find(&self, kind: ItemKind, id: &str) -> Option<&Item> {
        self.items(kind).iter().find(|i| i.id == id)
    }

    pub fn equipped(&self, kind: ItemKind) -> Option<&Item> {
        let id = self.equipped_id(kind)?;
        self.find(kind, id)
    }

    pub fn equipped_mut(&mut self, kind: ItemKind) -> Option<&mut Item> {
        let id = self.equipped_id(kind)?.to_string();
        self.items_mut(kind).iter_mut().find(|i| i.id == id)
    }

    pub fn relic(&self, id: &str) -> Option<&Relic> {
        self.relics.iter().find(|r| r.id == id)
    }

    pub fn is_relic_equipped(&self, id: &str) -> bool {
        self.equipped_relics.iter().any(|r| r == id)
    }

    /// Equipped relics in equip order, skipping ids that no longer resolve.
    pub fn equipped_relic_items(&self) -> impl Iterator<Item = &Relic> {
        self.equipped_relics.iter().filter_map(move |id| self.relic(id))
    }

    pub fn add_item(&mut self, item: Item) {
        self.items_mut(item.kind).push(item);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchTrack {
    Atk,
    Def,
    Hp,
}

impl ResearchTrack {
    pub const ALL: [ResearchTrack; 3] = [ResearchTrack::Atk, ResearchTrack::Def, ResearchTrack::Hp];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "atk" | "attack" => Some(ResearchTrack::Atk),
            "def" | "defense" | "defence" => Some(ResearchTrack::Def),
            "hp" | "health" => Some(ResearchTrack::Hp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchProgress {
    pub level: u32,
    pub total_spent: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Research {
    pub atk: ResearchProgress,
    pub def: ResearchProgress,
    pub hp: ResearchProgress,
}

impl Research {
    pub fn track(&self, track: ResearchTrack) -> &ResearchProgress {
        match track {
            ResearchTrack::Atk => &self.atk,
            ResearchTrack::Def => &self.def,
            ResearchTrack::Hp => &self.hp,
        }
    }

    pub fn track_mut(&mut self, track: ResearchTrack) -> &mut ResearchProgress {
        match track {
            ResearchTrack::Atk => &mut self.atk,
            ResearchTrack::Def => &mut self.def,
            ResearchTrack::Hp => &mut self.hp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModeKind {
    #[default]
    Normal,
    Blitz,
    Bloodlust,
    Crazy,
    Survival,
    TimeAttack,
    Boss,
}

impl ModeKind {
    /// Character level required before the mode may be selected.
    pub fn required_level(&self) -> u32 {
        match self {
            ModeKind::Normal | ModeKind::Blitz => 1,
            ModeKind::Survival => 5,
            ModeKind::TimeAttack | ModeKind::Bloodlust => 10,
            ModeKind::Boss => 20,
            ModeKind::Crazy => 25,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Some(ModeKind::Normal),
            "blitz" => Some(ModeKind::Blitz),
            "bloodlust" => Some(ModeKind::Bloodlust),
            "crazy" => Some(ModeKind::Crazy),
            "survival" => Some(ModeKind::Survival),
            "timeattack" | "time_attack" | "time-attack" => Some(ModeKind::TimeAttack),
            "boss" => Some(ModeKind::Boss),
            _ => None,
        }
    }
}

pub const SURVIVAL_LIVES: u32 = 3;
pub const TIME_ATTACK_SECONDS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameMode {
    pub current: ModeKind,
    pub speed_mode_active: bool,
    pub survival_lives: u32,
    pub max_survival_lives: u32,
    pub time_attack_score: u32,
    pub time_attack_time_left: u32,
    pub boss_progress: u32,
}

impl Default for GameMode {
    fn default() -> Self {
        Self {
            current: ModeKind::Normal,
            speed_mode_active: false,
            survival_lives: SURVIVAL_LIVES,
            max_survival_lives: SURVIVAL_LIVES,
            time_attack_score: 0,
            time_attack_time_left: TIME_ATTACK_SECONDS,
            boss_progress: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeStreak {
    pub current: u32,
    pub best: u32,
    pub multiplier: f64,
    pub last_correct_time: Option<DateTime<Utc>>,
}

impl Default for KnowledgeStreak {
    fn default() -> Self {
        Self {
            current: 0,
            best: 0,
            multiplier: 1.0,
            last_correct_time: None,
        }
    }
}

/// Rotating relic offers. A missing `next_refresh` means a refresh is due now.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YojefMarket {
    pub items: Vec<Relic>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub next_refresh: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GardenOfGrowth {
    pub is_planted: bool,
    pub planted_at: Option<DateTime<Utc>>,
    pub last_watered: Option<DateTime<Utc>>,
    pub water_hours_remaining: f64,
    pub growth_cm: f64,
    /// Percentage bonus applied to atk/def/hp multipliers (growth_cm * 5).
    pub total_growth_bonus: f64,
    pub seed_cost: u64,
    pub max_growth_cm: f64,
}

impl Default for GardenOfGrowth {
    fn default() -> Self {
        Self {
            is_planted: false,
            planted_at: None,
            last_watered: None,
            water_hours_remaining: 0.0,
            growth_cm: 0.0,
            total_growth_bonus: 0.0,
            seed_cost: 5000,
            max_growth_cm: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailySpecial {
    LegendaryChest,
    MythicalItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReward {
    pub day: u32,
    pub coins: u64,
    pub gems: u64,
    #[serde(default)]
    pub special: Option<DailySpecial>,
    #[serde(default)]
    pub claimed: bool,
    #[serde(default)]
    pub claim_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyRewards {
    pub last_claim_date: Option<DateTime<Utc>>,
    pub current_streak: u32,
    pub max_streak: u32,
    pub available_reward: Option<DailyReward>,
    pub reward_history: Vec<DailyReward>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineProgress {
    /// Last time the game was known to be running. `None` on a save that never recorded it.
    pub last_save_time: Option<DateTime<Utc>>,
    pub offline_coins: u64,
    pub offline_gems: u64,
    pub offline_time_secs: u64,
    pub max_offline_hours: u32,
}

impl Default for OfflineProgress {
    fn default() -> Self {
        Self {
            last_save_time: None,
            offline_coins: 0,
            offline_gems: 0,
            offline_time_secs: 0,
            max_offline_hours: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    CombatMastery,
    KnowledgeBoost,
    TreasureHunter,
    DurabilityExpert,
    StreakMaster,
    HealthRegeneration,
}

impl Skill {
    pub fn cost(&self) -> u32 {
        match self {
            Skill::CombatMastery => 1,
            Skill::KnowledgeBoost | Skill::TreasureHunter => 2,
            Skill::DurabilityExpert | Skill::StreakMaster => 3,
            Skill::HealthRegeneration => 4,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "combat_mastery" => Some(Skill::CombatMastery),
            "knowledge_boost" => Some(Skill::KnowledgeBoost),
            "treasure_hunter" => Some(Skill::TreasureHunter),
            "durability_expert" => Some(Skill::DurabilityExpert),
            "streak_master" => Some(Skill::StreakMaster),
            "health_regeneration" => Some(Skill::HealthRegeneration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progression {
    pub level: u32,
    pub experience: u64,
    pub experience_to_next: u64,
    pub skill_points: u32,
    pub unlocked_skills: Vec<Skill>,
    pub prestige_level: u32,
    pub prestige_points: u32,
    pub mastery_levels: BTreeMap<String, u32>,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            experience_to_next: 100,
            skill_points: 0,
            unlocked_skills: Vec::new(),
            prestige_level: 0,
            prestige_points: 0,
            mastery_levels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTag {
    pub id: TagId,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryAccuracy {
    pub correct: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub total_questions_answered: u64,
    pub correct_answers: u64,
    /// Seconds of active play.
    pub total_play_time: u64,
    pub zones_reached: u32,
    pub items_collected: u64,
    pub coins_earned: u64,
    pub gems_earned: u64,
    pub shiny_gems_earned: u64,
    pub chests_opened: u64,
    pub accuracy_by_category: BTreeMap<String, CategoryAccuracy>,
    pub session_start_time: Option<DateTime<Utc>>,
    pub total_deaths: u64,
    pub total_victories: u64,
    pub longest_streak: u32,
    pub total_damage_dealt: u64,
    pub total_damage_taken: u64,
    pub items_upgraded: u64,
    pub items_sold: u64,
    pub total_research_spent: u64,
    pub average_accuracy: f64,
    pub revivals: u64,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_questions_answered: 0,
            correct_answers: 0,
            total_play_time: 0,
            zones_reached: 1,
            items_collected: 0,
            coins_earned: 0,
            gems_earned: 0,
            shiny_gems_earned: 0,
            chests_opened: 0,
            accuracy_by_category: BTreeMap::new(),
            session_start_time: None,
            total_deaths: 0,
            total_victories: 0,
            longest_streak: 0,
            total_damage_dealt: 0,
            total_damage_taken: 0,
            items_upgraded: 0,
            items_sold: 0,
            total_research_spent: 0,
            average_accuracy: 0.0,
            revivals: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cheat {
    InfiniteCoins,
    InfiniteGems,
    ObtainAnyItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheatSettings {
    pub infinite_coins: bool,
    pub infinite_gems: bool,
    pub obtain_any_item: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mining {
    pub efficiency: u64,
    pub total_gems_mined: u64,
    pub total_shiny_gems_mined: u64,
}

impl Default for Mining {
    fn default() -> Self {
        Self {
            efficiency: 1,
            total_gems_mined: 0,
            total_shiny_gems_mined: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionBook {
    pub weapons: BTreeSet<String>,
    pub armor: BTreeSet<String>,
    pub total_weapons_found: u64,
    pub total_armor_found: u64,
    pub rarity_stats: BTreeMap<Rarity, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub colorblind_mode: bool,
    pub dark_mode: bool,
    pub language: String,
    pub notifications: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            colorblind_mode: false,
            dark_mode: true,
            language: "en".to_string(),
            notifications: true,
        }
    }
}

/// Partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub colorblind_mode: Option<bool>,
    pub dark_mode: Option<bool>,
    pub language: Option<String>,
    pub notifications: Option<bool>,
}

/// The root aggregate. One instance lives for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub coins: u64,
    pub gems: u64,
    pub shiny_gems: u64,
    pub zone: u32,
    pub player_stats: PlayerStats,
    pub inventory: Inventory,
    #[serde(skip)]
    pub current_enemy: Option<Enemy>,
    #[serde(skip)]
    pub in_combat: bool,
    #[serde(skip)]
    pub combat_log: Vec<String>,
    pub research: Research,
    pub is_premium: bool,
    pub achievements: Vec<Achievement>,
    pub collection_book: CollectionBook,
    pub knowledge_streak: KnowledgeStreak,
    pub game_mode: GameMode,
    pub statistics: Statistics,
    pub cheats: CheatSettings,
    pub mining: Mining,
    pub yojef_market: YojefMarket,
    pub player_tags: Vec<PlayerTag>,
    pub daily_rewards: DailyRewards,
    pub progression: Progression,
    pub offline_progress: OfflineProgress,
    pub garden_of_growth: GardenOfGrowth,
    pub settings: GameSettings,
    pub has_used_revival: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            coins: STARTING_COINS,
            gems: 0,
            shiny_gems: 0,
            zone: 1,
            player_stats: PlayerStats::default(),
            inventory: Inventory::default(),
            current_enemy: None,
            in_combat: false,
            combat_log: Vec::new(),
            research: Research::default(),
            is_premium: false,
            achievements: initial_achievements(),
            collection_book: CollectionBook::default(),
            knowledge_streak: KnowledgeStreak::default(),
            game_mode: GameMode::default(),
            statistics: Statistics::default(),
            cheats: CheatSettings::default(),
            mining: Mining::default(),
            yojef_market: YojefMarket::default(),
            player_tags: initial_player_tags(),
            daily_rewards: DailyRewards::default(),
            progression: Progression::default(),
            offline_progress: OfflineProgress::default(),
            garden_of_growth: GardenOfGrowth::default(),
            settings: GameSettings::default(),
            has_used_revival: false,
        }
    }
}
