//! Versioned save format for [`GameState`].
//!
//! # Format
//!
//! ```text
//! {"version": 2, "saved_at": "<RFC3339>", "state": { ...GameState... }}
//! ```
//!
//! Version 1 saves are the bare state object with no envelope. In v1, upgrading a relic
//! added its per-level increment to `base_stat` as well as to `level`; the v1 -> v2 step
//! takes that increment back out so the bonus is only counted once.
//!
//! # Loading
//!
//! 1. Parse the blob as JSON and detect its version.
//! 2. Run the migration chain up to [`CURRENT_VERSION`].
//! 3. Merge the result over `GameState::default()` one top-level section at a time. A
//!    section that fails to deserialize keeps its default and is reported as a fallback.
//!    Inventory lists are salvaged per element.
//! 4. [`repair`] the merged state so every invariant holds again.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::achievements::{AchievementId, TagId};
use super::formulas::{experience_to_next, streak_multiplier};
use super::types::{GameState, Inventory, MAX_EQUIPPED_RELICS};
use super::{Achievement, PlayerTag};
use crate::errors::{GameError, GameResult};

/// Format written by [`encode`].
pub const CURRENT_VERSION: u32 = 2;

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    state: &'a GameState,
}

/// A decoded save plus a report of what had to be patched on the way in.
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub state: GameState,
    pub from_version: u32,
    pub saved_at: Option<DateTime<Utc>>,
    /// Sections or elements that were malformed and replaced by defaults.
    pub fallbacks: Vec<String>,
    /// Invariant repairs applied after merging.
    pub repairs: Vec<String>,
}

/// Serialize `state` into the current envelope. Combat fields are never written.
pub fn encode(state: &GameState, now: DateTime<Utc>) -> GameResult<Vec<u8>> {
    let envelope = Envelope {
        version: CURRENT_VERSION,
        saved_at: now,
        state,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode any known save version. Only an unparseable blob or an unknown future version
/// is an error; partial or malformed sections fall back to defaults.
pub fn decode(bytes: &[u8]) -> GameResult<LoadedState> {
    let root: Value = serde_json::from_slice(bytes)?;
    let (version, saved_at, state) = split_envelope(root)?;
    let migrated = migrate(version, state)?;

    let mut fallbacks = Vec::new();
    let mut state = merge_sections(migrated, &mut fallbacks);
    let repairs = repair(&mut state);
    if !fallbacks.is_empty() {
        warn!("Save had malformed data, defaults used for: {}", fallbacks.join(", "));
    }
    if !repairs.is_empty() {
        warn!("Save repaired: {}", repairs.join("; "));
    }
    Ok(LoadedState {
        state,
        from_version: version,
        saved_at,
        fallbacks,
        repairs,
    })
}

fn split_envelope(root: Value) -> GameResult<(u32, Option<DateTime<Utc>>, Value)> {
    let Value::Object(mut obj) = root else {
        return Err(GameError::Migration("save is not a JSON object".to_string()));
    };
    let enveloped = obj.get("version").map_or(false, Value::is_u64)
        && obj.get("state").map_or(false, Value::is_object);
    if !enveloped {
        return Ok((1, None, Value::Object(obj)));
    }

    let version = obj
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| GameError::Migration("version out of range".to_string()))?;
    let saved_at = obj
        .remove("saved_at")
        .and_then(|v| serde_json::from_value(v).ok());
    let state = obj.remove("state").unwrap_or(Value::Null);
    Ok((version, saved_at, state))
}

/// Bring a raw state value from `version` up to [`CURRENT_VERSION`].
pub fn migrate(version: u32, mut state: Value) -> GameResult<Value> {
    if version > CURRENT_VERSION {
        return Err(GameError::Migration(format!(
            "save version {} is newer than supported version {}",
            version, CURRENT_VERSION
        )));
    }
    let mut current = version.max(1);
    while current < CURRENT_VERSION {
        state = match current {
            1 => migrate_v1_to_v2(state),
            other => {
                return Err(GameError::Migration(format!(
                    "no migration from version {}",
                    other
                )))
            }
        };
        current += 1;
    }
    if version < CURRENT_VERSION {
        info!("Migrated save from v{} to v{}", version, CURRENT_VERSION);
    }
    Ok(state)
}

/// Strip the double-counted per-level increment from owned relics.
fn migrate_v1_to_v2(mut state: Value) -> Value {
    let relics = state
        .get_mut("inventory")
        .and_then(|inv| inv.get_mut("relics"))
        .and_then(Value::as_array_mut);
    let Some(relics) = relics else {
        return state;
    };
    for relic in relics.iter_mut() {
        let level = relic.get("level").and_then(Value::as_u64).unwrap_or(1);
        let per_level = match relic.get("kind").and_then(Value::as_str) {
            Some("weapon") => 22,
            Some("armor") => 15,
            _ => continue,
        };
        let Some(base) = relic.get("base_stat").and_then(Value::as_u64) else {
            continue;
        };
        let normalized = base.saturating_sub(level.saturating_sub(1) * per_level);
        relic["base_stat"] = Value::from(normalized);
    }
    state
}

fn take_section<T: DeserializeOwned>(
    obj: &mut Map<String, Value>,
    key: &str,
    slot: &mut T,
    fallbacks: &mut Vec<String>,
) {
    let Some(raw) = obj.remove(key) else {
        return;
    };
    match serde_json::from_value(raw) {
        Ok(value) => *slot = value,
        Err(e) => {
            warn!("Malformed save section '{}': {}", key, e);
            fallbacks.push(key.to_string());
        }
    }
}

/// Deserialize each array element on its own, skipping the ones that fail.
fn salvage_list<T: DeserializeOwned>(
    obj: &mut Map<String, Value>,
    key: &str,
    fallbacks: &mut Vec<String>,
) -> Vec<T> {
    match obj.remove(key) {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .filter_map(|(i, raw)| match serde_json::from_value(raw) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("Dropping malformed inventory.{}[{}]: {}", key, i, e);
                    fallbacks.push(format!("inventory.{}[{}]", key, i));
                    None
                }
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            fallbacks.push(format!("inventory.{}", key));
            Vec::new()
        }
    }
}

fn merge_inventory(raw: Value, fallbacks: &mut Vec<String>) -> Inventory {
    let Value::Object(mut obj) = raw else {
        fallbacks.push("inventory".to_string());
        return Inventory::default();
    };
    let mut inventory = Inventory {
        weapons: salvage_list(&mut obj, "weapons", fallbacks),
        armor: salvage_list(&mut obj, "armor", fallbacks),
        relics: salvage_list(&mut obj, "relics", fallbacks),
        ..Inventory::default()
    };
    take_section(&mut obj, "current_weapon", &mut inventory.current_weapon, fallbacks);
    take_section(&mut obj, "current_armor", &mut inventory.current_armor, fallbacks);
    take_section(&mut obj, "equipped_relics", &mut inventory.equipped_relics, fallbacks);
    inventory
}

/// Total defaulting function: every key of `raw` that parses overrides the default.
pub fn merge_sections(raw: Value, fallbacks: &mut Vec<String>) -> GameState {
    let mut state = GameState::default();
    let Value::Object(mut obj) = raw else {
        fallbacks.push("state".to_string());
        return state;
    };

    macro_rules! sections {
        ($($field:ident),* $(,)?) => {
            $( take_section(&mut obj, stringify!($field), &mut state.$field, fallbacks); )*
        };
    }
    sections!(
        coins,
        gems,
        shiny_gems,
        zone,
        player_stats,
        research,
        is_premium,
        achievements,
        collection_book,
        knowledge_streak,
        game_mode,
        statistics,
        cheats,
        mining,
        yojef_market,
        player_tags,
        daily_rewards,
        progression,
        offline_progress,
        garden_of_growth,
        settings,
        has_used_revival,
    );
    if let Some(inventory) = obj.remove("inventory") {
        state.inventory = merge_inventory(inventory, fallbacks);
    }
    state
}

/// Restore every invariant a loaded state must satisfy. Returns a description of each
/// fix applied; an empty list means the state was already consistent.
pub fn repair(state: &mut GameState) -> Vec<String> {
    let mut fixes = Vec::new();

    state.current_enemy = None;
    state.in_combat = false;
    state.combat_log.clear();

    if state.zone == 0 {
        state.zone = 1;
        fixes.push("zone raised to 1".to_string());
    }
    if state.progression.level == 0 {
        state.progression.level = 1;
        fixes.push("level raised to 1".to_string());
    }
    if state.progression.experience_to_next == 0 {
        state.progression.experience_to_next = experience_to_next(state.progression.level);
        fixes.push("experience_to_next recomputed".to_string());
    }

    let inv = &mut state.inventory;
    for (slot, list, label) in [
        (&mut inv.current_weapon, &inv.weapons, "current_weapon"),
        (&mut inv.current_armor, &inv.armor, "current_armor"),
    ] {
        if let Some(id) = slot.as_deref() {
            if !list.iter().any(|i| i.id == id) {
                fixes.push(format!("{} {} not owned, unequipped", label, id));
                *slot = None;
            }
        }
    }

    let before = inv.equipped_relics.len();
    let mut seen = Vec::new();
    for id in std::mem::take(&mut inv.equipped_relics) {
        if inv.relics.iter().any(|r| r.id == id) && !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen.truncate(MAX_EQUIPPED_RELICS);
    if seen.len() != before {
        fixes.push(format!("equipped relics {} -> {}", before, seen.len()));
    }
    inv.equipped_relics = seen;

    let streak = &mut state.knowledge_streak;
    let expected = streak_multiplier(streak.current);
    if (streak.multiplier - expected).abs() > f64::EPSILON {
        fixes.push(format!("streak multiplier {} -> {}", streak.multiplier, expected));
        streak.multiplier = expected;
    }
    streak.best = streak.best.max(streak.current);

    for id in AchievementId::ALL {
        if !state.achievements.iter().any(|a| a.id == id) {
            state.achievements.push(Achievement {
                id,
                unlocked: false,
                unlocked_at: None,
            });
            fixes.push(format!("achievement {:?} added", id));
        }
    }
    for id in TagId::ALL {
        if !state.player_tags.iter().any(|t| t.id == id) {
            state.player_tags.push(PlayerTag {
                id,
                unlocked: false,
                unlocked_at: None,
            });
            fixes.push(format!("tag {:?} added", id));
        }
    }

    if state.zone >= 50 && !state.is_premium {
        state.is_premium = true;
        fixes.push("premium granted for zone".to_string());
    }
    state.statistics.zones_reached = state.statistics.zones_reached.max(state.zone);

    state.recompute_stats();
    fixes
}

/// Invariant violations in `state`, for tests and diagnostics. Empty means consistent.
pub fn invariant_violations(state: &GameState) -> Vec<String> {
    let mut problems = Vec::new();
    let inv = &state.inventory;
    if inv.equipped_relics.len() > MAX_EQUIPPED_RELICS {
        problems.push(format!("{} relics equipped", inv.equipped_relics.len()));
    }
    for (i, id) in inv.equipped_relics.iter().enumerate() {
        if inv.relic(id).is_none() {
            problems.push(format!("equipped relic {} not owned", id));
        }
        if inv.equipped_relics[..i].contains(id) {
            problems.push(format!("relic {} equipped twice", id));
        }
    }
    if let Some(id) = inv.current_weapon.as_deref() {
        if inv.find(super::ItemKind::Weapon, id).is_none() {
            problems.push(format!("current weapon {} not owned", id));
        }
    }
    if let Some(id) = inv.current_armor.as_deref() {
        if inv.find(super::ItemKind::Armor, id).is_none() {
            problems.push(format!("current armor {} not owned", id));
        }
    }
    if state.player_stats.hp > state.player_stats.max_hp {
        problems.push("hp above max_hp".to_string());
    }
    if state.in_combat != state.current_enemy.is_some() {
        problems.push("combat flag out of sync with enemy".to_string());
    }
    let expected = streak_multiplier(state.knowledge_streak.current);
    if (state.knowledge_streak.multiplier - expected).abs() > f64::EPSILON {
        problems.push("streak multiplier out of sync".to_string());
    }
    if state.zone == 0 {
        problems.push("zone is zero".to_string());
    }
    problems
}
