//! Derived-stat recomputation.
//!
//! `atk`, `def` and `max_hp` are never edited directly; they are rebuilt from base stats,
//! equipped gear, equipped relics, research, the garden bonus and the active mode.

use super::formulas::research_bonus;
use super::types::{GameState, ItemKind, ModeKind};

/// The three derived numbers produced by [`derive_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedStats {
    pub atk: u64,
    pub def: u64,
    pub max_hp: u64,
}

/// Atk/def/hp multipliers before flooring. Research and garden percentages are summed
/// first, then the mode modifier is applied on top.
pub fn stat_multipliers(state: &GameState) -> (f64, f64, f64) {
    let garden = state.garden_of_growth.total_growth_bonus;
    let mut atk = 1.0 + (research_bonus(state.research.atk.level) + garden) / 100.0;
    let mut def = 1.0 + (research_bonus(state.research.def.level) + garden) / 100.0;
    let mut hp = 1.0 + (research_bonus(state.research.hp.level) + garden) / 100.0;

    match state.game_mode.current {
        ModeKind::Bloodlust => {
            atk *= 2.0;
            def *= 0.5;
            hp *= 0.5;
        }
        ModeKind::Crazy => {
            atk *= 0.5;
            def *= 0.5;
            hp *= 0.5;
        }
        _ => {}
    }
    (atk, def, hp)
}

pub fn derive_stats(state: &GameState) -> DerivedStats {
    let inv = &state.inventory;
    let weapon_atk = inv.equipped(ItemKind::Weapon).map_or(0, |w| w.stat_bonus());
    let armor_def = inv.equipped(ItemKind::Armor).map_or(0, |a| a.stat_bonus());

    let mut relic_atk = 0;
    let mut relic_def = 0;
    for relic in inv.equipped_relic_items() {
        match relic.kind {
            ItemKind::Weapon => relic_atk += relic.stat_bonus(),
            ItemKind::Armor => relic_def += relic.stat_bonus(),
        }
    }

    let (atk_mult, def_mult, hp_mult) = stat_multipliers(state);
    let base = &state.player_stats;
    DerivedStats {
        atk: ((base.base_atk + weapon_atk + relic_atk) as f64 * atk_mult).floor() as u64,
        def: ((base.base_def + armor_def + relic_def) as f64 * def_mult).floor() as u64,
        max_hp: (base.base_hp as f64 * hp_mult).floor() as u64,
    }
}

impl GameState {
    /// Rebuild derived stats and clamp hp into `[0, max_hp]`. Idempotent.
    pub fn recompute_stats(&mut self) {
        let derived = derive_stats(self);
        let stats = &mut self.player_stats;
        stats.atk = derived.atk;
        stats.def = derived.def;
        stats.max_hp = derived.max_hp;
        stats.hp = stats.hp.min(derived.max_hp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{Item, Rarity, Relic};

    fn item(kind: ItemKind, base: u64, level: u32) -> Item {
        Item {
            id: format!("{}-{}", kind.as_str(), base),
            name: "Test".into(),
            kind,
            rarity: Rarity::Common,
            base_stat: base,
            level,
            upgrade_cost: 5,
            sell_price: 25,
            durability: 100,
            max_durability: 100,
            enchanted: false,
        }
    }

    fn relic(id: &str, kind: ItemKind, base: u64, level: u32) -> Relic {
        Relic {
            id: id.into(),
            name: "Relic".into(),
            kind,
            rarity: Rarity::Rare,
            base_stat: base,
            level,
            cost: 100,
            upgrade_cost: 50,
            sell_price: 50,
        }
    }

    #[test]
    fn fresh_state_has_base_stats() {
        let mut s = GameState::default();
        s.recompute_stats();
        assert_eq!(s.player_stats.atk, 50);
        assert_eq!(s.player_stats.def, 0);
        assert_eq!(s.player_stats.max_hp, 200);
    }

    #[test]
    fn gear_relics_research_and_garden_combine() {
        let mut s = GameState::default();
        let w = item(ItemKind::Weapon, 20, 3); // 20 + 2*10 = 40
        let a = item(ItemKind::Armor, 10, 2); // 10 + 5 = 15
        s.inventory.current_weapon = Some(w.id.clone());
        s.inventory.current_armor = Some(a.id.clone());
        s.inventory.weapons.push(w);
        s.inventory.armor.push(a);
        s.inventory.relics.push(relic("r1", ItemKind::Weapon, 40, 2)); // 62
        s.inventory.relics.push(relic("r2", ItemKind::Armor, 20, 1)); // 20
        s.inventory.equipped_relics = vec!["r1".into(), "r2".into()];
        s.research.atk.level = 2; // +20%
        s.garden_of_growth.total_growth_bonus = 10.0; // +10%
        s.recompute_stats();
        // (50 + 40 + 62) * 1.3 = 197.6
        assert_eq!(s.player_stats.atk, 197);
        // (0 + 15 + 20) * 1.1 = 38.5
        assert_eq!(s.player_stats.def, 38);
        // 200 * 1.1
        assert_eq!(s.player_stats.max_hp, 220);
    }

    #[test]
    fn modes_modify_multipliers() {
        let mut s = GameState::default();
        s.game_mode.current = ModeKind::Bloodlust;
        s.recompute_stats();
        assert_eq!(s.player_stats.atk, 100);
        assert_eq!(s.player_stats.max_hp, 100);
        assert_eq!(s.player_stats.hp, 100);

        s.game_mode.current = ModeKind::Crazy;
        s.recompute_stats();
        assert_eq!(s.player_stats.atk, 25);
        assert_eq!(s.player_stats.max_hp, 100);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut s = GameState::default();
        s.research.hp.level = 3;
        s.garden_of_growth.total_growth_bonus = 12.5;
        s.recompute_stats();
        let once = s.clone();
        s.recompute_stats();
        assert_eq!(s, once);
    }
}
