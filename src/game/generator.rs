//! Item, enemy and relic generation.
//!
//! All functions take the RNG explicitly so callers (and tests) control determinism.
//! Nothing here touches [`GameState`](super::GameState).

use rand::Rng;
use uuid::Uuid;

use super::types::{Enemy, Item, ItemKind, Rarity, Relic};

/// Chance for any generated chest/drop item to be enchanted.
pub const ENCHANT_CHANCE: f64 = 0.05;
/// Flat coin price of a guaranteed mythical item.
pub const MYTHICAL_COST: u64 = 50_000;
/// Zone from which enemies may drop items.
pub const DROP_ZONE: u32 = 10;

const WEAPON_NAMES: [&str; 8] = [
    "Sword", "Axe", "Spear", "Dagger", "Mace", "Bow", "Staff", "Halberd",
];
const ARMOR_NAMES: [&str; 7] = [
    "Chestplate", "Helm", "Gauntlets", "Greaves", "Shield", "Robe", "Cloak",
];
const ENEMY_NAMES: [&str; 10] = [
    "Goblin", "Orc", "Skeleton", "Troll", "Wraith", "Bandit", "Giant Spider", "Golem",
    "Harpy", "Dragon Whelp",
];
const RELIC_WEAPON_NAMES: [&str; 4] = [
    "Fang of Yojef", "Ember Idol", "Stormcaller Shard", "Bloodstone Talisman",
];
const RELIC_ARMOR_NAMES: [&str; 4] = [
    "Aegis Fragment", "Warden's Totem", "Moonward Charm", "Bulwark Rune",
];

/// Per-rarity generation parameters.
struct RarityProfile {
    prefix: &'static str,
    atk: (u64, u64),
    def: (u64, u64),
    durability: u32,
    upgrade_cost: u64,
    sell_price: u64,
}

fn profile(rarity: Rarity) -> RarityProfile {
    match rarity {
        Rarity::Common => RarityProfile {
            prefix: "Worn",
            atk: (15, 25),
            def: (8, 14),
            durability: 100,
            upgrade_cost: 5,
            sell_price: 25,
        },
        Rarity::Rare => RarityProfile {
            prefix: "Fine",
            atk: (30, 45),
            def: (15, 24),
            durability: 150,
            upgrade_cost: 10,
            sell_price: 75,
        },
        Rarity::Epic => RarityProfile {
            prefix: "Runed",
            atk: (55, 75),
            def: (28, 40),
            durability: 200,
            upgrade_cost: 20,
            sell_price: 200,
        },
        Rarity::Legendary => RarityProfile {
            prefix: "Heroic",
            atk: (90, 120),
            def: (45, 60),
            durability: 300,
            upgrade_cost: 40,
            sell_price: 500,
        },
        Rarity::Mythical => RarityProfile {
            prefix: "Mythic",
            atk: (150, 200),
            def: (75, 100),
            durability: 500,
            upgrade_cost: 80,
            sell_price: 1500,
        },
    }
}

/// Rarity weights (percent, common..mythical) for a chest of the given coin cost.
pub fn chest_rarity_weights(cost: u64) -> [f64; 5] {
    match cost {
        0..=99 => [70.0, 25.0, 5.0, 0.0, 0.0],
        100..=249 => [50.0, 33.0, 14.0, 3.0, 0.0],
        250..=499 => [30.0, 38.0, 22.0, 8.0, 2.0],
        500..=999 => [15.0, 32.0, 32.0, 16.0, 5.0],
        _ => [5.0, 22.0, 35.0, 28.0, 10.0],
    }
}

pub const RELIC_RARITY_WEIGHTS: [f64; 5] = [40.0, 30.0, 18.0, 9.0, 3.0];

/// Cumulative-weight selection against a single uniform draw in `[0, total)`.
pub fn roll_rarity<R: Rng + ?Sized>(rng: &mut R, weights: &[f64; 5]) -> Rarity {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Rarity::Common;
    }
    let roll = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (rarity, weight) in Rarity::ALL.iter().zip(weights.iter()) {
        cumulative += weight;
        if roll < cumulative {
            return *rarity;
        }
    }
    // Float accumulation can leave roll == total; land on the last non-zero bucket.
    Rarity::ALL
        .iter()
        .zip(weights.iter())
        .rev()
        .find(|(_, w)| **w > 0.0)
        .map(|(r, _)| *r)
        .unwrap_or(Rarity::Common)
}

/// Generate a weapon or armor piece of the given rarity.
pub fn generate_item<R: Rng + ?Sized>(
    rng: &mut R,
    kind: ItemKind,
    rarity: Rarity,
    enchanted: bool,
) -> Item {
    let p = profile(rarity);
    let (range, names): ((u64, u64), &[&str]) = match kind {
        ItemKind::Weapon => (p.atk, &WEAPON_NAMES[..]),
        ItemKind::Armor => (p.def, &ARMOR_NAMES[..]),
    };
    let mut stat = rng.gen_range(range.0..=range.1);
    let mut sell_price = p.sell_price;
    let base_name = names[rng.gen_range(0..names.len())];
    let name = if enchanted {
        stat = (stat as f64 * 1.5).floor() as u64;
        sell_price *= 2;
        format!("Enchanted {} {}", p.prefix, base_name)
    } else {
        format!("{} {}", p.prefix, base_name)
    };
    Item {
        id: Uuid::new_v4().to_string(),
        name,
        kind,
        rarity,
        base_stat: stat,
        level: 1,
        upgrade_cost: p.upgrade_cost,
        sell_price,
        durability: p.durability,
        max_durability: p.durability,
        enchanted,
    }
}

/// Roll a chest item: kind 50/50, rarity from `weights`, enchant at [`ENCHANT_CHANCE`].
pub fn roll_item<R: Rng + ?Sized>(rng: &mut R, weights: &[f64; 5]) -> Item {
    let kind = if rng.gen_bool(0.5) {
        ItemKind::Weapon
    } else {
        ItemKind::Armor
    };
    let rarity = roll_rarity(rng, weights);
    let enchanted = rng.gen_bool(ENCHANT_CHANCE);
    generate_item(rng, kind, rarity, enchanted)
}

pub fn generate_mythical<R: Rng + ?Sized>(rng: &mut R) -> Item {
    let kind = if rng.gen_bool(0.5) {
        ItemKind::Weapon
    } else {
        ItemKind::Armor
    };
    generate_item(rng, kind, Rarity::Mythical, false)
}

/// Enemy scaled to `zone`. All stats are monotonically non-decreasing in zone.
pub fn generate_enemy<R: Rng + ?Sized>(rng: &mut R, zone: u32) -> Enemy {
    let z = u64::from(zone.max(1));
    let hp = 80 + 20 * z;
    Enemy {
        name: ENEMY_NAMES[rng.gen_range(0..ENEMY_NAMES.len())].to_string(),
        zone,
        hp,
        max_hp: hp,
        atk: 15 + 4 * z,
        def: 2 * z,
        can_drop_items: zone >= DROP_ZONE,
    }
}

pub fn generate_relic<R: Rng + ?Sized>(rng: &mut R) -> Relic {
    let rarity = roll_rarity(rng, &RELIC_RARITY_WEIGHTS);
    let kind = if rng.gen_bool(0.5) {
        ItemKind::Weapon
    } else {
        ItemKind::Armor
    };
    let (weapon_stat, cost) = match rarity {
        Rarity::Common => (40, 50),
        Rarity::Rare => (70, 100),
        Rarity::Epic => (110, 200),
        Rarity::Legendary => (160, 400),
        Rarity::Mythical => (250, 800),
    };
    let (base_stat, names): (u64, &[&str]) = match kind {
        ItemKind::Weapon => (weapon_stat, &RELIC_WEAPON_NAMES[..]),
        ItemKind::Armor => (weapon_stat / 2, &RELIC_ARMOR_NAMES[..]),
    };
    Relic {
        id: Uuid::new_v4().to_string(),
        name: names[rng.gen_range(0..names.len())].to_string(),
        kind,
        rarity,
        base_stat,
        level: 1,
        cost,
        upgrade_cost: cost / 2,
        sell_price: cost / 2,
    }
}

/// 3 to 5 freshly rolled relics for the market.
pub fn generate_market_offers<R: Rng + ?Sized>(rng: &mut R) -> Vec<Relic> {
    let count = rng.gen_range(3..=5);
    (0..count).map(|_| generate_relic(rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn weights_shift_toward_rarer_tiers_with_cost() {
        let costs = [50, 150, 300, 700, 5000];
        for pair in costs.windows(2) {
            let lo = chest_rarity_weights(pair[0]);
            let hi = chest_rarity_weights(pair[1]);
            assert!(hi[0] < lo[0], "common weight should drop");
            assert!(hi[3] + hi[4] > lo[3] + lo[4], "top tiers should grow");
        }
        for cost in costs {
            let sum: f64 = chest_rarity_weights(cost).iter().sum();
            assert!((sum - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_weight_tiers_never_roll() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = chest_rarity_weights(10);
        for _ in 0..2000 {
            let r = roll_rarity(&mut rng, &weights);
            assert!(r != Rarity::Legendary && r != Rarity::Mythical);
        }
    }

    #[test]
    fn enchanted_items_are_stronger() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let plain = generate_item(&mut rng, ItemKind::Weapon, Rarity::Epic, false);
            assert!((55..=75).contains(&plain.base_stat));
            let ench = generate_item(&mut rng, ItemKind::Weapon, Rarity::Epic, true);
            assert!(ench.base_stat >= 82);
            assert_eq!(ench.sell_price, 400);
            assert!(ench.name.starts_with("Enchanted"));
        }
    }

    #[test]
    fn enemies_scale_with_zone() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut prev = generate_enemy(&mut rng, 1);
        for zone in 2..60 {
            let e = generate_enemy(&mut rng, zone);
            assert!(e.max_hp >= prev.max_hp && e.atk >= prev.atk && e.def >= prev.def);
            assert_eq!(e.can_drop_items, zone >= 10);
            prev = e;
        }
    }

    #[test]
    fn market_offers_three_to_five() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let offers = generate_market_offers(&mut rng);
            assert!((3..=5).contains(&offers.len()));
            for r in offers {
                assert_eq!(r.upgrade_cost, r.cost / 2);
            }
        }
    }
}
