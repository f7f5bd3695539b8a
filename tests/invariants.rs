// Random operation sequences must never break the state invariants, and every rejected
// operation must leave the state exactly as it was.

mod common;

use chrono::Duration;
use common::{rng, t0};
use hugoland::game::snapshot::{decode, encode, invariant_violations};
use hugoland::game::stats::derive_stats;
use hugoland::game::{
    ActionResult, Cheat, GameState, ItemKind, ModeKind, ResearchTrack, Skill,
};
use rand::rngs::StdRng;
use rand::Rng;

fn pick_item(s: &GameState, kind: ItemKind, rng: &mut StdRng) -> String {
    let items = s.inventory.items(kind);
    if items.is_empty() || rng.gen_bool(0.1) {
        return "missing".to_string();
    }
    items[rng.gen_range(0..items.len())].id.clone()
}

fn pick_relic(s: &GameState, rng: &mut StdRng, from_market: bool) -> String {
    let pool = if from_market {
        &s.yojef_market.items
    } else {
        &s.inventory.relics
    };
    if pool.is_empty() || rng.gen_bool(0.1) {
        return "missing".to_string();
    }
    pool[rng.gen_range(0..pool.len())].id.clone()
}

/// Run one random operation. Returns `Some(rejected)` for fallible operations.
fn random_step(s: &mut GameState, rng: &mut StdRng, step: i64) -> Option<bool> {
    let now = t0() + Duration::minutes(step * 7);
    let kind = if rng.gen_bool(0.5) {
        ItemKind::Weapon
    } else {
        ItemKind::Armor
    };
    fn rejected<T>(r: ActionResult<T>) -> Option<bool> {
        Some(r.is_err())
    }

    match rng.gen_range(0..26) {
        0..=4 => {
            if s.in_combat {
                let correct = rng.gen_bool(0.7);
                rejected(s.resolve_answer(correct, Some("Science"), rng, now))
            } else {
                rejected(s.start_combat(rng))
            }
        }
        5 => {
            let cost = [0u64, 50, 100, 250, 500, 1000][rng.gen_range(0..6)];
            rejected(s.open_chest(cost, rng, now))
        }
        6 => {
            let id = pick_item(s, kind, rng);
            rejected(s.equip_item(kind, &id))
        }
        7 => {
            let id = pick_item(s, kind, rng);
            rejected(s.upgrade_item(kind, &id))
        }
        8 => {
            let id = pick_item(s, kind, rng);
            rejected(s.sell_item(kind, &id))
        }
        9 => {
            let ids: Vec<String> = (0..rng.gen_range(0..3))
                .map(|_| pick_item(s, kind, rng))
                .collect();
            if rng.gen_bool(0.5) {
                rejected(s.bulk_sell(kind, &ids))
            } else {
                rejected(s.bulk_upgrade(kind, &ids))
            }
        }
        10 => {
            let track = ResearchTrack::ALL[rng.gen_range(0..3)];
            rejected(s.upgrade_research(track, now))
        }
        11 => {
            let (x, y) = (rng.gen_range(0..10), rng.gen_range(0..10));
            s.mine_gem(x, y, rng);
            None
        }
        12 => rejected(s.exchange_shiny_gems(rng.gen_range(0..4))),
        13 => {
            let id = pick_relic(s, rng, true);
            rejected(s.purchase_relic(&id, now))
        }
        14 => {
            let id = pick_relic(s, rng, false);
            rejected(s.equip_relic(&id))
        }
        15 => {
            let id = pick_relic(s, rng, false);
            rejected(s.unequip_relic(&id))
        }
        16 => {
            let id = pick_relic(s, rng, false);
            rejected(s.upgrade_relic(&id))
        }
        17 => {
            let id = pick_relic(s, rng, false);
            rejected(s.sell_relic(&id))
        }
        18 => {
            let mode = [
                ModeKind::Normal,
                ModeKind::Blitz,
                ModeKind::Bloodlust,
                ModeKind::Crazy,
                ModeKind::Survival,
                ModeKind::TimeAttack,
                ModeKind::Boss,
            ][rng.gen_range(0..7)];
            rejected(s.set_game_mode(mode))
        }
        19 => {
            s.refresh_market(rng, now, Duration::minutes(5));
            s.check_daily_reward(now);
            s.garden_tick(now);
            s.gem_trickle(1);
            s.time_attack_tick(rng.gen_range(1..30));
            s.calculate_offline_progress(now);
            if rng.gen_bool(0.05) {
                s.toggle_cheat(Cheat::InfiniteGems);
            }
            None
        }
        20 => rejected(s.claim_daily_reward(rng, now)),
        21 => {
            if rng.gen_bool(0.5) {
                rejected(s.plant_seed(now))
            } else {
                let hours = [12u32, 24, 72, 168, 720][rng.gen_range(0..5)];
                rejected(s.buy_water(hours, now))
            }
        }
        22 => {
            let skill = [Skill::CombatMastery, Skill::StreakMaster, Skill::HealthRegeneration]
                [rng.gen_range(0..3)];
            rejected(s.upgrade_skill(skill))
        }
        23 => rejected(s.claim_offline_rewards()),
        24 => {
            let id = pick_item(s, kind, rng);
            rejected(s.discard_item(kind, &id))
        }
        _ => rejected(s.prestige(now)),
    }
}

#[test]
fn random_sequences_preserve_invariants() {
    for seed in 0..24u64 {
        let mut rng = rng(seed);
        let mut s = GameState::new();
        s.coins = 20_000;
        s.gems = 2_000;
        s.shiny_gems = 5;

        for step in 0..400 {
            let before = s.clone();
            let outcome = random_step(&mut s, &mut rng, step);

            if outcome == Some(true) {
                assert_eq!(s, before, "seed {} step {}: rejected op changed state", seed, step);
            }
            let problems = invariant_violations(&s);
            assert!(problems.is_empty(), "seed {} step {}: {:?}", seed, step, problems);
            assert!(s.inventory.equipped_relics.len() <= 5);
            assert!(s.player_stats.hp <= s.player_stats.max_hp);
        }
    }
}

#[test]
fn recompute_is_idempotent_after_random_play() {
    let mut rng = rng(77);
    let mut s = GameState::new();
    s.coins = 50_000;
    s.gems = 5_000;
    for step in 0..300 {
        random_step(&mut s, &mut rng, step);
    }
    s.recompute_stats();
    let once = s.player_stats.clone();
    s.recompute_stats();
    assert_eq!(s.player_stats, once);
}

#[test]
fn save_round_trip_keeps_derived_stats_after_random_play() {
    let mut rng = rng(123);
    let mut s = GameState::new();
    s.coins = 50_000;
    s.gems = 5_000;
    for step in 0..300 {
        random_step(&mut s, &mut rng, step);
    }
    let derived = derive_stats(&s);
    let bytes = encode(&s, t0()).unwrap();
    let loaded = decode(&bytes).unwrap();
    assert_eq!(derive_stats(&loaded.state), derived);
    assert!(loaded.fallbacks.is_empty());
}
