//! Test utilities & fixtures shared by the integration tests.

use chrono::{DateTime, TimeZone, Utc};
use hugoland::config::{Config, StorageBackend};
use hugoland::game::generator::generate_relic;
use hugoland::game::{GameState, Relic};
use hugoland::runtime::{GameHandle, GameRuntime, ManualClock};
use hugoland::storage::{MemoryStore, Persistence, SledStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Fixed starting instant for time-dependent tests.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 4, 9, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A fresh game with deep pockets.
#[allow(dead_code)]
pub fn rich_state() -> GameState {
    let mut state = GameState::new();
    state.coins = 1_000_000;
    state.gems = 1_000_000;
    state
}

/// `n` generated relics, owned but not equipped.
#[allow(dead_code)]
pub fn owned_relics(state: &mut GameState, n: usize, seed: u64) -> Vec<Relic> {
    let mut rng = rng(seed);
    let relics: Vec<Relic> = (0..n).map(|_| generate_relic(&mut rng)).collect();
    state.inventory.relics.extend(relics.iter().cloned());
    relics
}

#[allow(dead_code)]
pub fn memory_persistence() -> Persistence {
    Persistence::new(Arc::new(MemoryStore::new()), "test_save")
}

#[allow(dead_code)]
pub fn sled_persistence(dir: &std::path::Path) -> Persistence {
    Persistence::new(Arc::new(SledStore::open(dir).unwrap()), "test_save")
}

/// Config whose interval tick only fires once at startup, so periodic tasks run on
/// explicit `tick()` calls.
#[allow(dead_code)]
pub fn quiet_config() -> Config {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::Memory;
    config.scheduler.tick_ms = 3_600_000;
    config
}

#[allow(dead_code)]
pub async fn start_runtime(persistence: Persistence, clock: &ManualClock) -> GameHandle {
    GameRuntime::start_with_rng(&quiet_config(), persistence, Arc::new(clock.clone()), rng(99))
        .await
        .unwrap()
}
