//! # Hugoland - Incremental Trivia RPG Engine
//!
//! Hugoland is the game-state engine of an incremental RPG whose core loop mixes trivia
//! with combat: every correct answer lands a hit on the current enemy, every wrong answer
//! lets the enemy strike back. Around that loop sit the meta-systems that keep a player
//! coming back: equipment and relics, research, mining, a relic market, a growing garden,
//! daily rewards, offline earnings, achievements and prestige.
//!
//! ## Features
//!
//! - **Deterministic engine**: every transition is a method on [`game::GameState`] that
//!   takes its randomness and current time as arguments and either applies fully or
//!   returns an [`game::ActionError`] without touching the state.
//! - **Versioned saves**: JSON snapshots with a version envelope, forward migration of
//!   legacy saves and section-by-section recovery from partial corruption.
//! - **Single-writer runtime**: one tokio task owns the live state, runs periodic tasks on
//!   an injectable clock and persists after every change.
//! - **Pluggable storage**: sled on disk or an in-memory map.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hugoland::config::Config;
//! use hugoland::runtime::{GameRuntime, SystemClock};
//! use hugoland::storage::Persistence;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("hugoland.toml").await?;
//!     let persistence = Persistence::from_config(&config.storage)?;
//!     let game = GameRuntime::start(&config, persistence, Arc::new(SystemClock)).await?;
//!
//!     let enemy = game.apply(|state, ctx| state.start_combat(&mut ctx.rng)).await??;
//!     println!("A wild {} appears", enemy.name);
//!
//!     game.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - state model, rules, formulas, generators and save format
//! - [`runtime`] - actor, scheduler and clocks
//! - [`storage`] - key-value persistence of the save blob
//! - [`config`] - TOML configuration
//! - [`trivia`] - question provider contract and built-in bank
//! - [`errors`] - infrastructure error type
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   CLI / UI      │ ← asks questions, sends actions
//! └─────────────────┘
//!          │ GameHandle
//! ┌─────────────────┐
//! │   Runtime       │ ← owns GameState, ticks timed systems
//! └─────────────────┘
//!          │ snapshots
//! ┌─────────────────┐
//! │   Storage       │ ← versioned JSON blob in sled
//! └─────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod game;
pub mod runtime;
pub mod storage;
pub mod trivia;
