//! # Runtime Module - Single-Writer Game Actor
//!
//! The live [`GameState`] is owned by one tokio task. Everything else talks to it through
//! a cloneable [`GameHandle`], which sends commands over an unbounded mailbox and awaits
//! the reply on a oneshot channel. Because only the actor touches the state, a
//! transition closure always sees the latest snapshot and runs to completion before the
//! next one starts; user actions and periodic tasks can never interleave mid-update.
//!
//! ## Loop
//!
//! ```text
//! loop {
//!     select! {
//!         interval tick      => run due periodic tasks, persist if anything ran
//!         command (mailbox)  => apply / snapshot / tick / reset / shutdown
//!     }
//! }
//! ```
//!
//! ## Persistence
//!
//! After every mutation the actor stamps `last_save_time`, clones the state and forwards
//! it to a writer task. Writes are fire-and-forget: the actor never waits on disk, and a
//! failed save is logged and dropped. [`GameHandle::shutdown`] drains the writer before
//! returning, so a clean exit never loses the final snapshot.
//!
//! ## Time
//!
//! All timestamps come from an injected [`Clock`]. Tests use [`ManualClock`] and call
//! [`GameHandle::tick`] after moving it, which makes every timed system deterministic.

pub mod clock;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{DueTask, Scheduler, TaskKind};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::errors::{GameError, GameResult};
use crate::game::GameState;
use crate::storage::Persistence;

/// Randomness and time handed to every transition run through [`GameHandle::apply`].
pub struct ActionContext {
    pub rng: StdRng,
    pub now: DateTime<Utc>,
}

type Job = Box<dyn FnOnce(&mut GameState, &mut ActionContext) + Send>;

enum Command {
    Apply(Job),
    Snapshot(oneshot::Sender<GameState>),
    Tick(oneshot::Sender<Vec<DueTask>>),
    Reset(oneshot::Sender<GameResult<()>>),
    Shutdown(oneshot::Sender<()>),
}

enum WriteOp {
    Save(Box<GameState>, DateTime<Utc>),
    Remove(oneshot::Sender<GameResult<()>>),
    Flush(oneshot::Sender<()>),
}

/// Cloneable front door to the running game.
#[derive(Clone)]
pub struct GameHandle {
    tx: mpsc::UnboundedSender<Command>,
    clock: Arc<dyn Clock>,
}

impl GameHandle {
    /// Run `f` against the live state, persist the result and hand back whatever `f`
    /// returned. Engine operations report rejections through their own `ActionResult`,
    /// so callers usually get `GameResult<ActionResult<T>>`.
    pub async fn apply<T, F>(&self, f: F) -> GameResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut GameState, &mut ActionContext) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |state, ctx| {
            let _ = reply_tx.send(f(state, ctx));
        });
        self.send(Command::Apply(job))?;
        reply_rx.await.map_err(|_| GameError::RuntimeClosed)
    }

    pub async fn snapshot(&self) -> GameResult<GameState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| GameError::RuntimeClosed)
    }

    /// Run every periodic task that is due at the clock's current time.
    pub async fn tick(&self) -> GameResult<Vec<DueTask>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Tick(reply_tx))?;
        reply_rx.await.map_err(|_| GameError::RuntimeClosed)
    }

    /// Start over with a fresh game and delete the stored save.
    pub async fn reset(&self) -> GameResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Reset(reply_tx))?;
        reply_rx.await.map_err(|_| GameError::RuntimeClosed)?
    }

    /// Stop the actor once the writer has flushed. Later calls on any clone fail with
    /// [`GameError::RuntimeClosed`].
    pub async fn shutdown(&self) -> GameResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Shutdown(reply_tx))?;
        reply_rx.await.map_err(|_| GameError::RuntimeClosed)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn send(&self, command: Command) -> GameResult<()> {
        self.tx.send(command).map_err(|_| GameError::RuntimeClosed)
    }
}

pub struct GameRuntime;

impl GameRuntime {
    /// Load or create the game, credit offline time and spawn the actor.
    pub async fn start(
        config: &Config,
        persistence: Persistence,
        clock: Arc<dyn Clock>,
    ) -> GameResult<GameHandle> {
        Self::start_with_rng(config, persistence, clock, StdRng::from_entropy()).await
    }

    /// Same as [`GameRuntime::start`] with a caller-supplied generator.
    pub async fn start_with_rng(
        config: &Config,
        persistence: Persistence,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> GameResult<GameHandle> {
        let now = clock.now();
        let mut state = match persistence.load_state().await {
            Ok(Some(loaded)) => {
                info!(
                    "Loaded save (format v{}, saved {})",
                    loaded.from_version,
                    loaded
                        .saved_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "unknown".to_string())
                );
                for section in &loaded.fallbacks {
                    warn!("Save section '{}' was unreadable and has been reset", section);
                }
                for fix in &loaded.repairs {
                    warn!("Repaired save: {}", fix);
                }
                loaded.state
            }
            Ok(None) => {
                info!("No save found, starting a new game");
                GameState::new()
            }
            Err(e) => {
                error!("Could not load save, starting a new game: {}", e);
                GameState::new()
            }
        };

        let mut ctx = ActionContext { rng, now };
        prepare_state(&mut state, config, &mut ctx);

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        tokio::spawn(writer_loop(persistence, writer_rx));

        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Actor {
            state,
            ctx,
            scheduler: Scheduler::new(&config.scheduler, now),
            config: config.clone(),
            clock: Arc::clone(&clock),
            writer: writer_tx,
        };
        actor.persist();
        tokio::spawn(actor.run(rx));

        Ok(GameHandle { tx, clock })
    }
}

/// Startup fix-ups applied to every freshly loaded or created state.
fn prepare_state(state: &mut GameState, config: &Config, ctx: &mut ActionContext) {
    let now = ctx.now;
    state.offline_progress.max_offline_hours = config.game.max_offline_hours;
    state.statistics.session_start_time = Some(now);
    state.calculate_offline_progress(now);
    state.garden_tick(now);
    state.refresh_market(&mut ctx.rng, now, market_interval(config));
    state.check_daily_reward(now);
    state.recompute_stats();
}

fn market_interval(config: &Config) -> ChronoDuration {
    ChronoDuration::minutes(i64::from(config.game.market_refresh_minutes))
}

struct Actor {
    state: GameState,
    ctx: ActionContext,
    scheduler: Scheduler,
    config: Config,
    clock: Arc<dyn Clock>,
    writer: mpsc::UnboundedSender<WriteOp>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.scheduler.tick_ms.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_due_tasks();
                }
                command = rx.recv() => {
                    match command {
                        Some(Command::Shutdown(reply)) => {
                            self.flush().await;
                            info!("Game runtime stopped");
                            let _ = reply.send(());
                            break;
                        }
                        Some(command) => self.handle(command).await,
                        None => {
                            debug!("all game handles dropped, stopping runtime");
                            self.flush().await;
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Apply(job) => {
                self.ctx.now = self.clock.now();
                job(&mut self.state, &mut self.ctx);
                self.persist();
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.clone());
            }
            Command::Tick(reply) => {
                let ran = self.run_due_tasks();
                let _ = reply.send(ran);
            }
            Command::Reset(reply) => {
                let now = self.clock.now();
                self.ctx.now = now;
                let mut fresh = GameState::new();
                prepare_state(&mut fresh, &self.config, &mut self.ctx);
                self.state = fresh;
                self.scheduler.reset(now);
                info!("Game reset to a fresh state");

                let (done_tx, done_rx) = oneshot::channel();
                let result = match self.writer.send(WriteOp::Remove(done_tx)) {
                    Ok(()) => done_rx.await.unwrap_or(Err(GameError::RuntimeClosed)),
                    Err(_) => Err(GameError::RuntimeClosed),
                };
                let _ = reply.send(result);
            }
            Command::Shutdown(_) => {}
        }
    }

    /// Returns the tasks that ran. Persists when any of them did.
    fn run_due_tasks(&mut self) -> Vec<DueTask> {
        let now = self.clock.now();
        self.ctx.now = now;
        let due = self.scheduler.due(now);
        if due.is_empty() {
            return due;
        }

        for task in &due {
            let secs = task.interval.num_seconds().max(0) as u64 * task.intervals;
            match task.kind {
                TaskKind::PlayTime => self.state.tick_play_time(secs),
                TaskKind::GemTrickle => self.state.gem_trickle(task.intervals),
                TaskKind::Garden => {
                    self.state.garden_tick(now);
                }
                TaskKind::Market => {
                    let every = market_interval(&self.config);
                    self.state.refresh_market(&mut self.ctx.rng, now, every);
                }
                TaskKind::DailyReward => {
                    if self.state.check_daily_reward(now) {
                        info!("A daily reward is ready to claim");
                    }
                }
                TaskKind::TimeAttack => {
                    let secs = u32::try_from(secs).unwrap_or(u32::MAX);
                    self.state.time_attack_tick(secs);
                }
            }
        }
        self.persist();
        due
    }

    fn persist(&self) {
        let now = self.clock.now();
        let mut snapshot = self.state.clone();
        snapshot.mark_saved(now);
        if self
            .writer
            .send(WriteOp::Save(Box::new(snapshot), now))
            .is_err()
        {
            error!("Save writer has stopped; progress is not being persisted");
        }
    }

    async fn flush(&self) {
        self.persist();
        let (done_tx, done_rx) = oneshot::channel();
        if self.writer.send(WriteOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

/// Applies writes in order. Consecutive saves are coalesced to the newest one.
async fn writer_loop(persistence: Persistence, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    let mut pending: Option<WriteOp> = None;
    loop {
        let op = match pending.take() {
            Some(op) => op,
            None => match rx.recv().await {
                Some(op) => op,
                None => break,
            },
        };
        match op {
            WriteOp::Save(mut state, mut at) => {
                while let Ok(next) = rx.try_recv() {
                    match next {
                        WriteOp::Save(newer, newer_at) => {
                            state = newer;
                            at = newer_at;
                        }
                        other => {
                            pending = Some(other);
                            break;
                        }
                    }
                }
                if let Err(e) = persistence.save_state(&state, at).await {
                    warn!("Failed to save game under '{}': {}", persistence.key(), e);
                }
            }
            WriteOp::Remove(done) => {
                let result = persistence.remove().await;
                if let Err(e) = &result {
                    warn!("Failed to remove save '{}': {}", persistence.key(), e);
                }
                let _ = done.send(result);
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("save writer stopped");
}
