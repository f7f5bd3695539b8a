//! Named periodic tasks driven by a single tick source.
//!
//! The scheduler does not sleep or spawn anything. On every [`Scheduler::due`] call it
//! compares the clock against each task's last run and reports how many whole intervals
//! have elapsed. The last-run marker advances by exactly that many intervals, so a
//! partial interval carries over to the next call instead of being lost.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::config::SchedulerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    PlayTime,
    GemTrickle,
    Garden,
    Market,
    DailyReward,
    TimeAttack,
}

impl TaskKind {
    pub const ALL: [TaskKind; 6] = [
        TaskKind::PlayTime,
        TaskKind::GemTrickle,
        TaskKind::Garden,
        TaskKind::Market,
        TaskKind::DailyReward,
        TaskKind::TimeAttack,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::PlayTime => "play_time",
            TaskKind::GemTrickle => "gem_trickle",
            TaskKind::Garden => "garden",
            TaskKind::Market => "market",
            TaskKind::DailyReward => "daily_reward",
            TaskKind::TimeAttack => "time_attack",
        }
    }

    /// Counting tasks apply once per elapsed interval; the rest are idempotent checks
    /// that only need to run once no matter how many intervals were missed.
    pub fn is_counting(&self) -> bool {
        matches!(
            self,
            TaskKind::PlayTime | TaskKind::GemTrickle | TaskKind::TimeAttack
        )
    }
}

#[derive(Debug, Clone)]
pub struct PeriodicTask {
    pub kind: TaskKind,
    pub interval: Duration,
    pub last_run: DateTime<Utc>,
}

/// A task that is due, with the number of intervals it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTask {
    pub kind: TaskKind,
    pub intervals: u64,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    /// All six background systems, each starting its first interval at `now`.
    pub fn new(config: &SchedulerConfig, now: DateTime<Utc>) -> Self {
        let every = |secs: u64| Duration::seconds(secs.max(1) as i64);
        let tasks = TaskKind::ALL
            .iter()
            .map(|kind| {
                let secs = match kind {
                    TaskKind::PlayTime => config.play_time_secs,
                    TaskKind::GemTrickle => config.gem_trickle_secs,
                    TaskKind::Garden => config.garden_secs,
                    TaskKind::Market => config.market_secs,
                    TaskKind::DailyReward => config.daily_reward_secs,
                    TaskKind::TimeAttack => config.time_attack_secs,
                };
                PeriodicTask {
                    kind: *kind,
                    interval: every(secs),
                    last_run: now,
                }
            })
            .collect();
        Self { tasks }
    }

    pub fn tasks(&self) -> &[PeriodicTask] {
        &self.tasks
    }

    /// Collect every task with at least one full interval elapsed and advance its marker.
    /// A clock that moved backwards yields nothing.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<DueTask> {
        let mut due = Vec::new();
        for task in &mut self.tasks {
            let elapsed = now - task.last_run;
            let step = task.interval.num_milliseconds();
            if step <= 0 || elapsed.num_milliseconds() < step {
                continue;
            }
            let intervals = (elapsed.num_milliseconds() / step) as u64;
            task.last_run += Duration::milliseconds(step * intervals as i64);
            debug!("task {} due x{}", task.kind.name(), intervals);
            due.push(DueTask {
                kind: task.kind,
                intervals,
                interval: task.interval,
            });
        }
        due
    }

    /// Move every marker to `now` without running anything.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        for task in &mut self.tasks {
            task.last_run = now;
        }
    }
}
