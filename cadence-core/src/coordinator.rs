//! Coordinator: one cycle of the agent pipeline for a single owner and day.
//!
//! Stage order is fixed: schedule, optimize, apply signals, project
//! reminders, report. Each stage reads whatever the previous stages left in
//! the registry; the exclusive borrow makes interleaving impossible.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::config::EngineConfig;
use crate::focus;
use crate::optimizer;
use crate::registry::{TaskFilter, TaskRegistry};
use crate::reminder::{self, Reminder};
use crate::report::{self, Report};
use crate::scheduler::{SchedulePolicy, Unschedulable};
use crate::signal::Signal;
use crate::task::Task;

/// Everything one cycle produced, in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub day: NaiveDate,
    /// Live slotted tasks for the day, ordered by slot start.
    pub scheduled: Vec<Task>,
    pub unschedulable: Vec<Unschedulable>,
    pub reminders: Vec<Reminder>,
    /// Report over the day's capacity window.
    pub report: Report,
    /// Slot swaps the optimizer applied, as id pairs.
    pub swaps: Vec<(String, String)>,
    pub summary: String,
}

pub struct Coordinator<P: SchedulePolicy> {
    policy: P,
}

impl<P: SchedulePolicy> Coordinator<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn run_cycle(
        &self,
        registry: &mut TaskRegistry,
        config: &EngineConfig,
        signals: Vec<Signal>,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let schedule = self.policy.assign(registry, config, day, now);
        let optimize = optimizer::optimize(registry, config, day, now);
        let focus = focus::run(registry, config, day, signals, now);
        let reminders = reminder::project(registry, config, day, now);
        let window = config.day_window(day);
        let report = report::generate(registry, window.start, window.end);

        let mut scheduled: Vec<Task> = registry
            .list(TaskFilter::for_day(day))
            .filter(|t| t.slot.is_some() && !t.status.is_terminal())
            .cloned()
            .collect();
        scheduled.sort_by_key(|t| t.slot.map(|s| s.start));

        info!(
            %day,
            placed = schedule.placed.len(),
            unschedulable = schedule.unschedulable.len(),
            swaps = optimize.swaps.len(),
            missed = focus.missed.len(),
            reminders = reminders.len(),
            "cycle complete"
        );
        let summary = format!("{}; {}; {}", schedule.summary, optimize.summary, focus.summary);

        CycleOutcome {
            day,
            scheduled,
            unschedulable: schedule.unschedulable,
            reminders,
            report,
            swaps: optimize.swaps,
            summary,
        }
    }
}
