//! Focus monitor stage: drains the owner's signal queue into task state,
//! then sweeps the day for missed slots.
//!
//! This is the only stage that reads signals. Queue order is arrival order
//! and the whole queue drains every cycle, so task state never depends on
//! how signals were batched across submissions.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::registry::{TaskFilter, TaskRegistry};
use crate::signal::{Signal, SignalKind};
use crate::task::TaskStatus;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusOutcome {
    /// Signals that changed task state.
    pub applied: usize,
    /// Signals dropped for unknown tasks or ineligible statuses.
    pub skipped: usize,
    /// Ids completed by signals this cycle.
    pub completed: Vec<String>,
    /// Ids marked missed by the sweep this cycle.
    pub missed: Vec<String>,
    pub summary: String,
}

/// One exponential smoothing step, clamped back into [0, 1].
fn smooth(old: f64, sample: f64, alpha: f64) -> f64 {
    (alpha * sample + (1.0 - alpha) * old).clamp(0.0, 1.0)
}

/// Apply queued signals in arrival order, then mark elapsed slots missed.
///
/// Signals touch their task whatever day it belongs to; the miss sweep is
/// scoped to the cycle's day only. A task already missed stays missed even
/// if a completion arrives afterwards.
pub fn run(
    registry: &mut TaskRegistry,
    config: &EngineConfig,
    day: NaiveDate,
    signals: Vec<Signal>,
    now: DateTime<Utc>,
) -> FocusOutcome {
    let mut outcome = FocusOutcome::default();
    let alpha = config.focus_smoothing_alpha;

    for signal in signals {
        let Ok(task) = registry.get_mut(&signal.task_id) else {
            debug!(task = %signal.task_id, "dropping signal for unknown task");
            outcome.skipped += 1;
            continue;
        };
        match signal.kind {
            SignalKind::Progress { minutes } => match task.status {
                TaskStatus::Scheduled | TaskStatus::InProgress | TaskStatus::Done => {
                    if task.status == TaskStatus::Scheduled {
                        task.status = TaskStatus::InProgress;
                    }
                    task.minutes_logged += minutes;
                    let sample =
                        (minutes as f64 / task.estimated_minutes.max(1) as f64).min(1.0);
                    task.focus_score = smooth(task.focus_score, sample, alpha);
                    task.touch(now);
                    outcome.applied += 1;
                }
                TaskStatus::Unscheduled | TaskStatus::Missed => {
                    debug!(task = %task.id, status = ?task.status, "progress signal ignored");
                    outcome.skipped += 1;
                }
            },
            SignalKind::FocusRating { value } => match task.status {
                TaskStatus::InProgress | TaskStatus::Done => {
                    task.focus_score = smooth(task.focus_score, value, alpha);
                    task.touch(now);
                    outcome.applied += 1;
                }
                _ => {
                    debug!(task = %task.id, status = ?task.status, "rating ignored before work starts");
                    outcome.skipped += 1;
                }
            },
            SignalKind::Completed => match task.status {
                TaskStatus::Unscheduled | TaskStatus::Scheduled | TaskStatus::InProgress => {
                    task.status = TaskStatus::Done;
                    task.touch(now);
                    outcome.completed.push(task.id.clone());
                    outcome.applied += 1;
                }
                // Completing twice is a no-op, not an error.
                TaskStatus::Done => outcome.applied += 1,
                TaskStatus::Missed => {
                    debug!(task = %task.id, "completion after miss ignored");
                    outcome.skipped += 1;
                }
            },
        }
    }

    for id in registry.ids_matching(TaskFilter::for_day(day)) {
        let Ok(task) = registry.get_mut(&id) else { continue };
        let live = matches!(task.status, TaskStatus::Scheduled | TaskStatus::InProgress);
        if live && task.slot.is_some_and(|s| s.end <= now) {
            task.status = TaskStatus::Missed;
            task.touch(now);
            debug!(task = %id, "slot elapsed without completion");
            outcome.missed.push(id);
        }
    }

    outcome.summary = format!(
        "focus: applied {} signals ({} skipped), {} completed, {} missed",
        outcome.applied,
        outcome.skipped,
        outcome.completed.len(),
        outcome.missed.len()
    );
    outcome
}
