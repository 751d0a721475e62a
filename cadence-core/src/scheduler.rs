//! Scheduling stage: place pending tasks into the day's free capacity.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::registry::{TaskFilter, TaskRegistry};
use crate::slot::{self, TimeSlot};
use crate::task::TaskStatus;

/// A task the scheduler could not place this cycle, with the reason it
/// reports back to the collaborator. The task itself stays pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unschedulable {
    pub task_id: String,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleOutcome {
    /// Ids placed this cycle, in assignment order.
    pub placed: Vec<String>,
    pub unschedulable: Vec<Unschedulable>,
    pub summary: String,
}

/// A slot-assignment strategy. The engine runs one per cycle; alternatives
/// plug in behind the same interface.
pub trait SchedulePolicy {
    fn assign(
        &self,
        registry: &mut TaskRegistry,
        config: &EngineConfig,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> ScheduleOutcome;
}

/// Greedy placement in urgency order: earliest deadline first (tasks without
/// one go last), then heavier weight, then older creation, then insertion
/// sequence. Each task takes the earliest gap that fits.
///
/// Deliberately not optimal packing; every placement is explainable from the
/// sort key alone. Already-assigned slots are never moved or revoked here.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyByUrgency;

struct Candidate {
    id: String,
    title: String,
    minutes: i64,
    priority: i32,
    deadline: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    seq: u64,
}

fn plan_order(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.deadline, b.deadline) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.priority.cmp(&a.priority))
    .then_with(|| a.created_at.cmp(&b.created_at))
    .then_with(|| a.seq.cmp(&b.seq))
}

impl SchedulePolicy for GreedyByUrgency {
    fn assign(
        &self,
        registry: &mut TaskRegistry,
        config: &EngineConfig,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> ScheduleOutcome {
        let pending_filter = TaskFilter::for_day(day).with_status(TaskStatus::Unscheduled);
        let mut pending: Vec<Candidate> = registry
            .list(pending_filter)
            .filter(|t| t.slot.is_none())
            .map(|t| Candidate {
                id: t.id.clone(),
                title: t.title.clone(),
                minutes: t.estimated_minutes,
                priority: t.priority,
                deadline: t.deadline,
                created_at: t.created_at,
                seq: t.seq,
            })
            .collect();
        pending.sort_by(plan_order);

        // Anything holding a slot today blocks that time, terminal or not.
        let occupied: Vec<TimeSlot> = registry
            .list(TaskFilter::for_day(day))
            .filter_map(|t| t.slot)
            .collect();
        let mut free = slot::free_slots(
            day,
            config.capacity_window.start,
            config.capacity_window.end,
            config.slot_granularity_minutes,
            &occupied,
            now,
        );

        let total = pending.len();
        let mut placed = Vec::new();
        let mut unschedulable = Vec::new();

        for candidate in pending {
            let need = slot::snap_minutes(candidate.minutes, config.slot_granularity_minutes);
            let gap = free.iter().position(|s| s.minutes() >= need);
            match gap {
                Some(index) => {
                    let assigned = TimeSlot::new(
                        free[index].start,
                        free[index].start + Duration::minutes(need),
                    );
                    if free[index].minutes() == need {
                        free.remove(index);
                    } else {
                        free[index].start = assigned.end;
                    }

                    let Ok(task) = registry.get_mut(&candidate.id) else { continue };
                    task.slot = Some(assigned);
                    task.status = TaskStatus::Scheduled;
                    task.touch(now);
                    debug!(task = %candidate.id, start = %assigned.start, "placed task");
                    placed.push(candidate.id);
                }
                None => {
                    unschedulable.push(Unschedulable {
                        task_id: candidate.id,
                        title: candidate.title,
                        reason: format!("no free slot of at least {need} minutes"),
                    });
                }
            }
        }

        let summary = format!("scheduler: placed {} of {total} pending tasks", placed.len());
        ScheduleOutcome { placed, unschedulable, summary }
    }
}
