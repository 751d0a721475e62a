//! Optimizer stage: greedy slot-swap search over the day's assignments.
//!
//! Works only on tasks in `Scheduled`; in-progress work is pinned. A swap
//! exchanges two equal-length slots, so the day's occupancy is unchanged
//! and no other assignment has to move.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::registry::{TaskFilter, TaskRegistry};
use crate::slot::TimeSlot;
use crate::task::TaskStatus;

/// Swap deltas at or below this count as noise, not improvement.
const MIN_IMPROVEMENT: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizeOutcome {
    /// Applied swaps as id pairs, in application order.
    pub swaps: Vec<(String, String)>,
    pub summary: String,
}

/// Deadline pressure multiplier: tighter deadlines amplify the cost of
/// sitting late in the day. Past-due counts as the tightest band.
pub fn urgency_factor(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(deadline) = deadline else { return 1.0 };
    let minutes_left = (deadline - now).num_minutes();
    if minutes_left <= 60 {
        3.0
    } else if minutes_left <= 240 {
        2.0
    } else {
        1.5
    }
}

struct Entry {
    id: String,
    priority: i32,
    urgency: f64,
    deadline: Option<DateTime<Utc>>,
    preferred_start: Option<NaiveTime>,
    slot: TimeSlot,
}

/// How well `entry` sits in `slot`. Higher is better: weighted delay from
/// the window open plus distance from the preferred start, both negated.
fn placement_score(entry: &Entry, slot: &TimeSlot, window_start: DateTime<Utc>) -> f64 {
    let delay_hours = (slot.start - window_start).num_minutes() as f64 / 60.0;
    let mut score = -(entry.priority as f64 * entry.urgency) * delay_hours;
    if let Some(preferred) = entry.preferred_start {
        let slot_minute = f64::from(slot.start.time().num_seconds_from_midnight()) / 60.0;
        let preferred_minute = f64::from(preferred.num_seconds_from_midnight()) / 60.0;
        score -= (slot_minute - preferred_minute).abs() / 60.0;
    }
    score
}

fn swap_allowed(a: &Entry, b: &Entry) -> bool {
    if a.slot.minutes() != b.slot.minutes() {
        return false;
    }
    // Neither task may land past its own deadline.
    if a.deadline.is_some_and(|d| b.slot.end > d) {
        return false;
    }
    if b.deadline.is_some_and(|d| a.slot.end > d) {
        return false;
    }
    true
}

/// Repeatedly apply the best strictly-improving swap until none remains.
///
/// Entries are scanned in id order, so among equal deltas the smallest id
/// pair wins and reruns on an optimized day change nothing.
pub fn optimize(
    registry: &mut TaskRegistry,
    config: &EngineConfig,
    day: NaiveDate,
    now: DateTime<Utc>,
) -> OptimizeOutcome {
    let window_start = config.window_start_on(day);
    let mut swaps: Vec<(String, String)> = Vec::new();

    loop {
        let mut entries: Vec<Entry> = registry
            .list(TaskFilter::for_day(day).with_status(TaskStatus::Scheduled))
            .filter_map(|t| {
                t.slot.map(|slot| Entry {
                    id: t.id.clone(),
                    priority: t.priority,
                    urgency: urgency_factor(t.deadline, now),
                    deadline: t.deadline,
                    preferred_start: t.preferred_start,
                    slot,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        let mut best: Option<(f64, usize, usize)> = None;
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (a, b) = (&entries[i], &entries[j]);
                if !swap_allowed(a, b) {
                    continue;
                }
                let current = placement_score(a, &a.slot, window_start)
                    + placement_score(b, &b.slot, window_start);
                let proposed = placement_score(a, &b.slot, window_start)
                    + placement_score(b, &a.slot, window_start);
                let delta = proposed - current;
                if delta > MIN_IMPROVEMENT && best.is_none_or(|(d, _, _)| delta > d) {
                    best = Some((delta, i, j));
                }
            }
        }

        let Some((delta, i, j)) = best else { break };
        let (slot_a, slot_b) = (entries[i].slot, entries[j].slot);
        let id_a = entries[i].id.clone();
        let id_b = entries[j].id.clone();
        if let Ok(task) = registry.get_mut(&id_a) {
            task.slot = Some(slot_b);
            task.touch(now);
        }
        if let Ok(task) = registry.get_mut(&id_b) {
            task.slot = Some(slot_a);
            task.touch(now);
        }
        debug!(a = %id_a, b = %id_b, delta, "swapped slots");
        swaps.push((id_a, id_b));
    }

    let summary = format!("optimizer: applied {} swaps", swaps.len());
    OptimizeOutcome { swaps, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapacityWindow;
    use crate::task::Task;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn d(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn config() -> EngineConfig {
        EngineConfig {
            capacity_window: CapacityWindow {
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            },
            slot_granularity_minutes: 30,
            ..EngineConfig::default()
        }
    }

    fn scheduled(id: &str, priority: i32, slot: TimeSlot) -> Task {
        Task {
            id: id.to_string(),
            owner: "sam".to_string(),
            day: day(),
            title: format!("task {id}"),
            estimated_minutes: slot.minutes(),
            priority,
            deadline: None,
            preferred_start: None,
            status: TaskStatus::Scheduled,
            slot: Some(slot),
            focus_score: 0.0,
            minutes_logged: 0,
            created_at: d(8, 0),
            updated_at: d(8, 0),
            seq: 0,
        }
    }

    #[test]
    fn test_heavier_task_moves_earlier() {
        let mut registry = TaskRegistry::new();
        registry.upsert(scheduled("light", 1, TimeSlot::new(d(9, 0), d(10, 0))));
        registry.upsert(scheduled("heavy", 8, TimeSlot::new(d(15, 0), d(16, 0))));

        let outcome = optimize(&mut registry, &config(), day(), d(8, 0));

        assert_eq!(outcome.swaps, vec![("heavy".to_string(), "light".to_string())]);
        assert_eq!(registry.get("heavy").unwrap().slot, Some(TimeSlot::new(d(9, 0), d(10, 0))));
        assert_eq!(registry.get("light").unwrap().slot, Some(TimeSlot::new(d(15, 0), d(16, 0))));
    }

    #[test]
    fn test_unequal_lengths_never_swap() {
        let mut registry = TaskRegistry::new();
        registry.upsert(scheduled("short", 1, TimeSlot::new(d(9, 0), d(9, 30))));
        registry.upsert(scheduled("long", 9, TimeSlot::new(d(14, 0), d(16, 0))));

        let outcome = optimize(&mut registry, &config(), day(), d(8, 0));

        assert!(outcome.swaps.is_empty());
        assert_eq!(registry.get("long").unwrap().slot, Some(TimeSlot::new(d(14, 0), d(16, 0))));
    }

    #[test]
    fn test_deadline_blocks_late_move() {
        let mut registry = TaskRegistry::new();
        // Swapping would be a win on weight, but it would push "due" past
        // its deadline.
        let mut due = scheduled("due", 2, TimeSlot::new(d(9, 0), d(10, 0)));
        due.deadline = Some(d(10, 30));
        registry.upsert(due);
        registry.upsert(scheduled("big", 9, TimeSlot::new(d(15, 0), d(16, 0))));

        let outcome = optimize(&mut registry, &config(), day(), d(8, 0));

        assert!(outcome.swaps.is_empty());
        assert_eq!(registry.get("due").unwrap().slot, Some(TimeSlot::new(d(9, 0), d(10, 0))));
    }

    #[test]
    fn test_in_progress_is_pinned() {
        let mut registry = TaskRegistry::new();
        let mut started = scheduled("started", 1, TimeSlot::new(d(9, 0), d(10, 0)));
        started.status = TaskStatus::InProgress;
        registry.upsert(started);
        registry.upsert(scheduled("heavy", 8, TimeSlot::new(d(15, 0), d(16, 0))));

        let outcome = optimize(&mut registry, &config(), day(), d(8, 0));

        assert!(outcome.swaps.is_empty());
    }

    #[test]
    fn test_preferred_start_attracts_slot() {
        let mut registry = TaskRegistry::new();
        // Same weight, so only the preference term differentiates.
        let mut afternoon = scheduled("afternoon", 3, TimeSlot::new(d(9, 0), d(10, 0)));
        afternoon.preferred_start = Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        registry.upsert(afternoon);
        registry.upsert(scheduled("other", 3, TimeSlot::new(d(14, 0), d(15, 0))));

        optimize(&mut registry, &config(), day(), d(8, 0));

        assert_eq!(
            registry.get("afternoon").unwrap().slot,
            Some(TimeSlot::new(d(14, 0), d(15, 0)))
        );
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let mut registry = TaskRegistry::new();
        registry.upsert(scheduled("a", 5, TimeSlot::new(d(9, 0), d(10, 0))));
        registry.upsert(scheduled("b", 7, TimeSlot::new(d(10, 0), d(11, 0))));
        registry.upsert(scheduled("c", 2, TimeSlot::new(d(11, 0), d(12, 0))));

        let first = optimize(&mut registry, &config(), day(), d(8, 0));
        let after_first: Vec<Option<TimeSlot>> = ["a", "b", "c"]
            .iter()
            .map(|id| registry.get(id).unwrap().slot)
            .collect();

        let second = optimize(&mut registry, &config(), day(), d(8, 0));
        let after_second: Vec<Option<TimeSlot>> = ["a", "b", "c"]
            .iter()
            .map(|id| registry.get(id).unwrap().slot)
            .collect();

        assert!(!first.swaps.is_empty());
        assert!(second.swaps.is_empty());
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_urgency_factor_bands() {
        let now = d(9, 0);
        assert_eq!(urgency_factor(None, now), 1.0);
        assert_eq!(urgency_factor(Some(d(9, 30)), now), 3.0);
        assert_eq!(urgency_factor(Some(d(8, 0)), now), 3.0);
        assert_eq!(urgency_factor(Some(d(12, 0)), now), 2.0);
        assert_eq!(urgency_factor(Some(d(16, 0)), now), 1.5);
    }
}
