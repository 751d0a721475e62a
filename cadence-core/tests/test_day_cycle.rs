use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use cadence_core::{
    CapacityWindow, Engine, EngineConfig, NewTask, SignalKind, TaskFilter, TaskStatus, TimeSlot,
    Urgency,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn d(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn engine(window_start: NaiveTime, window_end: NaiveTime) -> Engine {
    let config = EngineConfig {
        capacity_window: CapacityWindow { start: window_start, end: window_end },
        slot_granularity_minutes: 30,
        ..EngineConfig::default()
    };
    Engine::new(config).unwrap()
}

/// Three-hour morning, two tasks: the deadline task takes the first hour,
/// the heavier-by-weight task follows it.
#[test]
fn test_morning_fills_front_to_back() {
    let engine = engine(t(9, 0), t(12, 0));
    let a = engine
        .add_task(
            NewTask::new("sam", day(), "deep work", 60).with_priority(5).with_deadline(d(10, 0)),
            d(7, 0),
        )
        .unwrap();
    let b = engine
        .add_task(NewTask::new("sam", day(), "email", 90).with_priority(3), d(7, 1))
        .unwrap();

    let outcome = engine.run_cycle("sam", day(), d(8, 0)).unwrap();

    assert_eq!(outcome.scheduled.len(), 2);
    assert_eq!(outcome.scheduled[0].id, a.id);
    assert_eq!(outcome.scheduled[0].slot, Some(TimeSlot::new(d(9, 0), d(10, 0))));
    assert_eq!(outcome.scheduled[1].id, b.id);
    assert_eq!(outcome.scheduled[1].slot, Some(TimeSlot::new(d(10, 0), d(11, 30))));
    assert!(outcome.unschedulable.is_empty());
    assert!(outcome.swaps.is_empty());
}

/// A task that arrives after the day has filled up must not evict anyone,
/// however heavy its weight; it is reported unschedulable instead.
#[test]
fn test_late_heavy_task_does_not_evict() {
    let engine = engine(t(9, 0), t(12, 0));
    let a = engine
        .add_task(
            NewTask::new("sam", day(), "deep work", 60).with_priority(5).with_deadline(d(10, 0)),
            d(7, 0),
        )
        .unwrap();
    let b = engine
        .add_task(NewTask::new("sam", day(), "email", 90).with_priority(3), d(7, 1))
        .unwrap();
    engine.run_cycle("sam", day(), d(8, 0)).unwrap();

    let c = engine
        .add_task(NewTask::new("sam", day(), "urgent-looking", 60).with_priority(9), d(8, 10))
        .unwrap();
    let outcome = engine.run_cycle("sam", day(), d(8, 15)).unwrap();

    // Only a 30-minute tail gap remains, so the newcomer stays pending.
    assert_eq!(engine.get_task(&a.id).unwrap().slot, Some(TimeSlot::new(d(9, 0), d(10, 0))));
    assert_eq!(engine.get_task(&b.id).unwrap().slot, Some(TimeSlot::new(d(10, 0), d(11, 30))));
    assert_eq!(outcome.unschedulable.len(), 1);
    assert_eq!(outcome.unschedulable[0].task_id, c.id);
    assert_eq!(outcome.unschedulable[0].reason, "no free slot of at least 60 minutes");
    assert_eq!(engine.get_task(&c.id).unwrap().status, TaskStatus::Unscheduled);
}

/// A full working day driven through the engine: placement, signals,
/// completion, a missed slot, and the closing report.
#[test]
fn test_full_day_narrative() {
    let engine = engine(t(9, 0), t(17, 0));
    let review = engine
        .add_task(
            NewTask::new("sam", day(), "review PR", 45).with_priority(6).with_deadline(d(11, 0)),
            d(8, 0),
        )
        .unwrap();
    let deep = engine
        .add_task(
            NewTask::new("sam", day(), "deep work", 120)
                .with_priority(8)
                .with_preferred_start(t(9, 0)),
            d(8, 5),
        )
        .unwrap();
    let email = engine
        .add_task(NewTask::new("sam", day(), "email sweep", 30).with_priority(2), d(8, 10))
        .unwrap();

    // Morning cycle: deadline first, then weight; estimates snap to the
    // 30-minute grid, so 45 minutes books a full hour.
    let morning = engine.run_cycle("sam", day(), d(8, 30)).unwrap();
    assert_eq!(engine.get_task(&review.id).unwrap().slot, Some(TimeSlot::new(d(9, 0), d(10, 0))));
    assert_eq!(engine.get_task(&deep.id).unwrap().slot, Some(TimeSlot::new(d(10, 0), d(12, 0))));
    assert_eq!(engine.get_task(&email.id).unwrap().slot, Some(TimeSlot::new(d(12, 0), d(12, 30))));
    assert_eq!(morning.reminders.len(), 1);
    assert_eq!(morning.reminders[0].task_id, review.id);
    assert_eq!(morning.reminders[0].urgency, Urgency::Low);

    // Work happens; signals queue up between cycles.
    engine.submit_signal(&review.id, SignalKind::Progress { minutes: 30 }, d(9, 20)).unwrap();
    engine.submit_signal(&review.id, SignalKind::FocusRating { value: 0.9 }, d(9, 40)).unwrap();
    engine.submit_signal(&review.id, SignalKind::Completed, d(10, 5)).unwrap();

    let midday = engine.run_cycle("sam", day(), d(10, 10)).unwrap();
    let reviewed = engine.get_task(&review.id).unwrap();
    assert_eq!(reviewed.status, TaskStatus::Done);
    assert_eq!(reviewed.minutes_logged, 30);
    // progress 30/45 then rating 0.9, both smoothed at alpha 0.5:
    // 0.5 * 2/3 = 1/3, then 0.5 * 0.9 + 0.5 * 1/3.
    assert!((reviewed.focus_score - (0.45 + 1.0 / 6.0)).abs() < 1e-9);
    assert!(midday.report.avg_focus.is_some());

    // Afternoon: email gets done, deep work never gets touched.
    engine.submit_signal(&email.id, SignalKind::Progress { minutes: 15 }, d(12, 5)).unwrap();
    engine.submit_signal(&email.id, SignalKind::Completed, d(12, 20)).unwrap();

    let afternoon = engine.run_cycle("sam", day(), d(12, 40)).unwrap();
    assert_eq!(engine.get_task(&email.id).unwrap().status, TaskStatus::Done);
    assert_eq!(engine.get_task(&deep.id).unwrap().status, TaskStatus::Missed);
    assert_eq!(afternoon.report.done, 2);
    assert_eq!(afternoon.report.missed, 1);
    assert_eq!(afternoon.report.scheduled_minutes, 45 + 120 + 30);
    assert_eq!(afternoon.report.completed_minutes, 45 + 30);
    // Nothing live holds a slot any more.
    assert!(afternoon.scheduled.is_empty());

    // A later cycle must not re-mark the missed task.
    let evening = engine.run_cycle("sam", day(), d(18, 0)).unwrap();
    assert!(evening.summary.contains("0 missed"));
}

/// Each signal folds into the focus score one smoothing step at a time;
/// a cycle with nothing queued leaves the score exactly where it was.
#[test]
fn test_focus_score_follows_smoothing_steps() {
    let engine = engine(t(9, 0), t(17, 0));
    let task = engine
        .add_task(NewTask::new("sam", day(), "deep work", 60), d(8, 0))
        .unwrap();
    engine.run_cycle("sam", day(), d(8, 30)).unwrap();

    // Full-estimate progress is a 1.0 sample: 0.5 * 1.0 + 0.5 * 0.0.
    engine.submit_signal(&task.id, SignalKind::Progress { minutes: 60 }, d(9, 10)).unwrap();
    engine.run_cycle("sam", day(), d(9, 15)).unwrap();
    assert!((engine.get_task(&task.id).unwrap().focus_score - 0.5).abs() < 1e-9);

    // Idle cycle: the queue was drained, so nothing re-applies.
    engine.run_cycle("sam", day(), d(9, 20)).unwrap();
    assert!((engine.get_task(&task.id).unwrap().focus_score - 0.5).abs() < 1e-9);

    // 0.5 * 0.2 + 0.5 * 0.5.
    engine.submit_signal(&task.id, SignalKind::FocusRating { value: 0.2 }, d(9, 25)).unwrap();
    engine.run_cycle("sam", day(), d(9, 30)).unwrap();
    assert!((engine.get_task(&task.id).unwrap().focus_score - 0.35).abs() < 1e-9);
}

/// Preferred start times only matter once the scheduler has placed
/// everything: the optimizer then trades equal-length slots.
#[test]
fn test_optimizer_honors_preferred_start_through_engine() {
    let engine = engine(t(9, 0), t(17, 0));
    let prep = engine
        .add_task(
            NewTask::new("sam", day(), "prep slides", 30)
                .with_priority(4)
                .with_preferred_start(t(13, 0)),
            d(8, 0),
        )
        .unwrap();
    let fix = engine
        .add_task(NewTask::new("sam", day(), "fix bug", 30).with_priority(4), d(8, 1))
        .unwrap();

    let outcome = engine.run_cycle("sam", day(), d(8, 30)).unwrap();

    assert_eq!(outcome.swaps.len(), 1);
    let swapped: Vec<&str> =
        vec![outcome.swaps[0].0.as_str(), outcome.swaps[0].1.as_str()];
    assert!(swapped.contains(&prep.id.as_str()));
    assert!(swapped.contains(&fix.id.as_str()));
    // The preference holder ends up in the later slot, closer to 13:00.
    assert_eq!(engine.get_task(&fix.id).unwrap().slot, Some(TimeSlot::new(d(9, 0), d(9, 30))));
    assert_eq!(engine.get_task(&prep.id).unwrap().slot, Some(TimeSlot::new(d(9, 30), d(10, 0))));

    // Re-running the cycle finds nothing further to improve.
    let again = engine.run_cycle("sam", day(), d(8, 35)).unwrap();
    assert!(again.swaps.is_empty());
}

/// Signals submitted for one owner never leak into another owner's cycle,
/// and both owners can hold the same wall-clock slot.
#[test]
fn test_owner_schedules_are_disjoint_worlds() {
    let engine = engine(t(9, 0), t(17, 0));
    let ana = engine
        .add_task(NewTask::new("ana", day(), "ana deep work", 60).with_priority(5), d(8, 0))
        .unwrap();
    let ben = engine
        .add_task(NewTask::new("ben", day(), "ben deep work", 60).with_priority(5), d(8, 0))
        .unwrap();

    engine.run_cycle("ana", day(), d(8, 30)).unwrap();
    engine.run_cycle("ben", day(), d(8, 30)).unwrap();
    assert_eq!(engine.get_task(&ana.id).unwrap().slot, engine.get_task(&ben.id).unwrap().slot);

    engine.submit_signal(&ana.id, SignalKind::Completed, d(9, 30)).unwrap();
    engine.run_cycle("ben", day(), d(9, 40)).unwrap();
    // Ben's cycle ran, but Ana's completion still waits in her queue.
    assert_eq!(engine.get_task(&ana.id).unwrap().status, TaskStatus::Scheduled);

    engine.run_cycle("ana", day(), d(9, 45)).unwrap();
    assert_eq!(engine.get_task(&ana.id).unwrap().status, TaskStatus::Done);
    assert_eq!(engine.get_task(&ben.id).unwrap().status, TaskStatus::Scheduled);

    let ana_tasks = engine.list_tasks("ana", TaskFilter::for_day(day())).unwrap();
    assert_eq!(ana_tasks.len(), 1);
    assert_eq!(ana_tasks[0].id, ana.id);
}

/// Tasks on other days are untouched by a cycle except through their own
/// signals; the miss sweep is scoped to the cycle's day.
#[test]
fn test_cycle_only_sweeps_its_own_day() {
    let engine = engine(t(9, 0), t(17, 0));
    let monday = day();
    let tuesday = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();

    let mon_task =
        engine.add_task(NewTask::new("sam", monday, "monday work", 60), d(8, 0)).unwrap();
    let tue_task =
        engine.add_task(NewTask::new("sam", tuesday, "tuesday work", 60), d(8, 0)).unwrap();

    engine.run_cycle("sam", monday, d(8, 30)).unwrap();
    assert!(engine.get_task(&mon_task.id).unwrap().slot.is_some());
    // Tuesday's task was not part of Monday's cycle.
    assert_eq!(engine.get_task(&tue_task.id).unwrap().status, TaskStatus::Unscheduled);

    // Far past Monday's window, a Tuesday cycle leaves Monday alone.
    let next_morning = Utc.with_ymd_and_hms(2025, 6, 3, 8, 0, 0).unwrap();
    engine.run_cycle("sam", tuesday, next_morning).unwrap();
    assert_eq!(engine.get_task(&mon_task.id).unwrap().status, TaskStatus::Scheduled);

    // Monday's own late cycle finally marks the miss.
    engine.run_cycle("sam", monday, next_morning).unwrap();
    assert_eq!(engine.get_task(&mon_task.id).unwrap().status, TaskStatus::Missed);
}
