//! Engine facade: owner-partitioned registries behind one shared handle.
//!
//! Locking is per owner. A cycle holds its owner's registry lock end to
//! end, so cycles for different owners run in parallel while two cycles for
//! the same owner serialize. Signals land in a separate per-owner queue and
//! never wait on a running cycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::coordinator::{Coordinator, CycleOutcome};
use crate::error::{EngineError, EngineResult};
use crate::registry::{TaskFilter, TaskRegistry};
use crate::report::{self, Report};
use crate::scheduler::{GreedyByUrgency, SchedulePolicy};
use crate::signal::{Signal, SignalKind};
use crate::task::{NewTask, Task, TaskStatus};

struct OwnerCell {
    registry: Mutex<TaskRegistry>,
    signals: Mutex<Vec<Signal>>,
}

impl OwnerCell {
    fn new() -> Self {
        Self { registry: Mutex::new(TaskRegistry::new()), signals: Mutex::new(Vec::new()) }
    }
}

pub struct Engine<P: SchedulePolicy = GreedyByUrgency> {
    config: EngineConfig,
    coordinator: Coordinator<P>,
    owners: Mutex<HashMap<String, Arc<OwnerCell>>>,
    /// Task id to owner, for routing signals without touching registries.
    task_owners: Mutex<HashMap<String, String>>,
}

impl Engine<GreedyByUrgency> {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_policy(config, GreedyByUrgency)
    }
}

impl<P: SchedulePolicy> Engine<P> {
    pub fn with_policy(config: EngineConfig, policy: P) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            coordinator: Coordinator::new(policy),
            owners: Mutex::new(HashMap::new()),
            task_owners: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn cell(&self, owner: &str) -> Arc<OwnerCell> {
        let mut owners = self.owners.lock();
        owners.entry(owner.to_string()).or_insert_with(|| Arc::new(OwnerCell::new())).clone()
    }

    fn existing_cell(&self, owner: &str) -> EngineResult<Arc<OwnerCell>> {
        self.owners
            .lock()
            .get(owner)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("owner {owner}")))
    }

    /// Accept a draft: validate, assign id and timestamps, store it pending.
    pub fn add_task(&self, draft: NewTask, now: DateTime<Utc>) -> EngineResult<Task> {
        draft.validate()?;
        let task = Task {
            id: Uuid::new_v4().to_string(),
            owner: draft.owner.clone(),
            day: draft.day,
            title: draft.title,
            estimated_minutes: draft.estimated_minutes,
            priority: draft.priority,
            deadline: draft.deadline,
            preferred_start: draft.preferred_start,
            status: TaskStatus::Unscheduled,
            slot: None,
            focus_score: 0.0,
            minutes_logged: 0,
            created_at: now,
            updated_at: now,
            seq: 0,
        };

        let cell = self.cell(&draft.owner);
        let id = task.id.clone();
        let stored = {
            let mut registry = cell.registry.lock();
            registry.upsert(task);
            // Re-read to pick up the assigned sequence.
            registry.get(&id)?.clone()
        };
        self.task_owners.lock().insert(stored.id.clone(), draft.owner);
        info!(task = %stored.id, owner = %stored.owner, day = %stored.day, "task added");
        Ok(stored)
    }

    /// Store a fully-formed task, e.g. one reloaded from external storage.
    /// Replaces any stored task with the same id.
    pub fn upsert_task(&self, task: Task) -> EngineResult<()> {
        task.validate()?;
        let cell = self.cell(&task.owner);
        self.task_owners.lock().insert(task.id.clone(), task.owner.clone());
        cell.registry.lock().upsert(task);
        Ok(())
    }

    /// Queue a signal for the owning task's next cycle. Validation happens
    /// here; application happens inside the cycle's focus stage.
    pub fn submit_signal(
        &self,
        task_id: &str,
        kind: SignalKind,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        kind.validate()?;
        let owner = self
            .task_owners
            .lock()
            .get(task_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("task {task_id}")))?;
        let cell = self.existing_cell(&owner)?;
        cell.signals
            .lock()
            .push(Signal { task_id: task_id.to_string(), kind, received_at: now });
        Ok(())
    }

    /// Run one full pipeline cycle for `owner` on `day`.
    ///
    /// Drains the signal queue as of cycle start; signals submitted while
    /// the cycle runs wait for the next one.
    pub fn run_cycle(
        &self,
        owner: &str,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> EngineResult<CycleOutcome> {
        let cell = self.existing_cell(owner)?;
        let mut registry = cell.registry.lock();
        let pending = std::mem::take(&mut *cell.signals.lock());
        Ok(self.coordinator.run_cycle(&mut registry, &self.config, pending, day, now))
    }

    pub fn list_tasks(&self, owner: &str, filter: TaskFilter) -> EngineResult<Vec<Task>> {
        let cell = self.existing_cell(owner)?;
        let registry = cell.registry.lock();
        Ok(registry.list(filter).cloned().collect())
    }

    /// Owners with at least one task, sorted for stable output.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.owners.lock().keys().cloned().collect();
        owners.sort();
        owners
    }

    pub fn get_task(&self, task_id: &str) -> EngineResult<Task> {
        let owner = self
            .task_owners
            .lock()
            .get(task_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("task {task_id}")))?;
        let cell = self.existing_cell(&owner)?;
        let registry = cell.registry.lock();
        registry.get(task_id).cloned()
    }

    /// Aggregate an owner's slotted tasks over an arbitrary window.
    pub fn report(
        &self,
        owner: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> EngineResult<Report> {
        let cell = self.existing_cell(owner)?;
        let registry = cell.registry.lock();
        Ok(report::generate(&registry, window_start, window_end))
    }
}
