//! Per-owner task registry: insertion-ordered storage with id lookup.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{EngineError, EngineResult};
use crate::task::{Task, TaskStatus};

/// Listing predicate. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub day: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    pub fn for_day(day: NaiveDate) -> Self {
        Self { day: Some(day), status: None }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.day.is_none_or(|d| task.day == d)
            && self.status.is_none_or(|s| task.status == s)
    }
}

/// All tasks belonging to one owner.
///
/// Iteration follows insertion order; `seq` records that order on the task
/// so it survives round-trips through external storage.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    by_id: HashMap<String, usize>,
    next_seq: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Insert a task, or replace the stored one with the same id in place.
    /// Replacement keeps the original insertion position and sequence.
    pub fn upsert(&mut self, mut task: Task) {
        match self.by_id.get(&task.id) {
            Some(&index) => {
                task.seq = self.tasks[index].seq;
                self.tasks[index] = task;
            }
            None => {
                if task.seq == 0 {
                    self.next_seq += 1;
                    task.seq = self.next_seq;
                } else {
                    // Reloaded from storage with its sequence intact.
                    self.next_seq = self.next_seq.max(task.seq);
                }
                self.by_id.insert(task.id.clone(), self.tasks.len());
                self.tasks.push(task);
            }
        }
    }

    pub fn get(&self, id: &str) -> EngineResult<&Task> {
        self.by_id
            .get(id)
            .map(|&index| &self.tasks[index])
            .ok_or_else(|| EngineError::NotFound(format!("task {id}")))
    }

    pub fn get_mut(&mut self, id: &str) -> EngineResult<&mut Task> {
        match self.by_id.get(id) {
            Some(&index) => Ok(&mut self.tasks[index]),
            None => Err(EngineError::NotFound(format!("task {id}"))),
        }
    }

    pub fn list(&self, filter: TaskFilter) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| filter.matches(t))
    }

    /// Ids matching `filter`, cloned out so callers can mutate while walking.
    pub fn ids_matching(&self, filter: TaskFilter) -> Vec<String> {
        self.list(filter).map(|t| t.id.clone()).collect()
    }
}
