//! cadence-core: deterministic agent pipeline for day scheduling

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod focus;
pub mod optimizer;
pub mod registry;
pub mod reminder;
pub mod report;
pub mod scheduler;
pub mod signal;
pub mod slot;
pub mod task;

pub use config::{CapacityWindow, EngineConfig};
pub use coordinator::{Coordinator, CycleOutcome};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use focus::FocusOutcome;
pub use optimizer::OptimizeOutcome;
pub use registry::{TaskFilter, TaskRegistry};
pub use reminder::{Reminder, Urgency};
pub use report::Report;
pub use scheduler::{GreedyByUrgency, SchedulePolicy, ScheduleOutcome, Unschedulable};
pub use signal::{Signal, SignalKind};
pub use slot::TimeSlot;
pub use task::{NewTask, Task, TaskStatus};
