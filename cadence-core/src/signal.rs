//! External signals: the only channel by which the outside world reports
//! progress, focus, and completion back into the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Payload of a collaborator-submitted signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    /// Minutes actually worked since the last report.
    Progress { minutes: i64 },

    /// Self-reported focus quality in [0, 1].
    FocusRating { value: f64 },

    Completed,
}

impl SignalKind {
    /// Malformed payloads are rejected here, before they reach a queue.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            SignalKind::Progress { minutes } if *minutes <= 0 => {
                Err(EngineError::InvalidSignal(format!(
                    "progress minutes must be positive, got {minutes}"
                )))
            }
            SignalKind::FocusRating { value } if !(0.0..=1.0).contains(value) => {
                Err(EngineError::InvalidSignal(format!(
                    "focus rating must be within 0..=1, got {value}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// An accepted signal waiting in an owner's queue for the next cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub task_id: String,
    #[serde(flatten)]
    pub kind: SignalKind,
    pub received_at: DateTime<Utc>,
}
