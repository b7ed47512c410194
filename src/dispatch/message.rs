use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::StepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspendOp {
    Suspend,
    Resume,
}

/// Payload of one client notification, one variant per event kind.
///
/// Job-level variants carry a job-level [`StepId`]; per-step variants carry
/// the step's own id so the client can route the event to the right launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventMessage {
    /// A node used by the step or allocation has failed.
    NodeFail { step_id: StepId, nodes: String },
    /// The allocation is approaching its end time.
    Timeout {
        step_id: StepId,
        end_time: DateTime<Utc>,
    },
    /// The step or allocation is complete.
    JobComplete { step_id: StepId },
    /// Operator- or administrator-supplied text for the client terminal.
    UserMessage { step_id: StepId, text: String },
    /// The allocation was suspended or resumed.
    Suspend { step_id: StepId, op: SuspendOp },
    /// The step should forward a signal to its tasks.
    StepSignal { step_id: StepId, signal: u32 },
    /// Some of the step's nodes never reported in.
    StepMissing { step_id: StepId, nodes: String },
    /// Liveness probe for a silent allocation client.
    Ping { job_id: u32 },
    /// Text relayed through a node daemon into a batch job.
    JobNotify { step_id: StepId, text: String },
}

impl EventMessage {
    /// Static label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            EventMessage::NodeFail { .. } => "node_fail",
            EventMessage::Timeout { .. } => "timeout",
            EventMessage::JobComplete { .. } => "job_complete",
            EventMessage::UserMessage { .. } => "user_message",
            EventMessage::Suspend { .. } => "suspend",
            EventMessage::StepSignal { .. } => "step_signal",
            EventMessage::StepMissing { .. } => "step_missing",
            EventMessage::Ping { .. } => "ping",
            EventMessage::JobNotify { .. } => "job_notify",
        }
    }
}
