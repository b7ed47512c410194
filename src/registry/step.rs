use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::node::NodeSet;

/// Identifier of a step within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId {
    pub job_id: u32,
    pub step_id: u32,
}

impl StepId {
    /// Sentinel for the implicit batch-script pseudo-step. Never addressed
    /// by a direct client notification.
    pub const BATCH_SCRIPT: u32 = 0xffff_fffa;

    /// Sentinel meaning "no step": job-level messages and responses.
    pub const NO_VAL: u32 = 0xffff_fffe;

    pub fn new(job_id: u32, step_id: u32) -> Self {
        Self { job_id, step_id }
    }

    /// Job-level identifier (step component is the no-step sentinel).
    pub fn job_level(job_id: u32) -> Self {
        Self::new(job_id, Self::NO_VAL)
    }

    pub fn batch_script(job_id: u32) -> Self {
        Self::new(job_id, Self::BATCH_SCRIPT)
    }

    pub fn is_batch_script(&self) -> bool {
        self.step_id == Self::BATCH_SCRIPT
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.step_id {
            Self::BATCH_SCRIPT => write!(f, "{}.batch", self.job_id),
            Self::NO_VAL => write!(f, "{}", self.job_id),
            id => write!(f, "{}.{}", self.job_id, id),
        }
    }
}

/// Step lifecycle as the router sees it. The registry drops the record
/// after completion has been emitted; the router never emits completion
/// twice for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Running,
    CompletionEmitted,
}

/// One step of a job, carrying the client endpoint its launcher listens on.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step_id: StepId,
    /// Client host, when the launching process opened a listen port.
    pub host: Option<String>,
    /// Client port; zero means no client endpoint.
    pub port: u16,
    pub tls_cert: Option<String>,
    pub start_protocol_ver: u16,
    pub node_bitmap: NodeSet,
    pub time_last_active: DateTime<Utc>,
    pub state: StepState,
}

impl StepRecord {
    pub fn new(step_id: StepId, start_protocol_ver: u16, now: DateTime<Utc>) -> Self {
        Self {
            step_id,
            host: None,
            port: 0,
            tls_cert: None,
            start_protocol_ver,
            node_bitmap: NodeSet::new(),
            time_last_active: now,
            state: StepState::Running,
        }
    }

    /// Whether the step's launcher can be reached directly.
    pub fn has_client(&self) -> bool {
        self.port != 0 && self.host.is_some()
    }

    pub fn is_batch_script(&self) -> bool {
        self.step_id.is_batch_script()
    }
}
