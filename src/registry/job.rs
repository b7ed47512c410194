use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::node::NodeSet;
use crate::registry::step::StepRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
    Completed,
    Failed,
}

impl JobState {
    /// Pending and running jobs may still receive user messages.
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Pending | JobState::Running)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Suspended => write!(f, "suspended"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// One allocation and its steps, as seen by the notification router.
///
/// The router treats every field as read-only except `time_last_active`
/// (advanced by the response handler) and the per-step completion state.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: u32,
    pub user_id: u32,
    pub state: JobState,
    /// Submitted as a batch script rather than an interactive allocation.
    pub batch_flag: bool,
    /// Step-level events are delegated to a step manager on the batch host.
    pub stepmgr_enabled: bool,

    /// Host the allocation client listens on for event notifications.
    pub resp_host: Option<String>,
    /// Event-notification port on the allocation client; zero means none.
    /// Batch submissions never open one.
    pub other_port: u16,
    /// Allocation-response port on the allocation client; zero means none.
    pub alloc_resp_port: u16,
    /// Host the allocation request was submitted from.
    pub alloc_node: Option<String>,
    pub alloc_tls_cert: Option<String>,

    /// Node running the batch script, for batch jobs.
    pub batch_host: Option<String>,
    pub start_protocol_ver: u16,
    pub node_bitmap: NodeSet,
    /// Steps in launch order.
    pub steps: Vec<StepRecord>,
    pub time_last_active: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(job_id: u32, user_id: u32, start_protocol_ver: u16, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            user_id,
            state: JobState::Pending,
            batch_flag: false,
            stepmgr_enabled: false,
            resp_host: None,
            other_port: 0,
            alloc_resp_port: 0,
            alloc_node: None,
            alloc_tls_cert: None,
            batch_host: None,
            start_protocol_ver,
            node_bitmap: NodeSet::new(),
            steps: Vec::new(),
            time_last_active: now,
            end_time: now,
        }
    }

    /// Whether the allocation client's event endpoint is known.
    pub fn alloc_client_known(&self) -> bool {
        self.other_port != 0 && self.alloc_node.is_some() && self.resp_host.is_some()
    }

    /// Whether the allocation client's allocation-response endpoint is known.
    pub fn alloc_response_known(&self) -> bool {
        self.alloc_resp_port != 0 && self.alloc_node.is_some() && self.resp_host.is_some()
    }

    /// Every step except the batch-script pseudo-step.
    pub fn client_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| !s.is_batch_script())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::step::{StepId, StepRecord};

    #[test]
    fn job_state_is_active() {
        assert!(JobState::Pending.is_active());
        assert!(JobState::Running.is_active());
        assert!(!JobState::Suspended.is_active());
        assert!(!JobState::Completed.is_active());
        assert!(!JobState::Failed.is_active());
    }

    #[test]
    fn alloc_client_known_requires_all_fields() {
        let now = Utc::now();
        let mut job = JobRecord::new(100, 500, 3, now);
        assert!(!job.alloc_client_known());
        job.resp_host = Some("login0".to_string());
        job.alloc_node = Some("login0".to_string());
        assert!(!job.alloc_client_known());
        job.other_port = 7000;
        assert!(job.alloc_client_known());
        assert!(!job.alloc_response_known());
        job.alloc_resp_port = 7001;
        assert!(job.alloc_response_known());
    }

    #[test]
    fn client_steps_skips_batch_pseudo_step() {
        let now = Utc::now();
        let mut job = JobRecord::new(100, 500, 3, now);
        job.steps.push(StepRecord::new(StepId::batch_script(100), 3, now));
        job.steps.push(StepRecord::new(StepId::new(100, 0), 3, now));
        job.steps.push(StepRecord::new(StepId::new(100, 1), 3, now));

        let ids: Vec<u32> = job.client_steps().map(|s| s.step_id.step_id).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
