pub mod job;
pub mod node;
pub mod step;

pub use job::{JobRecord, JobState};
pub use node::{NodeRecord, NodeSet, NodeTable};
pub use step::{StepId, StepRecord, StepState};

use std::collections::HashMap;

/// All jobs the controller currently tracks, addressable by job id.
///
/// The registry itself is a plain synchronous structure; callers wrap it in
/// a `std::sync::RwLock`. The router read-locks it for ping iteration and
/// write-locks it to record client responses; every other entry borrows
/// records the caller has already locked.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<u32, JobRecord>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job. Returns false if a job with the same id already exists.
    pub fn insert_job(&mut self, job: JobRecord) -> bool {
        if self.jobs.contains_key(&job.job_id) {
            return false;
        }
        self.jobs.insert(job.job_id, job);
        true
    }

    /// Remove a job. Refuses while steps remain so step records never
    /// outlive their teardown notifications.
    pub fn remove_job(&mut self, job_id: u32) -> Option<JobRecord> {
        match self.jobs.get(&job_id) {
            Some(job) if !job.steps.is_empty() => {
                tracing::warn!(job_id, steps = job.steps.len(), "refusing to remove job with live steps");
                None
            }
            Some(_) => self.jobs.remove(&job_id),
            None => None,
        }
    }

    pub fn find_job(&self, job_id: u32) -> Option<&JobRecord> {
        self.jobs.get(&job_id)
    }

    pub fn find_job_mut(&mut self, job_id: u32) -> Option<&mut JobRecord> {
        self.jobs.get_mut(&job_id)
    }

    pub fn find_step(&self, step_id: StepId) -> Option<&StepRecord> {
        self.jobs
            .get(&step_id.job_id)?
            .steps
            .iter()
            .find(|s| s.step_id == step_id)
    }

    pub fn find_step_mut(&mut self, step_id: StepId) -> Option<&mut StepRecord> {
        self.jobs
            .get_mut(&step_id.job_id)?
            .steps
            .iter_mut()
            .find(|s| s.step_id == step_id)
    }

    /// Append a step to its owning job, preserving launch order. Returns
    /// false if the job is unknown or the step id already exists.
    pub fn add_step(&mut self, step: StepRecord) -> bool {
        let Some(job) = self.jobs.get_mut(&step.step_id.job_id) else {
            return false;
        };
        if job.steps.iter().any(|s| s.step_id == step.step_id) {
            return false;
        }
        job.steps.push(step);
        true
    }

    pub fn remove_step(&mut self, step_id: StepId) -> Option<StepRecord> {
        let job = self.jobs.get_mut(&step_id.job_id)?;
        let pos = job.steps.iter().position(|s| s.step_id == step_id)?;
        Some(job.steps.remove(pos))
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobRecord> {
        self.jobs.values()
    }

    pub fn jobs_mut(&mut self) -> impl Iterator<Item = &mut JobRecord> {
        self.jobs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
