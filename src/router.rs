//! The notification router: one entry per event kind.
//!
//! Every operation is synchronous from the caller's perspective; message
//! construction happens inline, then ownership passes to the dispatcher and
//! the call returns. Callers hold whatever lock covers the job record they
//! pass in; only `ping` and `response` touch the registry lock themselves.

use std::cmp::min;
use std::sync::{Arc, RwLock};

use chrono::Duration;

use crate::clock::Clock;
use crate::config::{HostRole, NotifierConfig};
use crate::dispatch::{
    resolver, AgentRequest, ClientAddr, Destination, DispatcherHandle, EventMessage,
    SenderIdentity, SuspendOp,
};
use crate::error::{NotifyError, Result};
use crate::registry::{JobRecord, JobRegistry, JobState, NodeTable, StepId, StepRecord, StepState};

pub struct NotificationRouter {
    config: NotifierConfig,
    nodes: Arc<NodeTable>,
    registry: Arc<RwLock<JobRegistry>>,
    dispatcher: DispatcherHandle,
    clock: Arc<dyn Clock>,
}

impl NotificationRouter {
    pub fn new(
        config: NotifierConfig,
        nodes: Arc<NodeTable>,
        registry: Arc<RwLock<JobRegistry>>,
        dispatcher: DispatcherHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            nodes,
            registry,
            dispatcher,
            clock,
        }
    }

    /// Tell the allocation client its allocation was aborted before launch.
    pub fn allocate_abort(&self, job: &JobRecord) {
        if !job.alloc_response_known() {
            return;
        }
        let Some(host) = job.resp_host.as_deref() else {
            return;
        };
        self.launch(
            Destination::direct(host, ClientAddr::new(host, job.alloc_resp_port)),
            job.alloc_tls_cert.as_deref(),
            SenderIdentity::Uid(job.user_id),
            job.start_protocol_ver,
            EventMessage::JobComplete {
                step_id: StepId::job_level(job.job_id),
            },
        );
    }

    /// A node in the job's allocation failed. Notify each affected step's
    /// client, then the allocation client (or its delegated step manager).
    pub fn node_fail(&self, job: &JobRecord, node_name: &str) {
        if job.state != JobState::Running {
            return;
        }
        let Some(node) = self.nodes.find(node_name) else {
            return;
        };

        for step in job.client_steps() {
            if step.state != StepState::Running {
                continue;
            }
            if !step.node_bitmap.contains(node.index) {
                continue;
            }
            let Some(dest) = self.step_destination(step) else {
                continue;
            };
            self.launch(
                dest,
                step.tls_cert.as_deref(),
                SenderIdentity::Uid(job.user_id),
                step.start_protocol_ver,
                EventMessage::NodeFail {
                    step_id: step.step_id,
                    nodes: node_name.to_string(),
                },
            );
        }

        self.notify_allocation(
            job,
            EventMessage::NodeFail {
                step_id: StepId::job_level(job.job_id),
                nodes: node_name.to_string(),
            },
        );
    }

    /// The allocation is approaching its time limit.
    pub fn timeout(&self, job: &JobRecord) {
        if job.state != JobState::Running {
            return;
        }

        for step in job.client_steps() {
            if step.state != StepState::Running {
                continue;
            }
            let Some(dest) = self.step_destination(step) else {
                continue;
            };
            self.launch(
                dest,
                step.tls_cert.as_deref(),
                SenderIdentity::Uid(job.user_id),
                step.start_protocol_ver,
                EventMessage::Timeout {
                    step_id: step.step_id,
                    end_time: job.end_time,
                },
            );
        }

        self.notify_allocation(
            job,
            EventMessage::Timeout {
                step_id: StepId::job_level(job.job_id),
                end_time: job.end_time,
            },
        );
    }

    /// The whole allocation is complete. Emits the per-step completion for
    /// any step that has not had one, then the job-level notification.
    pub fn job_complete(&self, job: &mut JobRecord) {
        let user_id = job.user_id;
        for step in job.steps.iter_mut() {
            self.emit_step_complete(user_id, step);
        }

        self.notify_allocation(
            job,
            EventMessage::JobComplete {
                step_id: StepId::job_level(job.job_id),
            },
        );
    }

    /// The allocation was suspended or resumed. Returns true iff a message
    /// was emitted, so the caller knows whether to expect an ack.
    pub fn job_suspend(&self, job: &JobRecord, op: SuspendOp) -> bool {
        if !job.alloc_client_known() {
            return false;
        }
        let Some(host) = job.resp_host.as_deref() else {
            return false;
        };
        self.launch(
            Destination::direct(host, ClientAddr::new(host, job.other_port)),
            job.alloc_tls_cert.as_deref(),
            SenderIdentity::Uid(job.user_id),
            job.start_protocol_ver,
            EventMessage::Suspend {
                step_id: StepId::job_level(job.job_id),
                op,
            },
        );
        true
    }

    /// One step finished. Guaranteed to be called before the step leaves
    /// the registry; emits its client's completion notification once.
    pub fn step_complete(&self, job: &JobRecord, step: &mut StepRecord) {
        debug_assert_eq!(step.step_id.job_id, job.job_id);
        self.emit_step_complete(job.user_id, step);
    }

    fn emit_step_complete(&self, user_id: u32, step: &mut StepRecord) {
        if step.is_batch_script() || step.state != StepState::Running {
            return;
        }
        step.state = StepState::CompletionEmitted;
        let Some(dest) = self.step_destination(step) else {
            return;
        };
        self.launch(
            dest,
            step.tls_cert.as_deref(),
            SenderIdentity::Uid(user_id),
            step.start_protocol_ver,
            EventMessage::JobComplete {
                step_id: step.step_id,
            },
        );
    }

    /// Some of the step's nodes never reported launch completion.
    pub fn step_missing(&self, job: &JobRecord, step: &StepRecord, node_list: &str) {
        debug_assert_eq!(step.step_id.job_id, job.job_id);
        if step.is_batch_script() || step.state != StepState::Running {
            return;
        }
        let Some(dest) = self.step_destination(step) else {
            return;
        };
        self.launch(
            dest,
            step.tls_cert.as_deref(),
            SenderIdentity::Uid(job.user_id),
            step.start_protocol_ver,
            EventMessage::StepMissing {
                step_id: step.step_id,
                nodes: node_list.to_string(),
            },
        );
    }

    /// Ask the step's client to forward a signal to its tasks.
    pub fn step_signal(&self, job: &JobRecord, step: &StepRecord, signal: u32) {
        debug_assert_eq!(step.step_id.job_id, job.job_id);
        if step.is_batch_script() || step.state != StepState::Running {
            return;
        }
        let Some(dest) = self.step_destination(step) else {
            return;
        };
        self.launch(
            dest,
            step.tls_cert.as_deref(),
            SenderIdentity::Uid(job.user_id),
            step.start_protocol_ver,
            EventMessage::StepSignal {
                step_id: step.step_id,
                signal,
            },
        );
    }

    /// Deliver operator text to the job's client terminal.
    ///
    /// Falls back to relaying through the first node of a running batch job
    /// when no allocation client is listening.
    pub fn user_message(&self, job: &JobRecord, text: &str) -> Result<()> {
        if !job.state.is_active() {
            return Err(NotifyError::AlreadyDone(job.job_id));
        }

        if job.alloc_client_known() {
            let Some(host) = job.resp_host.as_deref() else {
                return Err(NotifyError::Disabled(job.job_id));
            };
            self.launch(
                Destination::direct(host, ClientAddr::new(host, job.other_port)),
                job.alloc_tls_cert.as_deref(),
                SenderIdentity::Uid(job.user_id),
                job.start_protocol_ver,
                EventMessage::UserMessage {
                    step_id: StepId::job_level(job.job_id),
                    text: text.to_string(),
                },
            );
            return Ok(());
        }

        if job.state == JobState::Running && job.batch_flag {
            let Some(node) = self.nodes.first_in(&job.node_bitmap) else {
                return Err(NotifyError::Disabled(job.job_id));
            };
            // Relayed by the node daemon, so it is addressed at the node's
            // own protocol version rather than the job's.
            self.launch(
                Destination::by_hostname(&node.name),
                None,
                SenderIdentity::Any,
                node.protocol_version,
                EventMessage::JobNotify {
                    step_id: StepId::job_level(job.job_id),
                    text: text.to_string(),
                },
            );
            return Ok(());
        }

        Err(NotifyError::Disabled(job.job_id))
    }

    /// Probe allocation clients that have been silent too long.
    ///
    /// Runs from a periodic task; a zero inactive limit disables probing.
    /// Batch-only jobs never opened an event port and are never pinged.
    pub fn ping(&self) {
        if self.config.inactive_limit_secs == 0 {
            return;
        }

        let now = self.clock.now();
        let delay = self.config.inactive_limit_secs as i64 / 3
            - self.config.msg_timeout_secs as i64
            - 1;
        let threshold = now - Duration::seconds(delay);

        let registry = self.registry.read().expect("job registry lock poisoned");
        for job in registry.jobs() {
            if job.state != JobState::Running {
                continue;
            }
            if !job.alloc_client_known() {
                continue;
            }
            if job.time_last_active >= threshold {
                continue;
            }
            let Some(host) = job.resp_host.as_deref() else {
                continue;
            };
            self.launch(
                Destination::direct(host, ClientAddr::new(host, job.other_port)),
                job.alloc_tls_cert.as_deref(),
                SenderIdentity::Uid(job.user_id),
                job.start_protocol_ver,
                EventMessage::Ping { job_id: job.job_id },
            );
        }
    }

    /// A client answered some message; record it as alive now.
    ///
    /// Unknown jobs and steps are tolerated silently: the response may have
    /// raced with completion.
    pub fn response(&self, step_id: StepId) {
        let now = self.clock.now();
        let mut registry = self.registry.write().expect("job registry lock poisoned");
        let Some(job) = registry.find_job_mut(step_id.job_id) else {
            return;
        };
        job.time_last_active = now;

        if step_id.step_id != StepId::NO_VAL {
            if let Some(step) = job.steps.iter_mut().find(|s| s.step_id == step_id) {
                step.time_last_active = now;
            }
        }
    }

    /// Shared tail of node-fail/timeout/complete: when step management is
    /// delegated, the batch host's step manager forwards to clients itself,
    /// and notifying the allocation client here as well would break the
    /// single-source ordering of its event stream.
    fn notify_allocation(&self, job: &JobRecord, message: EventMessage) {
        if self.config.host_role == HostRole::Controller && job.stepmgr_enabled {
            if let Some(host) = job.batch_host.as_deref() {
                self.launch(
                    Destination::by_hostname(host),
                    None,
                    SenderIdentity::Uid(self.config.daemon_uid),
                    job.start_protocol_ver,
                    message,
                );
                return;
            }
        }

        if job.alloc_client_known() {
            let Some(host) = job.resp_host.as_deref() else {
                return;
            };
            self.launch(
                Destination::direct(host, ClientAddr::new(host, job.other_port)),
                job.alloc_tls_cert.as_deref(),
                SenderIdentity::Uid(job.user_id),
                job.start_protocol_ver,
                message,
            );
        }
    }

    /// Dispatch address for a step's client, if it has one.
    fn step_destination(&self, step: &StepRecord) -> Option<Destination> {
        if step.port == 0 {
            return None;
        }
        let host = step.host.as_deref()?;
        let addr = resolver::resolve(host, step.port, &self.nodes);
        Some(Destination {
            hostname: host.to_string(),
            addr: Some(addr),
        })
    }

    /// Common dispatch prologue for every event kind: single destination,
    /// retries disabled, owned TLS copy, negotiated protocol version.
    fn launch(
        &self,
        dest: Destination,
        tls_cert: Option<&str>,
        identity: SenderIdentity,
        peer_version: u16,
        message: EventMessage,
    ) {
        let version = min(self.config.max_protocol_version, peer_version);
        let request = AgentRequest::single(
            dest,
            tls_cert.map(str::to_owned),
            identity,
            version,
            message,
        );
        tracing::debug!(
            request_id = %request.request_id,
            kind = request.message.kind(),
            host = %request.dest.hostname,
            version,
            "queueing notification"
        );
        if let Err(e) = self.dispatcher.queue_request(request) {
            tracing::warn!(error = %e, "notification dropped at submission");
        }
    }
}
