//! Asynchronous best-effort delivery of agent requests.
//!
//! The router submits synchronously and never waits; delivery happens on
//! tokio tasks owned by the dispatcher. One lane task per destination
//! hostname keeps per-destination submission order; there is no ordering
//! across destinations, no retry queue, and no record of undeliverable
//! notifications. The next event or ping re-probes a silent peer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::dispatch::request::AgentRequest;
use crate::dispatch::transport::Transport;
use crate::error::{NotifyError, Result};

/// Submission side of the dispatcher. Cheap to clone; owned by the router.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<AgentRequest>,
}

impl DispatcherHandle {
    /// Hand off a request for asynchronous delivery.
    ///
    /// Ownership of the request transfers to the dispatcher. Send-side
    /// failures are logged by the dispatcher, not surfaced here; the only
    /// error is submitting after shutdown.
    pub fn queue_request(&self, request: AgentRequest) -> Result<()> {
        self.tx
            .send(request)
            .map_err(|_| NotifyError::DispatcherClosed)
    }
}

pub struct AgentDispatcher {
    transport: Arc<dyn Transport>,
    msg_timeout: Duration,
    shutdown: CancellationToken,
}

impl AgentDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        msg_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            msg_timeout,
            shutdown,
        }
    }

    /// Spawn the dispatch loop onto the current tokio runtime and return
    /// the submission handle.
    pub fn spawn(self) -> DispatcherHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(rx));
        DispatcherHandle { tx }
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<AgentRequest>) {
        // Per-destination lanes, spawned on first use. Dropping a lane
        // sender lets its task drain and exit.
        let mut lanes: HashMap<String, mpsc::UnboundedSender<AgentRequest>> = HashMap::new();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("agent dispatcher shutting down");
                    break;
                }
                request = rx.recv() => {
                    let Some(request) = request else { break };
                    self.route(&mut lanes, request);
                }
            }
        }
    }

    fn route(
        &self,
        lanes: &mut HashMap<String, mpsc::UnboundedSender<AgentRequest>>,
        request: AgentRequest,
    ) {
        let host = request.dest.hostname.clone();
        let lane = lanes.entry(host.clone()).or_insert_with(|| {
            let (lane_tx, lane_rx) = mpsc::unbounded_channel();
            let transport = self.transport.clone();
            let msg_timeout = self.msg_timeout;
            tokio::spawn(deliver_lane(host.clone(), transport, msg_timeout, lane_rx));
            lane_tx
        });

        let result = lane.send(request);
        if let Err(e) = result {
            tracing::warn!(
                request_id = %e.0.request_id,
                host = %e.0.dest.hostname,
                "delivery lane gone, notification dropped"
            );
            // Forget the dead lane so the next request respawns it.
            lanes.remove(&host);
        }
    }
}

/// Deliver requests to one destination in submission order.
async fn deliver_lane(
    host: String,
    transport: Arc<dyn Transport>,
    msg_timeout: Duration,
    mut rx: mpsc::UnboundedReceiver<AgentRequest>,
) {
    while let Some(request) = rx.recv().await {
        let mut attempts = request.retries + 1;
        loop {
            match timeout(msg_timeout, transport.send(&request)).await {
                Ok(Ok(())) => {
                    tracing::debug!(
                        request_id = %request.request_id,
                        kind = request.message.kind(),
                        host = %host,
                        "notification delivered"
                    );
                    break;
                }
                Ok(Err(e)) => {
                    attempts -= 1;
                    if attempts == 0 {
                        tracing::warn!(
                            request_id = %request.request_id,
                            kind = request.message.kind(),
                            host = %host,
                            error = %e,
                            "notification dropped"
                        );
                        break;
                    }
                }
                Err(_) => {
                    attempts -= 1;
                    if attempts == 0 {
                        tracing::warn!(
                            request_id = %request.request_id,
                            kind = request.message.kind(),
                            host = %host,
                            timeout_secs = msg_timeout.as_secs(),
                            "notification timed out, dropped"
                        );
                        break;
                    }
                }
            }
        }
    }
}
