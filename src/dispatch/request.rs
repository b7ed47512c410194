use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::message::EventMessage;

/// A resolved client address: host (or literal address) plus port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAddr {
    pub host: String,
    pub port: u16,
}

impl ClientAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for ClientAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Where a request is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub hostname: String,
    /// Resolved client address. `None` for node-daemon destinations
    /// (delegated step manager, batch-node relay): the transport resolves
    /// the hostname and applies its own channel security.
    pub addr: Option<ClientAddr>,
}

impl Destination {
    pub fn direct(hostname: impl Into<String>, addr: ClientAddr) -> Self {
        Self {
            hostname: hostname.into(),
            addr: Some(addr),
        }
    }

    pub fn by_hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            addr: None,
        }
    }
}

/// Identity a request is sent under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderIdentity {
    /// A specific user: the job owner, or the privileged daemon user for
    /// requests addressed to node daemons.
    Uid(u32),
    /// No particular user; accepted from any authenticated peer.
    Any,
}

/// One outbound notification, owned by the dispatcher once submitted.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Correlation id for log lines.
    pub request_id: Uuid,
    pub dest: Destination,
    /// Destination names; always exactly one entry here.
    pub hostlist: Vec<String>,
    pub node_count: u32,
    /// Always zero: recipients may have exited, and retrying accumulates
    /// work against peers that will never answer.
    pub retries: u32,
    /// Owned copy of the recipient's TLS material; the caller keeps its own.
    pub tls_cert: Option<String>,
    pub identity: SenderIdentity,
    /// Already negotiated down to what both sides speak.
    pub protocol_version: u16,
    pub message: EventMessage,
}

impl AgentRequest {
    /// Build a single-destination request with the standard contract:
    /// one-entry hostlist, node_count 1, retries disabled.
    pub fn single(
        dest: Destination,
        tls_cert: Option<String>,
        identity: SenderIdentity,
        protocol_version: u16,
        message: EventMessage,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            hostlist: vec![dest.hostname.clone()],
            node_count: 1,
            retries: 0,
            dest,
            tls_cert,
            identity,
            protocol_version,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StepId;

    #[test]
    fn single_request_contract() {
        let req = AgentRequest::single(
            Destination::direct("login0", ClientAddr::new("10.0.0.5", 7000)),
            Some("cert".to_string()),
            SenderIdentity::Uid(500),
            3,
            EventMessage::JobComplete {
                step_id: StepId::job_level(9),
            },
        );
        assert_eq!(req.hostlist, vec!["login0".to_string()]);
        assert_eq!(req.node_count, 1);
        assert_eq!(req.retries, 0);
        assert_eq!(req.tls_cert.as_deref(), Some("cert"));
        assert_eq!(req.protocol_version, 3);
    }

    #[test]
    fn client_addr_display() {
        assert_eq!(ClientAddr::new("n0", 6818).to_string(), "n0:6818");
    }
}
