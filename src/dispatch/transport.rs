//! Send primitive beneath the dispatcher.
//!
//! The dispatcher only needs one operation: deliver a single request to its
//! destination. [`TcpTransport`] is the stock implementation, writing one
//! JSON object per line over a fresh TCP connection; deployments with other
//! framing or channel-security needs supply their own [`Transport`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::dispatch::message::EventMessage;
use crate::dispatch::request::{AgentRequest, SenderIdentity};
use crate::error::Result;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: &AgentRequest) -> Result<()>;
}

/// On-the-wire form of one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub request_id: Uuid,
    pub identity: SenderIdentity,
    pub protocol_version: u16,
    pub message: EventMessage,
}

impl Envelope {
    pub fn from_request(request: &AgentRequest) -> Self {
        Self {
            request_id: request.request_id,
            identity: request.identity,
            protocol_version: request.protocol_version,
            message: request.message.clone(),
        }
    }
}

/// Line-delimited JSON over TCP. Plaintext; TLS-bearing deployments wrap
/// their own channel and consume `tls_cert` from the request there.
pub struct TcpTransport {
    /// Fallback port for hostname-only destinations (node daemons).
    daemon_port: u16,
}

impl TcpTransport {
    pub fn new(daemon_port: u16) -> Self {
        Self { daemon_port }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, request: &AgentRequest) -> Result<()> {
        let (host, port) = match &request.dest.addr {
            Some(addr) => (addr.host.as_str(), addr.port),
            None => (request.dest.hostname.as_str(), self.daemon_port),
        };

        let mut frame = serde_json::to_vec(&Envelope::from_request(request))?;
        frame.push(b'\n');

        let mut stream = TcpStream::connect((host, port)).await?;
        stream.write_all(&frame).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::request::{ClientAddr, Destination};
    use tokio::io::AsyncBufReadExt;

    fn ping_request(addr: ClientAddr) -> AgentRequest {
        AgentRequest::single(
            Destination::direct(addr.host.clone(), addr),
            None,
            SenderIdentity::Uid(500),
            3,
            EventMessage::Ping { job_id: 42 },
        )
    }

    #[test]
    fn envelope_round_trip() {
        let req = ping_request(ClientAddr::new("login0", 7000));
        let envelope = Envelope::from_request(&req);
        let json = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
        assert_eq!(back.message, EventMessage::Ping { job_id: 42 });
    }

    #[tokio::test]
    async fn tcp_transport_writes_one_json_line() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            tokio::io::BufReader::new(stream)
                .read_line(&mut line)
                .await
                .unwrap();
            line
        });

        let transport = TcpTransport::new(addr.port());
        let req = ping_request(ClientAddr::new(addr.ip().to_string(), addr.port()));
        transport.send(&req).await.unwrap();

        let line = accept.await.unwrap();
        let envelope: Envelope = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(envelope.message, EventMessage::Ping { job_id: 42 });
        assert_eq!(envelope.identity, SenderIdentity::Uid(500));
    }

    #[tokio::test]
    async fn tcp_transport_reports_connect_failure() {
        // Port 1 is essentially never listening.
        let transport = TcpTransport::new(1);
        let req = AgentRequest::single(
            Destination::by_hostname("127.0.0.1"),
            None,
            SenderIdentity::Any,
            3,
            EventMessage::Ping { job_id: 1 },
        );
        assert!(transport.send(&req).await.is_err());
    }
}
