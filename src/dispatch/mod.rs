pub mod dispatcher;
pub mod message;
pub mod request;
pub mod resolver;
pub mod transport;

pub use dispatcher::{AgentDispatcher, DispatcherHandle};
pub use message::{EventMessage, SuspendOp};
pub use request::{AgentRequest, ClientAddr, Destination, SenderIdentity};
pub use transport::{Envelope, TcpTransport, Transport};
