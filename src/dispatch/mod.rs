//! The dispatch engine and its direct collaborators: event stream, message
//! builder, SMTP session.

pub mod engine;
pub mod events;
pub mod message;
pub mod session;

pub use engine::{DispatchEngine, DispatchError, DispatchRequest};
pub use events::{DispatchEvent, DispatchEvents, SendOutcome};
pub use message::{BuiltMessage, MessageBuildError, MessageBuilder};
pub use session::{MailTransport, SmtpSession, SmtpTransportFactory, TransportError, TransportFactory};
