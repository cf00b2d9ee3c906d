//! SMTP session handling.
//!
//! `MailTransport` is the seam between the dispatch engine and the network:
//! the engine drives connect, optional authenticate, a submit per recipient,
//! and exactly one close per run. `SmtpSession` is the production
//! implementation over lettre's async SMTP client; tests drive the engine
//! with scripted stand-ins instead.

use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::Message;
use log::debug;
use thiserror::Error;

use crate::models::{EncryptionMode, TransportSettings};

/// Applied to the connect step only; sends run without a deadline so
/// cancellation never interrupts one mid-flight.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("TLS setup failed: {0}")]
    Tls(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Per-recipient send rejection; carries the server's reason verbatim.
    #[error("{0}")]
    Send(String),
}

/// One SMTP session, driven by the engine in lifecycle order.
///
/// `connect` performs the greeting exchange (twice for STARTTLS, around the
/// upgrade). A `submit` failure leaves the session usable for the next call.
/// `close` is best-effort and infallible; callers invoke it exactly once.
#[async_trait]
pub trait MailTransport: Send {
    async fn connect(&mut self, settings: &TransportSettings) -> Result<(), TransportError>;
    async fn authenticate(&mut self, username: &str, password: &str)
        -> Result<(), TransportError>;
    async fn submit(&mut self, message: &Message) -> Result<(), TransportError>;
    async fn close(&mut self);
}

/// Creates one fresh transport per dispatch run (and per connection test).
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Box<dyn MailTransport>;
}

/// lettre-backed SMTP session.
pub struct SmtpSession {
    hello: ClientId,
    connection: Option<AsyncSmtpConnection>,
}

impl SmtpSession {
    pub fn new() -> Self {
        Self {
            hello: ClientId::default(),
            connection: None,
        }
    }

    fn connection(&mut self) -> Result<&mut AsyncSmtpConnection, TransportError> {
        self.connection
            .as_mut()
            .ok_or_else(|| TransportError::Connect("session is not connected".to_string()))
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}

fn tls_parameters(host: &str) -> Result<TlsParameters, TransportError> {
    TlsParameters::new(host.to_string()).map_err(|err| TransportError::Tls(err.to_string()))
}

#[async_trait]
impl MailTransport for SmtpSession {
    async fn connect(&mut self, settings: &TransportSettings) -> Result<(), TransportError> {
        // Implicit TLS wraps the socket during connect; STARTTLS upgrades a
        // plaintext connection afterwards, re-greeting over the new channel.
        let wrap_tls = match settings.encryption {
            EncryptionMode::ImplicitTls => Some(tls_parameters(&settings.host)?),
            EncryptionMode::StartTls | EncryptionMode::None => None,
        };
        let mut connection = AsyncSmtpConnection::connect_tokio1(
            (settings.host.clone(), settings.port),
            Some(CONNECT_TIMEOUT),
            &self.hello,
            wrap_tls,
            None,
        )
        .await
        .map_err(|err| TransportError::Connect(err.to_string()))?;
        if settings.encryption == EncryptionMode::StartTls {
            connection
                .starttls(tls_parameters(&settings.host)?, &self.hello)
                .await
                .map_err(|err| TransportError::Tls(err.to_string()))?;
        }
        debug!(
            "connected to {}:{} ({:?})",
            settings.host, settings.port, settings.encryption
        );
        self.connection = Some(connection);
        Ok(())
    }

    async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<(), TransportError> {
        let credentials = Credentials::new(username.to_string(), password.to_string());
        self.connection()?
            .auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
            .await
            .map_err(|err| TransportError::Auth(err.to_string()))?;
        debug!("authenticated as {}", username);
        Ok(())
    }

    async fn submit(&mut self, message: &Message) -> Result<(), TransportError> {
        let raw = message.formatted();
        self.connection()?
            .send(message.envelope(), &raw)
            .await
            .map_err(|err| TransportError::Send(err.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            // QUIT then shut the stream down; failures at this point are
            // irrelevant to the run's outcome.
            connection.abort().await;
            debug!("session closed");
        }
    }
}

/// Production factory: a lettre session per run.
pub struct SmtpTransportFactory;

impl TransportFactory for SmtpTransportFactory {
    fn create(&self) -> Box<dyn MailTransport> {
        Box::new(SmtpSession::new())
    }
}
