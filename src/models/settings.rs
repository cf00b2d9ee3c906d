use serde::{Deserialize, Serialize};

/// How the SMTP connection is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionMode {
    /// Plaintext for the whole session.
    None,
    /// Plaintext connect, then an in-protocol upgrade to TLS followed by a
    /// second greeting exchange.
    StartTls,
    /// TLS handshake performed while establishing the connection; the wire is
    /// never observed in plaintext.
    ImplicitTls,
}

/// Connection parameters for one dispatch run.
///
/// Captured by value when a run starts and never re-read, so edits to the
/// stored configuration cannot affect a run that is already in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    pub host: String,
    pub port: u16,
    pub encryption: EncryptionMode,
    /// Also used as the sender address on outgoing messages.
    pub username: String,
    pub password: String,
}

impl TransportSettings {
    /// A run cannot proceed unless host, username and password are all present.
    pub fn is_complete(&self) -> bool {
        !self.host.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            encryption: EncryptionMode::StartTls,
            username: String::new(),
            password: String::new(),
        }
    }
}
