//! SMTP settings persistence (`config.json`).

use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::models::{EncryptionMode, TransportSettings};
use crate::stores::{load_json_or_default, save_json_atomic, StoreError};

fn default_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

/// The stored record. Field names and defaults are the on-disk format and
/// must stay stable; external tools read and write this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_port")]
    pub smtp_port: u16,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            use_tls: true,
            use_ssl: false,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl SmtpConfig {
    /// SSL wins when both flags are set: an `use_ssl` record always meant a
    /// TLS-wrapped connection regardless of `use_tls`.
    pub fn encryption(&self) -> EncryptionMode {
        if self.use_ssl {
            EncryptionMode::ImplicitTls
        } else if self.use_tls {
            EncryptionMode::StartTls
        } else {
            EncryptionMode::None
        }
    }

    pub fn to_transport_settings(&self) -> TransportSettings {
        TransportSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            encryption: self.encryption(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Subset of `SmtpConfig` accepted by `import`. Absent fields keep their
/// stored values; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct SmtpConfigPatch {
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    use_tls: Option<bool>,
    use_ssl: Option<bool>,
    username: Option<String>,
    password: Option<String>,
}

impl SmtpConfigPatch {
    fn apply(self, config: &mut SmtpConfig) {
        if let Some(host) = self.smtp_host {
            config.smtp_host = host;
        }
        if let Some(port) = self.smtp_port {
            config.smtp_port = port;
        }
        if let Some(tls) = self.use_tls {
            config.use_tls = tls;
        }
        if let Some(ssl) = self.use_ssl {
            config.use_ssl = ssl;
        }
        if let Some(username) = self.username {
            config.username = username;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
    }
}

/// Single-file JSON store for `SmtpConfig`.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub const FILE_NAME: &'static str = "config.json";

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Stored settings, or defaults when the file is missing or unreadable.
    pub async fn load(&self) -> SmtpConfig {
        load_json_or_default(&self.path).await
    }

    pub async fn save(&self, config: &SmtpConfig) -> Result<(), StoreError> {
        save_json_atomic(&self.path, config).await?;
        info!("saved SMTP settings to {}", self.path.display());
        Ok(())
    }

    /// Reads an external JSON file (any subset of the fields, unknown fields
    /// ignored), merges it over the currently stored settings, and persists
    /// the result. Fields the file does not name are left as they were.
    pub async fn import<P: AsRef<Path>>(&self, source: P) -> Result<SmtpConfig, StoreError> {
        let contents = tokio::fs::read_to_string(source.as_ref()).await?;
        let patch: SmtpConfigPatch = serde_json::from_str(&contents)?;
        let mut config = self.load().await;
        patch.apply(&mut config);
        self.save(&config).await?;
        Ok(config)
    }
}
