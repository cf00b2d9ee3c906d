//! JSON-file persistence for settings, recipients and drafts.
//!
//! Every store takes its file path as constructor input; nothing here is
//! process-global. Loads never fail the caller: a missing or malformed file
//! yields the documented defaults with a warning. Saves are atomic (temp
//! file, then rename) and propagate their errors.

use std::io::ErrorKind;
use std::path::Path;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;

pub mod draft;
pub mod recipients;
pub mod settings;

pub use draft::DraftStore;
pub use recipients::RecipientStore;
pub use settings::{SettingsStore, SmtpConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub(crate) async fn load_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "ignoring malformed JSON in {}, using defaults: {}",
                    path.display(),
                    err
                );
                T::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => T::default(),
        Err(err) => {
            warn!("could not read {}, using defaults: {}", path.display(), err);
            T::default()
        }
    }
}

pub(crate) async fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json.as_bytes()).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}
