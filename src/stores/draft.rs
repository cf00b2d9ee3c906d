//! Draft persistence (`draft.json`).

use std::path::{Path, PathBuf};

use log::info;

use crate::models::Draft;
use crate::stores::{load_json_or_default, save_json_atomic, StoreError};

/// Single-file JSON store for the draft.
pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    pub const FILE_NAME: &'static str = "draft.json";

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Stored draft, or an empty one when the file is missing or unreadable.
    /// Attachment paths are returned as stored; existence is only checked
    /// when a message is built.
    pub async fn load(&self) -> Draft {
        load_json_or_default(&self.path).await
    }

    /// Persists the draft, keeping only attachment paths that exist right
    /// now. Returns the dropped paths so the caller can report them.
    pub async fn save(&self, draft: &Draft) -> Result<Vec<PathBuf>, StoreError> {
        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        for path in &draft.attachments {
            if tokio::fs::metadata(path).await.is_ok() {
                kept.push(path.clone());
            } else {
                dropped.push(path.clone());
            }
        }
        let filtered = Draft {
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            attachments: kept,
        };
        save_json_atomic(&self.path, &filtered).await?;
        info!("saved draft to {}", self.path.display());
        Ok(dropped)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        save_json_atomic(&self.path, &Draft::default()).await?;
        Ok(())
    }
}
