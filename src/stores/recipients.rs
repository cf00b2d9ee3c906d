//! Recipient list persistence (`emails.json`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::stores::{load_json_or_default, save_json_atomic, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecipientList {
    #[serde(default)]
    recipients: Vec<String>,
}

/// Trim, drop empties, deduplicate keeping first occurrence. Applied on both
/// load and save, so consumers always see a list that satisfies the engine's
/// input contract.
pub fn normalize<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for entry in entries {
        let trimmed = entry.as_ref().trim();
        if !trimmed.is_empty() && seen.insert(trimmed.to_string()) {
            unique.push(trimmed.to_string());
        }
    }
    unique
}

/// Parses pasted or imported recipient text: one address per line or
/// comma-separated, tolerating `1.`-style enumeration prefixes.
pub fn parse_recipient_text(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    for line in text.lines() {
        for fragment in line.split(',') {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }
            entries.push(strip_enumeration(fragment).to_string());
        }
    }
    normalize(entries)
}

/// Strips a leading `<digits>.` prefix, as in "1. user@example.com". An
/// address like "john.doe@example.com" is left alone because the part before
/// its first dot is not numeric.
fn strip_enumeration(entry: &str) -> &str {
    match entry.split_once('.') {
        Some((left, rest)) => {
            let left = left.trim();
            if !left.is_empty() && left.chars().all(|c| c.is_ascii_digit()) {
                rest.trim()
            } else {
                entry
            }
        }
        None => entry,
    }
}

/// Single-file JSON store for the recipient list.
pub struct RecipientStore {
    path: PathBuf,
}

impl RecipientStore {
    pub const FILE_NAME: &'static str = "emails.json";

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Normalized recipient list; empty when the file is missing or unreadable.
    pub async fn load(&self) -> Vec<String> {
        let list: RecipientList = load_json_or_default(&self.path).await;
        normalize(list.recipients)
    }

    /// Normalizes and persists; returns how many entries were kept.
    pub async fn save(&self, recipients: &[String]) -> Result<usize, StoreError> {
        let recipients = normalize(recipients);
        let count = recipients.len();
        save_json_atomic(&self.path, &RecipientList { recipients }).await?;
        info!("saved {} recipient(s) to {}", count, self.path.display());
        Ok(count)
    }

    /// Appends one address; returns false when it was already present.
    pub async fn add(&self, address: &str) -> Result<bool, StoreError> {
        let mut recipients = self.load().await;
        let before = recipients.len();
        recipients.push(address.to_string());
        let after = self.save(&recipients).await?;
        Ok(after > before)
    }

    /// Removes one address; returns false when it was not present.
    pub async fn remove(&self, address: &str) -> Result<bool, StoreError> {
        let mut recipients = self.load().await;
        let before = recipients.len();
        recipients.retain(|r| r != address.trim());
        let removed = recipients.len() < before;
        self.save(&recipients).await?;
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.save(&[]).await?;
        Ok(())
    }

    /// Replaces the stored list, rather than appending, with the addresses
    /// parsed from `text`; returns what was saved.
    pub async fn import_text(&self, text: &str) -> Result<Vec<String>, StoreError> {
        let recipients = parse_recipient_text(text);
        self.save(&recipients).await?;
        Ok(recipients)
    }
}
