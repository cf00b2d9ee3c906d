use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The message being composed: subject, plain-text body, attachment paths.
///
/// This is also the persisted shape of `draft.json`. Attachment paths are
/// resolved lazily at message-build time, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}
