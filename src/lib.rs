//! Library core for Mailburst, a bulk-mail dispatch engine over SMTP.
//!
//! A run takes the stored SMTP settings, opens one transport session, builds
//! one message per recipient and sends them in order, reporting per-recipient
//! outcomes on an event stream that always ends with `Finished`.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod stores;

pub mod prelude {
    // Dispatch
    pub use crate::dispatch::{
        DispatchEngine, DispatchError, DispatchEvent, DispatchEvents, DispatchRequest, SendOutcome,
    };

    // Models
    pub use crate::models::{Draft, EncryptionMode, TransportSettings};

    // Stores
    pub use crate::stores::{DraftStore, RecipientStore, SettingsStore, SmtpConfig};

    // Common Libs
    pub use log::{debug, error, info, warn};
}
