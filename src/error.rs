use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::stores::StoreError;

/// Top-level error for the command-line entry points.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
