use bankin_core::{Direction, StoreError};
use thiserror::Error;

use crate::delegate::DelegateError;
use crate::rows::RowSourceError;
use crate::rules::RulesError;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No usable rows in the import")]
    NoUsableRows,
    #[error("No {0} categories available")]
    NoCategories(Direction),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Row source error: {0}")]
    Rows(#[from] RowSourceError),
    #[error("Upload reader failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failures while assembling the pipeline from configuration.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error(transparent)]
    Delegate(#[from] DelegateError),
}

pub type Result<T> = std::result::Result<T, ImportError>;
