pub mod classify;
pub mod dedup;
pub mod delegate;
pub mod error;
pub mod format;
pub mod normalize;
pub mod parse;
pub mod rows;
pub mod rules;
pub mod settings;
pub mod staging;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{ensure_categories, Classifier, DEFAULT_DELEGATE_TIMEOUT};
pub use dedup::{partition, DuplicateDecision, Partition};
pub use delegate::{
    DelegateClassifier, DelegateError, DelegateOutcome, DelegateRequest, HttpDelegate,
};
pub use error::{ImportError, Result, SetupError};
pub use format::{FormatHint, KnownFormat, UnknownFormat, HEADER_TOKENS};
pub use normalize::{normalize, normalize_at, RowRejection};
pub use rows::{read_csv, read_spreadsheet, RawRow, RowSourceError, Upload, UploadKind};
pub use rules::{KeywordRule, KeywordRules, RulesError};
pub use settings::{DelegateSettings, ImportSettings, SettingsError};
pub use staging::{CommitReceipt, ImportCoordinator, StagingBatch};
