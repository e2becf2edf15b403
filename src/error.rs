use std::path::PathBuf;

/// Failures that decide whether a run keeps going.
///
/// Library functions return these wrapped in `anyhow::Error`; callers use
/// `downcast_ref::<PublishError>()` to tell per-document failures apart from
/// store-level ones.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("filename does not follow the CATEGORY-TOPIC[-SUBTOPICS-NUMBER] convention: {0}")]
    UnparseableFilename(String),

    #[error("index {path} has an incompatible header (expected `{expected}`, found `{found}`); run `nbsite migrate`")]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("failed to convert {path}: {reason}")]
    ConversionFailure { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    PersistenceFailure { path: PathBuf, reason: String },

    #[error("invalid box type '{kind}'. Available types: {available}")]
    UnknownBoxType { kind: String, available: String },
}

impl PublishError {
    /// Store-level errors abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PublishError::SchemaMismatch { .. } | PublishError::PersistenceFailure { .. }
        )
    }
}

/// True when `err` carries a [`PublishError`] that must abort the run.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PublishError>()
        .map(PublishError::is_fatal)
        .unwrap_or(false)
}
