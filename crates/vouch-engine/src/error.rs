/// Evaluation engine errors.
///
/// Validation failures are not errors; they are reported through
/// [`crate::validate::ValidationOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unsupported filter on {descriptor}.{path}: {reason}")]
    UnsupportedFilterKind {
        descriptor: String,
        path: String,
        reason: String,
    },

    #[error("descriptor not found: {0}")]
    UnknownDescriptor(String),

    #[error("core error: {0}")]
    Core(#[from] vouch_core::CoreError),
}
