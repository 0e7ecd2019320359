/// Core data-model errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid presentation definition: {0}")]
    InvalidDefinition(String),

    #[error("duplicate input descriptor name: {0}")]
    DuplicateDescriptor(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid pattern encoding: {0}")]
    InvalidPattern(String),

    #[error("invalid exchange state: {0}")]
    InvalidExchangeState(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
