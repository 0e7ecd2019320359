use vouch_core::ConnectionId;

/// Decision engine errors. Only fetch, persistence and configuration
/// problems surface here; validation failures become decisions.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("definition fetch failed: {0}")]
    DefinitionFetch(#[from] DefinitionFetchError),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("no contact for connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("invalid issuance schema id: {0}")]
    InvalidIssuanceSchema(String),
}

/// The presentation definition could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionFetchError {
    #[error("definition unavailable: {0}")]
    Unavailable(String),

    #[error("definition invalid: {0}")]
    Invalid(#[from] vouch_core::CoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the holder-facing agent. Logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent transport failed: {0}")]
    Transport(String),
}
