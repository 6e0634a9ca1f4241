use thiserror::Error;

/// Failures inside the wear engine. None of them are fatal: every event
/// handler recovers and logs.
#[derive(Debug, Error)]
pub enum WearError {
    #[error("junction identity unavailable: {0}")]
    Identity(String),
    #[error("failed to decode damage ledger: {0}")]
    Decode(String),
    #[error("failed to encode damage ledger: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Settings(String),
    #[error("branch {index} out of range (junction has {count} outgoing branches)")]
    BranchOutOfRange { index: usize, count: usize },
}

impl WearError {
    pub fn identity(reason: impl Into<String>) -> Self {
        Self::Identity(reason.into())
    }
}
