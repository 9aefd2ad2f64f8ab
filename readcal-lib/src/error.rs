use readcal_core::ProviderError;
use readcal_db::StoreError;
use thiserror::Error;

/// Failure reading or writing the metadata cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache payload could not be (de)serialized: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors surfaced by the reconciliation engine and calendar materializer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No enabled provider with that name.
    #[error("Unknown or disabled provider: '{0}'")]
    UnknownProvider(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A background reconciliation task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    /// The provider failure behind this error, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }
}

impl From<readcal_db::OperationError> for EngineError {
    fn from(err: readcal_db::OperationError) -> Self {
        Self::Store(err.into())
    }
}

/// Failure loading or saving `settings.toml`.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}
