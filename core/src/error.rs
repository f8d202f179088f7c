use std::sync::Arc;

use crate::poll::PollError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to build package '{id}': {reason}")]
    Build { id: String, reason: String },

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Version(#[from] gallery_registry_core::VersionError),

    #[error("client error: {0}")]
    Client(#[from] gallery_registry_client::Error),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("push task ended abnormally: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("failed to unlist {id} {version}: {source}")]
    Unlist {
        id: String,
        version: String,
        #[source]
        source: Box<Error>,
    },

    #[error("push of '{key}' failed: {source}")]
    Push {
        key: String,
        #[source]
        source: Arc<Error>,
    },

    /// The push this caller was waiting on failed. A later `prepare` retries.
    #[error("push of '{key}' failed while waiting on it: {source}")]
    InFlightPushFailed {
        key: String,
        #[source]
        source: Arc<Error>,
    },
}

impl Error {
    pub fn with_key(key: impl std::fmt::Display) -> impl FnOnce(Arc<Self>) -> Self {
        let key = key.to_string();
        move |source| Self::Push { key, source }
    }

    /// The underlying failure, looking through push wrappers.
    pub fn root(&self) -> &Self {
        match self {
            Self::Push { source, .. } | Self::InFlightPushFailed { source, .. } => source.root(),
            Self::Unlist { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
