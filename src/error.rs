//! Error types for the status reconciler.
//!
//! Business outcomes (an order that could not be resolved this round) are never
//! errors; they travel in [`RoundResult`](crate::models::RoundResult). The
//! variants below are faults that abort a round and surface to the
//! [`RunController`](crate::reconciliation::RunController).

use crate::dictionary::DictionaryBuildError;
use crate::provider::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcilerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Status dictionary error: {0}")]
    DictionaryBuild(#[from] DictionaryBuildError),
    #[error("Data access error during {operation}: {reason}")]
    DataAccess {
        operation: String,
        reason: String,
        #[source]
        cause: Option<ErrorCause>,
    },
    #[error("Remote service error from {provider}: {reason}")]
    RemoteService { provider: String, reason: String },
    #[error("Unclassified error: {0}")]
    Unclassified(String),
}

/// Original driver error kept behind a data-access failure.
///
/// Shared so that [`ReconcilerError`] stays `Clone`; two causes compare equal
/// when their messages do.
#[derive(Clone)]
pub struct ErrorCause(Arc<dyn std::error::Error + Send + Sync>);

impl ErrorCause {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self(Arc::new(err))
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl PartialEq for ErrorCause {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_string() == other.0.to_string()
    }
}

/// Failure classes the run controller distinguishes when logging a fatal event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RemoteService,
    DataAccess,
    Unclassified,
}

impl ReconcilerError {
    /// Data-access failure described by text only
    pub fn data_access<O: Into<String>, R: std::fmt::Display>(operation: O, reason: R) -> Self {
        Self::DataAccess {
            operation: operation.into(),
            reason: reason.to_string(),
            cause: None,
        }
    }

    /// Data-access failure that keeps `err` as its source
    pub fn data_access_from<O, E>(operation: O, err: E) -> Self
    where
        O: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::DataAccess {
            operation: operation.into(),
            reason: err.to_string(),
            cause: Some(ErrorCause::new(err)),
        }
    }

    pub fn remote_service<P: Into<String>, R: std::fmt::Display>(provider: P, reason: R) -> Self {
        Self::RemoteService {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify the error for fatal run-level logging.
    ///
    /// A broken mapping table is a data-access artifact, so dictionary build
    /// failures are reported alongside other datastore failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcilerError::RemoteService { .. } => ErrorKind::RemoteService,
            ReconcilerError::DataAccess { .. } | ReconcilerError::DictionaryBuild(_) => {
                ErrorKind::DataAccess
            }
            ReconcilerError::InvalidArgument(_) | ReconcilerError::Unclassified(_) => {
                ErrorKind::Unclassified
            }
        }
    }
}

impl From<sqlx::Error> for ReconcilerError {
    fn from(err: sqlx::Error) -> Self {
        ReconcilerError::data_access_from("database operation", err)
    }
}

impl From<serde_json::Error> for ReconcilerError {
    fn from(err: serde_json::Error) -> Self {
        ReconcilerError::data_access_from("payload serialization", err)
    }
}

impl From<ProviderError> for ReconcilerError {
    fn from(err: ProviderError) -> Self {
        ReconcilerError::RemoteService {
            provider: err.provider().to_string(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcilerError>;
