use kubemirror_core::k8s::GVK;
use thiserror::Error;

/// Why a single kind's informer failed to reach `Synced`.
#[derive(Clone, Debug, Error)]
pub enum SyncError {
    #[error("timed out waiting for initial list/watch to complete")]
    Timeout,
    #[error("apiserver returned an error: {0}")]
    ApiError(String),
    #[error("kind is not served by this cluster")]
    NotServed,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("could not reach apiserver within the configured timeout")]
    ProbeTimedOut,
    #[error("apiserver rejected credentials: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum LoadTimeoutError {
    #[error("context {0} did not finish loading its critical-tier informers in time")]
    CriticalTier(String),
}

/// Errors surfaced by `Repository`. Distinct from `anyhow::Error`, which is reserved for the
/// ambient plumbing around context setup and configuration loading.
#[derive(Clone, Debug, Error)]
pub enum QueryError {
    #[error("unknown resource kind: {0:?}")]
    UnknownKind(kubemirror_core::k8s::GVK),

    #[error("informer for {kind:?} is not ready yet: {cause}")]
    InformerNotReady { kind: GVK, cause: SyncError },

    #[error("no such object")]
    NotFound,

    #[error("context is shutting down")]
    ShutdownInProgress,
}

/// Raised by the transform layer. Callers never let this escape the cache boundary; it's
/// logged and the offending object is dropped from its batch.
#[derive(Clone, Debug, Error)]
pub enum TransformError {
    #[error("object has no type metadata")]
    MissingTypeMeta,

    #[error("object has no uid")]
    MissingUid,

    #[error("unsupported printer-column json path: {0}")]
    BadJsonPath(String),

    #[error("field {0} had an unexpected shape")]
    UnexpectedShape(String),
}
