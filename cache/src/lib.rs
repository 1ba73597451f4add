#![cfg_attr(coverage, feature(coverage_attribute))]
mod cache;
mod config;
mod context;
mod errors;
mod external;
mod index;
mod manager;
mod pool;
mod progress;
mod query;
mod resource;
mod stats;
mod watchers;

pub use crate::cache::ResourceCache;
pub use crate::config::CacheConfig;
pub use crate::context::ContextCaches;
pub use crate::errors::{
    AuthenticationError,
    LoadTimeoutError,
    QueryError,
    SyncError,
    TransformError,
};
pub use crate::external::{
    ClientFactory,
    KubeconfigEntry,
    KubeconfigSource,
    ResourceDefinition,
    ResourceDefinitionSource,
};
pub use crate::index::ClusterIndex;
pub use crate::manager::{
    InformerManager,
    InformerState,
};
pub use crate::pool::{
    ContextInfo,
    ContextPool,
    ContextStatus,
};
pub use crate::progress::{
    ProgressPhase,
    ProgressSender,
    ProgressUpdate,
};
#[cfg(feature = "mock")]
pub use crate::query::MockRepository;
pub use crate::query::{
    ClusterRepository,
    Repository,
};
pub use crate::resource::*;
pub use crate::stats::ResourceStats;
