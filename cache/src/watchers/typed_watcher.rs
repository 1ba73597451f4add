use async_trait::async_trait;
use futures::{
    StreamExt,
    TryStreamExt,
};
use kube::Api;
use kube::runtime::watcher;
use kubemirror_core::errors::*;
use kubemirror_core::k8s::KubeResourceExt;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::*;

use super::{
    EventHandler,
    ObjStream,
    ObjWatcher,
};
use crate::cache::ResourceCache;
use crate::errors::TransformError;
use crate::resource::TypedRecord;

/// Bridges one typed `kube::Api<K>` watch stream to a `ResourceCache<R>`: every applied object
/// is transformed and upserted, every delete is resolved by namespaced name. Transform failures
/// are local to this boundary -- they're logged and the object is skipped, never propagated
/// to the caller.
struct TypedHandler<K, R: TypedRecord> {
    cache: std::sync::Arc<ResourceCache<R>>,
    transform: fn(&K) -> Result<R, TransformError>,
}

#[async_trait]
impl<K, R> EventHandler<K> for TypedHandler<K, R>
where
    K: Send + Sync + 'static,
    R: TypedRecord,
{
    async fn applied(&mut self, obj: K, _ts: i64) -> EmptyResult {
        match (self.transform)(&obj) {
            Ok(record) => self.cache.apply(record),
            Err(err) => debug!("dropping object that failed to transform: {err}"),
        }
        Ok(())
    }

    async fn deleted(&mut self, ns_name: &str, _ts: i64) -> EmptyResult {
        self.cache.remove_by_name(ns_name);
        Ok(())
    }
}

/// Builds the watcher for one built-in kind. `K` is the k8s-openapi wire type (`corev1::Pod`,
/// `appsv1::Deployment`, ...), `R` the typed record it's transformed into.
pub fn new_typed_watcher<K, R>(
    api: Api<K>,
    cache: std::sync::Arc<ResourceCache<R>>,
    transform: fn(&K) -> Result<R, TransformError>,
    ready_tx: mpsc::Sender<bool>,
) -> ObjWatcher<K>
where
    K: kube::Resource + Clone + DeserializeOwned + std::fmt::Debug + KubeResourceExt + Send + Sync + 'static,
    K::DynamicType: Default,
    R: TypedRecord,
{
    let stream: ObjStream<K> = watcher::watcher(api, watcher::Config::default()).map_err(|e| e.into()).boxed();
    ObjWatcher::new(Box::new(TypedHandler { cache, transform }), stream, ready_tx)
}
