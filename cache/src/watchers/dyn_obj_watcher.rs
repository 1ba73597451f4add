use std::sync::Arc;

use async_trait::async_trait;
use futures::{
    StreamExt,
    TryStreamExt,
};
use kube::api::DynamicObject;
use kube::discovery::ApiCapabilities;
use kube::runtime::watcher;
use kube::Api;
use kubemirror_core::errors::*;
use tokio::sync::mpsc;
use tracing::*;

use super::{
    EventHandler,
    ObjStream,
    ObjWatcher,
};
use crate::cache::ResourceCache;
use crate::resource::{
    transform_custom,
    CustomRecord,
    PrinterColumnSpec,
};

/// Custom resources never get a generated Rust type, so the handler stays on `DynamicObject` and
/// runs it through `transform_custom` with the printer-column set declared on the resource
/// definition.
struct DynObjHandler {
    cache: Arc<ResourceCache<CustomRecord>>,
    columns: Arc<Vec<PrinterColumnSpec>>,
}

#[async_trait]
impl EventHandler<DynamicObject> for DynObjHandler {
    async fn applied(&mut self, obj: DynamicObject, _ts: i64) -> EmptyResult {
        match transform_custom(&obj, &self.columns) {
            Ok(record) => self.cache.apply(record),
            Err(err) => debug!("dropping custom object that failed to transform: {err}"),
        }
        Ok(())
    }

    async fn deleted(&mut self, ns_name: &str, _ts: i64) -> EmptyResult {
        self.cache.remove_by_name(ns_name);
        Ok(())
    }
}

/// `Api::all_with` watches every namespace (or the whole cluster, for cluster-scoped kinds) --
/// `kube` picks the right URL shape from the `ApiResource`'s own scope metadata, so there's no
/// need to branch on `ApiCapabilities` here.
pub fn new_dyn_obj_watcher(
    client: kube::Client,
    ar: &kube::discovery::ApiResource,
    _caps: &ApiCapabilities,
    cache: Arc<ResourceCache<CustomRecord>>,
    columns: Arc<Vec<PrinterColumnSpec>>,
    ready_tx: mpsc::Sender<bool>,
) -> ObjWatcher<DynamicObject> {
    let api: Api<DynamicObject> = Api::all_with(client, ar);
    let stream: ObjStream<DynamicObject> = watcher::watcher(api, watcher::Config::default())
        .map_err(|e| e.into())
        .boxed();
    ObjWatcher::new(Box::new(DynObjHandler { cache, columns }), stream, ready_tx)
}
