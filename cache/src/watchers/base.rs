use std::pin::Pin;

use async_trait::async_trait;
use clockabilly::{
    Clockable,
    UtcClock,
};
use futures::{
    Stream,
    StreamExt,
};
use kube::runtime::watcher;
use kubemirror_core::errors::*;
use kubemirror_core::k8s::KubeResourceExt;
use tokio::sync::mpsc;
use tracing::*;

pub type ObjStream<K> = Pin<Box<dyn Stream<Item = anyhow::Result<watcher::Event<K>>> + Send>>;

/// What a watcher does with the objects it sees. Kept narrow and concrete (one impl per kind,
/// or one generic impl parameterized by a transform function) rather than a general pub/sub
/// bus, since nothing downstream needs more than "applied" and "deleted".
#[async_trait]
pub trait EventHandler<K>: Send {
    async fn applied(&mut self, obj: K, ts: i64) -> EmptyResult;
    async fn deleted(&mut self, ns_name: &str, ts: i64) -> EmptyResult;
}

/// Drives a `kube::runtime::watcher` stream for one kind and one context, translating the
/// watcher's `Init`/`InitApply`/`InitDone`/`Apply`/`Delete` protocol into `EventHandler` calls.
/// `InitDone` is reported exactly once on `ready_tx`, which is how callers learn the initial
/// list/watch settled and the kind transitioned out of `Syncing`.
pub struct ObjWatcher<K> {
    handler: Box<dyn EventHandler<K> + Send>,
    stream: ObjStream<K>,
    clock: Box<dyn Clockable + Send>,
    ready_tx: mpsc::Sender<bool>,
}

impl<K> ObjWatcher<K>
where
    K: KubeResourceExt + Send + 'static,
{
    pub fn new(handler: Box<dyn EventHandler<K> + Send>, stream: ObjStream<K>, ready_tx: mpsc::Sender<bool>) -> Self {
        ObjWatcher { handler, stream, clock: Box::new(UtcClock), ready_tx }
    }

    pub fn new_from_parts(
        handler: Box<dyn EventHandler<K> + Send>,
        stream: ObjStream<K>,
        clock: Box<dyn Clockable + Send>,
        ready_tx: mpsc::Sender<bool>,
    ) -> Self {
        ObjWatcher { handler, stream, clock, ready_tx }
    }

    pub async fn start(mut self) {
        let mut sent_ready = false;
        while let Some(res) = self.stream.next().await {
            match res {
                Ok(watcher::Event::Init) => {},

                Ok(watcher::Event::InitApply(obj)) | Ok(watcher::Event::Apply(obj)) => {
                    let ts = self.clock.now_ts();
                    if let Err(err) = self.handler.applied(obj, ts).await {
                        error!("could not handle applied event: {err}");
                    }
                },

                Ok(watcher::Event::InitDone) => {
                    if !sent_ready {
                        sent_ready = true;
                        let _ = self.ready_tx.send(true).await;
                    }
                },

                Ok(watcher::Event::Delete(obj)) => {
                    let ts = self.clock.now_ts();
                    let ns_name = obj.namespaced_name();
                    if let Err(err) = self.handler.deleted(&ns_name, ts).await {
                        error!("could not handle deleted event: {err}");
                    }
                },

                Err(err) => warn!("watch stream error, relying on the watcher's own backoff/relist: {err}"),
            }
        }
    }
}
