use std::collections::HashMap;
use std::sync::{
    Arc,
    RwLock,
};
use std::time::Duration;

use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::autoscaling::v2 as autoscalingv2;
use k8s_openapi::api::batch::v1 as batchv1;
use k8s_openapi::api::networking::v1 as networkingv1;
use kube::api::ListParams;
use kube::Api;
use kubemirror_core::k8s::{
    ApiSet,
    GVK,
};
use kubemirror_core::prelude::*;
use tokio::sync::{
    mpsc,
    Mutex,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::cache::ResourceCache;
use crate::config::CacheConfig;
use crate::context::ContextCaches;
use crate::errors::{
    AuthenticationError,
    QueryError,
    SyncError,
};
use crate::external::ResourceDefinition;
use crate::progress::{
    ProgressPhase,
    ProgressSender,
};
use crate::resource::*;
use crate::stats::{
    new_snapshot,
    snapshot_to_vec,
    ResourceStats,
    StatsConsumer,
    StatsHandle,
    StatsOp,
    StatsSnapshot,
};
use crate::watchers::{
    new_dyn_obj_watcher,
    new_typed_watcher,
};

#[derive(Clone, Debug)]
pub enum InformerState {
    NotStarted,
    Syncing,
    Synced,
    FailedToSync(SyncError),
}

#[derive(Clone, Debug)]
struct KindEntry {
    state: InformerState,
    tier: u8,
}

type StatusMap = Arc<RwLock<HashMap<GVK, KindEntry>>>;

fn register_stats_hooks<R: TypedRecord>(cache: &mut ResourceCache<R>, stats: StatsHandle, gvk: GVK) {
    let (g, s) = (gvk.clone(), stats.clone());
    cache.on_add(move |_| s.record(g.clone(), StatsOp::Added, 0));
    let (g, s) = (gvk.clone(), stats.clone());
    cache.on_update(move |_, _| s.record(g.clone(), StatsOp::Updated, 0));
    let (g, s) = (gvk, stats);
    cache.on_delete(move |_| s.record(g.clone(), StatsOp::Deleted, 0));
}

fn register_pod_index_hooks(cache: &mut ResourceCache<PodRecord>, index: Arc<crate::index::ClusterIndex>) {
    let idx = index.clone();
    cache.on_add(move |p| idx.index_pod(p));
    let idx = index.clone();
    cache.on_update(move |old, new| idx.reindex_pod(old, new));
    cache.on_delete(move |p| index.deindex_pod(p));
}

fn register_job_index_hooks(cache: &mut ResourceCache<JobRecord>, index: Arc<crate::index::ClusterIndex>) {
    let idx = index.clone();
    cache.on_add(move |j| idx.index_job(j));
    let idx = index.clone();
    cache.on_update(move |old, new| idx.reindex_job(old, new));
    cache.on_delete(move |j| index.deindex_job(j));
}

fn register_replica_set_index_hooks(cache: &mut ResourceCache<ReplicaSetRecord>, index: Arc<crate::index::ClusterIndex>) {
    let idx = index.clone();
    cache.on_add(move |r| idx.index_replica_set(r));
    let idx = index.clone();
    cache.on_update(move |old, new| idx.reindex_replica_set(old, new));
    cache.on_delete(move |r| index.deindex_replica_set(r));
}

/// A narrower follow-up probe: issue a short, bounded `list` directly against the kind's API to
/// turn a bare sync failure into a cause the UI can show next to the kind's name (RBAC
/// rejection, network failure, or a genuine timeout).
async fn classify_list_failure<K>(api: &Api<K>) -> SyncError
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
    K::DynamicType: Default,
{
    match tokio::time::timeout(Duration::from_secs(5), api.list(&ListParams::default().limit(1))).await {
        Ok(Ok(_)) => SyncError::Timeout,
        Ok(Err(kube::Error::Api(resp))) if resp.code == 403 => {
            SyncError::ApiError(format!("permission denied: {}", resp.message))
        },
        Ok(Err(err)) => SyncError::ApiError(err.to_string()),
        Err(_) => SyncError::Timeout,
    }
}

fn set_state(status: &StatusMap, gvk: &GVK, state: InformerState) {
    if let Ok(mut map) = status.write() {
        if let Some(entry) = map.get_mut(gvk) {
            entry.state = state;
        } else {
            map.insert(gvk.clone(), KindEntry { state, tier: 0 });
        }
    }
}

/// Drives one kind's informer: opens the watch, reports sync state once the initial list/watch
/// settles (or the per-kind timeout elapses), then periodically restarts the stream every
/// `resync_period` so the cache self-heals from any missed events.
#[allow(clippy::too_many_arguments)]
async fn run_typed_kind<K, R>(
    gvk: GVK,
    api: Api<K>,
    cache: Arc<ResourceCache<R>>,
    transform: fn(&K) -> Result<R, crate::errors::TransformError>,
    status: StatusMap,
    stats: StatsHandle,
    sync_timeout: Duration,
    resync_period: Duration,
    cancel: CancellationToken,
) where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug + kubemirror_core::k8s::KubeResourceExt + Send + Sync + 'static,
    K::DynamicType: Default,
    R: TypedRecord,
{
    let mut first_pass = true;
    loop {
        let (ready_tx, mut ready_rx) = mpsc::channel(1);
        let watcher = new_typed_watcher(api.clone(), cache.clone(), transform, ready_tx);
        let watch_task = tokio::spawn(watcher.start());

        if first_pass {
            first_pass = false;
            let outcome = tokio::time::timeout(sync_timeout, ready_rx.recv()).await;
            match outcome {
                Ok(Some(true)) => {
                    set_state(&status, &gvk, InformerState::Synced);
                    stats.mark_synced(gvk.clone());
                },
                _ => set_state(&status, &gvk, InformerState::FailedToSync(classify_list_failure(&api).await)),
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                watch_task.abort();
                break;
            },
            _ = tokio::time::sleep(resync_period) => {
                watch_task.abort();
            },
        }
    }
}

/// Same protocol as `run_typed_kind` but for a dynamic (custom-resource) GVK discovered at
/// runtime through `ApiSet`.
#[allow(clippy::too_many_arguments)]
async fn run_custom_kind(
    def: ResourceDefinition,
    client: kube::Client,
    apiset: Arc<Mutex<ApiSet>>,
    cache: Arc<ResourceCache<CustomRecord>>,
    stats: StatsHandle,
    status: StatusMap,
    sync_timeout: Duration,
    resync_period: Duration,
    cancel: CancellationToken,
) {
    let gvk = def.gvk();
    let columns = Arc::new(def.printer_columns.clone());

    let mut first_pass = true;
    loop {
        let meta = apiset.lock().await.resource_meta_for(&gvk).await;

        let (watch_task, ready_rx, discovery_err) = match meta {
            Ok((ar, caps)) => {
                let (ready_tx, ready_rx) = mpsc::channel(1);
                let watcher = new_dyn_obj_watcher(client.clone(), &ar, &caps, cache.clone(), columns.clone(), ready_tx);
                (Some(tokio::spawn(watcher.start())), Some(ready_rx), None)
            },
            Err(err) => (None, None, Some(err)),
        };

        if first_pass {
            first_pass = false;
            let new_state = match (discovery_err, ready_rx) {
                (Some(err), _) => InformerState::FailedToSync(SyncError::ApiError(err.to_string())),
                (None, Some(mut ready_rx)) => match tokio::time::timeout(sync_timeout, ready_rx.recv()).await {
                    Ok(Some(true)) => {
                        stats.mark_synced(gvk.clone());
                        InformerState::Synced
                    },
                    _ => InformerState::FailedToSync(SyncError::Timeout),
                },
                (None, None) => InformerState::FailedToSync(SyncError::NotServed),
            };
            set_state(&status, &gvk, new_state);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                if let Some(t) = watch_task { t.abort(); }
                break;
            },
            _ = tokio::time::sleep(resync_period) => {
                if let Some(t) = watch_task { t.abort(); }
            },
        }
    }
}

/// Owns every informer task for one loaded context: opens watches tier-by-tier, tracks each
/// kind's sync state, maintains the secondary indexes and stats pipeline via hooks registered
/// before any watch starts, and tears everything down together on `close`.
pub struct InformerManager {
    pub caches: Arc<ContextCaches>,
    client: kube::Client,
    apiset: Arc<Mutex<ApiSet>>,
    definitions: HashMap<GVK, ResourceDefinition>,
    status: StatusMap,
    stats: StatsHandle,
    stats_snapshot: StatsSnapshot,
    config: CacheConfig,
    cancel: CancellationToken,
    tasks: Mutex<JoinSet<()>>,
    closed: std::sync::atomic::AtomicBool,
}

impl InformerManager {
    /// Runs the staged startup protocol: auth probe, open every tier>=1 informer, start the
    /// stats consumer, then wait (bounded by `critical_sync_timeout`) for tier-1 kinds only.
    /// Tier-2 kinds keep syncing in the background under their own per-kind timeout.
    pub async fn start(
        client: kube::Client,
        config: CacheConfig,
        definitions: Vec<ResourceDefinition>,
        progress: &ProgressSender,
        context_name: &str,
    ) -> Result<Self, AuthenticationError> {
        progress.send(context_name, "connecting to cluster", ProgressPhase::Connecting);
        tokio::time::timeout(config.auth_probe_timeout, client.apiserver_version())
            .await
            .map_err(|_| AuthenticationError::ProbeTimedOut)?
            .map_err(|err| AuthenticationError::Rejected(err.to_string()))?;

        let mut caches = ContextCaches::new();
        let (stats, stats_consumer) = StatsConsumer::new(config.stats_channel_capacity);
        let stats_snapshot = new_snapshot();
        let cancel = CancellationToken::new();

        let status: StatusMap = Arc::new(RwLock::new(HashMap::new()));
        for kind in ResourceKind::BUILTIN {
            let state = if kind.tier() == 0 { InformerState::NotStarted } else { InformerState::Syncing };
            status.write().unwrap().insert(kind.gvk(), KindEntry { state, tier: kind.tier() });
        }

        // Hooks must exist before any watch opens; registering them here is safe because every
        // `Arc<ResourceCache<_>>` is still uniquely owned at this point.
        register_pod_index_hooks(Arc::get_mut(&mut caches.pods).expect("fresh cache"), caches.index.clone());
        register_stats_hooks(Arc::get_mut(&mut caches.pods).expect("fresh cache"), stats.clone(), ResourceKind::Pod.gvk());

        register_job_index_hooks(Arc::get_mut(&mut caches.jobs).expect("fresh cache"), caches.index.clone());
        register_stats_hooks(Arc::get_mut(&mut caches.jobs).expect("fresh cache"), stats.clone(), ResourceKind::Job.gvk());

        register_replica_set_index_hooks(Arc::get_mut(&mut caches.replica_sets).expect("fresh cache"), caches.index.clone());
        register_stats_hooks(Arc::get_mut(&mut caches.replica_sets).expect("fresh cache"), stats.clone(), ResourceKind::ReplicaSet.gvk());

        register_stats_hooks(Arc::get_mut(&mut caches.deployments).expect("fresh cache"), stats.clone(), ResourceKind::Deployment.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.stateful_sets).expect("fresh cache"), stats.clone(), ResourceKind::StatefulSet.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.daemon_sets).expect("fresh cache"), stats.clone(), ResourceKind::DaemonSet.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.services).expect("fresh cache"), stats.clone(), ResourceKind::Service.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.config_maps).expect("fresh cache"), stats.clone(), ResourceKind::ConfigMap.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.secrets).expect("fresh cache"), stats.clone(), ResourceKind::Secret.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.namespaces).expect("fresh cache"), stats.clone(), ResourceKind::Namespace.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.cron_jobs).expect("fresh cache"), stats.clone(), ResourceKind::CronJob.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.nodes).expect("fresh cache"), stats.clone(), ResourceKind::Node.gvk());
        register_stats_hooks(
            Arc::get_mut(&mut caches.persistent_volume_claims).expect("fresh cache"),
            stats.clone(),
            ResourceKind::PersistentVolumeClaim.gvk(),
        );
        register_stats_hooks(Arc::get_mut(&mut caches.ingresses).expect("fresh cache"), stats.clone(), ResourceKind::Ingress.gvk());
        register_stats_hooks(Arc::get_mut(&mut caches.endpoints).expect("fresh cache"), stats.clone(), ResourceKind::Endpoints.gvk());
        register_stats_hooks(
            Arc::get_mut(&mut caches.horizontal_pod_autoscalers).expect("fresh cache"),
            stats.clone(),
            ResourceKind::HorizontalPodAutoscaler.gvk(),
        );

        let caches = Arc::new(caches);
        let mut tasks = JoinSet::new();
        let consumer_snapshot = stats_snapshot.clone();
        tasks.spawn(async move {
            stats_consumer.run(consumer_snapshot).await;
        });

        let definitions: HashMap<GVK, ResourceDefinition> = definitions.into_iter().map(|d| (d.gvk(), d)).collect();

        let manager = InformerManager {
            caches,
            client: client.clone(),
            apiset: Arc::new(Mutex::new(ApiSet::new(client))),
            definitions,
            status,
            stats,
            stats_snapshot,
            config,
            cancel,
            tasks: Mutex::new(tasks),
            closed: std::sync::atomic::AtomicBool::new(false),
        };

        progress.send(context_name, "starting critical-tier informers", ProgressPhase::SyncingCore);
        manager.spawn_tier(1).await;
        manager.spawn_tier(2).await;

        let wait = tokio::time::timeout(manager.config.critical_sync_timeout, manager.wait_for_tier(1)).await;
        if wait.is_err() {
            warn!("one or more critical-tier kinds did not finish syncing within the configured timeout");
        }

        progress.send(context_name, "ready", ProgressPhase::Complete);
        Ok(manager)
    }

    async fn wait_for_tier(&self, tier: u8) {
        loop {
            let pending = {
                let map = self.status.read().unwrap();
                map.values().filter(|e| e.tier == tier).any(|e| matches!(e.state, InformerState::Syncing))
            };
            if !pending {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    async fn spawn_tier(&self, tier: u8) {
        macro_rules! spawn {
            ($kind:expr, $api_ty:ty, $field:ident, $transform:path) => {{
                if $kind.tier() == tier {
                    let api: Api<$api_ty> = Api::all(self.client.clone());
                    let gvk = $kind.gvk();
                    let cache = self.caches.$field.clone();
                    let status = self.status.clone();
                    let sync_timeout = if tier == 1 { self.config.critical_sync_timeout } else { self.config.per_kind_sync_timeout };
                    let resync = self.config.resync_period;
                    let cancel = self.cancel.clone();
                    let stats = self.stats.clone();
                    self.tasks
                        .lock()
                        .await
                        .spawn(run_typed_kind(gvk, api, cache, $transform, status, stats, sync_timeout, resync, cancel));
                }
            }};
        }

        spawn!(ResourceKind::Pod, corev1::Pod, pods, crate::resource::transform_pod);
        spawn!(ResourceKind::Deployment, appsv1::Deployment, deployments, crate::resource::transform_deployment);
        spawn!(ResourceKind::ReplicaSet, appsv1::ReplicaSet, replica_sets, crate::resource::transform_replica_set);
        spawn!(ResourceKind::StatefulSet, appsv1::StatefulSet, stateful_sets, crate::resource::transform_stateful_set);
        spawn!(ResourceKind::DaemonSet, appsv1::DaemonSet, daemon_sets, crate::resource::transform_daemon_set);
        spawn!(ResourceKind::Service, corev1::Service, services, crate::resource::transform_service);
        spawn!(ResourceKind::ConfigMap, corev1::ConfigMap, config_maps, crate::resource::transform_config_map);
        spawn!(ResourceKind::Secret, corev1::Secret, secrets, crate::resource::transform_secret);
        spawn!(ResourceKind::Namespace, corev1::Namespace, namespaces, crate::resource::transform_namespace);
        spawn!(ResourceKind::Job, batchv1::Job, jobs, crate::resource::transform_job);
        spawn!(ResourceKind::CronJob, batchv1::CronJob, cron_jobs, crate::resource::transform_cron_job);
        spawn!(ResourceKind::Node, corev1::Node, nodes, crate::resource::transform_node);
        spawn!(
            ResourceKind::PersistentVolumeClaim,
            corev1::PersistentVolumeClaim,
            persistent_volume_claims,
            crate::resource::transform_pvc
        );
        spawn!(ResourceKind::Endpoints, corev1::Endpoints, endpoints, crate::resource::transform_endpoints);
        spawn!(
            ResourceKind::HorizontalPodAutoscaler,
            autoscalingv2::HorizontalPodAutoscaler,
            horizontal_pod_autoscalers,
            crate::resource::transform_hpa
        );
        // Ingress is tier 0 (on-demand); it's deliberately absent here and started only via
        // `ensure_informer`. Referencing the type keeps the import from looking unused.
        let _: Option<networkingv1::Ingress> = None;
    }

    /// Idempotent: a second call on an already-`Syncing`/`Synced` kind is a no-op, so calling
    /// this twice is indistinguishable from calling it once.
    pub async fn ensure_informer(&self, kind: &ResourceKind) {
        let gvk = kind.gvk();
        {
            let mut map = self.status.write().unwrap();
            let entry = map.entry(gvk.clone()).or_insert(KindEntry { state: InformerState::NotStarted, tier: 0 });
            if !matches!(entry.state, InformerState::NotStarted) {
                return;
            }
            entry.state = InformerState::Syncing;
        }

        match kind {
            ResourceKind::Ingress => {
                let api: Api<networkingv1::Ingress> = Api::all(self.client.clone());
                self.tasks.lock().await.spawn(run_typed_kind(
                    gvk,
                    api,
                    self.caches.ingresses.clone(),
                    crate::resource::transform_ingress,
                    self.status.clone(),
                    self.stats.clone(),
                    self.config.per_kind_sync_timeout,
                    self.config.resync_period,
                    self.cancel.clone(),
                ));
            },
            ResourceKind::Custom(_) => {
                let Some(def) = self.definitions.get(&gvk).cloned() else {
                    set_state(&self.status, &gvk, InformerState::FailedToSync(SyncError::NotServed));
                    return;
                };

                // Hooks must be attached while the cache is still uniquely owned, so build it
                // here rather than through `ContextCaches::ensure_custom_cache`.
                let cache = {
                    let mut custom = self.caches.custom.write().expect("custom cache table lock poisoned");
                    match custom.entry(gvk.clone()) {
                        std::collections::hash_map::Entry::Occupied(e) => e.get().clone(),
                        std::collections::hash_map::Entry::Vacant(e) => {
                            let mut fresh = ResourceCache::new();
                            register_stats_hooks(&mut fresh, self.stats.clone(), gvk.clone());
                            e.insert(Arc::new(fresh)).clone()
                        },
                    }
                };

                self.tasks.lock().await.spawn(run_custom_kind(
                    def,
                    self.client.clone(),
                    self.apiset.clone(),
                    cache,
                    self.stats.clone(),
                    self.status.clone(),
                    self.config.per_kind_sync_timeout,
                    self.config.resync_period,
                    self.cancel.clone(),
                ));
            },
            _ => {},
        }
    }

    /// Whether this context can serve `kind` at all: every built-in is always known, a `Custom`
    /// kind is known only once a matching `ResourceDefinition` was supplied at load time.
    pub fn knows_kind(&self, kind: &ResourceKind) -> bool {
        match kind {
            ResourceKind::Custom(gvk) => self.definitions.contains_key(gvk),
            _ => true,
        }
    }

    pub fn informer_synced(&self, kind: &ResourceKind) -> bool {
        matches!(self.state_of(kind), Some(InformerState::Synced))
    }

    pub fn typed_informers_ready(&self) -> bool {
        let map = self.status.read().unwrap();
        ResourceKind::BUILTIN
            .iter()
            .filter(|k| k.tier() == 1)
            .all(|k| matches!(map.get(&k.gvk()), Some(KindEntry { state: InformerState::Synced, .. })))
    }

    pub fn typed_informers_sync_error(&self) -> Option<SyncError> {
        let map = self.status.read().unwrap();
        ResourceKind::BUILTIN.iter().find_map(|k| match map.get(&k.gvk()) {
            Some(KindEntry { state: InformerState::FailedToSync(err), .. }) => Some(err.clone()),
            _ => None,
        })
    }

    pub fn sync_error(&self, kind: &ResourceKind) -> Option<SyncError> {
        match self.state_of(kind) {
            Some(InformerState::FailedToSync(err)) => Some(err),
            _ => None,
        }
    }

    fn state_of(&self, kind: &ResourceKind) -> Option<InformerState> {
        self.status.read().unwrap().get(&kind.gvk()).map(|e| e.state.clone())
    }

    /// `Err(QueryError::InformerNotReady)` if the kind can't currently answer a query: not
    /// started (tier 0, never ensured), still syncing, or permanently failed. `Err(ShutdownInProgress)`
    /// takes priority once `close()` has been called.
    pub fn require_ready(&self, kind: &ResourceKind) -> Result<(), QueryError> {
        if self.closed.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(QueryError::ShutdownInProgress);
        }
        match self.state_of(kind) {
            Some(InformerState::Synced) => Ok(()),
            Some(InformerState::FailedToSync(cause)) => Err(QueryError::InformerNotReady { kind: kind.gvk(), cause }),
            Some(InformerState::Syncing) | Some(InformerState::NotStarted) | None => {
                Err(QueryError::InformerNotReady { kind: kind.gvk(), cause: SyncError::Timeout })
            },
        }
    }

    /// `adds`/`updates`/`deletes`/`synced` come from the (lossy, best-effort) delta channel, but
    /// `approx_count`/`approx_bytes` are refreshed here by polling the live primary cache size,
    /// so a dropped delta never lets the reported count drift from reality.
    pub fn stats(&self) -> Vec<(GVK, ResourceStats)> {
        let mut stats = snapshot_to_vec(&self.stats_snapshot);
        for (gvk, entry) in stats.iter_mut() {
            let count = ResourceKind::BUILTIN
                .iter()
                .find(|k| &k.gvk() == gvk)
                .and_then(|k| self.caches.len_builtin(k))
                .or_else(|| self.caches.len_custom(gvk));
            if let Some(count) = count {
                entry.approx_count = count as i64;
                entry.approx_bytes = count as i64 * 1024;
            }
        }
        stats
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Idempotent: triggers the root cancellation token and aborts every task. Safe to call
    /// concurrently with queries, and safe to call more than once.
    pub async fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        self.cancel.cancel();
        let mut tasks = self.tasks.lock().await;
        tasks.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::Method::GET;
    use kubemirror_testutils::make_fake_apiserver;
    use rstest::*;
    use serde_json::json;

    use super::*;

    fn empty_list(api_version: &str) -> serde_json::Value {
        json!({
            "kind": "List",
            "apiVersion": api_version,
            "items": [],
            "metadata": {"resourceVersion": "1"},
        })
    }

    fn version_info() -> serde_json::Value {
        json!({
            "major": "1",
            "minor": "30",
            "gitVersion": "v1.30.0",
            "gitCommit": "deadbeef",
            "gitTreeState": "clean",
            "buildDate": "2024-01-01T00:00:00Z",
            "goVersion": "go1.22",
            "compiler": "gc",
            "platform": "linux/amd64",
        })
    }

    /// Every path a tier-1 informer lists against, paired with the `apiVersion` its empty list
    /// response should carry.
    const TIER1_LIST_PATHS: &[(&str, &str)] = &[
        ("/api/v1/pods", "v1"),
        ("/apis/apps/v1/deployments", "apps/v1"),
        ("/apis/apps/v1/replicasets", "apps/v1"),
        ("/api/v1/services", "v1"),
        ("/api/v1/configmaps", "v1"),
        ("/api/v1/secrets", "v1"),
        ("/api/v1/namespaces", "v1"),
        ("/api/v1/nodes", "v1"),
    ];

    fn fast_config() -> CacheConfig {
        CacheConfig {
            resync_period: Duration::from_secs(300),
            critical_sync_timeout: Duration::from_secs(5),
            per_kind_sync_timeout: Duration::from_secs(5),
            auth_probe_timeout: Duration::from_secs(5),
            ..CacheConfig::default()
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_start_reaches_ready_with_empty_clusters() {
        let (mut fake_apiserver, client) = make_fake_apiserver();

        fake_apiserver.handle(|when, then| {
            when.path("/version").method(GET);
            then.json_body(version_info());
        });
        for &(path, api_version) in TIER1_LIST_PATHS {
            fake_apiserver.handle(move |when, then| {
                when.path(path).method(GET);
                then.json_body(empty_list(api_version));
            });
        }
        fake_apiserver.build();

        let manager = InformerManager::start(client, fast_config(), vec![], &ProgressSender::none(), "test-ctx")
            .await
            .expect("auth probe and tier-1 fan-out should both succeed");

        assert!(manager.typed_informers_ready(), "every tier-1 kind listed successfully and should be Synced");
        assert!(manager.typed_informers_sync_error().is_none());
        assert_eq!(manager.caches.pods.list().len(), 0);

        manager.close().await;
        manager.close().await; // idempotent
    }

    #[rstest]
    #[tokio::test]
    async fn test_auth_probe_failure_fails_context_load() {
        let (mut fake_apiserver, client) = make_fake_apiserver();
        fake_apiserver.handle(|when, then| {
            when.path("/version").method(GET);
            then.status(401).json_body(json!({"kind": "Status", "status": "Failure", "reason": "Unauthorized", "code": 401}));
        });
        fake_apiserver.build();

        let result = InformerManager::start(client, fast_config(), vec![], &ProgressSender::none(), "test-ctx").await;
        assert!(matches!(result, Err(AuthenticationError::Rejected(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_ensure_informer_twice_is_idempotent() {
        let (mut fake_apiserver, client) = make_fake_apiserver();
        fake_apiserver.handle(|when, then| {
            when.path("/version").method(GET);
            then.json_body(version_info());
        });
        for &(path, api_version) in TIER1_LIST_PATHS {
            fake_apiserver.handle(move |when, then| {
                when.path(path).method(GET);
                then.json_body(empty_list(api_version));
            });
        }
        fake_apiserver.handle(|when, then| {
            when.path("/apis/networking.k8s.io/v1/ingresses").method(GET);
            then.json_body(empty_list("networking.k8s.io/v1"));
        });
        fake_apiserver.build();

        let manager = InformerManager::start(client, fast_config(), vec![], &ProgressSender::none(), "test-ctx")
            .await
            .unwrap();

        assert!(!manager.informer_synced(&ResourceKind::Ingress), "ingress is tier 0, never started at load");

        manager.ensure_informer(&ResourceKind::Ingress).await;
        manager.ensure_informer(&ResourceKind::Ingress).await;

        tokio::time::timeout(Duration::from_secs(5), async {
            while !manager.informer_synced(&ResourceKind::Ingress) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("ingress informer should sync once ensured");

        manager.close().await;
    }

    #[rstest]
    #[tokio::test]
    async fn test_require_ready_reflects_state_transitions() {
        let (mut fake_apiserver, client) = make_fake_apiserver();
        fake_apiserver.handle(|when, then| {
            when.path("/version").method(GET);
            then.json_body(version_info());
        });
        for &(path, api_version) in TIER1_LIST_PATHS {
            if path == "/api/v1/pods" {
                continue;
            }
            fake_apiserver.handle(move |when, then| {
                when.path(path).method(GET);
                then.json_body(empty_list(api_version));
            });
        }
        // Pods fail every list attempt with a permission error so its informer cannot sync.
        fake_apiserver.handle(|when, then| {
            when.path("/api/v1/pods").method(GET);
            then.status(403).json_body(json!({"kind": "Status", "status": "Failure", "reason": "Forbidden", "code": 403}));
        });
        fake_apiserver.build();

        let manager = InformerManager::start(client, fast_config(), vec![], &ProgressSender::none(), "test-ctx")
            .await
            .unwrap();

        assert!(matches!(manager.require_ready(&ResourceKind::Pod), Err(QueryError::InformerNotReady { .. })));
        let cause = manager.sync_error(&ResourceKind::Pod).expect("pod informer should have recorded a cause");
        assert!(matches!(cause, SyncError::ApiError(_)), "403 should classify as an API/permission error, not a bare timeout");

        assert!(manager.require_ready(&ResourceKind::Node).is_ok(), "node listed successfully and should be ready");

        manager.close().await;
        assert!(matches!(manager.require_ready(&ResourceKind::Node), Err(QueryError::ShutdownInProgress)));
    }
}
