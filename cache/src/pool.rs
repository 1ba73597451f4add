use std::collections::{
    HashMap,
    VecDeque,
};
use std::sync::{
    Arc,
    Mutex as StdMutex,
};

use clockabilly::{
    Clockable,
    UtcClock,
};
use tokio::sync::Notify;
use tracing::*;

use crate::config::CacheConfig;
use crate::errors::AuthenticationError;
use crate::external::{
    ClientFactory,
    KubeconfigSource,
    ResourceDefinitionSource,
};
use crate::manager::InformerManager;
use crate::progress::ProgressSender;
use crate::query::{
    ClusterRepository,
    Repository,
};

/// Where a pool entry currently stands. `Failed` carries the stringified cause rather
/// than the original error, since `AuthenticationError` isn't `Clone`-able across the
/// single-flight fan-out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContextStatus {
    NotLoaded,
    Loading,
    Loaded,
    Failed(String),
}

struct PoolEntry {
    status: ContextStatus,
    repository: Option<Arc<ClusterRepository>>,
    #[allow(dead_code)]
    loaded_at: Option<i64>,
}

impl Default for PoolEntry {
    fn default() -> Self {
        PoolEntry { status: ContextStatus::NotLoaded, repository: None, loaded_at: None }
    }
}

/// One row of `list_contexts()`'s output: everything the UI needs to render a context picker.
#[derive(Clone, Debug)]
pub struct ContextInfo {
    pub name: String,
    pub cluster: String,
    pub user: String,
    pub status: ContextStatus,
    pub active: bool,
}

/// Holds every loaded context's `InformerManager`, enforcing `max_contexts` LRU eviction and
/// coalescing concurrent loads of the same context name into one actual load. Delegates
/// queries to the active context's repository rather than implementing `Repository` itself --
/// `active()` hands out the trait object, the pool's own surface is context lifecycle only.
pub struct ContextPool {
    kubeconfig: Arc<dyn KubeconfigSource>,
    clients: Arc<dyn ClientFactory>,
    definitions: Arc<dyn ResourceDefinitionSource>,
    config: CacheConfig,
    entries: StdMutex<HashMap<String, PoolEntry>>,
    lru: StdMutex<VecDeque<String>>,
    active: StdMutex<Option<String>>,
    inflight: StdMutex<HashMap<String, Arc<Notify>>>,
}

impl ContextPool {
    pub fn new(
        kubeconfig: Arc<dyn KubeconfigSource>,
        clients: Arc<dyn ClientFactory>,
        definitions: Arc<dyn ResourceDefinitionSource>,
        config: CacheConfig,
    ) -> Self {
        ContextPool {
            kubeconfig,
            clients,
            definitions,
            config,
            entries: StdMutex::new(HashMap::new()),
            lru: StdMutex::new(VecDeque::new()),
            active: StdMutex::new(None),
            inflight: StdMutex::new(HashMap::new()),
        }
    }

    pub fn active_name(&self) -> Option<String> {
        self.active.lock().expect("pool lock poisoned").clone()
    }

    /// The active context's repository, as a trait object -- the only way callers outside this
    /// crate should reach a loaded context's data.
    pub fn active(&self) -> Option<Arc<dyn Repository>> {
        let name = self.active_name()?;
        let entries = self.entries.lock().expect("pool lock poisoned");
        let repo = entries.get(&name)?.repository.clone()?;
        Some(repo as Arc<dyn Repository>)
    }

    fn status_of(&self, name: &str) -> ContextStatus {
        self.entries.lock().expect("pool lock poisoned").get(name).map(|e| e.status.clone()).unwrap_or(ContextStatus::NotLoaded)
    }

    fn loaded_repository(&self, name: &str) -> Option<Arc<ClusterRepository>> {
        self.entries.lock().expect("pool lock poisoned").get(name).and_then(|e| e.repository.clone())
    }

    /// Single-flight load: the first caller for `name` performs the actual work under `Loading`
    /// status; every concurrent caller for the same name waits on a shared `Notify` and reads
    /// the same outcome once it fires.
    pub async fn load(&self, name: &str, progress: &ProgressSender) -> Result<Arc<ClusterRepository>, AuthenticationError> {
        if let Some(repo) = self.loaded_repository(name) {
            self.touch(name);
            return Ok(repo);
        }

        let mut inflight = self.inflight.lock().expect("pool lock poisoned");
        let waiter = match inflight.get(name) {
            Some(notify) => Some(notify.clone()),
            None => {
                inflight.insert(name.to_string(), Arc::new(Notify::new()));
                None
            },
        };

        if let Some(notify) = waiter {
            // Register as a waiter (`enable`) while still holding `inflight`, not after. The
            // loader can only reach `notify_waiters()` by first removing this entry from
            // `inflight` under the same lock, so registering here before releasing it rules out
            // the lost-wakeup window where a waiter clones the `Notify`, gets pre-empted, and
            // only starts waiting after the loader has already fired the notification.
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            drop(inflight);

            notified.await;
            return self.result_after_load(name);
        }
        drop(inflight);

        {
            let mut entries = self.entries.lock().expect("pool lock poisoned");
            entries.entry(name.to_string()).or_default().status = ContextStatus::Loading;
        }

        let outcome = self.do_load(name, progress).await;

        match &outcome {
            Ok(repo) => {
                {
                    let mut entries = self.entries.lock().expect("pool lock poisoned");
                    let entry = entries.entry(name.to_string()).or_default();
                    entry.status = ContextStatus::Loaded;
                    entry.repository = Some(repo.clone());
                    entry.loaded_at = Some(UtcClock.now_ts());
                }
                self.touch(name);
                self.evict_if_over_capacity().await;
            },
            Err(err) => {
                let mut entries = self.entries.lock().expect("pool lock poisoned");
                let entry = entries.entry(name.to_string()).or_default();
                entry.status = ContextStatus::Failed(err.to_string());
                entry.repository = None;
            },
        }

        let notify = self.inflight.lock().expect("pool lock poisoned").remove(name);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }

        outcome
    }

    fn result_after_load(&self, name: &str) -> Result<Arc<ClusterRepository>, AuthenticationError> {
        match self.status_of(name) {
            ContextStatus::Loaded => {
                self.loaded_repository(name).ok_or_else(|| AuthenticationError::Rejected("context was unloaded concurrently".into()))
            },
            ContextStatus::Failed(msg) => Err(AuthenticationError::Rejected(msg)),
            _ => Err(AuthenticationError::Rejected("load did not complete".into())),
        }
    }

    async fn do_load(&self, name: &str, progress: &ProgressSender) -> Result<Arc<ClusterRepository>, AuthenticationError> {
        let client = self.clients.client_for(name).await.map_err(|err| AuthenticationError::Rejected(err.to_string()))?;
        let manager = InformerManager::start(client, self.config.clone(), self.definitions.definitions(), progress, name).await?;
        Ok(Arc::new(ClusterRepository::new(Arc::new(manager))))
    }

    fn touch(&self, name: &str) {
        let mut lru = self.lru.lock().expect("pool lock poisoned");
        lru.retain(|n| n != name);
        lru.push_front(name.to_string());
    }

    /// Evicts the least-recently-used non-active `Loaded` entry until the pool is back at or
    /// under `max_contexts`; the active context is never a candidate for eviction.
    async fn evict_if_over_capacity(&self) {
        loop {
            let active = self.active_name();
            let over = self.lru.lock().expect("pool lock poisoned").len() > self.config.max_contexts;
            if !over {
                return;
            }

            let victim = {
                let lru = self.lru.lock().expect("pool lock poisoned");
                lru.iter().rev().find(|n| Some((*n).clone()) != active).cloned()
            };
            let Some(victim) = victim else {
                return;
            };

            self.lru.lock().expect("pool lock poisoned").retain(|n| n != &victim);
            let repo = self.entries.lock().expect("pool lock poisoned").remove(&victim).and_then(|e| e.repository);
            if let Some(repo) = repo {
                debug!("evicting least-recently-used context {victim}");
                repo.close().await;
            }
        }
    }

    /// If `name` is already `Loaded`, just sets it active and touches the LRU; otherwise loads
    /// it first.
    pub async fn switch(&self, name: &str, progress: &ProgressSender) -> Result<Arc<ClusterRepository>, AuthenticationError> {
        if let Some(repo) = self.loaded_repository(name) {
            self.touch(name);
            *self.active.lock().expect("pool lock poisoned") = Some(name.to_string());
            return Ok(repo);
        }

        let repo = self.load(name, progress).await?;
        *self.active.lock().expect("pool lock poisoned") = Some(name.to_string());
        Ok(repo)
    }

    /// Only meaningful on a `Failed` entry: drops it and loads fresh.
    pub async fn retry(&self, name: &str, progress: &ProgressSender) -> Result<Arc<ClusterRepository>, AuthenticationError> {
        if let ContextStatus::Failed(_) = self.status_of(name) {
            self.entries.lock().expect("pool lock poisoned").remove(name);
        }
        self.load(name, progress).await
    }

    /// Every context the kubeconfig knows about, with this pool's current status for each,
    /// sorted by name so UI cursor positions stay stable across refreshes.
    pub fn list_contexts(&self) -> Vec<ContextInfo> {
        let active = self.active_name();
        let mut infos: Vec<ContextInfo> = self
            .kubeconfig
            .contexts()
            .into_iter()
            .map(|entry| ContextInfo {
                status: self.status_of(&entry.name),
                active: active.as_deref() == Some(entry.name.as_str()),
                name: entry.name,
                cluster: entry.cluster,
                user: entry.user,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Tears down every loaded context and clears all pool state.
    pub async fn close(&self) {
        let repos: Vec<Arc<ClusterRepository>> = {
            let mut entries = self.entries.lock().expect("pool lock poisoned");
            entries.drain().filter_map(|(_, e)| e.repository).collect()
        };
        for repo in repos {
            repo.close().await;
        }
        self.lru.lock().expect("pool lock poisoned").clear();
        *self.active.lock().expect("pool lock poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rstest::*;

    use super::*;
    use crate::external::KubeconfigEntry;

    struct FixedKubeconfig(Vec<KubeconfigEntry>);

    impl KubeconfigSource for FixedKubeconfig {
        fn contexts(&self) -> Vec<KubeconfigEntry> {
            self.0.clone()
        }

        fn current_context(&self) -> Option<String> {
            self.0.first().map(|e| e.name.clone())
        }
    }

    struct NoDefinitions;

    impl ResourceDefinitionSource for NoDefinitions {
        fn definitions(&self) -> Vec<crate::external::ResourceDefinition> {
            vec![]
        }
    }

    struct FailingClientFactory;

    #[async_trait]
    impl ClientFactory for FailingClientFactory {
        async fn client_for(&self, _context_name: &str) -> anyhow::Result<kube::Client> {
            anyhow::bail!("no cluster reachable in this test")
        }
    }

    fn pool_with_entries(names: &[&str]) -> ContextPool {
        pool_with_config(names, CacheConfig::default())
    }

    fn pool_with_config(names: &[&str], config: CacheConfig) -> ContextPool {
        let entries = names
            .iter()
            .map(|n| KubeconfigEntry { name: n.to_string(), cluster: "c".into(), user: "u".into(), namespace: None })
            .collect();
        ContextPool::new(Arc::new(FixedKubeconfig(entries)), Arc::new(FailingClientFactory), Arc::new(NoDefinitions), config)
    }

    /// Marks `name` as `Loaded` with no backing repository and pushes it to the front of the
    /// LRU, bypassing `do_load` entirely -- enough to exercise eviction/touch bookkeeping without
    /// a real cluster to load against.
    fn mark_loaded(pool: &ContextPool, name: &str) {
        pool.entries.lock().unwrap().entry(name.to_string()).or_default().status = ContextStatus::Loaded;
        pool.touch(name);
    }

    struct CountingFailingClientFactory(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl ClientFactory for CountingFailingClientFactory {
        async fn client_for(&self, _context_name: &str) -> anyhow::Result<kube::Client> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            anyhow::bail!("no cluster reachable in this test")
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_load_failure_sets_failed_status_without_lru_insertion() {
        let pool = pool_with_entries(&["c1"]);
        let result = pool.load("c1", &ProgressSender::none()).await;

        assert!(result.is_err());
        assert!(matches!(pool.status_of("c1"), ContextStatus::Failed(_)));
        assert!(pool.lru.lock().unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_retry_clears_failed_entry_before_reloading() {
        let pool = pool_with_entries(&["c1"]);
        let _ = pool.load("c1", &ProgressSender::none()).await;
        assert!(matches!(pool.status_of("c1"), ContextStatus::Failed(_)));

        let _ = pool.retry("c1", &ProgressSender::none()).await;
        assert!(matches!(pool.status_of("c1"), ContextStatus::Failed(_)));
    }

    #[rstest]
    fn test_list_contexts_sorted_by_name() {
        let pool = pool_with_entries(&["zeta", "alpha", "mid"]);
        let names: Vec<_> = pool.list_contexts().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["alpha".to_string(), "mid".to_string(), "zeta".to_string()]);
    }

    #[rstest]
    fn test_active_is_none_before_any_switch() {
        let pool = pool_with_entries(&["c1"]);
        assert!(pool.active().is_none());
        assert!(pool.active_name().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_evict_if_over_capacity_spares_the_active_context() {
        let mut config = CacheConfig::default();
        config.max_contexts = 2;
        let pool = pool_with_config(&["c1", "c2", "c3"], config);

        mark_loaded(&pool, "c1");
        mark_loaded(&pool, "c2");
        mark_loaded(&pool, "c3");
        *pool.active.lock().unwrap() = Some("c2".to_string());

        pool.evict_if_over_capacity().await;

        let remaining = pool.lru.lock().unwrap().clone();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.contains(&"c2".to_string()), "active context must never be evicted");
        assert!(!remaining.contains(&"c1".to_string()), "c1 is the least recently touched, non-active entry");
        assert!(remaining.contains(&"c3".to_string()));
        assert!(matches!(pool.status_of("c1"), ContextStatus::NotLoaded), "evicted entry is removed, not just untracked in the LRU");
    }

    #[rstest]
    #[tokio::test]
    async fn test_touch_promotes_an_existing_entry_instead_of_duplicating_it() {
        let pool = pool_with_entries(&["c1", "c2"]);
        mark_loaded(&pool, "c1");
        mark_loaded(&pool, "c2");
        pool.touch("c1");

        let order: Vec<_> = pool.lru.lock().unwrap().iter().cloned().collect();
        assert_eq!(order, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_concurrent_loads_of_the_same_context_coalesce_into_one_attempt() {
        let entries = vec![KubeconfigEntry { name: "c1".to_string(), cluster: "c".into(), user: "u".into(), namespace: None }];
        let factory = Arc::new(CountingFailingClientFactory(std::sync::atomic::AtomicUsize::new(0)));
        let pool =
            Arc::new(ContextPool::new(Arc::new(FixedKubeconfig(entries)), factory.clone(), Arc::new(NoDefinitions), CacheConfig::default()));

        let loads = (0..10).map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { pool.load("c1", &ProgressSender::none()).await })
        });
        let results = futures::future::join_all(loads).await;

        assert!(results.into_iter().all(|r| r.expect("task panicked").is_err()));
        assert_eq!(factory.0.load(std::sync::atomic::Ordering::SeqCst), 1, "only the first caller should have actually attempted a load");
    }
}
