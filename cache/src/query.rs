use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use kubemirror_core::k8s::GVK;
#[cfg(feature = "mock")]
use mockall::automock;

use crate::errors::{
    QueryError,
    SyncError,
};
use crate::manager::InformerManager;
use crate::resource::{
    HasMetadata,
    Record,
    ResourceKind,
};
use crate::stats::ResourceStats;

/// The façade every caller (UI, CLI, downstream crates) queries against. A context pool exposes
/// its active context's `ClusterRepository` directly rather than implementing this trait itself
/// (see DESIGN.md -- delegation keeps the pool's own surface limited to context lifecycle).
#[cfg_attr(feature = "mock", automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    fn list(&self, kind: &ResourceKind) -> Result<Vec<Record>, QueryError>;
    fn get(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Result<Record, QueryError>;

    fn pods_on_node(&self, node: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_namespace(&self, ns: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_owner(&self, uid: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_using_configmap(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_using_secret(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_pvc(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_replica_set(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_stateful_set(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_daemon_set(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_job(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn replica_sets_for_deployment(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_deployment(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn pods_for_service(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;
    fn jobs_for_cron_job(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError>;

    fn get_yaml(&self, kind: &ResourceKind, ns: &str, name: &str) -> Result<String, QueryError>;
    fn describe(&self, kind: &ResourceKind, ns: &str, name: &str) -> Result<String, QueryError>;

    async fn ensure_informer(&self, kind: &ResourceKind);
    fn informer_synced(&self, kind: &ResourceKind) -> bool;
    fn typed_informers_ready(&self) -> bool;
    fn typed_informers_sync_error(&self) -> Option<SyncError>;
    /// Per-kind sync failure, for typed and custom/dynamic kinds alike.
    fn sync_error(&self, kind: &ResourceKind) -> Option<SyncError>;
    fn stats(&self) -> Vec<(GVK, ResourceStats)>;
    async fn close(&self);
}

/// Stable sort: `CreatedAt` descending, ties broken by `Name` ascending then `Namespace`
/// ascending. `sort_by` is a stable sort, so equal keys keep their original
/// (arbitrary but deterministic-for-this-call) relative order.
fn sort_records(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| {
        let (ma, mb) = (a.metadata(), b.metadata());
        mb.created_at
            .cmp(&ma.created_at)
            .then_with(|| ma.name.cmp(&mb.name))
            .then_with(|| ma.namespace.cmp(&mb.namespace))
    });
    records
}

fn namespaced_name(ns: &str, name: &str) -> String {
    if ns.is_empty() {
        name.to_string()
    } else {
        format!("{ns}/{name}")
    }
}

/// The concrete `Repository` for one loaded context: every query reads through the context's
/// `InformerManager` (caches, indexes, sync state). Index access happens entirely inside the
/// helper calls below, which return by-value `Vec<String>`/`Record`s, before any sorting or
/// age work starts under the lock.
pub struct ClusterRepository {
    manager: Arc<InformerManager>,
}

impl ClusterRepository {
    pub fn new(manager: Arc<InformerManager>) -> Self {
        ClusterRepository { manager }
    }

    fn require_known(&self, kind: &ResourceKind) -> Result<(), QueryError> {
        if self.manager.knows_kind(kind) {
            Ok(())
        } else {
            Err(QueryError::UnknownKind(kind.gvk()))
        }
    }

    fn uid_of(&self, kind: &ResourceKind, ns: &str, name: &str) -> Result<String, QueryError> {
        self.require_known(kind)?;
        self.manager.require_ready(kind)?;
        let record = self.manager.caches.get_builtin(kind, &namespaced_name(ns, name)).ok_or(QueryError::NotFound)?;
        Ok(record.metadata().uid.clone())
    }

    fn pods_by_uids(&self, uids: impl IntoIterator<Item = String>) -> Vec<Record> {
        let caches = &self.manager.caches;
        sort_records(uids.into_iter().filter_map(|uid| caches.get_builtin_by_uid(&ResourceKind::Pod, &uid)).collect())
    }
}

#[async_trait]
impl Repository for ClusterRepository {
    fn list(&self, kind: &ResourceKind) -> Result<Vec<Record>, QueryError> {
        self.require_known(kind)?;
        self.manager.require_ready(kind)?;
        match self.manager.caches.list_builtin(kind) {
            Some(records) => Ok(sort_records(records)),
            None => {
                let gvk = kind.gvk();
                let records = self.manager.caches.list_custom(&gvk).unwrap_or_default();
                Ok(sort_records(records))
            },
        }
    }

    fn get(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Result<Record, QueryError> {
        self.require_known(kind)?;
        self.manager.require_ready(kind)?;
        let key = namespaced_name(namespace, name);
        match self.manager.caches.get_builtin(kind, &key) {
            Some(record) => Ok(record),
            None => {
                let gvk = kind.gvk();
                self.manager
                    .caches
                    .custom_cache(&gvk)
                    .and_then(|c| c.get(&key))
                    .map(|r| Record::Custom((*r).clone()))
                    .ok_or(QueryError::NotFound)
            },
        }
    }

    fn pods_on_node(&self, node: &str) -> Result<Vec<Record>, QueryError> {
        self.manager.require_ready(&ResourceKind::Pod)?;
        Ok(self.pods_by_uids(self.manager.caches.index.pods_by_node(node)))
    }

    fn pods_for_namespace(&self, ns: &str) -> Result<Vec<Record>, QueryError> {
        self.manager.require_ready(&ResourceKind::Pod)?;
        Ok(self.pods_by_uids(self.manager.caches.index.pods_by_namespace(ns)))
    }

    fn pods_for_owner(&self, uid: &str) -> Result<Vec<Record>, QueryError> {
        self.manager.require_ready(&ResourceKind::Pod)?;
        Ok(self.pods_by_uids(self.manager.caches.index.pods_by_owner_uid(uid)))
    }

    fn pods_using_configmap(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        self.manager.require_ready(&ResourceKind::Pod)?;
        let uids = self.manager.caches.index.pods_by_configmap(name);
        Ok(self.pods_by_uids_in_namespace(uids, ns))
    }

    fn pods_using_secret(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        self.manager.require_ready(&ResourceKind::Pod)?;
        let uids = self.manager.caches.index.pods_by_secret(name);
        Ok(self.pods_by_uids_in_namespace(uids, ns))
    }

    fn pods_for_pvc(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        self.manager.require_ready(&ResourceKind::Pod)?;
        let uids = self.manager.caches.index.pods_by_pvc(name);
        Ok(self.pods_by_uids_in_namespace(uids, ns))
    }

    fn pods_for_replica_set(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        let uid = self.uid_of(&ResourceKind::ReplicaSet, ns, name)?;
        self.manager.require_ready(&ResourceKind::Pod)?;
        Ok(self.pods_by_uids(self.manager.caches.index.pods_by_owner_uid(&uid)))
    }

    fn pods_for_stateful_set(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        let uid = self.uid_of(&ResourceKind::StatefulSet, ns, name)?;
        self.manager.require_ready(&ResourceKind::Pod)?;
        Ok(self.pods_by_uids(self.manager.caches.index.pods_by_owner_uid(&uid)))
    }

    fn pods_for_daemon_set(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        let uid = self.uid_of(&ResourceKind::DaemonSet, ns, name)?;
        self.manager.require_ready(&ResourceKind::Pod)?;
        Ok(self.pods_by_uids(self.manager.caches.index.pods_by_owner_uid(&uid)))
    }

    fn pods_for_job(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        let uid = self.uid_of(&ResourceKind::Job, ns, name)?;
        self.manager.require_ready(&ResourceKind::Pod)?;
        Ok(self.pods_by_uids(self.manager.caches.index.pods_by_owner_uid(&uid)))
    }

    fn replica_sets_for_deployment(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        let dep_uid = self.uid_of(&ResourceKind::Deployment, ns, name)?;
        self.manager.require_ready(&ResourceKind::ReplicaSet)?;
        let caches = &self.manager.caches;
        let records = self
            .manager
            .caches
            .index
            .replica_sets_by_owner_uid(&dep_uid)
            .into_iter()
            .filter_map(|uid| caches.get_builtin_by_uid(&ResourceKind::ReplicaSet, &uid))
            .collect();
        Ok(sort_records(records))
    }

    fn pods_for_deployment(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        let dep_uid = self.uid_of(&ResourceKind::Deployment, ns, name)?;
        self.manager.require_ready(&ResourceKind::ReplicaSet)?;
        self.manager.require_ready(&ResourceKind::Pod)?;
        let index = &self.manager.caches.index;
        let rs_uids = index.replica_sets_by_owner_uid(&dep_uid);
        let mut pod_uids: Vec<String> = rs_uids.iter().flat_map(|rs_uid| index.pods_by_owner_uid(rs_uid)).collect();
        pod_uids.sort();
        pod_uids.dedup();
        Ok(self.pods_by_uids(pod_uids))
    }

    fn pods_for_service(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        self.require_known(&ResourceKind::Service)?;
        self.manager.require_ready(&ResourceKind::Service)?;
        self.manager.require_ready(&ResourceKind::Pod)?;

        let svc = self
            .manager
            .caches
            .get_builtin(&ResourceKind::Service, &namespaced_name(ns, name))
            .ok_or(QueryError::NotFound)?;
        let selector = match svc {
            Record::Service(s) => s.selector,
            _ => unreachable!("get_builtin(Service) always returns Record::Service"),
        };
        // A selector-less Service matches no pods, not every pod in the namespace --
        // `selector.iter().all(...)` below is vacuously true over an empty selector.
        if selector.is_empty() {
            return Ok(vec![]);
        }

        let candidates = self.manager.caches.index.pods_by_namespace(ns);
        let matched: Vec<Record> = candidates
            .into_iter()
            .filter_map(|uid| self.manager.caches.get_builtin_by_uid(&ResourceKind::Pod, &uid))
            .filter(|r| match r {
                Record::Pod(p) => selector.iter().all(|(k, v)| p.meta.labels.get(k) == Some(v)),
                _ => false,
            })
            .collect();
        Ok(sort_records(matched))
    }

    fn jobs_for_cron_job(&self, ns: &str, name: &str) -> Result<Vec<Record>, QueryError> {
        let uid = self.uid_of(&ResourceKind::CronJob, ns, name)?;
        self.manager.require_ready(&ResourceKind::Job)?;
        let caches = &self.manager.caches;
        let records = self
            .manager
            .caches
            .index
            .jobs_by_owner_uid(&uid)
            .into_iter()
            .filter_map(|uid| caches.get_builtin_by_uid(&ResourceKind::Job, &uid))
            .collect();
        Ok(sort_records(records))
    }

    fn get_yaml(&self, kind: &ResourceKind, ns: &str, name: &str) -> Result<String, QueryError> {
        let record = self.get(kind, ns, name)?;
        let meta = record.metadata();
        let mut summary = BTreeMap::new();
        summary.insert("kind".to_string(), record.kind().gvk().to_string());
        summary.insert("name".to_string(), meta.name.clone());
        summary.insert("namespace".to_string(), meta.namespace.clone().unwrap_or_default());
        summary.insert("uid".to_string(), meta.uid.clone());
        summary.insert("resourceVersion".to_string(), meta.resource_version.clone());
        serde_yaml::to_string(&summary).map_err(|_| QueryError::NotFound)
    }

    fn describe(&self, kind: &ResourceKind, ns: &str, name: &str) -> Result<String, QueryError> {
        let record = self.get(kind, ns, name)?;
        let meta = record.metadata();
        Ok(format!(
            "Name:\t\t{}\nNamespace:\t{}\nKind:\t\t{}\nUID:\t\t{}\n",
            meta.name,
            meta.namespace.clone().unwrap_or_default(),
            record.kind().gvk(),
            meta.uid,
        ))
    }

    async fn ensure_informer(&self, kind: &ResourceKind) {
        self.manager.ensure_informer(kind).await;
    }

    fn informer_synced(&self, kind: &ResourceKind) -> bool {
        self.manager.informer_synced(kind)
    }

    fn typed_informers_ready(&self) -> bool {
        self.manager.typed_informers_ready()
    }

    fn typed_informers_sync_error(&self) -> Option<SyncError> {
        self.manager.typed_informers_sync_error()
    }

    fn sync_error(&self, kind: &ResourceKind) -> Option<SyncError> {
        self.manager.sync_error(kind)
    }

    fn stats(&self) -> Vec<(GVK, ResourceStats)> {
        self.manager.stats()
    }

    async fn close(&self) {
        self.manager.close().await;
    }
}

impl ClusterRepository {
    /// `pods_by_configmap`/`pods_by_secret`/`pods_by_pvc` are keyed by reference name only
    /// (names aren't namespace-qualified in the index, see DESIGN.md); a pod can only ever
    /// reference a volume source in its own namespace, so filtering the bucket to `ns` here is
    /// equivalent to a namespaced key without the extra index dimension.
    fn pods_by_uids_in_namespace(&self, uids: Vec<String>, ns: &str) -> Vec<Record> {
        let caches = &self.manager.caches;
        sort_records(
            uids.into_iter()
                .filter_map(|uid| caches.get_builtin_by_uid(&ResourceKind::Pod, &uid))
                .filter(|r| r.metadata().namespace.as_deref() == Some(ns))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{
        PodRecord,
        ResourceMetadata,
    };

    fn pod(uid: &str, name: &str, created_at: i64) -> Record {
        Record::Pod(PodRecord {
            meta: ResourceMetadata { uid: uid.into(), name: name.into(), created_at, ..Default::default() },
            ..Default::default()
        })
    }

    #[test]
    fn test_sort_records_orders_by_created_at_desc_then_name_asc() {
        let records = vec![pod("1", "b", 100), pod("2", "a", 100), pod("3", "z", 200)];
        let sorted = sort_records(records);
        let names: Vec<_> = sorted
            .iter()
            .map(|r| match r {
                Record::Pod(p) => p.meta.name.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }

    #[test]
    fn test_namespaced_name_format() {
        assert_eq!(namespaced_name("ns", "foo"), "ns/foo");
        assert_eq!(namespaced_name("", "foo"), "foo");
    }
}
