use std::collections::HashMap;
use std::sync::{
    Arc,
    RwLock,
};

use kubemirror_core::k8s::GVK;

use crate::cache::ResourceCache;
use crate::index::ClusterIndex;
use crate::resource::*;

macro_rules! context_caches {
    ($($field:ident: $record:ty => $variant:ident),+ $(,)?) => {
        /// Every per-kind primary cache for one loaded context, plus the shared secondary
        /// index. One instance lives for the lifetime of a loaded context and is torn down
        /// with it.
        pub struct ContextCaches {
            $(pub $field: Arc<ResourceCache<$record>>,)+
            pub custom: RwLock<HashMap<GVK, Arc<ResourceCache<CustomRecord>>>>,
            pub index: Arc<ClusterIndex>,
        }

        impl Default for ContextCaches {
            fn default() -> Self {
                ContextCaches {
                    $($field: Arc::new(ResourceCache::new()),)+
                    custom: RwLock::new(HashMap::new()),
                    index: Arc::new(ClusterIndex::new()),
                }
            }
        }

        impl ContextCaches {
            pub fn new() -> Self {
                Self::default()
            }

            /// `None` means "not a built-in kind"; the caller (query layer) distinguishes that
            /// from "kind recognized but empty" before looking in `custom`.
            pub fn list_builtin(&self, kind: &ResourceKind) -> Option<Vec<Record>> {
                match kind {
                    $(ResourceKind::$variant => Some(self.$field.list().into_iter().map(|r| Record::$variant((*r).clone())).collect()),)+
                    ResourceKind::Custom(_) => None,
                }
            }

            pub fn get_builtin(&self, kind: &ResourceKind, namespaced_name: &str) -> Option<Record> {
                match kind {
                    $(ResourceKind::$variant => self.$field.get(namespaced_name).map(|r| Record::$variant((*r).clone())),)+
                    ResourceKind::Custom(_) => None,
                }
            }

            pub fn get_builtin_by_uid(&self, kind: &ResourceKind, uid: &str) -> Option<Record> {
                match kind {
                    $(ResourceKind::$variant => self.$field.get_by_uid(uid).map(|r| Record::$variant((*r).clone())),)+
                    ResourceKind::Custom(_) => None,
                }
            }

            /// Current object count for a built-in kind, used to refresh the stats pipeline's
            /// approximate count/byte-size at read time rather than trusting the lossy
            /// incremental delta counters alone.
            pub fn len_builtin(&self, kind: &ResourceKind) -> Option<usize> {
                match kind {
                    $(ResourceKind::$variant => Some(self.$field.len()),)+
                    ResourceKind::Custom(_) => None,
                }
            }
        }
    };
}

context_caches! {
    pods: PodRecord => Pod,
    deployments: DeploymentRecord => Deployment,
    replica_sets: ReplicaSetRecord => ReplicaSet,
    stateful_sets: StatefulSetRecord => StatefulSet,
    daemon_sets: DaemonSetRecord => DaemonSet,
    services: ServiceRecord => Service,
    config_maps: ConfigMapRecord => ConfigMap,
    secrets: SecretRecord => Secret,
    namespaces: NamespaceRecord => Namespace,
    jobs: JobRecord => Job,
    cron_jobs: CronJobRecord => CronJob,
    nodes: NodeRecord => Node,
    persistent_volume_claims: PersistentVolumeClaimRecord => PersistentVolumeClaim,
    ingresses: IngressRecord => Ingress,
    endpoints: EndpointsRecord => Endpoints,
    horizontal_pod_autoscalers: HorizontalPodAutoscalerRecord => HorizontalPodAutoscaler,
}

impl ContextCaches {
    pub fn list_custom(&self, gvk: &GVK) -> Option<Vec<Record>> {
        let custom = self.custom.read().expect("custom cache table lock poisoned");
        custom.get(gvk).map(|c| c.list().into_iter().map(|r| Record::Custom((*r).clone())).collect())
    }

    pub fn custom_cache(&self, gvk: &GVK) -> Option<Arc<ResourceCache<CustomRecord>>> {
        self.custom.read().expect("custom cache table lock poisoned").get(gvk).cloned()
    }

    pub fn ensure_custom_cache(&self, gvk: &GVK) -> Arc<ResourceCache<CustomRecord>> {
        let mut custom = self.custom.write().expect("custom cache table lock poisoned");
        custom.entry(gvk.clone()).or_insert_with(|| Arc::new(ResourceCache::new())).clone()
    }

    pub fn len_custom(&self, gvk: &GVK) -> Option<usize> {
        self.custom.read().expect("custom cache table lock poisoned").get(gvk).map(|c| c.len())
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_list_builtin_dispatches_to_the_right_cache() {
        let caches = ContextCaches::new();
        caches.pods.apply(PodRecord { meta: ResourceMetadata { uid: "1".into(), name: "p".into(), ..Default::default() }, ..Default::default() });

        let pods = caches.list_builtin(&ResourceKind::Pod).unwrap();
        assert_eq!(pods.len(), 1);
        assert!(caches.list_builtin(&ResourceKind::Deployment).unwrap().is_empty());
    }

    #[rstest]
    fn test_list_builtin_returns_none_for_custom() {
        let caches = ContextCaches::new();
        assert!(caches.list_builtin(&ResourceKind::Custom(GVK::new("x", "v1", "Y"))).is_none());
    }

    #[rstest]
    fn test_ensure_custom_cache_is_idempotent() {
        let caches = ContextCaches::new();
        let gvk = GVK::new("example.com", "v1", "Widget");
        let c1 = caches.ensure_custom_cache(&gvk);
        let c2 = caches.ensure_custom_cache(&gvk);
        assert!(Arc::ptr_eq(&c1, &c2));
    }
}
