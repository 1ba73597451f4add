use std::collections::BTreeMap;

use kubemirror_core::k8s::GVK;

use super::{
    HasMetadata,
    ResourceMetadata,
    TypedRecord,
};

/// The closed set of kinds the cache understands natively, plus an open `Custom` escape hatch
/// for anything discovered at runtime (CRDs and the like).
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum ResourceKind {
    Pod,
    Deployment,
    ReplicaSet,
    StatefulSet,
    DaemonSet,
    Service,
    ConfigMap,
    Secret,
    Namespace,
    Job,
    CronJob,
    Node,
    PersistentVolumeClaim,
    Ingress,
    Endpoints,
    HorizontalPodAutoscaler,
    Custom(GVK),
}

impl ResourceKind {
    /// The 16 kinds in the fixed "tier 0-3" startup schedule; `Custom` kinds are brought up
    /// on demand via `ensure_informer` and aren't part of this list.
    pub const BUILTIN: &'static [ResourceKind] = &[
        ResourceKind::Pod,
        ResourceKind::Deployment,
        ResourceKind::ReplicaSet,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
        ResourceKind::Service,
        ResourceKind::ConfigMap,
        ResourceKind::Secret,
        ResourceKind::Namespace,
        ResourceKind::Job,
        ResourceKind::CronJob,
        ResourceKind::Node,
        ResourceKind::PersistentVolumeClaim,
        ResourceKind::Ingress,
        ResourceKind::Endpoints,
        ResourceKind::HorizontalPodAutoscaler,
    ];

    /// The GVK a built-in kind is served under; `None` for `Custom`, whose GVK is carried
    /// inline instead of being derivable from a fixed table.
    pub fn gvk(&self) -> GVK {
        match self {
            ResourceKind::Pod => GVK::new("", "v1", "Pod"),
            ResourceKind::Deployment => GVK::new("apps", "v1", "Deployment"),
            ResourceKind::ReplicaSet => GVK::new("apps", "v1", "ReplicaSet"),
            ResourceKind::StatefulSet => GVK::new("apps", "v1", "StatefulSet"),
            ResourceKind::DaemonSet => GVK::new("apps", "v1", "DaemonSet"),
            ResourceKind::Service => GVK::new("", "v1", "Service"),
            ResourceKind::ConfigMap => GVK::new("", "v1", "ConfigMap"),
            ResourceKind::Secret => GVK::new("", "v1", "Secret"),
            ResourceKind::Namespace => GVK::new("", "v1", "Namespace"),
            ResourceKind::Job => GVK::new("batch", "v1", "Job"),
            ResourceKind::CronJob => GVK::new("batch", "v1", "CronJob"),
            ResourceKind::Node => GVK::new("", "v1", "Node"),
            ResourceKind::PersistentVolumeClaim => GVK::new("", "v1", "PersistentVolumeClaim"),
            ResourceKind::Ingress => GVK::new("networking.k8s.io", "v1", "Ingress"),
            ResourceKind::Endpoints => GVK::new("", "v1", "Endpoints"),
            ResourceKind::HorizontalPodAutoscaler => GVK::new("autoscaling", "v2", "HorizontalPodAutoscaler"),
            ResourceKind::Custom(gvk) => gvk.clone(),
        }
    }

    /// Startup tier: 0 is on-demand, 1 is critical, 2 is background, 3 is deferred.
    /// `Custom` kinds are always tier 0 -- they only start via `ensure_informer`.
    pub fn tier(&self) -> u8 {
        match self {
            ResourceKind::Pod
            | ResourceKind::Deployment
            | ResourceKind::ReplicaSet
            | ResourceKind::Service
            | ResourceKind::ConfigMap
            | ResourceKind::Secret
            | ResourceKind::Namespace
            | ResourceKind::Node => 1,

            ResourceKind::StatefulSet
            | ResourceKind::DaemonSet
            | ResourceKind::Job
            | ResourceKind::CronJob
            | ResourceKind::PersistentVolumeClaim
            | ResourceKind::Endpoints
            | ResourceKind::HorizontalPodAutoscaler => 2,

            ResourceKind::Ingress => 0,
            ResourceKind::Custom(_) => 0,
        }
    }
}

// Cuts down the boilerplate of defining sixteen near-identical typed records: each one is
// just ResourceMetadata plus the handful of printer-column/index fields the query layer needs.
macro_rules! typed_record {
    ($name:ident, $kind:ident, { $($field:ident: $ty:ty),* $(,)? }) => {
        #[derive(Clone, Debug, Default)]
        pub struct $name {
            pub meta: ResourceMetadata,
            $(pub $field: $ty,)*
        }

        impl HasMetadata for $name {
            fn metadata(&self) -> &ResourceMetadata {
                &self.meta
            }
        }

        impl TypedRecord for $name {
            fn kind(&self) -> ResourceKind {
                ResourceKind::$kind
            }
        }
    };
}

typed_record!(PodRecord, Pod, {
    node_name: Option<String>,
    phase: String,
    ready_containers: u32,
    total_containers: u32,
    restarts: u32,
    configmap_refs: Vec<String>,
    secret_refs: Vec<String>,
    pvc_refs: Vec<String>,
});

typed_record!(DeploymentRecord, Deployment, {
    desired_replicas: i32,
    ready_replicas: i32,
    updated_replicas: i32,
    available_replicas: i32,
});

typed_record!(ReplicaSetRecord, ReplicaSet, {
    desired_replicas: i32,
    ready_replicas: i32,
});

typed_record!(StatefulSetRecord, StatefulSet, {
    desired_replicas: i32,
    ready_replicas: i32,
});

typed_record!(DaemonSetRecord, DaemonSet, {
    desired_number_scheduled: i32,
    number_ready: i32,
});

typed_record!(ServiceRecord, Service, {
    cluster_ip: Option<String>,
    selector: BTreeMap<String, String>,
    ports: Vec<i32>,
});

typed_record!(ConfigMapRecord, ConfigMap, { key_count: usize });

typed_record!(SecretRecord, Secret, { secret_type: String, key_count: usize });

typed_record!(NamespaceRecord, Namespace, { phase: String });

typed_record!(JobRecord, Job, {
    completions: Option<i32>,
    active: i32,
    succeeded: i32,
    failed: i32,
});

typed_record!(CronJobRecord, CronJob, {
    schedule: String,
    suspended: bool,
    last_schedule_time: Option<i64>,
});

typed_record!(NodeRecord, Node, {
    ready: bool,
    unschedulable: bool,
    kubelet_version: String,
});

typed_record!(PersistentVolumeClaimRecord, PersistentVolumeClaim, {
    phase: String,
    capacity: Option<String>,
    storage_class: Option<String>,
});

typed_record!(IngressRecord, Ingress, { hosts: Vec<String> });

typed_record!(EndpointsRecord, Endpoints, { addresses: Vec<String> });

typed_record!(HorizontalPodAutoscalerRecord, HorizontalPodAutoscaler, {
    min_replicas: Option<i32>,
    max_replicas: i32,
    current_replicas: i32,
});

/// A custom resource: the cache never knows its Rust shape ahead of time, so it keeps the raw
/// object's metadata plus whatever printer columns the resource definition declared.
#[derive(Clone, Debug, Default)]
pub struct CustomRecord {
    pub meta: ResourceMetadata,
    pub gvk: Option<GVK>,
    pub columns: Vec<(String, String)>,
}

impl HasMetadata for CustomRecord {
    fn metadata(&self) -> &ResourceMetadata {
        &self.meta
    }
}

impl TypedRecord for CustomRecord {
    fn kind(&self) -> ResourceKind {
        match &self.gvk {
            Some(gvk) => ResourceKind::Custom(gvk.clone()),
            None => ResourceKind::Custom(GVK::new("", "v1", "Unknown")),
        }
    }
}

/// A closed sum type over every concrete record, used anywhere a query needs to return a
/// heterogeneous list (`Repository::list`, relationship queries that span kinds).
#[derive(Clone, Debug)]
pub enum Record {
    Pod(PodRecord),
    Deployment(DeploymentRecord),
    ReplicaSet(ReplicaSetRecord),
    StatefulSet(StatefulSetRecord),
    DaemonSet(DaemonSetRecord),
    Service(ServiceRecord),
    ConfigMap(ConfigMapRecord),
    Secret(SecretRecord),
    Namespace(NamespaceRecord),
    Job(JobRecord),
    CronJob(CronJobRecord),
    Node(NodeRecord),
    PersistentVolumeClaim(PersistentVolumeClaimRecord),
    Ingress(IngressRecord),
    Endpoints(EndpointsRecord),
    HorizontalPodAutoscaler(HorizontalPodAutoscalerRecord),
    Custom(CustomRecord),
}

macro_rules! record_dispatch {
    ($self:expr, $var:ident => $body:expr) => {
        match $self {
            Record::Pod($var) => $body,
            Record::Deployment($var) => $body,
            Record::ReplicaSet($var) => $body,
            Record::StatefulSet($var) => $body,
            Record::DaemonSet($var) => $body,
            Record::Service($var) => $body,
            Record::ConfigMap($var) => $body,
            Record::Secret($var) => $body,
            Record::Namespace($var) => $body,
            Record::Job($var) => $body,
            Record::CronJob($var) => $body,
            Record::Node($var) => $body,
            Record::PersistentVolumeClaim($var) => $body,
            Record::Ingress($var) => $body,
            Record::Endpoints($var) => $body,
            Record::HorizontalPodAutoscaler($var) => $body,
            Record::Custom($var) => $body,
        }
    };
}

impl HasMetadata for Record {
    fn metadata(&self) -> &ResourceMetadata {
        record_dispatch!(self, r => r.metadata())
    }
}

impl Record {
    pub fn kind(&self) -> ResourceKind {
        record_dispatch!(self, r => r.kind())
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_builtin_list_has_sixteen_kinds() {
        assert_eq!(ResourceKind::BUILTIN.len(), 16);
    }

    #[rstest]
    fn test_gvk_round_trips_group_version_kind() {
        assert_eq!(ResourceKind::Pod.gvk(), GVK::new("", "v1", "Pod"));
        assert_eq!(ResourceKind::Deployment.gvk(), GVK::new("apps", "v1", "Deployment"));
        assert_eq!(ResourceKind::HorizontalPodAutoscaler.gvk(), GVK::new("autoscaling", "v2", "HorizontalPodAutoscaler"));
    }

    #[rstest]
    fn test_only_tier_zero_kinds_are_ingress_and_custom() {
        let tier0: Vec<_> = ResourceKind::BUILTIN.iter().filter(|k| k.tier() == 0).collect();
        assert_eq!(tier0, vec![&ResourceKind::Ingress]);
        assert_eq!(ResourceKind::Custom(GVK::new("x", "v1", "Y")).tier(), 0);
    }
}
