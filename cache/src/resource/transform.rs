use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::autoscaling::v2 as autoscalingv2;
use k8s_openapi::api::batch::v1 as batchv1;
use k8s_openapi::api::networking::v1 as networkingv1;
use kube::api::DynamicObject;
use kube::ResourceExt;
use kubemirror_core::k8s::GVK;
use kubemirror_core::prelude::*;

use super::kinds::*;
use super::{
    PrinterColumnSpec,
    ResourceMetadata,
};
use crate::errors::TransformError;

fn base_metadata<K: ResourceExt>(obj: &K) -> Result<ResourceMetadata, TransformError> {
    Ok(ResourceMetadata {
        uid: obj.uid().ok_or(TransformError::MissingUid)?,
        name: obj.name_any(),
        namespace: obj.namespace(),
        created_at: obj
            .creation_timestamp()
            .map(|t| t.0.timestamp())
            .unwrap_or_default(),
        resource_version: obj.resource_version().unwrap_or_default(),
        labels: obj.labels().clone().into_iter().collect(),
        annotations: obj.annotations().clone().into_iter().collect(),
        owner_uids: obj.owner_references().iter().map(|o| o.uid.clone()).collect(),
    })
}

fn volume_refs(spec: &corev1::PodSpec) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut configmaps = vec![];
    let mut secrets = vec![];
    let mut pvcs = vec![];

    for vol in spec.volumes.iter().flatten() {
        if let Some(cm) = &vol.config_map {
            configmaps.push(cm.name.clone());
        }
        if let Some(s) = &vol.secret {
            if let Some(name) = &s.secret_name {
                secrets.push(name.clone());
            }
        }
        if let Some(pvc) = &vol.persistent_volume_claim {
            pvcs.push(pvc.claim_name.clone());
        }
    }

    (configmaps, secrets, pvcs)
}

pub fn transform_pod(pod: &corev1::Pod) -> Result<PodRecord, TransformError> {
    let meta = base_metadata(pod)?;
    let spec = pod.spec.as_ref();
    let status = pod.status.as_ref();

    let (configmap_refs, secret_refs, pvc_refs) = spec.map(volume_refs).unwrap_or_default();

    let container_statuses = status.and_then(|s| s.container_statuses.as_ref());
    let ready_containers = container_statuses
        .map(|cs| cs.iter().filter(|c| c.ready).count() as u32)
        .unwrap_or(0);
    let total_containers = container_statuses.map(|cs| cs.len() as u32).unwrap_or(0);
    let restarts = container_statuses
        .map(|cs| cs.iter().map(|c| c.restart_count as u32).sum())
        .unwrap_or(0);

    Ok(PodRecord {
        meta,
        node_name: spec.and_then(|s| s.node_name.clone()),
        phase: status.and_then(|s| s.phase.clone()).unwrap_or_else(|| "Unknown".into()),
        ready_containers,
        total_containers,
        restarts,
        configmap_refs,
        secret_refs,
        pvc_refs,
    })
}

pub fn transform_deployment(d: &appsv1::Deployment) -> Result<DeploymentRecord, TransformError> {
    let meta = base_metadata(d)?;
    let spec = d.spec.as_ref();
    let status = d.status.as_ref();
    Ok(DeploymentRecord {
        meta,
        desired_replicas: spec.and_then(|s| s.replicas).unwrap_or(0),
        ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0),
        updated_replicas: status.and_then(|s| s.updated_replicas).unwrap_or(0),
        available_replicas: status.and_then(|s| s.available_replicas).unwrap_or(0),
    })
}

pub fn transform_replica_set(rs: &appsv1::ReplicaSet) -> Result<ReplicaSetRecord, TransformError> {
    let meta = base_metadata(rs)?;
    let spec = rs.spec.as_ref();
    let status = rs.status.as_ref();
    Ok(ReplicaSetRecord {
        meta,
        desired_replicas: spec.and_then(|s| s.replicas).unwrap_or(0),
        ready_replicas: status.map(|s| s.ready_replicas.unwrap_or(0)).unwrap_or(0),
    })
}

pub fn transform_stateful_set(ss: &appsv1::StatefulSet) -> Result<StatefulSetRecord, TransformError> {
    let meta = base_metadata(ss)?;
    let spec = ss.spec.as_ref();
    let status = ss.status.as_ref();
    Ok(StatefulSetRecord {
        meta,
        desired_replicas: spec.and_then(|s| s.replicas).unwrap_or(0),
        ready_replicas: status.map(|s| s.ready_replicas.unwrap_or(0)).unwrap_or(0),
    })
}

pub fn transform_daemon_set(ds: &appsv1::DaemonSet) -> Result<DaemonSetRecord, TransformError> {
    let meta = base_metadata(ds)?;
    let status = ds.status.as_ref();
    Ok(DaemonSetRecord {
        meta,
        desired_number_scheduled: status.map(|s| s.desired_number_scheduled).unwrap_or(0),
        number_ready: status.map(|s| s.number_ready).unwrap_or(0),
    })
}

pub fn transform_service(svc: &corev1::Service) -> Result<ServiceRecord, TransformError> {
    let meta = base_metadata(svc)?;
    let spec = svc.spec.as_ref();
    Ok(ServiceRecord {
        meta,
        cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
        selector: spec.and_then(|s| s.selector.clone()).unwrap_or_default().into_iter().collect(),
        ports: spec
            .and_then(|s| s.ports.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.port)
            .collect(),
    })
}

pub fn transform_config_map(cm: &corev1::ConfigMap) -> Result<ConfigMapRecord, TransformError> {
    let meta = base_metadata(cm)?;
    let key_count = cm.data.as_ref().map(|d| d.len()).unwrap_or(0) + cm.binary_data.as_ref().map(|d| d.len()).unwrap_or(0);
    Ok(ConfigMapRecord { meta, key_count })
}

pub fn transform_secret(s: &corev1::Secret) -> Result<SecretRecord, TransformError> {
    let meta = base_metadata(s)?;
    let key_count = s.data.as_ref().map(|d| d.len()).unwrap_or(0);
    Ok(SecretRecord {
        meta,
        secret_type: s.type_.clone().unwrap_or_else(|| "Opaque".into()),
        key_count,
    })
}

pub fn transform_namespace(ns: &corev1::Namespace) -> Result<NamespaceRecord, TransformError> {
    let meta = base_metadata(ns)?;
    let phase = ns
        .status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Active".into());
    Ok(NamespaceRecord { meta, phase })
}

pub fn transform_job(job: &batchv1::Job) -> Result<JobRecord, TransformError> {
    let meta = base_metadata(job)?;
    let spec = job.spec.as_ref();
    let status = job.status.as_ref();
    Ok(JobRecord {
        meta,
        completions: spec.and_then(|s| s.completions),
        active: status.and_then(|s| s.active).unwrap_or(0),
        succeeded: status.and_then(|s| s.succeeded).unwrap_or(0),
        failed: status.and_then(|s| s.failed).unwrap_or(0),
    })
}

pub fn transform_cron_job(cj: &batchv1::CronJob) -> Result<CronJobRecord, TransformError> {
    let meta = base_metadata(cj)?;
    let spec = cj.spec.as_ref();
    let status = cj.status.as_ref();
    Ok(CronJobRecord {
        meta,
        schedule: spec.map(|s| s.schedule.clone()).unwrap_or_default(),
        suspended: spec.and_then(|s| s.suspend).unwrap_or(false),
        last_schedule_time: status
            .and_then(|s| s.last_schedule_time.as_ref())
            .map(|t| t.0.timestamp()),
    })
}

pub fn transform_node(node: &corev1::Node) -> Result<NodeRecord, TransformError> {
    let meta = base_metadata(node)?;
    let status = node.status.as_ref();
    let ready = status
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conds| conds.iter().any(|c| c.type_ == "Ready" && c.status == "True"));
    Ok(NodeRecord {
        meta,
        ready,
        unschedulable: node.spec.as_ref().and_then(|s| s.unschedulable).unwrap_or(false),
        kubelet_version: status
            .and_then(|s| s.node_info.as_ref())
            .map(|i| i.kubelet_version.clone())
            .unwrap_or_default(),
    })
}

pub fn transform_pvc(pvc: &corev1::PersistentVolumeClaim) -> Result<PersistentVolumeClaimRecord, TransformError> {
    let meta = base_metadata(pvc)?;
    let status = pvc.status.as_ref();
    Ok(PersistentVolumeClaimRecord {
        meta,
        phase: status.and_then(|s| s.phase.clone()).unwrap_or_else(|| "Pending".into()),
        capacity: status
            .and_then(|s| s.capacity.as_ref())
            .and_then(|c| c.get("storage"))
            .map(|q| q.0.clone()),
        storage_class: pvc.spec.as_ref().and_then(|s| s.storage_class_name.clone()),
    })
}

pub fn transform_ingress(ing: &networkingv1::Ingress) -> Result<IngressRecord, TransformError> {
    let meta = base_metadata(ing)?;
    let hosts = ing
        .spec
        .as_ref()
        .and_then(|s| s.rules.as_ref())
        .map(|rules| rules.iter().filter_map(|r| r.host.clone()).collect())
        .unwrap_or_default();
    Ok(IngressRecord { meta, hosts })
}

pub fn transform_endpoints(ep: &corev1::Endpoints) -> Result<EndpointsRecord, TransformError> {
    let meta = base_metadata(ep)?;
    let addresses = ep
        .subsets
        .as_ref()
        .map(|subsets| {
            subsets
                .iter()
                .flat_map(|s| s.addresses.clone().unwrap_or_default())
                .map(|a| a.ip)
                .collect()
        })
        .unwrap_or_default();
    Ok(EndpointsRecord { meta, addresses })
}

pub fn transform_hpa(
    hpa: &autoscalingv2::HorizontalPodAutoscaler,
) -> Result<HorizontalPodAutoscalerRecord, TransformError> {
    let meta = base_metadata(hpa)?;
    let spec = hpa.spec.as_ref();
    let status = hpa.status.as_ref();
    Ok(HorizontalPodAutoscalerRecord {
        meta,
        min_replicas: spec.and_then(|s| s.min_replicas),
        max_replicas: spec.map(|s| s.max_replicas).unwrap_or(0),
        current_replicas: status.map(|s| s.current_replicas).unwrap_or(0),
    })
}

pub fn transform_custom(obj: &DynamicObject, columns: &[PrinterColumnSpec]) -> Result<CustomRecord, TransformError> {
    let gvk = GVK::from_dynamic_obj(obj).ok();
    Ok(CustomRecord {
        meta: base_metadata(obj)?,
        gvk,
        columns: super::evaluate_printer_columns(obj, columns),
    })
}

#[cfg(test)]
mod tests {
    use kube::api::DynamicObject;
    use kubemirror_testutils::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_transform_pod_extracts_volume_refs_and_container_counts(mut test_pod: corev1::Pod) {
        add_config_map_volume(&mut test_pod, "cm1");
        add_secret_volume(&mut test_pod, "sec1");
        add_pvc_volume(&mut test_pod, "pvc1");
        add_running_container(&mut test_pod);
        add_finished_container(&mut test_pod, 2);

        let record = transform_pod(&test_pod).unwrap();
        assert_eq!(record.meta.name, "the-pod");
        assert_eq!(record.node_name.as_deref(), Some(TEST_NODE_NAME));
        assert_eq!(record.phase, "Running");
        assert_eq!(record.configmap_refs, vec!["cm1".to_string()]);
        assert_eq!(record.secret_refs, vec!["sec1".to_string()]);
        assert_eq!(record.pvc_refs, vec!["pvc1".to_string()]);
        assert_eq!(record.total_containers, 2);
        assert_eq!(record.ready_containers, 1);
        assert_eq!(record.restarts, 2);
    }

    #[rstest]
    fn test_transform_pod_defaults_missing_phase_to_unknown() {
        let pod = corev1::Pod {
            metadata: metav1::ObjectMeta { uid: Some("1".into()), name: Some("bare".into()), ..Default::default() },
            ..Default::default()
        };
        let record = transform_pod(&pod).unwrap();
        assert_eq!(record.phase, "Unknown");
        assert_eq!(record.total_containers, 0);
        assert!(record.node_name.is_none());
    }

    #[rstest]
    fn test_transform_rejects_object_with_no_uid() {
        let pod = corev1::Pod {
            metadata: metav1::ObjectMeta { name: Some("no-uid".into()), ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(transform_pod(&pod), Err(TransformError::MissingUid)));
    }

    #[rstest]
    fn test_transform_deployment_reads_replica_counts(test_deployment: appsv1::Deployment) {
        let record = transform_deployment(&test_deployment).unwrap();
        assert_eq!(record.desired_replicas, 3);
        assert_eq!(record.ready_replicas, 2);
        assert_eq!(record.available_replicas, 2);
    }

    #[rstest]
    fn test_transform_node_reports_ready_from_conditions(test_node: corev1::Node) {
        let record = transform_node(&test_node).unwrap();
        assert!(record.ready);
        assert!(!record.unschedulable);
    }

    #[rstest]
    fn test_transform_job_carries_owner_uid_for_cronjob_index(test_job: batchv1::Job) {
        let record = transform_job(&test_job).unwrap();
        assert_eq!(record.succeeded, 1);
        assert_eq!(record.meta.owner_uids, vec!["77777777-7777-7777-7777-777777777777".to_string()]);
    }

    #[rstest]
    fn test_transform_config_map_counts_keys(test_config_map: corev1::ConfigMap) {
        let record = transform_config_map(&test_config_map).unwrap();
        assert_eq!(record.key_count, 1);
    }

    #[rstest]
    fn test_transform_secret_defaults_type_to_opaque() {
        let secret = corev1::Secret {
            metadata: metav1::ObjectMeta { uid: Some("s1".into()), name: Some("sec".into()), ..Default::default() },
            ..Default::default()
        };
        let record = transform_secret(&secret).unwrap();
        assert_eq!(record.secret_type, "Opaque");
        assert_eq!(record.key_count, 0);
    }

    #[rstest]
    fn test_transform_custom_evaluates_printer_columns(test_widget: DynamicObject) {
        let cols = vec![PrinterColumnSpec::new("Phase", ".status.phase", 0)];
        let record = transform_custom(&test_widget, &cols).unwrap();
        assert_eq!(record.meta.name, "the-widget");
        assert_eq!(record.columns, vec![("Phase".to_string(), "Ready".to_string())]);
        assert_eq!(record.gvk, Some(GVK::new("example.com", "v1", "Widget")));
    }

    #[rstest]
    fn test_transform_custom_missing_type_meta_yields_no_gvk(test_widget_missing_type_meta: DynamicObject) {
        let record = transform_custom(&test_widget_missing_type_meta, &[]).unwrap();
        assert_eq!(record.gvk, None);
    }
}
