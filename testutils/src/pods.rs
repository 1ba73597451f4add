use std::collections::BTreeMap;

use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use rstest::fixture;

use crate::constants::TEST_NAMESPACE;

const CONTAINER_PREFIX: &str = "container";
const INIT_CONTAINER_PREFIX: &str = "init-container";

#[fixture]
pub fn test_pod(#[default("the-pod".into())] name: String) -> corev1::Pod {
    corev1::Pod {
        metadata: metav1::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some(name),
            uid: Some("22222222-2222-2222-2222-222222222222".into()),
            resource_version: Some("1".into()),
            labels: Some(BTreeMap::from([("app".into(), "the-app".into())])),
            ..Default::default()
        },
        spec: Some(corev1::PodSpec {
            node_name: Some(crate::constants::TEST_NODE_NAME.into()),
            ..Default::default()
        }),
        status: Some(corev1::PodStatus {
            phase: Some("Running".into()),
            ..Default::default()
        }),
    }
}

pub fn add_config_map_volume(pod: &mut corev1::Pod, name: &str) {
    let spec = pod.spec.get_or_insert_default();
    let volumes = spec.volumes.get_or_insert_default();
    volumes.push(corev1::Volume {
        name: name.into(),
        config_map: Some(corev1::ConfigMapVolumeSource {
            name: name.into(),
            ..Default::default()
        }),
        ..Default::default()
    });
}

pub fn add_secret_volume(pod: &mut corev1::Pod, secret_name: &str) {
    let spec = pod.spec.get_or_insert_default();
    let volumes = spec.volumes.get_or_insert_default();
    volumes.push(corev1::Volume {
        name: format!("{secret_name}-vol"),
        secret: Some(corev1::SecretVolumeSource {
            secret_name: Some(secret_name.into()),
            ..Default::default()
        }),
        ..Default::default()
    });
}

pub fn add_pvc_volume(pod: &mut corev1::Pod, claim_name: &str) {
    let spec = pod.spec.get_or_insert_default();
    let volumes = spec.volumes.get_or_insert_default();
    volumes.push(corev1::Volume {
        name: format!("{claim_name}-vol"),
        persistent_volume_claim: Some(corev1::PersistentVolumeClaimVolumeSource {
            claim_name: claim_name.into(),
            ..Default::default()
        }),
        ..Default::default()
    });
}

pub fn add_owner_reference(pod: &mut corev1::Pod, kind: &str, name: &str, uid: &str) {
    let owners = pod.metadata.owner_references.get_or_insert_default();
    owners.push(metav1::OwnerReference {
        api_version: "apps/v1".into(),
        kind: kind.into(),
        name: name.into(),
        uid: uid.into(),
        controller: Some(true),
        ..Default::default()
    });
}

pub fn add_running_init_container(pod: &mut corev1::Pod) {
    add_container_with_status(pod, build_container_state_running(), true, 0);
}

pub fn add_finished_init_container(pod: &mut corev1::Pod) {
    add_container_with_status(pod, build_container_state_finished(), true, 0);
}

pub fn add_running_container(pod: &mut corev1::Pod) {
    add_container_with_status(pod, build_container_state_running(), false, 0);
}

pub fn add_finished_container(pod: &mut corev1::Pod, restarts: i32) {
    add_container_with_status(pod, build_container_state_finished(), false, restarts);
}

fn build_container_state_running() -> Option<corev1::ContainerState> {
    Some(corev1::ContainerState {
        running: Some(corev1::ContainerStateRunning { started_at: None }),
        ..Default::default()
    })
}

fn build_container_state_finished() -> Option<corev1::ContainerState> {
    Some(corev1::ContainerState {
        terminated: Some(corev1::ContainerStateTerminated {
            exit_code: 0,
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn add_container_with_status(
    pod: &mut corev1::Pod,
    state: Option<corev1::ContainerState>,
    init_container: bool,
    restart_count: i32,
) {
    let spec = pod.spec.get_or_insert_default();
    let status = pod.status.get_or_insert_default();
    let ready = matches!(&state, Some(s) if s.running.is_some());
    let (name, containers, statuses) = if init_container {
        let containers = spec.init_containers.get_or_insert_default();
        let statuses = status.init_container_statuses.get_or_insert_default();
        (format!("{INIT_CONTAINER_PREFIX}-{}", containers.len()), containers, statuses)
    } else {
        let containers = &mut spec.containers;
        let statuses = status.container_statuses.get_or_insert_default();
        (format!("{CONTAINER_PREFIX}-{}", containers.len()), containers, statuses)
    };

    containers.push(corev1::Container { name: name.clone(), ..Default::default() });
    statuses.push(corev1::ContainerStatus {
        name: name.clone(),
        state,
        ready,
        restart_count,
        ..Default::default()
    });
}
