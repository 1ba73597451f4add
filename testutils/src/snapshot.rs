//! Fixtures for the built-in kinds beyond `Pod` (see `pods.rs`), used by the cache crate's
//! integration tests to build a small multi-kind cluster snapshot without a live apiserver.

use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::batch::v1 as batchv1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use rstest::fixture;

use crate::constants::TEST_NAMESPACE;

#[fixture]
pub fn test_deployment(#[default("the-deployment".into())] name: String) -> appsv1::Deployment {
    appsv1::Deployment {
        metadata: metav1::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some(name),
            uid: Some("44444444-4444-4444-4444-444444444444".into()),
            resource_version: Some("1".into()),
            ..Default::default()
        },
        spec: Some(appsv1::DeploymentSpec {
            replicas: Some(3),
            ..Default::default()
        }),
        status: Some(appsv1::DeploymentStatus {
            ready_replicas: Some(2),
            updated_replicas: Some(3),
            available_replicas: Some(2),
            ..Default::default()
        }),
    }
}

#[fixture]
pub fn test_node(#[default("the-node".into())] name: String) -> corev1::Node {
    corev1::Node {
        metadata: metav1::ObjectMeta {
            name: Some(name),
            uid: Some("55555555-5555-5555-5555-555555555555".into()),
            resource_version: Some("1".into()),
            ..Default::default()
        },
        spec: Some(corev1::NodeSpec::default()),
        status: Some(corev1::NodeStatus {
            conditions: Some(vec![corev1::NodeCondition {
                type_: "Ready".into(),
                status: "True".into(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
    }
}

#[fixture]
pub fn test_job(#[default("the-job".into())] name: String) -> batchv1::Job {
    batchv1::Job {
        metadata: metav1::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some(name),
            uid: Some("66666666-6666-6666-6666-666666666666".into()),
            resource_version: Some("1".into()),
            owner_references: Some(vec![metav1::OwnerReference {
                api_version: "batch/v1".into(),
                kind: "CronJob".into(),
                name: "the-cronjob".into(),
                uid: "77777777-7777-7777-7777-777777777777".into(),
                controller: Some(true),
                ..Default::default()
            }]),
            ..Default::default()
        },
        spec: Some(batchv1::JobSpec {
            completions: Some(1),
            ..Default::default()
        }),
        status: Some(batchv1::JobStatus {
            active: Some(0),
            succeeded: Some(1),
            ..Default::default()
        }),
    }
}

#[fixture]
pub fn test_config_map(#[default("the-config".into())] name: String) -> corev1::ConfigMap {
    corev1::ConfigMap {
        metadata: metav1::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some(name),
            uid: Some("88888888-8888-8888-8888-888888888888".into()),
            resource_version: Some("1".into()),
            ..Default::default()
        },
        data: Some(std::collections::BTreeMap::from([("key".into(), "value".into())])),
        ..Default::default()
    }
}
