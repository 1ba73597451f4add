use kube::api::{
    DynamicObject,
    GroupVersionKind,
};
use kube::discovery::ApiResource;
use rstest::*;

use crate::prelude::*;

#[fixture]
pub fn test_pod(#[default("test-pod")] name: &str) -> DynamicObject {
    DynamicObject::new(name, &ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod"))).within(TEST_NAMESPACE)
}

#[fixture]
pub fn test_deployment(#[default("test-deployment")] name: &str) -> DynamicObject {
    DynamicObject::new(
        name,
        &ApiResource::from_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment")),
    )
    .within(TEST_NAMESPACE)
}
