use kube::api::{
    DynamicObject,
    TypeMeta,
};
use kube::discovery::ApiResource;
use rstest::fixture;
use serde_json::json;

use crate::constants::{
    TEST_NAMESPACE,
    WIDGET_GVK,
};

/// A stand-in CRD instance served under `example.com/v1`, used to exercise the `Custom`
/// resource kind and `DynObjHandler` without depending on any real-world CRD schema.
#[fixture]
pub fn test_widget(#[default("the-widget".into())] name: String) -> DynamicObject {
    DynamicObject::new(&name, &ApiResource::from_gvk(&WIDGET_GVK))
        .within(TEST_NAMESPACE)
        .data(json!({"spec": {"size": "large"}, "status": {"phase": "Ready"}}))
}

/// A custom object with no recognizable `TypeMeta`, for exercising the "can't determine GVK"
/// transform failure path.
#[fixture]
pub fn test_widget_missing_type_meta() -> DynamicObject {
    DynamicObject {
        types: None,
        metadata: kube::api::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some("untyped-widget".into()),
            ..Default::default()
        },
        data: json!({}),
    }
}

#[fixture]
pub fn test_widget_with_columns() -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta {
            api_version: "example.com/v1".into(),
            kind: "Widget".into(),
        }),
        metadata: kube::api::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some("the-widget".into()),
            uid: Some("33333333-3333-3333-3333-333333333333".into()),
            ..Default::default()
        },
        data: json!({
            "spec": {"size": "large", "replicas": 3},
            "status": {"phase": "Ready"},
        }),
    }
}
