mod apiset;
mod gvk;
mod util;

use kube::api::TypeMeta;

pub use apiset::*;
pub use gvk::*;
pub use util::*;

use crate::errors::*;
use crate::prelude::*;

err_impl! {KubernetesError,
    #[error("malformed label selector: {0:?}")]
    MalformedLabelSelector(metav1::LabelSelectorRequirement),
}

pub trait KubeResourceExt {
    fn namespaced_name(&self) -> String;
    fn matches(&self, sel: &metav1::LabelSelector) -> anyhow::Result<bool>;
}

pub trait OpenApiResourceExt {
    fn type_meta() -> TypeMeta;
}

impl<T: k8s_openapi::Resource> OpenApiResourceExt for T {
    fn type_meta() -> TypeMeta {
        TypeMeta {
            api_version: T::API_VERSION.into(),
            kind: T::KIND.into(),
        }
    }
}

#[cfg(feature = "testutils")]
pub mod testutils;
