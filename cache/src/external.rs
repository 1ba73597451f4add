//! The two collaborator surfaces the core consumes but never implements: kubeconfig discovery
//! and the custom-resource-definition listing. Both are narrow traits so
//! the real UI-side implementations (kubeconfig parsing heuristics, CRD discovery caching) stay
//! entirely outside this workspace.

use async_trait::async_trait;
use kubemirror_core::k8s::GVK;

use crate::resource::PrinterColumnSpec;

/// One entry from a parsed kubeconfig.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KubeconfigEntry {
    pub name: String,
    pub cluster: String,
    pub user: String,
    pub namespace: Option<String>,
}

/// Implemented outside this workspace by whatever parses the user's kubeconfig file(s).
pub trait KubeconfigSource: Send + Sync {
    fn contexts(&self) -> Vec<KubeconfigEntry>;
    fn current_context(&self) -> Option<String>;
}

/// One CRD's worth of discovery metadata plus its declared printer columns. The core treats
/// this as opaque data -- it never hard-codes anything about a specific custom kind.
#[derive(Clone, Debug)]
pub struct ResourceDefinition {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub kind: String,
    pub namespaced: bool,
    pub printer_columns: Vec<PrinterColumnSpec>,
}

impl ResourceDefinition {
    pub fn gvk(&self) -> GVK {
        GVK::new(&self.group, &self.version, &self.kind)
    }
}

/// Implemented outside this workspace by whatever discovers/tracks CRDs (e.g. by watching
/// `CustomResourceDefinition` objects, or reading a static list passed on the CLI).
pub trait ResourceDefinitionSource: Send + Sync {
    fn definitions(&self) -> Vec<ResourceDefinition>;
}

/// Implemented outside this workspace by whatever turns a kubeconfig context name into a
/// connected `kube::Client` (rate limiting, exec/auth plugins, proxying); the pool only needs
/// the result.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn client_for(&self, context_name: &str) -> anyhow::Result<kube::Client>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_definition_gvk() {
        let def = ResourceDefinition {
            group: "example.com".into(),
            version: "v1".into(),
            resource: "widgets".into(),
            kind: "Widget".into(),
            namespaced: true,
            printer_columns: vec![],
        };
        assert_eq!(def.gvk(), GVK::new("example.com", "v1", "Widget"));
    }
}
