// Well-known labels and annotations
pub const KUBERNETES_IO_METADATA_NAME_KEY: &str = "kubernetes.io/metadata.name";
pub const APP_KUBERNETES_IO_NAME_KEY: &str = "app.kubernetes.io/name";
pub const APP_KUBERNETES_IO_COMPONENT_KEY: &str = "app.kubernetes.io/component";

// Retry/backoff defaults shared by anything that talks to the apiserver
pub const RETRY_DELAY_SECONDS: u64 = 5;
pub const ERROR_RETRY_DELAY_SECONDS: u64 = 30;

#[cfg(feature = "testutils")]
mod test_constants {
    pub const TEST_NAMESPACE: &str = "test";
    pub const TEST_CONTEXT: &str = "test-context";
    pub const TEST_CLUSTER: &str = "test-cluster";
}

#[cfg(feature = "testutils")]
pub use test_constants::*;
