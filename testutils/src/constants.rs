use kubemirror_core::k8s::GVK;
use lazy_static::lazy_static;

pub const TEST_NAMESPACE: &str = "test-namespace";
pub const TEST_NODE_NAME: &str = "test-node";
pub const TEST_CONTEXT: &str = "test-context";
pub const TEST_OWNER_UID: &str = "11111111-1111-1111-1111-111111111111";
pub const TEST_WIDGET_GROUP: &str = "example.com";

lazy_static! {
    pub static ref DEPL_GVK: GVK = GVK::new("apps", "v1", "Deployment");
    pub static ref WIDGET_GVK: GVK = GVK::new(TEST_WIDGET_GROUP, "v1", "Widget");
}
