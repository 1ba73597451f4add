mod kinds;
mod printer_columns;
mod transform;

use std::collections::BTreeMap;

pub use kinds::*;
pub use printer_columns::{
    PrinterColumnSpec,
    evaluate_printer_columns,
};
pub use transform::*;

/// The metadata every typed record carries, regardless of kind. Composition stands in for the
/// inheritance a typed-record hierarchy would use in a language that has it.
#[derive(Clone, Debug, Default)]
pub struct ResourceMetadata {
    pub uid: String,
    pub name: String,
    pub namespace: Option<String>,
    pub created_at: i64,
    pub resource_version: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub owner_uids: Vec<String>,
}

impl ResourceMetadata {
    pub fn namespaced_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Implemented by every typed record so generic code (sorting, age display) doesn't need to
/// know the concrete kind.
pub trait HasMetadata {
    fn metadata(&self) -> &ResourceMetadata;

    fn namespaced_name(&self) -> String {
        self.metadata().namespaced_name()
    }

    fn age_secs(&self, now: i64) -> i64 {
        now - self.metadata().created_at
    }
}

/// A concrete typed record stored in a `ResourceCache`.
pub trait TypedRecord: HasMetadata + Clone + std::fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> ResourceKind;
}
