use std::sync::OnceLock;

use kube::api::DynamicObject;
use serde_json::Value;

use crate::errors::TransformError;

/// One `additionalPrinterColumns` entry from a CRD, e.g. `{name: "Phase", jsonPath:
/// ".status.phase", priority: 0}`. `json_path` only supports the dotted-field/bracketed-index
/// subset kubectl itself relies on for printer columns, not full JSONPath filter expressions.
#[derive(Debug)]
pub struct PrinterColumnSpec {
    pub name: String,
    pub json_path: String,
    pub priority: i32,
    parsed: OnceLock<Vec<PathSegment>>,
}

impl PrinterColumnSpec {
    pub fn new(name: impl Into<String>, json_path: impl Into<String>, priority: i32) -> PrinterColumnSpec {
        PrinterColumnSpec { name: name.into(), json_path: json_path.into(), priority, parsed: OnceLock::new() }
    }

    fn path(&self) -> &[PathSegment] {
        self.parsed.get_or_init(|| parse_json_path(&self.json_path).unwrap_or_default())
    }
}

impl Clone for PrinterColumnSpec {
    fn clone(&self) -> Self {
        // Deliberately don't carry the cached parse over; it's cheap to redo and OnceLock
        // itself isn't Clone.
        PrinterColumnSpec::new(self.name.clone(), self.json_path.clone(), self.priority)
    }
}

#[derive(Debug, Clone)]
enum PathSegment {
    Field(String),
    Index(usize),
}

fn parse_json_path(path: &str) -> Result<Vec<PathSegment>, TransformError> {
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Ok(vec![]);
    }

    let mut segments = vec![];
    for part in path.split('.') {
        let mut rest = part;
        while let Some(open) = rest.find('[') {
            let field = &rest[..open];
            if !field.is_empty() {
                segments.push(PathSegment::Field(field.into()));
            }
            let close = rest[open..]
                .find(']')
                .ok_or_else(|| TransformError::BadJsonPath(path.into()))?
                + open;
            let idx: usize = rest[open + 1..close]
                .parse()
                .map_err(|_| TransformError::BadJsonPath(path.into()))?;
            segments.push(PathSegment::Index(idx));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(PathSegment::Field(rest.into()));
        }
    }
    Ok(segments)
}

fn walk<'a>(value: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut cur = value;
    for seg in segments {
        cur = match (seg, cur) {
            (PathSegment::Field(f), Value::Object(map)) => map.get(f)?,
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Missing keys and evaluation failures render as an empty string, not `"<none>"` -- that
/// fallback is for the human-readable typed fields elsewhere, not printer columns.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn evaluate_printer_columns(obj: &DynamicObject, columns: &[PrinterColumnSpec]) -> Vec<(String, String)> {
    columns
        .iter()
        .map(|col| {
            let rendered = walk(&obj.data, col.path()).map(render).unwrap_or_default();
            (col.name.clone(), rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use kubemirror_core::prelude::*;
    use rstest::*;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn test_simple_field() {
        let col = PrinterColumnSpec::new("Phase", ".status.phase", 0);
        let obj = DynamicObject::new("x", &kube::discovery::ApiResource::erase::<corev1::Pod>(&()))
            .data(json!({"status": {"phase": "Running"}}));
        assert_eq!(evaluate_printer_columns(&obj, &[col]), vec![("Phase".to_string(), "Running".to_string())]);
    }

    #[rstest]
    fn test_indexed_field() {
        let col = PrinterColumnSpec::new("Container", ".spec.containers[0].name", 0);
        let obj = DynamicObject::new("x", &kube::discovery::ApiResource::erase::<corev1::Pod>(&()))
            .data(json!({"spec": {"containers": [{"name": "app"}]}}));
        assert_eq!(evaluate_printer_columns(&obj, &[col]), vec![("Container".to_string(), "app".to_string())]);
    }

    #[rstest]
    fn test_missing_field_renders_empty_string() {
        let col = PrinterColumnSpec::new("Missing", ".status.missing", 0);
        let obj = DynamicObject::new("x", &kube::discovery::ApiResource::erase::<corev1::Pod>(&())).data(json!({}));
        assert_eq!(evaluate_printer_columns(&obj, &[col]), vec![("Missing".to_string(), "".to_string())]);
    }

    #[rstest]
    fn test_null_field_renders_empty_string() {
        let col = PrinterColumnSpec::new("Phase", ".status.phase", 0);
        let obj = DynamicObject::new("x", &kube::discovery::ApiResource::erase::<corev1::Pod>(&()))
            .data(json!({"status": {"phase": null}}));
        assert_eq!(evaluate_printer_columns(&obj, &[col]), vec![("Phase".to_string(), "".to_string())]);
    }

    #[rstest]
    fn test_caches_parsed_path() {
        let col = PrinterColumnSpec::new("Phase", ".status.phase", 0);
        let obj = DynamicObject::new("x", &kube::discovery::ApiResource::erase::<corev1::Pod>(&()))
            .data(json!({"status": {"phase": "Running"}}));
        evaluate_printer_columns(&obj, &[col.clone()]);
        // second call re-parses on the clone (OnceLock isn't shared across clones), but both
        // still resolve to the same path
        assert_eq!(evaluate_printer_columns(&obj, &[col]), vec![("Phase".to_string(), "Running".to_string())]);
    }
}
