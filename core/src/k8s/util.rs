use std::collections::BTreeMap;

use kube::api::Resource;

use super::*;
use crate::errors::*;
use crate::prelude::*;

pub fn split_namespaced_name(name: &str) -> (String, String) {
    match name.split_once('/') {
        Some((namespace, name)) => (namespace.into(), name.into()),
        None => ("".into(), name.into()),
    }
}

impl<T: Resource> KubeResourceExt for T {
    fn namespaced_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any().clone(),
        }
    }

    fn matches(&self, sel: &metav1::LabelSelector) -> anyhow::Result<bool> {
        if let Some(exprs) = &sel.match_expressions {
            for expr in exprs {
                if !label_expr_match(self.labels(), expr)? {
                    return Ok(false);
                }
            }
        }

        if let Some(labels) = &sel.match_labels {
            for (k, v) in labels {
                if self.labels().get(k) != Some(v) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

// The meanings of these operators is explained here:
// https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/#set-based-requirement
pub(super) const OPERATOR_IN: &str = "In";
pub(super) const OPERATOR_NOT_IN: &str = "NotIn";
pub(super) const OPERATOR_EXISTS: &str = "Exists";
pub(super) const OPERATOR_DOES_NOT_EXIST: &str = "DoesNotExist";

fn label_expr_match(
    obj_labels: &BTreeMap<String, String>,
    expr: &metav1::LabelSelectorRequirement,
) -> anyhow::Result<bool> {
    // LabelSelectorRequirement is considered invalid if the Operator is "In" or NotIn"
    // and there are no values; conversely for "Exists" and "DoesNotExist".
    match expr.operator.as_str() {
        OPERATOR_IN => match obj_labels.get(&expr.key) {
            Some(v) => match &expr.values {
                Some(values) if !values.is_empty() => Ok(values.contains(v)),
                _ => bail!(KubernetesError::malformed_label_selector(expr)),
            },
            None => Ok(false),
        },
        OPERATOR_NOT_IN => match obj_labels.get(&expr.key) {
            Some(v) => match &expr.values {
                Some(values) if !values.is_empty() => Ok(!values.contains(v)),
                _ => bail!(KubernetesError::malformed_label_selector(expr)),
            },
            None => Ok(true),
        },
        OPERATOR_EXISTS => match &expr.values {
            Some(values) if !values.is_empty() => bail!(KubernetesError::malformed_label_selector(expr)),
            _ => Ok(obj_labels.contains_key(&expr.key)),
        },
        OPERATOR_DOES_NOT_EXIST => match &expr.values {
            Some(values) if !values.is_empty() => {
                bail!(KubernetesError::malformed_label_selector(expr));
            },
            _ => Ok(!obj_labels.contains_key(&expr.key)),
        },
        _ => bail!("malformed label selector expression: {:?}", expr),
    }
}

#[cfg(test)]
mod test {
    use assertables::*;
    use rstest::*;

    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[rstest]
    #[case::in_match("In", Some(vec!["a".into(), "b".into()]), "a", true)]
    #[case::in_no_match("In", Some(vec!["b".into()]), "a", false)]
    #[case::not_in_match("NotIn", Some(vec!["b".into()]), "a", true)]
    #[case::not_in_no_match("NotIn", Some(vec!["a".into()]), "a", false)]
    fn test_label_expr_match(#[case] op: &str, #[case] values: Option<Vec<String>>, #[case] val: &str, #[case] expected: bool) {
        let obj_labels = labels(&[("tier", val)]);
        let expr = metav1::LabelSelectorRequirement { key: "tier".into(), operator: op.into(), values };
        assert_eq!(label_expr_match(&obj_labels, &expr).unwrap(), expected);
    }

    #[rstest]
    fn test_exists_requires_no_values() {
        let expr = metav1::LabelSelectorRequirement {
            key: "tier".into(),
            operator: OPERATOR_EXISTS.into(),
            values: Some(vec!["oops".into()]),
        };
        assert_err!(label_expr_match(&labels(&[("tier", "x")]), &expr));
    }

    #[rstest]
    fn test_does_not_exist() {
        let expr = metav1::LabelSelectorRequirement {
            key: "tier".into(),
            operator: OPERATOR_DOES_NOT_EXIST.into(),
            values: None,
        };
        assert_ok!(label_expr_match(&labels(&[]), &expr));
        assert!(label_expr_match(&labels(&[]), &expr).unwrap());
        assert!(!label_expr_match(&labels(&[("tier", "x")]), &expr).unwrap());
    }
}
