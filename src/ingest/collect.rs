use serde_json::Value;

#[derive(Debug, Default)]
pub struct Collected {
    pub findings: Vec<Value>,
    pub access_entries: Vec<Value>,
}

pub fn collect(roots: &[Value]) -> Collected {
    let mut out = Collected::default();
    for root in roots {
        let before = out.findings.len();
        walk(root, &mut out);
        // Legacy bare-array reports: a top-level array with no
        // finding-shaped node anywhere is itself the findings list.
        if out.findings.len() == before {
            if let Value::Array(items) = root {
                out.findings.extend(items.iter().cloned());
            }
        }
    }
    out
}

fn walk(value: &Value, out: &mut Collected) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Value::Object(map) => {
            if map.contains_key("rule") && map.contains_key("finding") {
                out.findings.push(value.clone());
            }
            let mut harvested_findings = false;
            let mut harvested_access = false;
            if let Some(Value::Array(items)) = map.get("findings") {
                out.findings.extend(items.iter().cloned());
                harvested_findings = true;
            }
            if let Some(Value::Array(items)) = map.get("access_map") {
                out.access_entries.extend(items.iter().cloned());
                harvested_access = true;
            }
            for (key, nested) in map {
                if harvested_findings && key == "findings" {
                    continue;
                }
                if harvested_access && key == "access_map" {
                    continue;
                }
                walk(nested, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_findings_array_at_root() {
        let root = json!({"findings": [{"rule": {"id": "R1"}}, {"rule": {"id": "R2"}}]});
        let out = collect(&[root]);
        assert_eq!(out.findings.len(), 2);
        assert!(out.access_entries.is_empty());
    }

    #[test]
    fn finds_findings_array_nested_arbitrarily_deep() {
        let root = json!({
            "meta": {"tool": "scanner"},
            "wrapper": {"inner": [{"payload": {"findings": [{"rule": {"id": "R1"}}]}}]}
        });
        let out = collect(&[root]);
        assert_eq!(out.findings.len(), 1);
    }

    #[test]
    fn recognizes_rule_and_finding_shaped_node() {
        let root = json!({
            "results": [
                {"rule": {"id": "R1"}, "finding": {"path": "a"}},
                {"rule": {"id": "R2"}, "finding": {"path": "b"}}
            ]
        });
        let out = collect(&[root]);
        assert_eq!(out.findings.len(), 2);
    }

    #[test]
    fn harvested_findings_array_elements_are_not_double_counted() {
        let root = json!({
            "findings": [{"rule": {"id": "R1"}, "finding": {"path": "a"}}]
        });
        let out = collect(&[root]);
        assert_eq!(out.findings.len(), 1);
    }

    #[test]
    fn harvests_access_map_entries() {
        let root = json!({
            "findings": [],
            "access_map": [{"provider": "aws"}, {"provider": "gcp"}]
        });
        let out = collect(&[root]);
        assert!(out.findings.is_empty());
        assert_eq!(out.access_entries.len(), 2);
    }

    #[test]
    fn bare_array_root_falls_back_to_top_level_elements() {
        let root = json!([{"rule_id": "R1"}, {"rule_id": "R2"}]);
        let out = collect(&[root]);
        assert_eq!(out.findings.len(), 2);
    }

    #[test]
    fn bare_array_fallback_is_skipped_when_traversal_found_findings() {
        let root = json!([
            {"rule": {"id": "R1"}, "finding": {"path": "a"}},
            {"unrelated": true}
        ]);
        let out = collect(&[root]);
        assert_eq!(out.findings.len(), 1);
    }

    #[test]
    fn concatenates_across_multiple_roots_in_order() {
        let a = json!({"findings": [{"rule_id": "R1"}]});
        let b = json!({"findings": [{"rule_id": "R2"}]});
        let out = collect(&[a, b]);
        assert_eq!(out.findings.len(), 2);
        assert_eq!(out.findings[0]["rule_id"], "R1");
        assert_eq!(out.findings[1]["rule_id"], "R2");
    }

    #[test]
    fn non_array_findings_attribute_is_ignored() {
        let root = json!({"findings": "not an array"});
        let out = collect(&[root]);
        assert!(out.findings.is_empty());
    }
}
