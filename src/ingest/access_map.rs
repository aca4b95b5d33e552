use serde_json::Value;

use crate::core::{AccessGroup, AccessMapEntry, AccessMapRow};
use crate::ingest::scalar_to_string;

pub fn normalize(raw_entries: &[Value]) -> Vec<AccessMapEntry> {
    // Schema detection is all-or-nothing over the whole sequence: one
    // grouped-shaped entry switches every entry to grouped normalization.
    let grouped = raw_entries
        .iter()
        .any(|entry| matches!(entry.get("groups"), Some(Value::Array(_))));

    raw_entries
        .iter()
        .map(|entry| {
            if grouped {
                normalize_grouped(entry)
            } else {
                normalize_legacy(entry)
            }
        })
        .collect()
}

pub fn flatten(entries: &[AccessMapEntry]) -> Vec<AccessMapRow> {
    let mut rows = Vec::new();
    for entry in entries {
        for group in &entry.groups {
            for resource in &group.resources {
                rows.push(AccessMapRow {
                    provider: entry.provider.clone(),
                    account: entry.account.clone(),
                    fingerprint: entry.fingerprint.clone(),
                    resource: resource.clone(),
                    permissions: group.permissions.clone(),
                });
            }
        }
    }
    rows
}

fn normalize_grouped(entry: &Value) -> AccessMapEntry {
    let groups = match entry.get("groups") {
        Some(Value::Array(items)) => items.iter().map(normalize_group).collect(),
        _ => Vec::new(),
    };
    AccessMapEntry {
        provider: scalar_field(entry, "provider"),
        account: scalar_field(entry, "account"),
        fingerprint: scalar_field(entry, "fingerprint"),
        groups,
    }
}

fn normalize_group(group: &Value) -> AccessGroup {
    AccessGroup {
        resources: string_seq(group.get("resources")),
        permissions: string_seq(group.get("permissions")),
    }
}

fn normalize_legacy(entry: &Value) -> AccessMapEntry {
    let resources = match entry.get("resource").and_then(scalar_to_string) {
        Some(resource) => vec![resource],
        None => Vec::new(),
    };

    let permissions = match entry.get("permissions") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        _ => match entry.get("permission").and_then(scalar_to_string) {
            Some(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        },
    };

    AccessMapEntry {
        provider: scalar_field(entry, "provider"),
        account: scalar_field(entry, "account"),
        fingerprint: scalar_field(entry, "fingerprint"),
        groups: vec![AccessGroup {
            resources,
            permissions,
        }],
    }
}

fn scalar_field(entry: &Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(scalar_to_string)
        .unwrap_or_default()
}

fn string_seq(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    }
}
