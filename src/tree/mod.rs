use serde::Serialize;

use crate::core::AccessMapRow;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessTree {
    pub providers: Vec<ProviderNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderNode {
    pub name: String,
    pub accounts: Vec<AccountNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountNode {
    pub name: String,
    pub rows: Vec<AccessMapRow>,
}

impl AccessTree {
    pub fn row_count(&self) -> usize {
        self.providers
            .iter()
            .flat_map(|p| p.accounts.iter())
            .map(|a| a.rows.len())
            .sum()
    }
}

pub fn build(rows: &[AccessMapRow], search: &str) -> Option<AccessTree> {
    let needle = search.trim().to_lowercase();
    let mut providers: Vec<ProviderNode> = Vec::new();

    for row in rows {
        if !row_matches(row, &needle) {
            continue;
        }

        let provider_name = placeholder(&row.provider);
        let provider_idx = match providers.iter().position(|p| p.name == provider_name) {
            Some(idx) => idx,
            None => {
                providers.push(ProviderNode {
                    name: provider_name,
                    accounts: Vec::new(),
                });
                providers.len() - 1
            }
        };

        let account_name = placeholder(&row.account);
        let accounts = &mut providers[provider_idx].accounts;
        let account_idx = match accounts.iter().position(|a| a.name == account_name) {
            Some(idx) => idx,
            None => {
                accounts.push(AccountNode {
                    name: account_name,
                    rows: Vec::new(),
                });
                accounts.len() - 1
            }
        };

        accounts[account_idx].rows.push(row.clone());
    }

    if providers.is_empty() {
        return None;
    }
    Some(AccessTree { providers })
}

fn row_matches(row: &AccessMapRow, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {} {} {}",
        row.provider,
        row.account,
        row.resource,
        row.permissions.join(" ")
    )
    .to_lowercase();
    haystack.contains(needle)
}

fn placeholder(value: &str) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}
