use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::query::SortField;

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub query: QueryConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryConfig {
    pub page_size: usize,
    pub sort_field: SortField,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_table_rows: 25,
            },
            query: QueryConfig {
                page_size: 25,
                sort_field: SortField::RuleId,
            },
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    query: Option<RawQueryConfig>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawQueryConfig {
    page_size: Option<usize>,
    sort_field: Option<String>,
}

pub fn effective_home_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home))
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/scanview/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s).context("Failed to parse config file (TOML)")?;
        apply_raw_config(&mut cfg, raw)?;
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) -> Result<()> {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(query) = raw.query {
        if let Some(page_size) = query.page_size {
            cfg.query.page_size = page_size;
        }
        if let Some(sort_field) = query.sort_field {
            cfg.query.sort_field = parse_sort_field(&sort_field).context("query.sort_field")?;
        }
    }

    Ok(())
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("SCANVIEW_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "SCANVIEW_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("SCANVIEW_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .with_context(|| "SCANVIEW_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("SCANVIEW_QUERY_PAGE_SIZE") {
        cfg.query.page_size = v
            .trim()
            .parse::<usize>()
            .with_context(|| "SCANVIEW_QUERY_PAGE_SIZE")?;
    }
    if let Ok(v) = std::env::var("SCANVIEW_QUERY_SORT_FIELD") {
        cfg.query.sort_field = parse_sort_field(&v).with_context(|| "SCANVIEW_QUERY_SORT_FIELD")?;
    }

    Ok(())
}

fn parse_sort_field(s: &str) -> Result<SortField> {
    <SortField as clap::ValueEnum>::from_str(s.trim(), true).map_err(anyhow::Error::msg)
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "Invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
