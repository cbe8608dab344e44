//! Config module - Manages wdlcm cell configuration (wdlcm.toml).
//!
//! Configuration file contains one table per cell, plus an optional
//! `[DEFAULT]` table used when a cell omits a key:
//!
//! ```toml
//! [DEFAULT]
//! find_endpoint = "http://warp10.internal:8080/api/v0/find"
//!
//! [production]
//! fetch_endpoint = "http://warp10-prod:8080/api/v0/fetch"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the fallback section in the config file.
pub const DEFAULT_SECTION: &str = "DEFAULT";

const DEFAULT_FIND_ENDPOINT: &str = "http://127.0.0.1:8080/api/v0/find";
const DEFAULT_FETCH_ENDPOINT: &str = "http://127.0.0.1:8080/api/v0/fetch";
const DEFAULT_UPDATE_ENDPOINT: &str = "http://127.0.0.1:8080/api/v0/update";
const DEFAULT_DELETE_ENDPOINT: &str = "http://127.0.0.1:8080/api/v0/delete";
const DEFAULT_META_ENDPOINT: &str = "http://127.0.0.1:8080/api/v0/meta";

/// One table of the config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SectionToml {
    find_endpoint: Option<String>,
    fetch_endpoint: Option<String>,
    update_endpoint: Option<String>,
    delete_endpoint: Option<String>,
    meta_endpoint: Option<String>,
}

/// A named target deployment with its resolved endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Section name in the config file
    pub name: String,
    /// Endpoint used by `find`
    pub find_endpoint: String,
    /// Endpoint used by `fetch`
    pub fetch_endpoint: String,
    /// Endpoint for data ingestion (resolved for completeness, unused by lifecycle commands)
    pub update_endpoint: String,
    /// Endpoint used by `delete_older` and `delete_all`
    pub delete_endpoint: String,
    /// Endpoint receiving attribute updates from `mark_empty`
    pub meta_endpoint: String,
}

impl Cell {
    /// Built-in defaults pointing at a local Warp 10 instance.
    fn builtin(name: &str) -> Self {
        Self {
            name: name.to_string(),
            find_endpoint: DEFAULT_FIND_ENDPOINT.to_string(),
            fetch_endpoint: DEFAULT_FETCH_ENDPOINT.to_string(),
            update_endpoint: DEFAULT_UPDATE_ENDPOINT.to_string(),
            delete_endpoint: DEFAULT_DELETE_ENDPOINT.to_string(),
            meta_endpoint: DEFAULT_META_ENDPOINT.to_string(),
        }
    }

    /// Overlay a config section on top of `base`, keeping base values for missing keys.
    fn overlay(name: &str, base: &Cell, section: &SectionToml) -> Result<Self> {
        let pick = |key: &str, value: &Option<String>, fallback: &str| -> Result<String> {
            match value {
                Some(url) => {
                    reqwest::Url::parse(url)
                        .with_context(|| format!("Invalid URL for {}.{}: {}", name, key, url))?;
                    Ok(url.clone())
                }
                None => Ok(fallback.to_string()),
            }
        };

        Ok(Self {
            name: name.to_string(),
            find_endpoint: pick("find_endpoint", &section.find_endpoint, &base.find_endpoint)?,
            fetch_endpoint: pick("fetch_endpoint", &section.fetch_endpoint, &base.fetch_endpoint)?,
            update_endpoint: pick(
                "update_endpoint",
                &section.update_endpoint,
                &base.update_endpoint,
            )?,
            delete_endpoint: pick(
                "delete_endpoint",
                &section.delete_endpoint,
                &base.delete_endpoint,
            )?,
            meta_endpoint: pick("meta_endpoint", &section.meta_endpoint, &base.meta_endpoint)?,
        })
    }
}

/// Resolved wdlcm configuration. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Config {
    defaults: Cell,
    cells: BTreeMap<String, Cell>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: Cell::builtin(DEFAULT_SECTION),
            cells: BTreeMap::new(),
        }
    }
}

/// Get default config directory path (~/.config/wdlcm/)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("wdlcm"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get default config file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("wdlcm.toml")
}

impl Config {
    /// Parse and resolve config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut sections: BTreeMap<String, SectionToml> =
            toml::from_str(content).context("Cannot parse cell configuration")?;

        let builtin = Cell::builtin(DEFAULT_SECTION);
        let defaults = match sections.remove(DEFAULT_SECTION) {
            Some(section) => Cell::overlay(DEFAULT_SECTION, &builtin, &section)?,
            None => builtin,
        };

        let cells = sections
            .iter()
            .map(|(name, section)| {
                Cell::overlay(name, &defaults, section).map(|cell| (name.clone(), cell))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self { defaults, cells })
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Cannot load config file: {}", path.display()))
    }

    /// Load config from default path, falling back to built-in defaults
    pub fn load_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Look up a cell by name. `DEFAULT` resolves to the fallback endpoints.
    pub fn cell(&self, name: &str) -> Option<&Cell> {
        if name == DEFAULT_SECTION {
            return Some(&self.defaults);
        }
        self.cells.get(name)
    }

    /// Names of the configured cells (excluding `DEFAULT`), sorted.
    pub fn cell_names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}
