//! Persistent CLI settings: workspaces and aliases.

use anyhow::{Context, Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

use crate::http::RetryOptions;
use crate::runtime::Runtime;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "TABLECTL_CONFIG";

const CONFIG_DIR_NAME: &str = "tablectl";
const CONFIG_FILE_NAME: &str = "config.json";

/// A named connection: service URL, credentials and defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryOptions>,
}

/// Contents of the settings file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_workspace: Option<String>,
    #[serde(default)]
    pub workspaces: BTreeMap<String, Workspace>,
    /// Friendly name → entity id.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Location of the settings file: `$TABLECTL_CONFIG`, else
/// `<config dir>/tablectl/config.json`.
#[tracing::instrument(skip(runtime))]
pub fn default_config_path<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if let Ok(path) = runtime.env_var(CONFIG_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let config_dir = runtime
        .config_dir()
        .or_else(|| runtime.home_dir().map(|home| home.join(".config")))
        .context("Could not find a configuration directory")?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl Settings {
    /// Loads settings; a missing file yields empty settings.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = runtime.read_to_string(path)?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Writes settings through a temporary file so a crash never leaves a
    /// half-written file behind.
    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !runtime.exists(parent) {
                runtime.create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        runtime.write(&tmp, json.as_bytes())?;
        runtime.rename(&tmp, path)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Adds or replaces a workspace. The first workspace becomes current.
    pub fn add_workspace(&mut self, name: &str, workspace: Workspace) -> Result<()> {
        if name.trim().is_empty() {
            bail!("Workspace name must not be empty");
        }
        let url = Url::parse(&workspace.base_url)
            .with_context(|| format!("Invalid base URL: {}", workspace.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Base URL must use http or https: {}", workspace.base_url);
        }

        self.workspaces.insert(name.to_string(), workspace);
        if self.current_workspace.is_none() {
            self.current_workspace = Some(name.to_string());
        }
        Ok(())
    }

    pub fn remove_workspace(&mut self, name: &str) -> Result<Workspace> {
        let removed = self
            .workspaces
            .remove(name)
            .with_context(|| format!("Unknown workspace: {}", name))?;
        if self.current_workspace.as_deref() == Some(name) {
            self.current_workspace = None;
        }
        Ok(removed)
    }

    pub fn use_workspace(&mut self, name: &str) -> Result<()> {
        if !self.workspaces.contains_key(name) {
            bail!("Unknown workspace: {}", name);
        }
        self.current_workspace = Some(name.to_string());
        Ok(())
    }

    /// The named workspace, or the current one when `name` is `None`.
    pub fn workspace(&self, name: Option<&str>) -> Result<Option<(&str, &Workspace)>> {
        match name.or(self.current_workspace.as_deref()) {
            Some(name) => self
                .workspaces
                .get_key_value(name)
                .map(|(k, v)| Some((k.as_str(), v)))
                .with_context(|| format!("Unknown workspace: {}", name)),
            None => Ok(None),
        }
    }

    pub fn set_alias(&mut self, name: &str, id: &str) -> Result<()> {
        if name.trim().is_empty() || id.trim().is_empty() {
            bail!("Alias name and id must not be empty");
        }
        self.aliases.insert(name.to_string(), id.to_string());
        Ok(())
    }

    pub fn remove_alias(&mut self, name: &str) -> Result<String> {
        self.aliases
            .remove(name)
            .with_context(|| format!("Unknown alias: {}", name))
    }

    /// Maps an alias to its id; anything else is returned unchanged.
    pub fn resolve<'a>(&'a self, id_or_alias: &'a str) -> &'a str {
        self.aliases
            .get(id_or_alias)
            .map(String::as_str)
            .unwrap_or(id_or_alias)
    }
}
