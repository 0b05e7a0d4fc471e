use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{config::default_supported_chains, ChainInfo, ControllerConfig};
use serde::Deserialize;
use shared::domain::ChainId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub app_name: String,
    pub project_id: Option<String>,
    pub required_chain_id: u64,
    pub confirmation_delay_ms: u64,
    pub supported_chains: Vec<ChainInfo>,
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = ControllerConfig::default();
        Self {
            app_name: defaults.app_name,
            project_id: defaults.project_id,
            required_chain_id: defaults.required_chain_id.0,
            confirmation_delay_ms: defaults.confirmation_delay.as_millis() as u64,
            supported_chains: default_supported_chains(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    app_name: Option<String>,
    project_id: Option<String>,
    required_chain_id: Option<u64>,
    confirmation_delay_ms: Option<u64>,
    chains: Option<Vec<ChainInfo>>,
}

impl Settings {
    pub fn into_controller_config(self) -> ControllerConfig {
        ControllerConfig {
            app_name: self.app_name,
            project_id: self.project_id,
            required_chain_id: ChainId(self.required_chain_id),
            supported_chains: self.supported_chains,
            confirmation_delay: Duration::from_millis(self.confirmation_delay_ms),
        }
    }
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.app_name {
        settings.app_name = v;
    }
    if let Some(v) = file_cfg.project_id {
        settings.project_id = Some(v);
    }
    if let Some(v) = file_cfg.required_chain_id {
        settings.required_chain_id = v;
    }
    if let Some(v) = file_cfg.confirmation_delay_ms {
        settings.confirmation_delay_ms = v;
    }
    if let Some(v) = file_cfg.chains {
        settings.supported_chains = v;
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__APP_NAME") {
        settings.app_name = v;
    }

    if let Some(v) = lookup("WALLETCONNECT_PROJECT_ID") {
        settings.project_id = Some(v);
    }
    if let Some(v) = lookup("APP__PROJECT_ID") {
        settings.project_id = Some(v);
    }

    if let Some(v) = lookup("APP__REQUIRED_CHAIN_ID") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.required_chain_id = parsed;
        }
    }

    if let Some(v) = lookup("APP__CONFIRMATION_DELAY_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.confirmation_delay_ms = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
