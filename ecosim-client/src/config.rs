use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ecosim_core::sampler::DEFAULT_SAMPLE_CAP;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Client settings. Built-in defaults are overridden by an optional TOML file,
/// which is in turn overridden by `ECOSIM_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the prediction service, without the `/predict` path
    pub api_url: String,
    pub timeout_secs: u64,
    /// Headered CSV the map sample is drawn from
    pub dataset_path: PathBuf,
    pub sample_cap: usize,
    /// Directory holding the persisted history slot
    pub history_dir: PathBuf,
    pub history_max_len: Option<usize>,
    /// Answer predictions locally instead of calling the service
    pub simulate: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            dataset_path: PathBuf::from("train_clean.csv"),
            sample_cap: DEFAULT_SAMPLE_CAP,
            history_dir: PathBuf::from(".ecosim"),
            history_max_len: None,
            simulate: false,
        }
    }
}

impl ClientConfig {
    /// Defaults, then `file` if given, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment-style variables looked up by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ECOSIM_API_URL") {
            self.api_url = url;
        }
        if let Some(secs) = parse_var(&lookup, "ECOSIM_TIMEOUT_SECS")? {
            self.timeout_secs = secs;
        }
        if let Some(path) = lookup("ECOSIM_DATASET") {
            self.dataset_path = PathBuf::from(path);
        }
        if let Some(cap) = parse_var(&lookup, "ECOSIM_SAMPLE_CAP")? {
            self.sample_cap = cap;
        }
        if let Some(dir) = lookup("ECOSIM_HISTORY_DIR") {
            self.history_dir = PathBuf::from(dir);
        }
        if let Some(max) = parse_var(&lookup, "ECOSIM_HISTORY_MAX")? {
            self.history_max_len = Some(max);
        }
        if let Some(simulate) = parse_var(&lookup, "ECOSIM_SIMULATE")? {
            self.simulate = simulate;
        }
        Ok(())
    }

    /// Full URL of the prediction endpoint.
    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.api_url.trim().trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
}
