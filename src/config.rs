use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::DispatchMode;
use crate::error::MirrorError;

pub const DEFAULT_CONFIG_FILE: &str = "xkcd-mirror.json";
pub const DEFAULT_ARCHIVE_ROOT: &str = "./xkcdDB/";
pub const DEFAULT_BASE_URL: &str = "https://xkcd.com/";
pub const DEFAULT_JSON_FILE: &str = "info.0.json";
pub const DEFAULT_RATE_LIMIT: usize = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// xkcd never published #404.
pub const DEFAULT_KNOWN_ABSENT: &[u32] = &[404];

/// On-disk config file; every key is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub archive_root: Option<String>,
    #[serde(default)]
    pub rate_limit: Option<usize>,
    #[serde(default)]
    pub dispatch: Option<DispatchMode>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub json_file: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub known_absent: Option<Vec<u32>>,
}

/// Values supplied on the command line, applied over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub archive_root: Option<String>,
    pub rate_limit: Option<usize>,
    pub dispatch: Option<DispatchMode>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub archive_root: Utf8PathBuf,
    pub rate_limit: usize,
    pub dispatch: DispatchMode,
    pub base_url: String,
    pub json_file: String,
    pub timeout_secs: u64,
    pub known_absent: Vec<u32>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            archive_root: Utf8PathBuf::from(DEFAULT_ARCHIVE_ROOT),
            rate_limit: DEFAULT_RATE_LIMIT,
            dispatch: DispatchMode::Pooled,
            base_url: DEFAULT_BASE_URL.to_string(),
            json_file: DEFAULT_JSON_FILE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            known_absent: DEFAULT_KNOWN_ABSENT.to_vec(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; the default file is optional.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<MirrorConfig, MirrorError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let file = if path.is_none() && !config_path.exists() {
            ConfigFile::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| MirrorError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| MirrorError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(file, overrides)
    }

    pub fn resolve_config(
        file: ConfigFile,
        overrides: ConfigOverrides,
    ) -> Result<MirrorConfig, MirrorError> {
        let defaults = MirrorConfig::default();
        let config = MirrorConfig {
            archive_root: overrides
                .archive_root
                .or(file.archive_root)
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.archive_root),
            rate_limit: overrides
                .rate_limit
                .or(file.rate_limit)
                .unwrap_or(defaults.rate_limit),
            dispatch: overrides
                .dispatch
                .or(file.dispatch)
                .unwrap_or(defaults.dispatch),
            base_url: overrides
                .base_url
                .or(file.base_url)
                .unwrap_or(defaults.base_url),
            json_file: file.json_file.unwrap_or(defaults.json_file),
            timeout_secs: overrides
                .timeout_secs
                .or(file.timeout_secs)
                .unwrap_or(defaults.timeout_secs),
            known_absent: file.known_absent.unwrap_or(defaults.known_absent),
        };
        config.validate()?;
        Ok(config)
    }
}

impl MirrorConfig {
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.archive_root.as_str().is_empty() {
            return Err(MirrorError::InvalidConfig(
                "archive root must not be empty".to_string(),
            ));
        }
        if self.rate_limit == 0 {
            return Err(MirrorError::InvalidConfig(
                "rate limit must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(MirrorError::InvalidConfig(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() || self.json_file.trim().is_empty() {
            return Err(MirrorError::InvalidConfig(
                "catalog endpoint must not be empty".to_string(),
            ));
        }
        if self.known_absent.contains(&0) {
            return Err(MirrorError::InvalidConfig(
                "known absent indices start at 1".to_string(),
            ));
        }
        Ok(())
    }
}
