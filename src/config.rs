// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://anchor.fm";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// One set of remote credentials and the local directory feeding it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub anchor_username: String,
    pub anchor_password: String,
    pub root_dir: PathBuf,
}

/// Parsed and validated configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub profiles: Vec<Profile>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds to wait between two polls of the remote processing state
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up polling after this many attempts (unbounded when absent)
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout, including upload bodies (none when absent)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl Config {
    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked before touching the network
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::Invalid("no profiles configured".to_string()));
        }

        for (index, profile) in self.profiles.iter().enumerate() {
            if profile.anchor_username.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "profile #{index}: anchorUsername is empty"
                )));
            }
            if profile.anchor_password.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "profile #{index}: anchorPassword is empty"
                )));
            }
            if profile.root_dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "profile #{index}: rootDir is empty"
                )));
            }
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("baseUrl '{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "baseUrl '{}' must be http or https",
                self.base_url
            )));
        }

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "pollIntervalSecs must be greater than zero".to_string(),
            ));
        }
        if self.max_poll_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "maxPollAttempts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
