// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine configuration.
//!
//! All sections are optional, missing values fall back to their defaults:
//!
//! ```toml
//! verbose_rights = false
//! selection_policy = "supersede"
//!
//! [noise]
//! skip_users = ["admin", "Administrator"]
//! skip_groups = ["Administrators", "Everyone"]
//! directory_groups = ["Domain Admins", "Domain Users"]
//!
//! [labels]
//! account_prefix = "BANK\\"
//! strip_segments = ["OU=Bank"]
//! ```
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::labels::LabelConfig;
use crate::noise::NoiseConfig;

/// What happens with a selection arriving while another one is still being computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Cancel the running computation and start the new one.
    #[default]
    Supersede,

    /// Ignore the new selection, the caller has to re-issue it later.
    DropWhileBusy,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub noise: NoiseConfig,
    pub labels: LabelConfig,

    /// List the finer rights bits in rights enumerations as well.
    pub verbose_rights: bool,

    pub selection_policy: SelectionPolicy,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;

    use crate::noise::NoiseConfig;

    use super::{Config, ConfigError, SelectionPolicy};

    #[test]
    fn empty_config_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.selection_policy, SelectionPolicy::Supersede);
        assert_eq!(config.noise, NoiseConfig::default());
    }

    #[test]
    fn partial_sections() {
        let config = Config::parse(
            r#"
            verbose_rights = true
            selection_policy = "drop_while_busy"

            [noise]
            skip_users = ["svc-backup"]

            [labels]
            account_prefix = 'BANK\'
            strip_segments = ["OU=Bank"]
            "#,
        )
        .unwrap();

        assert!(config.verbose_rights);
        assert_eq!(config.selection_policy, SelectionPolicy::DropWhileBusy);
        assert_eq!(config.noise.skip_users, vec!["svc-backup".to_string()]);
        // Lists which are not mentioned keep their defaults.
        assert_eq!(
            config.noise.skip_groups,
            NoiseConfig::default().skip_groups
        );
        assert_eq!(config.labels.account_prefix.as_deref(), Some("BANK\\"));
    }

    #[test]
    fn invalid_config() {
        assert_matches!(
            Config::parse("selection_policy = \"sometimes\""),
            Err(ConfigError::Parse(_))
        );
        assert_matches!(
            Config::from_file(Path::new("/does/not/exist.toml")),
            Err(ConfigError::Io { .. })
        );
    }
}
