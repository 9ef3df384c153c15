use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::errors::ConfigError;

/// Runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Root path prefix for synthesized load URLs (default: empty)
    pub base: String,

    /// Emit resolution-step debug events (default: false)
    pub debug: bool,
}

impl Config {
    /// Keys accepted by [`Config::apply`]; everything else is discarded
    pub const KEYS: &'static [&'static str] = &["base", "debug"];

    /// Merge `options` into this configuration.
    ///
    /// Unknown keys and values of the wrong type are skipped; each skip is
    /// returned so the caller can report it.
    pub fn apply(&mut self, options: &Value) -> Vec<ConfigError> {
        let Some(map) = options.as_object() else {
            return vec![ConfigError::InvalidValue {
                key: "options".to_string(),
                expected: "object",
            }];
        };

        let mut rejected = Vec::new();

        for (key, value) in map {
            match key.as_str() {
                "base" => match value.as_str() {
                    Some(base) => self.base = base.to_string(),
                    None => rejected.push(ConfigError::InvalidValue {
                        key: key.clone(),
                        expected: "string",
                    }),
                },
                "debug" => match value.as_bool() {
                    Some(debug) => self.debug = debug,
                    None => rejected.push(ConfigError::InvalidValue {
                        key: key.clone(),
                        expected: "boolean",
                    }),
                },
                _ => rejected.push(ConfigError::Rejected { key: key.clone() }),
            }
        }

        rejected
    }

    /// `base` with a trailing `/`, or empty when no base is set
    pub fn base_prefix(&self) -> String {
        if self.base.is_empty() || self.base.ends_with('/') {
            self.base.clone()
        } else {
            format!("{}/", self.base)
        }
    }

    /// Read raw options from a JSON or YAML file (chosen by extension).
    ///
    /// The result is meant for [`Config::apply`], so unknown keys in the file
    /// go through the same whitelist as runtime options.
    pub fn read_options(path: &Path) -> Result<Value, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }
}
