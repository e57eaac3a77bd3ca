//! Configuration loading from files.
//!
//! The user's `weft.yaml` is a partial configuration: it is deserialized
//! into a generic value and deep-merged over the serialized defaults, so
//! mappings combine key-by-key while scalars and arrays are replaced. The
//! result is deserialized back into the typed [`Config`], which rejects
//! unknown keys instead of letting the shape drift silently.

use std::path::Path;

use super::{Config, ConfigError, merge_value};

impl Config {
    /// Load the config from the command line argument, defaulting to `weft.yaml`.
    ///
    /// A missing config file is not an error: the defaults already describe
    /// a complete project.
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = config_file.unwrap_or(Path::new("weft.yaml"));
        let config_file = if config_file.is_relative() {
            std::env::current_dir()
                .map_err(ConfigError::CwdFailure)?
                .join(config_file)
        } else {
            config_file.to_path_buf()
        };

        Self::load_from_file(&config_file)
    }

    /// Load the config from a file path, merging it over the defaults.
    pub(crate) fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;

        Self::from_yaml_str(&content)
    }

    /// Merge a YAML overrides document over the defaults.
    pub(crate) fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let overrides: serde_json::Value = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Validation(format!("failed to parse config: {e}")))?;

        // An empty file parses to null; treat it as "no overrides"
        if overrides.is_null() {
            return Ok(Self::default());
        }

        if !overrides.is_object() {
            return Err(ConfigError::Validation(
                "config must be a YAML mapping, not a scalar or array".to_string(),
            ));
        }

        let mut effective = serde_json::to_value(Self::default())
            .map_err(|e| ConfigError::Validation(format!("failed to encode defaults: {e}")))?;
        merge_value(&mut effective, overrides);

        serde_json::from_value(effective).map_err(|e| ConfigError::Validation(format_error(&e)))
    }
}

/// Format a config deserialization error with helpful context.
fn format_error(e: &serde_json::Error) -> String {
    let msg = e.to_string();

    if msg.contains("unknown field") {
        return format!(
            "invalid config: {msg}\n\nTop-level sections are: input, root, output, server, templates, styles, emails, dev"
        );
    }
    if msg.contains("unknown variant") {
        return format!(
            "invalid config: {msg}\n\n'templates.format' must be one of latte, twig, json (or ~ for none)"
        );
    }

    format!("invalid config: {msg}")
}
