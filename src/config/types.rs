//! Configuration type definitions.
//!
//! This module contains all the data structures used in weft configuration
//! files. These types are pure data - no I/O or complex logic. Every field
//! has a default so an empty (or absent) `weft.yaml` yields a fully usable
//! configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resolve::Format;

// =============================================================================
// Top-level config
// =============================================================================

/// The effective build/serve configuration.
///
/// Constructed once by [`Config::load`](super::Config::load) (defaults
/// deep-merged with the user's `weft.yaml`) and shared read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Glob patterns describing the build inputs, relative to the project.
    #[serde(default = "default_input")]
    pub input: Vec<String>,

    /// Source root directory (templates, styles, scripts, data live here).
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Output directory for built files.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub styles: StylesConfig,

    #[serde(default)]
    pub emails: EmailsConfig,

    /// Development-specific settings (watch mode, live reload).
    #[serde(default)]
    pub dev: DevConfig,
}

fn default_input() -> Vec<String> {
    vec![
        "src/views/**/*.html".to_string(),
        "src/views/**/*.latte".to_string(),
        "src/views/**/*.twig".to_string(),
        "src/views/**/*.json".to_string(),
        "src/styles/**/*.css".to_string(),
        "src/scripts/**/*.js".to_string(),
    ]
}

fn default_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_output() -> PathBuf {
    PathBuf::from("public")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: default_input(),
            root: default_root(),
            output: default_output(),
            server: ServerConfig::default(),
            templates: TemplatesConfig::default(),
            styles: StylesConfig::default(),
            emails: EmailsConfig::default(),
            dev: DevConfig::default(),
        }
    }
}

// =============================================================================
// Server configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The address the dev server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The port the dev server binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Open the site in the default browser when serving.
    #[serde(default)]
    pub open: bool,

    /// Serve over TLS when a certificate pair is available.
    #[serde(default)]
    pub https: bool,

    /// Certificate basename: the pair is expected at `~/.ssh/<cert>.pem`
    /// and `~/.ssh/<cert>-key.pem`.
    #[serde(default = "default_cert")]
    pub cert: String,

    /// Shell commands run after each detected source change.
    #[serde(default)]
    pub run: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cert() -> String {
    "localhost".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: false,
            https: false,
            cert: default_cert(),
            run: vec![],
        }
    }
}

// =============================================================================
// Template configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    /// The preferred template format. Per-request resolution still probes
    /// every format; this drives scaffolding and missing-engine warnings.
    /// Set to `~` to disable the preference entirely.
    #[serde(default = "default_format")]
    pub format: Option<Format>,

    /// Extra resolved-path prefixes that respond with `application/json`
    /// (the reserved `/views/dialog` prefix always does).
    #[serde(default)]
    pub content_type_json: Vec<String>,

    /// Free-form options passed to the latte renderer.
    #[serde(default = "empty_options")]
    pub latte: serde_json::Value,

    /// Free-form options passed to the twig engine.
    #[serde(default = "empty_options")]
    pub twig: serde_json::Value,
}

fn default_format() -> Option<Format> {
    Some(Format::Latte)
}

fn empty_options() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            content_type_json: vec![],
            latte: empty_options(),
            twig: empty_options(),
        }
    }
}

// =============================================================================
// Style configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StylesConfig {
    /// Route stylesheets through the Tailwind CLI when it is installed.
    #[serde(default = "default_tailwindcss")]
    pub tailwindcss: bool,
}

fn default_tailwindcss() -> bool {
    true
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            tailwindcss: default_tailwindcss(),
        }
    }
}

// =============================================================================
// Email configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailsConfig {
    /// When set, built email templates (`views/emails`) are copied here.
    #[serde(default)]
    pub dist_dir: Option<PathBuf>,
}

// =============================================================================
// Development configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevConfig {
    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// Enable live reload in the browser when files change (default: true)
    #[serde(default = "default_live_reload")]
    pub live_reload: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            live_reload: true,
        }
    }
}

fn default_live_reload() -> bool {
    true
}

/// Configuration for file watching during development.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Use polling-based watcher instead of native file system events.
    /// Useful for network filesystems, Docker volumes, or other situations
    /// where native events are unreliable.
    #[serde(default)]
    pub poll: bool,

    /// Poll interval in milliseconds (only used if poll=true).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}
