//! Template engines and the startup capability probe.
//!
//! Optional tooling (the `latte` renderer binary, the `tailwindcss` CLI) is
//! probed exactly once at startup. A missing tool is recorded silently;
//! downstream code branches on the availability flag, and a user-visible
//! warning is printed only when the configuration actually requests the
//! feature.

mod json;
mod latte;
mod twig;

use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;

use crate::config::{Config, TemplatesConfig};
use crate::resolve::Format;

pub use latte::LatteEngine;
pub use twig::TwigEngine;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("failed to read template {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("invalid template glob: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to run latte renderer: {0}")]
    LatteSpawn(std::io::Error),

    #[error("latte renderer failed: {0}")]
    LatteFailed(String),

    #[error("no engine available for format '{0}'")]
    Unavailable(Format),
}

// =============================================================================
// Optional tool probe
// =============================================================================

/// Availability of the optional external tools, probed once at startup.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    /// Path to the `latte` renderer binary, if installed.
    pub latte: Option<PathBuf>,
    /// Path to the `tailwindcss` CLI, if installed.
    pub tailwind: Option<PathBuf>,
}

impl Toolchain {
    /// Probe `PATH` for the optional tools. Absence is not an error.
    pub fn probe() -> Self {
        Self {
            latte: which::which("latte").ok(),
            tailwind: which::which("tailwindcss").ok(),
        }
    }

    /// Warn about tools that are requested in the configuration but absent.
    pub fn warn_missing(&self, config: &Config) {
        if config.templates.format == Some(Format::Latte) && self.latte.is_none() {
            eprintln!(
                "{}",
                "latte renderer not found in PATH; .latte templates will not render".red()
            );
        }
        if config.styles.tailwindcss && self.tailwind.is_none() {
            eprintln!(
                "{}",
                "tailwindcss CLI not found in PATH; using the default style pipeline".red()
            );
        }
    }
}

// =============================================================================
// Engine registry
// =============================================================================

/// The set of registered template engines plus the shared data context.
///
/// Built once at startup (and rebuilt by the watcher when templates or data
/// change); request handling only reads it.
pub struct EngineRegistry {
    root: PathBuf,
    twig: TwigEngine,
    latte: Option<LatteEngine>,
    data: serde_json::Value,
}

impl EngineRegistry {
    /// Register the engines for every supported format.
    ///
    /// `twig` is always available (the engine is bundled); `latte` only when
    /// the probe found the renderer binary; `json` needs no engine.
    pub fn new(
        root: &Path,
        templates: &TemplatesConfig,
        toolchain: &Toolchain,
        data: serde_json::Value,
    ) -> Result<Self, EngineError> {
        let twig = TwigEngine::new(root, &templates.twig)?;
        let latte = toolchain
            .latte
            .clone()
            .map(|bin| LatteEngine::new(bin, templates.latte.clone()));

        Ok(Self {
            root: root.to_path_buf(),
            twig,
            latte,
            data,
        })
    }

    /// Render the template at `template_path` (a root-relative lookup key
    /// such as `/views/index.latte`) with the format's engine.
    pub fn render(&self, format: Format, template_path: &str) -> Result<String, EngineError> {
        let on_disk = self.root.join(template_path.trim_start_matches('/'));

        match format {
            Format::Twig => self.twig.render(template_path, &self.data),
            Format::Latte => self
                .latte
                .as_ref()
                .ok_or(EngineError::Unavailable(Format::Latte))?
                .render(&on_disk, &self.data),
            Format::Json => json::render(&on_disk),
        }
    }
}
