//! The style pipeline: an ordered list of CSS transformation stages.
//!
//! Stage execution is delegated to lightningcss (import bundling, draft
//! syntax lowering, vendor prefixing); the Tailwind stage shells out to the
//! probed CLI. The stage order is part of the contract: with Tailwind
//! enabled the utilities run after the selector stages and before
//! prefixing.

use std::path::{Path, PathBuf};
use std::process::Command;

use lightningcss::bundler::{Bundler, FileProvider};
use lightningcss::stylesheet::{ParserFlags, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::config::StylesConfig;
use crate::engines::Toolchain;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum StyleError {
    #[error("failed to read stylesheet {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse stylesheet {0}: {1}")]
    Parse(PathBuf, String),

    #[error("failed to print stylesheet: {0}")]
    Print(String),

    #[error("failed to run tailwindcss: {0}")]
    TailwindSpawn(std::io::Error),

    #[error("tailwindcss failed: {0}")]
    Tailwind(String),
}

// =============================================================================
// Pipeline
// =============================================================================

/// A single CSS transformation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleStage {
    Import,
    Nesting,
    CustomMedia,
    CustomSelectors,
    Tailwind,
    Autoprefixer,
}

/// The assembled, ordered stage list plus the tools it needs.
pub struct StylePipeline {
    stages: Vec<StyleStage>,
    tailwind_bin: Option<PathBuf>,
}

impl StylePipeline {
    /// Assemble the pipeline from configuration and tool availability.
    ///
    /// With Tailwind enabled and installed the default list is replaced by
    /// the utility variant; enabled-but-missing keeps the default (the
    /// probe already warned).
    pub fn assemble(styles: &StylesConfig, toolchain: &Toolchain) -> Self {
        if styles.tailwindcss && toolchain.tailwind.is_some() {
            Self {
                stages: vec![
                    StyleStage::Import,
                    StyleStage::Nesting,
                    StyleStage::CustomMedia,
                    StyleStage::CustomSelectors,
                    StyleStage::Tailwind,
                    StyleStage::Autoprefixer,
                ],
                tailwind_bin: toolchain.tailwind.clone(),
            }
        } else {
            Self {
                stages: vec![
                    StyleStage::Import,
                    StyleStage::Nesting,
                    StyleStage::CustomMedia,
                    StyleStage::CustomSelectors,
                    StyleStage::Autoprefixer,
                ],
                tailwind_bin: None,
            }
        }
    }

    pub fn stages(&self) -> &[StyleStage] {
        &self.stages
    }

    fn has(&self, stage: StyleStage) -> bool {
        self.stages.contains(&stage)
    }

    /// Run a stylesheet file through the pipeline.
    pub fn process_file(&self, path: &Path) -> Result<String, StyleError> {
        if self.has(StyleStage::Tailwind)
            && let Some(bin) = &self.tailwind_bin
        {
            // Tailwind resolves @import itself; lightningcss then lowers
            // drafts and prefixes the expanded output.
            let output = Command::new(bin)
                .arg("--input")
                .arg(path)
                .output()
                .map_err(StyleError::TailwindSpawn)?;
            if !output.status.success() {
                return Err(StyleError::Tailwind(
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }
            let source = String::from_utf8_lossy(&output.stdout).into_owned();
            return self.transform(&source, path);
        }

        if self.has(StyleStage::Import) {
            let fs = FileProvider::new();
            let mut bundler = Bundler::new(&fs, None, self.parser_options(path));
            let stylesheet = bundler
                .bundle(path)
                .map_err(|e| StyleError::Parse(path.to_path_buf(), e.to_string()))?;
            return self.print(&stylesheet);
        }

        let source =
            std::fs::read_to_string(path).map_err(|e| StyleError::Io(path.to_path_buf(), e))?;
        self.transform(&source, path)
    }

    /// Parse and print a stylesheet string through the non-import stages.
    fn transform(&self, source: &str, path: &Path) -> Result<String, StyleError> {
        let stylesheet = StyleSheet::parse(source, self.parser_options(path))
            .map_err(|e| StyleError::Parse(path.to_path_buf(), e.to_string()))?;
        self.print(&stylesheet)
    }

    fn parser_options<'o, 'i>(&self, path: &Path) -> ParserOptions<'o, 'i> {
        let mut flags = ParserFlags::empty();
        if self.has(StyleStage::CustomMedia) {
            flags |= ParserFlags::CUSTOM_MEDIA;
        }
        // Nesting and custom selectors need no parser flags; nesting is
        // lowered by the target settings below.
        ParserOptions {
            filename: path.display().to_string(),
            flags,
            ..ParserOptions::default()
        }
    }

    fn print(&self, stylesheet: &StyleSheet) -> Result<String, StyleError> {
        let targets = if self.has(StyleStage::Autoprefixer) {
            Targets::from(baseline_browsers())
        } else {
            Targets::default()
        };

        stylesheet
            .to_css(PrinterOptions {
                targets,
                ..PrinterOptions::default()
            })
            .map(|result| result.code)
            .map_err(|e| StyleError::Print(e.to_string()))
    }
}

/// Browser baseline driving draft lowering and vendor prefixing.
/// Versions are encoded as `major << 16 | minor << 8`.
fn baseline_browsers() -> Browsers {
    Browsers {
        chrome: Some(90 << 16),
        edge: Some(90 << 16),
        firefox: Some(88 << 16),
        safari: Some(14 << 16),
        ..Browsers::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tailwind_toolchain(present: bool) -> Toolchain {
        Toolchain {
            latte: None,
            tailwind: present.then(|| PathBuf::from("/usr/bin/tailwindcss")),
        }
    }

    #[test]
    fn test_default_stage_order() {
        let pipeline = StylePipeline::assemble(
            &StylesConfig { tailwindcss: false },
            &tailwind_toolchain(true),
        );
        assert_eq!(
            pipeline.stages(),
            &[
                StyleStage::Import,
                StyleStage::Nesting,
                StyleStage::CustomMedia,
                StyleStage::CustomSelectors,
                StyleStage::Autoprefixer,
            ]
        );
    }

    #[test]
    fn test_tailwind_stage_order() {
        let pipeline = StylePipeline::assemble(
            &StylesConfig { tailwindcss: true },
            &tailwind_toolchain(true),
        );
        assert_eq!(
            pipeline.stages(),
            &[
                StyleStage::Import,
                StyleStage::Nesting,
                StyleStage::CustomMedia,
                StyleStage::CustomSelectors,
                StyleStage::Tailwind,
                StyleStage::Autoprefixer,
            ]
        );
    }

    #[test]
    fn test_tailwind_requested_but_missing_keeps_default() {
        let pipeline = StylePipeline::assemble(
            &StylesConfig { tailwindcss: true },
            &tailwind_toolchain(false),
        );
        assert!(!pipeline.stages().contains(&StyleStage::Tailwind));
    }

    #[test]
    fn test_bundles_imports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("base.css"), "body { margin: 0 }").unwrap();
        let entry = dir.path().join("main.css");
        std::fs::write(&entry, "@import \"base.css\";\nh1 { color: red }").unwrap();

        let pipeline = StylePipeline::assemble(
            &StylesConfig { tailwindcss: false },
            &Toolchain::default(),
        );
        let css = pipeline.process_file(&entry).unwrap();
        assert!(css.contains("margin"));
        assert!(css.contains("color"));
        assert!(!css.contains("@import"));
    }
}
