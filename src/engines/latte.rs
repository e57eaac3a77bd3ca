//! The latte engine, delegating to an external `latte` renderer binary.
//!
//! The renderer receives the template path as its argument and a JSON
//! payload (`params` plus the configured engine options) on stdin, and
//! writes the rendered document to stdout.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::EngineError;

pub struct LatteEngine {
    bin: PathBuf,
    options: serde_json::Value,
}

impl LatteEngine {
    pub fn new(bin: PathBuf, options: serde_json::Value) -> Self {
        Self { bin, options }
    }

    pub fn render(
        &self,
        template: &Path,
        data: &serde_json::Value,
    ) -> Result<String, EngineError> {
        let payload = serde_json::json!({
            "params": data,
            "options": self.options,
        });

        let mut child = Command::new(&self.bin)
            .arg(template)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(EngineError::LatteSpawn)?;

        if let Some(stdin) = child.stdin.take() {
            let mut stdin = stdin;
            stdin
                .write_all(payload.to_string().as_bytes())
                .map_err(EngineError::LatteSpawn)?;
        }

        let output = child.wait_with_output().map_err(EngineError::LatteSpawn)?;
        if !output.status.success() {
            return Err(EngineError::LatteFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
