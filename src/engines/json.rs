//! The JSON data mode: the "template" is served verbatim.

use std::path::Path;

use super::EngineError;

pub fn render(template: &Path) -> Result<String, EngineError> {
    std::fs::read_to_string(template).map_err(|e| EngineError::Io(template.to_path_buf(), e))
}
