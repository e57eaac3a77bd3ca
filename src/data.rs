//! Template data discovery.
//!
//! Every `<root>/data/**/*.json` file is deep-merged into one context value
//! made available to all template engines. Later files (glob order) win on
//! conflicting keys, same as configuration overrides.

use std::path::Path;

use owo_colors::OwoColorize;

use crate::config::merge_value;

/// Collect and merge the data files under `<root>/data`.
///
/// Unreadable or malformed files are skipped with a warning rather than
/// aborting; a broken data file should not take the dev server down.
pub fn load(root: &Path) -> serde_json::Value {
    let mut data = serde_json::Value::Object(serde_json::Map::new());

    let pattern = format!(
        "{}/data/**/*.json",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    let Ok(entries) = glob::glob(&pattern) else {
        return data;
    };

    for entry in entries {
        let Ok(path) = entry else { continue };
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("skipping data file {}: {e}", path.display()).red()
                );
                continue;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => merge_value(&mut data, value),
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("skipping invalid data file {}: {e}", path.display()).red()
                );
            }
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_data_files() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("a.json"), r#"{"site": {"name": "weft"}}"#).unwrap();
        std::fs::write(data_dir.join("b.json"), r#"{"site": {"lang": "en"}}"#).unwrap();

        let data = load(dir.path());
        assert_eq!(data["site"]["name"], "weft");
        assert_eq!(data["site"]["lang"], "en");
    }

    #[test]
    fn test_missing_data_dir_is_empty_context() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(dir.path()), serde_json::json!({}));
    }

    #[test]
    fn test_invalid_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("bad.json"), "{not json").unwrap();
        std::fs::write(data_dir.join("good.json"), r#"{"ok": true}"#).unwrap();

        let data = load(dir.path());
        assert_eq!(data, serde_json::json!({"ok": true}));
    }
}
