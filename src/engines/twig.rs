//! The twig engine, backed by Tera.
//!
//! Templates are registered under their root-relative path with a leading
//! slash (`/views/page.twig`), so the resolver's lookup key doubles as the
//! Tera template name and cross-template `{% include %}` / `{% extends %}`
//! references work with the same paths.

use std::path::Path;

use tera::{Context, Tera};

use super::EngineError;

pub struct TwigEngine {
    tera: Tera,
}

impl TwigEngine {
    /// Load every `.twig` and `.twig.html` template under `<root>/views`.
    pub fn new(root: &Path, options: &serde_json::Value) -> Result<Self, EngineError> {
        let escaped_root = glob::Pattern::escape(&root.to_string_lossy());

        let mut files = Vec::new();
        for suffix in ["views/**/*.twig", "views/**/*.twig.html"] {
            let pattern = format!("{escaped_root}/{suffix}");
            for entry in glob::glob(&pattern)? {
                let Ok(path) = entry else { continue };
                let name = template_name(root, &path);
                files.push((path, Some(name)));
            }
        }

        let mut tera = Tera::default();
        tera.add_template_files(files)?;

        // Autoescaping defaults to on for .html names; the engine options
        // can turn it off entirely.
        if options.get("autoescape").and_then(serde_json::Value::as_bool) == Some(false) {
            tera.autoescape_on(vec![]);
        }

        Ok(Self { tera })
    }

    /// Render a registered template with the shared data context.
    pub fn render(
        &self,
        template_path: &str,
        data: &serde_json::Value,
    ) -> Result<String, EngineError> {
        let context = Context::from_value(data.clone())?;
        Ok(self.tera.render(template_path, &context)?)
    }
}

/// Root-relative template name with a leading slash and forward slashes.
fn template_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut name = relative.to_string_lossy().replace('\\', "/");
    if !name.starts_with('/') {
        name.insert(0, '/');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_name_is_rooted() {
        assert_eq!(
            template_name(Path::new("/proj/src"), Path::new("/proj/src/views/page.twig")),
            "/views/page.twig"
        );
    }

    #[test]
    fn test_renders_from_scaffolded_dir() {
        let dir = tempfile::tempdir().unwrap();
        let views = dir.path().join("views");
        std::fs::create_dir_all(&views).unwrap();
        std::fs::write(views.join("hello.twig"), "Hello {{ name }}!").unwrap();

        let engine = TwigEngine::new(dir.path(), &serde_json::json!({})).unwrap();
        let html = engine
            .render("/views/hello.twig", &serde_json::json!({"name": "weft"}))
            .unwrap();
        assert_eq!(html, "Hello weft!");
    }

    #[test]
    fn test_includes_across_templates() {
        let dir = tempfile::tempdir().unwrap();
        let views = dir.path().join("views");
        std::fs::create_dir_all(&views).unwrap();
        std::fs::write(views.join("partial.twig"), "header").unwrap();
        std::fs::write(
            views.join("page.twig"),
            "{% include \"/views/partial.twig\" %}!",
        )
        .unwrap();

        let engine = TwigEngine::new(dir.path(), &serde_json::json!({})).unwrap();
        let html = engine
            .render("/views/page.twig", &serde_json::json!({}))
            .unwrap();
        assert_eq!(html, "header!");
    }
}
