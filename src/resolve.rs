//! Request URL to template path resolution.
//!
//! Given an incoming request path, decides which template engine (or JSON
//! data mode) should render it and rewrites the path accordingly. This is
//! a pure function: filesystem probing is injected, so the routine is
//! testable without touching disk.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The URL segment under which templates live.
pub const VIEWS_PREFIX: &str = "/views";

/// A template format tag, selecting which engine renders a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Latte,
    Twig,
    Json,
}

impl Format {
    /// Probe priority. A directory containing several candidate template
    /// files for the same page resolves to the first format listed here.
    pub const PROBE_ORDER: [Format; 3] = [Format::Latte, Format::Twig, Format::Json];

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Latte => "latte",
            Format::Twig => "twig",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The template lookup key, e.g. `/views/index.latte`. For an
    /// unresolved request this is the plain prefixed path, e.g.
    /// `/views/missing`.
    pub template_path: String,
    /// The format tag, or `None` when no candidate template exists.
    pub format: Option<Format>,
}

impl Resolved {
    /// The `.html`-suffixed path handed to the next handler when the
    /// request falls through.
    pub fn serve_path(&self) -> String {
        format!("{}.html", self.template_path)
    }
}

/// Resolve a request path to a template lookup key and format tag.
///
/// `exists` is called with root-relative candidate paths such as
/// `/views/page.latte` and reports whether that file is on disk.
///
/// The algorithm:
/// 1. Strip a trailing `.html` suffix.
/// 2. `/` or a trailing slash gains an `index` segment.
/// 3. Paths outside `/views` are prefixed with it.
/// 4. Probe `.latte`, `.latte.html`, `.twig`, `.twig.html`, `.json`,
///    `.json.html` in order; the first hit fixes the format.
/// 5. The key gains `.<format>` (no hit: nothing), and the serve path
///    additionally `.html`.
pub fn resolve<F>(request_path: &str, exists: F) -> Resolved
where
    F: Fn(&str) -> bool,
{
    let mut path = request_path
        .strip_suffix(".html")
        .unwrap_or(request_path)
        .to_string();

    if request_path == "/" || request_path.ends_with('/') {
        path.push_str("index");
    }

    if !path.starts_with(VIEWS_PREFIX) {
        path = format!("{VIEWS_PREFIX}{path}");
    }

    let format = Format::PROBE_ORDER.into_iter().find(|format| {
        exists(&format!("{path}.{format}")) || exists(&format!("{path}.{format}.html"))
    });

    if let Some(format) = format {
        path.push('.');
        path.push_str(format.as_str());
    }

    Resolved {
        template_path: path,
        format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn resolve_with(request: &str, files: &[&str]) -> Resolved {
        let files: HashSet<&str> = files.iter().copied().collect();
        resolve(request, |candidate| files.contains(candidate))
    }

    #[test]
    fn test_root_resolves_to_index() {
        let resolved = resolve_with("/", &["/views/index.latte"]);
        assert_eq!(resolved.template_path, "/views/index.latte");
        assert_eq!(resolved.format, Some(Format::Latte));
    }

    #[test]
    fn test_trailing_slash_appends_index() {
        let resolved = resolve_with("/guides/", &["/views/guides/index.twig"]);
        assert_eq!(resolved.template_path, "/views/guides/index.twig");
        assert_eq!(resolved.format, Some(Format::Twig));
    }

    #[test]
    fn test_views_prefix_not_doubled() {
        let resolved = resolve_with("/views/home", &["/views/home.twig"]);
        assert_eq!(resolved.template_path, "/views/home.twig");
    }

    #[test]
    fn test_html_suffix_stripped() {
        let resolved = resolve_with("/home.html", &["/views/home.twig.html"]);
        assert_eq!(resolved.template_path, "/views/home.twig");
        assert_eq!(resolved.format, Some(Format::Twig));
        assert_eq!(resolved.serve_path(), "/views/home.twig.html");
    }

    #[test]
    fn test_latte_wins_over_twig() {
        let resolved = resolve_with(
            "/page",
            &["/views/page.latte.html", "/views/page.twig.html"],
        );
        assert_eq!(resolved.format, Some(Format::Latte));
        assert_eq!(resolved.template_path, "/views/page.latte");
    }

    #[test]
    fn test_twig_wins_over_json() {
        let resolved = resolve_with("/page", &["/views/page.json", "/views/page.twig"]);
        assert_eq!(resolved.format, Some(Format::Twig));
    }

    #[test]
    fn test_json_candidate_resolves() {
        let resolved = resolve_with("/dialog/confirm", &["/views/dialog/confirm.json"]);
        assert_eq!(resolved.format, Some(Format::Json));
        assert_eq!(resolved.template_path, "/views/dialog/confirm.json");
    }

    #[test]
    fn test_missing_template_falls_through() {
        let resolved = resolve_with("/missing", &[]);
        assert_eq!(resolved.format, None);
        assert_eq!(resolved.template_path, "/views/missing");
        assert_eq!(resolved.serve_path(), "/views/missing.html");
    }

    #[test]
    fn test_format_none_iff_no_candidate() {
        // The tag is empty exactly when no candidate file exists
        let hit = resolve_with("/a", &["/views/a.json.html"]);
        assert!(hit.format.is_some());
        let miss = resolve_with("/a", &["/views/b.json.html"]);
        assert!(miss.format.is_none());
    }
}
