use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;

use crate::{
    BuildArgs,
    config::Config,
    data,
    engines::{EngineRegistry, Toolchain},
    resolve::Format,
    styles::StylePipeline,
};

/// Counts reported after a build.
#[derive(Debug, Default)]
struct BuildResult {
    templates: usize,
    styles: usize,
    assets: usize,
}

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let config = Config::load_from_arg(args.config_file.as_deref())?;

    let project_dir = std::env::current_dir()?;
    let root = absolute(&project_dir, &config.root);
    let output = absolute(&project_dir, &config.output);

    let toolchain = Toolchain::probe();
    toolchain.warn_missing(&config);

    let pipeline = StylePipeline::assemble(&config.styles, &toolchain);
    let registry = EngineRegistry::new(&root, &config.templates, &toolchain, data::load(&root))?;

    let mut result = BuildResult::default();

    for pattern in &config.input {
        for entry in glob::glob(pattern)? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            let path = absolute(&project_dir, &path);

            let Ok(relative) = path.strip_prefix(&root) else {
                eprintln!(
                    "{}",
                    format!("skipping input outside the root: {}", path.display()).red()
                );
                continue;
            };

            build_input(&path, relative, &output, &registry, &pipeline, &mut result)?;
        }
    }

    println!(
        "Built site to {} ({} templates, {} stylesheets, {} assets)",
        output.display(),
        result.templates,
        result.styles,
        result.assets
    );

    copy_emails(&config, &output)?;

    Ok(())
}

/// Build a single input file into the output directory.
fn build_input(
    path: &Path,
    relative: &Path,
    output: &Path,
    registry: &EngineRegistry,
    pipeline: &StylePipeline,
    result: &mut BuildResult,
) -> Result<(), anyhow::Error> {
    if path.extension().is_some_and(|e| e == "css") {
        let css = pipeline.process_file(path)?;
        write_output(&output.join(relative), css.as_bytes())?;
        result.styles += 1;
        return Ok(());
    }

    if relative.starts_with("views")
        && let Some(format) = embedded_format(relative)
    {
        // views/page.twig.html and views/page.twig both render through
        // their engine and are written with the format segment stripped:
        // views/page.html. The lookup key keeps the full file name so it
        // matches the engine registration and the on-disk file.
        let name = relative.to_string_lossy().replace('\\', "/");
        let template_path = format!("/{name}");
        let rendered = registry.render(format, &template_path)?;

        write_output(&output.join(output_name(&name, format)), rendered.as_bytes())?;
        result.templates += 1;
        return Ok(());
    }

    // Plain pages, scripts, and anything else copy through untouched
    let out_path = output.join(relative);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(path, &out_path)?;
    result.assets += 1;
    Ok(())
}

/// Detect the format of a template file name: either an embedded segment
/// (`page.twig.html`) or a bare extension (`page.twig`).
fn embedded_format(path: &Path) -> Option<Format> {
    let name = path.file_name()?.to_str()?;
    Format::PROBE_ORDER.into_iter().find(|format| {
        name.ends_with(&format!(".{format}.html")) || name.ends_with(&format!(".{format}"))
    })
}

/// The output file name for a rendered template: the format segment is
/// stripped and `.html` (re)attached, so both `page.twig.html` and
/// `page.twig` build to `page.html`.
fn output_name(name: &str, format: Format) -> String {
    if let Some(stem) = name.strip_suffix(&format!(".{format}.html")) {
        return format!("{stem}.html");
    }
    match name.strip_suffix(&format!(".{format}")) {
        Some(stem) => format!("{stem}.html"),
        None => name.to_string(),
    }
}

fn write_output(path: &Path, contents: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Copy built email templates into the configured distribution directory.
fn copy_emails(config: &Config, output: &Path) -> Result<(), anyhow::Error> {
    let Some(dist_dir) = &config.emails.dist_dir else {
        return Ok(());
    };

    let emails = output.join("views/emails");
    if !emails.is_dir() {
        return Ok(());
    }

    copy_dir_all(&emails, dist_dir)?;
    println!("Copied email templates to {}", dist_dir.display());
    Ok(())
}

fn copy_dir_all(from: &Path, to: &Path) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StylesConfig, TemplatesConfig};

    #[test]
    fn test_embedded_format() {
        assert_eq!(
            embedded_format(Path::new("views/page.latte.html")),
            Some(Format::Latte)
        );
        assert_eq!(
            embedded_format(Path::new("views/page.twig.html")),
            Some(Format::Twig)
        );
        assert_eq!(
            embedded_format(Path::new("views/dialog/confirm.json.html")),
            Some(Format::Json)
        );
        assert_eq!(embedded_format(Path::new("views/plain.html")), None);
    }

    #[test]
    fn test_bare_extension_format() {
        assert_eq!(
            embedded_format(Path::new("views/index.twig")),
            Some(Format::Twig)
        );
        assert_eq!(
            embedded_format(Path::new("views/page.latte")),
            Some(Format::Latte)
        );
        assert_eq!(embedded_format(Path::new("views/notes.txt")), None);
    }

    #[test]
    fn test_output_name_strips_format_segment() {
        assert_eq!(
            output_name("views/page.twig.html", Format::Twig),
            "views/page.html"
        );
        assert_eq!(output_name("views/index.twig", Format::Twig), "views/index.html");
        assert_eq!(
            output_name("views/dialog/confirm.json", Format::Json),
            "views/dialog/confirm.html"
        );
    }

    fn test_setup(dir: &Path) -> (EngineRegistry, StylePipeline) {
        let toolchain = Toolchain::default();
        let registry = EngineRegistry::new(
            dir,
            &TemplatesConfig::default(),
            &toolchain,
            serde_json::json!({"name": "weft"}),
        )
        .unwrap();
        let pipeline =
            StylePipeline::assemble(&StylesConfig { tailwindcss: false }, &toolchain);
        (registry, pipeline)
    }

    #[test]
    fn test_build_renders_suffixed_twig_template() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        std::fs::create_dir_all(root.join("views")).unwrap();
        std::fs::write(root.join("views/page.twig.html"), "Hello {{ name }}!").unwrap();
        let output = dir.path().join("public");

        let (registry, pipeline) = test_setup(&root);
        let mut result = BuildResult::default();
        build_input(
            &root.join("views/page.twig.html"),
            Path::new("views/page.twig.html"),
            &output,
            &registry,
            &pipeline,
            &mut result,
        )
        .unwrap();

        assert_eq!(result.templates, 1);
        assert_eq!(
            std::fs::read_to_string(output.join("views/page.html")).unwrap(),
            "Hello weft!"
        );
    }

    #[test]
    fn test_build_renders_bare_twig_template() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        std::fs::create_dir_all(root.join("views")).unwrap();
        std::fs::write(root.join("views/index.twig"), "Hi {{ name }}").unwrap();
        let output = dir.path().join("public");

        let (registry, pipeline) = test_setup(&root);
        let mut result = BuildResult::default();
        build_input(
            &root.join("views/index.twig"),
            Path::new("views/index.twig"),
            &output,
            &registry,
            &pipeline,
            &mut result,
        )
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(output.join("views/index.html")).unwrap(),
            "Hi weft"
        );
    }
}
