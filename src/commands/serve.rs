use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum_server::tls_rustls::RustlsConfig;
use futures_util::stream::Stream;
use owo_colors::OwoColorize;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::{
    ServeArgs,
    config::Config,
    data,
    engines::{EngineRegistry, Toolchain},
    resolve,
    styles::StylePipeline,
    tls,
    watch::{ChangeKind, FileWatcher, PathClassifier, WatchEvent},
};

const CONTENT_TYPE_HTML: &str = "text/html";
const CONTENT_TYPE_JSON: &str = "application/json";

/// Resolved paths under this prefix always respond as JSON.
const DIALOG_PREFIX: &str = "/views/dialog";

const LIVE_RELOAD_SCRIPT: &str = "<script>new EventSource(\"/_weft/live-reload\").addEventListener(\"reload\", () => location.reload());</script>";

/// Shared state for the request handlers. The registry is swapped by the
/// watcher when templates or data change; requests only ever read it.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    root: Arc<PathBuf>,
    registry: Arc<RwLock<EngineRegistry>>,
    pipeline: Arc<StylePipeline>,
    reload_tx: broadcast::Sender<()>,
}

/// SSE handler for live reload notifications.
async fn live_reload_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.reload_tx.subscribe();
    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(_) => {
                    yield Ok(Event::default().event("reload").data("reload"));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Missed some messages, but that's fine - we just need the latest
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// The dev middleware: resolves the request to a template and renders it,
/// or rewrites the path and falls through to static file serving.
async fn handle_request(State(state): State<AppState>, req: Request) -> Response {
    let request_path = req.uri().path().to_string();

    // Assets that exist on disk bypass template resolution (the bundler's
    // asset handling runs ahead of this middleware in the original stack).
    // Stylesheets go through the pipeline on the way out.
    let on_disk = state.root.join(request_path.trim_start_matches('/'));
    if !request_path.ends_with('/') && !request_path.ends_with(".html") && on_disk.is_file() {
        if on_disk.extension().is_some_and(|e| e == "css") {
            return match state.pipeline.process_file(&on_disk) {
                Ok(css) => ([(header::CONTENT_TYPE, "text/css")], css).into_response(),
                Err(e) => {
                    eprintln!("{}", format!("style error for {request_path}: {e}").red());
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
                }
            };
        }
        return serve_static(&state, req).await;
    }

    let resolved = resolve::resolve(&request_path, |candidate| {
        state.root.join(candidate.trim_start_matches('/')).is_file()
    });

    if let Some(format) = resolved.format {
        let template_file = state
            .root
            .join(resolved.template_path.trim_start_matches('/'));

        // Only a bare template file renders here; a probed `.twig.html`
        // variant falls through as a static page.
        if template_file.is_file() {
            let rendered = {
                let registry = match state.registry.read() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                registry.render(format, &resolved.template_path)
            };

            return match rendered {
                Ok(mut body) => {
                    let content_type = response_content_type(&resolved.template_path, &state.config);
                    if content_type == CONTENT_TYPE_HTML && state.config.dev.live_reload {
                        body = inject_live_reload(body);
                    }
                    ([(header::CONTENT_TYPE, content_type)], body).into_response()
                }
                Err(e) => {
                    eprintln!("{}", format!("render error for {request_path}: {e}").red());
                    (StatusCode::INTERNAL_SERVER_ERROR, format!("render error: {e}"))
                        .into_response()
                }
            };
        }
    }

    // Pass-through: hand the rewritten .html path to the static server
    let pass_through = match Request::builder()
        .uri(resolved.serve_path())
        .body(Body::empty())
    {
        Ok(req) => req,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("invalid path: {e}")).into_response();
        }
    };
    serve_static(&state, pass_through).await
}

async fn serve_static(state: &AppState, req: Request) -> Response {
    let serve_dir = ServeDir::new(state.root.as_ref());
    match serve_dir.oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(err) => match err {},
    }
}

/// The content type for a resolved template response: JSON for the
/// reserved dialog prefix and any configured extras, HTML otherwise.
fn response_content_type(template_path: &str, config: &Config) -> &'static str {
    let json = template_path.starts_with(DIALOG_PREFIX)
        || config
            .templates
            .content_type_json
            .iter()
            .any(|prefix| template_path.starts_with(prefix.as_str()));

    if json { CONTENT_TYPE_JSON } else { CONTENT_TYPE_HTML }
}

/// Insert the live reload client before `</body>` (or append).
fn inject_live_reload(html: String) -> String {
    match html.rfind("</body>") {
        Some(idx) => {
            let mut out = html;
            out.insert_str(idx, LIVE_RELOAD_SCRIPT);
            out
        }
        None => html + LIVE_RELOAD_SCRIPT,
    }
}

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    // Determine the config file path
    let config_path = args
        .config_file
        .clone()
        .unwrap_or_else(|| "weft.yaml".into());
    let config_path = if config_path.is_relative() {
        std::env::current_dir()?.join(&config_path)
    } else {
        config_path
    };

    let config = Config::load_from_arg(Some(config_path.as_path()))?;

    let project_dir = std::env::current_dir()?;
    let root = if config.root.is_relative() {
        project_dir.join(&config.root)
    } else {
        config.root.clone()
    };

    // Probe optional tooling once, before any request is served
    let toolchain = Toolchain::probe();
    toolchain.warn_missing(&config);

    let pipeline = StylePipeline::assemble(&config.styles, &toolchain);
    let registry = EngineRegistry::new(&root, &config.templates, &toolchain, data::load(&root))?;

    // Create broadcast channel for live reload
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = AppState {
        config: Arc::new(config),
        root: Arc::new(root.clone()),
        registry: Arc::new(RwLock::new(registry)),
        pipeline: Arc::new(pipeline),
        reload_tx,
    };

    // Set up file watcher if enabled
    let _watcher_handle = if args.watch {
        let watch_root = root.canonicalize().unwrap_or_else(|_| root.clone());
        let classifier = PathClassifier::new(watch_root, config_path.clone());

        match FileWatcher::new(&state.config.dev.watch, classifier) {
            Ok(watcher) => {
                println!("Watching for changes...");

                let watcher_state = state.clone();
                let watcher_root = root.clone();
                let watcher_toolchain = toolchain.clone();

                Some(tokio::task::spawn_blocking(move || {
                    while let Some(event) = watcher.recv() {
                        match event {
                            WatchEvent::FilesChanged(changes) => {
                                println!("\nDetected {} change(s)", changes.len());

                                if changes.contains(&ChangeKind::Config) {
                                    println!(
                                        "Config file changed; restart the server to apply it"
                                    );
                                }

                                if changes.iter().any(|c| c.invalidates_engines()) {
                                    reload_engines(
                                        &watcher_state,
                                        &watcher_root,
                                        &watcher_toolchain,
                                    );
                                }

                                for command in &watcher_state.config.server.run {
                                    run_shell_command(command);
                                }

                                // Notify connected browsers to reload
                                let _ = watcher_state.reload_tx.send(());
                            }
                            WatchEvent::Error(e) => {
                                eprintln!("Watch error: {e}");
                            }
                        }
                    }
                }))
            }
            Err(e) => {
                eprintln!("Warning: Failed to start file watcher: {e}");
                None
            }
        }
    } else {
        None
    };

    // Build router with SSE endpoint for live reload and the middleware
    // as the fallback for every other path
    let app = Router::new()
        .route("/_weft/live-reload", get(live_reload_handler))
        .fallback(handle_request)
        .with_state(state.clone());

    // Parse the address
    let bind = args.bind.clone().unwrap_or_else(|| state.config.server.host.clone());
    let port = args.port.unwrap_or(state.config.server.port);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;

    // A missing certificate pair silently falls back to plaintext; an
    // unreadable one gets a warning first.
    let tls_config = if state.config.server.https {
        match tls::certificate_pair(&state.config.server.cert) {
            Some(pair) => match RustlsConfig::from_pem_file(&pair.cert, &pair.key).await {
                Ok(tls_config) => Some(tls_config),
                Err(e) => {
                    eprintln!(
                        "{}",
                        format!("failed to load certificate pair: {e}; serving plaintext").red()
                    );
                    None
                }
            },
            None => None,
        }
    } else {
        None
    };

    // Determine the URL to display
    let display_host = if bind == "0.0.0.0" { "localhost" } else { &bind };
    let scheme = if tls_config.is_some() { "https" } else { "http" };
    let url = format!("{scheme}://{display_host}:{port}");

    println!("\nServing site at {url}");
    println!("Press Ctrl+C to stop\n");

    // Open browser if requested
    if (args.open || state.config.server.open)
        && let Err(e) = open::that(&url)
    {
        eprintln!("Failed to open browser: {e}");
    }

    // Start the server
    match tls_config {
        Some(tls_config) => {
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Reload templates and data after a relevant change.
fn reload_engines(state: &AppState, root: &std::path::Path, toolchain: &Toolchain) {
    match EngineRegistry::new(root, &state.config.templates, toolchain, data::load(root)) {
        Ok(registry) => {
            let mut guard = match state.registry.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = registry;
        }
        Err(e) => eprintln!("{}", format!("failed to reload templates: {e}").red()),
    }
}

/// Run one configured `server.run` command through the shell.
fn run_shell_command(command: &str) {
    println!("$ {command}");
    match std::process::Command::new("sh").arg("-c").arg(command).status() {
        Ok(status) if !status.success() => eprintln!("command exited with {status}"),
        Ok(_) => {}
        Err(e) => eprintln!("failed to run command: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_prefix_responds_json() {
        let config = Config::default();
        assert_eq!(
            response_content_type("/views/dialog/confirm.json", &config),
            CONTENT_TYPE_JSON
        );
    }

    #[test]
    fn test_pages_respond_html() {
        let config = Config::default();
        assert_eq!(
            response_content_type("/views/home.latte", &config),
            CONTENT_TYPE_HTML
        );
    }

    #[test]
    fn test_configured_json_prefixes() {
        let mut config = Config::default();
        config
            .templates
            .content_type_json
            .push("/views/api".to_string());
        assert_eq!(
            response_content_type("/views/api/list.twig", &config),
            CONTENT_TYPE_JSON
        );
    }

    #[test]
    fn test_live_reload_injected_before_body_close() {
        let html = "<html><body><p>hi</p></body></html>".to_string();
        let injected = inject_live_reload(html);
        let idx = injected.find(LIVE_RELOAD_SCRIPT).unwrap();
        assert!(idx < injected.find("</body>").unwrap() + "</body>".len());
        assert!(injected.ends_with("</body></html>"));
    }

    #[test]
    fn test_live_reload_appended_without_body() {
        let injected = inject_live_reload("fragment".to_string());
        assert!(injected.ends_with(LIVE_RELOAD_SCRIPT));
    }
}
