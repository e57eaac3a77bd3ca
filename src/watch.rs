//! File watching for the dev server.
//!
//! Uses `notify-debouncer-full` to watch the source root and config file
//! for changes, batching events so one save triggers one reload.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};

use crate::config::WatchConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Watch events
// =============================================================================

/// What kind of source file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A template under `<root>/views`.
    Template(PathBuf),
    /// A stylesheet under `<root>/styles`.
    Style(PathBuf),
    /// A script under `<root>/scripts`.
    Script(PathBuf),
    /// A data file under `<root>/data`.
    Data(PathBuf),
    /// The config file itself.
    Config,
}

impl ChangeKind {
    /// Whether this change invalidates the template engine registry
    /// (loaded templates or the merged data context).
    pub fn invalidates_engines(&self) -> bool {
        matches!(self, ChangeKind::Template(_) | ChangeKind::Data(_))
    }
}

/// Events sent from the file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// Files changed, commands and reload needed.
    FilesChanged(Vec<ChangeKind>),
    /// Watcher error occurred.
    Error(String),
}

// =============================================================================
// Path classification
// =============================================================================

/// Classifies changed file paths into change types.
#[derive(Clone)]
pub struct PathClassifier {
    root: PathBuf,
    config_path: PathBuf,
}

impl PathClassifier {
    pub fn new(root: PathBuf, config_path: PathBuf) -> Self {
        Self { root, config_path }
    }

    /// Classify a changed path, or `None` for paths that don't matter.
    pub fn classify(&self, path: &Path) -> Option<ChangeKind> {
        // Skip hidden files and directories
        if path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            return None;
        }

        if path == self.config_path {
            return Some(ChangeKind::Config);
        }

        let relative = path.strip_prefix(&self.root).ok()?;
        let section = relative.components().next()?;

        match section.as_os_str().to_str()? {
            "views" => Some(ChangeKind::Template(path.to_path_buf())),
            "styles" => Some(ChangeKind::Style(path.to_path_buf())),
            "scripts" => Some(ChangeKind::Script(path.to_path_buf())),
            "data" => Some(ChangeKind::Data(path.to_path_buf())),
            _ => None,
        }
    }
}

// =============================================================================
// File watcher
// =============================================================================

/// A file watcher that can use either native or polling backend.
pub enum FileWatcher {
    /// Native file system watcher (recommended for local development).
    Native {
        _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
    /// Polling-based watcher (for network filesystems, Docker, etc.).
    Polling {
        _debouncer: Debouncer<PollWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
}

impl FileWatcher {
    /// Create a new file watcher over the source root and the config file.
    pub fn new(config: &WatchConfig, classifier: PathClassifier) -> Result<Self, WatchError> {
        let debounce_timeout = Duration::from_millis(config.debounce_ms);

        let (tx, rx) = mpsc::channel();

        let root = classifier.root.clone();
        let config_path = classifier.config_path.clone();

        // Callback to convert notify events to our WatchEvent type
        let callback = move |result: DebounceEventResult| match result {
            Ok(events) => {
                let mut changes: Vec<ChangeKind> = events
                    .iter()
                    .filter_map(|event| {
                        if !is_relevant_event(&event.kind) {
                            return None;
                        }
                        // Classify the first path (usually there's only one)
                        event.paths.first().and_then(|p| classifier.classify(p))
                    })
                    .collect();
                changes.dedup();

                if !changes.is_empty() {
                    let _ = tx.send(WatchEvent::FilesChanged(changes));
                }
            }
            Err(errors) => {
                for e in errors {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            }
        };

        if config.poll {
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let notify_config = NotifyConfig::default().with_poll_interval(poll_interval);

            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                debounce_timeout,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )
            .map_err(WatchError::Notify)?;

            add_watch_paths(&mut debouncer, &root, &config_path)?;

            Ok(FileWatcher::Polling {
                _debouncer: debouncer,
                rx,
            })
        } else {
            let mut debouncer =
                new_debouncer(debounce_timeout, None, callback).map_err(WatchError::Notify)?;

            add_watch_paths(&mut debouncer, &root, &config_path)?;

            Ok(FileWatcher::Native {
                _debouncer: debouncer,
                rx,
            })
        }
    }

    /// Receive the next watch event (blocking).
    pub fn recv(&self) -> Option<WatchEvent> {
        match self {
            FileWatcher::Native { rx, .. } => rx.recv().ok(),
            FileWatcher::Polling { rx, .. } => rx.recv().ok(),
        }
    }
}

/// Register the source root and the config file's directory.
fn add_watch_paths<W: Watcher, C: notify_debouncer_full::FileIdCache>(
    debouncer: &mut Debouncer<W, C>,
    root: &Path,
    config_path: &Path,
) -> Result<(), WatchError> {
    if root.exists() {
        debouncer.watch(root, RecursiveMode::Recursive)?;
    }

    // Watch config file's parent directory (to catch config changes)
    if let Some(parent) = config_path.parent()
        && parent.exists()
    {
        debouncer.watch(parent, RecursiveMode::NonRecursive)?;
    }

    Ok(())
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        PathClassifier::new(PathBuf::from("/proj/src"), PathBuf::from("/proj/weft.yaml"))
    }

    #[test]
    fn test_classify_sections() {
        let c = classifier();
        assert_eq!(
            c.classify(Path::new("/proj/src/views/index.twig")),
            Some(ChangeKind::Template(PathBuf::from(
                "/proj/src/views/index.twig"
            )))
        );
        assert_eq!(
            c.classify(Path::new("/proj/src/styles/main.css")),
            Some(ChangeKind::Style(PathBuf::from("/proj/src/styles/main.css")))
        );
        assert_eq!(
            c.classify(Path::new("/proj/src/scripts/app.js")),
            Some(ChangeKind::Script(PathBuf::from("/proj/src/scripts/app.js")))
        );
        assert_eq!(
            c.classify(Path::new("/proj/src/data/site.json")),
            Some(ChangeKind::Data(PathBuf::from("/proj/src/data/site.json")))
        );
    }

    #[test]
    fn test_classify_config() {
        assert_eq!(
            classifier().classify(Path::new("/proj/weft.yaml")),
            Some(ChangeKind::Config)
        );
    }

    #[test]
    fn test_unrelated_and_hidden_paths_ignored() {
        let c = classifier();
        assert_eq!(c.classify(Path::new("/proj/README.md")), None);
        assert_eq!(c.classify(Path::new("/proj/src/other/file.txt")), None);
        assert_eq!(c.classify(Path::new("/proj/src/views/.index.twig.swp")), None);
    }

    #[test]
    fn test_engine_invalidation() {
        assert!(ChangeKind::Template(PathBuf::new()).invalidates_engines());
        assert!(ChangeKind::Data(PathBuf::new()).invalidates_engines());
        assert!(!ChangeKind::Style(PathBuf::new()).invalidates_engines());
    }
}
