//! Change bridge: filesystem events into reload triggers.
//!
//! # Data Flow
//! ```text
//! watch roots ──→ dirs::list_subdirs ──→ dirs::exclude_subdirs
//!     → one non-recursive notify watch per directory
//!     → modify/create event (watcher thread)
//!     → ReloadHandle::trigger_reload()
//! ```
//!
//! Directories created after startup are not picked up.

pub mod dirs;

use std::path::PathBuf;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::reload::ReloadHandle;

/// Watch setup errors. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to enumerate directories: {0}")]
    Walk(#[from] ignore::Error),

    #[error("cannot resolve {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create file watcher: {0}")]
    Create(#[source] notify::Error),

    #[error("cannot watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// What to watch.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub dirs: Vec<PathBuf>,
    pub exclude: Vec<PathBuf>,
}

impl WatchOptions {
    pub fn new(dirs: Vec<PathBuf>, exclude: Vec<PathBuf>) -> Self {
        Self { dirs, exclude }
    }
}

/// Events that mean file content may have changed.
fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    )
}

/// Keeps the filesystem watches alive; dropping it stops them.
pub struct ChangeBridge {
    _watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl ChangeBridge {
    /// Watch every non-excluded directory under `options.dirs`.
    pub fn start(options: &WatchOptions, handle: ReloadHandle) -> Result<Self, WatchError> {
        let dirs = dirs::list_subdirs(&options.dirs)?;
        let watched = dirs::exclude_subdirs(dirs, &options.exclude);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_content_change(&event.kind) => {
                tracing::debug!(paths = ?event.paths, kind = ?event.kind, "File change detected");
                handle.trigger_reload();
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Watch error"),
        })
        .map_err(WatchError::Create)?;

        for dir in &watched {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| WatchError::Notify {
                    path: dir.clone(),
                    source,
                })?;
        }

        tracing::info!(directories = watched.len(), "Watching for changes");
        Ok(Self {
            _watcher: watcher,
            watched,
        })
    }

    /// Canonical paths of the watched directories.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

impl std::fmt::Debug for ChangeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBridge")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::Notifier;
    use notify::event::{CreateKind, DataChange, MetadataKind};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_content_change_kinds() {
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_content_change(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions
        ))));
        assert!(!is_content_change(&EventKind::Any));
    }

    #[tokio::test]
    async fn test_file_write_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();

        let notifier = Arc::new(Notifier::new());
        let options = WatchOptions::new(vec![dir.path().to_path_buf()], vec![]);
        let bridge = ChangeBridge::start(&options, ReloadHandle::new(Arc::clone(&notifier))).unwrap();
        assert_eq!(bridge.watched().len(), 2);
        assert!(!notifier.is_pending());

        std::fs::write(dir.path().join("css/site.css"), "body {}").unwrap();

        tokio::time::timeout(Duration::from_secs(5), notifier.notified())
            .await
            .expect("no reload after file write");
    }

    #[test]
    fn test_excluded_dirs_not_watched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("build/out")).unwrap();

        let options = WatchOptions::new(
            vec![dir.path().to_path_buf()],
            vec![dir.path().join("build")],
        );
        let bridge =
            ChangeBridge::start(&options, ReloadHandle::new(Arc::new(Notifier::new()))).unwrap();
        assert_eq!(
            bridge.watched(),
            &[dir.path().canonicalize().unwrap()]
        );
    }
}
