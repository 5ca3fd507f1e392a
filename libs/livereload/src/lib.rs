//! Browser live reload: watch directories, and tell every connected
//! WebSocket client to `reload` when a file in them is written.

pub mod registry;
pub mod watcher;
pub mod ws;

use std::{path::Path, sync::Arc};

use anyhow::Result;
use log::info;

pub use registry::{ConnectionRegistry, RELOAD_MESSAGE};
pub use watcher::FileWatcher;
pub use ws::LiveReloadServer;

/// A file watcher wired to a connection registry. Each write event
/// triggers one full broadcast pass.
pub struct LiveReload {
    registry: Arc<ConnectionRegistry>,
    watcher: FileWatcher,
}

impl LiveReload {
    pub fn new() -> Result<LiveReload> {
        let registry = Arc::new(ConnectionRegistry::new());
        let watcher = {
            let registry = registry.clone();
            FileWatcher::start(move |event| {
                info!("file modified: {:?}", event.paths);
                registry.broadcast(RELOAD_MESSAGE);
            })?
        };
        info!("live reload initialized");
        Ok(LiveReload { registry, watcher })
    }

    pub fn watch_dir(&self, dir: &Path) -> Result<()> {
        info!("watching directory {dir:?} for changes");
        self.watcher.watch(dir)
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Close all client connections, then the watcher.
    pub fn close(&self) -> Result<()> {
        self.registry.close_all();
        self.watcher.close()
    }
}


#[cfg(test)]
mod tests {
    use std::{fs, sync::{atomic::{AtomicUsize, Ordering}, Mutex}, thread, time::{Duration, Instant}};

    use crate::registry::ReloadConnection;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        received: Mutex<Vec<String>>,
        closed: AtomicUsize,
    }

    impl ReloadConnection for Recorder {
        fn send_text(&self, text: &str) -> Result<()> {
            self.received.lock().unwrap().push(text.into());
            Ok(())
        }
        fn ping(&self) -> Result<()> {
            Ok(())
        }
        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn t_write_broadcasts_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("home.lua");
        fs::write(&path, "-- v1").unwrap();
        let lr = LiveReload::new().unwrap();
        lr.watch_dir(dir.path()).unwrap();
        let client = Arc::new(Recorder::default());
        lr.registry().register(client.clone());
        fs::write(&path, "-- v2").unwrap();
        let start = Instant::now();
        while client.received.lock().unwrap().is_empty() {
            assert!(start.elapsed() < Duration::from_secs(5), "no reload received");
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(client.received.lock().unwrap()[0], "reload");
        lr.close().unwrap();
        assert!(lr.registry().is_empty());
        assert_eq!(client.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn t_watch_missing_dir() {
        let lr = LiveReload::new().unwrap();
        assert!(lr.watch_dir(Path::new("/nonexistent/templua-test-dir")).is_err());
    }
}
