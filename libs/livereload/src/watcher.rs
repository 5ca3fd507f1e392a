//! Watching directories for written files.

use std::{path::Path,
          sync::{mpsc::channel, Mutex, PoisonError},
          thread::{self, JoinHandle}};

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use notify::{event::ModifyKind, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Only changes to file contents count: creating, removing or
/// renaming a file, or changing its metadata, does not.
pub fn is_write_event(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any))
}

/// Hand `event` to `on_write` if it is a write. Returns whether it
/// was.
pub fn dispatch_event(event: notify::Result<Event>, on_write: &dyn Fn(&Event)) -> bool {
    match event {
        Ok(event) => {
            debug!("file event: {event:?}");
            if is_write_event(&event) {
                on_write(&event);
                true
            } else {
                false
            }
        }
        Err(e) => {
            warn!("error watching files: {e}");
            false
        }
    }
}

/// One background thread receiving the events of all watched
/// directories; it ends when the watcher is closed.
pub struct FileWatcher {
    watcher: Mutex<Option<RecommendedWatcher>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl FileWatcher {
    pub fn start<F>(on_write: F) -> Result<FileWatcher>
    where F: Fn(&Event) + Send + 'static
    {
        let (tx, rx) = channel();
        let watcher = RecommendedWatcher::new(
            move |res| {
                // Fails only once the receiving thread is gone
                let _ = tx.send(res);
            },
            notify::Config::default())
            .context("creating file watcher")?;
        let thread = thread::Builder::new()
            .name("file-watcher".into())
            .spawn(move || {
                // Ends when the watcher, which owns `tx`, is dropped
                for res in rx {
                    dispatch_event(res, &on_write);
                }
                debug!("file watcher thread ended");
            })
            .context("spawning file watcher thread")?;
        Ok(FileWatcher {
            watcher: Mutex::new(Some(watcher)),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Watch the files directly in `dir` (not recursively).
    pub fn watch(&self, dir: &Path) -> Result<()> {
        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        let watcher = watcher.as_mut().ok_or_else(
            || anyhow!("file watcher already closed"))?;
        watcher.watch(dir, RecursiveMode::NonRecursive).with_context(
            || anyhow!("watching directory {dir:?}"))?;
        debug!("watching directory {dir:?}");
        Ok(())
    }

    /// Stop watching and wait for the event thread to end. Calling it
    /// again does nothing.
    pub fn close(&self) -> Result<()> {
        drop(self.watcher.lock().unwrap_or_else(PoisonError::into_inner).take());
        let thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(thread) = thread {
            thread.join().map_err(|_| anyhow!("file watcher thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{e:#}");
        }
    }
}
