//! The set of connected reload clients.

use std::{collections::HashMap,
          sync::{mpsc::{channel, RecvTimeoutError, Sender},
                 Arc, Mutex, MutexGuard, PoisonError},
          thread::{self, JoinHandle},
          time::Duration};

use anyhow::Result;
use log::{debug, info, warn};

/// The text sent to every client when a watched file was written.
pub const RELOAD_MESSAGE: &str = "reload";

/// Something that can be told to reload. Implemented by the WebSocket
/// connections, and by mocks in tests.
pub trait ReloadConnection: Send + Sync {
    fn send_text(&self, text: &str) -> Result<()>;
    fn ping(&self) -> Result<()>;
    /// Must be idempotent and must not block on the registry.
    fn close(&self);
}

pub type ConnectionId = u64;

#[derive(Default)]
struct Connections {
    next_id: ConnectionId,
    by_id: HashMap<ConnectionId, Arc<dyn ReloadConnection>>,
}

/// Outcome of one broadcast pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub sent: usize,
    /// Connections that failed and were dropped.
    pub pruned: usize,
}

/// All state is behind a single mutex, so registration, removal and
/// broadcasts are strictly serialized.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<Connections>,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, Connections> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, connection: Arc<dyn ReloadConnection>) -> ConnectionId {
        let mut connections = self.lock();
        let id = connections.next_id;
        connections.next_id += 1;
        connections.by_id.insert(id, connection);
        info!("reload client {id} connected, {} total", connections.by_id.len());
        id
    }

    /// Remove and close the connection. Returns false if it was not
    /// (or no longer) registered.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let (removed, remaining) = {
            let mut connections = self.lock();
            (connections.by_id.remove(&id), connections.by_id.len())
        };
        match removed {
            Some(connection) => {
                connection.close();
                info!("reload client {id} disconnected, {remaining} remaining");
                true
            }
            None => false
        }
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send `message` to every connection. A connection whose send
    /// fails is closed and removed right away, there is no retry.
    pub fn broadcast(&self, message: &str) -> BroadcastReport {
        let mut connections = self.lock();
        debug!("broadcasting {message:?} to {} clients", connections.by_id.len());
        let mut report = BroadcastReport::default();
        connections.by_id.retain(|id, connection| {
            match connection.send_text(message) {
                Ok(()) => {
                    report.sent += 1;
                    true
                }
                Err(e) => {
                    warn!("sending to reload client {id}: {e:#}");
                    connection.close();
                    report.pruned += 1;
                    false
                }
            }
        });
        report
    }

    pub fn close_all(&self) {
        let mut connections = self.lock();
        for (_, connection) in connections.by_id.drain() {
            connection.close();
        }
    }
}


/// Pings one connection at a fixed interval until dropped. A failed
/// ping unregisters (and thereby closes) the connection.
pub struct Keepalive {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Keepalive {
    pub fn spawn(registry: Arc<ConnectionRegistry>,
                 id: ConnectionId,
                 connection: Arc<dyn ReloadConnection>,
                 interval: Duration) -> Keepalive {
        let (stop, stopped) = channel::<()>();
        let thread = thread::spawn(move || {
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = connection.ping() {
                            warn!("ping to reload client {id} failed: {e:#}");
                            registry.unregister(id);
                            return
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return
                }
            }
        });
        Keepalive { stop: Some(stop), thread: Some(thread) }
    }
}

impl Drop for Keepalive {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("keepalive thread panicked");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use anyhow::bail;

    use super::*;

    #[derive(Default)]
    struct MockConnection {
        fail: AtomicBool,
        received: Mutex<Vec<String>>,
        pings: AtomicUsize,
        closed: AtomicUsize,
    }

    impl ReloadConnection for MockConnection {
        fn send_text(&self, text: &str) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                bail!("broken pipe")
            }
            self.received.lock().unwrap().push(text.into());
            Ok(())
        }

        fn ping(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                bail!("broken pipe")
            }
            self.pings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn mocks(registry: &ConnectionRegistry, n: usize) -> Vec<(ConnectionId, Arc<MockConnection>)> {
        (0..n).map(|_| {
            let c = Arc::new(MockConnection::default());
            (registry.register(c.clone()), c)
        }).collect()
    }

    #[test]
    fn t_broadcast_prunes_failed() {
        let registry = ConnectionRegistry::new();
        let conns = mocks(&registry, 3);
        assert_eq!(registry.broadcast(RELOAD_MESSAGE),
                   BroadcastReport { sent: 3, pruned: 0 });
        conns[1].1.fail.store(true, Ordering::SeqCst);
        assert_eq!(registry.broadcast(RELOAD_MESSAGE),
                   BroadcastReport { sent: 2, pruned: 1 });
        assert_eq!(registry.len(), 2);
        assert_eq!(conns[1].1.closed.load(Ordering::SeqCst), 1);
        assert_eq!(registry.broadcast(RELOAD_MESSAGE),
                   BroadcastReport { sent: 2, pruned: 0 });
        assert_eq!(*conns[0].1.received.lock().unwrap(),
                   vec!["reload", "reload", "reload"]);
        assert_eq!(conns[1].1.received.lock().unwrap().len(), 1);
    }

    #[test]
    fn t_unregister() {
        let registry = ConnectionRegistry::new();
        let conns = mocks(&registry, 2);
        assert_ne!(conns[0].0, conns[1].0);
        assert!(registry.unregister(conns[0].0));
        assert!(!registry.unregister(conns[0].0));
        assert_eq!(conns[0].1.closed.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
        registry.close_all();
        assert!(registry.is_empty());
        assert_eq!(conns[1].1.closed.load(Ordering::SeqCst), 1);
        assert_eq!(registry.broadcast(RELOAD_MESSAGE), BroadcastReport::default());
    }

    #[test]
    fn t_keepalive() {
        let registry = Arc::new(ConnectionRegistry::new());
        let conns = mocks(&registry, 1);
        let (id, conn) = conns[0].clone();
        let keepalive = Keepalive::spawn(registry.clone(), id, conn.clone(),
                                         Duration::from_millis(10));
        thread::sleep(Duration::from_millis(100));
        assert!(conn.pings.load(Ordering::SeqCst) >= 2);
        assert_eq!(registry.len(), 1);
        conn.fail.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        assert!(registry.is_empty());
        assert_eq!(conn.closed.load(Ordering::SeqCst), 1);
        drop(keepalive);
    }

    #[test]
    fn t_keepalive_stops_on_drop() {
        let registry = Arc::new(ConnectionRegistry::new());
        let conns = mocks(&registry, 1);
        let (id, conn) = conns[0].clone();
        drop(Keepalive::spawn(registry.clone(), id, conn.clone(), Duration::from_secs(3600)));
        assert_eq!(conn.pings.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 1);
    }
}
