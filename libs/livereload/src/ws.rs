//! WebSocket transport for reload notifications.

use std::{io::ErrorKind,
          net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
          sync::{mpsc::{channel, Receiver, Sender, TryRecvError},
                 Arc, Mutex, PoisonError},
          thread::{self, JoinHandle},
          time::{Duration, Instant}};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use tungstenite::{error::CapacityError, protocol::WebSocketConfig, Message, WebSocket};

use crate::registry::{ConnectionRegistry, Keepalive, ReloadConnection};

pub const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Without any inbound frame (pongs included) for this long, a
/// connection is dropped.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(60);
/// Larger inbound messages or frames close the connection.
pub const MAX_MESSAGE_SIZE: usize = 512;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
// Upper bound on how long queued frames wait for the reader.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Outbound {
    Text(String),
    Ping,
    Close,
}

enum ReadOutcome {
    Activity,
    Idle,
    TooLarge(CapacityError),
    Closed(tungstenite::Error),
}

/// The registry's handle on one client. Only queues frames; the
/// thread running `serve_connection` owns the socket and writes them.
pub struct WsConnection {
    peer: SocketAddr,
    outbound: Mutex<Sender<Outbound>>,
}

impl WsConnection {
    fn queue(&self, frame: Outbound) -> Result<()> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
            .send(frame)
            .map_err(|_| anyhow!("connection to {} is gone", self.peer))
    }
}

impl ReloadConnection for WsConnection {
    fn send_text(&self, text: &str) -> Result<()> {
        self.queue(Outbound::Text(text.into()))
    }

    fn ping(&self) -> Result<()> {
        self.queue(Outbound::Ping)
    }

    fn close(&self) {
        // The reader may have exited already
        let _ = self.queue(Outbound::Close);
    }
}

fn websocket_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(MAX_MESSAGE_SIZE);
    config.max_frame_size = Some(MAX_MESSAGE_SIZE);
    config
}

fn read_poll(ws: &mut WebSocket<TcpStream>) -> ReadOutcome {
    match ws.read() {
        // Data frames carry nothing we act on; pings are answered by
        // tungstenite
        Ok(_) => ReadOutcome::Activity,
        Err(tungstenite::Error::Io(e))
            if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            ReadOutcome::Idle,
        Err(tungstenite::Error::Capacity(e)) => ReadOutcome::TooLarge(e),
        Err(e) => ReadOutcome::Closed(e),
    }
}

/// Write everything queued so far. `Ok(false)` once a close was
/// requested.
fn write_queued(ws: &mut WebSocket<TcpStream>, outbound: &Receiver<Outbound>)
                -> tungstenite::Result<bool> {
    loop {
        match outbound.try_recv() {
            Ok(Outbound::Text(text)) => ws.send(Message::text(text))?,
            Ok(Outbound::Ping) => ws.send(Message::Ping(Vec::new()))?,
            Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => return Ok(false),
            Err(TryRecvError::Empty) => return Ok(true),
        }
    }
}

fn close_socket(ws: &mut WebSocket<TcpStream>) {
    // Best effort, the peer may well be gone already
    let _ = ws.close(None);
    let _ = ws.flush();
    let _ = ws.get_ref().shutdown(Shutdown::Both);
}

/// Handshake, register, then alternate between writing queued frames
/// and reading, until the peer goes away, becomes inactive or
/// misbehaves.
pub fn serve_connection(registry: &Arc<ConnectionRegistry>, stream: TcpStream) -> Result<()> {
    let peer = stream.peer_addr().context("getting peer address")?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
    let mut ws = tungstenite::accept_with_config(stream, Some(websocket_config())).map_err(
        |e| anyhow!("websocket handshake with {peer}: {e}"))?;
    ws.get_ref().set_read_timeout(Some(POLL_INTERVAL))?;

    let (sender, outbound) = channel();
    let connection = Arc::new(WsConnection { peer, outbound: Mutex::new(sender) });
    let id = registry.register(connection.clone());
    let keepalive = Keepalive::spawn(registry.clone(), id, connection, PING_INTERVAL);

    let mut last_activity = Instant::now();
    loop {
        match write_queued(&mut ws, &outbound) {
            Ok(true) => (),
            Ok(false) => break,
            Err(e) => {
                debug!("writing to reload client {peer}: {e}");
                break
            }
        }
        match read_poll(&mut ws) {
            ReadOutcome::Activity => last_activity = Instant::now(),
            ReadOutcome::Idle => {
                if last_activity.elapsed() >= INACTIVITY_TIMEOUT {
                    info!("reload client {peer} inactive, closing");
                    break
                }
            }
            ReadOutcome::TooLarge(e) => {
                warn!("reload client {peer}: {e}, closing");
                break
            }
            ReadOutcome::Closed(e) => {
                match e {
                    tungstenite::Error::ConnectionClosed
                        | tungstenite::Error::AlreadyClosed => (),
                    e => debug!("reading from reload client {peer}: {e}"),
                }
                break
            }
        }
    }
    drop(keepalive);
    registry.unregister(id);
    close_socket(&mut ws);
    Ok(())
}

/// Accepts WebSocket connections for reload notifications, one thread
/// per connection.
pub struct LiveReloadServer {
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
}

impl LiveReloadServer {
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Debug,
                registry: Arc<ConnectionRegistry>) -> Result<LiveReloadServer> {
        let listener = TcpListener::bind(&addr).with_context(
            || anyhow!("binding live reload listener to {addr:?}"))?;
        Ok(LiveReloadServer { listener, registry })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    pub fn run(self) {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let registry = self.registry.clone();
                    let spawned = thread::Builder::new()
                        .name("livereload-conn".into())
                        .spawn(move || {
                            if let Err(e) = serve_connection(&registry, stream) {
                                warn!("live reload connection: {e:#}");
                            }
                        });
                    if let Err(e) = spawned {
                        warn!("could not spawn live reload connection thread: {e}");
                    }
                }
                Err(e) => warn!("accepting live reload connection: {e}"),
            }
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<()>> {
        Ok(thread::Builder::new()
           .name("livereload".into())
           .spawn(move || self.run())?)
    }
}


#[cfg(test)]
mod tests {
    use tungstenite::stream::MaybeTlsStream;

    use crate::registry::RELOAD_MESSAGE;

    use super::*;

    fn wait_for(what: &str, cond: impl Fn() -> bool) {
        let start = Instant::now();
        while !cond() {
            if start.elapsed() > Duration::from_secs(5) {
                panic!("timed out waiting for {what}");
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn server() -> (Arc<ConnectionRegistry>, SocketAddr) {
        let registry = Arc::new(ConnectionRegistry::new());
        let server = LiveReloadServer::bind("127.0.0.1:0", registry.clone()).unwrap();
        let addr = server.local_addr().unwrap();
        server.spawn().unwrap();
        (registry, addr)
    }

    fn client(addr: SocketAddr) -> WebSocket<MaybeTlsStream<TcpStream>> {
        let (ws, _) = tungstenite::connect(format!("ws://{addr}/")).unwrap();
        ws
    }

    #[test]
    fn t_reload_reaches_client() {
        let (registry, addr) = server();
        let mut ws = client(addr);
        wait_for("registration", || registry.len() == 1);
        let report = registry.broadcast(RELOAD_MESSAGE);
        assert_eq!(report.sent, 1);
        let message = ws.read().unwrap();
        assert_eq!(message.to_text().unwrap(), "reload");
        ws.close(None).unwrap();
        wait_for("unregistration", || registry.is_empty());
    }

    #[test]
    fn t_broadcast_does_not_wait_for_readers() {
        let (registry, addr) = server();
        let mut clients: Vec<_> = (0..8).map(|_| client(addr)).collect();
        wait_for("registration", || registry.len() == 8);
        let start = Instant::now();
        let report = registry.broadcast(RELOAD_MESSAGE);
        assert!(start.elapsed() < Duration::from_millis(100), "{:?}", start.elapsed());
        assert_eq!(report.sent, 8);
        for ws in &mut clients {
            assert_eq!(ws.read().unwrap().to_text().unwrap(), "reload");
        }
    }

    #[test]
    fn t_close_all_closes_socket() {
        let (registry, addr) = server();
        let mut ws = client(addr);
        wait_for("registration", || registry.len() == 1);
        if let MaybeTlsStream::Plain(stream) = ws.get_ref() {
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        }
        registry.close_all();
        loop {
            match ws.read() {
                Ok(Message::Close(_)) => break,
                Ok(_) => (),
                Err(tungstenite::Error::Io(e)) if e.kind() == ErrorKind::WouldBlock
                    || e.kind() == ErrorKind::TimedOut => panic!("socket not closed"),
                Err(_) => break,
            }
        }
    }

    #[test]
    fn t_small_messages_are_ignored() {
        let (registry, addr) = server();
        let mut ws = client(addr);
        wait_for("registration", || registry.len() == 1);
        ws.send(Message::text("hello")).unwrap();
        thread::sleep(Duration::from_millis(300));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn t_oversized_message_closes() {
        let (registry, addr) = server();
        let mut ws = client(addr);
        wait_for("registration", || registry.len() == 1);
        ws.send(Message::text("x".repeat(MAX_MESSAGE_SIZE + 1))).unwrap();
        wait_for("unregistration", || registry.is_empty());
    }
}
