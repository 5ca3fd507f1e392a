use std::{net::SocketAddr,
          sync::{mpsc::sync_channel, Arc},
          thread::{self, JoinHandle}};

use anyhow::{anyhow, Result};
use log::{info, warn};
use rouille::{Request, Response, Server};

use crate::{http_response_status_codes::HttpResponseStatusCode,
            router::MultiRouter,
            time_guard,
            webutils::errorpage_from_status};


/// Make a handler for Rouille's `Server`.
pub fn server_handler(router: Arc<MultiRouter>)
                      -> impl Fn(&Request) -> Response + Send + Sync + 'static
{
    move |request: &Request| -> Response {
        time_guard!("server_handler");
        let response = match request.method() {
            "GET" | "HEAD" => router.handle(request),
            method => {
                warn!("method {method:?} not implemented");
                errorpage_from_status(HttpResponseStatusCode::NotImplemented501)
            }
        };
        info!("{} {} {} -> {}", request.remote_addr(), request.method(), request.raw_url(),
              response.status_code);
        response
    }
}

/// Run a rouille server in a new thread. Returns once the server is
/// listening (or failed to), with the address it listens on.
pub fn run_server(thread_name: &str, addr: String, router: Arc<MultiRouter>)
                  -> Result<(JoinHandle<()>, SocketAddr)>
{
    let (tx, rx) = sync_channel(1);
    let thread = thread::Builder::new().name(thread_name.into()).spawn(move || {
        match Server::new(&addr, server_handler(router)) {
            Ok(server) => {
                // The receiver only goes away if the caller gave up
                let _ = tx.send(Ok(server.server_addr()));
                server.run()
            }
            Err(e) => {
                let _ = tx.send(Err(anyhow!("starting server on {addr:?}: {e}")));
            }
        }
    })?;
    let local_addr = rx.recv().map_err(
        |_| anyhow!("server thread {thread_name:?} ended before starting"))??;
    Ok((thread, local_addr))
}


#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpStream;

    use crate::handler::ExactFnHandler;

    use super::*;

    fn router() -> Arc<MultiRouter> {
        let mut router = MultiRouter::new();
        router.add("/", Box::new(ExactFnHandler::new(|_| Ok(Response::text("hello")))));
        Arc::new(router)
    }

    #[test]
    fn t_server_handler() {
        let handler = server_handler(router());
        let r = handler(&Request::fake_http("GET", "/", vec![], vec![]));
        assert_eq!(r.status_code, 200);
        let r = handler(&Request::fake_http("POST", "/", vec![], vec![]));
        assert_eq!(r.status_code, 501);
        let r = handler(&Request::fake_http("GET", "/missing", vec![], vec![]));
        assert_eq!(r.status_code, 404);
    }

    #[test]
    fn t_run_server() {
        let (_thread, addr) = run_server("test_http", "127.0.0.1:0".into(), router()).unwrap();
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"GET / HTTP/1.0\r\nHost: localhost\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.0 200") || response.starts_with("HTTP/1.1 200"),
                "{response}");
        assert!(response.ends_with("hello"));
    }

    #[test]
    fn t_run_server_bind_error() {
        let (_thread, addr) = run_server("test_http", "127.0.0.1:0".into(), router()).unwrap();
        assert!(run_server("test_http2", addr.to_string(), router()).is_err());
    }
}
