//! Putting the pieces together: component registry, context pool,
//! page routes, HTTP server, live reload.

use std::{net::SocketAddr, sync::Arc, thread::JoinHandle};

use anyhow::{anyhow, Result};
use livereload::{LiveReload, LiveReloadServer};
use log::info;
use luahtml::{ComponentRegistry, ContextPool};

use crate::{config::Config,
            livereload_client::{livereload_js_handler, LIVERELOAD_JS_PATH},
            pages::PageHandler,
            rouille_runner::run_server,
            router::MultiRouter};

/// The standard HTML elements plus the configured custom components.
pub fn component_registry(config: &Config) -> ComponentRegistry {
    let mut registry = ComponentRegistry::with_html_elements();
    for (name, loader) in config.effective_components() {
        info!("registering custom component {name} from {loader:?}");
        registry.register_custom(&name, loader);
    }
    registry
}

/// `livereload_port` enables the `/livereload.js` route.
pub fn make_router(config: &Config, pool: Arc<ContextPool>, livereload_port: Option<u16>)
                   -> MultiRouter
{
    let mut router = MultiRouter::new();
    if let Some(port) = livereload_port {
        router.add(LIVERELOAD_JS_PATH, Box::new(livereload_js_handler(port)));
    }
    router.add("/", Box::new(PageHandler::new(&config.template_dir,
                                              pool,
                                              config.default_heading.clone())));
    router
}

struct LiveReloadService {
    livereload: LiveReload,
    addr: SocketAddr,
    _thread: JoinHandle<()>,
}

/// A running server.
pub struct Templua {
    http_thread: JoinHandle<()>,
    http_addr: SocketAddr,
    livereload: Option<LiveReloadService>,
}

impl Templua {
    /// Start the live reload listener and watcher if enabled, then
    /// the HTTP server. Failing to set up live reload is fatal.
    pub fn start(config: &Config) -> Result<Templua> {
        let livereload = if config.livereload {
            let livereload = LiveReload::new()?;
            livereload.watch_dir(&config.template_dir)?;
            let components_dir = config.template_dir.join("components");
            if components_dir.is_dir() {
                livereload.watch_dir(&components_dir)?;
            }
            let server = LiveReloadServer::bind(config.listen_livereload.as_str(),
                                                livereload.registry().clone())?;
            let addr = server.local_addr()?;
            let thread = server.spawn()?;
            info!("live reload listening on ws://{addr}/");
            Some(LiveReloadService { livereload, addr, _thread: thread })
        } else {
            None
        };

        let registry = Arc::new(component_registry(config));
        let pool = Arc::new(ContextPool::new(registry, config.context_reuse));
        let router = make_router(config, pool, livereload.as_ref().map(|s| s.addr.port()));
        let (http_thread, http_addr) = run_server(
            "templua_http", config.listen_http.clone(), Arc::new(router))?;
        info!("serving {:?} on http://{http_addr}/", config.template_dir);

        Ok(Templua { http_thread, http_addr, livereload })
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn livereload_addr(&self) -> Option<SocketAddr> {
        self.livereload.as_ref().map(|s| s.addr)
    }

    /// Close the reload connections and the watcher.
    pub fn shutdown(&self) -> Result<()> {
        if let Some(service) = &self.livereload {
            service.livereload.close()?;
        }
        Ok(())
    }

    /// Block until the HTTP server thread ends.
    pub fn wait(self) -> Result<()> {
        let Templua { http_thread, livereload, .. } = self;
        let result = http_thread.join().map_err(|_| anyhow!("HTTP server thread panicked"));
        if let Some(service) = livereload {
            service.livereload.close()?;
        }
        result
    }
}
