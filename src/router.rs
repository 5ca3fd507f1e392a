use anyhow::Result;
use rouille::{Request, Response};

use crate::{handler::Handler,
            http_response_status_codes::HttpResponseStatusCode,
            webutils::{errorpage_from_error, errorpage_from_status}};

/// Split a request path into its segments. Empty segments (leading,
/// trailing and repeated slashes) are dropped.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Handlers mounted at paths. Several handlers can share a mount
/// point; on lookup, deeper mount points are tried first, and
/// handlers at the same mount point in the order they were added,
/// until one accepts the request.
#[derive(Debug, Default)]
pub struct MultiRouter {
    routes: Vec<(Vec<String>, Box<dyn Handler>)>,
}

impl MultiRouter {
    pub fn new() -> MultiRouter {
        Default::default()
    }

    /// Using path *strings*, and chaining.
    pub fn add(&mut self, path: &str, handler: Box<dyn Handler>) -> &mut Self {
        let segments = path_segments(path).into_iter().map(String::from).collect();
        self.routes.push((segments, handler));
        // stable, so insertion order is kept per depth
        self.routes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        self
    }

    /// `Ok(None)` if no handler accepted the request.
    pub fn route(&self, request: &Request) -> Result<Option<Response>> {
        let url = request.url();
        let segments = path_segments(&url);
        for (mount, handler) in &self.routes {
            let is_below = mount.len() <= segments.len()
                && mount.iter().zip(&segments).all(|(m, s)| m == s);
            if is_below {
                if let Some(response) = handler.call(request, &segments[mount.len()..])? {
                    return Ok(Some(response))
                }
            }
        }
        Ok(None)
    }

    /// Like `route`, but always giving a response: error pages for
    /// unhandled requests and failures.
    pub fn handle(&self, request: &Request) -> Response {
        match self.route(request) {
            Ok(Some(response)) => response,
            Ok(None) => errorpage_from_status(HttpResponseStatusCode::NotFound404),
            Err(e) => errorpage_from_error(e.context(format!("handling {:?}", request.url()))),
        }
    }
}
