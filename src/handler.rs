use std::{any::type_name, fmt::Debug};

use anyhow::Result;
use rouille::{Request, Response};


pub trait Handler: Debug + Send + Sync {
    /// Returning Ok(None) means, the handler is refusing to handle
    /// the request. It is to be handled as 404 not found by the
    /// caller, unless there's another handler picking up the
    /// request. Err means, the handler has accepted to handle the
    /// request but failed to; the caller turns that into an internal
    /// server error page. `pathrest` holds the path segments below
    /// the handler's mount point.
    fn call(&self, request: &Request, pathrest: &[&str]) -> Result<Option<Response>>;
}


/// A handler for exactly its mount point, calling a closure.
pub struct ExactFnHandler<F>
where F: Fn(&Request) -> Result<Response> + Send + Sync
{
    handler: F
}

impl<F: Fn(&Request) -> Result<Response> + Send + Sync> ExactFnHandler<F> {
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F: Fn(&Request) -> Result<Response> + Send + Sync> Handler for ExactFnHandler<F> {
    fn call(&self, request: &Request, pathrest: &[&str]) -> Result<Option<Response>> {
        if pathrest.is_empty() {
            Ok(Some((self.handler)(request)?))
        } else {
            // refuse to handle if there is a rest (-> 404)
            Ok(None)
        }
    }
}

impl<F: Fn(&Request) -> Result<Response> + Send + Sync> Debug for ExactFnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("ExactFnHandler({})", type_name::<F>()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_exact_fn_handler() {
        let h = ExactFnHandler::new(|_| Ok(Response::text("hi")));
        let request = Request::fake_http("GET", "/x", vec![], vec![]);
        assert_eq!(h.call(&request, &[]).unwrap().unwrap().status_code, 200);
        assert!(h.call(&request, &["more"]).unwrap().is_none());
        assert!(format!("{h:?}").starts_with("ExactFnHandler("));
    }
}
