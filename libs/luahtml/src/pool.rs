//! Reuse of script contexts across requests.

//! Creating a context sets up a Lua state and binds every registry
//! name, so a handful are kept around. A context that has served
//! `max_renders` renders is dropped instead of being returned, which
//! bounds how much garbage one Lua state accumulates.

use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::{context::ScriptContext, error::RenderError, registry::ComponentRegistry};

pub struct ContextPool {
    registry: Arc<ComponentRegistry>,
    max_renders: u32,
    contexts: Mutex<Vec<ScriptContext>>,
}

impl ContextPool {
    /// `max_renders` of 0 means a fresh context for every guard.
    pub fn new(registry: Arc<ComponentRegistry>, max_renders: u32) -> ContextPool {
        ContextPool {
            registry,
            max_renders,
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Number of contexts currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn get(&self) -> ContextGuard<'_> {
        let context = if self.max_renders == 0 {
            None
        } else {
            self.contexts.lock().unwrap_or_else(PoisonError::into_inner).pop()
        };
        ContextGuard { pool: self, context }
    }

    fn put(&self, context: ScriptContext) {
        if context.renders() < self.max_renders {
            self.contexts.lock().unwrap_or_else(PoisonError::into_inner).push(context);
        } else {
            debug!("dropping script context after {} renders", context.renders());
        }
    }
}

/// Exclusive use of one context; gives it back to the pool on drop.
pub struct ContextGuard<'p> {
    pool: &'p ContextPool,
    context: Option<ScriptContext>,
}

impl<'p> ContextGuard<'p> {
    /// The context, created on first access if the pool had none.
    pub fn context(&mut self) -> Result<&mut ScriptContext, RenderError> {
        let context = match self.context.take() {
            Some(context) => context,
            None => ScriptContext::new(&self.pool.registry)?,
        };
        Ok(self.context.insert(context))
    }
}

impl<'p> Drop for ContextGuard<'p> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.pool.put(context);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn pool(max_renders: u32) -> ContextPool {
        ContextPool::new(Arc::new(ComponentRegistry::with_html_elements()), max_renders)
    }

    #[test]
    fn t_reuse() {
        let pool = pool(2);
        {
            let mut g = pool.get();
            g.context().unwrap().render_html("return Br()").unwrap();
        }
        assert_eq!(pool.idle(), 1);
        {
            let mut g = pool.get();
            assert_eq!(pool.idle(), 0);
            let c = g.context().unwrap();
            // same context as before
            assert_eq!(c.renders(), 1);
            c.render_html("return Br()").unwrap();
        }
        // two renders served, not returned
        assert_eq!(pool.idle(), 0);
        let mut g = pool.get();
        assert_eq!(g.context().unwrap().renders(), 0);
    }

    #[test]
    fn t_pages_do_not_affect_each_other() {
        let pool = pool(20);
        let page_b = r#"return Div({class = "b"}, "B")"#;
        let render = |script: &str| pool.get().context().unwrap().render_html(script).unwrap();
        assert_eq!(render(page_b), "<div class=\"b\">B</div>");
        assert_eq!(render("Div = function() return 'X' end; return Div()"), "X");
        assert_eq!(pool.idle(), 1);
        assert_eq!(render(page_b), "<div class=\"b\">B</div>");
    }

    #[test]
    fn t_unused_guard() {
        let pool = pool(5);
        drop(pool.get());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn t_always_fresh() {
        let pool = pool(0);
        for _ in 0..3 {
            let mut g = pool.get();
            let c = g.context().unwrap();
            assert_eq!(c.renders(), 0);
            c.render_html("return Hr()").unwrap();
        }
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn t_concurrent_guards() {
        let pool = pool(10);
        let mut a = pool.get();
        let mut b = pool.get();
        a.context().unwrap().render_html("return 1").unwrap();
        b.context().unwrap().render_html("return 2").unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 2);
    }
}
