//! Serving rendered Lua templates as pages.

use std::{fmt::Debug, fs, io::ErrorKind, path::{Path, PathBuf}, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use kstring::KString;
use log::debug;
use luahtml::{ContextPool, Vars};
use rouille::{Request, Response};

use crate::{handler::Handler,
            http_response_status_codes::HttpResponseStatusCode,
            time_guard,
            webutils::htmlresponse};

pub const HOME_PAGE: &str = "home";

/// Name of the template for a path below the mount point. `None` for
/// anything but the root or a single segment of `[A-Za-z0-9_-]`.
pub fn page_name<'s>(pathrest: &[&'s str]) -> Option<&'s str> {
    match pathrest {
        [] => Some(HOME_PAGE),
        [name] if !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            => Some(*name),
        _ => None
    }
}

/// `None` if the file does not exist.
fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| anyhow!("reading {path:?}")),
    }
}

/// Renders `<name>.lua` from the template directory, with variables
/// from `<name>.json` if present.
pub struct PageHandler {
    template_dir: PathBuf,
    pool: Arc<ContextPool>,
    default_heading: KString,
}

impl PageHandler {
    pub fn new(template_dir: impl Into<PathBuf>,
               pool: Arc<ContextPool>,
               default_heading: KString) -> PageHandler {
        PageHandler { template_dir: template_dir.into(), pool, default_heading }
    }

    /// The variables for page `name`: the JSON object from its
    /// `.json` file, and `heading` unless that sets it.
    pub fn vars(&self, name: &str) -> Result<Vars> {
        let path = self.template_dir.join(format!("{name}.json"));
        let mut vars = match read_optional(&path)? {
            Some(json) => match serde_json::from_str::<serde_json::Value>(&json)
                .with_context(|| anyhow!("parsing {path:?}"))?
            {
                serde_json::Value::Object(vars) => vars,
                _ => bail!("{path:?} does not contain a JSON object"),
            },
            None => Vars::new(),
        };
        if !vars.contains_key("heading") {
            vars.insert("heading".into(), self.default_heading.as_str().into());
        }
        Ok(vars)
    }

    /// `Ok(None)` if there is no template of that name.
    pub fn render(&self, name: &str) -> Result<Option<String>> {
        time_guard!(format!("render {name}"));
        let path = self.template_dir.join(format!("{name}.lua"));
        let script = match read_optional(&path)? {
            Some(script) => script,
            None => return Ok(None),
        };
        let vars = self.vars(name)?;
        let mut guard = self.pool.get();
        let html = guard.context()?.render_html_with_vars(&script, &vars)
            .with_context(|| anyhow!("rendering {path:?}"))?;
        debug!("rendered {path:?}: {} bytes", html.len());
        Ok(Some(html))
    }
}

impl Handler for PageHandler {
    fn call(&self, _request: &Request, pathrest: &[&str]) -> Result<Option<Response>> {
        let name = match page_name(pathrest) {
            Some(name) => name,
            None => return Ok(None),
        };
        Ok(self.render(name)?.map(|html| htmlresponse(HttpResponseStatusCode::OK200, html)))
    }
}

impl Debug for PageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandler")
            .field("template_dir", &self.template_dir)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use luahtml::{ComponentRegistry, RenderError, RenderErrorKind};
    use tempfile::TempDir;

    use super::*;

    const HOME: &str = r#"
        return function(vars)
          return Html({ Body({ H1(vars.heading), P(vars.note) }) })
        end"#;

    fn handler(dir: &TempDir) -> PageHandler {
        let pool = Arc::new(ContextPool::new(
            Arc::new(ComponentRegistry::with_html_elements()), 20));
        PageHandler::new(dir.path(), pool, KString::from_static("Default Heading"))
    }

    #[test]
    fn t_page_name() {
        assert_eq!(page_name(&[]), Some("home"));
        assert_eq!(page_name(&["about-us_2"]), Some("about-us_2"));
        assert_eq!(page_name(&["a.lua"]), None);
        assert_eq!(page_name(&[".."]), None);
        assert_eq!(page_name(&["a", "b"]), None);
    }

    #[test]
    fn t_render_with_default_heading() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("home.lua"), HOME).unwrap();
        let html = handler(&dir).render("home").unwrap().unwrap();
        assert_eq!(html, "<!DOCTYPE html><html><body><h1>Default Heading</h1>\
                          <p></p></body></html>");
    }

    #[test]
    fn t_render_with_json_vars() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("home.lua"), HOME).unwrap();
        fs::write(dir.path().join("home.json"),
                  r#"{"heading": "Hi", "note": "from json", "nested": {"x": 1}}"#).unwrap();
        let html = handler(&dir).render("home").unwrap().unwrap();
        assert_eq!(html, "<!DOCTYPE html><html><body><h1>Hi</h1>\
                          <p>from json</p></body></html>");
        fs::write(dir.path().join("home.json"), "[1, 2]").unwrap();
        assert!(handler(&dir).render("home").is_err());
    }

    #[test]
    fn t_missing_and_broken() {
        let dir = tempfile::tempdir().unwrap();
        let h = handler(&dir);
        assert!(h.render("nope").unwrap().is_none());
        fs::write(dir.path().join("broken.lua"), "return Div(").unwrap();
        let e = h.render("broken").unwrap_err();
        let kind = e.downcast_ref::<RenderError>().map(|e| e.kind());
        assert!(matches!(kind, Some(RenderErrorKind::Execution(_))), "{e:#}");
    }
}
