//! Runtime configuration, from environment variables; the binary lets
//! command line options override it.

use std::path::PathBuf;

use anyhow::Result;
use kstring::KString;

use crate::util::{env_flag, env_number, getenv, getenv_or, parse_component_list};

pub const DEFAULT_HEADING: &str = "Welcome to Templua";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the page templates (`TEMPLATE_DIR`).
    pub template_dir: PathBuf,
    /// Address of the HTTP server (`LISTEN_HTTP`).
    pub listen_http: String,
    /// Address of the live reload WebSocket listener
    /// (`LISTEN_LIVERELOAD`).
    pub listen_livereload: String,
    /// `LIVERELOAD`, on by default.
    pub livereload: bool,
    /// Custom components as (DSL name, loader path), from
    /// `COMPONENTS` as a comma separated `NAME=PATH` list.
    pub components: Vec<(KString, PathBuf)>,
    /// Renders a pooled script context serves before being discarded
    /// (`CONTEXT_REUSE`), 0 for a fresh context per render.
    pub context_reuse: u32,
    pub default_heading: KString,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            template_dir: "templates".into(),
            listen_http: "127.0.0.1:1323".into(),
            listen_livereload: "127.0.0.1:35729".into(),
            livereload: true,
            components: Vec::new(),
            context_reuse: 20,
            default_heading: KString::from_static(DEFAULT_HEADING),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config> {
        let default = Config::default();
        let components = match getenv("COMPONENTS")? {
            Some(s) => parse_component_list(&s)?,
            None => Vec::new(),
        };
        Ok(Config {
            template_dir: getenv("TEMPLATE_DIR")?.map(PathBuf::from)
                .unwrap_or(default.template_dir),
            listen_http: getenv_or("LISTEN_HTTP", Some(&default.listen_http))?,
            listen_livereload: getenv_or("LISTEN_LIVERELOAD",
                                         Some(&default.listen_livereload))?,
            livereload: env_flag("LIVERELOAD", default.livereload)?,
            components,
            context_reuse: env_number("CONTEXT_REUSE", default.context_reuse)?,
            default_heading: default.default_heading,
        })
    }

    /// The custom components to register: the configured ones, or if
    /// there are none, `Card` when `components/card.lua` exists in the
    /// template directory.
    pub fn effective_components(&self) -> Vec<(KString, PathBuf)> {
        if !self.components.is_empty() {
            return self.components.clone()
        }
        let card = self.template_dir.join("components").join("card.lua");
        if card.is_file() {
            vec![(KString::from_static("Card"), card)]
        } else {
            Vec::new()
        }
    }
}


#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn t_effective_components() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            template_dir: dir.path().into(),
            ..Config::default()
        };
        assert!(config.effective_components().is_empty());
        fs::create_dir(dir.path().join("components")).unwrap();
        fs::write(dir.path().join("components/card.lua"), "return nil").unwrap();
        let c = config.effective_components();
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].0.as_str(), "Card");
        config.components = vec![(KString::from_static("Box"), "box.lua".into())];
        assert_eq!(config.effective_components(), config.components);
    }
}
