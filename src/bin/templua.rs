use std::path::PathBuf;

use anyhow::Result;
use clap::Parser as ClapParser;
use templua::{app::Templua, config::Config, util::parse_component_spec};

#[derive(clap::Parser, Debug)]
/// Serve pages rendered from Lua templates, reloading the browser
/// when a template changes. Options override the corresponding
/// environment variables.
struct Args {
    /// Directory holding the page templates (TEMPLATE_DIR)
    #[clap(long)]
    templates: Option<PathBuf>,

    /// Address for the HTTP server (LISTEN_HTTP)
    #[clap(long)]
    listen: Option<String>,

    /// Address for the live reload WebSocket listener
    /// (LISTEN_LIVERELOAD)
    #[clap(long)]
    livereload_listen: Option<String>,

    /// Disable live reload (LIVERELOAD=0)
    #[clap(long)]
    no_livereload: bool,

    /// Register a custom component, as NAME=PATH; can be given
    /// multiple times (COMPONENTS)
    #[clap(long = "component")]
    components: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(templates) = args.templates {
        config.template_dir = templates;
    }
    if let Some(listen) = args.listen {
        config.listen_http = listen;
    }
    if let Some(listen) = args.livereload_listen {
        config.listen_livereload = listen;
    }
    if args.no_livereload {
        config.livereload = false;
    }
    if !args.components.is_empty() {
        config.components = args.components.iter()
            .map(|s| parse_component_spec(s))
            .collect::<Result<_>>()?;
    }

    let app = Templua::start(&config)?;
    app.wait()
}
