//! The browser side of live reload, served as `/livereload.js`.

use anyhow::Result;
use rouille::{Request, Response};

use crate::{handler::ExactFnHandler, webutils::javascriptresponse};

pub const LIVERELOAD_JS_PATH: &str = "/livereload.js";

/// Connects to the reload listener on `port` of the page's host, but
/// only for local development hosts. Reloads the page on `reload`
/// and reconnects a second after the connection drops.
pub fn livereload_js(port: u16) -> String {
    format!(r#"(function () {{
    var port = {port};

    function connect() {{
        var host = window.location.hostname;
        if (host !== 'localhost' && host !== '127.0.0.1') {{
            console.log('livereload: not a local host, not connecting');
            return;
        }}
        var ws = new WebSocket('ws://' + host + ':' + port + '/');
        ws.onopen = function () {{
            console.log('livereload: connected');
        }};
        ws.onmessage = function (evt) {{
            if (evt.data === 'reload') {{
                window.location.reload();
            }}
        }};
        ws.onclose = function () {{
            console.log('livereload: connection closed, reconnecting in 1s');
            setTimeout(connect, 1000);
        }};
        ws.onerror = function (err) {{
            console.error('livereload: error', err);
            ws.close();
        }};
    }}

    connect();
}})();
"#)
}

pub fn livereload_js_handler(port: u16)
                             -> ExactFnHandler<impl Fn(&Request) -> Result<Response> + Send + Sync>
{
    let js = livereload_js(port);
    ExactFnHandler::new(move |_: &Request| Ok(javascriptresponse(js.clone())))
}
