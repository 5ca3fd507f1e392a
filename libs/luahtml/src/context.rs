//! An isolated Lua state with the DSL installed.

use log::trace;
use mlua::{Lua, Value};

use crate::{dsl::{chunk_environment, install},
            element::value_text,
            error::{RenderError, RenderErrorKind},
            registry::ComponentRegistry,
            vars::{bind_vars, Vars}};

const CHUNK_NAME: &str = "=template";

/// One script context: a Lua state owned exclusively by whoever holds
/// it. Each script runs in an environment of its own, so globals it
/// assigns are gone by the next render; contexts never share state.
pub struct ScriptContext {
    lua: Lua,
    renders: u32,
}

fn page_text(value: &Value) -> Result<String, RenderError> {
    match value_text(value) {
        Some(html) => Ok(html),
        None => Err(RenderErrorKind::EmptyOutput.into()),
    }
}

impl ScriptContext {
    pub fn new(registry: &ComponentRegistry) -> Result<ScriptContext, RenderError> {
        let lua = Lua::new();
        install(&lua, registry).map_err(RenderErrorKind::Setup)?;
        Ok(ScriptContext { lua, renders: 0 })
    }

    /// How many renders this context has run so far.
    pub fn renders(&self) -> u32 {
        self.renders
    }

    fn eval(&mut self, script: &str) -> Result<Value, RenderError> {
        self.renders += 1;
        trace!("render #{} in this context", self.renders);
        let env = chunk_environment(&self.lua).map_err(RenderErrorKind::Setup)?;
        Ok(self.lua.load(script)
           .set_name(CHUNK_NAME)
           .set_environment(env)
           .eval::<Value>()
           .map_err(RenderErrorKind::Execution)?)
    }

    /// Run `script` whose value is the page itself.
    pub fn render_html(&mut self, script: &str) -> Result<String, RenderError> {
        let value = self.eval(script)?;
        if let Value::Function(_) = value {
            return Err(RenderErrorKind::ScriptContract(
                "returned a function instead of HTML").into())
        }
        page_text(&value)
    }

    /// Run `script`, which must evaluate to a function, and call that
    /// with `vars` converted to a Lua table.
    pub fn render_html_with_vars(&mut self, script: &str, vars: &Vars)
                                 -> Result<String, RenderError> {
        let Value::Function(render) = self.eval(script)? else {
            return Err(RenderErrorKind::ScriptContract("must return a function").into())
        };
        let vars = bind_vars(&self.lua, vars).map_err(RenderErrorKind::Setup)?;
        let value: Value = render.call(vars).map_err(RenderErrorKind::Call)?;
        page_text(&value)
    }
}
