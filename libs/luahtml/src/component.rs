//! Custom components: Lua files producing declarative shadow roots.

//! A component file evaluates to a function. Called with a properties
//! table it returns
//!
//! ```lua
//! { name = "card-box", template = { styles = "...", content = { ... } } }
//! ```
//!
//! which is rendered as an element named `name` holding a
//! `<template shadowrootmode="open">`. Every failure along the way
//! (missing file, Lua error, malformed result) is logged and renders
//! as the empty string, so that one broken component does not take
//! the page down with it.

use std::{fs::read_to_string, path::PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::warn;
use mlua::{Lua, Table, Value};

use crate::{dsl::chunk_environment, element::value_text};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomComponent {
    /// Path of the Lua file defining the component, read anew on
    /// each use.
    pub loader: PathBuf,
}

impl CustomComponent {
    pub fn new(loader: impl Into<PathBuf>) -> CustomComponent {
        CustomComponent { loader: loader.into() }
    }

    /// Load, call and render. `name` is the DSL name, only used for
    /// messages.
    pub fn load_and_render(&self, lua: &Lua, name: &str, props: Option<&Value>) -> String {
        match self.try_load_and_render(lua, props) {
            Ok(Some(html)) => html,
            Ok(None) => {
                warn!("invalid result from custom element {name:?} ({:?})", self.loader);
                String::new()
            }
            Err(e) => {
                warn!("error in custom element {name:?}: {e:#}");
                String::new()
            }
        }
    }

    fn try_load_and_render(&self, lua: &Lua, props: Option<&Value>) -> Result<Option<String>> {
        let source = read_to_string(&self.loader).with_context(
            || anyhow!("reading component file {:?}", self.loader))?;
        let component: Value = lua.load(source)
            .set_name(format!("@{}", self.loader.to_string_lossy()))
            .set_environment(chunk_environment(lua)?)
            .eval()
            .with_context(|| anyhow!("loading component file {:?}", self.loader))?;
        let component = match component {
            Value::Function(f) => f,
            other => bail!("component file {:?} evaluated to a {}, not a function",
                           self.loader, other.type_name()),
        };
        let props: Table = match props {
            Some(Value::Table(t)) => t.clone(),
            _ => lua.create_table()?,
        };
        let result: Value = component.call(props).with_context(
            || anyhow!("calling component from {:?}", self.loader))?;
        Ok(ComponentDefinition::from_result(&result)?.map(|def| def.to_html()))
    }
}

/// The rendered-to-be parts of a component result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDefinition {
    pub name: String,
    pub styles: String,
    pub content: Vec<String>,
}

impl ComponentDefinition {
    /// `None` unless `result` is a table with a `name` field and a
    /// table-valued `template` field.
    pub fn from_result(result: &Value) -> mlua::Result<Option<ComponentDefinition>> {
        let Value::Table(result) = result else {
            return Ok(None)
        };
        let Some(name) = value_text(&result.raw_get::<Value>("name")?) else {
            return Ok(None)
        };
        let Value::Table(template) = result.raw_get::<Value>("template")? else {
            return Ok(None)
        };
        let styles = value_text(&template.raw_get::<Value>("styles")?)
            .unwrap_or_default();
        let mut content = Vec::new();
        if let Value::Table(items) = template.raw_get::<Value>("content")? {
            for item in items.sequence_values::<Value>() {
                if let Some(text) = value_text(&item?) {
                    content.push(text);
                }
            }
        }
        Ok(Some(ComponentDefinition { name, styles, content }))
    }

    pub fn to_html(&self) -> String {
        let ComponentDefinition { name, styles, content } = self;
        let content = content.join("\n    ");
        format!("<{name}>\n  <template shadowrootmode=\"open\">\n    <style>{styles}</style>\n    \
                 {content}\n  </template>\n</{name}>")
    }
}
