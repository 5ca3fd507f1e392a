//! Exposing a `ComponentRegistry` to Lua.

//! Each registered name becomes a global holding a `DslCallable`
//! userdata: the binding record plus one generic `__call` dispatch,
//! instead of a separately generated closure per tag.

use kstring::KString;
use mlua::{Lua, MetaMethod, Table, UserData, UserDataMethods, Value, Variadic};

use crate::{element::{render_element, value_text}, registry::{Binding, ComponentRegistry}};

pub struct DslCallable {
    name: KString,
    binding: Binding,
}

impl DslCallable {
    fn call(&self, lua: &Lua, args: &[Value]) -> mlua::Result<Value> {
        let html = match &self.binding {
            Binding::Element(spec) => render_element(spec, args)?,
            Binding::Custom(component) =>
                component.load_and_render(lua, &self.name, args.first()),
            Binding::StyleSheet =>
                match style_sheet(args)? {
                    Some(css) => css,
                    None => return Ok(Value::Nil),
                },
        };
        Ok(Value::String(lua.create_string(&html)?))
    }
}

impl UserData for DslCallable {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Call, |lua, this, args: Variadic<Value>| {
            this.call(lua, &args)
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("dsl: {}", this.name))
        });
    }
}

/// The `Style` helper: a string is returned as is, a table yields
/// `"selector { rules }"` for each string key, sorted by selector and
/// joined by newlines. No argument gives nil.
fn style_sheet(args: &[Value]) -> mlua::Result<Option<String>> {
    match args.first() {
        None => Ok(None),
        Some(Value::Table(rules)) => {
            let mut blocks = Vec::new();
            for pair in rules.pairs::<Value, Value>() {
                let (selector, rule) = pair?;
                if let Value::String(selector) = selector {
                    let rule = value_text(&rule).unwrap_or_default();
                    blocks.push(format!("{} {{ {rule} }}", selector.to_string_lossy()));
                }
            }
            blocks.sort();
            Ok(Some(blocks.join("\n")))
        }
        Some(other) => Ok(value_text(other)),
    }
}

/// A fresh environment for running one chunk. Reads fall through to
/// the globals, where `install` put the bindings; assignments,
/// including those through `_G`, stay in the returned table.
pub fn chunk_environment(lua: &Lua) -> mlua::Result<Table> {
    let env = lua.create_table()?;
    let meta = lua.create_table_with_capacity(0, 1)?;
    meta.raw_set("__index", lua.globals())?;
    env.set_metatable(Some(meta));
    env.raw_set("_G", env.clone())?;
    Ok(env)
}

/// Bind every name in `registry` as a global of `lua`.
pub fn install(lua: &Lua, registry: &ComponentRegistry) -> mlua::Result<()> {
    let globals = lua.globals();
    for (name, binding) in registry.iter() {
        let callable = lua.create_userdata(DslCallable {
            name: name.clone(),
            binding: binding.clone(),
        })?;
        globals.raw_set(name.as_str(), callable)?;
    }
    Ok(())
}
