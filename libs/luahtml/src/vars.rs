//! Conversion of externally supplied template variables to Lua.

use log::warn;
use mlua::{Lua, Table, Value};
use serde_json::{Map, Value as JsonValue};

/// Template variables as received from the outside, e.g. parsed from
/// a JSON object.
pub type Vars = Map<String, JsonValue>;

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// `None` for anything that is not text, a number or a boolean.
fn scalar_to_lua(lua: &Lua, value: &JsonValue) -> mlua::Result<Option<Value>> {
    Ok(Some(match value {
        JsonValue::String(s) => Value::String(lua.create_string(s)?),
        JsonValue::Bool(b) => Value::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Number(f)
            } else {
                return Ok(None)
            }
        }
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => return Ok(None),
    }))
}

fn sequence_to_lua(lua: &Lua, key: &str, items: &[JsonValue]) -> mlua::Result<Table> {
    let table = lua.create_table_with_capacity(items.len(), 0)?;
    let mut i = 0;
    for item in items {
        if let Some(value) = scalar_to_lua(lua, item)? {
            i += 1;
            table.raw_set(i, value)?;
        } else {
            warn!("unsupported type for element of variable {key:?}: {}", json_kind(item));
        }
    }
    Ok(table)
}

/// Build the Lua table handed to a template's render function. Text,
/// integers, floats and booleans convert to their Lua counterparts,
/// arrays of those to sequences. Other values (objects, null, nested
/// arrays) are skipped with a warning; rendering goes on without
/// them.
pub fn bind_vars(lua: &Lua, vars: &Vars) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    for (key, value) in vars {
        if let Some(v) = scalar_to_lua(lua, value)? {
            table.raw_set(key.as_str(), v)?;
        } else if let JsonValue::Array(items) = value {
            table.raw_set(key.as_str(), sequence_to_lua(lua, key, items)?)?;
        } else {
            warn!("unsupported type for variable {key:?}: {}", json_kind(value));
        }
    }
    Ok(table)
}
