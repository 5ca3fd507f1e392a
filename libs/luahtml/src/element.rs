//! Translation of one DSL tag call into an HTML fragment.

//! Nothing is escaped: attribute values and content are interpolated
//! verbatim. Nested tag calls have already returned strings, and
//! escaping at this point would double-escape those.

use std::collections::BTreeMap;

use kstring::KString;
use mlua::{Table, Value};

use crate::meta::{ElementSpec, DOCTYPE};

/// Text form of a Lua scalar or string as it appears in the markup.
/// Integers and floats give their decimal form (floats without a
/// fractional part print like integers), booleans `true`/`false`.
/// `None` for nil and for tables, functions and other reference
/// values, whose `tostring` form is an address.
pub fn value_text(value: &Value) -> Option<String> {
    Some(match value {
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => number_text(*n),
        Value::String(s) => s.to_string_lossy(),
        _ => return None,
    })
}

fn number_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// The classified arguments of a tag call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderArgs {
    /// Sorted by key so that output does not depend on Lua's table
    /// traversal order.
    pub attributes: BTreeMap<KString, KString>,
    pub content: Vec<String>,
}

fn has_string_key(table: &Table) -> mlua::Result<bool> {
    for pair in table.pairs::<Value, Value>() {
        let (key, _) = pair?;
        if let Value::String(_) = key {
            return Ok(true)
        }
    }
    Ok(false)
}

impl RenderArgs {
    /// Split call arguments into attributes and content. A lone table
    /// holds attributes if it has at least one string key, content
    /// otherwise. A table followed by another table: the first holds
    /// attributes, the second content. Any further arguments are
    /// content; tables among them contribute their sequence part.
    pub fn classify(args: &[Value]) -> mlua::Result<RenderArgs> {
        let mut rargs = RenderArgs::default();
        match args.split_first() {
            Some((Value::Table(first), rest)) => {
                let first_is_attributes = match rest.first() {
                    Some(Value::Table(_)) => true,
                    _ => has_string_key(first)?,
                };
                if first_is_attributes {
                    rargs.push_attributes(first)?;
                } else {
                    rargs.push_sequence(first)?;
                }
                for arg in rest {
                    rargs.push_content(arg)?;
                }
            }
            _ => {
                for arg in args {
                    rargs.push_content(arg)?;
                }
            }
        }
        Ok(rargs)
    }

    fn push_attributes(&mut self, table: &Table) -> mlua::Result<()> {
        for pair in table.pairs::<Value, Value>() {
            let (key, value) = pair?;
            // array positions are never attributes
            if let Value::String(key) = key {
                if let Some(value) = value_text(&value) {
                    self.attributes.insert(KString::from_string(key.to_string_lossy()),
                                           KString::from_string(value));
                }
            }
        }
        Ok(())
    }

    fn push_sequence(&mut self, table: &Table) -> mlua::Result<()> {
        for item in table.sequence_values::<Value>() {
            if let Some(text) = value_text(&item?) {
                self.content.push(text);
            }
        }
        Ok(())
    }

    fn push_content(&mut self, value: &Value) -> mlua::Result<()> {
        match value {
            Value::Table(table) => self.push_sequence(table),
            _ => {
                if let Some(text) = value_text(value) {
                    self.content.push(text);
                }
                Ok(())
            }
        }
    }

    pub fn attributes_html(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(value);
            out.push('"');
        }
        out
    }

    /// Compose the fragment. Self-closing elements drop the content.
    pub fn render(&self, spec: &ElementSpec) -> String {
        let tag = &spec.tag_name;
        let attributes = self.attributes_html();
        if spec.self_closing {
            format!("<{tag}{attributes}>")
        } else {
            let doctype = if spec.doctype { DOCTYPE } else { "" };
            let content = self.content.concat();
            format!("{doctype}<{tag}{attributes}>{content}</{tag}>")
        }
    }
}

/// Render one call of the tag function described by `spec`.
pub fn render_element(spec: &ElementSpec, args: &[Value]) -> mlua::Result<String> {
    if args.is_empty() {
        return Ok(spec.empty_html())
    }
    if spec.raw_body {
        if let [Value::String(body)] = args {
            let tag = &spec.tag_name;
            return Ok(format!("<{tag}>{}</{tag}>", body.to_string_lossy()))
        }
    }
    Ok(RenderArgs::classify(args)?.render(spec))
}
