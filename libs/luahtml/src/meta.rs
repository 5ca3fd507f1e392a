//! Static information about the DSL's HTML elements.

use kstring::KString;
use lazy_static::lazy_static;

/// How one DSL tag function renders. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    /// The name as visible from Lua, e.g. `Div`.
    pub name: KString,
    /// Lower-cased name used in the markup, e.g. `div`.
    pub tag_name: KString,
    /// Void element: never has a body or a closing tag.
    pub self_closing: bool,
    /// A single string argument is emitted verbatim as the body
    /// (script bodies must not be parsed as DSL arguments).
    pub raw_body: bool,
    /// Prepend the doctype marker (the document root).
    pub doctype: bool,
}

impl ElementSpec {
    pub fn new(name: &str, self_closing: bool) -> ElementSpec {
        let tag_name = name.to_lowercase();
        ElementSpec {
            name: KString::from_ref(name),
            doctype: tag_name == "html",
            tag_name: KString::from_string(tag_name),
            self_closing,
            raw_body: false,
        }
    }

    pub fn with_raw_body(mut self) -> ElementSpec {
        self.raw_body = true;
        self
    }

    /// The rendering of a call without arguments.
    pub fn empty_html(&self) -> String {
        let tag = &self.tag_name;
        if self.self_closing {
            format!("<{tag}>")
        } else {
            format!("<{tag}></{tag}>")
        }
    }
}

pub const DOCTYPE: &str = "<!DOCTYPE html>";

// (name, self_closing, raw_body)
const HTML_ELEMENTS: &[(&str, bool, bool)] = &[
    ("Html", false, false),
    ("Head", false, false),
    ("Body", false, false),
    ("Title", false, false),
    ("Div", false, false),
    ("P", false, false),
    ("Span", false, false),
    ("A", false, false),
    ("Img", true, false),
    ("H1", false, false),
    ("H2", false, false),
    ("H3", false, false),
    ("H4", false, false),
    ("H5", false, false),
    ("H6", false, false),
    ("Ul", false, false),
    ("Ol", false, false),
    ("Li", false, false),
    ("Table", false, false),
    ("Tr", false, false),
    ("Td", false, false),
    ("Form", false, false),
    ("Input", true, false),
    ("Button", false, false),
    ("Label", false, false),
    ("Script", false, true),
    ("Style", false, false),
    // void in HTML
    ("Link", true, false),
    ("Template", false, false),
    ("Meta", true, false),
    ("Br", true, false),
    ("Hr", true, false),
];

lazy_static!{
    /// The elements every registry made by
    /// `ComponentRegistry::with_html_elements` starts out with.
    pub static ref DEFAULT_ELEMENTS: Vec<ElementSpec> =
        HTML_ELEMENTS.iter().map(|&(name, self_closing, raw_body)| {
            let spec = ElementSpec::new(name, self_closing);
            if raw_body {
                spec.with_raw_body()
            } else {
                spec
            }
        }).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_empty_html() {
        for spec in DEFAULT_ELEMENTS.iter() {
            let t = spec.name.to_lowercase();
            if spec.self_closing {
                assert_eq!(spec.empty_html(), format!("<{t}>"));
            } else {
                assert_eq!(spec.empty_html(), format!("<{t}></{t}>"));
            }
        }
        assert_eq!(ElementSpec::new("MyThing", false).empty_html(),
                   "<mything></mything>");
    }

    #[test]
    fn t_flags() {
        let get = |name: &str| DEFAULT_ELEMENTS.iter()
            .find(|s| s.name.as_str() == name).expect("present").clone();
        assert!(get("Html").doctype);
        assert!(!get("Head").doctype);
        assert!(get("Script").raw_body);
        assert!(!get("Style").raw_body);
        for void in ["Meta", "Img", "Input", "Br", "Hr", "Link"] {
            assert!(get(void).self_closing, "{void}");
        }
        assert!(!get("Div").self_closing);
    }
}
