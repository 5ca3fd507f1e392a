//! The table of names a template script can call.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use kstring::KString;
use log::debug;

use crate::{component::CustomComponent, meta::{ElementSpec, DEFAULT_ELEMENTS}};

/// What a DSL name is bound to.
#[derive(Debug, Clone)]
pub enum Binding {
    Element(Arc<ElementSpec>),
    Custom(Arc<CustomComponent>),
    /// CSS text helper: passes strings through, turns a
    /// `{ [selector] = rules }` table into rule blocks.
    StyleSheet,
}

/// Built once at startup, then shared read-only by all script
/// contexts (there is no unregistration). Registering a name again
/// replaces the previous binding.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    bindings: HashMap<KString, Binding>,
}

impl ComponentRegistry {
    pub fn new() -> ComponentRegistry {
        Default::default()
    }

    /// The standard HTML elements, with `Style` bound to the CSS text
    /// helper instead of the `<style>` element.
    pub fn with_html_elements() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        for spec in DEFAULT_ELEMENTS.iter() {
            registry.register_element(spec.clone());
        }
        registry.register_style_helper("Style");
        registry
    }

    fn bind(&mut self, name: &str, binding: Binding) -> &mut Self {
        if let Some(old) = self.bindings.insert(KString::from_ref(name), binding) {
            debug!("replacing binding for {name:?} (was {old:?})");
        }
        self
    }

    pub fn register(&mut self, name: &str, self_closing: bool) -> &mut Self {
        self.register_element(ElementSpec::new(name, self_closing))
    }

    /// A paired element whose single string argument is emitted
    /// verbatim as its body.
    pub fn register_raw_body(&mut self, name: &str) -> &mut Self {
        self.register_element(ElementSpec::new(name, false).with_raw_body())
    }

    pub fn register_element(&mut self, spec: ElementSpec) -> &mut Self {
        let name = spec.name.clone();
        self.bind(&name, Binding::Element(Arc::new(spec)))
    }

    pub fn register_custom(&mut self, name: &str, loader: impl Into<PathBuf>) -> &mut Self {
        self.bind(name, Binding::Custom(Arc::new(CustomComponent::new(loader))))
    }

    pub fn register_style_helper(&mut self, name: &str) -> &mut Self {
        self.bind(name, Binding::StyleSheet)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KString, &Binding)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
