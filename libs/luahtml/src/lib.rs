//! HTML generation from Lua scripts.
//!
//! Scripts call functions named after HTML elements (`Div`, `P`,
//! `Img`, ...) which return the markup as strings:
//!
//! ```lua
//! return function(vars)
//!   return Html({lang = "en"}, { Body({ H1(vars.heading) }) })
//! end
//! ```
//!
//! Custom components are Lua files rendering to elements holding a
//! declarative shadow root.

pub mod boxed_error;
pub mod error;
pub mod meta;
pub mod element;
pub mod component;
pub mod registry;
pub mod dsl;
pub mod vars;
pub mod context;
pub mod pool;

pub use context::ScriptContext;
pub use error::{RenderError, RenderErrorKind};
pub use pool::{ContextGuard, ContextPool};
pub use registry::{Binding, ComponentRegistry};
pub use vars::Vars;
