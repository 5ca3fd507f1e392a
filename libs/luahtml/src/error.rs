//! Page-level rendering errors.

//! Script failures (`Execution`, `Call`) are kept apart from
//! convention failures (`ScriptContract`, `EmptyOutput`) so that a
//! caller can tell "the script is broken" from "the script returned
//! the wrong kind of thing". Failures of custom components never show
//! up here, they render as empty fragments.

use crate::def_boxed_thiserror;

def_boxed_thiserror!(RenderError, pub enum RenderErrorKind {
    #[error("could not set up the script context")]
    Setup(#[source] mlua::Error),

    #[error("template execution error")]
    Execution(#[source] mlua::Error),

    #[error("template did not produce any output")]
    EmptyOutput,

    #[error("template {0}")]
    ScriptContract(&'static str),

    #[error("failed to call template function")]
    Call(#[source] mlua::Error),
});

impl RenderErrorKind {
    /// True for errors raised by the Lua code itself (as opposed to
    /// it not following the template conventions).
    pub fn is_script_failure(&self) -> bool {
        match self {
            RenderErrorKind::Execution(_) | RenderErrorKind::Call(_) => true,
            RenderErrorKind::Setup(_)
                | RenderErrorKind::EmptyOutput
                | RenderErrorKind::ScriptContract(_) => false,
        }
    }
}
