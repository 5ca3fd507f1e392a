//! Scope timing for performance debugging.

//! `time_guard!` only reports if the `TIME_GUARD` env var is set to a
//! truthy value or `enabled_set(true)` was called in the thread.

use std::{cell::Cell, fmt::Debug, time::Instant};

use crate::util::env_flag;

thread_local!{
    pub static ENABLED: Cell<bool> = Cell::new(
        env_flag("TIME_GUARD", false).unwrap_or(false));
}

/// Enable `time_guard!` for the current thread.
pub fn enabled_set(on: bool) {
    ENABLED.with(|cell| cell.set(on))
}

pub fn enabled() -> bool {
    ENABLED.with(|old| old.get())
}

pub enum TimeGuard<S: Debug> {
    Disabled,
    Enabled {
        name: S,
        start: Instant
    },
}

impl<S: Debug> Drop for TimeGuard<S> {
    fn drop(&mut self) {
        match self {
            TimeGuard::Disabled => (),
            TimeGuard::Enabled { name, start } => {
                let elapsed = start.elapsed();
                log::debug!("{name:?}: {elapsed:?}");
            }
        }
    }
}

#[macro_export]
macro_rules! time_guard {
    ($namestr:expr) => {
        let _guard = if $crate::time_guard::enabled() {
            $crate::time_guard::TimeGuard::Enabled {
                name: $namestr,
                start: std::time::Instant::now()
            }
        } else {
            $crate::time_guard::TimeGuard::Disabled
        };
    }
}
