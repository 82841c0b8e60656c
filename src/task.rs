//! Named background execution.
//!
//! Search dispatch never runs on the command thread. Each unit of work
//! gets its own OS thread named `MultiSearch@<TaskName>`; whatever goes
//! wrong inside it (an `Err` or a panic) is logged with that name and
//! stops there. Callers get a [`JoinHandle`] only so hosts can wait for
//! quiescence; the task's outcome is not observable through it.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use anyhow::Result;

/// Prefix shared by every background thread this crate starts.
pub const THREAD_PREFIX: &str = "MultiSearch@";

/// A unit of background work.
pub type Task = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// Thread name for a snake_case task name, e.g. `search` → `MultiSearch@Search`.
pub fn thread_name(task: &str) -> String {
    format!("{}{}", THREAD_PREFIX, to_camel_case(task, '_', true))
}

/// Run `task` on a fresh named thread, logging any failure at its boundary.
///
/// The thread logs through the caller's current `tracing` dispatcher.
pub fn spawn_named<F>(task_name: &str, task: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let name = thread_name(task_name);
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    thread::Builder::new().name(name.clone()).spawn(move || {
        let _guard = tracing::dispatcher::set_default(&dispatch);
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(thread = %name, "Error running thread {}: {:#}", name, e);
            }
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(thread = %name, "Thread {} panicked: {}", name, msg);
            }
        }
    })
}

/// Join words split by `divider` into camel case.
///
/// `upper` selects UpperCamelCase; otherwise the first letter is lowered.
pub fn to_camel_case(s: &str, divider: char, upper: bool) -> String {
    let mut out: String = s.split(divider).map(capitalize).collect();
    if !upper {
        if let Some(first) = out.chars().next() {
            let lowered: String = first.to_lowercase().collect();
            out.replace_range(..first.len_utf8(), &lowered);
        }
    }
    out
}

/// Uppercase the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
