//! The host runtime a plugin runs inside.
//!
//! Everything the scheme subsystem needs from its surroundings goes
//! through [`Host`]: where data lives, how to register commands, help
//! entries and translations, how to reach every connected user, and how
//! to run work off the command thread. The terminal implementation lives
//! in [`crate::console`]; tests provide their own recording hosts.

use anyhow::{bail, Result};
use serde_json::Value;
use std::path::Path;

use crate::command::CommandNode;
use crate::task::{self, Task};
use crate::text::RText;

/// Resources compiled into the crate, served by [`Host::bundled_resource`].
const BUNDLED: &[(&str, &[u8])] = &[(
    "sample_language.yml",
    include_bytes!("../resources/sample_language.yml"),
)];

/// Look up a compiled-in resource by name.
pub fn bundled(name: &str) -> Result<Vec<u8>> {
    match BUNDLED.iter().find(|(n, _)| *n == name) {
        Some((_, bytes)) => Ok(bytes.to_vec()),
        None => bail!("No bundled resource named '{}'", name),
    }
}

pub trait Host: Send + Sync {
    /// Plugin identifier; the root of every translation key this plugin owns.
    fn plugin_id(&self) -> &str;

    /// Per-plugin data directory. Each scheme lives in a subdirectory.
    fn data_root(&self) -> &Path;

    fn register_command(&self, node: CommandNode);

    /// Add an entry to the host's help listing.
    fn register_help_message(&self, prefix: &str, text: RText);

    /// Merge a nested translation payload for `locale`.
    fn register_translation(&self, locale: &str, data: Value);

    /// Deliver `text` to every connected recipient.
    fn broadcast(&self, text: RText);

    /// Ask the host to unload and load this plugin again. The reload
    /// happens after the current command returns.
    fn reload_plugin(&self);

    fn bundled_resource(&self, name: &str) -> Result<Vec<u8>> {
        bundled(name)
    }

    /// Run `task` in the background under `name`. Fire-and-forget: the
    /// caller learns nothing about completion or failure.
    fn execute(&self, name: &str, task: Task) {
        if let Err(e) = task::spawn_named(name, task) {
            tracing::error!("Failed to start background task {}: {}", name, e);
        }
    }
}
