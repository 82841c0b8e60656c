//! Scheme discovery and the administrative command surface.
//!
//! Every subdirectory of the plugin data root is one scheme, named after
//! the directory:
//!
//! ```text
//! <data_root>/
//!   google/
//!     .ms_scheme.meta.toml
//!     lang/
//!   bing/
//!     .ms_scheme.meta.toml
//! ```
//!
//! The registry discovers these once on load, registers every enabled
//! scheme with the host, and exposes the admin tree:
//!
//! ```text
//! !!ms list          show every scheme with its state and prefix
//! !!ms new <name>    create a disabled scheme with default files
//! !!ms reload        reload the whole plugin
//! ```
//!
//! Schemes are only ever added at runtime. Removing one means deleting its
//! directory and reloading.

use anyhow::Result;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

use crate::command::{CommandNode, CommandSource};
use crate::host::Host;
use crate::scheme::{ensure_dir, Scheme};
use crate::text::{RStyle, RText};

/// Root literal and permission of the admin tree.
#[derive(Debug, Clone)]
pub struct AdminOptions {
    pub prefix: String,
    pub permission: u8,
}

impl Default for AdminOptions {
    fn default() -> Self {
        Self {
            prefix: "!!ms".to_string(),
            permission: 4,
        }
    }
}

/// Owns every discovered [`Scheme`], keyed by name in discovery order.
pub struct SchemeRegistry {
    host: Arc<dyn Host>,
    admin: AdminOptions,
    schemes: RwLock<IndexMap<String, Arc<Scheme>>>,
}

impl SchemeRegistry {
    pub fn new(host: Arc<dyn Host>, admin: AdminOptions) -> Arc<Self> {
        Arc::new(Self {
            host,
            admin,
            schemes: RwLock::new(IndexMap::new()),
        })
    }

    /// Discover schemes, register the enabled ones, then the admin tree.
    pub fn on_load(self: &Arc<Self>) -> Result<()> {
        self.load_schemes()?;

        for scheme in self.schemes() {
            tracing::debug!("Scheme {} enabled: {}", scheme.name(), scheme.enabled());
            scheme.register();
        }

        self.host.register_command(self.admin_command());
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Discovery
    // ═══════════════════════════════════════════════════════════════════

    /// Resolve a directory under the data root, creating it (and removing
    /// a plain file in its place) when `parts` is non-empty.
    pub fn data_folder(&self, parts: &[&str]) -> Result<PathBuf> {
        let mut dir = self.host.data_root().to_path_buf();
        if parts.is_empty() {
            return Ok(dir);
        }
        for part in parts {
            dir.push(part);
        }
        ensure_dir(&dir)?;
        Ok(dir)
    }

    /// Create a [`Scheme`] for every subdirectory of the data root.
    /// Plain files and directories whose name is not UTF-8 are ignored.
    /// Directory names are visited in sorted order so `list` output is
    /// stable across platforms.
    pub fn load_schemes(&self) -> Result<()> {
        let root = self.host.data_root();
        ensure_dir(root)?;

        let mut names: Vec<String> = std::fs::read_dir(root)?
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| match entry.file_name().into_string() {
                Ok(name) => Some(name),
                Err(raw) => {
                    tracing::debug!("Ignored scheme directory with non UTF-8 name {:?}", raw);
                    None
                }
            })
            .collect();
        names.sort();

        let mut schemes = self.schemes.write();
        for name in names {
            let scheme = Scheme::new(Arc::clone(&self.host), &name);
            schemes.insert(name, Arc::new(scheme));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════

    pub fn get(&self, name: &str) -> Option<Arc<Scheme>> {
        self.schemes.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemes.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.schemes.read().keys().cloned().collect()
    }

    pub fn schemes(&self) -> Vec<Arc<Scheme>> {
        self.schemes.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.schemes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.read().is_empty()
    }

    /// Whether `name` can be created: a single, unused directory name.
    pub fn can_create(&self, name: &str) -> bool {
        is_valid_scheme_name(name) && !self.contains(name)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Admin Operations
    // ═══════════════════════════════════════════════════════════════════

    /// `!!ms list` — one line per scheme: `[√] <prefix> => <name>`.
    pub fn list(&self, source: &dyn CommandSource) {
        for scheme in self.schemes() {
            let symbol = if scheme.enabled() { "√" } else { "x" };
            source.reply(
                RText::literal("[")
                    .append(RText::literal(symbol).styled(RStyle::Underlined))
                    .append(RText::literal(format!(
                        "] {} => {}",
                        scheme.prefix(),
                        scheme.name()
                    ))),
            );
        }
    }

    /// `!!ms new <name>` — create a disabled scheme with default language
    /// files. Callers must have checked [`can_create`](Self::can_create).
    pub fn new_scheme(&self, source: &dyn CommandSource, name: &str) {
        let scheme = Arc::new(Scheme::new(Arc::clone(&self.host), name));
        if let Err(e) = scheme.create_default_lang() {
            tracing::warn!("Failed to create default language files for {}: {:#}", name, e);
        }
        self.schemes.write().insert(name.to_string(), scheme);

        tracing::info!("Scheme created: {}", name);
        source.reply(RText::literal(format!(
            "Scheme created: {}, pls check meta and enable",
            name
        )));
    }

    /// `!!ms reload` — ask the host to reload the whole plugin.
    pub fn reload(&self, source: &dyn CommandSource) {
        source.reply(RText::literal("Reloaded"));
        self.host.reload_plugin();
    }

    /// The admin command tree.
    pub fn admin_command(self: &Arc<Self>) -> CommandNode {
        let permission = self.admin.permission;
        let lister = Arc::clone(self);
        let guard = Arc::clone(self);
        let creator = Arc::clone(self);
        let reloader = Arc::clone(self);

        CommandNode::literal(&self.admin.prefix)
            .requires(move |src| src.has_permission(permission))
            .then(CommandNode::literal("list").runs(move |src, _| lister.list(src.as_ref())))
            .then(
                CommandNode::literal("new").then(
                    CommandNode::quotable_text("name")
                        .requires_ctx(move |_, ctx| {
                            ctx.get("name").is_some_and(|name| guard.can_create(name))
                        })
                        .runs(move |src, ctx| {
                            if let Some(name) = ctx.get("name") {
                                creator.new_scheme(src.as_ref(), name);
                            }
                        }),
                ),
            )
            .then(CommandNode::literal("reload").runs(move |src, _| reloader.reload(src.as_ref())))
    }
}

/// A scheme name must be usable as exactly one directory component.
pub fn is_valid_scheme_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}
