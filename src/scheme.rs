//! A single search scheme.
//!
//! A [`Scheme`] owns its directory under the plugin data root:
//!
//! ```text
//! <data_root>/<name>/
//!   .ms_scheme.meta.toml
//!   lang/
//!     en_us.yml
//!     zh_cn.yml
//! ```
//!
//! The metadata is loaded once on construction and cached; the cache is
//! what searches and help messages read. Edits on disk take effect only
//! after [`Scheme::reload`] (or a full plugin reload).

use anyhow::Result;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

use crate::command::{CommandNode, CommandSource};
use crate::host::Host;
use crate::locale;
use crate::metadata::{MetadataStore, SchemeMetadata};
use crate::search::{resolve_urls, CommandLayout, Delivery};
use crate::text::{ClickAction, RStyle, RText};

/// Name of the language directory inside a scheme directory.
pub const LANG_FOLDER_NAME: &str = "lang";

const KEYWORD_ARG: &str = "keyword";

pub struct Scheme {
    name: String,
    host: Arc<dyn Host>,
    store: MetadataStore,
    cached: RwLock<SchemeMetadata>,
}

impl Scheme {
    /// Open scheme `name`, creating its directory and metadata as needed.
    pub fn new(host: Arc<dyn Host>, name: &str) -> Self {
        let dir = host.data_root().join(name);
        if let Err(e) = ensure_dir(&dir) {
            tracing::warn!("{:#}", e);
        }
        let store = MetadataStore::new(name, &dir);
        let meta = store.load();
        Self {
            name: name.to_string(),
            host,
            store,
            cached: RwLock::new(meta),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir_path(&self) -> PathBuf {
        self.host.data_root().join(&self.name)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    pub fn lang_path(&self) -> PathBuf {
        self.dir_path().join(LANG_FOLDER_NAME)
    }

    pub fn enabled(&self) -> bool {
        self.cached.read().enabled
    }

    pub fn prefix(&self) -> String {
        self.cached.read().command_prefix.clone()
    }

    /// Snapshot of the cached metadata.
    pub fn metadata(&self) -> SchemeMetadata {
        self.cached.read().clone()
    }

    /// Re-read the metadata file into the cache.
    pub fn reload(&self) {
        let meta = self.store.load();
        *self.cached.write() = meta;
    }

    /// Persist `meta`, or the cached record when `None`.
    pub fn save_meta(&self, meta: Option<&SchemeMetadata>) -> Result<()> {
        match meta {
            Some(meta) => self.store.save(meta),
            None => self.store.save(&self.cached.read()),
        }
    }

    /// `<plugin-id>.<scheme-name>.`
    pub fn translation_prefix(&self) -> String {
        format!("{}.{}.", self.host.plugin_id(), self.name)
    }

    /// Qualify `key` with this scheme's namespace unless it already is.
    pub fn translation_key(&self, key: &str) -> String {
        let prefix = self.translation_prefix();
        if key.starts_with(&prefix) {
            key.to_string()
        } else {
            format!("{}{}", prefix, key)
        }
    }

    /// Translated text for a scheme-relative (or already qualified) key.
    pub fn rtr(&self, key: &str, args: &[(&str, &str)]) -> RText {
        RText::translation(self.translation_key(key), args)
    }

    pub fn create_default_lang(&self) -> Result<()> {
        locale::create_default_lang(self.host.as_ref(), &self.lang_path())
    }

    /// Register this scheme's language files. Returns the locales registered.
    pub fn register_translation(&self) -> Vec<String> {
        locale::register_translations(self.host.as_ref(), &self.lang_path(), &self.name)
    }

    /// Register translations, the command, and the help entry. Disabled
    /// schemes register nothing.
    pub fn register(self: &Arc<Self>) {
        let meta = self.metadata();
        let Some(layout) = CommandLayout::from_metadata(&meta) else {
            tracing::debug!("Scheme {} is disabled, skipping registration", self.name);
            return;
        };
        if layout.prefix.is_empty() {
            tracing::warn!(
                "Scheme {} is enabled but has no command_prefix, skipping registration",
                self.name
            );
            return;
        }

        self.register_translation();
        self.host.register_command(self.build_command(&layout));
        self.host
            .register_help_message(&layout.prefix, self.rtr("help.mcdr", &[]));
    }

    /// Turn a layout into a command tree bound to this scheme.
    pub fn build_command(self: &Arc<Self>, layout: &CommandLayout) -> CommandNode {
        let permission = layout.permission;
        let help = Arc::clone(self);
        let prefix = layout.prefix.clone();
        let flag = layout.flag;
        let flagged = Arc::clone(self);
        let flagged_delivery = layout.flagged_delivery;
        let plain = Arc::clone(self);
        let default_delivery = layout.default_delivery;

        CommandNode::literal(&layout.prefix)
            .requires(move |src| src.has_permission(permission))
            .runs(move |src, _| {
                let args = [("prefix", prefix.as_str()), ("flag", flag)];
                src.reply(help.rtr("help.detailed", &args));
            })
            .then(
                CommandNode::literal(layout.flag).then(
                    CommandNode::greedy_text(KEYWORD_ARG).runs(move |src, ctx| {
                        let keyword = ctx.get(KEYWORD_ARG).unwrap_or_default().to_string();
                        flagged.search(src, keyword, flagged_delivery);
                    }),
                ),
            )
            .then(
                CommandNode::greedy_text(KEYWORD_ARG).runs(move |src, ctx| {
                    let keyword = ctx.get(KEYWORD_ARG).unwrap_or_default().to_string();
                    plain.search(src, keyword, default_delivery);
                }),
            )
    }

    /// Build and deliver search links in the background.
    pub fn search(
        self: &Arc<Self>,
        source: Arc<dyn CommandSource>,
        keyword: String,
        delivery: Delivery,
    ) {
        let scheme = Arc::clone(self);
        self.host.execute(
            "search",
            Box::new(move || {
                let lines = scheme.search_lines(&keyword)?;
                for line in lines {
                    match delivery {
                        Delivery::Broadcast => scheme.host.broadcast(line),
                        Delivery::Reply => source.reply(line),
                    }
                }
                Ok(())
            }),
        );
    }

    /// One clickable line per URL template, in persisted order.
    pub fn search_lines(&self, keyword: &str) -> Result<Vec<RText>> {
        let urls = resolve_urls(&self.cached.read(), keyword)?;
        Ok(urls
            .into_iter()
            .map(|(id, url)| {
                RText::literal("[")
                    .append(self.rtr(&format!("id.{}", id), &[]).styled(RStyle::Bold))
                    .append(RText::literal("] "))
                    .append(self.rtr("search.text", &[("keyword", keyword)]))
                    .hover(self.rtr("search.hover", &[]))
                    .click(ClickAction::OpenUrl(url))
            })
            .collect())
    }
}

/// Make sure `dir` is a directory, removing a plain file in the way.
pub(crate) fn ensure_dir(dir: &std::path::Path) -> Result<()> {
    use anyhow::Context;

    if dir.is_file() {
        std::fs::remove_file(dir)
            .with_context(|| format!("Failed to remove file at {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}
