//! Terminal host.
//!
//! [`ConsoleHost`] runs the plugin against a single local operator: the
//! console is both the invoking source and the only broadcast recipient.
//! Replies are written as plain text (with the click target appended as
//! `<url>`) or as raw JSON text components, one per line.
//!
//! ```text
//! > !!g foo bar
//! [Default] Click to search "foo bar" <https://www.google.com/search?q=foo%20bar>
//! > !!g -a foo
//! [all] [Default] Click to search "foo" <https://www.google.com/search?q=foo>
//! ```

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::command::{dispatch_from, CommandError, CommandNode, CommandSource, CommandTree};
use crate::config::Config;
use crate::host::Host;
use crate::locale::TranslationStore;
use crate::registry::SchemeRegistry;
use crate::task::{self, Task};
use crate::text::RText;

/// Built-in host command listing registered help entries.
pub const HELP_COMMAND: &str = "!!help";

pub struct ConsoleHost {
    config: Config,
    tree: RwLock<CommandTree>,
    help: RwLock<Vec<(String, RText)>>,
    translations: RwLock<TranslationStore>,
    out: Mutex<Box<dyn Write + Send>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
    reload_requested: AtomicBool,
}

impl ConsoleHost {
    pub fn new(config: Config, out: Box<dyn Write + Send>) -> Arc<Self> {
        let translations = TranslationStore::new(config.plugin.fallback_locale.clone());
        Arc::new(Self {
            config,
            tree: RwLock::new(CommandTree::new()),
            help: RwLock::new(Vec::new()),
            translations: RwLock::new(translations),
            out: Mutex::new(out),
            pending: Mutex::new(Vec::new()),
            reload_requested: AtomicBool::new(false),
        })
    }

    pub fn stdout(config: Config) -> Arc<Self> {
        Self::new(config, Box::new(std::io::stdout()))
    }

    /// The console operator as a command source.
    pub fn source(self: &Arc<Self>) -> Arc<ConsoleSource> {
        Arc::new(ConsoleSource {
            host: Arc::clone(self),
            name: self.config.console.name.clone(),
            permission: self.config.console.permission,
            locale: self.config.console.locale.clone(),
        })
    }

    /// Load the plugin: discover schemes and register everything.
    pub fn load_plugin(self: &Arc<Self>) -> Result<Arc<SchemeRegistry>> {
        let host: Arc<dyn Host> = Arc::clone(self) as Arc<dyn Host>;
        let registry = SchemeRegistry::new(host, self.config.admin_options());
        registry.on_load()?;
        Ok(registry)
    }

    /// Drop every command, help entry and translation the plugin registered.
    pub fn unload_plugin(&self) {
        self.wait_idle();
        self.tree.write().clear();
        self.help.write().clear();
        self.translations.write().clear();
    }

    /// Dispatch one command line, then perform a reload if one was requested.
    pub fn run_line(
        self: &Arc<Self>,
        registry: &mut Arc<SchemeRegistry>,
        line: &str,
    ) -> Result<()> {
        let source: Arc<dyn CommandSource> = self.source();
        if let Err(e) = self.dispatch(Arc::clone(&source), line) {
            source.reply(RText::literal(e.to_string()));
        }

        if self.reload_requested.swap(false, Ordering::SeqCst) {
            self.unload_plugin();
            *registry = self.load_plugin()?;
            tracing::info!("Plugin {} reloaded", self.config.plugin.id);
        }
        Ok(())
    }

    pub fn dispatch(&self, source: Arc<dyn CommandSource>, line: &str) -> Result<(), CommandError> {
        let line = line.trim();
        if line == HELP_COMMAND {
            self.print_help(source.as_ref());
            return Ok(());
        }

        let head = line.split_whitespace().next().unwrap_or_default();
        let root = self
            .tree
            .read()
            .find_root(head)
            .cloned()
            .ok_or_else(|| CommandError::UnknownCommand(head.to_string()))?;
        dispatch_from(&root, source, line)
    }

    fn print_help(&self, source: &dyn CommandSource) {
        let entries = self.help.read().clone();
        for (prefix, text) in entries {
            source.reply(RText::literal(format!("{}: ", prefix)).append(text));
        }
    }

    /// Join every background task started so far.
    pub fn wait_idle(&self) {
        loop {
            let handles = std::mem::take(&mut *self.pending.lock());
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                let _ = handle.join();
            }
        }
    }

    pub fn reload_requested(&self) -> bool {
        self.reload_requested.load(Ordering::SeqCst)
    }

    pub fn translations(&self) -> TranslationStore {
        self.translations.read().clone()
    }

    pub fn commands(&self) -> CommandTree {
        self.tree.read().clone()
    }

    /// Render `text` for `locale` in the configured output format.
    pub fn render(&self, target: Option<&str>, text: &RText, locale: &str) -> String {
        let translations = self.translations.read();
        if self.config.console.output == "json" {
            let value: Value = json!({
                "target": target.unwrap_or("@a"),
                "component": text.to_json(&*translations, locale),
            });
            return value.to_string();
        }

        let mut line = String::new();
        if target.is_none() {
            line.push_str("[all] ");
        }
        line.push_str(&text.to_plain(&*translations, locale));
        if let Some(url) = text.click_url() {
            line.push_str(&format!(" <{}>", url));
        }
        line
    }

    fn emit(&self, line: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::warn!("Failed to write console output: {}", e);
        }
    }
}

impl Host for ConsoleHost {
    fn plugin_id(&self) -> &str {
        &self.config.plugin.id
    }

    fn data_root(&self) -> &Path {
        &self.config.plugin.data_dir
    }

    fn register_command(&self, node: CommandNode) {
        self.tree.write().register(node);
    }

    fn register_help_message(&self, prefix: &str, text: RText) {
        self.help.write().push((prefix.to_string(), text));
    }

    fn register_translation(&self, locale: &str, data: Value) {
        self.translations.write().register(locale, &data);
    }

    fn broadcast(&self, text: RText) {
        let line = self.render(None, &text, &self.config.console.locale);
        self.emit(&line);
    }

    fn reload_plugin(&self) {
        self.reload_requested.store(true, Ordering::SeqCst);
    }

    fn execute(&self, name: &str, task: Task) {
        match task::spawn_named(name, task) {
            Ok(handle) => self.pending.lock().push(handle),
            Err(e) => tracing::error!("Failed to start background task {}: {}", name, e),
        }
    }
}

/// The local operator.
pub struct ConsoleSource {
    host: Arc<ConsoleHost>,
    name: String,
    permission: u8,
    locale: String,
}

impl CommandSource for ConsoleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn permission_level(&self) -> u8 {
        self.permission
    }

    fn locale(&self) -> &str {
        &self.locale
    }

    fn reply(&self, text: RText) {
        let line = self.host.render(Some(&self.name), &text, &self.locale);
        self.host.emit(&line);
    }
}
