//! End-to-end tests for schemes and the registry against a recording host.
//!
//! The host below records every registration and delivery so the tests
//! can observe exactly what a real chat host would receive. Background
//! searches run on real named threads; tests join them before asserting.

use multi_search::command::{CommandError, CommandNode, CommandSource, CommandTree};
use multi_search::host::Host;
use multi_search::locale::TranslationStore;
use multi_search::metadata::{SchemeMetadata, META_FILE_NAME};
use multi_search::registry::{AdminOptions, SchemeRegistry};
use multi_search::task::{self, Task};
use multi_search::text::RText;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tempfile::TempDir;

// ─── Recording Host ─────────────────────────────────────────────────

struct RecordingHost {
    root: PathBuf,
    tree: Mutex<CommandTree>,
    help: Mutex<Vec<String>>,
    translations: Mutex<TranslationStore>,
    broadcasts: Mutex<Vec<RText>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
    reloads: Mutex<usize>,
}

impl RecordingHost {
    fn new(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            root: root.to_path_buf(),
            tree: Mutex::new(CommandTree::new()),
            help: Mutex::new(Vec::new()),
            translations: Mutex::new(TranslationStore::new("en_us")),
            broadcasts: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            reloads: Mutex::new(0),
        })
    }

    fn dispatch(&self, source: Arc<dyn CommandSource>, line: &str) -> Result<(), CommandError> {
        let tree = self.tree.lock().clone();
        tree.dispatch(source, line)
    }

    fn join_all(&self) {
        let handles = std::mem::take(&mut *self.pending.lock());
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

impl Host for RecordingHost {
    fn plugin_id(&self) -> &str {
        "multi_search"
    }

    fn data_root(&self) -> &Path {
        &self.root
    }

    fn register_command(&self, node: CommandNode) {
        self.tree.lock().register(node);
    }

    fn register_help_message(&self, prefix: &str, _text: RText) {
        self.help.lock().push(prefix.to_string());
    }

    fn register_translation(&self, locale: &str, data: Value) {
        self.translations.lock().register(locale, &data);
    }

    fn broadcast(&self, text: RText) {
        self.broadcasts.lock().push(text);
    }

    fn reload_plugin(&self) {
        *self.reloads.lock() += 1;
    }

    fn execute(&self, name: &str, task: Task) {
        let handle = task::spawn_named(name, task).unwrap();
        self.pending.lock().push(handle);
    }
}

struct Player {
    level: u8,
    replies: Mutex<Vec<RText>>,
}

impl Player {
    fn new(level: u8) -> Arc<Self> {
        Arc::new(Self {
            level,
            replies: Mutex::new(Vec::new()),
        })
    }

    fn reply_texts(&self, host: &RecordingHost) -> Vec<String> {
        let translations = host.translations.lock();
        self.replies
            .lock()
            .iter()
            .map(|t| t.to_plain(&*translations, "en_us"))
            .collect()
    }
}

impl CommandSource for Player {
    fn name(&self) -> &str {
        "Steve"
    }
    fn permission_level(&self) -> u8 {
        self.level
    }
    fn locale(&self) -> &str {
        "en_us"
    }
    fn reply(&self, text: RText) {
        self.replies.lock().push(text);
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn write_scheme(root: &Path, name: &str, meta: &SchemeMetadata) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(META_FILE_NAME), meta.to_toml().unwrap()).unwrap();
}

fn enabled_meta(name: &str, prefix: &str, urls: &[(&str, &str)]) -> SchemeMetadata {
    let mut meta = SchemeMetadata::default_for(name);
    meta.enabled = true;
    meta.command_prefix = prefix.to_string();
    meta.permission = 1;
    meta.url.clear();
    for (id, template) in urls {
        meta.url.insert(id.to_string(), template.to_string());
    }
    meta
}

fn loaded(tmp: &TempDir) -> (Arc<RecordingHost>, Arc<SchemeRegistry>) {
    let host = RecordingHost::new(tmp.path());
    let registry = SchemeRegistry::new(host.clone(), AdminOptions::default());
    registry.on_load().unwrap();
    (host, registry)
}

fn urls_of(texts: &[RText]) -> Vec<String> {
    texts
        .iter()
        .filter_map(|t| t.click_url().map(str::to_string))
        .collect()
}

// ─── Discovery & Admin ──────────────────────────────────────────────

#[test]
fn discovery_ignores_plain_files() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("alpha")).unwrap();
    std::fs::create_dir_all(tmp.path().join("beta")).unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "not a scheme").unwrap();

    let (_host, registry) = loaded(&tmp);
    assert_eq!(registry.names(), vec!["alpha", "beta"]);
    assert!(tmp.path().join("alpha").join(META_FILE_NAME).is_file());
}

#[test]
fn created_scheme_is_listed_exactly_once() {
    let tmp = TempDir::new().unwrap();
    let (host, registry) = loaded(&tmp);
    let admin = Player::new(4);

    host.dispatch(admin.clone(), "!!ms new google").unwrap();
    host.dispatch(admin.clone(), "!!ms list").unwrap();

    let texts = admin.reply_texts(&host);
    assert_eq!(texts[0], "Scheme created: google, pls check meta and enable");
    let listed: Vec<&String> = texts.iter().filter(|t| t.ends_with("=> google")).collect();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], "[x]  => google");

    let lang = tmp.path().join("google").join("lang");
    assert!(lang.join("en_us.yml").is_file());
    assert!(lang.join("zh_cn.yml").is_file());
    assert!(registry.get("google").is_some_and(|s| !s.enabled()));
}

#[test]
fn creating_existing_scheme_is_rejected_without_mutation() {
    let tmp = TempDir::new().unwrap();
    write_scheme(
        tmp.path(),
        "google",
        &enabled_meta("google", "!!g", &[("default", "https://g/{keyword}")]),
    );
    let (host, registry) = loaded(&tmp);
    let meta_path = tmp.path().join("google").join(META_FILE_NAME);
    let before = std::fs::read_to_string(&meta_path).unwrap();

    let err = host.dispatch(Player::new(4), "!!ms new google").unwrap_err();
    assert_eq!(err, CommandError::RequirementNotMet("<name>".to_string()));

    assert_eq!(registry.len(), 1);
    assert_eq!(std::fs::read_to_string(&meta_path).unwrap(), before);
    assert!(!tmp.path().join("google").join("lang").exists());
}

#[test]
fn invalid_directory_names_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let (host, registry) = loaded(&tmp);
    assert!(host.dispatch(Player::new(4), "!!ms new \"../escape\"").is_err());
    assert!(registry.is_empty());
}

#[test]
fn admin_tree_requires_high_permission() {
    let tmp = TempDir::new().unwrap();
    let (host, registry) = loaded(&tmp);
    let err = host.dispatch(Player::new(3), "!!ms new google").unwrap_err();
    assert_eq!(err, CommandError::RequirementNotMet("!!ms".to_string()));
    assert!(registry.is_empty());
}

#[test]
fn reload_replies_and_requests_host_reload() {
    let tmp = TempDir::new().unwrap();
    let (host, _registry) = loaded(&tmp);
    let admin = Player::new(4);
    host.dispatch(admin.clone(), "!!ms reload").unwrap();
    assert_eq!(admin.reply_texts(&host), vec!["Reloaded"]);
    assert_eq!(*host.reloads.lock(), 1);
}

// ─── Metadata Healing ───────────────────────────────────────────────

#[test]
fn wrong_name_is_corrected_on_discovery() {
    let tmp = TempDir::new().unwrap();
    write_scheme(
        tmp.path(),
        "google",
        &enabled_meta("bing", "!!g", &[("default", "https://g/{keyword}")]),
    );

    let (_host, registry) = loaded(&tmp);
    let scheme = registry.get("google").unwrap();
    assert_eq!(scheme.metadata().name, "google");

    let on_disk = std::fs::read_to_string(scheme.meta_path()).unwrap();
    assert_eq!(SchemeMetadata::from_toml(&on_disk).unwrap().name, "google");

    scheme.reload();
    assert_eq!(std::fs::read_to_string(scheme.meta_path()).unwrap(), on_disk);
}

#[test]
fn corrupt_meta_becomes_stable_default() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("broken");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(META_FILE_NAME), "this is = = not toml").unwrap();

    let (host, registry) = loaded(&tmp);
    let scheme = registry.get("broken").unwrap();
    assert_eq!(scheme.metadata(), SchemeMetadata::default_for("broken"));
    assert_eq!(host.tree.lock().len(), 1);

    let first = std::fs::read_to_string(scheme.meta_path()).unwrap();
    scheme.reload();
    assert_eq!(scheme.metadata(), SchemeMetadata::default_for("broken"));
    assert_eq!(std::fs::read_to_string(scheme.meta_path()).unwrap(), first);
}

// ─── Registration ───────────────────────────────────────────────────

#[test]
fn disabled_scheme_registers_no_command_or_translation() {
    let tmp = TempDir::new().unwrap();
    let mut meta = enabled_meta("quiet", "!!q", &[("default", "https://q/{keyword}")]);
    meta.enabled = false;
    write_scheme(tmp.path(), "quiet", &meta);
    let lang = tmp.path().join("quiet").join("lang");
    std::fs::create_dir_all(&lang).unwrap();
    std::fs::write(lang.join("en_us.yml"), "help:\n  detailed: quiet help\n").unwrap();

    let (host, _registry) = loaded(&tmp);
    let tree = host.tree.lock();
    assert!(tree.find_root("!!q").is_none());
    assert!(tree.find_root("!!ms").is_some());
    assert!(!host.translations.lock().has_prefix("multi_search.quiet."));
    assert!(host.help.lock().is_empty());
}

#[test]
fn unknown_language_files_do_not_block_siblings() {
    let tmp = TempDir::new().unwrap();
    write_scheme(
        tmp.path(),
        "google",
        &enabled_meta("google", "!!g", &[("default", "https://g/{keyword}")]),
    );
    let lang = tmp.path().join("google").join("lang");
    std::fs::create_dir_all(&lang).unwrap();
    std::fs::write(lang.join("en_us.yml"), "id:\n  default: Google\n").unwrap();
    std::fs::write(lang.join("zh_cn.yml"), "id:\n  default: 谷歌\n").unwrap();
    std::fs::write(lang.join("foo.unknownext"), "garbage").unwrap();

    let (host, _registry) = loaded(&tmp);
    let translations = host.translations.lock();
    assert_eq!(translations.get("en_us", "multi_search.google.id.default"), Some("Google"));
    assert_eq!(translations.get("zh_cn", "multi_search.google.id.default"), Some("谷歌"));
    assert_eq!(translations.locales(), vec!["en_us", "zh_cn"]);
}

#[test]
fn malformed_language_files_do_not_block_siblings() {
    let tmp = TempDir::new().unwrap();
    write_scheme(
        tmp.path(),
        "google",
        &enabled_meta("google", "!!g", &[("default", "https://g/{keyword}")]),
    );
    let lang = tmp.path().join("google").join("lang");
    std::fs::create_dir_all(&lang).unwrap();
    std::fs::write(lang.join("bad.json"), "{ not json").unwrap();
    std::fs::write(lang.join("broken.yml"), "id: [unclosed\n").unwrap();
    std::fs::write(lang.join("en_us.yml"), "id:\n  default: Google\n").unwrap();

    let (host, _registry) = loaded(&tmp);
    let translations = host.translations.lock();
    assert_eq!(translations.get("en_us", "multi_search.google.id.default"), Some("Google"));
    assert_eq!(translations.locales(), vec!["en_us"]);
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_directories_are_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join(OsStr::from_bytes(b"bad\xff"))).unwrap();
    std::fs::create_dir_all(tmp.path().join("good")).unwrap();

    let (_host, registry) = loaded(&tmp);
    assert_eq!(registry.names(), vec!["good"]);
}

#[test]
fn schemes_share_leaf_keys_without_collision() {
    let tmp = TempDir::new().unwrap();
    for (name, prefix, help) in [("a", "!!a", "help A"), ("b", "!!b", "help B")] {
        let meta = enabled_meta(name, prefix, &[("d", "https://x/{keyword}")]);
        write_scheme(tmp.path(), name, &meta);
        let lang = tmp.path().join(name).join("lang");
        std::fs::create_dir_all(&lang).unwrap();
        let body = format!(r#"{{"help": {{"detailed": "{}"}}}}"#, help);
        std::fs::write(lang.join("en_us.json"), body).unwrap();
    }

    let (host, _registry) = loaded(&tmp);
    let player = Player::new(1);
    host.dispatch(player.clone(), "!!a").unwrap();
    host.dispatch(player.clone(), "!!b").unwrap();
    assert_eq!(player.reply_texts(&host), vec!["help A", "help B"]);
}

// ─── Search ─────────────────────────────────────────────────────────

#[test]
fn private_search_replies_with_encoded_link() {
    let tmp = TempDir::new().unwrap();
    write_scheme(tmp.path(), "x", &enabled_meta("x", "!!x", &[("default", "https://x/{keyword}")]));
    let (host, _registry) = loaded(&tmp);
    let player = Player::new(1);

    host.dispatch(player.clone(), "!!x foo bar").unwrap();
    host.join_all();

    assert_eq!(urls_of(&player.replies.lock()), vec!["https://x/foo%20bar"]);
    assert!(host.broadcasts.lock().is_empty());
}

#[test]
fn broadcast_flag_sends_same_link_to_everyone() {
    let tmp = TempDir::new().unwrap();
    write_scheme(tmp.path(), "x", &enabled_meta("x", "!!x", &[("default", "https://x/{keyword}")]));
    let (host, _registry) = loaded(&tmp);
    let player = Player::new(1);

    host.dispatch(player.clone(), "!!x -a foo bar").unwrap();
    host.join_all();

    assert!(player.replies.lock().is_empty());
    assert_eq!(urls_of(&host.broadcasts.lock()), vec!["https://x/foo%20bar"]);
}

#[test]
fn default_broadcast_inverts_flag() {
    let tmp = TempDir::new().unwrap();
    let mut meta = enabled_meta("x", "!!x", &[("default", "https://x/{keyword}")]);
    meta.default_broadcast = true;
    write_scheme(tmp.path(), "x", &meta);
    let (host, _registry) = loaded(&tmp);
    let player = Player::new(1);

    host.dispatch(player.clone(), "!!x loud").unwrap();
    host.dispatch(player.clone(), "!!x -s quiet").unwrap();
    host.join_all();

    assert_eq!(urls_of(&host.broadcasts.lock()), vec!["https://x/loud"]);
    assert_eq!(urls_of(&player.replies.lock()), vec!["https://x/quiet"]);
    assert_eq!(
        host.dispatch(player.clone(), "!!x -s").unwrap_err(),
        CommandError::Incomplete
    );
}

#[test]
fn multiple_templates_produce_ordered_messages() {
    let tmp = TempDir::new().unwrap();
    write_scheme(
        tmp.path(),
        "x",
        &enabled_meta("x", "!!x", &[("a", "https://a/{keyword}"), ("b", "https://b/{keyword}")]),
    );
    let (host, _registry) = loaded(&tmp);
    let player = Player::new(1);

    host.dispatch(player.clone(), "!!x k").unwrap();
    host.join_all();

    assert_eq!(urls_of(&player.replies.lock()), vec!["https://a/k", "https://b/k"]);
}

#[test]
fn empty_url_map_yields_no_messages() {
    let tmp = TempDir::new().unwrap();
    write_scheme(tmp.path(), "x", &enabled_meta("x", "!!x", &[]));
    let (host, _registry) = loaded(&tmp);
    let player = Player::new(1);

    host.dispatch(player.clone(), "!!x k").unwrap();
    host.join_all();

    assert!(player.replies.lock().is_empty());
}

#[test]
fn malformed_template_delivers_nothing() {
    let tmp = TempDir::new().unwrap();
    write_scheme(
        tmp.path(),
        "x",
        &enabled_meta(
            "x",
            "!!x",
            &[("ok", "https://ok/{keyword}"), ("bad", "https://bad/{query}")],
        ),
    );
    let (host, _registry) = loaded(&tmp);
    let player = Player::new(1);

    host.dispatch(player.clone(), "!!x k").unwrap();
    host.join_all();

    assert!(player.replies.lock().is_empty());
}

#[test]
fn insufficient_permission_blocks_search() {
    let tmp = TempDir::new().unwrap();
    let mut meta = enabled_meta("x", "!!x", &[("default", "https://x/{keyword}")]);
    meta.permission = 3;
    write_scheme(tmp.path(), "x", &meta);
    let (host, _registry) = loaded(&tmp);
    let player = Player::new(1);

    assert!(host.dispatch(player.clone(), "!!x k").is_err());
    host.join_all();
    assert!(player.replies.lock().is_empty());
}

#[test]
fn cached_metadata_ignores_disk_edits_until_reload() {
    let tmp = TempDir::new().unwrap();
    let old = enabled_meta("x", "!!x", &[("default", "https://old/{keyword}")]);
    write_scheme(tmp.path(), "x", &old);
    let (host, registry) = loaded(&tmp);
    let new = enabled_meta("x", "!!x", &[("default", "https://new/{keyword}")]);
    write_scheme(tmp.path(), "x", &new);

    let player = Player::new(1);
    host.dispatch(player.clone(), "!!x k").unwrap();
    host.join_all();
    registry.get("x").unwrap().reload();
    host.dispatch(player.clone(), "!!x k").unwrap();
    host.join_all();

    assert_eq!(urls_of(&player.replies.lock()), vec!["https://old/k", "https://new/k"]);
}
