//! Per-scheme language files and the translation store.
//!
//! Each scheme may ship a `lang/` directory with one file per locale,
//! named `<locale>.<suffix>`. The suffix picks the parser:
//!
//! | Suffix | Format |
//! |--------|--------|
//! | `.json` | JSON |
//! | `.yml`, `.yaml` | YAML |
//! | `.toml` | TOML |
//!
//! Payloads are nested mappings. They are registered under
//! `<plugin-id>.<scheme-name>.` so two schemes can both define
//! `help.detailed` without clobbering each other.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::host::Host;
use crate::text::Translator;

/// Bundled template written by [`create_default_lang`].
pub const SAMPLE_LANGUAGE_RESOURCE: &str = "sample_language.yml";

/// Locales materialised for a freshly created scheme.
pub const DEFAULT_LOCALES: &[&str] = &["en_us", "zh_cn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFormat {
    Json,
    Yaml,
    Toml,
}

const SUFFIXES: &[(LanguageFormat, &[&str])] = &[
    (LanguageFormat::Json, &[".json"]),
    (LanguageFormat::Yaml, &[".yml", ".yaml"]),
    (LanguageFormat::Toml, &[".toml"]),
];

/// A recognised language file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageFile {
    pub path: PathBuf,
    pub format: LanguageFormat,
    pub locale: String,
}

impl LanguageFile {
    /// Classify `path` by its suffix. Returns `None` for unknown suffixes.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let (format, locale) = locale_from_filename(file_name)?;
        Some(Self {
            path: path.to_path_buf(),
            format,
            locale,
        })
    }

    /// Read and parse the file into a nested JSON value.
    pub fn parse(&self) -> Result<Value> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read language file: {}", self.path.display()))?;
        let value = match self.format {
            LanguageFormat::Json => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", self.path.display()))?,
            LanguageFormat::Yaml => serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML in {}", self.path.display()))?,
            LanguageFormat::Toml => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", self.path.display()))?,
        };
        Ok(value)
    }
}

/// Split a file name into `(format, locale)` using the suffix table.
pub fn locale_from_filename(file_name: &str) -> Option<(LanguageFormat, String)> {
    for (format, suffixes) in SUFFIXES {
        for suffix in *suffixes {
            if let Some(locale) = file_name.strip_suffix(suffix) {
                if !locale.is_empty() {
                    return Some((*format, locale.to_string()));
                }
            }
        }
    }
    None
}

/// Register every recognised language file in `lang_dir` under
/// `<plugin-id>.<scheme_name>`. Returns the locales registered.
///
/// A missing directory is not an error. Unknown suffixes are skipped at
/// debug level; unreadable or malformed files are skipped with a warning.
pub fn register_translations(host: &dyn Host, lang_dir: &Path, scheme_name: &str) -> Vec<String> {
    let mut registered = Vec::new();
    if !lang_dir.is_dir() {
        return registered;
    }

    let entries = match std::fs::read_dir(lang_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list language directory {}: {}", lang_dir.display(), e);
            return registered;
        }
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if !path.is_file() {
            continue;
        }
        let Some(file) = LanguageFile::from_path(&path) else {
            tracing::debug!("Ignored language file {}", path.display());
            continue;
        };
        let data = match file.parse() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Skipped language file: {:#}", e);
                continue;
            }
        };

        let mut scheme = Map::new();
        scheme.insert(scheme_name.to_string(), data);
        let mut root = Map::new();
        root.insert(host.plugin_id().to_string(), Value::Object(scheme));
        host.register_translation(&file.locale, Value::Object(root));

        tracing::info!("Registered language {} for scheme {}", file.locale, scheme_name);
        registered.push(file.locale);
    }

    registered
}

/// Recreate `lang_dir` from the bundled template, one file per
/// [`DEFAULT_LOCALES`] entry. Existing files of the same name are overwritten.
pub fn create_default_lang(host: &dyn Host, lang_dir: &Path) -> Result<()> {
    if lang_dir.is_file() {
        std::fs::remove_file(lang_dir)
            .with_context(|| format!("Failed to remove file at {}", lang_dir.display()))?;
    }
    std::fs::create_dir_all(lang_dir)
        .with_context(|| format!("Failed to create {}", lang_dir.display()))?;

    let template = host.bundled_resource(SAMPLE_LANGUAGE_RESOURCE)?;
    for locale in DEFAULT_LOCALES {
        let path = lang_dir.join(format!("{}.yml", locale));
        std::fs::write(&path, &template)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Translation Store
// ═══════════════════════════════════════════════════════════════════════

/// Flattened translations per locale with a fallback locale.
#[derive(Debug, Clone)]
pub struct TranslationStore {
    fallback_locale: String,
    entries: HashMap<String, HashMap<String, String>>,
}

impl TranslationStore {
    pub fn new(fallback_locale: impl Into<String>) -> Self {
        Self {
            fallback_locale: fallback_locale.into(),
            entries: HashMap::new(),
        }
    }

    /// Merge a nested payload for `locale`. Later registrations of the
    /// same key overwrite earlier ones.
    pub fn register(&mut self, locale: &str, data: &Value) {
        let table = self.entries.entry(locale.to_string()).or_default();
        flatten_into(table, String::new(), data);
    }

    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        self.entries
            .get(locale)
            .and_then(|t| t.get(key))
            .or_else(|| {
                self.entries
                    .get(&self.fallback_locale)
                    .and_then(|t| t.get(key))
            })
            .map(String::as_str)
    }

    /// Whether any locale has a key starting with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.entries
            .values()
            .any(|t| t.keys().any(|k| k.starts_with(prefix)))
    }

    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        locales.sort();
        locales
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Translator for TranslationStore {
    fn translate(&self, locale: &str, key: &str) -> Option<String> {
        self.get(locale, key).map(str::to_string)
    }
}

fn flatten_into(table: &mut HashMap<String, String>, prefix: String, value: &Value) {
    let join = |k: &str| {
        if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{}.{}", prefix, k)
        }
    };
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(table, join(k), v);
            }
        }
        Value::String(s) => {
            table.insert(prefix, s.clone());
        }
        Value::Null => {}
        other => {
            table.insert(prefix, other.to_string());
        }
    }
}
