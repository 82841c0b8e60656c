//! Persisted per-scheme configuration.
//!
//! Every scheme directory holds a `.ms_scheme.meta.toml`:
//!
//! ```toml
//! name = "google"
//! enabled = true
//! permission = 1
//! default_broadcast = false
//! command_prefix = "!!g"
//!
//! [url]
//! default = "https://www.google.com/search?q={keyword}"
//! ```
//!
//! Loading never fails. A missing or corrupt file is replaced by the
//! default record, and a file whose `name` disagrees with its directory is
//! corrected; in both cases the result is written back immediately so the
//! on-disk and in-memory copies agree.

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the metadata document inside a scheme directory.
pub const META_FILE_NAME: &str = ".ms_scheme.meta.toml";

/// Highest permission level a source can hold.
pub const MAX_PERMISSION_LEVEL: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeMetadata {
    pub name: String,
    pub enabled: bool,
    pub permission: u8,
    pub default_broadcast: bool,
    pub command_prefix: String,
    /// Template id → URL template containing `{keyword}`. Order is kept.
    pub url: IndexMap<String, String>,
}

impl Default for SchemeMetadata {
    fn default() -> Self {
        let mut url = IndexMap::new();
        url.insert("default".to_string(), "{keyword}".to_string());
        Self {
            name: String::new(),
            enabled: false,
            permission: 0,
            default_broadcast: false,
            command_prefix: String::new(),
            url,
        }
    }
}

impl SchemeMetadata {
    /// Default record owned by scheme `name`.
    pub fn default_for(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Value checks beyond what deserialization enforces.
    pub fn validate(&self) -> Result<()> {
        if self.permission > MAX_PERMISSION_LEVEL {
            bail!(
                "permission must be in 0..={}, got {}",
                MAX_PERMISSION_LEVEL,
                self.permission
            );
        }
        if self.command_prefix.chars().any(char::is_whitespace) {
            bail!(
                "command_prefix must be a single token, got '{}'",
                self.command_prefix
            );
        }
        Ok(())
    }

    /// Parse a metadata document and validate it.
    pub fn from_toml(content: &str) -> Result<Self> {
        let meta: SchemeMetadata =
            toml::from_str(content).context("Failed to parse scheme metadata")?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scheme metadata")
    }
}

/// How a [`MetadataStore::load`] arrived at its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read as-is.
    Loaded,
    /// The file named another scheme; `name` was corrected and saved.
    Renamed,
    /// The file was missing; defaults were written.
    Created,
    /// The file was corrupt; defaults were written over it.
    Recovered,
}

/// Reads and writes one scheme's metadata file.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    scheme_name: String,
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(scheme_name: impl Into<String>, scheme_dir: &Path) -> Self {
        Self {
            scheme_name: scheme_name.into(),
            path: scheme_dir.join(META_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the metadata, healing the file when needed.
    pub fn load(&self) -> SchemeMetadata {
        self.load_with_outcome().0
    }

    pub fn load_with_outcome(&self) -> (SchemeMetadata, LoadOutcome) {
        let (meta, outcome) = match self.read() {
            Ok(None) => (SchemeMetadata::default_for(&self.scheme_name), LoadOutcome::Created),
            Ok(Some(mut meta)) => {
                if meta.name != self.scheme_name {
                    meta.name = self.scheme_name.clone();
                    (meta, LoadOutcome::Renamed)
                } else {
                    (meta, LoadOutcome::Loaded)
                }
            }
            Err(e) => {
                tracing::info!(
                    "Scheme meta for {} is invalid, resetting to defaults: {:#}",
                    self.scheme_name,
                    e
                );
                (SchemeMetadata::default_for(&self.scheme_name), LoadOutcome::Recovered)
            }
        };

        if outcome != LoadOutcome::Loaded {
            if let Err(e) = self.save(&meta) {
                tracing::warn!("{:#}", e);
            }
        }

        tracing::info!("Loaded scheme meta: {}", self.scheme_name);
        (meta, outcome)
    }

    /// Overwrite the metadata file with `meta`.
    pub fn save(&self, meta: &SchemeMetadata) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = meta.to_toml()?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write scheme meta: {}", self.path.display()))
    }

    fn read(&self) -> Result<Option<SchemeMetadata>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read scheme meta: {}", self.path.display()))?;
        SchemeMetadata::from_toml(&content).map(Some)
    }
}
