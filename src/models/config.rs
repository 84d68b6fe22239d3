use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Run configuration loaded from the JSON config file.
///
/// Loaded once by [`crate::config::ConfigManager`] and read-only for the
/// rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomtidyConfig {
    /// Log every move/delete/rename without touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,

    /// Collection root; every top-level directory is a system folder.
    pub root_path: Utf8PathBuf,

    /// Journal destination (append-only).
    #[serde(default = "default_log_file")]
    pub log_file: Utf8PathBuf,

    /// Suffix appended to folders that match no configured system.
    #[serde(default = "default_unknown_system_tag")]
    pub unknown_system_tag: String,

    /// Infix marking folders that resolved through an alias.
    #[serde(default = "default_alias_system_tag")]
    pub alias_system_tag: String,

    #[serde(default)]
    pub force_lowercase_folders: bool,

    /// Canonical system key → per-system rules.
    #[serde(default)]
    pub systems: IndexMap<String, SystemConfig>,

    /// Raw lowercase folder name → canonical system key.
    #[serde(default)]
    pub aliases: IndexMap<String, String>,
}

/// Per-system rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    /// Valid ROM extensions: lowercase, no leading dot.
    #[serde(default)]
    pub extensions: BTreeSet<String>,

    pub zip_policy: ZipPolicy,

    /// Normalize plain file names too, not just extracted archive entries.
    #[serde(default)]
    pub romm_naming: bool,
}

/// How zip archives inside a system folder are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZipPolicy {
    /// No zips may survive; valid ROMs are extracted first.
    Forbid,
    /// Extract valid ROMs and drop the archive.
    Extract,
    /// Keep unambiguous archives, ask about the rest.
    Allow,
    /// Archives are the expected storage form and are left alone.
    Require,
}

impl ZipPolicy {
    /// Policies under which no archive may remain after the run.
    pub fn demands_removal(self) -> bool {
        matches!(self, ZipPolicy::Forbid | ZipPolicy::Extract)
    }
}

impl std::fmt::Display for ZipPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ZipPolicy::Forbid => "forbid",
            ZipPolicy::Extract => "extract",
            ZipPolicy::Allow => "allow",
            ZipPolicy::Require => "require",
        };
        f.write_str(name)
    }
}

fn default_log_file() -> Utf8PathBuf {
    Utf8PathBuf::from("romtidy.log")
}

fn default_unknown_system_tag() -> String {
    "_unknown".to_string()
}

fn default_alias_system_tag() -> String {
    "_needsRename".to_string()
}

impl SystemConfig {
    pub fn new<I, S>(extensions: I, zip_policy: ZipPolicy, romm_naming: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .collect(),
            zip_policy,
            romm_naming,
        }
    }

    /// Case-insensitive membership test; `ext` may carry a leading dot.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        !ext.is_empty() && self.extensions.contains(&normalize_extension(ext))
    }

    /// True when no loose-file extension is configured (nothing or only `zip`).
    pub fn is_archive_only(&self) -> bool {
        self.extensions.iter().all(|e| e == "zip")
    }
}

impl RomtidyConfig {
    /// Minimal configuration rooted at `root_path` with default tags.
    pub fn new(root_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dry_run: false,
            root_path: root_path.into(),
            log_file: default_log_file(),
            unknown_system_tag: default_unknown_system_tag(),
            alias_system_tag: default_alias_system_tag(),
            force_lowercase_folders: false,
            systems: IndexMap::new(),
            aliases: IndexMap::new(),
        }
    }

    pub fn with_system(mut self, key: &str, system: SystemConfig) -> Self {
        self.systems.insert(key.to_lowercase(), system);
        self
    }

    pub fn with_alias(mut self, alias: &str, key: &str) -> Self {
        self.aliases.insert(alias.to_lowercase(), key.to_lowercase());
        self
    }

    /// Get the rules for a canonical system key
    pub fn system(&self, key: &str) -> Option<&SystemConfig> {
        self.systems.get(key)
    }

    /// Lowercase keys, alias targets and extensions in place.
    pub fn normalize(&mut self) {
        self.systems = std::mem::take(&mut self.systems)
            .into_iter()
            .map(|(key, mut system)| {
                system.extensions = system
                    .extensions
                    .iter()
                    .map(|e| normalize_extension(e))
                    .filter(|e| !e.is_empty())
                    .collect();
                (key.trim().to_lowercase(), system)
            })
            .collect();

        self.aliases = std::mem::take(&mut self.aliases)
            .into_iter()
            .map(|(alias, key)| (alias.trim().to_lowercase(), key.trim().to_lowercase()))
            .collect();
    }
}

/// Lowercase an extension and drop a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
