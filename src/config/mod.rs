use crate::models::{RomtidyConfig, SystemConfig, ZipPolicy};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// Reasons a configuration file is rejected after parsing.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rootPath must not be empty")]
    EmptyRootPath,

    #[error("{0} must not be empty")]
    EmptyTag(&'static str),

    #[error("{field} must not contain path separators: {tag:?}")]
    TagWithSeparator { field: &'static str, tag: String },

    #[error("system keys must not be empty")]
    EmptySystemKey,

    #[error("alias {alias:?} points at {target:?}, which is itself an alias")]
    AliasChain { alias: String, target: String },
}

/// Configuration manager for loading and saving the JSON configuration file.
///
/// The file holds a single [`RomtidyConfig`] with camelCase keys. Keys and
/// extensions are normalized to lowercase on load and the result is
/// validated before it is handed to a run.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager bound to a configuration file.
    ///
    /// # Arguments
    /// * `config_path` - Path of the JSON file (e.g., "romtidy.json")
    pub fn new<P: AsRef<Utf8Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load, normalize and validate the configuration file.
    ///
    /// # Returns
    /// The loaded RomtidyConfig. A missing file is an error because
    /// `rootPath` has no sensible default.
    pub fn load_config(&self) -> Result<RomtidyConfig> {
        let file_contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let mut config: RomtidyConfig = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        config.normalize();
        validate(&config).with_context(|| format!("Invalid config: {}", self.config_path))?;
        warn_on_dangling_aliases(&config);

        tracing::info!(
            "Loaded config from {} ({} systems, {} aliases)",
            self.config_path,
            config.systems.len(),
            config.aliases.len()
        );
        Ok(config)
    }

    /// Save the configuration file as pretty-printed JSON.
    ///
    /// # Arguments
    /// * `config` - The RomtidyConfig to save
    pub fn save_config(&self, config: &RomtidyConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent()
            && !parent.as_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent))?;
        }

        let json_string =
            serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?;

        fs::write(&self.config_path, json_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

/// A sample configuration covering common systems.
///
/// Used by `romtidy gen-config` as a starting point.
pub fn default_config() -> RomtidyConfig {
    RomtidyConfig::new("roms")
        .with_system("nes", SystemConfig::new(["nes", "fds"], ZipPolicy::Forbid, true))
        .with_system("snes", SystemConfig::new(["sfc", "smc"], ZipPolicy::Extract, true))
        .with_system("gb", SystemConfig::new(["gb"], ZipPolicy::Extract, true))
        .with_system("gbc", SystemConfig::new(["gbc"], ZipPolicy::Extract, true))
        .with_system("gba", SystemConfig::new(["gba"], ZipPolicy::Extract, true))
        .with_system(
            "genesis",
            SystemConfig::new(["md", "gen", "smd", "bin"], ZipPolicy::Extract, true),
        )
        .with_system("n64", SystemConfig::new(["z64", "n64", "v64"], ZipPolicy::Allow, true))
        .with_system(
            "psx",
            SystemConfig::new(["cue", "bin", "chd", "m3u"], ZipPolicy::Allow, false),
        )
        .with_system("arcade", SystemConfig::new(["zip"], ZipPolicy::Require, false))
        .with_alias("famicom", "nes")
        .with_alias("fc", "nes")
        .with_alias("sfc", "snes")
        .with_alias("super famicom", "snes")
        .with_alias("megadrive", "genesis")
        .with_alias("playstation", "psx")
        .with_alias("mame", "arcade")
}

/// Check a normalized configuration.
pub fn validate(config: &RomtidyConfig) -> Result<(), ConfigError> {
    if config.root_path.as_str().trim().is_empty() {
        return Err(ConfigError::EmptyRootPath);
    }

    for (field, tag) in [
        ("unknownSystemTag", &config.unknown_system_tag),
        ("aliasSystemTag", &config.alias_system_tag),
    ] {
        if tag.is_empty() {
            return Err(ConfigError::EmptyTag(field));
        }
        if tag.contains(['/', '\\']) {
            return Err(ConfigError::TagWithSeparator {
                field,
                tag: tag.clone(),
            });
        }
    }

    if config.systems.keys().any(|key| key.is_empty()) {
        return Err(ConfigError::EmptySystemKey);
    }

    for (alias, target) in &config.aliases {
        if config.aliases.contains_key(target) {
            return Err(ConfigError::AliasChain {
                alias: alias.clone(),
                target: target.clone(),
            });
        }
    }
    Ok(())
}

fn warn_on_dangling_aliases(config: &RomtidyConfig) {
    for (alias, target) in &config.aliases {
        if !config.systems.contains_key(target) {
            tracing::warn!(
                "Alias '{}' points at '{}', which has no systems entry; folders named '{}' will be tagged unknown",
                alias,
                target,
                alias
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().join("romtidy.json")).unwrap();
        let manager = ConfigManager::new(&config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_load_save_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let config = default_config();
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.root_path, config.root_path);
        assert_eq!(loaded.systems, config.systems);
        assert_eq!(loaded.aliases, config.aliases);
        // File order survives the round trip
        assert_eq!(loaded.systems.keys().next().map(String::as_str), Some("nes"));
    }

    #[test]
    fn test_load_normalizes_keys_and_extensions() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(
            manager.config_path(),
            r#"{
                "rootPath": "/roms",
                "systems": { "NES": { "extensions": [".NES", "Fds"], "zipPolicy": "forbid" } },
                "aliases": { "Famicom": "NES" }
            }"#,
        )
        .unwrap();

        let config = manager.load_config().unwrap();
        let nes = config.system("nes").unwrap();
        assert!(nes.extensions.contains("nes"));
        assert!(nes.extensions.contains("fds"));
        assert!(!nes.romm_naming);
        assert_eq!(config.aliases.get("famicom").map(String::as_str), Some("nes"));
        assert_eq!(config.unknown_system_tag, "_unknown");
        assert_eq!(config.log_file, Utf8PathBuf::from("romtidy.log"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        let err = manager.load_config().unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_unknown_zip_policy_is_rejected() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(
            manager.config_path(),
            r#"{ "rootPath": "/roms", "systems": { "nes": { "zipPolicy": "sometimes" } } }"#,
        )
        .unwrap();
        assert!(manager.load_config().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let ok = default_config();
        assert_eq!(validate(&ok), Ok(()));

        let mut empty_root = default_config();
        empty_root.root_path = Utf8PathBuf::from("");
        assert_eq!(validate(&empty_root), Err(ConfigError::EmptyRootPath));

        let mut empty_tag = default_config();
        empty_tag.unknown_system_tag.clear();
        assert_eq!(validate(&empty_tag), Err(ConfigError::EmptyTag("unknownSystemTag")));

        let mut slash_tag = default_config();
        slash_tag.alias_system_tag = "_needs/rename".to_string();
        assert!(matches!(
            validate(&slash_tag),
            Err(ConfigError::TagWithSeparator { field: "aliasSystemTag", .. })
        ));

        let chained = default_config().with_alias("nintendo", "famicom");
        assert!(matches!(validate(&chained), Err(ConfigError::AliasChain { .. })));
    }

    #[test]
    fn test_default_config_is_usable() {
        let config = default_config();
        assert!(config.system("nes").unwrap().accepts_extension("NES"));
        assert_eq!(config.system("arcade").unwrap().zip_policy, ZipPolicy::Require);
        assert!(config.system("arcade").unwrap().is_archive_only());
        for target in config.aliases.values() {
            assert!(config.systems.contains_key(target));
        }
    }
}
