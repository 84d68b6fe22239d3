//! System folder identification.
//!
//! Every top-level directory under the collection root is resolved here
//! before anything inside it is touched. Resolution short-circuits: the
//! folder is optionally lowercased, placeholder folders are scheduled for
//! deletion, folders matching no configured system are tagged and left
//! alone, and folders reached through an alias are tagged so the user knows
//! to rename them.

use crate::models::RomtidyConfig;
use crate::services::error::ReconcileError;
use crate::services::walker::contains_regular_file;
use crate::services::workspace::{Entry, extension_of};
use crate::state::RunContext;
use camino::{Utf8Path, Utf8PathBuf};

/// Outcome of resolving one top-level directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemDisposition {
    /// Ready for traversal under the given canonical key.
    Resolved { dir: Utf8PathBuf, key: String },
    /// Placeholder folder scheduled for deletion.
    Removed(Utf8PathBuf),
    /// No configured system; tagged and excluded from the rest of the run.
    Unknown(Utf8PathBuf),
}

/// Canonical system key for a folder name.
///
/// The alias table wins, so an alias can fold one configured system into
/// another. Then a configured key resolves to itself, and a folder carrying
/// the alias marker (`<name><aliasTag>_<key>`) resolves to the key after the
/// marker. Anything else is the lowercase name. Resolving a result again
/// returns it unchanged as long as no alias points at another alias.
pub fn resolve_system_key(config: &RomtidyConfig, folder_name: &str) -> String {
    let lower = folder_name.to_lowercase();
    if let Some(key) = config.aliases.get(&lower) {
        return key.clone();
    }
    if config.systems.contains_key(&lower) {
        return lower;
    }
    if let Some(key) = alias_marker_key(config, &lower) {
        return key.to_string();
    }
    lower
}

/// The configured key named by an alias marker at the end of `lower_name`.
fn alias_marker_key<'c>(config: &'c RomtidyConfig, lower_name: &str) -> Option<&'c str> {
    let marker = format!("{}_", config.alias_system_tag.to_lowercase());
    config
        .systems
        .keys()
        .find(|key| {
            lower_name
                .strip_suffix(key.as_str())
                .and_then(|rest| rest.strip_suffix(&marker))
                .is_some_and(|prefix| !prefix.is_empty())
        })
        .map(String::as_str)
}

/// True when `name` already ends with the alias marker for `key`.
pub fn has_alias_marker(config: &RomtidyConfig, name: &str, key: &str) -> bool {
    let marker = format!("{}_{}", config.alias_system_tag, key).to_lowercase();
    let lower = name.to_lowercase();
    lower.len() > marker.len() && lower.ends_with(&marker)
}

/// True when `name` already carries the unknown-system suffix.
pub fn has_unknown_tag(config: &RomtidyConfig, name: &str) -> bool {
    name.to_lowercase()
        .ends_with(&config.unknown_system_tag.to_lowercase())
}

/// Resolve one top-level directory.
///
/// # Arguments
///
/// * `ctx` - The run context
/// * `dir` - Path of the top-level directory as the run currently sees it
///
/// # Returns
///
/// The disposition, carrying the directory's path after any rename.
pub fn resolve_system_folder(ctx: &mut RunContext<'_>, dir: &Utf8Path) -> Result<SystemDisposition, ReconcileError> {
    let dir = apply_lowercase_rule(ctx, dir)?;

    if let Some(reason) = placeholder_reason(ctx, &dir)? {
        ctx.schedule_delete(&dir, reason)?;
        ctx.metrics.record_system_removed();
        return Ok(SystemDisposition::Removed(dir));
    }

    let config = ctx.config;
    let name = folder_name(&dir).to_string();
    let key = resolve_system_key(config, &name);

    if config.system(&key).is_none() {
        let tagged = tag_unknown_system(ctx, &dir)?;
        ctx.protect(tagged.clone());
        return Ok(SystemDisposition::Unknown(tagged));
    }

    let dir = if name.eq_ignore_ascii_case(&key) || has_alias_marker(config, &name, &key) {
        dir
    } else {
        tag_aliased_system(ctx, &dir, &key)?
    };

    Ok(SystemDisposition::Resolved { dir, key })
}

fn folder_name(dir: &Utf8Path) -> &str {
    dir.file_name().unwrap_or_default()
}

/// Rename `dir` to its lowercase form when configured and needed.
fn apply_lowercase_rule(ctx: &mut RunContext<'_>, dir: &Utf8Path) -> Result<Utf8PathBuf, ReconcileError> {
    let name = folder_name(dir);
    let lower = name.to_lowercase();
    if !ctx.config.force_lowercase_folders || name == lower {
        return Ok(dir.to_path_buf());
    }

    let target = dir.with_file_name(&lower);
    let parent = dir.parent().unwrap_or(Utf8Path::new(""));
    let sibling_exists = ctx
        .workspace
        .list_dir(parent)
        .map_err(ReconcileError::at(parent))?
        .iter()
        .any(|entry| entry.file_name() == lower);
    if sibling_exists {
        ctx.log(format!(
            "Cannot lowercase system folder (target exists): {} → {}",
            dir, target
        ))?;
        return Ok(dir.to_path_buf());
    }

    ctx.workspace
        .rename(dir, &target)
        .map_err(ReconcileError::at(dir))?;
    ctx.log(format!("Renamed system folder: {} → {}", dir, target))?;
    Ok(target)
}

/// Why `dir` is a placeholder that should be deleted, if it is one.
fn placeholder_reason(ctx: &mut RunContext<'_>, dir: &Utf8Path) -> Result<Option<&'static str>, ReconcileError> {
    let entries = ctx
        .workspace
        .list_dir(dir)
        .map_err(ReconcileError::at(dir))?;

    if entries.is_empty() {
        return Ok(Some("Empty system folder"));
    }
    if is_single_txt(&entries) {
        return Ok(Some("System folder contains only a single .txt file"));
    }
    if !contains_regular_file(ctx, dir)? {
        return Ok(Some("System folder contains only empty subfolders"));
    }
    Ok(None)
}

fn is_single_txt(entries: &[Entry]) -> bool {
    let mut files = entries.iter().filter(|e| e.is_file());
    let only_file = match (files.next(), files.next()) {
        (Some(file), None) => file,
        _ => return false,
    };
    !entries.iter().any(Entry::is_dir) && extension_of(only_file.file_name()) == "txt"
}

/// Append the unknown-system suffix unless it is already there.
fn tag_unknown_system(ctx: &mut RunContext<'_>, dir: &Utf8Path) -> Result<Utf8PathBuf, ReconcileError> {
    let name = folder_name(dir);
    if has_unknown_tag(ctx.config, name) {
        tracing::debug!("{} is already tagged as unknown", dir);
        return Ok(dir.to_path_buf());
    }

    let tagged = dir.with_file_name(format!("{}{}", name, ctx.config.unknown_system_tag));
    if ctx.workspace.exists(&tagged) {
        ctx.log(format!("Cannot tag unknown system (target exists): {} → {}", dir, tagged))?;
        return Ok(dir.to_path_buf());
    }

    ctx.workspace
        .rename(dir, &tagged)
        .map_err(ReconcileError::at(dir))?;
    ctx.metrics.record_system_tagged_unknown();
    ctx.log(format!("Tagged unknown system: {} → {}", dir, tagged))?;
    Ok(tagged)
}

/// Rename `dir` to `<name><aliasTag>_<key>`.
fn tag_aliased_system(ctx: &mut RunContext<'_>, dir: &Utf8Path, key: &str) -> Result<Utf8PathBuf, ReconcileError> {
    let name = folder_name(dir);
    let tagged = dir.with_file_name(format!("{}{}_{}", name, ctx.config.alias_system_tag, key));
    if ctx.workspace.exists(&tagged) {
        ctx.log(format!(
            "Cannot tag aliased system folder (target exists): {} → {}",
            dir, tagged
        ))?;
        return Ok(dir.to_path_buf());
    }

    ctx.workspace
        .rename(dir, &tagged)
        .map_err(ReconcileError::at(dir))?;
    ctx.metrics.record_system_tagged_alias();
    ctx.log(format!("Tagged aliased system folder: {} → {}", dir, tagged))?;
    Ok(tagged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Journal;
    use crate::models::{SystemConfig, ZipPolicy};
    use crate::services::decisions::ScriptedDecisions;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_config(root: &Utf8Path) -> RomtidyConfig {
        RomtidyConfig::new(root)
            .with_system("nes", SystemConfig::new(["nes"], ZipPolicy::Forbid, true))
            .with_system("snes", SystemConfig::new(["sfc", "smc"], ZipPolicy::Allow, false))
            .with_alias("famicom", "nes")
            .with_alias("super nintendo", "snes")
    }

    fn scratch() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_resolve_system_key() {
        let config = sample_config(Utf8Path::new("/roms"));
        assert_eq!(resolve_system_key(&config, "NES"), "nes");
        assert_eq!(resolve_system_key(&config, "Famicom"), "nes");
        assert_eq!(resolve_system_key(&config, "famicom_needsRename_nes"), "nes");
        assert_eq!(resolve_system_key(&config, "Atari"), "atari");
        // A bare marker with nothing before it is not a tagged folder
        assert_eq!(resolve_system_key(&config, "_needsRename_nes"), "_needsrename_nes");
    }

    #[test]
    fn test_tag_helpers() {
        let config = sample_config(Utf8Path::new("/roms"));
        assert!(has_unknown_tag(&config, "atari_unknown"));
        assert!(has_unknown_tag(&config, "Atari_UNKNOWN"));
        assert!(!has_unknown_tag(&config, "atari"));
        assert!(has_alias_marker(&config, "famicom_needsrename_nes", "nes"));
        assert!(!has_alias_marker(&config, "famicom", "nes"));
    }

    #[test]
    fn test_unknown_folder_is_tagged_once() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("atari")).unwrap();
        fs::write(root.join("atari/game.a26"), b"x").unwrap();

        let config = sample_config(&root);
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        let first = resolve_system_folder(&mut ctx, &root.join("atari")).unwrap();
        assert_eq!(first, SystemDisposition::Unknown(root.join("atari_unknown")));

        let second = resolve_system_folder(&mut ctx, &root.join("atari_unknown")).unwrap();
        assert_eq!(second, SystemDisposition::Unknown(root.join("atari_unknown")));
        assert!(ctx.is_protected(&root.join("atari_unknown/game.a26")));
        drop(ctx);

        assert!(root.join("atari_unknown/game.a26").exists());
        assert!(!root.join("atari_unknown_unknown").exists());
        assert_eq!(journal.entries().len(), 1);
    }

    #[test]
    fn test_alias_folder_is_tagged_with_marker() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("famicom")).unwrap();
        fs::write(root.join("famicom/game.nes"), b"x").unwrap();

        let config = sample_config(&root);
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        let tagged = root.join("famicom_needsRename_nes");
        let first = resolve_system_folder(&mut ctx, &root.join("famicom")).unwrap();
        assert_eq!(
            first,
            SystemDisposition::Resolved {
                dir: tagged.clone(),
                key: "nes".to_string()
            }
        );

        // A second pass over the tagged folder does not tag it again
        let second = resolve_system_folder(&mut ctx, &tagged).unwrap();
        assert_eq!(
            second,
            SystemDisposition::Resolved {
                dir: tagged.clone(),
                key: "nes".to_string()
            }
        );
        drop(ctx);
        assert!(tagged.join("game.nes").exists());
        assert_eq!(
            journal.entries(),
            &[format!("Tagged aliased system folder: {} → {}", root.join("famicom"), tagged)]
        );
    }

    #[test]
    fn test_placeholder_folders_are_scheduled() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("nes")).unwrap();
        fs::create_dir(root.join("snes")).unwrap();
        fs::write(root.join("snes/readme.txt"), b"x").unwrap();
        fs::create_dir_all(root.join("gba/a/b")).unwrap();

        let config = sample_config(&root);
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        for name in ["nes", "snes", "gba"] {
            let outcome = resolve_system_folder(&mut ctx, &root.join(name)).unwrap();
            assert_eq!(outcome, SystemDisposition::Removed(root.join(name)));
        }
        assert_eq!(ctx.scheduler.len(), 3);
        drop(ctx);

        let entries = journal.entries();
        assert!(entries[0].ends_with("(Empty system folder)"));
        assert!(entries[1].ends_with("(System folder contains only a single .txt file)"));
        assert!(entries[2].ends_with("(System folder contains only empty subfolders)"));
    }

    #[test]
    fn test_force_lowercase_renames_then_resolves() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("NES")).unwrap();
        fs::write(root.join("NES/game.nes"), b"x").unwrap();

        let mut config = sample_config(&root);
        config.force_lowercase_folders = true;
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        let outcome = resolve_system_folder(&mut ctx, &root.join("NES")).unwrap();
        assert_eq!(
            outcome,
            SystemDisposition::Resolved {
                dir: root.join("nes"),
                key: "nes".to_string()
            }
        );
        drop(ctx);
        assert!(root.join("nes/game.nes").exists());
        assert!(journal.entries()[0].starts_with("Renamed system folder: "));
    }

    #[test]
    fn test_alias_table_wins_over_configured_key() {
        let config = RomtidyConfig::new("/roms")
            .with_system("gb", SystemConfig::new(["gb"], ZipPolicy::Extract, true))
            .with_system("gbc", SystemConfig::new(["gbc"], ZipPolicy::Extract, true))
            .with_alias("gbc", "gb");

        assert_eq!(resolve_system_key(&config, "GBC"), "gb");
        assert_eq!(resolve_system_key(&config, "gb"), "gb");
        assert_eq!(resolve_system_key(&config, "gbc_needsRename_gb"), "gb");
    }

    #[test]
    fn test_merged_system_folder_is_tagged() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("gbc")).unwrap();
        fs::write(root.join("gbc/zelda.gbc"), b"x").unwrap();

        let config = RomtidyConfig::new(root.clone())
            .with_system("gb", SystemConfig::new(["gb", "gbc"], ZipPolicy::Extract, true))
            .with_system("gbc", SystemConfig::new(["gbc"], ZipPolicy::Extract, true))
            .with_alias("gbc", "gb");
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        let outcome = resolve_system_folder(&mut ctx, &root.join("gbc")).unwrap();
        assert_eq!(
            outcome,
            SystemDisposition::Resolved {
                dir: root.join("gbc_needsRename_gb"),
                key: "gb".to_string()
            }
        );
    }

    #[test]
    fn test_lowercase_skipped_when_target_exists() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("NES")).unwrap();
        fs::write(root.join("NES/game.nes"), b"x").unwrap();
        fs::create_dir(root.join("nes")).unwrap();
        fs::write(root.join("nes/other.nes"), b"y").unwrap();

        let mut config = sample_config(&root);
        config.force_lowercase_folders = true;
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        let outcome = resolve_system_folder(&mut ctx, &root.join("NES")).unwrap();
        assert_eq!(
            outcome,
            SystemDisposition::Resolved {
                dir: root.join("NES"),
                key: "nes".to_string()
            }
        );
        drop(ctx);

        assert!(root.join("NES/game.nes").exists());
        assert!(root.join("nes/other.nes").exists());
        assert_eq!(
            journal.entries(),
            &[format!(
                "Cannot lowercase system folder (target exists): {} → {}",
                root.join("NES"),
                root.join("nes")
            )]
        );
    }

    #[test]
    fn test_unknown_tag_skipped_when_target_exists() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("atari")).unwrap();
        fs::write(root.join("atari/pitfall.a26"), b"x").unwrap();
        fs::create_dir(root.join("atari_unknown")).unwrap();
        fs::write(root.join("atari_unknown/adventure.a26"), b"y").unwrap();

        let config = sample_config(&root);
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        let outcome = resolve_system_folder(&mut ctx, &root.join("atari")).unwrap();
        assert_eq!(outcome, SystemDisposition::Unknown(root.join("atari")));
        assert!(ctx.is_protected(&root.join("atari/pitfall.a26")));
        assert_eq!(ctx.metrics.systems_tagged_unknown, 0);
        drop(ctx);

        assert!(root.join("atari/pitfall.a26").exists());
        assert!(root.join("atari_unknown/adventure.a26").exists());
        assert_eq!(
            journal.entries(),
            &[format!(
                "Cannot tag unknown system (target exists): {} → {}",
                root.join("atari"),
                root.join("atari_unknown")
            )]
        );
    }

    #[test]
    fn test_alias_tag_skipped_when_target_exists() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("famicom")).unwrap();
        fs::write(root.join("famicom/game.nes"), b"x").unwrap();
        fs::create_dir(root.join("famicom_needsRename_nes")).unwrap();
        fs::write(root.join("famicom_needsRename_nes/other.nes"), b"y").unwrap();

        let config = sample_config(&root);
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        let outcome = resolve_system_folder(&mut ctx, &root.join("famicom")).unwrap();
        assert_eq!(
            outcome,
            SystemDisposition::Resolved {
                dir: root.join("famicom"),
                key: "nes".to_string()
            }
        );
        drop(ctx);

        assert!(root.join("famicom/game.nes").exists());
        assert_eq!(
            journal.entries(),
            &[format!(
                "Cannot tag aliased system folder (target exists): {} → {}",
                root.join("famicom"),
                root.join("famicom_needsRename_nes")
            )]
        );
    }

    proptest! {
        #[test]
        fn prop_resolve_system_key_is_idempotent(name in "[A-Za-z_ ]{1,24}") {
            let config = sample_config(Utf8Path::new("/roms"));
            let once = resolve_system_key(&config, &name);
            prop_assert_eq!(resolve_system_key(&config, &once), once);
        }

        #[test]
        fn prop_unknown_tag_never_nests(name in "[a-z]{1,12}") {
            let config = sample_config(Utf8Path::new("/roms"));
            let tagged = format!("{}{}", name, config.unknown_system_tag);
            prop_assert!(has_unknown_tag(&config, &tagged));
        }
    }
}
