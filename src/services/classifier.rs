//! Classification of everything inside a resolved system folder.
//!
//! [`SystemClassifier`] is the visitor driven over a system folder. It skips
//! structured game folders, sends each file to [`classify_file`] and
//! schedules directories left empty after their contents were handled.

use crate::models::{ExtensionlessDecision, SystemConfig, is_valid_extension};
use crate::services::archive::handle_zip;
use crate::services::error::ReconcileError;
use crate::services::naming::{clean_name, resolve_dup};
use crate::services::walker::{TreeVisitor, WalkControl};
use crate::services::workspace::{Entry, Workspace, extension_of};
use crate::state::RunContext;
use camino::{Utf8Path, Utf8PathBuf};

/// Subfolder names that mark a folder as one game with auxiliary content.
pub const MULTI_FILE_FOLDERS: [&str; 9] = [
    "dlc",
    "hack",
    "manual",
    "mod",
    "patch",
    "update",
    "demo",
    "translation",
    "prototype",
];

/// True when `dir` directly holds an auxiliary-content subfolder and at
/// least one file with a valid ROM extension. Only immediate children count.
pub fn is_structured_game_folder(
    workspace: &Workspace,
    dir: &Utf8Path,
    system: &SystemConfig,
) -> Result<bool, ReconcileError> {
    let entries = workspace.list_dir(dir).map_err(ReconcileError::at(dir))?;

    let has_aux_folder = entries.iter().any(|entry| {
        entry.is_dir() && MULTI_FILE_FOLDERS.contains(&entry.file_name().to_lowercase().as_str())
    });
    let has_rom = entries
        .iter()
        .any(|entry| entry.is_file() && system.accepts_extension(&extension_of(entry.file_name())));

    Ok(has_aux_folder && has_rom)
}

/// Visitor classifying one system folder.
pub struct SystemClassifier<'s> {
    system_root: Utf8PathBuf,
    system: &'s SystemConfig,
}

impl<'s> SystemClassifier<'s> {
    pub fn new(system_root: &Utf8Path, system: &'s SystemConfig) -> Self {
        Self {
            system_root: system_root.to_path_buf(),
            system,
        }
    }
}

impl<'a> TreeVisitor<RunContext<'a>> for SystemClassifier<'_> {
    fn pre_visit_dir(&mut self, ctx: &mut RunContext<'a>, dir: &Utf8Path) -> Result<WalkControl, ReconcileError> {
        if dir == self.system_root {
            return Ok(WalkControl::Descend);
        }
        if is_structured_game_folder(&ctx.workspace, dir, self.system)? {
            ctx.metrics.record_structured_folder_skipped();
            ctx.log(format!("Skipping structured multi-file game folder: {}", dir))?;
            return Ok(WalkControl::SkipSubtree);
        }
        Ok(WalkControl::Descend)
    }

    fn visit_file(&mut self, ctx: &mut RunContext<'a>, entry: &Entry) -> Result<WalkControl, ReconcileError> {
        if entry.is_file() {
            classify_file(ctx, &entry.path, &self.system_root, self.system)?;
        } else {
            tracing::debug!("Ignoring special file {}", entry.path);
        }
        Ok(WalkControl::Descend)
    }

    fn post_visit_dir(&mut self, ctx: &mut RunContext<'a>, dir: &Utf8Path) -> Result<(), ReconcileError> {
        if dir == self.system_root {
            return Ok(());
        }
        // A directory still holding a pending zip is not empty
        if ctx.workspace.is_empty_dir(dir).map_err(ReconcileError::at(dir))? {
            ctx.schedule_delete(dir, "Empty directory")?;
        }
        Ok(())
    }
}

/// Classify one regular file found inside a system folder.
///
/// Archives are handled wherever they sit. Any other file directly in the
/// system root is left alone.
pub fn classify_file(
    ctx: &mut RunContext<'_>,
    file: &Utf8Path,
    system_root: &Utf8Path,
    system: &SystemConfig,
) -> Result<(), ReconcileError> {
    let name = file.file_name().unwrap_or_default();
    let ext = extension_of(name);

    if ext == "zip" {
        return handle_zip(ctx, file, system_root, system);
    }
    if file.parent() == Some(system_root) {
        return Ok(());
    }
    if ext.is_empty() {
        return handle_extensionless(ctx, file);
    }
    if !system.accepts_extension(&ext) {
        return ctx.schedule_delete(file, "Invalid extension");
    }
    move_rom(ctx, file, system_root, system)
}

/// Ask what to do with a file that has no extension.
fn handle_extensionless(ctx: &mut RunContext<'_>, file: &Utf8Path) -> Result<(), ReconcileError> {
    ctx.metrics.record_decision_requested();
    match ctx.decisions.resolve_extensionless(file)? {
        ExtensionlessDecision::Rename(extension) if !is_valid_extension(&extension) => {
            tracing::warn!("Ignoring invalid extension {:?} for {}", extension, file);
            Ok(())
        }
        ExtensionlessDecision::Rename(extension) => {
            let name = file.file_name().unwrap_or_default();
            let wanted = file.with_file_name(format!("{}.{}", name, extension));
            let target = resolve_dup(&ctx.workspace, &wanted);
            ctx.workspace
                .rename(file, &target)
                .map_err(ReconcileError::at(file))?;
            ctx.log(format!("Renamed: {} → {}", file, target))
        }
        ExtensionlessDecision::Delete => ctx.schedule_delete(file, "User deleted"),
        ExtensionlessDecision::Skip => {
            tracing::info!("Skipped extensionless file {}", file);
            Ok(())
        }
    }
}

/// Move a valid ROM into the system root under its final name.
///
/// An existing file of the same size at the destination makes the source a
/// duplicate, which is scheduled for deletion. A different size gets a
/// numbered name and both files are kept.
pub fn move_rom(
    ctx: &mut RunContext<'_>,
    file: &Utf8Path,
    system_root: &Utf8Path,
    system: &SystemConfig,
) -> Result<(), ReconcileError> {
    let raw = file.file_name().unwrap_or_default();
    let name = if system.romm_naming {
        clean_name(raw)
    } else {
        raw.to_string()
    };
    let canonical = system_root.join(&name);
    if file == canonical {
        return Ok(());
    }

    if !ctx.workspace.exists(&canonical) {
        ctx.workspace
            .rename(file, &canonical)
            .map_err(ReconcileError::at(file))?;
        ctx.metrics.record_file_moved();
        return ctx.log(format!("Moved: {} → {}", file, canonical));
    }

    let source_size = ctx.workspace.file_size(file).map_err(ReconcileError::at(file))?;
    let existing_size = ctx
        .workspace
        .file_size(&canonical)
        .map_err(ReconcileError::at(&canonical))?;
    if source_size == existing_size {
        ctx.metrics.record_duplicate();
        return ctx.schedule_delete(file, "Duplicate ROM (same size)");
    }

    let target = resolve_dup(&ctx.workspace, &canonical);
    ctx.workspace
        .rename(file, &target)
        .map_err(ReconcileError::at(file))?;
    ctx.metrics.record_file_moved();
    ctx.log(format!("Moved (name collision): {} → {}", file, target))
}
