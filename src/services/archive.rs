//! Zip archive handling.
//!
//! An archive found inside a system folder is opened, its entries are split
//! into ROMs and junk by the system's extension set, and the system's zip
//! policy decides what happens:
//!
//! | policy    | no ROMs  | unambiguous        | ambiguous          |
//! |-----------|----------|--------------------|--------------------|
//! | `forbid`  | delete   | extract, delete    | extract, delete    |
//! | `extract` | delete   | extract, delete    | extract, delete    |
//! | `allow`   | delete   | keep               | ask                |
//! | `require` | delete   | keep               | keep               |
//!
//! The archive handle is always closed before the archive is scheduled for
//! deletion.

use crate::models::{ArchiveDecision, SystemConfig, ZipPolicy};
use crate::services::error::ReconcileError;
use crate::services::naming::{clean_name, resolve_dup};
use crate::services::workspace::{Workspace, extension_of};
use crate::state::RunContext;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use zip::ZipArchive;
use zip::result::ZipResult;

/// An archive entry that looks like a ROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomEntry {
    /// Position in the archive's central directory
    pub index: usize,
    /// Full entry name as stored in the archive
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
}

/// Entries of one archive split by extension. Directory entries are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveContents {
    pub roms: Vec<RomEntry>,
    pub junk: Vec<String>,
}

impl ArchiveContents {
    /// More than one ROM, or anything that is not a ROM.
    pub fn is_ambiguous(&self) -> bool {
        !self.junk.is_empty() || self.roms.len() > 1
    }

    pub fn rom_names(&self) -> Vec<String> {
        self.roms.iter().map(|rom| rom.name.clone()).collect()
    }
}

/// Split the entries of `archive` into ROMs and junk.
///
/// Under the `require` policy a system without loose-file extensions counts
/// every file entry as a ROM.
pub fn classify_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    system: &SystemConfig,
) -> ZipResult<ArchiveContents> {
    let any_file_is_rom = system.zip_policy == ZipPolicy::Require && system.is_archive_only();
    let mut contents = ArchiveContents::default();

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let ext = extension_of(entry_file_name(&name));
        if any_file_is_rom || system.accepts_extension(&ext) {
            contents.roms.push(RomEntry {
                index,
                name,
                size: entry.size(),
            });
        } else {
            contents.junk.push(name);
        }
    }
    Ok(contents)
}

/// Last path component of an entry name; archives may use either separator.
pub fn entry_file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn open_archive(workspace: &Workspace, path: &Utf8Path) -> Result<ZipArchive<BufReader<File>>, ReconcileError> {
    let corrupt = |reason: String| ReconcileError::ArchiveCorrupt {
        path: path.to_path_buf(),
        reason,
    };
    let file = workspace.open(path).map_err(|e| corrupt(e.to_string()))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))
}

/// Apply the system's zip policy to one archive.
///
/// # Arguments
///
/// * `ctx` - The run context
/// * `zip_path` - The archive
/// * `target_dir` - Where extracted ROMs go (the system root)
/// * `system` - Rules of the system being processed
pub fn handle_zip(
    ctx: &mut RunContext<'_>,
    zip_path: &Utf8Path,
    target_dir: &Utf8Path,
    system: &SystemConfig,
) -> Result<(), ReconcileError> {
    let removal = {
        let mut archive = match open_archive(&ctx.workspace, zip_path) {
            Ok(archive) => archive,
            Err(ReconcileError::ArchiveCorrupt { reason, .. }) => {
                return handle_corrupt(ctx, zip_path, system, &reason);
            }
            Err(e) => return Err(e),
        };
        let contents = match classify_entries(&mut archive, system) {
            Ok(contents) => contents,
            Err(e) => return handle_corrupt(ctx, zip_path, system, &e.to_string()),
        };
        tracing::debug!(
            "{}: {} ROM entries, {} junk entries, policy {}",
            zip_path,
            contents.roms.len(),
            contents.junk.len(),
            system.zip_policy
        );
        apply_policy(ctx, &mut archive, zip_path, target_dir, system, &contents)?
    };

    if let Some(reason) = removal {
        ctx.schedule_delete(zip_path, reason)?;
    }
    Ok(())
}

/// Returns the deletion reason if the archive must go.
fn apply_policy<R: Read + Seek>(
    ctx: &mut RunContext<'_>,
    archive: &mut ZipArchive<R>,
    zip_path: &Utf8Path,
    target_dir: &Utf8Path,
    system: &SystemConfig,
    contents: &ArchiveContents,
) -> Result<Option<&'static str>, ReconcileError> {
    if contents.roms.is_empty() {
        return Ok(Some("ZIP contained no valid ROMs"));
    }

    match system.zip_policy {
        ZipPolicy::Forbid => {
            extract_roms(ctx, archive, zip_path, &contents.roms, target_dir)?;
            Ok(Some("ZIP forbidden"))
        }
        ZipPolicy::Extract => {
            extract_roms(ctx, archive, zip_path, &contents.roms, target_dir)?;
            Ok(Some("ZIP extracted"))
        }
        ZipPolicy::Allow if contents.is_ambiguous() => {
            ctx.metrics.record_decision_requested();
            match ctx.decisions.resolve_archive(zip_path, &contents.rom_names())? {
                ArchiveDecision::Extract => {
                    extract_roms(ctx, archive, zip_path, &contents.roms, target_dir)?;
                    Ok(None)
                }
                ArchiveDecision::Delete => Ok(Some("User deleted ZIP")),
                ArchiveDecision::Keep => {
                    tracing::info!("Keeping ambiguous archive {}", zip_path);
                    Ok(None)
                }
            }
        }
        ZipPolicy::Allow | ZipPolicy::Require => Ok(None),
    }
}

fn handle_corrupt(
    ctx: &mut RunContext<'_>,
    zip_path: &Utf8Path,
    system: &SystemConfig,
    reason: &str,
) -> Result<(), ReconcileError> {
    tracing::warn!("Unreadable archive {}: {}", zip_path, reason);
    ctx.metrics.record_corrupt_archive();
    ctx.log(format!("Corrupt or invalid ZIP: {} ({})", zip_path, reason))?;
    if system.zip_policy.demands_removal() {
        ctx.schedule_delete(zip_path, "Invalid ZIP (policy forbids ZIP)")?;
    }
    Ok(())
}

/// Extract every ROM entry into `target_dir` under its cleaned name.
///
/// A same-size file already at the cleaned name is treated as the same ROM
/// and the entry is skipped. A failing entry is logged and the rest still
/// extract.
fn extract_roms<R: Read + Seek>(
    ctx: &mut RunContext<'_>,
    archive: &mut ZipArchive<R>,
    zip_path: &Utf8Path,
    roms: &[RomEntry],
    target_dir: &Utf8Path,
) -> Result<(), ReconcileError> {
    for rom in roms {
        let canonical = target_dir.join(clean_name(entry_file_name(&rom.name)));

        if ctx.workspace.is_file(&canonical) {
            let existing = ctx
                .workspace
                .file_size(&canonical)
                .map_err(ReconcileError::at(&canonical))?;
            if existing == rom.size {
                ctx.metrics.record_duplicate();
                ctx.log(format!("ZIP ROM duplicate skipped: {}", canonical))?;
                continue;
            }
        }

        let dest: Utf8PathBuf = resolve_dup(&ctx.workspace, &canonical);
        let workspace = &mut ctx.workspace;
        let written = archive
            .by_index(rom.index)
            .map_err(io::Error::from)
            .and_then(|mut entry| workspace.create_from_reader(&dest, &mut entry, rom.size));

        match written {
            Ok(_) => {
                ctx.metrics.record_entry_extracted();
                if dest == canonical {
                    ctx.log(format!("Extracted: {}", dest))?;
                } else {
                    ctx.log(format!("Extracted (name collision): {}", dest))?;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to extract {} from {}: {}", rom.name, zip_path, e);
                ctx.metrics.record_extract_failure();
                ctx.log(format!("FAILED EXTRACT: {} from {} ({})", rom.name, zip_path, e))?;
            }
        }
    }
    Ok(())
}
