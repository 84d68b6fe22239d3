//! Final empty-directory sweep.

use crate::services::error::ReconcileError;
use crate::services::walker::{TreeVisitor, WalkControl, walk};
use crate::services::workspace::Entry;
use crate::state::RunContext;
use camino::{Utf8Path, Utf8PathBuf};

/// Collects every directory beneath the collection root, children first,
/// skipping folders tagged as unknown systems.
struct EmptyDirCollector {
    root: Utf8PathBuf,
    dirs: Vec<Utf8PathBuf>,
}

impl<'a> TreeVisitor<RunContext<'a>> for EmptyDirCollector {
    fn pre_visit_dir(&mut self, ctx: &mut RunContext<'a>, dir: &Utf8Path) -> Result<WalkControl, ReconcileError> {
        if ctx.is_protected(dir) {
            tracing::debug!("Not pruning inside protected folder {}", dir);
            return Ok(WalkControl::SkipSubtree);
        }
        Ok(WalkControl::Descend)
    }

    fn visit_file(&mut self, _ctx: &mut RunContext<'a>, _entry: &Entry) -> Result<WalkControl, ReconcileError> {
        Ok(WalkControl::Descend)
    }

    fn post_visit_dir(&mut self, _ctx: &mut RunContext<'a>, dir: &Utf8Path) -> Result<(), ReconcileError> {
        if dir != self.root {
            self.dirs.push(dir.to_path_buf());
        }
        Ok(())
    }
}

/// Remove every empty directory beneath `root`, deepest first.
///
/// Because children are handled before their parents, a directory that only
/// contained empty directories is removed in the same sweep. The root itself
/// is never removed.
pub fn prune_empty_directories(ctx: &mut RunContext<'_>, root: &Utf8Path) -> Result<(), ReconcileError> {
    let mut collector = EmptyDirCollector {
        root: root.to_path_buf(),
        dirs: Vec::new(),
    };
    walk(ctx, root, &mut collector)?;

    for dir in collector.dirs {
        match ctx.workspace.is_empty_dir(&dir) {
            Ok(false) => {}
            Ok(true) => match ctx.workspace.remove_dir(&dir) {
                Ok(()) => {
                    ctx.metrics.record_empty_dir_pruned();
                    ctx.log(format!("Deleted empty directory (post-cleanup): {}", dir))?;
                }
                Err(e) => {
                    ctx.metrics.record_delete_failed();
                    ctx.log(format!("FAILED EMPTY DIR DELETE: {} ({})", dir, e))?;
                }
            },
            Err(e) => {
                ctx.metrics.record_delete_failed();
                ctx.log(format!("FAILED EMPTY DIR DELETE: {} ({})", dir, e))?;
            }
        }
    }
    Ok(())
}
