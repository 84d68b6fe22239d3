//! Deferred deletions.
//!
//! Classification never deletes anything directly. It schedules deletions
//! here, and the scheduler executes them once the whole collection has been
//! classified: files first in scheduling order, then directories deepest
//! first. A scheduled directory goes with everything still inside it.

use crate::services::error::ReconcileError;
use crate::services::walker::collect_post_order;
use crate::state::RunContext;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

/// A deferred filesystem action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledAction {
    Delete { path: Utf8PathBuf, reason: String },
}

impl ScheduledAction {
    pub fn delete(path: &Utf8Path, reason: &str) -> Self {
        ScheduledAction::Delete {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        match self {
            ScheduledAction::Delete { path, .. } => path,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            ScheduledAction::Delete { reason, .. } => reason,
        }
    }
}

/// Scheduled deletions, deduplicated by path and kept in scheduling order.
#[derive(Debug, Default)]
pub struct ActionScheduler {
    files: IndexMap<Utf8PathBuf, ScheduledAction>,
    dirs: IndexMap<Utf8PathBuf, ScheduledAction>,
}

impl ActionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an action. Returns false if its path was already scheduled.
    pub fn schedule(&mut self, action: ScheduledAction, is_dir: bool) -> bool {
        let path = action.path().to_path_buf();
        if self.is_scheduled(&path) {
            return false;
        }
        if is_dir {
            self.dirs.insert(path, action);
        } else {
            self.files.insert(path, action);
        }
        true
    }

    pub fn is_scheduled(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Scheduled file deletions in scheduling order.
    pub fn files(&self) -> impl Iterator<Item = &ScheduledAction> {
        self.files.values()
    }

    /// Scheduled directory deletions, deepest first. Ties keep scheduling order.
    pub fn dirs_deepest_first(&self) -> Vec<&ScheduledAction> {
        let mut dirs: Vec<&ScheduledAction> = self.dirs.values().collect();
        dirs.sort_by_key(|action| std::cmp::Reverse(action.path().components().count()));
        dirs
    }

    /// Execute every scheduled action, consuming the schedule.
    ///
    /// A delete that fails is logged and the run continues; only a journal
    /// failure aborts.
    pub fn execute(self, ctx: &mut RunContext<'_>) -> Result<(), ReconcileError> {
        tracing::info!(
            "Executing {} scheduled file deletes and {} directory deletes",
            self.files.len(),
            self.dirs.len()
        );

        for action in self.files() {
            delete_path(ctx, action.path(), false)?;
        }

        for action in self.dirs_deepest_first() {
            delete_tree(ctx, action.path())?;
        }
        Ok(())
    }
}

/// Delete `dir` and everything beneath it, children before parents.
fn delete_tree(ctx: &mut RunContext<'_>, dir: &Utf8Path) -> Result<(), ReconcileError> {
    if !ctx.workspace.exists(dir) {
        tracing::debug!("{} already gone", dir);
        return Ok(());
    }

    let paths = match collect_post_order(ctx, dir, true) {
        Ok(paths) => paths,
        Err(e) if !e.is_journal_failure() => {
            ctx.metrics.record_delete_failed();
            return ctx.log(format!("FAILED DELETE (locked): {} ({})", dir, e));
        }
        Err(e) => return Err(e),
    };

    for path in paths {
        let is_dir = ctx.workspace.is_dir(&path);
        delete_path(ctx, &path, is_dir)?;
    }
    Ok(())
}

fn delete_path(ctx: &mut RunContext<'_>, path: &Utf8Path, is_dir: bool) -> Result<(), ReconcileError> {
    let result = if is_dir {
        ctx.workspace.remove_dir(path)
    } else {
        ctx.workspace.remove_file(path)
    };

    match result {
        Ok(()) => {
            ctx.metrics.record_delete_completed();
            ctx.log(format!("Deleted: {}", path))
        }
        Err(e) => {
            tracing::warn!("Failed to delete {}: {}", path, e);
            ctx.metrics.record_delete_failed();
            ctx.log(format!("FAILED DELETE (locked): {} ({})", path, e))
        }
    }
}
