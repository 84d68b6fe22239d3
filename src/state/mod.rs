// Run state module
//
// This module provides the RunContext which carries everything a run mutates
// or consults (configuration, journal, decisions, filesystem view, scheduled
// deletions, metrics) explicitly through every stage.

use crate::journal::Journal;
use crate::metrics::RunMetrics;
use crate::models::RomtidyConfig;
use crate::services::decisions::DecisionProvider;
use crate::services::error::ReconcileError;
use crate::services::scheduler::{ActionScheduler, ScheduledAction};
use crate::services::walker::Listing;
use crate::services::workspace::{Entry, Workspace};
use camino::{Utf8Path, Utf8PathBuf};

/// Single source of truth for one reconciliation run.
///
/// Created at the start of a run and passed by reference into every
/// component; nothing in the crate keeps process-wide state.
///
/// # Related Types
///
/// - [`crate::services::Reconciler`]: Creates the context and drives the run
/// - [`ActionScheduler`]: Deferred deletions, consumed once at the end of the run
/// - [`Workspace`]: Filesystem view honoring dry-run mode
pub struct RunContext<'a> {
    /// Read-only configuration
    pub config: &'a RomtidyConfig,

    /// Action log; a failed write aborts the run
    pub journal: &'a mut Journal,

    /// Answers ambiguous archives and extensionless files
    pub decisions: &'a mut dyn DecisionProvider,

    pub workspace: Workspace,
    pub scheduler: ActionScheduler,
    pub metrics: RunMetrics,

    /// Folders tagged as unknown systems; no later stage touches them
    protected: Vec<Utf8PathBuf>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: &'a RomtidyConfig,
        journal: &'a mut Journal,
        decisions: &'a mut dyn DecisionProvider,
    ) -> Self {
        Self {
            config,
            journal,
            decisions,
            workspace: Workspace::new(config.dry_run),
            scheduler: ActionScheduler::new(),
            metrics: RunMetrics::new(),
            protected: Vec::new(),
        }
    }

    /// Append a line to the journal.
    pub fn log(&mut self, message: impl Into<String>) -> Result<(), ReconcileError> {
        self.journal.record(message)?;
        Ok(())
    }

    /// Record a deletion to be executed after the whole root is classified.
    ///
    /// A path is scheduled (and logged) at most once.
    pub fn schedule_delete(&mut self, path: &Utf8Path, reason: &str) -> Result<(), ReconcileError> {
        if self.is_protected(path) {
            tracing::warn!("Refusing to schedule {} inside a protected folder", path);
            return Ok(());
        }

        let is_dir = self.workspace.is_dir(path);
        let action = ScheduledAction::delete(path, reason);
        if self.scheduler.schedule(action, is_dir) {
            self.metrics.record_delete_scheduled();
            self.log(format!("Scheduled delete: {} ({})", path, reason))?;
        } else {
            tracing::debug!("{} already scheduled", path);
        }
        Ok(())
    }

    /// Exclude `dir` and everything beneath it from destructive work.
    pub fn protect(&mut self, dir: Utf8PathBuf) {
        self.protected.push(dir);
    }

    pub fn is_protected(&self, path: &Utf8Path) -> bool {
        self.protected.iter().any(|p| path.starts_with(p))
    }
}

impl Listing for RunContext<'_> {
    fn list(&self, dir: &Utf8Path) -> Result<Vec<Entry>, ReconcileError> {
        self.workspace.list(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::decisions::ScriptedDecisions;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_schedule_delete_logs_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::write(root.join("junk.txt"), b"x").unwrap();

        let config = RomtidyConfig::new(root.clone());
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        ctx.schedule_delete(&root.join("junk.txt"), "Invalid extension").unwrap();
        ctx.schedule_delete(&root.join("junk.txt"), "Invalid extension").unwrap();
        assert_eq!(ctx.metrics.deletes_scheduled, 1);
        assert_eq!(ctx.scheduler.len(), 1);
        drop(ctx);

        assert_eq!(
            journal.entries(),
            &[format!("Scheduled delete: {} (Invalid extension)", root.join("junk.txt"))]
        );
    }

    #[test]
    fn test_protected_folders_are_never_scheduled() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::create_dir(root.join("weird_unknown")).unwrap();

        let config = RomtidyConfig::new(root.clone());
        let mut journal = Journal::in_memory();
        let mut decisions = ScriptedDecisions::new();
        let mut ctx = RunContext::new(&config, &mut journal, &mut decisions);

        ctx.protect(root.join("weird_unknown"));
        ctx.schedule_delete(&root.join("weird_unknown/file.bin"), "Invalid extension")
            .unwrap();
        assert!(ctx.scheduler.is_empty());
        assert!(ctx.is_protected(&root.join("weird_unknown")));
        assert!(!ctx.is_protected(&root.join("nes")));
    }
}
