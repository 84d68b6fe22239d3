//! Run orchestration.
//!
//! A run resolves and classifies every system folder, then executes the
//! scheduled deletions, then sweeps empty directories. Each stage is
//! announced by a banner line in the journal.

use crate::journal::Journal;
use crate::metrics::RunMetrics;
use crate::models::RomtidyConfig;
use crate::services::classifier::SystemClassifier;
use crate::services::decisions::DecisionProvider;
use crate::services::error::ReconcileError;
use crate::services::pruner::prune_empty_directories;
use crate::services::system::{SystemDisposition, resolve_system_folder};
use crate::services::walker::{Listing, walk};
use crate::state::RunContext;
use camino::Utf8Path;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub dry_run: bool,
    pub metrics: RunMetrics,
}

/// Drives one reconciliation run over a collection root.
///
/// The run classifies every system folder first and only then executes the
/// scheduled deletions and the final empty-directory sweep.
///
/// # Examples
///
/// ```no_run
/// use romtidy::journal::Journal;
/// use romtidy::models::RomtidyConfig;
/// use romtidy::services::{Reconciler, ScriptedDecisions};
///
/// let config = RomtidyConfig::new("/roms");
/// let mut journal = Journal::in_memory();
/// let mut decisions = ScriptedDecisions::new();
/// let report = Reconciler::new(&config).run(&mut journal, &mut decisions)?;
/// println!("{}", report.metrics.summary());
/// # Ok::<(), romtidy::services::ReconcileError>(())
/// ```
pub struct Reconciler<'c> {
    config: &'c RomtidyConfig,
}

impl<'c> Reconciler<'c> {
    pub fn new(config: &'c RomtidyConfig) -> Self {
        Self { config }
    }

    /// Run against the configured root.
    ///
    /// # Returns
    ///
    /// A report on success. A journal failure or a failed move aborts the
    /// run with the error; deletions already scheduled are then not executed.
    pub fn run(
        &self,
        journal: &mut Journal,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<RunReport, ReconcileError> {
        let root = self.config.root_path.as_path();
        let mut ctx = RunContext::new(self.config, journal, decisions);

        if !ctx.workspace.is_dir(root) {
            return Err(ReconcileError::RootMissing(root.to_path_buf()));
        }

        tracing::info!(
            "Reconciling {} ({} systems, {} aliases, dry run: {})",
            root,
            self.config.systems.len(),
            self.config.aliases.len(),
            self.config.dry_run
        );

        ctx.log("====Starting System Processing====")?;
        let system_dirs: Vec<_> = ctx
            .list(root)?
            .into_iter()
            .filter(|entry| entry.is_dir())
            .collect();
        for entry in system_dirs {
            process_system_folder(&mut ctx, &entry.path)?;
        }

        ctx.log("====Executing Scheduled Deletes====")?;
        let scheduler = std::mem::take(&mut ctx.scheduler);
        scheduler.execute(&mut ctx)?;

        ctx.log("====Final Empty Folder Cleanup====")?;
        prune_empty_directories(&mut ctx, root)?;

        ctx.log("====Run Complete====")?;
        ctx.metrics.log_summary();

        Ok(RunReport {
            dry_run: self.config.dry_run,
            metrics: ctx.metrics,
        })
    }
}

fn process_system_folder(ctx: &mut RunContext<'_>, dir: &Utf8Path) -> Result<(), ReconcileError> {
    match resolve_system_folder(ctx, dir)? {
        SystemDisposition::Resolved { dir, key } => {
            let config = ctx.config;
            let Some(system) = config.system(&key) else {
                return Ok(());
            };
            tracing::info!(
                "Processing {} as '{}' (zip policy: {})",
                dir,
                key,
                system.zip_policy
            );
            ctx.metrics.record_system_processed();
            let mut classifier = SystemClassifier::new(&dir, system);
            walk(ctx, &dir, &mut classifier)?;
        }
        SystemDisposition::Removed(dir) => {
            tracing::info!("{} is a placeholder folder", dir);
        }
        SystemDisposition::Unknown(dir) => {
            tracing::info!("{} matches no configured system, leaving it alone", dir);
        }
    }
    Ok(())
}
