//! Decision providers.
//!
//! The engine asks a [`DecisionProvider`] whenever it cannot decide on its
//! own: an archive under the `allow` policy that mixes ROM and non-ROM
//! entries, or a file without an extension. The terminal implementation
//! lives in [`crate::ui`]; [`ScriptedDecisions`] answers from a queue for
//! tests and unattended runs.

use crate::models::{ArchiveDecision, ExtensionlessDecision};
use crate::services::error::ReconcileError;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::VecDeque;

/// Supplies user decisions for cases the engine will not decide on its own.
#[cfg_attr(test, mockall::automock)]
pub trait DecisionProvider {
    /// Decide what to do with an ambiguous archive.
    ///
    /// # Arguments
    ///
    /// * `archive` - Path of the archive as the run sees it
    /// * `rom_entries` - Names of the entries that look like ROMs
    fn resolve_archive(
        &mut self,
        archive: &Utf8Path,
        rom_entries: &[String],
    ) -> Result<ArchiveDecision, ReconcileError>;

    /// Decide what to do with a file that has no extension.
    fn resolve_extensionless(&mut self, file: &Utf8Path) -> Result<ExtensionlessDecision, ReconcileError>;
}

/// Answers from pre-loaded queues and records every question asked.
///
/// When a queue runs dry the safe answer is used: keep the archive, skip the
/// file.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    archive_answers: VecDeque<ArchiveDecision>,
    extensionless_answers: VecDeque<ExtensionlessDecision>,

    /// Archives asked about, with their ROM entries
    pub archive_requests: Vec<(Utf8PathBuf, Vec<String>)>,

    /// Extensionless files asked about
    pub extensionless_requests: Vec<Utf8PathBuf>,
}

impl ScriptedDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_archive_answer(mut self, decision: ArchiveDecision) -> Self {
        self.archive_answers.push_back(decision);
        self
    }

    pub fn with_extensionless_answer(mut self, decision: ExtensionlessDecision) -> Self {
        self.extensionless_answers.push_back(decision);
        self
    }

    /// Total number of questions asked so far.
    pub fn requests(&self) -> usize {
        self.archive_requests.len() + self.extensionless_requests.len()
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn resolve_archive(
        &mut self,
        archive: &Utf8Path,
        rom_entries: &[String],
    ) -> Result<ArchiveDecision, ReconcileError> {
        self.archive_requests
            .push((archive.to_path_buf(), rom_entries.to_vec()));
        Ok(self.archive_answers.pop_front().unwrap_or(ArchiveDecision::Keep))
    }

    fn resolve_extensionless(&mut self, file: &Utf8Path) -> Result<ExtensionlessDecision, ReconcileError> {
        self.extensionless_requests.push(file.to_path_buf());
        Ok(self
            .extensionless_answers
            .pop_front()
            .unwrap_or(ExtensionlessDecision::Skip))
    }
}
