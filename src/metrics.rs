// Run metrics module
//
// Counts what a reconciliation run did so a summary can be logged and printed
// once the run finishes.

use std::time::{Duration, Instant};

/// Counters for a single run.
///
/// A run is single-threaded, so plain counters are enough. Each stage calls
/// the matching `record_*` method as it acts; [`RunMetrics::summary`] renders
/// the totals.
#[derive(Debug, Clone)]
pub struct RunMetrics {
    /// System folders walked
    pub systems_processed: usize,

    /// System folders tagged as unknown
    pub systems_tagged_unknown: usize,

    /// System folders tagged as needing an alias rename
    pub systems_tagged_alias: usize,

    /// System folders scheduled for deletion as placeholders
    pub systems_removed: usize,

    /// Structured game folders left alone
    pub structured_folders_skipped: usize,

    /// Files moved into a system root (including collision renames)
    pub files_moved: usize,

    /// Archive entries written out
    pub entries_extracted: usize,

    /// Archive entries that failed to extract
    pub extract_failures: usize,

    /// Same-size duplicates skipped or scheduled for deletion
    pub duplicates: usize,

    /// Archives that could not be opened
    pub corrupt_archives: usize,

    /// Paths scheduled for deletion
    pub deletes_scheduled: usize,

    /// Paths actually deleted (or that would be, in a dry run)
    pub deletes_completed: usize,

    /// Deletes that failed
    pub deletes_failed: usize,

    /// Directories removed by the final empty-folder sweep
    pub empty_dirs_pruned: usize,

    /// Decisions requested from the decision provider
    pub decisions_requested: usize,

    start_time: Instant,
}

impl RunMetrics {
    /// Create a new RunMetrics instance
    pub fn new() -> Self {
        Self {
            systems_processed: 0,
            systems_tagged_unknown: 0,
            systems_tagged_alias: 0,
            systems_removed: 0,
            structured_folders_skipped: 0,
            files_moved: 0,
            entries_extracted: 0,
            extract_failures: 0,
            duplicates: 0,
            corrupt_archives: 0,
            deletes_scheduled: 0,
            deletes_completed: 0,
            deletes_failed: 0,
            empty_dirs_pruned: 0,
            decisions_requested: 0,
            start_time: Instant::now(),
        }
    }

    pub fn record_system_processed(&mut self) {
        self.systems_processed += 1;
    }

    pub fn record_system_tagged_unknown(&mut self) {
        self.systems_tagged_unknown += 1;
    }

    pub fn record_system_tagged_alias(&mut self) {
        self.systems_tagged_alias += 1;
    }

    pub fn record_system_removed(&mut self) {
        self.systems_removed += 1;
    }

    pub fn record_structured_folder_skipped(&mut self) {
        self.structured_folders_skipped += 1;
    }

    pub fn record_file_moved(&mut self) {
        self.files_moved += 1;
    }

    pub fn record_entry_extracted(&mut self) {
        self.entries_extracted += 1;
    }

    pub fn record_extract_failure(&mut self) {
        self.extract_failures += 1;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates += 1;
    }

    pub fn record_corrupt_archive(&mut self) {
        self.corrupt_archives += 1;
    }

    pub fn record_delete_scheduled(&mut self) {
        self.deletes_scheduled += 1;
    }

    pub fn record_delete_completed(&mut self) {
        self.deletes_completed += 1;
    }

    pub fn record_delete_failed(&mut self) {
        self.deletes_failed += 1;
    }

    pub fn record_empty_dir_pruned(&mut self) {
        self.empty_dirs_pruned += 1;
    }

    pub fn record_decision_requested(&mut self) {
        self.decisions_requested += 1;
    }

    /// Get elapsed run time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check if the run changed (or would change) anything
    pub fn has_changes(&self) -> bool {
        self.files_moved > 0
            || self.entries_extracted > 0
            || self.deletes_completed > 0
            || self.empty_dirs_pruned > 0
            || self.systems_tagged_unknown > 0
            || self.systems_tagged_alias > 0
    }

    /// Get a one-line summary of the run
    pub fn summary(&self) -> String {
        format!(
            "{} systems, {} moved, {} extracted, {} deleted ({} failed), {} empty dirs pruned, \
             {} duplicates, {} corrupt archives, {} unknown, {} aliased, {} structured skipped",
            self.systems_processed,
            self.files_moved,
            self.entries_extracted,
            self.deletes_completed,
            self.deletes_failed,
            self.empty_dirs_pruned,
            self.duplicates,
            self.corrupt_archives,
            self.systems_tagged_unknown,
            self.systems_tagged_alias,
            self.structured_folders_skipped,
        )
    }

    /// Log the summary through tracing
    pub fn log_summary(&self) {
        tracing::info!(
            "Run finished in {:.2}s: {}",
            self.elapsed().as_secs_f32(),
            self.summary()
        );
        if self.extract_failures > 0 || self.deletes_failed > 0 {
            tracing::warn!(
                "{} extraction failures, {} failed deletes",
                self.extract_failures,
                self.deletes_failed
            );
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
