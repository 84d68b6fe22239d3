//! Services module - The reconciliation engine.
//!
//! Everything that inspects or changes a ROM collection lives here. The
//! services take a [`crate::state::RunContext`] explicitly and never reach
//! for process-wide state, so each stage can be tested on a scratch tree.
//!
//! # Components
//!
//! - [`Reconciler`]: Drives a run: system folders, scheduled deletes, final sweep
//! - [`system`]: Resolves top-level folders to canonical systems, tags unknown
//!   and aliased folders, schedules placeholder folders
//! - [`classifier`]: Walk visitor for one system folder; moves ROMs, schedules
//!   invalid files, skips structured game folders
//! - [`archive`]: Zip inspection, policy matrix and extraction
//! - [`naming`]: Name normalization and collision-free destinations
//! - [`scheduler`]: Deferred deletions, executed after classification
//! - [`pruner`]: Final empty-directory sweep
//! - [`walker`]: Depth-first traversal with subtree skipping
//! - [`workspace`]: Filesystem access with the dry-run overlay
//! - [`decisions`]: The [`DecisionProvider`] seam for user decisions
//!
//! # Ordering
//!
//! Nothing is deleted while the tree is being classified. Within a system
//! folder, classification follows directory-tree order; deletion happens
//! only once every system folder has been walked.

pub mod archive;
pub mod classifier;
pub mod decisions;
pub mod error;
pub mod naming;
pub mod pruner;
pub mod reconcile;
pub mod scheduler;
pub mod system;
pub mod walker;
pub mod workspace;

pub use decisions::{DecisionProvider, ScriptedDecisions};
pub use error::ReconcileError;
pub use naming::{clean_name, resolve_dup};
pub use reconcile::{Reconciler, RunReport};
pub use scheduler::{ActionScheduler, ScheduledAction};
pub use system::{SystemDisposition, resolve_system_key};
pub use workspace::Workspace;
