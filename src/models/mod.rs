//! Data models for romtidy.
//!
//! This module contains the plain data shared by every stage of a run:
//! - [`RomtidyConfig`]: Run configuration (root, journal path, tags, systems, aliases)
//! - [`SystemConfig`]: Per-system rules (valid extensions, [`ZipPolicy`], name normalization)
//! - [`ArchiveDecision`] / [`ExtensionlessDecision`]: Answers returned by a
//!   [`DecisionProvider`](crate::services::DecisionProvider)
//!
//! # Architecture Note
//!
//! Config structs derive `Serialize`/`Deserialize` for JSON persistence and are
//! never mutated once a run starts; run-scoped mutable data lives in
//! [`RunContext`](crate::state::RunContext).

pub mod config;
pub mod decision;

pub use config::{RomtidyConfig, SystemConfig, ZipPolicy, normalize_extension};
pub use decision::{ArchiveDecision, ExtensionlessDecision, is_valid_extension};
