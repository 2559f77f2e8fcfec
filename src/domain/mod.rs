//! Core domain models for depsync
//!
//! - Instances: one dependency declaration inside one package.json
//! - Reports: the judgement on each instance
//! - Summary structures for a whole run

mod instance;
mod report;
mod summary;

pub use instance::{Instance, InstanceId, PackageId};
pub use report::{FixableKind, Report, UnfixableKind, ValidKind};
pub use summary::{ManifestResult, RunSummary};
