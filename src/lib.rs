//! depsync - dependency version consistency for JavaScript monorepos
//!
//! This library inspects every dependency declared across the package.json
//! files of a repository and decides, per configurable semver and version
//! groups, which specifiers are correct and what the wrong ones should be.
//! - `specifier`: parsing and ordering of version specifiers
//! - `group`: semver/version group policies and classification
//! - `context`: the instances of one run, inspection and fixing
//! - `update`: newer versions from the npm registry

pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod group;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod registry;
pub mod specifier;
pub mod update;
