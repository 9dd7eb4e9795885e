//! lrose-build-lib: checkout, trim, build and install of LROSE packages
//!
//! This crate provides the pieces the `lrose-build` CLI drives:
//! - `BuildConfiguration`: every option and path of one run, derived once
//! - `trim`: descriptor-driven pruning of the checked-out codebase
//! - `PipelineRunner`: ordered, fail-fast stages with per-stage log files
//! - `orchestrate`: the full sequence from clone to installed prefix

pub mod config;
pub mod consts;
pub mod directive;
pub mod external;
pub mod install;
pub mod orchestrate;
pub mod pipeline;
pub mod platform;
pub mod runtime_libs;
pub mod setup;
pub mod stages;
pub mod trim;

#[cfg(test)]
mod util;
