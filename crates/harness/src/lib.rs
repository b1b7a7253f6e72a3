//! Harness CI pipeline schema for pipeshift
//!
//! This crate provides the target side of every conversion: the typed Harness
//! CI v1 document and the [`Converter`] trait implemented by source schema
//! crates.
//!
//! # Tag-dispatched types
//!
//! | Type | Discriminator | Variants |
//! |------|---------------|----------|
//! | [`Stage`] | `type` | `ci`, `custom`, `template` |
//! | [`Step`] | `type` | `run`, `plugin`, `background`, `group`, `parallel` |
//! | [`Runtime`] | `type` | `cloud`, `machine` |
//! | [`Failure`] | `type` | `abort`, `fail`, `ignore`, `retry`, `success` |
//!
//! An unknown discriminator fails the whole decode.

pub mod convert;
pub mod on;
pub mod schema;
pub mod stage;
pub mod step;

pub use convert::{Converter, ConverterInfo, ConverterRegistry};
pub use on::{Failure, FailureAction, On};
pub use schema::{
    Cache, CloneSettings, Config, Defaults, Delegate, Pipeline, Runtime, RuntimeCloud,
    SCHEMA_VERSION,
};
pub use stage::{Stage, StageCi, StageSpec};
pub use step::{Step, StepBackground, StepGroup, StepParallel, StepPlugin, StepRun, StepSpec};

use pipeshift_core::ConvertResult;

/// Decode a Harness document, resolving every tagged union.
///
/// # Errors
/// Returns `ConvertError::Decode` if the document is malformed or uses an
/// unknown stage, step, runtime or failure type.
pub fn from_yaml_str(source: &str) -> ConvertResult<Config> {
    pipeshift_core::from_yaml_str("harness", source)
}
