//! Bitbucket Pipelines source schema for pipeshift.
//!
//! This crate provides:
//! - [`schema`]: the typed `bitbucket-pipelines.yml` document
//! - [`BitbucketConverter`]: the [`Converter`](pipeshift_harness::Converter)
//!   that maps it onto a Harness CI pipeline
//!
//! # Mapping overview
//!
//! | Bitbucket | Harness |
//! |-----------|---------|
//! | `clone` (global) | `default.clone` |
//! | `stage` / loose steps | `ci` stage |
//! | `parallel` | `parallel` step |
//! | step with several script lines | `group` step |
//! | script line | `run` step |
//! | `pipe` | `plugin` step |
//! | `options.docker`, `services` | `background` steps |
//! | `size` (max per stage) | `runtime.cloud.size` |
//! | `caches` | `cache.paths` |
//! | `runs-on` | `delegate.selectors` |

#![warn(missing_docs)]

pub mod convert;
pub mod schema;

pub use convert::{BitbucketConverter, DEFAULT_DOCKER_IMAGE, DEFAULT_STAGE_NAME};
pub use schema::Config;

use pipeshift_core::ConvertResult;

/// Decode a `bitbucket-pipelines.yml` document.
///
/// # Errors
/// Returns `ConvertError::Decode` with the offending path if the document
/// does not match the schema.
pub fn from_yaml_str(source: &str) -> ConvertResult<Config> {
    pipeshift_core::from_yaml_str("bitbucket", source)
}
