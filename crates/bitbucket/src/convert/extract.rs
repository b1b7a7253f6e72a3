//! Stage-wide aggregation over Bitbucket steps
//!
//! Harness configures size, runners, caches and clone behavior per stage,
//! while Bitbucket configures them per step. These helpers fold the step
//! settings of one stage into a single value each.

use crate::schema::{Options, PipelineItem, Size, Stage, Step, StepItem};
use pipeshift_harness as harness;
use std::collections::BTreeSet;

/// Steps of a stage in document order, with parallel blocks flattened
#[must_use]
pub fn extract_steps(stage: &Stage) -> Vec<&Step> {
    let mut steps = Vec::new();
    for item in &stage.steps {
        match item {
            StepItem::Step(step) => steps.push(step),
            StepItem::Parallel(parallel) => steps.extend(&parallel.steps),
        }
    }
    steps
}

/// Every step of a pipeline, including loose steps outside any stage
#[must_use]
pub fn extract_all_steps(items: &[PipelineItem]) -> Vec<&Step> {
    let mut steps = Vec::new();
    for item in items {
        match item {
            PipelineItem::Step(step) => steps.push(step),
            PipelineItem::Parallel(parallel) => steps.extend(&parallel.steps),
            PipelineItem::Stage(stage) => steps.extend(extract_steps(stage)),
        }
    }
    steps
}

/// Largest size tier among the global option and the stage's steps
#[must_use]
pub fn extract_size(options: Option<&Options>, stage: &Stage) -> Size {
    let global = options.map(|o| o.size).unwrap_or_default();
    extract_steps(stage)
        .into_iter()
        .map(|step| step.size)
        .fold(global, Ord::max)
}

/// Sorted, deduplicated runner labels of the stage's steps
#[must_use]
pub fn extract_runs_on(stage: &Stage) -> Vec<String> {
    sorted_set(extract_steps(stage).into_iter().flat_map(|step| &step.runs_on))
}

/// Sorted, deduplicated cache names of the stage's steps
#[must_use]
pub fn extract_caches(stage: &Stage) -> Vec<String> {
    sorted_set(extract_steps(stage).into_iter().flat_map(|step| &step.caches))
}

/// Sorted, deduplicated service names of the stage's steps
#[must_use]
pub fn extract_services(stage: &Stage) -> Vec<String> {
    sorted_set(extract_steps(stage).into_iter().flat_map(|step| &step.services))
}

/// Stage clone settings from the step clone overrides.
///
/// The depth is the maximum step depth and `insecure` is set when any step
/// skips TLS verification. Returns `None` when no step overrides clone.
#[must_use]
pub fn extract_clone(stage: &Stage) -> Option<harness::CloneSettings> {
    let mut result: Option<harness::CloneSettings> = None;
    for step in extract_steps(stage) {
        let Some(clone) = &step.clone else {
            continue;
        };
        if clone.enabled == Some(false) {
            tracing::debug!(
                step = step.name.as_deref().unwrap_or_default(),
                "Dropping step clone disable; Harness clones per stage"
            );
        }

        let settings = result.get_or_insert_with(harness::CloneSettings::default);
        if let Some(depth) = clone.depth {
            settings.depth = settings.depth.max(depth.value());
        }
        settings.insecure |= clone.skip_ssl_verify;
    }
    result
}

fn sorted_set<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
