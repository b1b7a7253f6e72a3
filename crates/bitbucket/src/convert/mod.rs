//! Bitbucket to Harness conversion
//!
//! The converter walks the `default` pipeline of a decoded [`Config`] and
//! produces one Harness CI stage per Bitbucket stage. Loose top-level steps
//! and parallel blocks between stages are gathered into implicit stages.
//!
//! Bitbucket sets clone, size, runner and cache behavior per step while
//! Harness sets them per stage, so each stage folds its steps' settings
//! together (see [`extract`]).

pub mod cache;
pub mod extract;
pub mod names;
mod stage;
mod step;

pub use step::{minutes_to_duration, trim_docker_prefix};

use crate::schema::{CloneSettings, Config, PipelineItem, Stage, StepItem};
use extract::extract_all_steps;
use names::{Namer, slugify};
use pipeshift_core::ConvertResult;
use pipeshift_harness::{self as harness, Converter};
use std::borrow::Cow;

/// Stage name used when a source stage has none
pub const DEFAULT_STAGE_NAME: &str = "build";

/// Image of the background service started when `options.docker` is set
pub const DEFAULT_DOCKER_IMAGE: &str = "docker:dind";

/// Converts Bitbucket Pipelines documents to Harness CI
///
/// # Example
///
/// ```ignore
/// use pipeshift_bitbucket::BitbucketConverter;
/// use pipeshift_harness::Converter;
///
/// let converter = BitbucketConverter::new().with_stage_name("ci");
/// let config = converter.convert_str("pipelines:\n  default:\n    - step:\n        script: [make]\n")?;
/// assert_eq!(config.spec.stages[0].name, "ci");
/// ```
#[derive(Debug, Clone)]
pub struct BitbucketConverter {
    /// Name for stages without one
    pub stage_name: String,
    /// Docker-in-Docker service image
    pub docker_image: String,
}

impl Default for BitbucketConverter {
    fn default() -> Self {
        Self {
            stage_name: DEFAULT_STAGE_NAME.to_string(),
            docker_image: DEFAULT_DOCKER_IMAGE.to_string(),
        }
    }
}

impl BitbucketConverter {
    /// Create a converter with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name given to stages without one
    #[must_use]
    pub fn with_stage_name(mut self, name: impl Into<String>) -> Self {
        self.stage_name = name.into();
        self
    }

    /// Set the Docker-in-Docker service image
    #[must_use]
    pub fn with_docker_image(mut self, image: impl Into<String>) -> Self {
        self.docker_image = image.into();
        self
    }

    /// Convert a decoded Bitbucket document.
    ///
    /// Conversion never fails: source settings without a Harness equivalent
    /// are dropped. Only the `default` pipeline is converted.
    #[tracing::instrument(name = "bitbucket_convert", skip_all)]
    pub fn convert(&self, config: &Config) -> harness::Config {
        let mut pipeline = harness::Pipeline {
            default: convert_default(config),
            stages: Vec::new(),
        };

        let mut stage_names = Namer::new();
        for source in group_stages(&config.pipelines.default) {
            let name = stage_names.unique(&self.name_for(&source));
            let ctx = StageContext::new(self, config, &source);
            pipeline.stages.push(stage::convert_stage(ctx, name));
        }

        for name in config.pipelines.other.keys() {
            tracing::debug!(pipelines = %name, "Skipping pipeline set; only `default` is converted");
        }

        tracing::info!(
            stages = pipeline.stages.len(),
            defaults = pipeline.default.is_some(),
            "Converted Bitbucket pipeline"
        );
        harness::Config::pipeline(pipeline)
    }

    fn name_for(&self, stage: &Stage) -> String {
        stage
            .name
            .as_deref()
            .map(slugify)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.stage_name.clone())
    }
}

impl Converter for BitbucketConverter {
    fn convert_str(&self, source: &str) -> ConvertResult<harness::Config> {
        let config: Config = pipeshift_core::from_yaml_str("bitbucket", source)?;
        Ok(self.convert(&config))
    }

    fn format_name(&self) -> &'static str {
        "bitbucket"
    }

    fn description(&self) -> &'static str {
        "Bitbucket Pipelines (bitbucket-pipelines.yml)"
    }
}

/// Per-stage conversion state; one is created for every stage converted
pub(crate) struct StageContext<'a> {
    pub converter: &'a BitbucketConverter,
    pub config: &'a Config,
    pub stage: &'a Stage,
    pub names: Namer,
}

impl<'a> StageContext<'a> {
    pub(crate) fn new(converter: &'a BitbucketConverter, config: &'a Config, stage: &'a Stage) -> Self {
        Self {
            converter,
            config,
            stage,
            names: Namer::new(),
        }
    }
}

/// Pipeline-wide defaults from the global clone settings.
///
/// A global `enabled: false` is undone when any step of the default pipeline
/// sets `clone.enabled: true`, since Harness cannot re-enable clone per stage.
fn convert_default(config: &Config) -> Option<harness::Defaults> {
    let clone = config.clone.as_ref()?;
    let mut settings = convert_clone_global(clone);

    if settings.disabled {
        let enabled_by_step = extract_all_steps(&config.pipelines.default)
            .into_iter()
            .any(|step| step.clone.as_ref().and_then(|c| c.enabled) == Some(true));
        if enabled_by_step {
            tracing::debug!("Step re-enables clone; dropping global clone disable");
            settings.disabled = false;
        }
    }

    Some(harness::Defaults {
        clone: Some(settings),
    })
}

fn convert_clone_global(clone: &CloneSettings) -> harness::CloneSettings {
    harness::CloneSettings {
        disabled: clone.enabled == Some(false),
        depth: clone.depth.map_or(0, |d| d.value()),
        insecure: clone.skip_ssl_verify,
        ..harness::CloneSettings::default()
    }
}

/// Explicit stages as-is, with runs of loose steps gathered into unnamed stages
fn group_stages(items: &[PipelineItem]) -> Vec<Cow<'_, Stage>> {
    let mut stages = Vec::new();
    let mut loose = Vec::new();

    for item in items {
        match item {
            PipelineItem::Step(step) => loose.push(StepItem::Step(step.clone())),
            PipelineItem::Parallel(parallel) => loose.push(StepItem::Parallel(parallel.clone())),
            PipelineItem::Stage(stage) => {
                if !loose.is_empty() {
                    stages.push(implicit_stage(std::mem::take(&mut loose)));
                }
                stages.push(Cow::Borrowed(stage));
            }
        }
    }
    if !loose.is_empty() {
        stages.push(implicit_stage(loose));
    }
    stages
}

fn implicit_stage<'a>(steps: Vec<StepItem>) -> Cow<'a, Stage> {
    Cow::Owned(Stage { name: None, steps })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_default_absent_without_global_clone() {
        assert_eq!(convert_default(&config("image: node:20\n")), None);
    }

    #[test]
    fn test_global_clone_mapping() {
        let defaults = convert_default(&config("clone:\n  depth: 50\n  skip-ssl-verify: true\n")).unwrap();
        let clone = defaults.clone.unwrap();
        assert_eq!(clone.depth, 50);
        assert!(clone.insecure);
        assert!(!clone.disabled);
    }

    #[test]
    fn test_global_disable_is_kept() {
        let defaults = convert_default(&config(
            "clone:\n  enabled: false\npipelines:\n  default:\n    - step:\n        script: [a]\n",
        ))
        .unwrap();
        assert!(defaults.clone.unwrap().disabled);
    }

    #[test]
    fn test_step_enable_overrides_global_disable() {
        let defaults = convert_default(&config(
            r"
clone:
  enabled: false
pipelines:
  default:
    - stage:
        steps:
          - step:
              script: [a]
          - parallel:
              - step:
                  clone:
                    enabled: true
                  script: [b]
",
        ))
        .unwrap();
        assert!(!defaults.clone.unwrap().disabled);
    }

    #[test]
    fn test_group_stages() {
        let config = config(
            r"
pipelines:
  default:
    - step:
        script: [a]
    - parallel:
        - step:
            script: [b]
    - stage:
        name: Deploy
        steps:
          - step:
              script: [c]
    - step:
        script: [d]
",
        );
        let stages = group_stages(&config.pipelines.default);
        assert_eq!(stages.len(), 3);
        assert!(matches!(stages[0], Cow::Owned(_)));
        assert_eq!(stages[0].steps.len(), 2);
        assert_eq!(stages[1].name.as_deref(), Some("Deploy"));
        assert_eq!(stages[2].steps.len(), 1);
    }

    #[test]
    fn test_stage_names_are_unique() {
        let converted = BitbucketConverter::new().convert(&config(
            r"
pipelines:
  default:
    - stage:
        steps:
          - step:
              script: [a]
    - stage:
        name: Build
        steps:
          - step:
              script: [b]
    - stage:
        name: Deploy to Prod
        steps:
          - step:
              script: [c]
",
        ));
        let names: Vec<_> = converted.spec.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["build", "build_2", "deploy_to_prod"]);
    }

    #[test]
    fn test_converter_settings() {
        let converter = BitbucketConverter::new()
            .with_stage_name("ci")
            .with_docker_image("docker:27-dind");
        let converted = converter
            .convert_str("options:\n  docker: true\npipelines:\n  default:\n    - step:\n        script: [a]\n")
            .unwrap();
        let stage = &converted.spec.stages[0];
        assert_eq!(stage.name, "ci");
        let harness::StepSpec::Background(dind) = &stage.steps()[0].spec else {
            panic!("expected background step");
        };
        assert_eq!(dind.image, "docker:27-dind");
    }

    #[test]
    fn test_decode_error_names_format() {
        let err = BitbucketConverter::new()
            .convert_str("pipelines:\n  default:\n    - step:\n        max-time: soon\n")
            .unwrap_err();
        assert!(matches!(err, pipeshift_core::ConvertError::Decode { format: "bitbucket", .. }));
    }
}
