//! Stage conversion

use super::StageContext;
use super::cache::{convert_cache, convert_size};
use super::extract::{
    extract_caches, extract_clone, extract_runs_on, extract_services, extract_size,
};
use super::step::{convert_parallel, convert_step, image_name};
use crate::schema::StepItem;
use pipeshift_harness::{self as harness, Delegate, Runtime, StageCi, StepBackground, StepSpec};

/// Ports exposed by the Docker-in-Docker service
const DOCKER_PORTS: [&str; 2] = ["2375", "2376"];

/// Service name Bitbucket reserves for the Docker daemon
const DOCKER_SERVICE: &str = "docker";

/// Convert one Bitbucket stage into a Harness CI stage named `name`
#[tracing::instrument(name = "convert_stage", skip(ctx))]
pub(crate) fn convert_stage(mut ctx: StageContext<'_>, name: String) -> harness::Stage {
    let config = ctx.config;
    let stage = ctx.stage;

    let mut spec = StageCi {
        clone: extract_clone(stage),
        ..StageCi::default()
    };

    let size = convert_size(extract_size(config.options.as_ref(), stage));
    if !size.is_empty() {
        spec.runtime = Some(Runtime::cloud(size));
    }

    let caches = extract_caches(stage);
    if !caches.is_empty() {
        spec.cache = convert_cache(config.definitions.as_ref(), &caches);
    }

    let selectors = extract_runs_on(stage);
    if !selectors.is_empty() {
        spec.delegate = Some(Delegate { selectors });
    }

    let services = extract_services(stage);
    let docker = config.options.as_ref().is_some_and(|o| o.docker)
        || services.iter().any(|name| name == DOCKER_SERVICE);
    if docker {
        spec.steps.push(docker_service(&mut ctx));
    }
    spec.steps.extend(service_steps(&mut ctx, &services));

    for item in &stage.steps {
        let step = match item {
            StepItem::Parallel(parallel) => convert_parallel(&mut ctx, parallel),
            StepItem::Step(step) => convert_step(&mut ctx, step),
        };
        spec.steps.push(step);
    }

    spec.steps = match <[harness::Step; 1]>::try_from(spec.steps) {
        Ok([harness::Step {
            spec: StepSpec::Group(group),
            ..
        }]) => group.steps,
        Ok([step]) => vec![step],
        Err(steps) => steps,
    };

    tracing::debug!(steps = spec.steps.len(), "Converted stage");
    harness::Stage::ci(name, spec)
}

fn docker_service(ctx: &mut StageContext<'_>) -> harness::Step {
    let spec = StepBackground {
        image: ctx.converter.docker_image.clone(),
        ports: DOCKER_PORTS.iter().map(ToString::to_string).collect(),
        privileged: true,
        ..StepBackground::default()
    };
    let name = ctx.names.generate(Some("dind"), "service");
    harness::Step::new(name, StepSpec::Background(spec))
}

/// Background steps for the named services the stage's steps use.
///
/// `docker` is served by the Docker-in-Docker step and is skipped here.
fn service_steps(ctx: &mut StageContext<'_>, names: &[String]) -> Vec<harness::Step> {
    let config = ctx.config;
    let definitions = config.definitions.as_ref().map(|d| &d.services);
    let mut steps = Vec::new();
    for name in names {
        if name == DOCKER_SERVICE {
            continue;
        }
        let Some(service) = definitions.and_then(|s| s.get(name)) else {
            tracing::debug!(service = %name, "Dropping undefined service");
            continue;
        };
        let spec = StepBackground {
            image: service.image.as_ref().map(image_name).unwrap_or_default(),
            envs: service.variables.clone(),
            ..StepBackground::default()
        };
        let step_name = ctx.names.generate(Some(name), "service");
        steps.push(harness::Step::new(step_name, StepSpec::Background(spec)));
    }
    steps
}
