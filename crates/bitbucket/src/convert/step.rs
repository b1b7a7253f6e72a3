//! Step, parallel and script conversion

use super::StageContext;
use crate::schema::{Image, Parallel, Pipe, Script, Step};
use pipeshift_harness::{self as harness, StepGroup, StepParallel, StepPlugin, StepRun, StepSpec};

/// Convert a parallel block; always wrapped, even with one child
pub(crate) fn convert_parallel(ctx: &mut StageContext<'_>, parallel: &Parallel) -> harness::Step {
    let steps = parallel
        .steps
        .iter()
        .map(|step| convert_step(ctx, step))
        .collect();
    let name = ctx.names.generate(Some("parallel"), "parallel");
    harness::Step::new(name, StepSpec::Parallel(StepParallel { steps }))
}

/// Convert a step into one leaf per script entry, `script` then `after-script`.
///
/// A single leaf is returned directly; anything else is wrapped in a group.
pub(crate) fn convert_step(ctx: &mut StageContext<'_>, step: &Step) -> harness::Step {
    let leaves: Vec<harness::Step> = step
        .script
        .iter()
        .chain(&step.after_script)
        .map(|script| convert_script(ctx, step, script))
        .collect();

    match <[harness::Step; 1]>::try_from(leaves) {
        Ok([leaf]) => leaf,
        Err(steps) => {
            let name = ctx.names.generate(step.name.as_deref(), "group");
            harness::Step::new(name, StepSpec::Group(StepGroup { steps }))
        }
    }
}

fn convert_script(ctx: &mut StageContext<'_>, step: &Step, script: &Script) -> harness::Step {
    match script {
        Script::Text(command) => convert_script_step(ctx, step, command),
        Script::Pipe(pipe) => convert_pipe_step(ctx, step, pipe),
    }
}

fn convert_script_step(ctx: &mut StageContext<'_>, step: &Step, command: &str) -> harness::Step {
    let image = step.image.as_ref().or(ctx.config.image.as_ref());
    let spec = StepRun {
        image: image.map(image_name).unwrap_or_default(),
        user: image
            .filter(|image| image.run_as_user != 0)
            .map(|image| image.run_as_user.to_string()),
        run: command.to_string(),
        ..StepRun::default()
    };

    let name = ctx.names.generate(step.name.as_deref(), "run");
    harness::Step::new(name, StepSpec::Run(spec)).with_timeout(step_timeout(ctx, step))
}

fn convert_pipe_step(ctx: &mut StageContext<'_>, step: &Step, pipe: &Pipe) -> harness::Step {
    let spec = StepPlugin {
        image: trim_docker_prefix(&pipe.image).to_string(),
        with: pipe.variables.clone(),
        ..StepPlugin::default()
    };

    let name = ctx.names.generate(step.name.as_deref(), "plugin");
    harness::Step::new(name, StepSpec::Plugin(spec)).with_timeout(pipe_timeout(step))
}

/// Step `max-time`, falling back to the global option
fn step_timeout(ctx: &StageContext<'_>, step: &Step) -> Option<String> {
    let global = ctx.config.options.as_ref().map_or(0, |o| o.max_time);
    let minutes = if step.max_time > 0 { step.max_time } else { global };
    (minutes > 0).then(|| minutes_to_duration(minutes))
}

/// Step `max-time` only; pipes ignore the global option
fn pipe_timeout(step: &Step) -> Option<String> {
    (step.max_time > 0).then(|| minutes_to_duration(step.max_time))
}

/// Image reference without the `docker://` scheme
pub(crate) fn image_name(image: &Image) -> String {
    trim_docker_prefix(&image.name).to_string()
}

/// Strip a leading `docker://` scheme
#[must_use]
pub fn trim_docker_prefix(image: &str) -> &str {
    image.strip_prefix("docker://").unwrap_or(image)
}

/// Format minutes as a duration literal (`10m0s`, `1h30m0s`)
#[must_use]
pub fn minutes_to_duration(minutes: u32) -> String {
    match (minutes / 60, minutes % 60) {
        (0, 0) => "0s".to_string(),
        (0, m) => format!("{m}m0s"),
        (h, m) => format!("{h}h{m}m0s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitbucketConverter;
    use crate::schema::{Config, Stage};

    fn with_context<T>(config_yaml: &str, f: impl FnOnce(&mut StageContext<'_>) -> T) -> T {
        let config: Config = serde_yaml::from_str(config_yaml).unwrap();
        let converter = BitbucketConverter::new();
        let stage = Stage::default();
        let mut ctx = StageContext::new(&converter, &config, &stage);
        f(&mut ctx)
    }

    fn step(yaml: &str) -> Step {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_minutes_to_duration() {
        assert_eq!(minutes_to_duration(0), "0s");
        assert_eq!(minutes_to_duration(10), "10m0s");
        assert_eq!(minutes_to_duration(60), "1h0m0s");
        assert_eq!(minutes_to_duration(90), "1h30m0s");
        assert_eq!(minutes_to_duration(120), "2h0m0s");
    }

    #[test]
    fn test_trim_docker_prefix() {
        assert_eq!(trim_docker_prefix("docker://alpine:3.18"), "alpine:3.18");
        assert_eq!(trim_docker_prefix("alpine:3.18"), "alpine:3.18");
    }

    #[test]
    fn test_single_script_is_not_grouped() {
        with_context("image: node:20\n", |ctx| {
            let converted = convert_step(ctx, &step("name: Test\nscript: [npm test]\n"));
            assert_eq!(converted.name, "test_run");
            let StepSpec::Run(run) = &converted.spec else {
                panic!("expected run step");
            };
            assert_eq!(run.image, "node:20");
            assert_eq!(run.run, "npm test");
            assert_eq!(run.user, None);
            assert_eq!(converted.timeout, None);
        });
    }

    #[test]
    fn test_multiple_entries_are_grouped_in_order() {
        with_context("{}", |ctx| {
            let converted = convert_step(
                ctx,
                &step(
                    r"
name: Deploy
script:
  - make build
  - pipe: docker://atlassian/aws-s3-deploy:1.1.0
    variables:
      S3_BUCKET: site
after-script:
  - make cleanup
",
                ),
            );
            assert_eq!(converted.name, "deploy_group");
            let StepSpec::Group(group) = &converted.spec else {
                panic!("expected group step");
            };
            let kinds: Vec<_> = group.steps.iter().map(harness::Step::kind).collect();
            assert_eq!(kinds, vec!["run", "plugin", "run"]);
            let names: Vec<_> = group.steps.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["deploy_run", "deploy_plugin", "deploy_run_2"]);

            let StepSpec::Plugin(plugin) = &group.steps[1].spec else {
                panic!("expected plugin step");
            };
            assert_eq!(plugin.image, "atlassian/aws-s3-deploy:1.1.0");
            assert_eq!(plugin.with["S3_BUCKET"], serde_yaml::Value::from("site"));
        });
    }

    #[test]
    fn test_step_image_overrides_global() {
        with_context("image: node:20\n", |ctx| {
            let converted = convert_step(
                ctx,
                &step("image:\n  name: docker://alpine:3.18\n  run-as-user: 1000\nscript: [ls]\n"),
            );
            let StepSpec::Run(run) = &converted.spec else {
                panic!("expected run step");
            };
            assert_eq!(run.image, "alpine:3.18");
            assert_eq!(run.user.as_deref(), Some("1000"));
        });
    }

    #[test]
    fn test_timeouts() {
        with_context("options:\n  max-time: 30\n", |ctx| {
            let fallback = convert_step(ctx, &step("script: [a]\n"));
            assert_eq!(fallback.timeout.as_deref(), Some("30m0s"));

            let own = convert_step(ctx, &step("max-time: 10\nscript: [b]\n"));
            assert_eq!(own.timeout.as_deref(), Some("10m0s"));

            let pipe = convert_step(ctx, &step("max-time: 90\nscript:\n  - pipe: p/q:1\n"));
            assert_eq!(pipe.timeout.as_deref(), Some("1h30m0s"));
        });
    }

    #[test]
    fn test_pipe_ignores_global_max_time() {
        with_context("options:\n  max-time: 30\n", |ctx| {
            let pipe = convert_step(ctx, &step("script:\n  - pipe: atlassian/x:1\n"));
            assert_eq!(pipe.kind(), "plugin");
            assert_eq!(pipe.timeout, None);

            let mixed = convert_step(ctx, &step("script:\n  - make\n  - pipe: atlassian/x:1\n"));
            let StepSpec::Group(group) = &mixed.spec else {
                panic!("expected group step");
            };
            assert_eq!(group.steps[0].timeout.as_deref(), Some("30m0s"));
            assert_eq!(group.steps[1].timeout, None);
        });
    }

    #[test]
    fn test_parallel_is_always_wrapped() {
        with_context("{}", |ctx| {
            let parallel: Parallel = serde_yaml::from_str("- step:\n    script: [a]\n").unwrap();
            let converted = convert_parallel(ctx, &parallel);
            assert_eq!(converted.name, "parallel");
            let StepSpec::Parallel(inner) = &converted.spec else {
                panic!("expected parallel step");
            };
            assert_eq!(inner.steps.len(), 1);
        });
    }
}
