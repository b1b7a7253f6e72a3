//! Command execution
//!
//! Each command reads its input, delegates to the library crates and writes
//! the result. Converted documents go to stdout unless `--output` is given.

use crate::cli::{Commands, OutputFormat, STDIN};
use crate::errors::{CliError, CliResult};
use pipeshift_bitbucket::BitbucketConverter;
use pipeshift_harness::{Config, ConverterRegistry};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Build the registry of every supported source format
pub fn registry(stage_name: &str) -> ConverterRegistry {
    let mut registry = ConverterRegistry::new();
    registry.register(BitbucketConverter::new().with_stage_name(stage_name));
    registry
}

/// Execute a parsed command
pub fn execute(command: Commands) -> CliResult<()> {
    match command {
        Commands::Convert {
            input,
            from,
            output,
            format,
            stage_name,
        } => execute_convert(&input, &from, output.as_deref(), format, &stage_name),
        Commands::Check { input } => execute_check(&input),
        Commands::Formats => {
            execute_formats();
            Ok(())
        }
    }
}

#[tracing::instrument(skip(stage_name))]
fn execute_convert(
    input: &Path,
    from: &str,
    output: Option<&Path>,
    format: OutputFormat,
    stage_name: &str,
) -> CliResult<()> {
    let source = read_input(input)?;
    let config = registry(stage_name)
        .convert(from, &source)
        .map_err(|e| CliError::conversion_failed(input, e))?;

    let rendered = render(&config, format).map_err(|e| CliError::conversion_failed(input, e))?;

    match output {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|e| CliError::file_error("write", path, e))?;
            tracing::info!(output = %path.display(), stages = config.spec.stages.len(), "Wrote converted pipeline");
        }
        None => write_stdout(&rendered),
    }
    Ok(())
}

#[tracing::instrument]
fn execute_check(input: &Path) -> CliResult<()> {
    let source = read_input(input)?;
    let config =
        pipeshift_harness::from_yaml_str(&source).map_err(|e| CliError::conversion_failed(input, e))?;

    let steps: usize = config.spec.stages.iter().map(|stage| stage.steps().len()).sum();
    write_stdout(&format!(
        "{}: ok ({} stages, {} top-level steps)\n",
        input.display(),
        config.spec.stages.len(),
        steps
    ));
    Ok(())
}

fn execute_formats() {
    let listing: String = registry(pipeshift_bitbucket::DEFAULT_STAGE_NAME)
        .info()
        .into_iter()
        .map(|info| format!("{}\t{}\n", info.format, info.description))
        .collect();
    write_stdout(&listing);
}

fn render(config: &Config, format: OutputFormat) -> pipeshift_core::ConvertResult<String> {
    match format {
        OutputFormat::Yaml => config.to_yaml(),
        OutputFormat::Json => config.to_json().map(|json| json + "\n"),
    }
}

fn read_input(input: &Path) -> CliResult<String> {
    if input == Path::new(STDIN) {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .map_err(|e| CliError::file_error("read", PathBuf::from("<stdin>"), e))?;
        return Ok(source);
    }
    std::fs::read_to_string(input).map_err(|e| CliError::file_error("read", input, e))
}

#[allow(clippy::print_stdout)]
fn write_stdout(text: &str) {
    print!("{text}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeshift_harness::Pipeline;

    #[test]
    fn test_registry_contains_bitbucket() {
        let registry = registry("build");
        assert_eq!(registry.formats(), vec!["bitbucket"]);
    }

    #[test]
    fn test_render_formats() {
        let config = Config::pipeline(Pipeline::default());
        let yaml = render(&config, OutputFormat::Yaml).unwrap();
        assert!(yaml.starts_with("version: 1\n"));

        let json = render(&config, OutputFormat::Json).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with("}\n"));
    }

    #[test]
    fn test_read_missing_input() {
        let err = read_input(Path::new("definitely/not/here.yml")).unwrap_err();
        assert!(matches!(err, CliError::FileError { .. }));
    }
}
