use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Input path meaning standard input
pub const STDIN: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "pipeshift")]
#[command(about = "Convert CI pipeline definitions between platforms")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        env = "PIPESHIFT_LOG_LEVEL",
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        env = "PIPESHIFT_LOG_FORMAT",
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Convert a pipeline definition to Harness CI")]
    Convert {
        #[arg(help = "Source document, or '-' for stdin")]
        input: PathBuf,

        #[arg(long, help = "Source format", default_value = "bitbucket")]
        from: String,

        #[arg(long, short = 'o', help = "Write the result to a file instead of stdout")]
        output: Option<PathBuf>,

        #[arg(long, short = 'f', help = "Output format", default_value = "yaml", value_enum)]
        format: OutputFormat,

        #[arg(
            long,
            env = "PIPESHIFT_STAGE_NAME",
            help = "Name for stages without one",
            default_value = pipeshift_bitbucket::DEFAULT_STAGE_NAME
        )]
        stage_name: String,
    },
    #[command(about = "Check that a Harness CI document decodes")]
    Check {
        #[arg(help = "Harness document, or '-' for stdin")]
        input: PathBuf,
    },
    #[command(about = "List supported source formats")]
    Formats,
}

impl Commands {
    /// Subcommand name for span fields
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Convert { .. } => "convert",
            Self::Check { .. } => "check",
            Self::Formats => "formats",
        }
    }
}

/// Serialization format of the converted document
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML document
    Yaml,
    /// Pretty-printed JSON document
    Json,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["pipeshift", "convert", "bitbucket-pipelines.yml"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.log_format, TracingFormat::Compact);
        let Commands::Convert {
            input,
            from,
            output,
            format,
            stage_name,
        } = cli.command
        else {
            panic!("Expected Convert command");
        };
        assert_eq!(input, PathBuf::from("bitbucket-pipelines.yml"));
        assert_eq!(from, "bitbucket");
        assert_eq!(output, None);
        assert_eq!(format, OutputFormat::Yaml);
        assert_eq!(stage_name, "build");
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = Cli::try_parse_from(["pipeshift", "--level", "debug", "formats"]).unwrap();
        assert_eq!(cli.level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["pipeshift", "formats", "-l", "error"]).unwrap();
        assert_eq!(cli.level, LogLevel::Error);

        let cli = Cli::try_parse_from(["pipeshift", "--log-format", "json", "formats"]).unwrap();
        assert_eq!(cli.log_format, TracingFormat::Json);
    }

    #[test]
    fn test_convert_options() {
        let cli = Cli::try_parse_from([
            "pipeshift",
            "convert",
            "--from",
            "bitbucket",
            "-o",
            "out.json",
            "--format",
            "json",
            "--stage-name",
            "ci",
            "-",
        ])
        .unwrap();

        let Commands::Convert {
            input,
            output,
            format,
            stage_name,
            ..
        } = cli.command
        else {
            panic!("Expected Convert command");
        };
        assert_eq!(input, PathBuf::from(STDIN));
        assert_eq!(output, Some(PathBuf::from("out.json")));
        assert_eq!(format, OutputFormat::Json);
        assert_eq!(stage_name, "ci");
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::try_parse_from(["pipeshift", "check", "harness.yml"]).unwrap();
        assert_eq!(cli.command.name(), "check");
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(Cli::try_parse_from(["pipeshift", "--level", "invalid", "formats"]).is_err());
        assert!(Cli::try_parse_from(["pipeshift", "convert", "--format", "toml", "x"]).is_err());
        assert!(Cli::try_parse_from(["pipeshift", "convert"]).is_err());
        assert!(Cli::try_parse_from(["pipeshift"]).is_err());
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["pipeshift", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
