//! Error display using miette for contextual error reporting
//!
//! CLI failures are wrapped in [`CliError`] diagnostics; library errors are
//! kept as their `#[source]`.

use miette::Diagnostic;
use pipeshift_core::ConvertError;
use std::path::PathBuf;
use thiserror::Error;

/// Successful exit code
pub const EXIT_OK: i32 = 0;
/// CLI, file or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Document decoding or conversion error exit code
pub const EXIT_CONVERT: i32 = 3;

/// CLI-specific error types with diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Conversion of {} failed", path.display())]
    #[diagnostic(code(pipeshift::cli::conversion_failed))]
    ConversionFailed {
        path: PathBuf,
        #[source]
        source: ConvertError,
        #[help]
        help_text: Option<String>,
    },

    #[error("Invalid command line argument: {argument}")]
    #[diagnostic(code(pipeshift::cli::invalid_argument))]
    InvalidArgument {
        argument: String,
        #[help]
        help_text: Option<String>,
    },

    #[error("File operation failed: {operation} {}", path.display())]
    #[diagnostic(
        code(pipeshift::cli::file_error),
        help("Check file permissions and ensure the path exists")
    )]
    FileError {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tracing initialization failed ({config_used})")]
    #[diagnostic(
        code(pipeshift::cli::tracing_error),
        help("Check RUST_LOG and the --level/--log-format options")
    )]
    TracingError {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        config_used: String,
    },
}

impl CliError {
    /// Wrap a conversion failure, mapping registry misses to argument errors
    pub fn conversion_failed(path: impl Into<PathBuf>, source: ConvertError) -> Self {
        match source {
            ConvertError::UnknownFormat { format, available } => Self::InvalidArgument {
                argument: format!("--from {format}"),
                help_text: Some(format!("Available formats: {available}")),
            },
            source => {
                let help_text = match &source {
                    ConvertError::Decode { path: at, .. } if at != "." => {
                        Some(format!("The problem is at `{at}` in the input document"))
                    }
                    _ => None,
                };
                Self::ConversionFailed {
                    path: path.into(),
                    source,
                    help_text,
                }
            }
        }
    }

    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileError {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub fn tracing_error(
        source: impl std::error::Error + Send + Sync + 'static,
        config_used: impl Into<String>,
    ) -> Self {
        Self::TracingError {
            source: Box::new(source),
            config_used: config_used.into(),
        }
    }
}

/// Process exit code for an error
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::ConversionFailed { .. } => EXIT_CONVERT,
        CliError::InvalidArgument { .. }
        | CliError::FileError { .. }
        | CliError::TracingError { .. } => EXIT_CLI,
    }
}

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_becomes_invalid_argument() {
        let err = CliError::conversion_failed(
            "in.yml",
            ConvertError::UnknownFormat {
                format: "gitlab".to_string(),
                available: "bitbucket, circle".to_string(),
            },
        );
        let CliError::InvalidArgument { argument, help_text } = &err else {
            panic!("expected invalid argument");
        };
        assert_eq!(argument, "--from gitlab");
        assert_eq!(help_text.as_deref(), Some("Available formats: bitbucket, circle"));
        assert_eq!(exit_code_for(&err), EXIT_CLI);
    }

    #[test]
    fn test_decode_failure_points_at_path() {
        let err = CliError::conversion_failed(
            "bitbucket-pipelines.yml",
            ConvertError::Decode {
                format: "bitbucket",
                path: "options.size".to_string(),
                message: "unknown variant `3x`".to_string(),
            },
        );
        assert_eq!(exit_code_for(&err), EXIT_CONVERT);
        assert!(err.to_string().contains("bitbucket-pipelines.yml"));
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("options.size"));
    }

    #[test]
    fn test_file_error_display() {
        let err = CliError::file_error(
            "read",
            "missing.yml",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.to_string(), "File operation failed: read missing.yml");
        assert_eq!(exit_code_for(&err), EXIT_CLI);
    }
}
