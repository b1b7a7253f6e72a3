//! pipeshift CLI Application
//!
//! Converts CI pipeline definitions (currently Bitbucket Pipelines) into
//! Harness CI documents.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod errors;
mod tracing;

use crate::cli::{Cli, parse};
use crate::errors::{CliResult, EXIT_OK, exit_code_for};
use crate::tracing::{TracingConfig, correlation_id};

fn main() {
    // NOTE: eprintln! in the panic hook is intentional; the subscriber may
    // be unusable during a panic.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with --level debug for more information.");
    }));

    let code = match run(parse()) {
        Ok(()) => EXIT_OK,
        Err(error) => {
            let code = exit_code_for(&error);
            eprintln!("{:?}", miette::Report::new(error));
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> CliResult<()> {
    crate::tracing::init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        ..TracingConfig::default()
    })?;

    let span = ::tracing::info_span!(
        "command",
        command = cli.command.name(),
        correlation_id = %correlation_id(),
    );
    let _guard = span.enter();

    commands::execute(cli.command)
}
