//! cxxconf CLI: resolve a standard-library test-suite configuration.

mod commands;
mod site_config;

use std::process;

use clap::{Parser, Subcommand};
use cxxconf_core::{ErrorKind, Parameters, ResolveError};
use tracing_subscriber::EnvFilter;

use commands::resolve::Format;
use commands::ParamArgs;

#[derive(Parser)]
#[command(name = "cxxconf", version, about = "Resolve compiler flags and features for a C++ standard library test suite")]
struct Cli {
    /// Log probes and stage progress
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration and print the summary
    Resolve {
        #[command(flatten)]
        params: ParamArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the resolved feature set, one per line
    Features {
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Check the host and compiler
    Doctor {
        /// Compiler to inspect (default: cxx_under_test, else clang++)
        #[arg(long)]
        cxx: Option<String>,
        #[command(flatten)]
        params: ParamArgs,
    },
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug output.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 2 for configuration errors, 3 for toolchain failures, 1 otherwise.
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ResolveError>().map(ResolveError::kind) {
        Some(ErrorKind::Configuration) => 2,
        Some(ErrorKind::Toolchain) => 3,
        None => 1,
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(exit_code(&e));
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Resolve { params, format } => {
            let params = commands::build_parameters(&params, Parameters::from_process_env(), &cwd)?;
            commands::resolve::run(params, format)
        }
        Commands::Features { params } => {
            let params = commands::build_parameters(&params, Parameters::from_process_env(), &cwd)?;
            commands::features::run(params)
        }
        Commands::Doctor { cxx, params } => {
            let mut params = commands::build_parameters(&params, Parameters::from_process_env(), &cwd)?;
            if let Some(cxx) = cxx {
                params.set_param("cxx_under_test", cxx);
            }
            commands::doctor::run(&params, &cwd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_params() {
        let cli = Cli::try_parse_from([
            "cxxconf",
            "resolve",
            "--param",
            "std=c++17",
            "-p",
            "use_sanitizer=Address",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Resolve { params, format } = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(format, Format::Json);
        assert_eq!(params.params.len(), 2);
        assert_eq!(params.params[1], ("use_sanitizer".to_string(), "Address".to_string()));
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let config: anyhow::Error = ResolveError::unsupported("cxx_abi", "libfoo").into();
        assert_eq!(exit_code(&config), 2);
        let toolchain: anyhow::Error = ResolveError::CompilerNotFound { detail: "none".into() }.into();
        assert_eq!(exit_code(&toolchain), 3);
        let wrapped = Err::<(), _>(ResolveError::unsupported("std", "c++99"))
            .context("resolving")
            .unwrap_err();
        assert_eq!(exit_code(&wrapped), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
