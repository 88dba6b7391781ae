//! Sources generator CLI entrypoint.
//!
//! This binary restores a .NET project inside the Flatpak SDK and writes a
//! flatpak-builder sources file listing every package the offline build
//! needs.

use camino::Utf8PathBuf;
use clap::Parser;
use nuget_sources_generator::cli::Cli;
use nuget_sources_generator::error::{GeneratorError, Result};
use nuget_sources_generator::output::write_stderr_line;
use nuget_sources_generator::pipeline::{Collaborators, run};
use nuget_sources_generator::registry::HttpRegistryClient;
use nuget_sources_generator::restore::SystemCommandExecutor;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run_cli(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run_cli(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let cwd = current_dir()?;
    let config = cli.generator_config(&cwd);

    let registry = HttpRegistryClient;
    let executor = SystemCommandExecutor::with_timeout(cli.restore_timeout());
    let collaborators = Collaborators {
        registry: &registry,
        executor: &executor,
    };

    run(&config, &collaborators, stderr)?;
    Ok(())
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::try_from(cwd).map_err(|e| GeneratorError::InvalidPath {
        path: Utf8PathBuf::from(e.as_path().to_string_lossy().into_owned()),
        reason: "current directory is not valid UTF-8".to_owned(),
    })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
