//! Sources generation pipeline.
//!
//! Coordinates the two discovery strategies and the manifest writer:
//!
//! 1. resolve the latest runtime packs from the registry;
//! 2. restore the project into a throwaway package cache and scan it;
//! 3. merge, sort, and write the sources file.
//!
//! The output file is not opened until the manifest has been fully
//! assembled, so a failure in discovery, restore, scan, or assembly leaves
//! any existing sources file as it was.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::io::Write;

use crate::error::{GeneratorError, Result};
use crate::manifest::Manifest;
use crate::output::{success_message, write_stderr_line};
use crate::package::RUNTIME_PACKS;
use crate::registry::{RegistryClient, RegistryEndpoints, discover_runtime_packs};
use crate::restore::{CommandExecutor, FlatpakSdk, RestoreRequest, run_restore};
use crate::scanner::scan_package_cache;
use crate::source::SourceEntry;

/// Prefix of the temporary package cache directory.
pub const RESTORE_DIR_PREFIX: &str = ".nuget-restore-";

/// Everything one generator run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Path of the sources file to write.
    pub output: Utf8PathBuf,
    /// Project or solution file to restore.
    pub project: Utf8PathBuf,
    /// Optional runtime identifier forwarded to the restore.
    pub runtime: Option<String>,
    /// Destination directory for packages found in the restore cache.
    pub destdir: String,
    /// Destination directory for runtime packs.
    pub runtime_destdir: String,
    /// Registry the packages are fetched from.
    pub registry: RegistryEndpoints,
    /// SDK used to run the restore.
    pub sdk: FlatpakSdk,
    /// Whether to resolve runtime packs from the registry.
    pub include_runtime_packs: bool,
    /// Suppress progress output.
    pub quiet: bool,
    /// Directory in which the temporary package cache is created.
    pub scratch_dir: Utf8PathBuf,
}

/// External collaborators used by a run.
pub struct Collaborators<'a> {
    /// Registry document fetcher.
    pub registry: &'a dyn RegistryClient,
    /// Runner for the restore command.
    pub executor: &'a dyn CommandExecutor,
}

/// Build the manifest without writing it.
///
/// # Errors
///
/// Returns an error if runtime pack discovery, the restore, the cache scan,
/// or manifest assembly fails.
pub fn generate_manifest(
    config: &GeneratorConfig,
    collaborators: &Collaborators<'_>,
    stderr: &mut dyn Write,
) -> Result<Manifest> {
    let runtime_entries = if config.include_runtime_packs {
        resolve_runtime_packs(config, collaborators.registry, stderr)?
    } else {
        debug!("runtime pack discovery disabled");
        Vec::new()
    };

    let cache_entries = restore_and_scan(config, collaborators.executor, stderr)?;

    Ok(Manifest::assemble([runtime_entries, cache_entries])?)
}

/// Build the manifest and write it to the configured output path.
///
/// # Errors
///
/// Returns an error if generation fails or the output cannot be written. A
/// generation failure leaves the output file as it was; a failure while
/// writing may leave it truncated.
pub fn run(
    config: &GeneratorConfig,
    collaborators: &Collaborators<'_>,
    stderr: &mut dyn Write,
) -> Result<Manifest> {
    let manifest = generate_manifest(config, collaborators, stderr)?;
    manifest.write_to(&config.output)?;

    if !config.quiet {
        write_stderr_line(stderr, success_message(manifest.len(), &config.output));
    }
    Ok(manifest)
}

fn resolve_runtime_packs(
    config: &GeneratorConfig,
    registry: &dyn RegistryClient,
    stderr: &mut dyn Write,
) -> Result<Vec<SourceEntry>> {
    if !config.quiet {
        write_stderr_line(
            stderr,
            format!(
                "Resolving {} runtime packs from {}...",
                RUNTIME_PACKS.len(),
                config.registry.base()
            ),
        );
    }

    let entries = discover_runtime_packs(
        registry,
        &config.registry,
        &RUNTIME_PACKS,
        &config.runtime_destdir,
    )?;

    if !config.quiet {
        for entry in &entries {
            write_stderr_line(stderr, format!("  - {}", entry.dest_filename()));
        }
    }
    Ok(entries)
}

fn restore_and_scan(
    config: &GeneratorConfig,
    executor: &dyn CommandExecutor,
    stderr: &mut dyn Write,
) -> Result<Vec<SourceEntry>> {
    // Removed on drop, whichever way this function returns.
    let cache_dir = tempfile::Builder::new()
        .prefix(RESTORE_DIR_PREFIX)
        .tempdir_in(&config.scratch_dir)?;
    let cache_path = utf8_path(cache_dir.path())?;
    debug!("restoring into {cache_path}");

    if !config.quiet {
        write_stderr_line(stderr, format!("Restoring {}...", config.project));
    }

    let request = RestoreRequest {
        project: &config.project,
        runtime: config.runtime.as_deref(),
        packages_dir: &cache_path,
        sdk: &config.sdk,
    };
    run_restore(executor, &request)?;

    let entries = scan_package_cache(&cache_path, &config.registry, &config.destdir)?;
    if !config.quiet {
        write_stderr_line(
            stderr,
            format!("Found {} packages in the restore cache", entries.len()),
        );
    }
    Ok(entries)
}

fn utf8_path(path: &std::path::Path) -> Result<Utf8PathBuf> {
    Utf8Path::from_path(path)
        .map(Utf8Path::to_owned)
        .ok_or_else(|| GeneratorError::InvalidPath {
            path: Utf8PathBuf::from(path.to_string_lossy().into_owned()),
            reason: "path is not valid UTF-8".to_owned(),
        })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
