//! CLI argument definitions for the sources generator.
//!
//! This module defines the command-line interface using clap and converts
//! parsed arguments into a [`GeneratorConfig`]. It is separated from the
//! main entrypoint to keep the binary small and focused on orchestration.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::time::Duration;

use crate::pipeline::GeneratorConfig;
use crate::registry::{DEFAULT_REGISTRY, RegistryEndpoints};
use crate::restore::{DEFAULT_DOTNET, DEFAULT_FREEDESKTOP, FlatpakSdk};

/// Default destination directory recorded in the sources file.
pub const DEFAULT_DESTDIR: &str = "nuget-sources";

/// Generate a flatpak-builder sources file for a .NET project.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "flatpak-dotnet-generator")]
#[command(version, about)]
#[command(long_about = concat!(
    "Generate a flatpak-builder sources file for a .NET project.\n\n",
    "The project is restored inside the Flatpak .NET SDK with network access, ",
    "into a temporary package cache. Every restored package, plus the latest ",
    "Microsoft.NETCore.App and Microsoft.AspNetCore.App runtime packs for ",
    "x64, arm and arm64, is written to OUTPUT as a list of file sources so the ",
    "application can be built offline.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Generate sources for a project:\n",
    "    $ flatpak-dotnet-generator nuget-sources.json src/App/App.csproj\n\n",
    "  Restore for a specific runtime:\n",
    "    $ flatpak-dotnet-generator -r linux-arm64 nuget-sources.json App.csproj\n\n",
    "  Use the .NET 8 extension on the 23.08 runtime:\n",
    "    $ flatpak-dotnet-generator --freedesktop 23.08 --dotnet 8 sources.json App.csproj",
))]
pub struct Cli {
    /// The sources file to write.
    #[arg(value_name = "OUTPUT")]
    pub output: Utf8PathBuf,

    /// The project or solution file to restore.
    #[arg(value_name = "PROJECT")]
    pub project: Utf8PathBuf,

    /// Runtime identifier forwarded to `dotnet restore`.
    #[arg(short, long, value_name = "RID")]
    pub runtime: Option<String>,

    /// Destination directory for restored packages.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DESTDIR)]
    pub destdir: String,

    /// Destination directory for runtime packs [default: same as --destdir].
    #[arg(long, value_name = "DIR")]
    pub runtime_destdir: Option<String>,

    /// Base URL of the NuGet registry.
    #[arg(long, value_name = "URL", default_value = DEFAULT_REGISTRY)]
    pub registry: String,

    /// Freedesktop SDK branch to restore with.
    #[arg(long, value_name = "VERSION", default_value = DEFAULT_FREEDESKTOP)]
    pub freedesktop: String,

    /// .NET SDK extension major version to restore with.
    #[arg(long, value_name = "MAJOR", default_value = DEFAULT_DOTNET)]
    pub dotnet: String,

    /// Abort the restore after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub restore_timeout: Option<u64>,

    /// Do not add runtime packs from the registry.
    #[arg(long)]
    pub no_runtime_packs: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Build the generator configuration.
    ///
    /// Relative `output` and `project` paths are resolved against `cwd`,
    /// which also hosts the temporary package cache.
    ///
    /// # Example
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use clap::Parser;
    /// use nuget_sources_generator::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["flatpak-dotnet-generator", "out.json", "App.csproj"]);
    /// let config = cli.generator_config(Utf8Path::new("/work"));
    /// assert_eq!(config.project.as_str(), "/work/App.csproj");
    /// assert_eq!(config.runtime_destdir, "nuget-sources");
    /// ```
    #[must_use]
    pub fn generator_config(&self, cwd: &Utf8Path) -> GeneratorConfig {
        GeneratorConfig {
            output: cwd.join(&self.output),
            project: cwd.join(&self.project),
            runtime: self.runtime.clone(),
            destdir: self.destdir.clone(),
            runtime_destdir: self
                .runtime_destdir
                .clone()
                .unwrap_or_else(|| self.destdir.clone()),
            registry: RegistryEndpoints::new(&self.registry),
            sdk: FlatpakSdk {
                freedesktop: self.freedesktop.clone(),
                dotnet: self.dotnet.clone(),
            },
            include_runtime_packs: !self.no_runtime_packs,
            quiet: self.quiet,
            scratch_dir: cwd.to_owned(),
        }
    }

    /// Return the restore timeout, if one was requested.
    #[must_use]
    pub fn restore_timeout(&self) -> Option<Duration> {
        self.restore_timeout.map(Duration::from_secs)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
