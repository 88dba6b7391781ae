//! Package restore inside the Flatpak .NET SDK.
//!
//! The restore step is delegated to `dotnet restore`, run through
//! `flatpak run` against the freedesktop SDK with the .NET SDK extension
//! mounted. Network access is granted only for this one command, and the
//! packages are written to a caller-provided, throwaway directory.

use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;

use camino::Utf8Path;
use log::debug;
use wait_timeout::ChildExt;

/// Default freedesktop SDK branch.
pub const DEFAULT_FREEDESKTOP: &str = "22.08";

/// Default .NET SDK extension major version.
pub const DEFAULT_DOTNET: &str = "7";

/// Errors arising from the external restore step.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// The command could not be started or its output collected.
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// The program that failed to start.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The restore exited unsuccessfully.
    #[error("dotnet restore exited with {status}{}", format_stderr(.stderr))]
    Failed {
        /// The exit status as reported by the OS.
        status: String,
        /// Captured standard error, if any.
        stderr: String,
    },

    /// The restore did not finish within the configured timeout.
    #[error("dotnet restore timed out after {seconds} seconds")]
    TimedOut {
        /// The timeout that elapsed.
        seconds: u64,
    },
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or does not finish
    /// in time. A non-zero exit is reported through the returned
    /// [`Output`], not as an error.
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output, RestoreError>;
}

/// Executes commands on the host system.
///
/// Child stdout is forwarded to our stderr so restore progress is visible
/// without polluting stdout; child stderr is captured for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor {
    timeout: Option<Duration>,
}

impl SystemCommandExecutor {
    /// Creates an executor that waits at most `timeout` for each command,
    /// or indefinitely when `None`.
    #[must_use]
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output, RestoreError> {
        let spawn_error = |source| RestoreError::Spawn {
            command: cmd.to_owned(),
            source,
        };

        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(std::io::stderr()))
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Drain stderr while waiting; a full pipe would stall the child.
        let stderr_reader = child
            .stderr
            .take()
            .map(|pipe| std::thread::spawn(move || std::io::read_to_string(pipe)));

        let waited = match self.timeout {
            None => child.wait().map(Some),
            Some(timeout) => child.wait_timeout(timeout),
        };
        let status = match waited {
            Ok(Some(status)) => status,
            Ok(None) => {
                reap(&mut child);
                return Err(RestoreError::TimedOut {
                    seconds: self.timeout.map_or(0, |timeout| timeout.as_secs()),
                });
            }
            Err(source) => {
                reap(&mut child);
                return Err(spawn_error(source));
            }
        };

        let stderr = match stderr_reader {
            Some(handle) => handle
                .join()
                .map_err(|_| spawn_error(std::io::Error::other("stderr reader panicked")))?
                .map_err(spawn_error)?,
            None => String::new(),
        };

        Ok(Output {
            status,
            stdout: Vec::new(),
            stderr: stderr.into_bytes(),
        })
    }
}

/// Kill and wait for a child that is being abandoned.
///
/// Errors are ignored; the caller is already reporting a failure. Once the
/// child is gone its stderr pipe closes, so the reader thread finishes on
/// its own.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// The Flatpak SDK used to run the restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatpakSdk {
    /// The freedesktop SDK branch, e.g. `22.08`.
    pub freedesktop: String,
    /// The .NET SDK extension major version, e.g. `7`.
    pub dotnet: String,
}

impl FlatpakSdk {
    /// Return the `--runtime=` value, `org.freedesktop.Sdk//<branch>`.
    #[must_use]
    pub fn runtime_ref(&self) -> String {
        format!("org.freedesktop.Sdk//{}", self.freedesktop)
    }

    /// Return the .NET SDK extension ref, e.g.
    /// `org.freedesktop.Sdk.Extension.dotnet7//22.08`.
    #[must_use]
    pub fn extension_ref(&self) -> String {
        format!(
            "org.freedesktop.Sdk.Extension.dotnet{}//{}",
            self.dotnet, self.freedesktop
        )
    }

    /// Return the in-sandbox shell script that puts the extension on
    /// `PATH` and execs `dotnet restore` with the forwarded arguments.
    #[must_use]
    pub fn restore_script(&self) -> String {
        let sdk = format!("/usr/lib/sdk/dotnet{}", self.dotnet);
        format!(
            "PATH=\"${{PATH}}:{sdk}/bin\" LD_LIBRARY_PATH=\"$LD_LIBRARY_PATH:{sdk}/lib\" exec dotnet restore \"$@\""
        )
    }
}

impl Default for FlatpakSdk {
    fn default() -> Self {
        Self {
            freedesktop: DEFAULT_FREEDESKTOP.to_owned(),
            dotnet: DEFAULT_DOTNET.to_owned(),
        }
    }
}

/// One restore invocation.
#[derive(Debug, Clone, Copy)]
pub struct RestoreRequest<'a> {
    /// The project or solution file to restore.
    pub project: &'a Utf8Path,
    /// Optional runtime identifier forwarded as `-r`.
    pub runtime: Option<&'a str>,
    /// Isolated directory that receives the restored packages.
    pub packages_dir: &'a Utf8Path,
    /// The SDK to restore with.
    pub sdk: &'a FlatpakSdk,
}

/// Build the `flatpak` argument list for a restore request.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use nuget_sources_generator::restore::{FlatpakSdk, RestoreRequest, restore_arguments};
///
/// let sdk = FlatpakSdk::default();
/// let request = RestoreRequest {
///     project: Utf8Path::new("App.csproj"),
///     runtime: Some("linux-x64"),
///     packages_dir: Utf8Path::new("/work/.nuget-restore"),
///     sdk: &sdk,
/// };
/// let args = restore_arguments(&request);
/// assert_eq!(args.first().map(String::as_str), Some("run"));
/// assert!(args.ends_with(&["App.csproj".to_owned(), "-r".to_owned(), "linux-x64".to_owned()]));
/// ```
#[must_use]
pub fn restore_arguments(request: &RestoreRequest<'_>) -> Vec<String> {
    let mut args = vec![
        "run".to_owned(),
        "--env=DOTNET_CLI_TELEMETRY_OPTOUT=true".to_owned(),
        "--env=DOTNET_SKIP_FIRST_TIME_EXPERIENCE=true".to_owned(),
        "--command=sh".to_owned(),
        format!("--runtime={}", request.sdk.runtime_ref()),
        "--share=network".to_owned(),
        "--filesystem=host".to_owned(),
        request.sdk.extension_ref(),
        "-c".to_owned(),
        request.sdk.restore_script(),
        "--".to_owned(),
        "--packages".to_owned(),
        request.packages_dir.to_string(),
        request.project.to_string(),
    ];
    if let Some(runtime) = request.runtime {
        args.push("-r".to_owned());
        args.push(runtime.to_owned());
    }
    args
}

/// Run `dotnet restore` for the request and wait for it to finish.
///
/// # Errors
///
/// Returns [`RestoreError::Failed`] if the restore exits non-zero, so the
/// caller never scans a partially populated cache, or any error reported by
/// the executor.
pub fn run_restore(
    executor: &dyn CommandExecutor,
    request: &RestoreRequest<'_>,
) -> Result<(), RestoreError> {
    let args = restore_arguments(request);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    debug!("running flatpak {}", args.join(" "));

    let output = executor.run("flatpak", &arg_refs)?;
    if !output.status.success() {
        return Err(RestoreError::Failed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    Ok(())
}
