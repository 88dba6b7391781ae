//! Shared test utilities for the generator crate.

use crate::registry::{RegistryClient, RegistryEndpoints, RegistryError};
use crate::package::RUNTIME_PACKS;
use crate::restore::{CommandExecutor, RestoreError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::Utf8Path;
use std::cell::RefCell;
use std::collections::HashMap;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Base64-encode raw digest bytes the way NuGet writes them.
pub fn encode_digest(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Writes `<root>/<name>/<version>/<name>.<version>.nupkg.sha512`.
///
/// # Errors
///
/// Returns any I/O error from creating the directories or the file.
pub fn write_sidecar(
    root: &Utf8Path,
    name: &str,
    version: &str,
    contents: &str,
) -> std::io::Result<()> {
    let dir = root.join(name).join(version);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(format!("{name}.{version}.nupkg.sha512")), contents)
}

/// Builds a registration index with one inlined page whose last leaf points
/// at `catalog_url`.
pub fn registration_index_json(catalog_url: &str) -> String {
    serde_json::json!({
        "count": 1,
        "items": [{
            "@id": "https://registry.test/page/0.json",
            "items": [
                { "catalogEntry": { "@id": "https://registry.test/catalog/older.json" } },
                { "catalogEntry": { "@id": catalog_url } }
            ]
        }]
    })
    .to_string()
}

/// Builds a catalog entry document with a SHA-512 package hash.
pub fn catalog_entry_json(version: &str, package_hash: &str) -> String {
    serde_json::json!({
        "version": version,
        "packageHash": package_hash,
        "packageHashAlgorithm": "SHA512"
    })
    .to_string()
}

/// A [`RegistryClient`] serving canned documents keyed by URL.
///
/// Unknown URLs answer with [`RegistryError::NotFound`].
#[derive(Debug, Default)]
pub struct StubRegistry {
    documents: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl StubRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that resolves every runtime pack to `version`
    /// with the given base64 package hash.
    pub fn with_runtime_packs(endpoints: &RegistryEndpoints, version: &str, hash: &str) -> Self {
        let mut registry = Self::new();
        for pack in RUNTIME_PACKS {
            let id = pack.package_id();
            let catalog_url = format!("https://registry.test/catalog/{id}.{version}.json");
            registry.insert(
                endpoints.registration_index_url(&id),
                registration_index_json(&catalog_url),
            );
            registry.insert(catalog_url, catalog_entry_json(version, hash));
        }
        registry
    }

    /// Serves `body` for `url`.
    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.documents.insert(url.into(), body.into());
    }

    /// Returns every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl RegistryClient for StubRegistry {
    fn fetch_document(&self, url: &str) -> Result<String, RegistryError> {
        self.requests.borrow_mut().push(url.to_owned());
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                url: url.to_owned(),
            })
    }
}

/// A package the [`StubExecutor`] drops into the restore cache.
#[derive(Debug, Clone)]
pub struct CachedPackage {
    /// Package directory name.
    pub name: String,
    /// Version directory name.
    pub version: String,
    /// Raw sidecar contents.
    pub sidecar: String,
}

impl CachedPackage {
    /// Creates a cached package whose sidecar encodes `digest`.
    pub fn new(name: &str, version: &str, digest: &[u8]) -> Self {
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
            sidecar: encode_digest(digest),
        }
    }
}

/// A stub [`CommandExecutor`] standing in for `flatpak run ... dotnet restore`.
///
/// Records every invocation. On a successful run it writes the scripted
/// packages into the directory passed after `--packages`, mimicking the
/// side effect of a real restore.
#[derive(Debug)]
pub struct StubExecutor {
    packages: Vec<CachedPackage>,
    failure: Option<String>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl StubExecutor {
    /// Creates an executor whose restore succeeds and populates `packages`.
    pub fn succeeding(packages: Vec<CachedPackage>) -> Self {
        Self {
            packages,
            failure: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Creates an executor whose restore exits non-zero with `stderr`.
    pub fn failing(stderr: &str) -> Self {
        Self {
            packages: Vec::new(),
            failure: Some(stderr.to_owned()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Returns every recorded invocation as `[cmd, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    fn populate(&self, args: &[&str]) -> std::io::Result<()> {
        let Some(root) = args
            .iter()
            .position(|arg| *arg == "--packages")
            .and_then(|index| args.get(index + 1))
        else {
            return Ok(());
        };
        for package in &self.packages {
            write_sidecar(
                Utf8Path::new(root),
                &package.name,
                &package.version,
                &package.sidecar,
            )?;
        }
        Ok(())
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output, RestoreError> {
        let mut call = vec![cmd.to_owned()];
        call.extend(args.iter().map(|arg| (*arg).to_owned()));
        self.calls.borrow_mut().push(call);

        if let Some(stderr) = &self.failure {
            return Ok(failure_output(stderr));
        }
        self.populate(args).map_err(|source| RestoreError::Spawn {
            command: cmd.to_owned(),
            source,
        })?;
        Ok(success_output())
    }
}
