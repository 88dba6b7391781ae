//! Restore cache scanner.
//!
//! After `dotnet restore --packages <dir>` the cache holds one directory per
//! package and version:
//!
//! ```text
//! {cache}/{name}/{version}/{name}.{version}.nupkg.sha512
//! ```
//!
//! Each `.nupkg.sha512` sidecar holds the base64 SHA-512 of the package the
//! restore downloaded. The scanner turns every sidecar into a source entry
//! pointing at the registry's flat container.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};

use crate::digest::{DigestError, Sha512Digest};
use crate::package::PackageCoordinate;
use crate::registry::RegistryEndpoints;
use crate::source::SourceEntry;

/// Filename suffix of NuGet digest sidecars.
pub const SIDECAR_SUFFIX: &str = ".nupkg.sha512";

/// Errors arising from scanning a restore cache.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The cache path could not be turned into a glob pattern.
    #[error("invalid package cache pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A directory or sidecar could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A cache path is not valid UTF-8.
    #[error("package cache path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// A sidecar sits outside the `{name}/{version}/` layout.
    #[error("sidecar {path} is not inside a package/version directory")]
    UnexpectedLayout {
        /// The misplaced sidecar.
        path: Utf8PathBuf,
    },

    /// A sidecar does not hold a valid SHA-512 digest.
    #[error("corrupt digest in {path}: {source}")]
    InvalidDigest {
        /// The corrupt sidecar.
        path: Utf8PathBuf,
        /// The underlying decoding failure.
        #[source]
        source: DigestError,
    },
}

/// Scan `cache` for sidecars and build one source entry per package.
///
/// Entries are returned in no particular order. Any unreadable or corrupt
/// sidecar aborts the scan: skipping it would silently drop a package the
/// offline build needs.
///
/// # Errors
///
/// Returns a [`ScanError`] if the cache cannot be walked or a sidecar is
/// misplaced, unreadable, or corrupt.
pub fn scan_package_cache(
    cache: &Utf8Path,
    endpoints: &RegistryEndpoints,
    dest: &str,
) -> Result<Vec<SourceEntry>, ScanError> {
    let pattern = format!(
        "{}/**/*{SIDECAR_SUFFIX}",
        glob::Pattern::escape(cache.as_str())
    );
    trace!("scanning {pattern}");

    let mut entries = Vec::new();
    for found in glob::glob(&pattern)? {
        let path = found.map_err(|e| ScanError::Read {
            path: e.path().display().to_string(),
            source: e.into_error(),
        })?;
        let path = Utf8PathBuf::try_from(path).map_err(|e| ScanError::NonUtf8Path {
            path: e.as_path().display().to_string(),
        })?;
        if !path.is_file() {
            continue;
        }
        entries.push(entry_for_sidecar(cache, &path, endpoints, dest)?);
    }

    debug!("found {} packages in {cache}", entries.len());
    Ok(entries)
}

/// Derive the package coordinate from a sidecar's location.
///
/// The version is the parent directory name and the package id is the
/// grandparent directory name. Returns `None` when the sidecar is not at
/// least two directories below `cache`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use nuget_sources_generator::scanner::coordinate_for_sidecar;
///
/// let coordinate = coordinate_for_sidecar(
///     Utf8Path::new("/cache"),
///     Utf8Path::new("/cache/foo/1.2.3/foo.1.2.3.nupkg.sha512"),
/// )
/// .expect("valid layout");
/// assert_eq!(coordinate.filename(), "foo.1.2.3.nupkg");
/// ```
#[must_use]
pub fn coordinate_for_sidecar(cache: &Utf8Path, sidecar: &Utf8Path) -> Option<PackageCoordinate> {
    let relative = sidecar.strip_prefix(cache).ok()?;
    if relative.components().count() < 3 {
        return None;
    }
    let version_dir = relative.parent()?;
    let version = version_dir.file_name()?;
    let name = version_dir.parent()?.file_name()?;
    Some(PackageCoordinate::new(name, version))
}

fn entry_for_sidecar(
    cache: &Utf8Path,
    sidecar: &Utf8Path,
    endpoints: &RegistryEndpoints,
    dest: &str,
) -> Result<SourceEntry, ScanError> {
    let coordinate =
        coordinate_for_sidecar(cache, sidecar).ok_or_else(|| ScanError::UnexpectedLayout {
            path: sidecar.to_owned(),
        })?;
    let contents = std::fs::read_to_string(sidecar).map_err(|source| ScanError::Read {
        path: sidecar.to_string(),
        source,
    })?;
    let sha512 = Sha512Digest::from_base64(&contents).map_err(|source| ScanError::InvalidDigest {
        path: sidecar.to_owned(),
        source,
    })?;
    Ok(SourceEntry::for_package(endpoints, &coordinate, sha512, dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{encode_digest, write_sidecar};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Cache {
        _temp: TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn cache() -> Cache {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("non-UTF8 path");
        Cache { _temp: temp, root }
    }

    fn filenames(entries: &[SourceEntry]) -> Vec<&str> {
        let mut names: Vec<&str> = entries.iter().map(SourceEntry::dest_filename).collect();
        names.sort_unstable();
        names
    }

    #[rstest]
    fn finds_every_sidecar(cache: Cache) {
        write_sidecar(&cache.root, "foo", "1.2.3", &encode_digest(&[1; 64])).expect("write");
        write_sidecar(&cache.root, "bar", "0.9.0", &encode_digest(&[2; 64])).expect("write");

        let entries =
            scan_package_cache(&cache.root, &RegistryEndpoints::default(), "nuget-sources")
                .expect("scan succeeds");

        assert_eq!(filenames(&entries), vec!["bar.0.9.0.nupkg", "foo.1.2.3.nupkg"]);
        assert!(entries.iter().all(|entry| entry.dest() == "nuget-sources"));
        let foo = entries
            .iter()
            .find(|entry| entry.dest_filename() == "foo.1.2.3.nupkg")
            .expect("foo entry");
        assert_eq!(
            foo.url(),
            "https://api.nuget.org/v3-flatcontainer/foo/1.2.3/foo.1.2.3.nupkg"
        );
        assert_eq!(foo.sha512().as_str(), "01".repeat(64));
    }

    #[rstest]
    fn ignores_unrelated_files(cache: Cache) {
        write_sidecar(&cache.root, "foo", "1.2.3", &encode_digest(&[1; 64])).expect("write");
        let version_dir = cache.root.join("foo").join("1.2.3");
        std::fs::write(version_dir.join("foo.1.2.3.nupkg"), b"zip").expect("write");
        std::fs::write(version_dir.join("foo.nuspec"), b"<xml/>").expect("write");
        std::fs::write(version_dir.join(".nupkg.metadata"), b"{}").expect("write");

        let entries = scan_package_cache(&cache.root, &RegistryEndpoints::default(), "out")
            .expect("scan succeeds");
        assert_eq!(filenames(&entries), vec!["foo.1.2.3.nupkg"]);
    }

    #[rstest]
    fn empty_cache_yields_no_entries(cache: Cache) {
        let entries = scan_package_cache(&cache.root, &RegistryEndpoints::default(), "out")
            .expect("scan succeeds");
        assert!(entries.is_empty());
    }

    #[rstest]
    fn corrupt_sidecar_aborts_scan(cache: Cache) {
        write_sidecar(&cache.root, "foo", "1.2.3", &encode_digest(&[1; 64])).expect("write");
        write_sidecar(&cache.root, "bad", "1.0.0", &encode_digest(&[0; 10])).expect("write");

        let err = scan_package_cache(&cache.root, &RegistryEndpoints::default(), "out")
            .expect_err("corrupt sidecar");
        match err {
            ScanError::InvalidDigest { path, source } => {
                assert!(path.as_str().ends_with("bad.1.0.0.nupkg.sha512"));
                assert_eq!(source, DigestError::InvalidLength { actual: 10 });
            }
            other => panic!("expected InvalidDigest, got {other:?}"),
        }
    }

    #[rstest]
    fn sidecar_at_cache_root_is_rejected(cache: Cache) {
        std::fs::write(cache.root.join("stray.nupkg.sha512"), encode_digest(&[1; 64]))
            .expect("write");

        let err = scan_package_cache(&cache.root, &RegistryEndpoints::default(), "out")
            .expect_err("misplaced sidecar");
        assert!(matches!(err, ScanError::UnexpectedLayout { .. }));
    }

    #[rstest]
    #[case::standard("/c/foo/1.2.3/foo.1.2.3.nupkg.sha512", Some(("foo", "1.2.3")))]
    #[case::mixed_case("/c/Foo.Bar/2.0.0-Beta/x.nupkg.sha512", Some(("foo.bar", "2.0.0-beta")))]
    #[case::too_shallow("/c/1.2.3/foo.nupkg.sha512", None)]
    #[case::outside_cache("/elsewhere/foo/1.2.3/foo.1.2.3.nupkg.sha512", None)]
    fn derives_coordinate_from_directories(
        #[case] sidecar: &str,
        #[case] expected: Option<(&str, &str)>,
    ) {
        let coordinate = coordinate_for_sidecar(Utf8Path::new("/c"), Utf8Path::new(sidecar));
        assert_eq!(
            coordinate,
            expected.map(|(name, version)| PackageCoordinate::new(name, version))
        );
    }
}
