//! Error types for the sources generator.
//!
//! Each pipeline stage reports its own error enum; this module wraps them in
//! a single [`GeneratorError`] so the CLI can print one message and exit
//! non-zero.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::manifest::ManifestError;
use crate::registry::RegistryError;
use crate::restore::RestoreError;
use crate::scanner::ScanError;

/// Errors that can occur while generating a sources file.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Runtime pack discovery against the registry failed.
    #[error("runtime pack discovery failed: {0}")]
    Registry(#[from] RegistryError),

    /// The package restore failed.
    #[error("package restore failed: {0}")]
    Restore(#[from] RestoreError),

    /// The restore cache could not be scanned.
    #[error("package cache scan failed: {0}")]
    Scan(#[from] ScanError),

    /// The manifest could not be assembled or written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required path is unusable.
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The offending path.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },
}

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::registry(
        GeneratorError::from(RegistryError::NotFound { url: "https://registry.test/x".to_owned() }),
        "runtime pack discovery failed: "
    )]
    #[case::restore(
        GeneratorError::from(RestoreError::TimedOut { seconds: 30 }),
        "package restore failed: dotnet restore timed out after 30 seconds"
    )]
    #[case::scan(
        GeneratorError::from(ScanError::UnexpectedLayout {
            path: Utf8PathBuf::from("/c/x.nupkg.sha512"),
        }),
        "package cache scan failed: sidecar /c/x.nupkg.sha512"
    )]
    #[case::invalid_path(
        GeneratorError::InvalidPath {
            path: Utf8PathBuf::from("out/sources.json"),
            reason: "no such directory".to_owned(),
        },
        "invalid path out/sources.json: no such directory"
    )]
    fn messages_name_the_failing_stage(#[case] err: GeneratorError, #[case] prefix: &str) {
        let message = err.to_string();
        assert!(
            message.starts_with(prefix),
            "expected {message:?} to start with {prefix:?}"
        );
    }

    #[test]
    fn manifest_errors_are_transparent() {
        let err = GeneratorError::from(ManifestError::DestinationConflict {
            dest: "nuget-sources".to_owned(),
            filename: "foo.1.0.0.nupkg".to_owned(),
            first: "a".to_owned(),
            second: "b".to_owned(),
        });
        assert_eq!(
            err.to_string(),
            "conflicting sources for nuget-sources/foo.1.0.0.nupkg: a and b"
        );
    }

    #[test]
    fn io_error_converts() {
        let err: GeneratorError = std::io::Error::other("disk full").into();
        assert!(matches!(err, GeneratorError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: disk full");
    }
}
