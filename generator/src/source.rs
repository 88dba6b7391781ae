//! Flatpak source entries.
//!
//! A [`SourceEntry`] is one element of the generated sources file. The
//! field names are fixed by `flatpak-builder`'s `file` source type and
//! must not change.

use crate::digest::Sha512Digest;
use crate::package::PackageCoordinate;
use crate::registry::RegistryEndpoints;
use serde::{Deserialize, Serialize};

/// The Flatpak source type tag. Only plain file downloads are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A single file fetched from `url` and checked against `sha512`.
    #[default]
    File,
}

/// One download instruction in the sources manifest.
///
/// Serialises as:
///
/// ```json
/// {
///     "type": "file",
///     "url": "https://api.nuget.org/v3-flatcontainer/foo/1.2.3/foo.1.2.3.nupkg",
///     "sha512": "...",
///     "dest": "nuget-sources",
///     "dest-filename": "foo.1.2.3.nupkg"
/// }
/// ```
///
/// # Examples
///
/// ```
/// use nuget_sources_generator::digest::Sha512Digest;
/// use nuget_sources_generator::package::PackageCoordinate;
/// use nuget_sources_generator::registry::RegistryEndpoints;
/// use nuget_sources_generator::source::SourceEntry;
///
/// let entry = SourceEntry::for_package(
///     &RegistryEndpoints::default(),
///     &PackageCoordinate::new("foo", "1.2.3"),
///     Sha512Digest::from_bytes(&[0; 64]).expect("valid digest"),
///     "nuget-sources",
/// );
/// assert_eq!(entry.dest_filename(), "foo.1.2.3.nupkg");
/// assert!(entry.url().ends_with("/foo/1.2.3/foo.1.2.3.nupkg"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(rename = "type")]
    kind: SourceKind,
    url: String,
    sha512: Sha512Digest,
    dest: String,
    #[serde(rename = "dest-filename")]
    dest_filename: String,
}

impl SourceEntry {
    /// Build the entry for a package so that its URL and destination
    /// filename come from the same coordinate.
    #[must_use]
    pub fn for_package(
        endpoints: &RegistryEndpoints,
        coordinate: &PackageCoordinate,
        sha512: Sha512Digest,
        dest: impl Into<String>,
    ) -> Self {
        Self {
            kind: SourceKind::File,
            url: endpoints.package_url(coordinate),
            sha512,
            dest: dest.into(),
            dest_filename: coordinate.filename(),
        }
    }

    /// Return the source type tag.
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Return the download URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Return the expected SHA-512 digest.
    #[must_use]
    pub fn sha512(&self) -> &Sha512Digest {
        &self.sha512
    }

    /// Return the destination directory, relative to the build directory.
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Return the destination filename.
    #[must_use]
    pub fn dest_filename(&self) -> &str {
        &self.dest_filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> SourceEntry {
        SourceEntry::for_package(
            &RegistryEndpoints::default(),
            &PackageCoordinate::new("Foo", "1.2.3"),
            Sha512Digest::from_bytes(&[0xaa; 64]).expect("valid digest"),
            "nuget-sources",
        )
    }

    #[test]
    fn url_and_filename_agree() {
        let entry = entry();
        assert_eq!(
            entry.url(),
            "https://api.nuget.org/v3-flatcontainer/foo/1.2.3/foo.1.2.3.nupkg"
        );
        assert!(entry.url().ends_with(entry.dest_filename()));
    }

    #[test]
    fn serialises_with_flatpak_field_names() {
        let value = serde_json::to_value(entry()).expect("serialise");
        let object = value.as_object().expect("object");
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 5);
        assert_eq!(object["type"], "file");
        assert_eq!(object["dest"], "nuget-sources");
        assert_eq!(object["dest-filename"], "foo.1.2.3.nupkg");
        assert_eq!(object["sha512"], "aa".repeat(64));
    }

    #[test]
    fn deserialises_generated_entries() {
        let json = serde_json::to_string(&entry()).expect("serialise");
        let parsed: SourceEntry = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(parsed, entry());
        assert_eq!(parsed.kind(), SourceKind::File);
    }
}
