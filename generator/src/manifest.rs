//! Sources manifest assembly and serialisation.
//!
//! The manifest merges the entries from every discovery strategy, sorts
//! them by destination filename, and writes them as a 4-space indented JSON
//! array. Identical entries found by more than one strategy collapse to
//! one; two different artefacts claiming the same destination are an error.

use std::cmp::Ordering;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::source::SourceEntry;

/// Indentation used by the sources file.
const INDENT: &[u8] = b"    ";

/// Errors arising from manifest assembly and output.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Two different artefacts would be written to the same path.
    #[error("conflicting sources for {dest}/{filename}: {first} and {second}")]
    DestinationConflict {
        /// Destination directory.
        dest: String,
        /// Destination filename.
        filename: String,
        /// URL of the first entry.
        first: String,
        /// URL of the second entry.
        second: String,
    },

    /// JSON serialisation failed.
    #[error("failed to serialise manifest: {0}")]
    Serialise(#[from] serde_json::Error),

    /// The output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The output path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A sorted, destination-unique list of source entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<SourceEntry>,
}

impl Manifest {
    /// Merge entry batches into a manifest.
    ///
    /// The result is sorted ascending by destination filename (byte order),
    /// with destination directory and URL as tie-breakers so the output does
    /// not depend on the order batches or entries arrive in.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DestinationConflict`] if two entries share a
    /// destination but differ in URL or digest.
    ///
    /// # Examples
    ///
    /// ```
    /// use nuget_sources_generator::digest::Sha512Digest;
    /// use nuget_sources_generator::manifest::Manifest;
    /// use nuget_sources_generator::package::PackageCoordinate;
    /// use nuget_sources_generator::registry::RegistryEndpoints;
    /// use nuget_sources_generator::source::SourceEntry;
    ///
    /// let endpoints = RegistryEndpoints::default();
    /// let entry = |name: &str| {
    ///     SourceEntry::for_package(
    ///         &endpoints,
    ///         &PackageCoordinate::new(name, "1.0.0"),
    ///         Sha512Digest::from_bytes(&[0; 64]).expect("valid digest"),
    ///         "nuget-sources",
    ///     )
    /// };
    /// let manifest = Manifest::assemble([vec![entry("zeta")], vec![entry("alpha")]])
    ///     .expect("no conflicts");
    /// assert_eq!(manifest.entries()[0].dest_filename(), "alpha.1.0.0.nupkg");
    /// ```
    pub fn assemble<I>(batches: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = Vec<SourceEntry>>,
    {
        let mut entries: Vec<SourceEntry> = batches.into_iter().flatten().collect();
        entries.sort_by(compare_entries);

        let before = entries.len();
        entries.dedup();
        if entries.len() != before {
            debug!("dropped {} duplicate sources", before - entries.len());
        }

        for pair in entries.windows(2) {
            if let [first, second] = pair {
                if first.dest() == second.dest() && first.dest_filename() == second.dest_filename()
                {
                    return Err(ManifestError::DestinationConflict {
                        dest: first.dest().to_owned(),
                        filename: first.dest_filename().to_owned(),
                        first: first.url().to_owned(),
                        second: second.url().to_owned(),
                    });
                }
            }
        }

        Ok(Self { entries })
    }

    /// Return the sorted entries.
    #[must_use]
    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    /// Return the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialise to a 4-space indented JSON array without a trailing
    /// newline.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Serialise`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, ManifestError> {
        let mut buffer = Vec::new();
        let mut serializer =
            Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(INDENT));
        self.entries.serialize(&mut serializer)?;
        // serde_json only ever emits UTF-8.
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the manifest to `path`, replacing any existing file.
    ///
    /// The file is truncated before writing, so a failed write can leave it
    /// empty or partial.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Write`] if the file cannot be written.
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), ManifestError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ManifestError::Write {
            path: path.to_owned(),
            source,
        })
    }
}

fn compare_entries(a: &SourceEntry, b: &SourceEntry) -> Ordering {
    a.dest_filename()
        .cmp(b.dest_filename())
        .then_with(|| a.dest().cmp(b.dest()))
        .then_with(|| a.url().cmp(b.url()))
        .then_with(|| a.sha512().cmp(b.sha512()))
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
