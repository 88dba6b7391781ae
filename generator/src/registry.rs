//! NuGet registry client for runtime-pack discovery.
//!
//! Runtime packs are never visible to `dotnet restore` for a framework-
//! dependent project, so their latest versions and hashes are looked up
//! directly in the registry's registration and catalog resources. The HTTP
//! transport sits behind [`RegistryClient`] so tests can serve canned
//! documents.

use std::sync::OnceLock;
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::digest::{DigestError, Sha512Digest};
use crate::package::{PackageCoordinate, RuntimePack};
use crate::source::SourceEntry;

/// Base URL of the public NuGet registry.
pub const DEFAULT_REGISTRY: &str = "https://api.nuget.org";

/// Hash algorithm the catalog must declare for `packageHash`.
const SUPPORTED_HASH_ALGORITHM: &str = "SHA512";

/// Network timeout for registry requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors arising from registry lookups.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// HTTP request failed.
    #[error("request failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("registry resource not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The response body is not the JSON shape the registry documents.
    #[error("unexpected response from {url}: {reason}")]
    MalformedResponse {
        /// The URL whose response could not be parsed.
        url: String,
        /// Parser error message.
        reason: String,
    },

    /// The registration index or its last page lists no versions.
    #[error("no published versions of {package} in {url}")]
    EmptyIndex {
        /// The package id being resolved.
        package: String,
        /// The index or page URL that was empty.
        url: String,
    },

    /// The catalog declares a hash algorithm other than SHA-512.
    #[error("catalog entry for {package} uses unsupported hash algorithm {algorithm}")]
    UnsupportedHashAlgorithm {
        /// The package id being resolved.
        package: String,
        /// The declared algorithm.
        algorithm: String,
    },

    /// The catalog `packageHash` is not a valid SHA-512 digest.
    #[error("invalid package hash for {package}: {source}")]
    InvalidDigest {
        /// The package id being resolved.
        package: String,
        /// The underlying decoding failure.
        #[source]
        source: DigestError,
    },
}

/// Trait for fetching registry documents.
///
/// Abstractions allow tests to serve registry JSON without network access.
#[cfg_attr(test, mockall::automock)]
pub trait RegistryClient {
    /// Fetch the document at `url` and return its body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the resource is missing.
    fn fetch_document(&self, url: &str) -> Result<String, RegistryError>;
}

/// HTTP registry client using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRegistryClient;

impl RegistryClient for HttpRegistryClient {
    fn fetch_document(&self, url: &str) -> Result<String, RegistryError> {
        debug!("GET {url}");
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| RegistryError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`RegistryError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> RegistryError {
    match err {
        ureq::Error::StatusCode(404) => RegistryError::NotFound {
            url: url.to_owned(),
        },
        other => RegistryError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// URL layout of a NuGet v3 registry.
///
/// # Examples
///
/// ```
/// use nuget_sources_generator::package::PackageCoordinate;
/// use nuget_sources_generator::registry::RegistryEndpoints;
///
/// let endpoints = RegistryEndpoints::new("https://nuget.example.test/");
/// let url = endpoints.package_url(&PackageCoordinate::new("foo", "1.2.3"));
/// assert_eq!(url, "https://nuget.example.test/v3-flatcontainer/foo/1.2.3/foo.1.2.3.nupkg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoints {
    base: String,
}

impl RegistryEndpoints {
    /// Create endpoints rooted at `base`, ignoring any trailing slash.
    #[must_use]
    pub fn new(base: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim_end_matches('/').to_owned(),
        }
    }

    /// Return the registry base URL.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Return the flat-container base that serves `.nupkg` files.
    #[must_use]
    pub fn flat_container(&self) -> String {
        format!("{}/v3-flatcontainer", self.base)
    }

    /// Return the registration index URL for a package id.
    #[must_use]
    pub fn registration_index_url(&self, package_id: &str) -> String {
        format!(
            "{}/v3/registration5-semver1/{}/index.json",
            self.base,
            package_id.to_lowercase()
        )
    }

    /// Return the download URL for a package,
    /// `<flat-container>/<name>/<version>/<name>.<version>.nupkg`.
    #[must_use]
    pub fn package_url(&self, coordinate: &PackageCoordinate) -> String {
        format!(
            "{}/{}/{}/{}",
            self.flat_container(),
            coordinate.name(),
            coordinate.version(),
            coordinate.filename()
        )
    }
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY)
    }
}

/// A package version resolved from the registry together with its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// The resolved id and version.
    pub coordinate: PackageCoordinate,
    /// The catalog's SHA-512 package hash.
    pub sha512: Sha512Digest,
}

#[derive(Debug, Deserialize)]
struct RegistrationIndex {
    #[serde(default)]
    items: Vec<RegistrationPage>,
}

#[derive(Debug, Deserialize)]
struct RegistrationPage {
    #[serde(rename = "@id")]
    id: String,
    // Omitted when the registry pages the index out of line.
    items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
struct RegistrationLeaf {
    #[serde(rename = "catalogEntry")]
    catalog_entry: CatalogEntryRef,
}

#[derive(Debug, Deserialize)]
struct CatalogEntryRef {
    #[serde(rename = "@id")]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    version: String,
    package_hash: String,
    package_hash_algorithm: Option<String>,
}

/// Resolve the most recent published version of `package_id`.
///
/// Reads the registration index, takes the last leaf of the last page, and
/// fetches that leaf's catalog entry for the version and package hash.
///
/// Precondition: the registry keeps each registration index ordered, with
/// new versions appended at the end. The last leaf of the last page is
/// therefore the latest release. An empty index or page is an error rather
/// than an implicit "no version".
///
/// # Errors
///
/// Returns a [`RegistryError`] for any failed request, unexpected JSON
/// shape, empty index, or invalid package hash.
pub fn resolve_latest(
    client: &dyn RegistryClient,
    endpoints: &RegistryEndpoints,
    package_id: &str,
) -> Result<ResolvedPackage, RegistryError> {
    let index_url = endpoints.registration_index_url(package_id);
    let index: RegistrationIndex = fetch_json(client, &index_url)?;

    let page = index
        .items
        .into_iter()
        .last()
        .ok_or_else(|| RegistryError::EmptyIndex {
            package: package_id.to_owned(),
            url: index_url.clone(),
        })?;

    let leaves = match page.items {
        Some(items) => items,
        None => {
            debug!("registration page for {package_id} is not inlined; fetching {}", page.id);
            let fetched: RegistrationPage = fetch_json(client, &page.id)?;
            fetched.items.unwrap_or_default()
        }
    };

    let leaf = leaves
        .into_iter()
        .last()
        .ok_or_else(|| RegistryError::EmptyIndex {
            package: package_id.to_owned(),
            url: page.id.clone(),
        })?;

    let entry: CatalogEntry = fetch_json(client, &leaf.catalog_entry.id)?;

    if let Some(algorithm) = entry.package_hash_algorithm {
        if !algorithm.eq_ignore_ascii_case(SUPPORTED_HASH_ALGORITHM) {
            return Err(RegistryError::UnsupportedHashAlgorithm {
                package: package_id.to_owned(),
                algorithm,
            });
        }
    }

    let sha512 = Sha512Digest::from_base64(&entry.package_hash).map_err(|source| {
        RegistryError::InvalidDigest {
            package: package_id.to_owned(),
            source,
        }
    })?;

    Ok(ResolvedPackage {
        coordinate: PackageCoordinate::new(package_id, &entry.version),
        sha512,
    })
}

/// Resolve every runtime pack in `packs` and build its source entry.
///
/// Packs are resolved one after another; the first failure aborts the
/// whole discovery, since a partial runtime-pack set would only surface
/// later as an offline build failure.
///
/// # Errors
///
/// Returns the first [`RegistryError`] encountered.
pub fn discover_runtime_packs(
    client: &dyn RegistryClient,
    endpoints: &RegistryEndpoints,
    packs: &[RuntimePack],
    dest: &str,
) -> Result<Vec<SourceEntry>, RegistryError> {
    packs
        .iter()
        .map(|pack| {
            let resolved = resolve_latest(client, endpoints, &pack.package_id())?;
            debug!("resolved runtime pack {}", resolved.coordinate);
            Ok(SourceEntry::for_package(
                endpoints,
                &resolved.coordinate,
                resolved.sha512,
                dest,
            ))
        })
        .collect()
}

/// Fetch `url` and deserialize the body as `T`.
fn fetch_json<T: DeserializeOwned>(
    client: &dyn RegistryClient,
    url: &str,
) -> Result<T, RegistryError> {
    let body = client.fetch_document(url)?;
    serde_json::from_str(&body).map_err(|e| RegistryError::MalformedResponse {
        url: url.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
