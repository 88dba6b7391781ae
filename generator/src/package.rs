//! Package coordinates and the fixed runtime-pack table.
//!
//! A [`PackageCoordinate`] names one `.nupkg` artefact by id and version.
//! Both discovery strategies funnel through it so that the download URL
//! and the destination filename are always derived from the same pair.

use std::fmt;

/// A NuGet package id and version.
///
/// Ids and versions are lowercased on construction because the registry's
/// flat container only serves lowercase paths, and the restore cache lays
/// packages out the same way.
///
/// # Examples
///
/// ```
/// use nuget_sources_generator::package::PackageCoordinate;
///
/// let coordinate = PackageCoordinate::new("Newtonsoft.Json", "13.0.3");
/// assert_eq!(coordinate.name(), "newtonsoft.json");
/// assert_eq!(coordinate.filename(), "newtonsoft.json.13.0.3.nupkg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageCoordinate {
    name: String,
    version: String,
}

impl PackageCoordinate {
    /// Create a coordinate from a package id and version.
    #[must_use]
    pub fn new(name: impl AsRef<str>, version: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            version: version.as_ref().to_lowercase(),
        }
    }

    /// Return the lowercase package id.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the lowercase package version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Return the canonical `.nupkg` filename, `<name>.<version>.nupkg`.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}.{}.nupkg", self.name, self.version)
    }
}

impl fmt::Display for PackageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Runtime package families consumed by self-contained .NET builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFamily {
    /// The base .NET runtime (`Microsoft.NETCore.App.Runtime`).
    NetCore,
    /// The ASP.NET Core shared framework (`Microsoft.AspNetCore.App.Runtime`).
    AspNetCore,
}

impl RuntimeFamily {
    /// Return the lowercase package id prefix for this family.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::NetCore => "microsoft.netcore.app.runtime",
            Self::AspNetCore => "microsoft.aspnetcore.app.runtime",
        }
    }
}

/// CPU architectures Flatpak builds target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// 64-bit x86.
    X64,
    /// 32-bit ARM.
    Arm,
    /// 64-bit ARM.
    Arm64,
}

impl Architecture {
    /// Return the .NET runtime identifier for Linux on this architecture.
    #[must_use]
    pub const fn runtime_identifier(self) -> &'static str {
        match self {
            Self::X64 => "linux-x64",
            Self::Arm => "linux-arm",
            Self::Arm64 => "linux-arm64",
        }
    }
}

/// One (family, architecture) runtime pack whose version is discovered
/// from the registry at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimePack {
    /// The runtime package family.
    pub family: RuntimeFamily,
    /// The target architecture.
    pub architecture: Architecture,
}

impl RuntimePack {
    /// Return the lowercase package id, e.g.
    /// `microsoft.netcore.app.runtime.linux-x64`.
    ///
    /// # Examples
    ///
    /// ```
    /// use nuget_sources_generator::package::{Architecture, RuntimeFamily, RuntimePack};
    ///
    /// let pack = RuntimePack {
    ///     family: RuntimeFamily::AspNetCore,
    ///     architecture: Architecture::Arm64,
    /// };
    /// assert_eq!(pack.package_id(), "microsoft.aspnetcore.app.runtime.linux-arm64");
    /// ```
    #[must_use]
    pub fn package_id(&self) -> String {
        format!(
            "{}.{}",
            self.family.id_prefix(),
            self.architecture.runtime_identifier()
        )
    }
}

/// Runtime packs the .NET SDK pulls in by indirection when publishing
/// self-contained Linux builds. They never appear in the restore graph, so
/// they are resolved against the registry separately.
pub const RUNTIME_PACKS: [RuntimePack; 6] = [
    RuntimePack {
        family: RuntimeFamily::AspNetCore,
        architecture: Architecture::Arm,
    },
    RuntimePack {
        family: RuntimeFamily::AspNetCore,
        architecture: Architecture::Arm64,
    },
    RuntimePack {
        family: RuntimeFamily::AspNetCore,
        architecture: Architecture::X64,
    },
    RuntimePack {
        family: RuntimeFamily::NetCore,
        architecture: Architecture::Arm,
    },
    RuntimePack {
        family: RuntimeFamily::NetCore,
        architecture: Architecture::Arm64,
    },
    RuntimePack {
        family: RuntimeFamily::NetCore,
        architecture: Architecture::X64,
    },
];
