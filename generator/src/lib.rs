//! NuGet sources generator for offline Flatpak .NET builds.
//!
//! This crate produces the JSON sources file that `flatpak-builder` uses to
//! pre-fetch every NuGet package a .NET project needs, so the sandboxed build
//! can run without network access. It is used by the
//! `flatpak-dotnet-generator` binary and can be driven programmatically for
//! testing.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`digest`] - SHA-512 digest decoding and validation
//! - [`error`] - Top-level error type
//! - [`manifest`] - Manifest assembly, ordering, and serialisation
//! - [`output`] - Progress output helpers
//! - [`package`] - Package coordinates and the runtime pack table
//! - [`pipeline`] - End-to-end generation pipeline
//! - [`registry`] - NuGet registry client and runtime pack discovery
//! - [`restore`] - `dotnet restore` inside the Flatpak SDK
//! - [`scanner`] - Restore cache scanning
//! - [`source`] - Sources file entries

pub mod cli;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod registry;
pub mod restore;
pub mod scanner;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
