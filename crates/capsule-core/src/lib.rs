//! Capsule assembly engine.
//!
//! Ties the schema and archive layers together: the `Packager` prepares a
//! `BuildPlan` (application class, caplets, variant filter, runtime version,
//! output directory), then assembles every selected variant through the
//! archive writer and reports what it produced. Runtime-support artifacts are
//! located through the `VersionRangeResolver` and `ArtifactResolver` traits,
//! with `LocalRepository` as the bundled implementation.

pub mod attributes;
pub mod concurrency;
pub mod engine;
pub mod report;
pub mod resolve;

pub use attributes::{build_manifest, mode_section, variant_attributes, SharedAttributes};
pub use concurrency::OutputLock;
pub use engine::{BuildPlan, Packager};
pub use report::{BuildReport, BuiltCapsule};
pub use resolve::{
    compare_versions, determine_runtime_version, select_latest_release, ArtifactResolver,
    LocalRepository, ResolveError, RuntimeArtifact, VersionRange, VersionRangeResolver,
};

use thiserror::Error;

/// Top-level error. The message prefixes (`config error:`, `resolution
/// error:`) are what the CLI uses to choose an exit code.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] capsule_schema::ConfigError),
    #[error("config error: invalid manifest entry: {0}")]
    Manifest(#[from] capsule_archive::ManifestError),
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("archive error: {0}")]
    Archive(#[from] capsule_archive::ArchiveError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
