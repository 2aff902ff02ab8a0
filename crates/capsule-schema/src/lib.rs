//! Build configuration, project descriptor, and capsule variant model.
//!
//! This crate defines the schema layer: the TOML build configuration
//! (`CapsuleConfig`), the project descriptor handed over by the host build
//! tool (`Project`), the three capsule variants and their type filter
//! (`Variant`, `parse_type_filter`), rendering of coordinate, repository and
//! property lists into manifest values, and the non-fatal `Diagnostics`
//! collected while a capsule is assembled.

pub mod config;
pub mod diagnostics;
pub mod project;
pub mod render;
pub mod variant;

pub use config::{
    parse_config_file, parse_config_str, CapsuleConfig, ConfigError, Descriptors, FileSet, Flag,
    ModeConfig, Property,
};
pub use diagnostics::{Diagnostics, Warning};
pub use project::{
    Coordinate, Dependency, DependencyScope, ExecConfiguration, ExecExecution, ExecPlugin,
    Exclusion, Project, Repository, ResolvedArtifact,
};
pub use render::{
    render_arguments, render_dependencies, render_dependency, render_properties,
    render_repositories,
};
pub use variant::{parse_type_filter, Variant};
