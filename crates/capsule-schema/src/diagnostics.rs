//! Non-fatal conditions collected during a build.
//!
//! Recoverable problems are recorded here instead of being logged where they
//! occur. The packager emits them once, at the end of a build, and carries
//! them in its report.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    UnmatchedCaplet {
        fragment: String,
    },
    /// The fat capsule fell back to embedding compiled classes.
    MissingPrimaryArchive {
        path: PathBuf,
    },
    UnresolvedDependency {
        coordinate: String,
    },
    MissingDependencyFile {
        coordinate: String,
        path: PathBuf,
    },
    FileSetNotDirectory {
        directory: PathBuf,
    },
    UnnamedMode {
        index: usize,
    },
    UnknownVariantType {
        token: String,
    },
    DeprecatedOption {
        option: String,
        replacement: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedCaplet { fragment } => {
                write!(f, "could not find caplet {fragment} class, skipping")
            }
            Self::MissingPrimaryArchive { path } => write!(
                f,
                "couldn't add main jar file {} to fat capsule, adding the project classes directly instead",
                path.display()
            ),
            Self::UnresolvedDependency { coordinate } => write!(
                f,
                "dependency [{coordinate}] was not resolved, not added to fat capsule"
            ),
            Self::MissingDependencyFile { coordinate, path } => write!(
                f,
                "dependency [{coordinate}] file {} not found, not added to fat capsule",
                path.display()
            ),
            Self::FileSetNotDirectory { directory } => write!(
                f,
                "attempted to include files from non-directory [{}], skipping",
                directory.display()
            ),
            Self::UnnamedMode { index } => {
                write!(f, "mode #{index} defined without name, ignoring")
            }
            Self::UnknownVariantType { token } => {
                write!(f, "unknown capsule type '{token}', ignoring")
            }
            Self::DeprecatedOption {
                option,
                replacement,
            } => write!(f, "option '{option}' is deprecated, use '{replacement}'"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }

    /// Log every collected warning.
    pub fn emit(&self) {
        for w in &self.warnings {
            warn!("{w}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_query() {
        let mut d = Diagnostics::default();
        assert!(d.is_empty());
        d.push(Warning::UnnamedMode { index: 2 });
        assert_eq!(d.len(), 1);
        assert_eq!(d.warnings()[0], Warning::UnnamedMode { index: 2 });
    }

    #[test]
    fn extend_keeps_order() {
        let mut a = Diagnostics::default();
        a.push(Warning::UnnamedMode { index: 0 });
        let mut b = Diagnostics::default();
        b.push(Warning::UnmatchedCaplet {
            fragment: "X".to_owned(),
        });
        a.extend(b);
        assert_eq!(a.len(), 2);
        assert!(matches!(a.warnings()[1], Warning::UnmatchedCaplet { .. }));
    }

    #[test]
    fn display_mentions_subject() {
        let w = Warning::MissingDependencyFile {
            coordinate: "g:a:1".to_owned(),
            path: PathBuf::from("/repo/a-1.jar"),
        };
        let msg = w.to_string();
        assert!(msg.contains("g:a:1"));
        assert!(msg.contains("/repo/a-1.jar"));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let mut d = Diagnostics::default();
        d.push(Warning::UnknownVariantType {
            token: "slim".to_owned(),
        });
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json[0]["kind"], "unknown_variant_type");
        assert_eq!(json[0]["token"], "slim");
    }
}
