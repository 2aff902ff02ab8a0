//! Locating the runtime-support artifact.
//!
//! The packager only needs two questions answered: which versions of an
//! artifact exist, and where a given version lives on disk. Both are traits
//! so a host build tool can plug in its own repository system; this module
//! ships a local-directory implementation and the memoized runtime handle.

use capsule_schema::Coordinate;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Group of the runtime-support artifact.
pub const RUNTIME_GROUP: &str = "co.paralleluniverse";
/// Name of the runtime-support artifact.
pub const RUNTIME_ARTIFACT: &str = "capsule";
/// Range used to discover the latest runtime when no version is configured.
pub const ANY_VERSION: &str = "[0,)";

const PRE_RELEASE_MARKER: &str = "SNAPSHOT";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid version range '{0}'")]
    InvalidRange(String),
    #[error("failed to resolve version range {range} of {coordinate}: {reason}")]
    VersionRange {
        coordinate: String,
        range: String,
        reason: String,
    },
    #[error("no release version of {coordinate} available")]
    NoRelease { coordinate: String },
    #[error("artifact {coordinate} could not be resolved: {reason}")]
    ArtifactNotFound { coordinate: String, reason: String },
    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lists the versions of an artifact that satisfy a range, ascending.
pub trait VersionRangeResolver {
    fn resolve_version_range(
        &self,
        coordinate: &Coordinate,
        range: &str,
    ) -> Result<Vec<String>, ResolveError>;
}

/// Maps a versioned coordinate to a local file.
pub trait ArtifactResolver {
    fn resolve_artifact(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolveError>;
}

/// The runtime-support artifact coordinate, optionally pinned to a version.
pub fn runtime_coordinate(version: Option<&str>) -> Coordinate {
    Coordinate::new(RUNTIME_GROUP, RUNTIME_ARTIFACT, version)
}

/// Highest version that is not a pre-release, from an ascending list.
pub fn select_latest_release(versions: &[String]) -> Option<&str> {
    versions
        .iter()
        .rev()
        .find(|v| !v.contains(PRE_RELEASE_MARKER))
        .map(String::as_str)
}

/// Use the configured runtime version, or discover the latest release.
pub fn determine_runtime_version(
    configured: Option<&str>,
    versions: &dyn VersionRangeResolver,
) -> Result<String, ResolveError> {
    if let Some(v) = configured.filter(|v| !v.trim().is_empty()) {
        return Ok(v.trim().to_owned());
    }
    let coordinate = runtime_coordinate(None);
    let available = versions.resolve_version_range(&coordinate, ANY_VERSION)?;
    debug!("available runtime versions: {available:?}");
    select_latest_release(&available)
        .map(str::to_owned)
        .ok_or_else(|| ResolveError::NoRelease {
            coordinate: coordinate.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Num(u64),
    Text(&'a str),
}

fn tokens(version: &str) -> Vec<Token<'_>> {
    version
        .split(['.', '-'])
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<u64>().map_or(Token::Text(t), Token::Num))
        .collect()
}

/// Order two version strings.
///
/// Numeric segments compare numerically, qualifiers case-insensitively, and a
/// qualified version sorts before its bare release (`1.0-SNAPSHOT < 1.0`).
/// Trailing zero segments are insignificant.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (ta, tb) = (tokens(a), tokens(b));
    for i in 0..ta.len().max(tb.len()) {
        let ord = match (ta.get(i), tb.get(i)) {
            (Some(Token::Num(x)), Some(Token::Num(y))) => x.cmp(y),
            (Some(Token::Num(_)), Some(Token::Text(_))) => Ordering::Greater,
            (Some(Token::Text(_)), Some(Token::Num(_))) => Ordering::Less,
            (Some(Token::Text(x)), Some(Token::Text(y))) => {
                x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase())
            }
            (Some(Token::Num(x)), None) => 0.cmp(x).reverse(),
            (None, Some(Token::Num(y))) => 0.cmp(y),
            (Some(Token::Text(_)), None) => Ordering::Less,
            (None, Some(Token::Text(_))) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: String,
    inclusive: bool,
}

/// Interval of versions in bracket notation: `[1.0,2.0)`, `[0,)`, `[1.2]`,
/// or a bare version meaning exactly that version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl VersionRange {
    pub fn parse(spec: &str) -> Result<Self, ResolveError> {
        let s = spec.trim();
        let invalid = || ResolveError::InvalidRange(spec.to_owned());

        let open = s.chars().next().ok_or_else(invalid)?;
        if !matches!(open, '[' | '(') {
            if s.contains([',', '[', ']', '(', ')']) {
                return Err(invalid());
            }
            let exact = Bound {
                version: s.to_owned(),
                inclusive: true,
            };
            return Ok(Self {
                lower: Some(exact.clone()),
                upper: Some(exact),
            });
        }

        let close = s.chars().last().ok_or_else(invalid)?;
        if s.len() < 2 || !matches!(close, ']' | ')') {
            return Err(invalid());
        }
        let inner = &s[1..s.len() - 1];
        let (lo, hi) = match inner.split_once(',') {
            Some((lo, hi)) if !hi.contains(',') => (lo.trim(), hi.trim()),
            Some(_) => return Err(invalid()),
            None if open == '[' && close == ']' && !inner.trim().is_empty() => {
                (inner.trim(), inner.trim())
            }
            None => return Err(invalid()),
        };
        let bound = |v: &str, inclusive: bool| {
            (!v.is_empty()).then(|| Bound {
                version: v.to_owned(),
                inclusive,
            })
        };
        Ok(Self {
            lower: bound(lo, open == '['),
            upper: bound(hi, close == ']'),
        })
    }

    pub fn contains(&self, version: &str) -> bool {
        let above = self.lower.as_ref().map_or(true, |b| {
            match compare_versions(version, &b.version) {
                Ordering::Greater => true,
                Ordering::Equal => b.inclusive,
                Ordering::Less => false,
            }
        });
        let below = self.upper.as_ref().map_or(true, |b| {
            match compare_versions(version, &b.version) {
                Ordering::Less => true,
                Ordering::Equal => b.inclusive,
                Ordering::Greater => false,
            }
        });
        above && below
    }
}

/// A repository directory laid out as
/// `<group as path>/<artifact>/<version>/<artifact>-<version>.jar`.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, coordinate: &Coordinate) -> PathBuf {
        let mut dir = self.root.clone();
        for part in coordinate.group_id.split('.') {
            dir.push(part);
        }
        dir.push(&coordinate.artifact_id);
        dir
    }

    pub fn artifact_path(&self, coordinate: &Coordinate, version: &str) -> PathBuf {
        self.artifact_dir(coordinate)
            .join(version)
            .join(format!("{}-{version}.jar", coordinate.artifact_id))
    }

    /// Every version directory holding the artifact's jar, ascending.
    pub fn versions(&self, coordinate: &Coordinate) -> Result<Vec<String>, ResolveError> {
        let dir = self.artifact_dir(coordinate);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no artifact directory at {}", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(version) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if self.artifact_path(coordinate, &version).is_file() {
                versions.push(version);
            }
        }
        versions.sort_by(|a, b| compare_versions(a, b));
        Ok(versions)
    }
}

impl VersionRangeResolver for LocalRepository {
    fn resolve_version_range(
        &self,
        coordinate: &Coordinate,
        range: &str,
    ) -> Result<Vec<String>, ResolveError> {
        let range_spec = VersionRange::parse(range)?;
        let versions = self
            .versions(coordinate)
            .map_err(|e| ResolveError::VersionRange {
                coordinate: coordinate.to_string(),
                range: range.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(versions
            .into_iter()
            .filter(|v| range_spec.contains(v))
            .collect())
    }
}

impl ArtifactResolver for LocalRepository {
    fn resolve_artifact(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolveError> {
        let Some(version) = coordinate.version.as_deref() else {
            return Err(ResolveError::ArtifactNotFound {
                coordinate: coordinate.to_string(),
                reason: "no version given".to_owned(),
            });
        };
        let path = self.artifact_path(coordinate, version);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ResolveError::ArtifactNotFound {
                coordinate: coordinate.to_string(),
                reason: format!("{} does not exist", path.display()),
            })
        }
    }
}

/// The runtime-support artifact for one invocation.
///
/// The version is fixed up front; the file is resolved on first use and the
/// path reused afterwards.
pub struct RuntimeArtifact<'r> {
    version: String,
    artifacts: &'r dyn ArtifactResolver,
    path: OnceCell<PathBuf>,
}

impl<'r> RuntimeArtifact<'r> {
    pub fn new(version: impl Into<String>, artifacts: &'r dyn ArtifactResolver) -> Self {
        Self {
            version: version.into(),
            artifacts,
            path: OnceCell::new(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        runtime_coordinate(Some(&self.version))
    }

    pub fn is_resolved(&self) -> bool {
        self.path.get().is_some()
    }

    pub fn path(&self) -> Result<&Path, ResolveError> {
        if let Some(path) = self.path.get() {
            return Ok(path);
        }
        let resolved = self.artifacts.resolve_artifact(&self.coordinate())?;
        info!("resolved runtime artifact {}", resolved.display());
        Ok(self.path.get_or_init(|| resolved))
    }
}
