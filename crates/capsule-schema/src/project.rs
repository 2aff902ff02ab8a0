use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Project descriptor as handed over by the host build tool.
///
/// Dependencies and artifacts are already resolved; this crate only renders
/// them. Relative paths are resolved against the descriptor's directory by
/// [`Project::load`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub final_name: String,
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub artifacts: Vec<ResolvedArtifact>,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub exec_plugin: Option<ExecPlugin>,
}

impl Project {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut project: Project = serde_json::from_str(&content)?;
        let root = path.parent().unwrap_or(Path::new("."));
        project.anchor(root);
        Ok(project)
    }

    /// Make `base_dir`, `build_dir` and artifact files absolute relative to `root`.
    pub fn anchor(&mut self, root: &Path) {
        let base = match self.base_dir.take() {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        };
        self.build_dir = Some(match self.build_dir.take() {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => base.join(dir),
            None => base.join("target"),
        });
        for artifact in &mut self.artifacts {
            if let Some(file) = artifact.file.take() {
                artifact.file = Some(if file.is_absolute() {
                    file
                } else {
                    base.join(file)
                });
            }
        }
        self.base_dir = Some(base);
    }

    pub fn base_dir(&self) -> &Path {
        self.base_dir.as_deref().unwrap_or(Path::new("."))
    }

    pub fn build_dir(&self) -> PathBuf {
        self.build_dir
            .clone()
            .unwrap_or_else(|| self.base_dir().join("target"))
    }

    /// Directory holding compiled output, `{build_dir}/classes`.
    pub fn classes_dir(&self) -> PathBuf {
        self.build_dir().join("classes")
    }

    /// The project's own pre-built archive, `{build_dir}/{final_name}.jar`.
    pub fn primary_archive(&self) -> PathBuf {
        self.build_dir().join(format!("{}.jar", self.final_name))
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group_id, &self.artifact_id, Some(&self.version))
    }
}

/// `group:artifact[:version]` identity of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl Coordinate {
    pub fn new(group_id: &str, artifact_id: &str, version: Option<&str>) -> Self {
        Self {
            group_id: group_id.to_owned(),
            artifact_id: artifact_id.to_owned(),
            version: version.map(str::to_owned),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        match self.version.as_deref() {
            Some(v) if !v.is_empty() => write!(f, ":{v}"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    #[default]
    Compile,
    Runtime,
    Provided,
    Test,
    System,
    Import,
}

impl DependencyScope {
    /// Only compile and runtime dependencies are needed when the capsule launches.
    pub fn is_launch_scope(self) -> bool {
        matches!(self, Self::Compile | Self::Runtime)
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Provided => "provided",
            Self::Test => "test",
            Self::System => "system",
            Self::Import => "import",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

/// A declared dependency of the project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub scope: DependencyScope,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
}

/// A dependency artifact after resolution by the host build tool.
///
/// `file` is `None` when the host could not resolve the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub scope: DependencyScope,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl ResolvedArtifact {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group_id, &self.artifact_id, Some(&self.version))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Repository {
    pub id: String,
    pub url: String,
}

/// Launch configuration of the host's exec plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecPlugin {
    #[serde(default)]
    pub configuration: Option<ExecConfiguration>,
    #[serde(default)]
    pub executions: Vec<ExecExecution>,
}

impl ExecPlugin {
    /// Pick the root configuration (`"root"`) or the execution with the given id.
    pub fn select(&self, selector: &str) -> Option<&ExecConfiguration> {
        if selector == "root" {
            return self.configuration.as_ref();
        }
        self.executions
            .iter()
            .find(|e| e.id == selector)
            .and_then(|e| e.configuration.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecExecution {
    pub id: String,
    #[serde(default)]
    pub configuration: Option<ExecConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecConfiguration {
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub system_properties: Vec<crate::Property>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "group_id": "com.acme",
            "artifact_id": "app",
            "version": "1.2.0",
            "final_name": "app-1.2.0"
        }"#
    }

    #[test]
    fn load_anchors_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(
            &path,
            r#"{
                "group_id": "com.acme",
                "artifact_id": "app",
                "version": "1.2.0",
                "final_name": "app-1.2.0",
                "build_dir": "out",
                "artifacts": [
                    { "group_id": "g", "artifact_id": "a", "version": "1", "file": "libs/a-1.jar" }
                ]
            }"#,
        )
        .unwrap();

        let project = Project::load(&path).unwrap();
        assert_eq!(project.base_dir(), dir.path());
        assert_eq!(project.build_dir(), dir.path().join("out"));
        assert_eq!(project.classes_dir(), dir.path().join("out").join("classes"));
        assert_eq!(
            project.artifacts[0].file.as_deref(),
            Some(dir.path().join("libs/a-1.jar").as_path())
        );
    }

    #[test]
    fn default_build_dir_is_target() {
        let mut project: Project = serde_json::from_str(minimal_json()).unwrap();
        project.anchor(Path::new("/work"));
        assert_eq!(project.build_dir(), PathBuf::from("/work/target"));
        assert_eq!(
            project.primary_archive(),
            PathBuf::from("/work/target/app-1.2.0.jar")
        );
    }

    #[test]
    fn scope_defaults_to_compile() {
        let dep: Dependency =
            serde_json::from_str(r#"{"group_id":"g","artifact_id":"a","version":"1"}"#).unwrap();
        assert_eq!(dep.scope, DependencyScope::Compile);
        assert!(dep.scope.is_launch_scope());
        assert!(!DependencyScope::Test.is_launch_scope());
        assert!(!DependencyScope::Provided.is_launch_scope());
    }

    #[test]
    fn coordinate_display() {
        assert_eq!(Coordinate::new("g", "a", Some("1.0")).to_string(), "g:a:1.0");
        assert_eq!(Coordinate::new("g", "a", None).to_string(), "g:a");
        assert_eq!(Coordinate::new("g", "a", Some("")).to_string(), "g:a");
    }

    #[test]
    fn exec_plugin_select() {
        let plugin = ExecPlugin {
            configuration: Some(ExecConfiguration {
                main_class: Some("root.Main".to_owned()),
                ..ExecConfiguration::default()
            }),
            executions: vec![ExecExecution {
                id: "run-server".to_owned(),
                configuration: Some(ExecConfiguration {
                    main_class: Some("server.Main".to_owned()),
                    ..ExecConfiguration::default()
                }),
            }],
        };
        assert_eq!(
            plugin.select("root").and_then(|c| c.main_class.as_deref()),
            Some("root.Main")
        );
        assert_eq!(
            plugin
                .select("run-server")
                .and_then(|c| c.main_class.as_deref()),
            Some("server.Main")
        );
        assert!(plugin.select("missing").is_none());
    }
}
