use crate::attributes::{build_manifest, SharedAttributes};
use crate::concurrency::OutputLock;
use crate::report::{BuildReport, BuiltCapsule};
use crate::resolve::{
    determine_runtime_version, ArtifactResolver, RuntimeArtifact, VersionRangeResolver,
};
use crate::CoreError;
use capsule_archive::{
    caplet_entries, compiled_entries, file_set_entries, locate_caplets, make_executable,
    runtime_entries, ArchiveError, ArchiveWriter, Entry, ExecKind, LocatedCaplet, Manifest,
    RuntimeSelection, MANIFEST_PATH,
};
use capsule_schema::{
    parse_type_filter, CapsuleConfig, ConfigError, DependencyScope, Diagnostics,
    ExecConfiguration, Project, ResolvedArtifact, Variant, Warning,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything decided before the first archive is opened.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// In build order: empty, thin, fat.
    pub variants: Vec<Variant>,
    pub runtime_version: String,
    pub output_dir: PathBuf,
    pub attributes: SharedAttributes,
    /// One manifest per selected variant, validated up front.
    pub manifests: Vec<(Variant, Manifest)>,
    pub caplets: Vec<LocatedCaplet>,
    /// File-set entries, written identically into every variant.
    pub file_sets: Vec<Entry>,
    pub companions: Vec<ExecKind>,
}

impl BuildPlan {
    pub fn manifest(&self, variant: Variant) -> Option<&Manifest> {
        self.manifests
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|(_, m)| m)
    }
}

/// How a resolved dependency artifact is treated by the fat capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactState<'a> {
    /// Not needed at launch.
    Excluded(DependencyScope),
    /// The host reported no file for it.
    Unresolved,
    /// A file was reported but is not on disk.
    Missing(&'a Path),
    Available { path: &'a Path, name: &'a str },
}

fn artifact_state(artifact: &ResolvedArtifact) -> ArtifactState<'_> {
    if !artifact.scope.is_launch_scope() {
        return ArtifactState::Excluded(artifact.scope);
    }
    let Some(path) = artifact.file.as_deref() else {
        return ArtifactState::Unresolved;
    };
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) if path.is_file() => ArtifactState::Available { path, name },
        _ => ArtifactState::Missing(path),
    }
}

/// Assembles the selected capsule variants for one project.
///
/// A packager is built fresh for every invocation. Resolvers are borrowed so
/// the caller decides where runtime artifacts come from.
pub struct Packager<'r> {
    project: Project,
    config: CapsuleConfig,
    versions: &'r dyn VersionRangeResolver,
    artifacts: &'r dyn ArtifactResolver,
}

impl<'r> Packager<'r> {
    pub fn new(
        project: Project,
        config: CapsuleConfig,
        versions: &'r dyn VersionRangeResolver,
        artifacts: &'r dyn ArtifactResolver,
    ) -> Self {
        Self {
            project,
            config,
            versions,
            artifacts,
        }
    }

    fn exec_configuration(&self) -> Option<&ExecConfiguration> {
        let selector = self.config.exec_plugin_config.as_deref()?;
        let plugin = self.project.exec_plugin.as_ref()?;
        let selected = plugin.select(selector);
        if selected.is_none() {
            debug!("exec plugin has no configuration '{selector}'");
        }
        selected
    }

    fn app_class(&self, exec: Option<&ExecConfiguration>) -> Result<String, ConfigError> {
        self.config
            .app_class
            .as_deref()
            .or_else(|| exec.and_then(|e| e.main_class.as_deref()))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .ok_or(ConfigError::MissingAppClass)
    }

    /// Output directory, falling back to the build directory when the
    /// configured one would write into the compiled-output tree.
    pub fn output_dir(&self) -> PathBuf {
        let build_dir = self.project.build_dir();
        let output = match &self.config.output {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.project.base_dir().join(dir),
            None => return build_dir,
        };
        if output == self.project.classes_dir() {
            debug!(
                "output {} is the compiled-output directory, using {} instead",
                output.display(),
                build_dir.display()
            );
            return build_dir;
        }
        output
    }

    fn companions(&self, diagnostics: &mut Diagnostics) -> Vec<ExecKind> {
        let mut kinds = Vec::new();
        if self.config.build_exec.is_set() {
            diagnostics.push(Warning::DeprecatedOption {
                option: "build_exec".to_owned(),
                replacement: "chmod".to_owned(),
            });
        }
        if self.config.chmod.is_set() || self.config.build_exec.is_set() {
            kinds.push(ExecKind::Plain);
        }
        if self.config.trampoline.is_set() {
            kinds.push(ExecKind::Trampoline);
        }
        kinds
    }

    /// Decide everything that can fail before any archive is written.
    ///
    /// Creates the output directory; nothing else touches the filesystem.
    pub fn prepare(&self, diagnostics: &mut Diagnostics) -> Result<BuildPlan, CoreError> {
        let exec = self.exec_configuration();
        let app_class = self.app_class(exec)?;

        let fragments: Vec<String> = self
            .config
            .caplets
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        let caplets = locate_caplets(&self.project.classes_dir(), &fragments, diagnostics);
        let matched: Vec<String> = caplets.iter().map(|c| c.fragment.clone()).collect();

        let variants = parse_type_filter(self.config.types.as_deref(), diagnostics);
        let names: Vec<&str> = variants.iter().map(|v| v.as_str()).collect();
        debug!("types: {names:?}");

        for (index, mode) in self.config.modes.iter().enumerate() {
            if mode.name.as_deref().map_or(true, str::is_empty) {
                diagnostics.push(Warning::UnnamedMode { index });
            }
        }
        let companions = self.companions(diagnostics);
        let file_sets = file_set_entries(
            &self.config.file_sets,
            self.project.base_dir(),
            diagnostics,
        )?;

        let attributes = SharedAttributes::compute(&app_class, &self.config, exec, &matched);
        let manifests = variants
            .iter()
            .map(|&v| {
                build_manifest(&attributes, v, &self.project, &self.config).map(|m| (v, m))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let runtime_version =
            determine_runtime_version(self.config.capsule_version.as_deref(), self.versions)?;
        info!("using capsule runtime version {runtime_version}");

        let output_dir = self.output_dir();
        std::fs::create_dir_all(&output_dir)?;
        debug!("output directory: {}", output_dir.display());

        Ok(BuildPlan {
            variants,
            runtime_version,
            output_dir,
            attributes,
            manifests,
            caplets,
            file_sets,
            companions,
        })
    }

    /// Build every selected variant.
    ///
    /// Warnings are logged once at the end, also when the build fails, and
    /// carried in the report. Archives finished before a failure stay on disk.
    pub fn build(&self) -> Result<BuildReport, CoreError> {
        let mut diagnostics = Diagnostics::default();
        let result = self.build_all(&mut diagnostics);
        diagnostics.emit();
        let mut report = result?;
        report.warnings = diagnostics.into_vec();
        Ok(report)
    }

    fn build_all(&self, diagnostics: &mut Diagnostics) -> Result<BuildReport, CoreError> {
        let plan = self.prepare(diagnostics)?;
        let _lock = OutputLock::acquire(&plan.output_dir)?;
        let runtime = RuntimeArtifact::new(plan.runtime_version.clone(), self.artifacts);

        let mut report = BuildReport::new(&plan.runtime_version, &plan.output_dir);
        for &variant in &plan.variants {
            let built = self.assemble(variant, &plan, &runtime, diagnostics)?;
            report.capsules.push(built);
        }
        Ok(report)
    }

    /// Write one variant's archive and its companions.
    ///
    /// Every entry list is collected before the archive is created. An archive
    /// that fails while being written is removed.
    pub fn assemble(
        &self,
        variant: Variant,
        plan: &BuildPlan,
        runtime: &RuntimeArtifact<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<BuiltCapsule, CoreError> {
        let runtime_jar = runtime.path()?;
        let manifest = match plan.manifest(variant) {
            Some(m) => m.clone(),
            None => build_manifest(&plan.attributes, variant, &self.project, &self.config)?,
        };

        let payload = match variant {
            Variant::Empty => Vec::new(),
            Variant::Thin => compiled_entries(&self.project.classes_dir())?,
            Variant::Fat => self.fat_payload(diagnostics)?,
        };
        let selection = match variant {
            Variant::Fat => RuntimeSelection::MainClassOnly,
            Variant::Empty | Variant::Thin => RuntimeSelection::Full,
        };
        let support = runtime_entries(runtime_jar, selection)?;
        let caplets = caplet_entries(&plan.caplets);

        let name = variant.output_name(&self.project.final_name, &self.config.descriptors);
        let mut writer = ArchiveWriter::create(&plan.output_dir.join(format!("{name}.jar")))?;
        let written = write_archive(
            &mut writer,
            &manifest,
            &payload,
            &[support.as_slice(), caplets.as_slice(), plan.file_sets.as_slice()],
        );
        let payload_written = match written {
            Ok(n) => n,
            Err(e) => {
                writer.abandon();
                return Err(e.into());
            }
        };
        debug!("{variant}: {payload_written} payload entries");

        let entries = writer.entry_count();
        let path = writer.finish()?;
        info!("created {name}.jar");

        let mut companions = Vec::with_capacity(plan.companions.len());
        for &kind in &plan.companions {
            companions.push(make_executable(&path, kind)?);
        }
        BuiltCapsule::describe(variant, &path, entries, companions)
    }

    /// Primary archive (or compiled classes when it is missing) followed by
    /// every launch-scope dependency file.
    fn fat_payload(&self, diagnostics: &mut Diagnostics) -> Result<Vec<Entry>, CoreError> {
        let mut entries = Vec::new();
        let primary = self.project.primary_archive();
        if primary.is_file() {
            entries.push(Entry::file(format!("{}.jar", self.project.final_name), primary));
        } else {
            diagnostics.push(Warning::MissingPrimaryArchive { path: primary });
            entries.extend(compiled_entries(&self.project.classes_dir())?);
        }

        for artifact in &self.project.artifacts {
            match artifact_state(artifact) {
                ArtifactState::Excluded(scope) => {
                    debug!("skipping {scope} dependency {}", artifact.coordinate());
                }
                ArtifactState::Unresolved => diagnostics.push(Warning::UnresolvedDependency {
                    coordinate: artifact.coordinate().to_string(),
                }),
                ArtifactState::Missing(path) => diagnostics.push(Warning::MissingDependencyFile {
                    coordinate: artifact.coordinate().to_string(),
                    path: path.to_path_buf(),
                }),
                ArtifactState::Available { path, name } => {
                    debug!("adding dependency {} to fat capsule", artifact.coordinate());
                    entries.push(Entry::file(name, path));
                }
            }
        }
        Ok(entries)
    }
}

/// Manifest first, then the payload, then the remaining entry groups in order.
/// Returns the number of payload entries written.
fn write_archive(
    writer: &mut ArchiveWriter,
    manifest: &Manifest,
    payload: &[Entry],
    rest: &[&[Entry]],
) -> Result<usize, ArchiveError> {
    writer.write_bytes(MANIFEST_PATH, &manifest.to_bytes())?;
    let written = writer.write_entries(payload)?;
    for group in rest {
        writer.write_entries(group)?;
    }
    Ok(written)
}
