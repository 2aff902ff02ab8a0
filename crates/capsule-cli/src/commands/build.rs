use super::{colorize_variant, format_size, json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use capsule_core::{BuildReport, LocalRepository, Packager};
use capsule_schema::{parse_config_file, CapsuleConfig, Flag, Project, Property};
use clap::Args;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "capsule.toml";

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Default, Args)]
pub struct ConfigOverrides {
    /// Application entry-point class.
    #[arg(long)]
    pub app_class: Option<String>,
    /// Capsule runtime version (default: latest release in the repository).
    #[arg(long)]
    pub capsule_version: Option<String>,
    /// Directory the capsules are written to.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Variants to build, comma or space separated (empty, thin, fat).
    #[arg(long)]
    pub types: Option<String>,
    /// Space separated caplet class fragments.
    #[arg(long)]
    pub caplets: Option<String>,
    /// Exec plugin configuration to read ("root" or an execution id).
    #[arg(long)]
    pub exec_plugin_config: Option<String>,
    /// Also write a directly executable `.x` copy of each capsule.
    #[arg(long, default_value_t = false)]
    pub chmod: bool,
    /// Also write a trampoline `.tx` copy of each capsule.
    #[arg(long, default_value_t = false)]
    pub trampoline: bool,
    /// System property for the application, KEY=VALUE (repeatable).
    #[arg(long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,
    /// Extra main manifest attribute, NAME=VALUE (repeatable).
    #[arg(long = "manifest", value_name = "NAME=VALUE")]
    pub manifest: Vec<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut CapsuleConfig) -> Result<(), String> {
        let set = |slot: &mut Option<String>, value: &Option<String>| {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        };
        set(&mut config.app_class, &self.app_class);
        set(&mut config.capsule_version, &self.capsule_version);
        set(&mut config.types, &self.types);
        set(&mut config.caplets, &self.caplets);
        set(&mut config.exec_plugin_config, &self.exec_plugin_config);
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if self.chmod {
            config.chmod = Flag::new(true);
        }
        if self.trampoline {
            config.trampoline = Flag::new(true);
        }
        if !self.properties.is_empty() {
            let props = config.properties.get_or_insert_with(Vec::new);
            for raw in &self.properties {
                props.push(parse_pair("--property", raw)?);
            }
        }
        for raw in &self.manifest {
            config.manifest.push(parse_pair("--manifest", raw)?);
        }
        Ok(())
    }
}

fn parse_pair(option: &str, raw: &str) -> Result<Property, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok(Property::new(key.trim(), value)),
        _ => Err(format!(
            "config error: invalid {option} value '{raw}', expected KEY=VALUE"
        )),
    }
}

/// The explicit config file, or `capsule.toml` next to the project descriptor
/// when present.
fn load_config(project: &Path, explicit: Option<&Path>) -> Result<CapsuleConfig, String> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = project
                .parent()
                .unwrap_or(Path::new("."))
                .join(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(CapsuleConfig::default());
            }
            candidate
        }
    };
    parse_config_file(&path).map_err(|e| format!("config error: {}: {e}", path.display()))
}

pub fn run(
    project_path: &Path,
    config_path: Option<&Path>,
    repository: &Path,
    overrides: &ConfigOverrides,
    json: bool,
) -> Result<u8, String> {
    let project = Project::load(project_path)
        .map_err(|e| format!("config error: {}: {e}", project_path.display()))?;
    let mut config = load_config(project_path, config_path)?;
    overrides.apply(&mut config)?;

    let repo = LocalRepository::new(repository);
    let packager = Packager::new(project, config, &repo, &repo);

    let pb = if json {
        None
    } else {
        Some(spinner("building capsules..."))
    };
    let report = match packager.build() {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("{} capsule(s) built", r.capsules.len()));
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "build failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(EXIT_SUCCESS)
}

fn print_report(report: &BuildReport) {
    println!("runtime:  capsule {}", report.runtime_version);
    println!("output:   {}", report.output_dir.display());
    for capsule in &report.capsules {
        println!(
            "{:<6} {} ({}, {} entries)",
            colorize_variant(capsule.variant.as_str()),
            capsule.path.display(),
            format_size(capsule.size),
            capsule.entries
        );
        for companion in &capsule.companions {
            println!("       {}", companion.display());
        }
    }
    if !report.warnings.is_empty() {
        println!("{} warning(s)", report.warnings.len());
    }
}
