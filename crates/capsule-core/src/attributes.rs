//! Manifest attribute computation for each capsule variant.

use capsule_archive::{Attributes, Manifest, ManifestError, RUNTIME_MAIN_CLASS};
use capsule_schema::{
    render_arguments, render_dependencies, render_properties, render_repositories, CapsuleConfig,
    ExecConfiguration, ModeConfig, Project, Variant,
};
use serde::Serialize;
use tracing::debug;

pub const MANIFEST_VERSION: &str = "1.0";

/// Attribute values computed once per build and shared by every variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SharedAttributes {
    pub app_class: String,
    /// Rendered `k=v` list; empty when nothing is configured.
    pub system_properties: String,
    pub jvm_args: String,
    /// Matched caplet fragments, space separated.
    pub caplets: String,
}

impl SharedAttributes {
    /// Derive shared values from the configuration and the selected exec
    /// configuration. Configured properties take precedence over the exec
    /// plugin's system properties even when the configured list is empty.
    pub fn compute(
        app_class: &str,
        config: &CapsuleConfig,
        exec: Option<&ExecConfiguration>,
        caplets: &[String],
    ) -> Self {
        let system_properties = match (&config.properties, exec) {
            (Some(props), _) => render_properties(props),
            (None, Some(exec)) => render_properties(&exec.system_properties),
            (None, None) => String::new(),
        };
        let jvm_args = exec
            .map(|e| render_arguments(&e.arguments))
            .unwrap_or_default();
        Self {
            app_class: app_class.to_owned(),
            system_properties,
            jvm_args,
            caplets: caplets.join(" "),
        }
    }
}

/// Attributes specific to one variant, in insertion order, empty values omitted.
pub fn variant_attributes(variant: Variant, project: &Project) -> Vec<(&'static str, String)> {
    let attrs = match variant {
        Variant::Empty => vec![
            ("Application", project.coordinate().to_string()),
            ("Repositories", render_repositories(&project.repositories)),
        ],
        Variant::Thin => vec![
            ("Dependencies", render_dependencies(&project.dependencies)),
            ("Repositories", render_repositories(&project.repositories)),
        ],
        Variant::Fat => Vec::new(),
    };
    attrs.into_iter().filter(|(_, v)| !v.is_empty()).collect()
}

fn insert_if_present(
    attrs: &mut Attributes,
    name: &str,
    value: &str,
) -> Result<(), ManifestError> {
    if value.is_empty() {
        return Ok(());
    }
    attrs.insert(name, value)
}

/// Section for a named mode, or `None` when the mode is unnamed or would
/// produce no attributes.
pub fn mode_section(mode: &ModeConfig) -> Result<Option<(String, Attributes)>, ManifestError> {
    let Some(name) = mode.name.as_deref().filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    let mut attrs = Attributes::new();
    for entry in &mode.manifest {
        attrs.insert(&entry.key, entry.value.as_str())?;
    }
    insert_if_present(
        &mut attrs,
        "System-Properties",
        &render_properties(&mode.properties),
    )?;
    if attrs.is_empty() {
        return Ok(None);
    }
    Ok(Some((name.to_owned(), attrs)))
}

/// Build the full manifest for `variant`.
///
/// User-declared entries are applied after every computed attribute, so they
/// replace computed values of the same name.
pub fn build_manifest(
    shared: &SharedAttributes,
    variant: Variant,
    project: &Project,
    config: &CapsuleConfig,
) -> Result<Manifest, ManifestError> {
    let mut manifest = Manifest::new();
    let main = manifest.main_mut();
    main.insert("Manifest-Version", MANIFEST_VERSION)?;
    main.insert("Main-Class", RUNTIME_MAIN_CLASS)?;
    main.insert("Application-Class", shared.app_class.as_str())?;
    main.insert(
        "Application-Name",
        variant.output_name(&project.final_name, &config.descriptors),
    )?;
    insert_if_present(main, "System-Properties", &shared.system_properties)?;
    insert_if_present(main, "JVM-Args", &shared.jvm_args)?;
    for (name, value) in variant_attributes(variant, project) {
        main.insert(name, value)?;
    }
    insert_if_present(main, "Caplets", &shared.caplets)?;
    for entry in &config.manifest {
        main.insert(&entry.key, entry.value.as_str())?;
    }

    for mode in &config.modes {
        if let Some((name, attrs)) = mode_section(mode)? {
            manifest.add_section(&name, attrs)?;
        }
    }

    debug!("{variant} capsule manifest:\n{manifest}");
    Ok(manifest)
}
