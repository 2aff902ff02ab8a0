//! Rendering of project data into space-separated manifest values.

use crate::{Dependency, Property, Repository};

/// `group:artifact:version`, followed by `(g:a,g:a)` when exclusions exist.
pub fn render_dependency(dep: &Dependency) -> String {
    let mut coords = format!("{}:{}:{}", dep.group_id, dep.artifact_id, dep.version);
    if !dep.exclusions.is_empty() {
        let exclusions: Vec<String> = dep
            .exclusions
            .iter()
            .map(|e| format!("{}:{}", e.group_id, e.artifact_id))
            .collect();
        coords.push('(');
        coords.push_str(&exclusions.join(","));
        coords.push(')');
    }
    coords
}

/// Launch-scoped (compile and runtime) dependencies only.
pub fn render_dependencies(deps: &[Dependency]) -> String {
    deps.iter()
        .filter(|d| d.scope.is_launch_scope())
        .map(render_dependency)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `id(url)` for each repository.
pub fn render_repositories(repos: &[Repository]) -> String {
    repos
        .iter()
        .map(|r| format!("{}({})", r.id, r.url))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `key=value` for each property with a non-empty key.
pub fn render_properties(props: &[Property]) -> String {
    props
        .iter()
        .filter(|p| !p.key.is_empty())
        .map(|p| format!("{}={}", p.key, p.value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Launch arguments with embedded spaces stripped, space separated.
pub fn render_arguments(args: &[String]) -> String {
    args.iter()
        .map(|a| a.replace(' ', ""))
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
