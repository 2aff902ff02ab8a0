use super::{json_pretty, EXIT_SUCCESS};
use capsule_archive::{ArchiveReader, Attributes, EXEC_PREFIX, EXEC_TRAMPOLINE_PREFIX};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct Attribute<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct Section<'a> {
    name: &'a str,
    attributes: Vec<Attribute<'a>>,
}

#[derive(Debug, Serialize)]
struct Inspection<'a> {
    path: &'a Path,
    launcher: &'static str,
    main: Vec<Attribute<'a>>,
    sections: Vec<Section<'a>>,
    entry_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<&'a [String]>,
}

fn attributes(attrs: &Attributes) -> Vec<Attribute<'_>> {
    attrs
        .iter()
        .map(|(name, value)| Attribute { name, value })
        .collect()
}

fn launcher(prefix: Option<&str>) -> &'static str {
    match prefix {
        Some(p) if p == EXEC_TRAMPOLINE_PREFIX => "trampoline",
        Some(p) if p == EXEC_PREFIX => "executable",
        _ => "jar",
    }
}

pub fn run(archive: &Path, list_entries: bool, json: bool) -> Result<u8, String> {
    let mut reader = ArchiveReader::open(archive).map_err(|e| e.to_string())?;
    let names = reader.entry_names().map_err(|e| e.to_string())?;
    let manifest = reader
        .manifest()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("{} has no manifest", archive.display()))?;

    let inspection = Inspection {
        path: archive,
        launcher: launcher(reader.exec_prefix()),
        main: attributes(manifest.main()),
        sections: manifest
            .sections()
            .map(|(name, attrs)| Section {
                name,
                attributes: attributes(attrs),
            })
            .collect(),
        entry_count: names.len(),
        entries: list_entries.then_some(names.as_slice()),
    };

    if json {
        println!("{}", json_pretty(&inspection)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("archive:  {}", archive.display());
    println!("launcher: {}", inspection.launcher);
    println!("entries:  {}", inspection.entry_count);
    println!();
    for attr in &inspection.main {
        println!("{}: {}", attr.name, attr.value);
    }
    for section in &inspection.sections {
        println!();
        println!("[{}]", section.name);
        for attr in &section.attributes {
            println!("  {}: {}", attr.name, attr.value);
        }
    }
    if let Some(entries) = inspection.entries {
        println!();
        for name in entries {
            println!("{name}");
        }
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_kinds() {
        assert_eq!(launcher(None), "jar");
        assert_eq!(launcher(Some(EXEC_PREFIX)), "executable");
        assert_eq!(launcher(Some(EXEC_TRAMPOLINE_PREFIX)), "trampoline");
    }

    #[test]
    fn missing_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("nope.jar"), false, true).is_err());
    }
}
