//! Jar manifest model: a main attribute section plus named sections.
//!
//! Rendering follows the jar manifest text format: `Name: Value` lines ending
//! in CRLF, wrapped at 72 bytes with a single-space continuation, and a blank
//! line after every section.

use std::fmt;
use thiserror::Error;

/// Conventional archive path of the manifest. Always the first entry.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const MAX_LINE: usize = 72;
const MAX_NAME: usize = 70;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("invalid manifest attribute name: '{0}'")]
    InvalidAttributeName(String),
    #[error("invalid value for manifest attribute '{0}': line breaks and NUL are not allowed")]
    InvalidAttributeValue(String),
    #[error("invalid manifest section name: '{0}'")]
    InvalidSectionName(String),
    #[error("malformed manifest line {line}: '{content}'")]
    MalformedLine { line: usize, content: String },
    #[error("manifest section at line {0} does not start with a Name attribute")]
    MissingSectionName(usize),
    #[error("manifest is not valid UTF-8")]
    InvalidUtf8,
}

fn validate_name(name: &str) -> Result<(), ManifestError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(ManifestError::InvalidAttributeName(name.to_owned()))
    }
}

fn has_forbidden_char(s: &str) -> bool {
    s.contains(['\r', '\n', '\0'])
}

/// Ordered attribute map with case-insensitive names.
///
/// Re-inserting an existing name replaces the value in place, so the first
/// insertion decides the position and the last one decides the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Result<(), ManifestError> {
        validate_name(name)?;
        let value = value.into();
        if has_forbidden_char(&value) {
            return Err(ManifestError::InvalidAttributeValue(name.to_owned()));
        }
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
        } else {
            self.entries.push((name.to_owned(), value));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    sections: Vec<(String, Attributes)>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main(&self) -> &Attributes {
        &self.main
    }

    pub fn main_mut(&mut self) -> &mut Attributes {
        &mut self.main
    }

    /// Add a named section, replacing any previous section of the same name.
    pub fn add_section(&mut self, name: &str, attrs: Attributes) -> Result<(), ManifestError> {
        if name.is_empty() || has_forbidden_char(name) {
            return Err(ManifestError::InvalidSectionName(name.to_owned()));
        }
        if let Some(slot) = self.sections.iter_mut().find(|(n, _)| n == name) {
            slot.1 = attrs;
        } else {
            self.sections.push((name.to_owned(), attrs));
        }
        Ok(())
    }

    pub fn section(&self, name: &str) -> Option<&Attributes> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.sections.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        for (k, v) in self.main.iter() {
            write_line(&mut out, k, v);
        }
        out.push_str("\r\n");
        for (name, attrs) in &self.sections {
            write_line(&mut out, "Name", name);
            for (k, v) in attrs.iter() {
                write_line(&mut out, k, v);
            }
            out.push_str("\r\n");
        }
        out.into_bytes()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ManifestError::InvalidUtf8)?;
        let lines = unfold_lines(text)?;

        let mut manifest = Manifest::new();
        let mut current: Option<(String, Attributes)> = None;
        let mut in_main = true;
        let mut section_start = true;

        for (line_no, line) in lines {
            if line.is_empty() {
                if let Some((name, attrs)) = current.take() {
                    manifest.add_section(&name, attrs)?;
                }
                in_main = false;
                section_start = true;
                continue;
            }

            let (key, value) = split_attribute(line_no, &line)?;
            if in_main {
                manifest.main.insert(key, value)?;
            } else if section_start {
                if !key.eq_ignore_ascii_case("Name") {
                    return Err(ManifestError::MissingSectionName(line_no));
                }
                current = Some((value.to_owned(), Attributes::new()));
            } else if let Some((_, attrs)) = current.as_mut() {
                attrs.insert(key, value)?;
            }
            section_start = false;
        }

        if let Some((name, attrs)) = current.take() {
            manifest.add_section(&name, attrs)?;
        }
        Ok(manifest)
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.main.iter() {
            writeln!(f, "\t{k}: {v}")?;
        }
        for (name, attrs) in &self.sections {
            writeln!(f, "Name: {name}")?;
            for (k, v) in attrs.iter() {
                writeln!(f, "\t{k}: {v}")?;
            }
        }
        Ok(())
    }
}

/// Write `key: value` wrapped at 72 bytes, never splitting a UTF-8 character.
fn write_line(out: &mut String, key: &str, value: &str) {
    let line = format!("{key}: {value}");
    let mut rest = line.as_str();
    let mut limit = MAX_LINE;
    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str("\r\n");
            return;
        }
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        // continuation lines carry the leading space
        limit = MAX_LINE - 1;
    }
}

/// Join continuation lines. Returns (first line number, logical line).
fn unfold_lines(text: &str) -> Result<Vec<(usize, String)>, ManifestError> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (idx, raw) in text.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(cont) = raw.strip_prefix(' ') {
            match lines.last_mut() {
                Some((_, prev)) if !prev.is_empty() => prev.push_str(cont),
                _ => {
                    return Err(ManifestError::MalformedLine {
                        line: idx + 1,
                        content: raw.to_owned(),
                    })
                }
            }
        } else {
            lines.push((idx + 1, raw.to_owned()));
        }
    }
    while lines.last().is_some_and(|(_, l)| l.is_empty()) {
        lines.pop();
    }
    Ok(lines)
}

fn split_attribute(line_no: usize, line: &str) -> Result<(&str, &str), ManifestError> {
    line.split_once(": ")
        .ok_or_else(|| ManifestError::MalformedLine {
            line: line_no,
            content: line.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        let mut m = Manifest::new();
        m.main_mut().insert("Manifest-Version", "1.0").unwrap();
        m.main_mut().insert("Main-Class", "Capsule").unwrap();
        m.main_mut()
            .insert("Application-Class", "com.acme.Main")
            .unwrap();
        let mut debug = Attributes::new();
        debug.insert("System-Properties", "trace=on").unwrap();
        m.add_section("debug", debug).unwrap();
        m
    }

    #[test]
    fn render_starts_with_version() {
        let text = String::from_utf8(sample().to_bytes()).unwrap();
        assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
        assert!(text.contains("\r\n\r\nName: debug\r\nSystem-Properties: trace=on\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn parse_roundtrip() {
        let m = sample();
        let parsed = Manifest::parse(&m.to_bytes()).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn roundtrip_ignores_insertion_order() {
        let mut a = Manifest::new();
        a.main_mut().insert("A-One", "1").unwrap();
        a.main_mut().insert("B-Two", "2").unwrap();
        let mut b = Manifest::new();
        b.main_mut().insert("B-Two", "2").unwrap();
        b.main_mut().insert("A-One", "1").unwrap();

        let pa = Manifest::parse(&a.to_bytes()).unwrap();
        let pb = Manifest::parse(&b.to_bytes()).unwrap();
        for (k, v) in pa.main().iter() {
            assert_eq!(pb.main().get(k), Some(v));
        }
        assert_eq!(pa.main().len(), pb.main().len());
    }

    #[test]
    fn long_values_wrap_and_unwrap() {
        let long = "g:a:1.0 ".repeat(40);
        let mut m = Manifest::new();
        m.main_mut().insert("Dependencies", long.clone()).unwrap();
        let bytes = m.to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap();
        for line in text.split("\r\n") {
            assert!(line.len() <= MAX_LINE, "line too long: {}", line.len());
        }
        let parsed = Manifest::parse(&bytes).unwrap();
        assert_eq!(parsed.main().get("Dependencies"), Some(long.as_str()));
    }

    #[test]
    fn wrapping_respects_char_boundaries() {
        let value = "é".repeat(80);
        let mut m = Manifest::new();
        m.main_mut().insert("Application-Name", value.clone()).unwrap();
        let parsed = Manifest::parse(&m.to_bytes()).unwrap();
        assert_eq!(parsed.main().get("Application-Name"), Some(value.as_str()));
    }

    #[test]
    fn insert_is_case_insensitive_last_wins() {
        let mut attrs = Attributes::new();
        attrs.insert("Main-Class", "Capsule").unwrap();
        attrs.insert("Other", "x").unwrap();
        attrs.insert("main-class", "Custom").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("MAIN-CLASS"), Some("Custom"));
        assert_eq!(attrs.iter().next(), Some(("Main-Class", "Custom")));
    }

    #[test]
    fn invalid_names_rejected() {
        let mut attrs = Attributes::new();
        assert!(attrs.insert("Has Space", "x").is_err());
        assert!(attrs.insert("Has:Colon", "x").is_err());
        assert!(attrs.insert("", "x").is_err());
        assert!(attrs.insert(&"a".repeat(71), "x").is_err());
    }

    #[test]
    fn line_breaks_in_values_rejected() {
        let mut attrs = Attributes::new();
        for bad in ["line1\nline2", "a\rb", "nul\0"] {
            assert_eq!(
                attrs.insert("X-Note", bad),
                Err(ManifestError::InvalidAttributeValue("X-Note".to_owned()))
            );
        }
        assert!(attrs.is_empty());
        let mut m = Manifest::new();
        assert!(m.add_section("a\0b", Attributes::new()).is_err());
    }

    #[test]
    fn parse_accepts_lf_only() {
        let text = "Manifest-Version: 1.0\nMain-Class: Capsule\n\nName: prod\nJVM-Args: -server\n";
        let m = Manifest::parse(text.as_bytes()).unwrap();
        assert_eq!(m.main().get("Main-Class"), Some("Capsule"));
        assert_eq!(m.section("prod").unwrap().get("JVM-Args"), Some("-server"));
    }

    #[test]
    fn parse_rejects_section_without_name() {
        let text = "Manifest-Version: 1.0\r\n\r\nJVM-Args: -server\r\n";
        assert_eq!(
            Manifest::parse(text.as_bytes()),
            Err(ManifestError::MissingSectionName(3))
        );
    }

    #[test]
    fn parse_rejects_line_without_separator() {
        assert!(Manifest::parse(b"Manifest-Version 1.0\r\n").is_err());
    }

    #[test]
    fn add_section_replaces_same_name() {
        let mut m = Manifest::new();
        let mut first = Attributes::new();
        first.insert("A", "1").unwrap();
        m.add_section("mode", first).unwrap();
        let mut second = Attributes::new();
        second.insert("B", "2").unwrap();
        m.add_section("mode", second).unwrap();
        assert_eq!(m.sections().count(), 1);
        assert!(m.section("mode").unwrap().contains("B"));
        assert!(!m.section("mode").unwrap().contains("A"));
    }
}
