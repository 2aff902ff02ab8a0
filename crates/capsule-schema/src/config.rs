use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to parse project descriptor: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("appClass not set (or could not be obtained from the exec plugin mainClass)")]
    MissingAppClass,
}

/// Capsule build configuration, usually read from `capsule.toml`.
///
/// Every field is optional; CLI flags are applied on top of the parsed file.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CapsuleConfig {
    #[serde(default)]
    pub app_class: Option<String>,
    #[serde(default)]
    pub capsule_version: Option<String>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub descriptors: Descriptors,
    /// Deprecated spelling of `chmod`.
    #[serde(default)]
    pub build_exec: Flag,
    #[serde(default)]
    pub chmod: Flag,
    #[serde(default)]
    pub trampoline: Flag,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub caplets: Option<String>,
    #[serde(default)]
    pub exec_plugin_config: Option<String>,
    /// `None` means "not configured", which lets the exec plugin supply
    /// system properties instead.
    #[serde(default)]
    pub properties: Option<Vec<Property>>,
    #[serde(default)]
    pub manifest: Vec<Property>,
    #[serde(default)]
    pub modes: Vec<ModeConfig>,
    #[serde(default)]
    pub file_sets: Vec<FileSet>,
}

/// Output name suffixes, one per variant.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Descriptors {
    #[serde(default = "default_empty_descriptor")]
    pub empty: String,
    #[serde(default = "default_thin_descriptor")]
    pub thin: String,
    #[serde(default = "default_fat_descriptor")]
    pub fat: String,
}

impl Default for Descriptors {
    fn default() -> Self {
        Self {
            empty: default_empty_descriptor(),
            thin: default_thin_descriptor(),
            fat: default_fat_descriptor(),
        }
    }
}

fn default_empty_descriptor() -> String {
    "-capsule-empty".to_owned()
}

fn default_thin_descriptor() -> String {
    "-capsule-thin".to_owned()
}

fn default_fat_descriptor() -> String {
    "-capsule-fat".to_owned()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Property {
    pub key: String,
    pub value: String,
}

impl Property {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_owned(),
            value: value.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ModeConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub manifest: Vec<Property>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileSet {
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub output_directory: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
}

impl FileSet {
    /// Destination prefix inside the archive, always ending in `/` when set.
    pub fn normalized_prefix(&self) -> String {
        match self.output_directory.as_deref() {
            None | Some("") => String::new(),
            Some(dir) if dir.ends_with('/') => dir.to_owned(),
            Some(dir) => format!("{dir}/"),
        }
    }
}

/// Boolean option that also accepts the legacy string spellings `"true"`,
/// `"false"`, `"1"` and `"0"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Flag(bool);

impl Flag {
    pub fn new(value: bool) -> Self {
        Self(value)
    }

    pub fn is_set(self) -> bool {
        self.0
    }

    fn from_text(value: &str) -> Option<Self> {
        match value.trim() {
            "true" | "1" => Some(Self(true)),
            "false" | "0" | "" => Some(Self(false)),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(Self(b)),
            // toml reports the offending key alongside this error
            Raw::Text(s) => Self::from_text(&s).ok_or_else(|| {
                serde::de::Error::invalid_value(
                    serde::de::Unexpected::Str(&s),
                    &"true, false, \"1\" or \"0\"",
                )
            }),
        }
    }
}

pub fn parse_config_str(input: &str) -> Result<CapsuleConfig, ConfigError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<CapsuleConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let input = r#"
app_class = "com.acme.Main"
capsule_version = "1.0.3"
output = "target/capsules"
chmod = true
trampoline = "1"
types = "thin fat"
caplets = "MyCaplet OtherCaplet"
exec_plugin_config = "root"

[descriptors]
fat = "-all"

[[properties]]
key = "log.level"
value = "debug"

[[manifest]]
key = "Min-Java-Version"
value = "1.8.0"

[[modes]]
name = "debug"
properties = [{ key = "trace", value = "on" }]
manifest = [{ key = "JVM-Args", value = "-Xdebug" }]

[[file_sets]]
directory = "config"
output_directory = "etc"
includes = ["app.conf"]
"#;
        let config = parse_config_str(input).expect("should parse");
        assert_eq!(config.app_class.as_deref(), Some("com.acme.Main"));
        assert!(config.chmod.is_set());
        assert!(config.trampoline.is_set());
        assert!(!config.build_exec.is_set());
        assert_eq!(config.descriptors.fat, "-all");
        assert_eq!(config.descriptors.thin, "-capsule-thin");
        assert_eq!(config.properties.as_ref().map(Vec::len), Some(1));
        assert_eq!(config.modes[0].name.as_deref(), Some("debug"));
        assert_eq!(config.file_sets[0].includes, vec!["app.conf"]);
    }

    #[test]
    fn parses_empty_config() {
        let config = parse_config_str("").expect("should parse");
        assert_eq!(config, CapsuleConfig::default());
        assert!(config.properties.is_none());
        assert_eq!(config.descriptors.empty, "-capsule-empty");
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(parse_config_str("app_klass = \"x\"").is_err());
    }

    #[test]
    fn rejects_garbage_flag() {
        let err = parse_config_str("chmod = \"maybe\"").unwrap_err().to_string();
        assert!(err.contains("chmod"), "{err}");
        assert!(err.contains("maybe"), "{err}");
        assert!(!err.contains("'flag'"), "{err}");
    }

    #[test]
    fn flag_parse_accepts_legacy_spellings() {
        assert!(Flag::from_text("1").unwrap().is_set());
        assert!(Flag::from_text(" true ").unwrap().is_set());
        assert!(!Flag::from_text("0").unwrap().is_set());
        assert!(!Flag::from_text("").unwrap().is_set());
        assert!(Flag::from_text("yes").is_none());
    }

    #[test]
    fn file_set_prefix_normalized() {
        let mut fs = FileSet {
            directory: "d".to_owned(),
            output_directory: Some("conf".to_owned()),
            includes: Vec::new(),
        };
        assert_eq!(fs.normalized_prefix(), "conf/");
        fs.output_directory = Some("conf/".to_owned());
        assert_eq!(fs.normalized_prefix(), "conf/");
        fs.output_directory = None;
        assert_eq!(fs.normalized_prefix(), "");
    }
}
