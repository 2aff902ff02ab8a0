use crate::{Descriptors, Diagnostics, Warning};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three capsule flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Downloads application and dependencies at launch.
    Empty,
    /// Ships the compiled application; dependencies are resolved at launch.
    Thin,
    /// Ships the application and every dependency archive.
    Fat,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Empty, Variant::Thin, Variant::Fat];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Thin => "thin",
            Self::Fat => "fat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "empty" => Some(Self::Empty),
            "thin" => Some(Self::Thin),
            "fat" => Some(Self::Fat),
            _ => None,
        }
    }

    pub fn descriptor(self, descriptors: &Descriptors) -> &str {
        match self {
            Self::Empty => &descriptors.empty,
            Self::Thin => &descriptors.thin,
            Self::Fat => &descriptors.fat,
        }
    }

    /// `{final_name}{descriptor}`, used both as file stem and `Application-Name`.
    pub fn output_name(self, final_name: &str, descriptors: &Descriptors) -> String {
        format!("{final_name}{}", self.descriptor(descriptors))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma/space separated variant filter.
///
/// Returns variants in build order (empty, thin, fat). With no filter, or a
/// filter naming no known variant, all three are selected. Unknown tokens
/// are reported as warnings.
pub fn parse_type_filter(filter: Option<&str>, diagnostics: &mut Diagnostics) -> Vec<Variant> {
    let Some(filter) = filter else {
        return Variant::ALL.to_vec();
    };

    let mut selected = Vec::new();
    for token in filter
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        match Variant::parse(token) {
            Some(v) => {
                if !selected.contains(&v) {
                    selected.push(v);
                }
            }
            None => diagnostics.push(Warning::UnknownVariantType {
                token: token.to_owned(),
            }),
        }
    }

    if selected.is_empty() {
        return Variant::ALL.to_vec();
    }
    selected.sort();
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filter_selects_all() {
        let mut d = Diagnostics::default();
        assert_eq!(parse_type_filter(None, &mut d), Variant::ALL.to_vec());
        assert!(d.is_empty());
    }

    #[test]
    fn single_type_selected() {
        let mut d = Diagnostics::default();
        assert_eq!(parse_type_filter(Some("thin"), &mut d), vec![Variant::Thin]);
    }

    #[test]
    fn mixed_separators_and_order() {
        let mut d = Diagnostics::default();
        assert_eq!(
            parse_type_filter(Some("fat, empty"), &mut d),
            vec![Variant::Empty, Variant::Fat]
        );
    }

    #[test]
    fn unknown_tokens_warned() {
        let mut d = Diagnostics::default();
        assert_eq!(
            parse_type_filter(Some("thin slim"), &mut d),
            vec![Variant::Thin]
        );
        assert_eq!(
            d.warnings(),
            &[Warning::UnknownVariantType {
                token: "slim".to_owned()
            }]
        );
    }

    #[test]
    fn only_unknown_tokens_fall_back_to_all() {
        let mut d = Diagnostics::default();
        assert_eq!(parse_type_filter(Some("bogus"), &mut d), Variant::ALL.to_vec());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn output_name_uses_descriptor() {
        let descriptors = Descriptors::default();
        assert_eq!(
            Variant::Fat.output_name("app-1.0", &descriptors),
            "app-1.0-capsule-fat"
        );
    }
}
