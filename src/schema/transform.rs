//! Value transforms applied while walking a field table

use super::error::MapError;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// `"addr mask"` on the wire, optionally `"addr/len"` locally
    Ipv4Classnet,
    /// A block whose wire form depends on the API version
    QuotedNameList { rules: Vec<VersionRule> },
}

/// Wire shape of a `quoted_name_list` field for a range of versions
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VersionRule {
    pub versions: VersionReq,
    pub shape: NameShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameShape {
    /// One bare name
    Single,
    /// Space separated, double-quoted names in one string
    List,
    /// Regular list of records
    Records,
}

/// Parse a FortiOS version string (`v7.2.0`, `7.0`, `v6.4.12`)
pub fn parse_fos_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V']);
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }
    let mut parts = trimmed.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().unwrap_or(Ok(0)).ok()?;
    let patch = parts.next().unwrap_or(Ok(0)).ok()?;
    Some(Version::new(major, minor, patch))
}

/// Pick the wire shape for `version`; the first matching rule wins
pub fn select_shape(
    field: &str,
    rules: &[VersionRule],
    version: Option<&Version>,
) -> Result<NameShape, MapError> {
    let Some(version) = version else {
        return Err(MapError::UnsupportedVersion {
            field: field.to_string(),
            version: "unknown".to_string(),
        });
    };
    rules
        .iter()
        .find(|rule| rule.versions.matches(version))
        .map(|rule| rule.shape)
        .ok_or_else(|| MapError::UnsupportedVersion {
            field: field.to_string(),
            version: version.to_string(),
        })
}

/// Split `"a" "b c" d` into `["a", "b c", "d"]`
pub fn split_quoted_names(raw: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => {
                if in_quotes {
                    names.push(std::mem::take(&mut current));
                }
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    names.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        names.push(current);
    }
    names
}

/// Inverse of [`split_quoted_names`]
pub fn join_quoted_names<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n.as_ref().replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"10.0.0.0 255.255.255.0"` to `"10.0.0.0/24"`. `None` for anything that
/// is not an address followed by a contiguous mask.
pub fn mask_to_cidr(raw: &str) -> Option<String> {
    let mut parts = raw.split_whitespace();
    let addr: Ipv4Addr = parts.next()?.parse().ok()?;
    let mask: Ipv4Addr = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let bits = u32::from(mask);
    if bits.leading_ones() + bits.trailing_zeros() != 32 {
        return None;
    }
    Some(format!("{}/{}", addr, bits.leading_ones()))
}

/// Whether a local value is written in CIDR notation
pub fn is_cidr(raw: &str) -> bool {
    raw.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<VersionRule> {
        vec![
            VersionRule {
                versions: VersionReq::parse(">=6.0.0, <6.2.0").unwrap(),
                shape: NameShape::List,
            },
            VersionRule {
                versions: VersionReq::parse(">=6.2.0").unwrap(),
                shape: NameShape::Records,
            },
        ]
    }

    #[test]
    fn test_parse_fos_version() {
        assert_eq!(parse_fos_version("v7.2.0"), Some(Version::new(7, 2, 0)));
        assert_eq!(parse_fos_version("6.4"), Some(Version::new(6, 4, 0)));
        assert_eq!(parse_fos_version("v6.4.12"), Some(Version::new(6, 4, 12)));
        assert_eq!(parse_fos_version("build1234"), None);
    }

    #[test]
    fn test_select_shape_flags_uncovered_versions() {
        let rules = rules();
        let v60 = Version::new(6, 0, 5);
        let v72 = Version::new(7, 2, 0);
        let v56 = Version::new(5, 6, 0);
        assert_eq!(select_shape("member", &rules, Some(&v60)), Ok(NameShape::List));
        assert_eq!(select_shape("member", &rules, Some(&v72)), Ok(NameShape::Records));
        assert_eq!(
            select_shape("member", &rules, Some(&v56)),
            Err(MapError::UnsupportedVersion {
                field: "member".into(),
                version: "5.6.0".into()
            })
        );
        assert!(select_shape("member", &rules, None).is_err());
    }

    #[test]
    fn test_split_quoted_names() {
        assert_eq!(
            split_quoted_names(r#""port1" "my lan" port3"#),
            vec!["port1", "my lan", "port3"]
        );
        assert_eq!(split_quoted_names(r#""a \"b\"""#), vec![r#"a "b""#]);
        assert!(split_quoted_names("  ").is_empty());
    }

    #[test]
    fn test_join_quoted_names_reverses_split() {
        let names = vec!["port1".to_string(), "my lan".to_string(), r#"x"y"#.to_string()];
        let joined = join_quoted_names(&names);
        assert_eq!(joined, r#""port1" "my lan" "x\"y""#);
        assert_eq!(split_quoted_names(&joined), names);
    }

    #[test]
    fn test_mask_to_cidr() {
        assert_eq!(mask_to_cidr("10.0.0.0 255.255.255.0").as_deref(), Some("10.0.0.0/24"));
        assert_eq!(mask_to_cidr("0.0.0.0 0.0.0.0").as_deref(), Some("0.0.0.0/0"));
        assert_eq!(mask_to_cidr("10.1.2.3 255.255.255.255").as_deref(), Some("10.1.2.3/32"));
        assert_eq!(mask_to_cidr("10.0.0.0 255.0.255.0"), None);
        assert_eq!(mask_to_cidr("10.0.0.0/24"), None);
    }
}
