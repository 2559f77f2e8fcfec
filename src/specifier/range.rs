//! Semver range prefixes used by semver groups
//!
//! Supported tokens: `''` (exact), `*`, `>`, `>=`, `.x`, `<`, `<=`, `^`, `~`

use super::npm_range::{close_operator_gaps, coerce};
use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// A simple range shape which can be applied to a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemverRange {
    /// `*`
    Any,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `.x`
    Loose,
    /// `^`
    Minor,
    /// `~`
    Patch,
    /// no prefix
    Exact,
    /// `<=`
    Lte,
    /// `<`
    Lt,
}

impl SemverRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemverRange::Any => "*",
            SemverRange::Gt => ">",
            SemverRange::Gte => ">=",
            SemverRange::Loose => ".x",
            SemverRange::Minor => "^",
            SemverRange::Patch => "~",
            SemverRange::Exact => "",
            SemverRange::Lte => "<=",
            SemverRange::Lt => "<",
        }
    }

    /// Tie-break score used when two versions are numerically equal.
    /// Greedier ranges score higher.
    pub fn greediness(&self) -> u8 {
        match self {
            SemverRange::Any => 10,
            SemverRange::Gt => 8,
            SemverRange::Gte => 7,
            SemverRange::Loose => 6,
            SemverRange::Minor => 5,
            SemverRange::Patch => 4,
            SemverRange::Exact => 3,
            SemverRange::Lte => 2,
            SemverRange::Lt => 1,
        }
    }

    /// The leading range of `text`, ignoring anything after the first comparator.
    /// `.x` anywhere wins over a leading operator.
    pub fn detect(text: &str) -> SemverRange {
        let text = text.trim();
        if text == "*" {
            SemverRange::Any
        } else if text.contains(".x") {
            SemverRange::Loose
        } else if text.starts_with(">=") {
            SemverRange::Gte
        } else if text.starts_with("<=") {
            SemverRange::Lte
        } else if text.starts_with('>') {
            SemverRange::Gt
        } else if text.starts_with('<') {
            SemverRange::Lt
        } else if text.starts_with('^') {
            SemverRange::Minor
        } else if text.starts_with('~') {
            SemverRange::Patch
        } else {
            SemverRange::Exact
        }
    }

    /// Apply this range to the semver text of a specifier.
    ///
    /// `*` and complex ranges (`>=1 <2`, `||`, hyphen ranges) are returned unchanged.
    pub fn apply(&self, text: &str) -> String {
        let raw = text.trim();
        let normalized = close_operator_gaps(raw);
        let text = normalized.as_ref();
        if text == "*" || is_complex(text) {
            return raw.to_string();
        }
        let Some(version) = bare_version(text) else {
            return text.to_string();
        };
        match self {
            SemverRange::Any => "*".to_string(),
            SemverRange::Loose => {
                let major = coerce(&version).map(|v| v.major).unwrap_or(0);
                format!("{}.x.x", major)
            }
            other => format!("{}{}", other.as_str(), version),
        }
    }
}

impl FromStr for SemverRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "*" => Ok(SemverRange::Any),
            ">" => Ok(SemverRange::Gt),
            ">=" => Ok(SemverRange::Gte),
            ".x" => Ok(SemverRange::Loose),
            "^" => Ok(SemverRange::Minor),
            "~" => Ok(SemverRange::Patch),
            "" => Ok(SemverRange::Exact),
            "<=" => Ok(SemverRange::Lte),
            "<" => Ok(SemverRange::Lt),
            _ => Err(ConfigError::InvalidSemverRange {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SemverRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_complex(text: &str) -> bool {
    text.contains("||") || text.contains(' ')
}

/// The version portion of a simple range, with wildcards expanded to a full version
fn bare_version(text: &str) -> Option<String> {
    let stripped = text.trim_start_matches(['>', '<', '=', '^', '~', 'v']);
    if stripped.is_empty() {
        return None;
    }
    if stripped.contains(['x', 'X', '*']) || stripped.matches('.').count() < 2 {
        return coerce(stripped).map(|v| v.to_string());
    }
    Some(stripped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("^".parse::<SemverRange>().unwrap(), SemverRange::Minor);
        assert_eq!("".parse::<SemverRange>().unwrap(), SemverRange::Exact);
        assert_eq!(".x".parse::<SemverRange>().unwrap(), SemverRange::Loose);
        assert!("^^".parse::<SemverRange>().is_err());
        assert!("x".parse::<SemverRange>().is_err());
    }

    #[test]
    fn test_as_str_round_trip() {
        for range in [
            SemverRange::Any,
            SemverRange::Gt,
            SemverRange::Gte,
            SemverRange::Loose,
            SemverRange::Minor,
            SemverRange::Patch,
            SemverRange::Exact,
            SemverRange::Lte,
            SemverRange::Lt,
        ] {
            assert_eq!(range.as_str().parse::<SemverRange>().unwrap(), range);
        }
    }

    #[test]
    fn test_greediness_order() {
        let ordered = [
            SemverRange::Any,
            SemverRange::Gt,
            SemverRange::Gte,
            SemverRange::Loose,
            SemverRange::Minor,
            SemverRange::Patch,
            SemverRange::Exact,
            SemverRange::Lte,
            SemverRange::Lt,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].greediness() > pair[1].greediness());
        }
    }

    #[test]
    fn test_detect() {
        assert_eq!(SemverRange::detect("*"), SemverRange::Any);
        assert_eq!(SemverRange::detect("^1.0.0"), SemverRange::Minor);
        assert_eq!(SemverRange::detect("~1.0.0"), SemverRange::Patch);
        assert_eq!(SemverRange::detect(">=1.0.0"), SemverRange::Gte);
        assert_eq!(SemverRange::detect(">1.0.0"), SemverRange::Gt);
        assert_eq!(SemverRange::detect("<=1.0.0"), SemverRange::Lte);
        assert_eq!(SemverRange::detect("<1.0.0"), SemverRange::Lt);
        assert_eq!(SemverRange::detect("1.0.0"), SemverRange::Exact);
        assert_eq!(SemverRange::detect("1.x"), SemverRange::Loose);
        assert_eq!(SemverRange::detect(">1.x.x"), SemverRange::Loose);
    }

    #[test]
    fn test_apply() {
        assert_eq!(SemverRange::Minor.apply("1.2.3"), "^1.2.3");
        assert_eq!(SemverRange::Patch.apply("^1.2.3"), "~1.2.3");
        assert_eq!(SemverRange::Exact.apply(">=1.2.3"), "1.2.3");
        assert_eq!(SemverRange::Gte.apply("~1.2.3"), ">=1.2.3");
        assert_eq!(SemverRange::Lt.apply("1.2.3"), "<1.2.3");
        assert_eq!(SemverRange::Any.apply("0.0.1"), "*");
        assert_eq!(SemverRange::Loose.apply("1.2.3"), "1.x.x");
        assert_eq!(SemverRange::Minor.apply("1.x"), "^1.0.0");
        assert_eq!(SemverRange::Exact.apply("v1.2.3"), "1.2.3");
        assert_eq!(SemverRange::Minor.apply("1.2.3-rc.1"), "^1.2.3-rc.1");
        assert_eq!(SemverRange::Minor.apply(">= 1.2.3"), "^1.2.3");
        assert_eq!(SemverRange::Exact.apply("^ 1.2.3"), "1.2.3");
    }

    #[test]
    fn test_apply_leaves_complex_ranges() {
        assert_eq!(SemverRange::Minor.apply("*"), "*");
        assert_eq!(SemverRange::Exact.apply(">=1.0.0 <2.0.0"), ">=1.0.0 <2.0.0");
        assert_eq!(SemverRange::Exact.apply(">= 1.0.0 < 2.0.0"), ">= 1.0.0 < 2.0.0");
        assert_eq!(SemverRange::Minor.apply("^1.0.0 || ^2.0.0"), "^1.0.0 || ^2.0.0");
        assert_eq!(SemverRange::Patch.apply("1.0.0 - 2.0.0"), "1.0.0 - 2.0.0");
    }

    #[test]
    fn test_apply_is_idempotent() {
        let inputs = ["1.2.3", "^1.2.3", "1.x", "~1.2", ">=1.0.0"];
        let ranges = [
            SemverRange::Any,
            SemverRange::Loose,
            SemverRange::Minor,
            SemverRange::Exact,
            SemverRange::Lte,
        ];
        for input in inputs {
            for range in ranges {
                let once = range.apply(input);
                assert_eq!(range.apply(&once), once, "{} {}", range, input);
            }
        }
    }
}
