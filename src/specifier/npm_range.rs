//! npm range grammar
//!
//! Supports:
//! - Partial and x-ranges: `1`, `1.2`, `1.x`, `1.2.*`, `x`
//! - Comparators: `>`, `>=`, `<`, `<=`, `=`
//! - Caret and tilde: `^1.2.3`, `~1.2`
//! - Hyphen ranges: `1.0.0 - 2.0.0`
//! - Intersections (`>=1.0.0 <2.0.0`) and unions (`^1.0.0 || ^2.0.0`)
//!
//! Every comparator set is reduced to a single interval over [`Version`].

use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::LazyLock;

static PARTIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?(\d+|[xX*])(?:\.(\d+|[xX*]))?(?:\.(\d+|[xX*]))?(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?$",
    )
    .unwrap()
});
static OPERATOR_GAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>=|<=|>|<|=|\^|~>?)\s+").unwrap());
static COERCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)(?:\.(\d+|[xX*]))?(?:\.(\d+|[xX*]))?(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?")
        .unwrap()
});

/// A parsed npm range: a union of intervals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    sets: Vec<Interval>,
}

impl NpmRange {
    /// Parse an npm range. Returns None when the text is not valid range syntax.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let normalized = close_operator_gaps(text);
        let sets = normalized
            .split("||")
            .map(parse_comparator_set)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { sets })
    }

    /// Returns true if `version` falls inside any interval
    pub fn satisfies(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.contains(version))
    }

    /// Returns true if some version could satisfy both ranges
    pub fn intersects(&self, other: &NpmRange) -> bool {
        self.sets
            .iter()
            .any(|a| other.sets.iter().any(|b| !a.intersect(b).is_empty()))
    }
}

/// `>= 1.2.3` becomes `>=1.2.3`
pub(super) fn close_operator_gaps(text: &str) -> Cow<'_, str> {
    OPERATOR_GAP_RE.replace_all(text, "$1")
}

/// Coerce the first version-like fragment of `text` into a full version.
/// Missing or wildcard parts become zero.
pub fn coerce(text: &str) -> Option<Version> {
    let caps = COERCE_RE.captures(text)?;
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let mut version = Version::new(part(1), part(2), part(3));
    let has_patch = caps
        .get(3)
        .map(|m| m.as_str().chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false);
    if has_patch {
        if let Some(pre) = caps.get(4) {
            version.pre = Prerelease::new(pre.as_str()).unwrap_or(Prerelease::EMPTY);
        }
    }
    Some(version)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: Version,
    inclusive: bool,
}

/// A contiguous set of versions; `None` bounds are unbounded
#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Interval {
    fn any() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    fn none() -> Self {
        Self::below(Version::new(0, 0, 0), false)
            .intersect(&Self::at_least(Version::new(0, 0, 0), true))
    }

    fn exact(version: Version) -> Self {
        Self {
            lower: Some(Bound {
                version: version.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version,
                inclusive: true,
            }),
        }
    }

    fn at_least(version: Version, inclusive: bool) -> Self {
        Self {
            lower: Some(Bound { version, inclusive }),
            upper: None,
        }
    }

    fn below(version: Version, inclusive: bool) -> Self {
        Self {
            lower: None,
            upper: Some(Bound { version, inclusive }),
        }
    }

    /// `[from, to)`
    fn between(from: Version, to: Version) -> Self {
        Self {
            lower: Some(Bound {
                version: from,
                inclusive: true,
            }),
            upper: Some(Bound {
                version: to,
                inclusive: false,
            }),
        }
    }

    fn contains(&self, version: &Version) -> bool {
        let above = match &self.lower {
            Some(b) if b.inclusive => version >= &b.version,
            Some(b) => version > &b.version,
            None => true,
        };
        let under = match &self.upper {
            Some(b) if b.inclusive => version <= &b.version,
            Some(b) => version < &b.version,
            None => true,
        };
        above && under
    }

    fn intersect(&self, other: &Interval) -> Interval {
        let lower = match (&self.lower, &other.lower) {
            (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
                Ordering::Greater => a.clone(),
                Ordering::Less => b.clone(),
                Ordering::Equal => Bound {
                    version: a.version.clone(),
                    inclusive: a.inclusive && b.inclusive,
                },
            }),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        let upper = match (&self.upper, &other.upper) {
            (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
                Ordering::Less => a.clone(),
                Ordering::Greater => b.clone(),
                Ordering::Equal => Bound {
                    version: a.version.clone(),
                    inclusive: a.inclusive && b.inclusive,
                },
            }),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        Interval { lower, upper }
    }

    fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => match lo.version.cmp(&hi.version) {
                Ordering::Greater => true,
                Ordering::Equal => !(lo.inclusive && hi.inclusive),
                Ordering::Less => false,
            },
            _ => false,
        }
    }
}

/// A version with possibly missing or wildcard parts
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(text: &str) -> Option<Self> {
        let caps = PARTIAL_RE.captures(text)?;
        let number = |i: usize| -> Option<Option<u64>> {
            match caps.get(i) {
                None => Some(None),
                Some(m) if matches!(m.as_str(), "x" | "X" | "*") => Some(None),
                Some(m) => m.as_str().parse().ok().map(Some),
            }
        };
        let major = number(1)?;
        let minor = number(2)?;
        let patch = number(3)?;
        // a wildcard swallows everything after it
        let minor = major.and(minor);
        let patch = minor.and(patch);
        let pre = match caps.get(4) {
            Some(m) if patch.is_some() => Prerelease::new(m.as_str()).ok()?,
            _ => Prerelease::EMPTY,
        };
        Some(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    /// Missing parts filled with zero
    fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone(),
            build: BuildMetadata::EMPTY,
        }
    }

    /// First version above every version matching this partial
    fn ceiling(&self) -> Option<Version> {
        match (self.major, self.minor) {
            (None, _) => None,
            (Some(major), None) => Some(Version::new(major.saturating_add(1), 0, 0)),
            (Some(major), Some(minor)) => Some(Version::new(major, minor.saturating_add(1), 0)),
        }
    }

    fn is_full(&self) -> bool {
        self.patch.is_some()
    }
}

fn parse_comparator_set(text: &str) -> Option<Interval> {
    let text = text.trim();
    if text.is_empty() {
        return Some(Interval::any());
    }
    if let Some((from, to)) = text.split_once(" - ") {
        return parse_hyphen(from.trim(), to.trim());
    }
    text.split_whitespace()
        .map(parse_comparator)
        .try_fold(Interval::any(), |acc, next| Some(acc.intersect(&next?)))
}

fn parse_hyphen(from: &str, to: &str) -> Option<Interval> {
    let from = Partial::parse(from)?;
    let to = Partial::parse(to)?;
    let lower = if from.major.is_some() {
        Interval::at_least(from.floor(), true)
    } else {
        Interval::any()
    };
    let upper = if to.is_full() {
        Interval::below(to.floor(), true)
    } else {
        match to.ceiling() {
            Some(ceiling) => Interval::below(ceiling, false),
            None => Interval::any(),
        }
    };
    Some(lower.intersect(&upper))
}

fn parse_comparator(text: &str) -> Option<Interval> {
    let (operator, rest) = split_operator(text);
    let partial = Partial::parse(rest)?;
    let interval = match operator {
        "" | "=" => x_range(&partial),
        "^" => caret(&partial),
        "~" | "~>" => tilde(&partial),
        ">" => match (partial.is_full(), partial.ceiling()) {
            (true, _) => Interval::at_least(partial.floor(), false),
            (false, Some(ceiling)) => Interval::at_least(ceiling, true),
            (false, None) => Interval::none(),
        },
        ">=" => match partial.major {
            Some(_) => Interval::at_least(partial.floor(), true),
            None => Interval::any(),
        },
        "<" => match partial.major {
            Some(_) => Interval::below(partial.floor(), false),
            None => Interval::none(),
        },
        "<=" => match (partial.is_full(), partial.ceiling()) {
            (true, _) => Interval::below(partial.floor(), true),
            (false, Some(ceiling)) => Interval::below(ceiling, false),
            (false, None) => Interval::any(),
        },
        _ => return None,
    };
    Some(interval)
}

fn split_operator(text: &str) -> (&str, &str) {
    for operator in [">=", "<=", "~>", ">", "<", "=", "^", "~"] {
        if let Some(rest) = text.strip_prefix(operator) {
            return (operator, rest);
        }
    }
    ("", text)
}

fn x_range(partial: &Partial) -> Interval {
    if partial.is_full() {
        return Interval::exact(partial.floor());
    }
    match partial.ceiling() {
        Some(ceiling) => Interval::between(partial.floor(), ceiling),
        None => Interval::any(),
    }
}

fn caret(partial: &Partial) -> Interval {
    let (Some(major), Some(minor)) = (partial.major, partial.minor) else {
        return x_range(partial);
    };
    let ceiling = if major > 0 {
        Version::new(major.saturating_add(1), 0, 0)
    } else if minor > 0 || partial.patch.is_none() {
        Version::new(0, minor.saturating_add(1), 0)
    } else {
        Version::new(0, 0, partial.patch.unwrap_or(0).saturating_add(1))
    };
    Interval::between(partial.floor(), ceiling)
}

fn tilde(partial: &Partial) -> Interval {
    let (Some(major), Some(minor)) = (partial.major, partial.minor) else {
        return x_range(partial);
    };
    Interval::between(partial.floor(), Version::new(major, minor.saturating_add(1), 0))
}
