//! Raw string classification
//!
//! Dispatch order matters: `*` and `workspace:` are checked before the
//! generic npm grammar, exact versions before ranges and ranges before tags.

use super::npm_range::NpmRange;
use super::{Specifier, Variant};
use regex::Regex;
use std::sync::LazyLock;

static EXACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[v=]?(\d+)\.(\d+)\.(\d+)(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?$",
    )
    .unwrap()
});
static PACKAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@[a-z0-9-~][a-z0-9-._~]*/)?[a-z0-9-~][a-z0-9-._~]*$").unwrap()
});
static GIT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:git\+[a-z]+://|git://|git@[^:/]+:|github:|gitlab:|bitbucket:|gist:)").unwrap()
});
static GIT_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z+]+://\S+\.git(?:#.*)?$").unwrap());
static GIT_SHORTHAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][\w.-]*/[\w.-]+(?:#.+)?$").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://\S+$").unwrap());
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-_.!~*'()]+$").unwrap());

const FILE_PREFIXES: [&str; 5] = ["file:", "./", "../", "/", "~/"];

/// Map a raw specifier to its variant
pub(super) fn classify(raw: &str) -> Variant {
    if raw == Specifier::DELETE {
        return Variant::Delete;
    }
    if raw.trim().is_empty() {
        return Variant::Unsupported;
    }
    if raw == "*" {
        return Variant::Latest;
    }
    if let Some(rest) = raw.strip_prefix("workspace:") {
        return classify_workspace(rest);
    }
    if let Some(rest) = raw.strip_prefix("npm:") {
        return classify_alias(rest);
    }
    if FILE_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
        return Variant::File;
    }
    if GIT_PREFIX_RE.is_match(raw) || GIT_SUFFIX_RE.is_match(raw) {
        return Variant::HostedGit;
    }
    if URL_RE.is_match(raw) {
        return Variant::Url;
    }
    if is_exact(raw) {
        return Variant::Exact;
    }
    if NpmRange::parse(raw).is_some() {
        return Variant::Range;
    }
    if GIT_SHORTHAND_RE.is_match(raw) {
        return Variant::HostedGit;
    }
    if TAG_RE.is_match(raw) {
        return Variant::Tag;
    }
    Variant::Unsupported
}

/// Loose exact semver: optional leading `v` or `=`
pub(crate) fn is_exact(raw: &str) -> bool {
    if !EXACT_RE.is_match(raw) {
        return false;
    }
    let bare = raw.trim_start_matches(['v', '=']);
    semver::Version::parse(bare).is_ok()
}

/// True for text a semver-bearing specifier can hold: `*`, exact or range
fn is_semver_text(text: &str) -> bool {
    text == "*" || is_exact(text) || NpmRange::parse(text).is_some()
}

fn classify_workspace(rest: &str) -> Variant {
    if matches!(rest, "*" | "^" | "~") || is_semver_text(rest) {
        Variant::WorkspaceProtocol {
            semver: rest.to_string(),
        }
    } else {
        Variant::Unsupported
    }
}

fn classify_alias(rest: &str) -> Variant {
    // a leading @ belongs to the scope, the version separator comes after it
    let split_at = match rest.strip_prefix('@') {
        Some(scoped) => scoped.find('@').map(|i| i + 1),
        None => rest.find('@'),
    };
    let (name, inner) = match split_at {
        Some(i) => (&rest[..i], &rest[i + 1..]),
        None => (rest, "*"),
    };
    if !PACKAGE_NAME_RE.is_match(name) {
        return Variant::Unsupported;
    }
    let inner = if inner.is_empty() { "*" } else { inner };
    Variant::Alias {
        name: name.to_string(),
        semver: is_semver_text(inner).then(|| inner.to_string()),
    }
}
