//! Outcome of inspecting one instance

use super::InstanceId;
use crate::specifier::Specifier;
use serde::Serialize;
use std::fmt;

/// Reports which need no action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidKind {
    Valid,
    Disabled,
    FilteredOut,
    Ignored,
}

/// Reports which carry a replacement specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixableKind {
    Banned,
    HighestSemverMismatch,
    LowestSemverMismatch,
    LocalPackageMismatch,
    PinnedMismatch,
    SemverRangeMismatch,
    SnappedToMismatch,
}

/// Reports which need a human
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnfixableKind {
    MissingLocalVersion,
    MissingSnappedToMismatch,
    RefuseToBanLocal,
    RefuseToPinLocal,
    RefuseToSnapLocal,
    /// Raw specifiers of the other instances this one does not intersect
    SameRangeMismatch { mismatches: Vec<String> },
    UnsupportedMismatch,
}

impl ValidKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidKind::Valid => "valid",
            ValidKind::Disabled => "disabled",
            ValidKind::FilteredOut => "filtered-out",
            ValidKind::Ignored => "ignored",
        }
    }
}

impl FixableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixableKind::Banned => "banned",
            FixableKind::HighestSemverMismatch => "highest-semver-mismatch",
            FixableKind::LowestSemverMismatch => "lowest-semver-mismatch",
            FixableKind::LocalPackageMismatch => "local-package-mismatch",
            FixableKind::PinnedMismatch => "pinned-mismatch",
            FixableKind::SemverRangeMismatch => "semver-range-mismatch",
            FixableKind::SnappedToMismatch => "snapped-to-mismatch",
        }
    }
}

impl UnfixableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnfixableKind::MissingLocalVersion => "missing-local-version",
            UnfixableKind::MissingSnappedToMismatch => "missing-snapped-to-mismatch",
            UnfixableKind::RefuseToBanLocal => "refuse-to-ban-local",
            UnfixableKind::RefuseToPinLocal => "refuse-to-pin-local",
            UnfixableKind::RefuseToSnapLocal => "refuse-to-snap-local",
            UnfixableKind::SameRangeMismatch { .. } => "same-range-mismatch",
            UnfixableKind::UnsupportedMismatch => "unsupported-mismatch",
        }
    }
}

/// The judgement on one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Valid {
        kind: ValidKind,
        instance: InstanceId,
    },
    Fixable {
        kind: FixableKind,
        instance: InstanceId,
        fix: Specifier,
    },
    Unfixable {
        kind: UnfixableKind,
        instance: InstanceId,
    },
}

impl Report {
    pub fn valid(kind: ValidKind, instance: InstanceId) -> Self {
        Report::Valid { kind, instance }
    }

    /// A fixable report; `fix` is rebound to `instance`
    pub fn fixable(kind: FixableKind, instance: InstanceId, fix: Specifier) -> Self {
        Report::Fixable {
            kind,
            instance,
            fix: fix.rebind(instance),
        }
    }

    pub fn unfixable(kind: UnfixableKind, instance: InstanceId) -> Self {
        Report::Unfixable { kind, instance }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Report::Valid { .. })
    }

    pub fn is_fixable(&self) -> bool {
        matches!(self, Report::Fixable { .. })
    }

    pub fn is_unfixable(&self) -> bool {
        matches!(self, Report::Unfixable { .. })
    }

    /// Fixable or unfixable
    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    pub fn instance(&self) -> InstanceId {
        match self {
            Report::Valid { instance, .. }
            | Report::Fixable { instance, .. }
            | Report::Unfixable { instance, .. } => *instance,
        }
    }

    /// Kebab-case name of the report kind
    pub fn name(&self) -> &'static str {
        match self {
            Report::Valid { kind, .. } => kind.as_str(),
            Report::Fixable { kind, .. } => kind.as_str(),
            Report::Unfixable { kind, .. } => kind.as_str(),
        }
    }

    /// Replacement specifier of a fixable report
    pub fn fix(&self) -> Option<&Specifier> {
        match self {
            Report::Fixable { fix, .. } => Some(fix),
            _ => None,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Fixable { fix, .. } => write!(f, "{} → {}", self.name(), fix),
            Report::Unfixable {
                kind: UnfixableKind::SameRangeMismatch { mismatches },
                ..
            } => write!(f, "{} ({})", self.name(), mismatches.join(", ")),
            _ => write!(f, "{}", self.name()),
        }
    }
}
