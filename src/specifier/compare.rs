//! Ordering of semver-bearing specifiers
//!
//! Precedence:
//! 1. `workspace:` is always lowest
//! 2. `*` is always highest
//! 3. Versions coerced to `major.minor.patch` compare numerically
//! 4. Equal versions fall back to range greediness
//! 5. Still equal: the first occurrence wins

use super::npm_range::coerce;
use super::range::SemverRange;
use super::Specifier;
use crate::error::NonSemverError;
use semver::Version;
use std::cmp::Ordering;

/// Greediness score of a workspace protocol specifier
const WORKSPACE_GREEDINESS: u8 = 9;

/// Compare two specifiers. Fails if either has no semver text.
pub fn compare(a: &Specifier, b: &Specifier) -> Result<Ordering, NonSemverError> {
    let a_semver = a.get_semver()?;
    let b_semver = b.get_semver()?;

    match (a.is_workspace_protocol(), b.is_workspace_protocol()) {
        (true, true) => return Ok(Ordering::Equal),
        (true, false) => return Ok(Ordering::Less),
        (false, true) => return Ok(Ordering::Greater),
        (false, false) => {}
    }

    match (a_semver.trim() == "*", b_semver.trim() == "*") {
        (true, true) => return Ok(Ordering::Equal),
        (true, false) => return Ok(Ordering::Greater),
        (false, true) => return Ok(Ordering::Less),
        (false, false) => {}
    }

    let a_version = coerce(a_semver).unwrap_or_else(|| Version::new(0, 0, 0));
    let b_version = coerce(b_semver).unwrap_or_else(|| Version::new(0, 0, 0));

    Ok(a_version
        .cmp(&b_version)
        .then_with(|| greediness(a).cmp(&greediness(b))))
}

/// Range greediness of a specifier, `*` highest and `<` lowest
pub fn greediness(specifier: &Specifier) -> u8 {
    if specifier.is_workspace_protocol() {
        return WORKSPACE_GREEDINESS;
    }
    match specifier.get_semver() {
        Ok(semver) => SemverRange::detect(semver).greediness(),
        Err(_) => 0,
    }
}

/// The highest specifier, or None when `specifiers` is empty
pub fn get_highest<'a>(
    specifiers: &[&'a Specifier],
) -> Result<Option<&'a Specifier>, NonSemverError> {
    pick(specifiers, Ordering::Greater)
}

/// The lowest specifier, or None when `specifiers` is empty
pub fn get_lowest<'a>(
    specifiers: &[&'a Specifier],
) -> Result<Option<&'a Specifier>, NonSemverError> {
    pick(specifiers, Ordering::Less)
}

/// Keep the first specifier unless a later one is strictly `preferred`
fn pick<'a>(
    specifiers: &[&'a Specifier],
    preferred: Ordering,
) -> Result<Option<&'a Specifier>, NonSemverError> {
    let mut best: Option<&'a Specifier> = None;
    for &candidate in specifiers {
        let replace = match best {
            None => {
                candidate.get_semver()?;
                true
            }
            Some(current) => compare(candidate, current)? == preferred,
        };
        if replace {
            best = Some(candidate);
        }
    }
    Ok(best)
}
