//! Version specifier model
//!
//! Every raw string found in a manifest becomes exactly one [`Specifier`].
//! Handles:
//! - Exact versions: `1.2.3`, `v1.2.3`, `=1.2.3`
//! - npm ranges: `^1.2.3`, `~1.2`, `>=1 <2`, `1.x`, `1.0.0 - 2.0.0`, `^1 || ^2`
//! - `*`, `workspace:*`, `npm:other@^1.0.0`
//! - File paths, git urls, tarball urls and dist-tags
//!
//! Specifiers are immutable: changing the semver portion builds a new value
//! bound to the same instance.

mod compare;
mod npm_range;
mod parse;
mod range;

pub use compare::{compare, get_highest, get_lowest, greediness};
pub use npm_range::{coerce, NpmRange};
pub use range::SemverRange;

use crate::domain::InstanceId;
use crate::error::NonSemverError;
use std::fmt;
use std::path::{Path, PathBuf};

/// The closed set of specifier shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// `1.2.3`
    Exact,
    /// `^1.2.3`, `>=1 <2`, `1.x`
    Range,
    /// `*`
    Latest,
    /// `npm:<name>@<spec>`; `semver` is `None` when the inner spec is not semver
    Alias {
        name: String,
        semver: Option<String>,
    },
    /// `file:../foo`, `./foo`
    File,
    /// `github:user/repo`, `git+ssh://...`
    HostedGit,
    /// `latest`, `next`
    Tag,
    /// `https://example.com/foo.tgz`
    Url,
    /// `workspace:*`, `workspace:^1.0.0`
    WorkspaceProtocol { semver: String },
    /// Anything else
    Unsupported,
    /// Marker telling the writer to remove the dependency
    Delete,
}

/// A parsed version specifier bound to the instance which declared it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    raw: String,
    instance: InstanceId,
    variant: Variant,
}

impl Specifier {
    /// Raw text recognised as the delete marker
    pub const DELETE: &'static str = "\u{0}DELETE";

    /// Parse `raw` for `instance`. Never fails.
    pub fn create(instance: InstanceId, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let variant = parse::classify(&raw);
        Self {
            raw,
            instance,
            variant,
        }
    }

    /// The delete marker bound to `instance`
    pub fn delete(instance: InstanceId) -> Self {
        Self::create(instance, Self::DELETE)
    }

    /// The raw text as written in the manifest
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The instance this specifier belongs to
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Stable kind name used by `specifierTypes` filters
    pub fn kind_name(&self) -> &'static str {
        match self.variant {
            Variant::Exact => "exact",
            Variant::Range => "range",
            Variant::Latest => "latest",
            Variant::Alias { .. } => "alias",
            Variant::File => "file",
            Variant::HostedGit => "hosted-git",
            Variant::Tag => "tag",
            Variant::Url => "url",
            Variant::WorkspaceProtocol { .. } => "workspace-protocol",
            Variant::Unsupported => "unsupported",
            Variant::Delete => "delete",
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.variant, Variant::Delete)
    }

    pub fn is_workspace_protocol(&self) -> bool {
        matches!(self.variant, Variant::WorkspaceProtocol { .. })
    }

    /// Returns true if [`Specifier::get_semver`] would succeed
    pub fn has_semver(&self) -> bool {
        self.get_semver().is_ok()
    }

    /// The bare version or range text
    pub fn get_semver(&self) -> Result<&str, NonSemverError> {
        match &self.variant {
            Variant::Exact | Variant::Range | Variant::Latest => Ok(&self.raw),
            Variant::Alias {
                semver: Some(semver),
                ..
            } => Ok(semver),
            Variant::WorkspaceProtocol { semver } => Ok(semver),
            _ => Err(self.non_semver()),
        }
    }

    /// Build a new specifier of the same shape with `version` substituted
    pub fn set_semver(&self, version: &str) -> Result<Specifier, NonSemverError> {
        match &self.variant {
            Variant::Exact | Variant::Range | Variant::Latest => {
                Ok(Self::create(self.instance, version))
            }
            Variant::Alias {
                name,
                semver: Some(_),
            } => Ok(Self::create(
                self.instance,
                format!("npm:{}@{}", name, version),
            )),
            // the workspace: prefix is not carried over
            Variant::WorkspaceProtocol { .. } => Ok(Self::create(self.instance, version)),
            _ => Err(self.non_semver()),
        }
    }

    /// The same raw text rebound to another instance
    pub fn rebind(&self, instance: InstanceId) -> Specifier {
        Specifier {
            raw: self.raw.clone(),
            instance,
            variant: self.variant.clone(),
        }
    }

    /// Resolve a `file:` specifier against the directory of its package
    pub fn resolve_path(&self, package_dir: &Path) -> Option<PathBuf> {
        if !matches!(self.variant, Variant::File) {
            return None;
        }
        let path = self.raw.strip_prefix("file:").unwrap_or(&self.raw);
        if let Some(home_relative) = path.strip_prefix("~/") {
            let home = std::env::var_os("HOME")?;
            return Some(PathBuf::from(home).join(home_relative));
        }
        Some(package_dir.join(path))
    }

    fn non_semver(&self) -> NonSemverError {
        NonSemverError::new(self.raw.clone(), self.kind_name())
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_delete() {
            write!(f, "<delete>")
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(raw: &str) -> Specifier {
        Specifier::create(InstanceId(0), raw)
    }

    #[test]
    fn test_create_exact() {
        assert_eq!(create("1.2.3").kind_name(), "exact");
        assert_eq!(create("v1.2.3").kind_name(), "exact");
        assert_eq!(create("=1.2.3").kind_name(), "exact");
        assert_eq!(create("1.2.3-alpha.1").kind_name(), "exact");
        assert_eq!(create("1.2.3+build.5").kind_name(), "exact");
    }

    #[test]
    fn test_create_range() {
        for raw in [
            "^1.2.3",
            "~1.2.3",
            ">=1.2.3",
            ">1.2.3",
            "<=1.2.3",
            "<1.2.3",
            "1.x",
            "1.2.x",
            "1",
            "1.2",
            ">=1.0.0 <2.0.0",
            "1.0.0 - 2.0.0",
            "^1.0.0 || ^2.0.0",
            ">= 1.2.3",
        ] {
            assert_eq!(create(raw).kind_name(), "range", "{}", raw);
        }
    }

    #[test]
    fn test_create_latest() {
        assert_eq!(create("*").kind_name(), "latest");
    }

    #[test]
    fn test_create_workspace_protocol() {
        assert_eq!(create("workspace:*").kind_name(), "workspace-protocol");
        assert_eq!(create("workspace:^").kind_name(), "workspace-protocol");
        assert_eq!(create("workspace:~").kind_name(), "workspace-protocol");
        assert_eq!(create("workspace:^1.2.3").kind_name(), "workspace-protocol");
        assert_eq!(create("workspace:1.2.3").kind_name(), "workspace-protocol");
        assert_eq!(create("workspace:../foo").kind_name(), "unsupported");
    }

    #[test]
    fn test_create_alias() {
        let spec = create("npm:lodash@^4.17.21");
        assert_eq!(spec.kind_name(), "alias");
        assert_eq!(spec.get_semver().unwrap(), "^4.17.21");

        let scoped = create("npm:@scope/pkg@1.0.0");
        assert_eq!(scoped.kind_name(), "alias");
        assert_eq!(scoped.get_semver().unwrap(), "1.0.0");

        let bare = create("npm:lodash");
        assert_eq!(bare.kind_name(), "alias");
        assert_eq!(bare.get_semver().unwrap(), "*");

        assert_eq!(create("npm:Not Valid@1.0.0").kind_name(), "unsupported");
    }

    #[test]
    fn test_alias_with_tag_has_no_semver() {
        let spec = create("npm:lodash@latest");
        assert_eq!(spec.kind_name(), "alias");
        assert!(spec.get_semver().is_err());
        assert!(spec.set_semver("1.0.0").is_err());
    }

    #[test]
    fn test_create_file() {
        for raw in ["file:../foo", "./foo", "../foo", "/abs/foo", "~/foo"] {
            assert_eq!(create(raw).kind_name(), "file", "{}", raw);
        }
    }

    #[test]
    fn test_create_hosted_git() {
        for raw in [
            "github:user/repo",
            "gitlab:user/repo",
            "bitbucket:user/repo",
            "gist:11081aaa281",
            "git+ssh://git@github.com/user/repo.git",
            "git://github.com/user/repo.git#v1.0.0",
            "git@github.com:user/repo.git",
            "https://github.com/user/repo.git",
            "user/repo",
            "user/repo#semver:^1.0.0",
        ] {
            assert_eq!(create(raw).kind_name(), "hosted-git", "{}", raw);
        }
    }

    #[test]
    fn test_create_url() {
        assert_eq!(
            create("https://example.com/foo-1.0.0.tgz").kind_name(),
            "url"
        );
        assert_eq!(create("http://example.com/foo.tgz").kind_name(), "url");
    }

    #[test]
    fn test_create_tag() {
        assert_eq!(create("latest").kind_name(), "tag");
        assert_eq!(create("next").kind_name(), "tag");
        assert_eq!(create("beta").kind_name(), "tag");
    }

    #[test]
    fn test_create_unsupported() {
        assert_eq!(create("").kind_name(), "unsupported");
        assert_eq!(create("   ").kind_name(), "unsupported");
        assert_eq!(create("not a version").kind_name(), "unsupported");
        assert_eq!(create("^^1.0.0").kind_name(), "unsupported");
    }

    #[test]
    fn test_create_delete() {
        let spec = Specifier::delete(InstanceId(3));
        assert!(spec.is_delete());
        assert_eq!(spec.kind_name(), "delete");
        assert_eq!(spec.instance(), InstanceId(3));
        assert_eq!(format!("{}", spec), "<delete>");
    }

    #[test]
    fn test_get_semver() {
        assert_eq!(create("1.2.3").get_semver().unwrap(), "1.2.3");
        assert_eq!(create("^1.2.3").get_semver().unwrap(), "^1.2.3");
        assert_eq!(create("*").get_semver().unwrap(), "*");
        assert_eq!(create("workspace:^1.0.0").get_semver().unwrap(), "^1.0.0");
        assert_eq!(create("workspace:*").get_semver().unwrap(), "*");
    }

    #[test]
    fn test_get_semver_non_semver() {
        let err = create("github:user/repo").get_semver().unwrap_err();
        assert_eq!(err.kind, "hosted-git");
        assert!(create("latest").get_semver().is_err());
        assert!(create("file:../foo").get_semver().is_err());
        assert!(create("").get_semver().is_err());
        assert!(Specifier::delete(InstanceId(0)).get_semver().is_err());
    }

    #[test]
    fn test_set_semver_keeps_instance() {
        let spec = Specifier::create(InstanceId(7), "^1.0.0");
        let updated = spec.set_semver("~2.0.0").unwrap();
        assert_eq!(updated.raw(), "~2.0.0");
        assert_eq!(updated.instance(), InstanceId(7));
        // original is untouched
        assert_eq!(spec.raw(), "^1.0.0");
    }

    #[test]
    fn test_set_semver_alias() {
        let spec = create("npm:lodash@^4.0.0");
        let updated = spec.set_semver("4.17.21").unwrap();
        assert_eq!(updated.raw(), "npm:lodash@4.17.21");
        assert_eq!(updated.kind_name(), "alias");
    }

    #[test]
    fn test_set_semver_workspace_degrades() {
        let spec = create("workspace:^1.0.0");
        let updated = spec.set_semver("1.2.0").unwrap();
        assert_eq!(updated.raw(), "1.2.0");
        assert_eq!(updated.kind_name(), "exact");
    }

    #[test]
    fn test_set_semver_round_trip() {
        let specs = ["1.0.0", "^1.0.0", "*", "npm:foo@1.0.0", "workspace:*"];
        let versions = ["2.3.4", "^2.3.4", "~0.1.0", ">=1.0.0", "*"];
        for raw in specs {
            for version in versions {
                let updated = create(raw).set_semver(version).unwrap();
                assert_eq!(updated.get_semver().unwrap(), version, "{} -> {}", raw, version);
            }
        }
    }

    #[test]
    fn test_set_semver_non_semver() {
        assert!(create("latest").set_semver("1.0.0").is_err());
        assert!(create("file:./foo").set_semver("1.0.0").is_err());
    }

    #[test]
    fn test_resolve_path() {
        let spec = create("file:../shared");
        let resolved = spec.resolve_path(Path::new("/repo/packages/a")).unwrap();
        assert_eq!(resolved, PathBuf::from("/repo/packages/a/../shared"));

        let relative = create("./vendor/lib");
        assert_eq!(
            relative.resolve_path(Path::new("/repo")).unwrap(),
            PathBuf::from("/repo/./vendor/lib")
        );

        assert!(create("1.0.0").resolve_path(Path::new("/repo")).is_none());
    }

    #[test]
    fn test_rebind() {
        let spec = Specifier::create(InstanceId(1), "^1.0.0");
        let rebound = spec.rebind(InstanceId(9));
        assert_eq!(rebound.raw(), "^1.0.0");
        assert_eq!(rebound.instance(), InstanceId(9));
        assert_eq!(rebound.variant(), spec.variant());
    }

    #[test]
    fn test_totality() {
        let inputs = [
            "",
            " ",
            Specifier::DELETE,
            "*",
            "x",
            "workspace:",
            "npm:",
            "npm:@",
            "git+",
            "||",
            " - ",
            "1.2.3.4",
            "🦀",
            "^",
            "~",
            ">",
            "file:",
            "http://",
        ];
        for input in inputs {
            let spec = create(input);
            assert!(!spec.kind_name().is_empty());
        }
    }
}
