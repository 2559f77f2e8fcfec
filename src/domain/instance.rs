//! One occurrence of a dependency inside one manifest

use crate::config::DependencyType;
use crate::specifier::Specifier;
use serde::Serialize;
use std::fmt;

/// Index of an [`Instance`] in the arena owned by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct InstanceId(pub usize);

/// Index of a package.json in the arena owned by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PackageId(pub usize);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dependency name and specifier declared by one package under one
/// dependency type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: InstanceId,
    /// Dependency name, e.g. `react`
    pub name: String,
    /// Current specifier; only replaced through [`Instance::write`]
    pub specifier: Specifier,
    pub package: PackageId,
    /// `name` of the package.json declaring this instance
    pub package_name: String,
    pub dependency_type: DependencyType,
}

impl Instance {
    pub fn new(
        id: InstanceId,
        name: impl Into<String>,
        raw: impl Into<String>,
        package: PackageId,
        package_name: impl Into<String>,
        dependency_type: DependencyType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            specifier: Specifier::create(id, raw),
            package,
            package_name: package_name.into(),
            dependency_type,
        }
    }

    /// Returns true when this is a package's own `version`
    pub fn is_local(&self) -> bool {
        self.dependency_type.is_local()
    }

    /// Raw text of the current specifier
    pub fn raw(&self) -> &str {
        self.specifier.raw()
    }

    /// Replace the specifier. The new value is rebound to this instance.
    pub fn write(&mut self, specifier: Specifier) {
        self.specifier = specifier.rebind(self.id);
    }
}
