//! Filter options of the `update` command

use std::time::Duration;

/// Which dependencies `update` looks at and which releases it accepts
#[derive(Debug, Clone, Default)]
pub struct UpdateFilter {
    /// Dependency names never looked up
    pub exclude: Vec<String>,
    /// If non-empty, only these names are looked up
    pub only: Vec<String>,
    /// Accept prerelease versions even when the current version is stable
    pub include_prerelease: bool,
    /// Releases younger than this are ignored
    pub min_age: Option<Duration>,
}

impl UpdateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_only(mut self, only: Vec<String>) -> Self {
        self.only = only;
        self
    }

    pub fn with_include_prerelease(mut self, include: bool) -> Self {
        self.include_prerelease = include;
        self
    }

    pub fn with_min_age(mut self, age: Duration) -> Self {
        self.min_age = Some(age);
        self
    }

    /// `--only` wins over `--exclude`
    pub fn should_process_package(&self, name: &str) -> bool {
        if !self.only.is_empty() {
            return self.only.iter().any(|p| p == name);
        }
        !self.exclude.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_processes_everything() {
        let filter = UpdateFilter::new();
        assert!(filter.should_process_package("react"));
        assert!(!filter.include_prerelease);
        assert!(filter.min_age.is_none());
    }

    #[test]
    fn test_exclude() {
        let filter = UpdateFilter::new().with_exclude(vec!["react".to_string()]);
        assert!(!filter.should_process_package("react"));
        assert!(filter.should_process_package("vue"));
    }

    #[test]
    fn test_only_wins_over_exclude() {
        let filter = UpdateFilter::new()
            .with_only(vec!["react".to_string()])
            .with_exclude(vec!["react".to_string()]);
        assert!(filter.should_process_package("react"));
        assert!(!filter.should_process_package("vue"));
    }

    #[test]
    fn test_builders() {
        let filter = UpdateFilter::new()
            .with_include_prerelease(true)
            .with_min_age(Duration::from_secs(86400));
        assert!(filter.include_prerelease);
        assert_eq!(filter.min_age, Some(Duration::from_secs(86400)));
    }
}
