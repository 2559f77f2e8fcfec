//! package.json discovery for monorepos
//!
//! Sources, in priority order:
//! - `source` globs from config or `--source`
//! - the root package.json plus its npm/yarn `workspaces`
//!   and the `packages` of pnpm-workspace.yaml

use crate::error::ConfigError;
use glob::{glob, Pattern};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PACKAGE_JSON: &str = "package.json";

/// Find every package.json to inspect under `root`
///
/// Explicit `sources` win. Without them the root package.json is always
/// included, followed by the workspace packages it or pnpm declares.
pub fn detect_manifests(root: &Path, sources: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    let patterns = if sources.is_empty() {
        let mut patterns = vec![PACKAGE_JSON.to_string()];
        patterns.extend(npm_workspace_patterns(root));
        patterns.extend(pnpm_workspace_patterns(root));
        patterns
    } else {
        sources.to_vec()
    };
    debug!(?patterns, "resolving manifest sources");

    let (negated, positive): (Vec<&String>, Vec<&String>) =
        patterns.iter().partition(|p| p.starts_with('!'));
    let excluded = negated
        .iter()
        .map(|p| expand(root, &p[1..]))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect::<HashSet<PathBuf>>();

    let mut seen = HashSet::new();
    let mut manifests = Vec::new();
    for pattern in positive {
        for path in expand(root, pattern)? {
            if excluded.contains(&path) || is_in_node_modules(&path) {
                continue;
            }
            if seen.insert(path.clone()) {
                manifests.push(path);
            }
        }
    }
    Ok(manifests)
}

/// Existing package.json files matched by `pattern`, sorted per pattern
fn expand(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let pattern = pattern.trim().trim_start_matches("./").trim_end_matches('/');
    let pattern = if pattern.ends_with(PACKAGE_JSON) {
        pattern.to_string()
    } else if pattern.is_empty() || pattern == "." {
        PACKAGE_JSON.to_string()
    } else {
        format!("{}/{}", pattern, PACKAGE_JSON)
    };
    let full = format!("{}/{}", Pattern::escape(&root.to_string_lossy()), pattern);
    let entries = glob(&full).map_err(|e| ConfigError::InvalidPattern {
        value: pattern.clone(),
        message: e.msg.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable path: {}", e),
        }
    }
    Ok(paths)
}

fn is_in_node_modules(path: &Path) -> bool {
    path.components().any(|c| c.as_os_str() == "node_modules")
}

/// `workspaces` of the root package.json, as an array or `{ packages: [...] }`
fn npm_workspace_patterns(root: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(root.join(PACKAGE_JSON)) else {
        return Vec::new();
    };
    let Ok(json) = serde_json::from_str::<Value>(&content) else {
        return Vec::new();
    };
    let workspaces = match json.get("workspaces") {
        Some(Value::Array(items)) => items,
        Some(Value::Object(obj)) => match obj.get("packages") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    workspaces
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// `packages` of pnpm-workspace.yaml
fn pnpm_workspace_patterns(root: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(root.join("pnpm-workspace.yaml")) else {
        return Vec::new();
    };

    // Format: packages:
    //           - 'packages/*'
    //           - '!**/test/**'
    let mut patterns = Vec::new();
    let mut in_packages = false;
    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("packages:") {
            in_packages = true;
            continue;
        }

        if in_packages {
            if !trimmed.is_empty() && !trimmed.starts_with('-') && !trimmed.starts_with('#') {
                break;
            }
            if let Some(pattern) = trimmed.strip_prefix('-') {
                let pattern = pattern.trim().trim_matches('\'').trim_matches('"');
                if !pattern.is_empty() {
                    patterns.push(pattern.to_string());
                }
            }
        }
    }
    patterns
}
