//! package.json files
//!
//! Reads every dependency type out of a package.json and writes changed
//! specifiers back while keeping:
//! - key order
//! - indentation
//! - line endings
//! - the trailing newline

use crate::config::{DependencyType, Strategy};
use crate::error::ManifestError;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_INDENT: &str = "  ";

/// A parsed package.json plus what is needed to write it back unchanged
#[derive(Debug, Clone)]
pub struct PackageJsonFile {
    pub path: PathBuf,
    contents: Value,
    original: Value,
    indent: String,
    line_ending: &'static str,
    trailing_newline: bool,
}

impl PackageJsonFile {
    /// Read and parse a package.json from disk
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self, ManifestError> {
        let path = path.into();
        let contents: Value = serde_json::from_str(content)
            .map_err(|e| ManifestError::json_parse_error(&path, e.to_string()))?;
        if !contents.is_object() {
            return Err(ManifestError::NotAnObject { path });
        }
        Ok(Self {
            original: contents.clone(),
            contents,
            indent: detect_indent(content),
            line_ending: if content.contains("\r\n") { "\r\n" } else { "\n" },
            trailing_newline: content.ends_with('\n'),
            path,
        })
    }

    /// Directory containing this file
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// The `name` property
    pub fn name(&self) -> Option<&str> {
        self.contents.get("name").and_then(Value::as_str)
    }

    /// Value at a dotted path such as `pnpm.overrides`
    pub fn get(&self, dotted: &str) -> Option<&Value> {
        dotted
            .split('.')
            .try_fold(&self.contents, |value, key| value.get(key))
    }

    /// `(dependency name, raw specifier)` pairs declared under `dependency_type`
    pub fn entries(&self, dependency_type: &DependencyType) -> Vec<(String, String)> {
        match dependency_type.strategy {
            Strategy::NameAndVersionProps => {
                match (self.name(), self.get(&dependency_type.path).and_then(Value::as_str)) {
                    (Some(name), Some(version)) => vec![(name.to_string(), version.to_string())],
                    _ => Vec::new(),
                }
            }
            Strategy::VersionsByName => self
                .get(&dependency_type.path)
                .and_then(Value::as_object)
                .map(|deps| {
                    deps.iter()
                        .filter_map(|(name, value)| {
                            value.as_str().map(|raw| (name.clone(), raw.to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Strategy::NamedVersionString => self
                .get(&dependency_type.path)
                .and_then(Value::as_str)
                .and_then(split_named_version)
                .map(|(name, raw)| vec![(name.to_string(), raw.to_string())])
                .unwrap_or_default(),
        }
    }

    /// Write `raw` for dependency `name`, or remove it when `raw` is None
    pub fn set_specifier(&mut self, dependency_type: &DependencyType, name: &str, raw: Option<&str>) {
        let (parent_path, last) = match dependency_type.path.rsplit_once('.') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, dependency_type.path.as_str()),
        };
        let Some(parent) = object_at_mut(&mut self.contents, parent_path) else {
            return;
        };
        match dependency_type.strategy {
            Strategy::NameAndVersionProps => match raw {
                Some(raw) => {
                    parent.insert(last.to_string(), Value::String(raw.to_string()));
                }
                None => {
                    parent.shift_remove(last);
                }
            },
            Strategy::VersionsByName => {
                let Some(deps) = parent.get_mut(last).and_then(Value::as_object_mut) else {
                    return;
                };
                match raw {
                    Some(raw) => {
                        deps.insert(name.to_string(), Value::String(raw.to_string()));
                    }
                    None => {
                        deps.shift_remove(name);
                    }
                }
            }
            Strategy::NamedVersionString => match raw {
                Some(raw) => {
                    parent.insert(last.to_string(), Value::String(format!("{}@{}", name, raw)));
                }
                None => {
                    parent.shift_remove(last);
                }
            },
        }
    }

    /// True when the contents differ from what was read
    pub fn has_changed(&self) -> bool {
        self.contents != self.original
    }

    /// Render the contents in the file's original format
    pub fn serialize(&self) -> Result<String, ManifestError> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.contents
            .serialize(&mut serializer)
            .map_err(|e| self.serialize_error(e.to_string()))?;
        let text = String::from_utf8(buf).map_err(|e| self.serialize_error(e.to_string()))?;

        // string values never contain a raw newline, so this only touches structure
        let mut text = if self.line_ending == "\n" {
            text
        } else {
            text.replace('\n', self.line_ending)
        };
        if self.trailing_newline {
            text.push_str(self.line_ending);
        }
        Ok(text)
    }

    fn serialize_error(&self, message: String) -> ManifestError {
        ManifestError::SerializeError {
            path: self.path.clone(),
            message,
        }
    }
}

/// Indentation of the first indented line, two spaces when there is none
fn detect_indent(content: &str) -> String {
    content
        .lines()
        .skip(1)
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}

/// Split `pnpm@8.15.0` or `@scope/tool@1.0.0` at the version separator
fn split_named_version(text: &str) -> Option<(&str, &str)> {
    let at = text.rfind('@').filter(|&i| i > 0)?;
    Some((&text[..at], &text[at + 1..]))
}

fn object_at_mut<'a>(root: &'a mut Value, dotted: Option<&str>) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    if let Some(dotted) = dotted {
        for key in dotted.split('.') {
            current = current.get_mut(key)?;
        }
    }
    current.as_object_mut()
}
