//! Data bag storage and loading.

use crate::{bindings::Bindings, log};
use anyhow::{Context, Result};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Recognized data file extensions, in load order.
pub const DATA_EXTENSIONS: [&str; 2] = ["json", "yaml"];

/// Named data bags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataStore {
    bags: Bindings,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a bag. Nested mappings get canonical keys.
    pub fn insert(&mut self, name: &str, value: Value) {
        self.bags.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bags.get(name)
    }

    /// Merge freshly loaded bags over the current ones.
    ///
    /// A bag with the same name fully replaces the prior value.
    pub fn merge(&mut self, fresh: Bindings) {
        self.bags.merge(fresh);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bags.keys()
    }

    pub fn len(&self) -> usize {
        self.bags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }

    /// Snapshot for templates.
    pub fn to_value(&self) -> Value {
        self.bags.to_value()
    }
}

/// Decode every data file directly inside `dir`.
///
/// A missing directory yields no bags.
pub fn load_data_dir(dir: &Path) -> Result<Bindings> {
    let mut bags = Bindings::new();
    if !dir.is_dir() {
        return Ok(bags);
    }

    for ext in DATA_EXTENSIONS {
        for path in files_with_extension(dir, ext)? {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            log!("data"; "loading data[{name}] from {}", path.display());
            let value = decode(&path, ext)?;
            bags.insert(name, value);
        }
    }

    Ok(bags)
}

/// Files in `dir` (not recursive) with extension `ext`, sorted by name.
fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => {
                let path = entry.into_path();
                (path.is_file() && path.extension().is_some_and(|e| e == ext)).then_some(Ok(path))
            }
            Err(err) => Some(Err(err)),
        })
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read {}", dir.display()))
}

fn decode(path: &Path, ext: &str) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = match ext {
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
    };
    Ok(value)
}
