//! Named callback lists run against the site.

use super::Site;
use anyhow::Result;
use rustc_hash::FxHashMap;
use std::{fmt, sync::Arc};

/// Hook point fired after every data (re)load.
pub const AFTER_LOAD_DATA: &str = "after_load_data";

/// A callback with mutable access to the whole site.
pub type Hook = Arc<dyn Fn(&mut Site) -> Result<()> + Send + Sync>;

/// Append-only registry of hooks, run in registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: FxHashMap<String, Vec<Hook>>,
}

impl HookRegistry {
    pub fn register(&mut self, name: &str, hook: Hook) {
        self.hooks
            .entry(crate::bindings::canonical_key(name).to_owned())
            .or_default()
            .push(hook);
    }

    /// Snapshot of the hooks registered under `name`.
    pub fn get(&self, name: &str) -> Vec<Hook> {
        self.hooks
            .get(crate::bindings::canonical_key(name))
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.hooks.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}
