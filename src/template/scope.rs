//! Ordered name-resolution scopes handed to a render.

use crate::{bindings::Bindings, error::ResolveError};
use serde_json::Value;

/// Names resolved by a template, highest priority first.
///
/// A render sees three scopes: the context built-ins (`page`, `data`,
/// `config`, `sitemap`), the locals of the innermost render call, and the
/// configuration values.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    scopes: Vec<(&'static str, Bindings)>,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scope below every scope already in the chain.
    pub fn push(mut self, name: &'static str, bindings: Bindings) -> Self {
        self.scopes.push((name, bindings));
        self
    }

    /// First binding of `name`, searching scopes in order.
    pub fn resolve(&self, name: &str) -> Result<&Value, ResolveError> {
        self.lookup(name)
            .map(|(_, value)| value)
            .ok_or_else(|| ResolveError::Unresolved(name.to_owned()))
    }

    /// Like [`Self::resolve`], also naming the scope that bound it.
    pub fn lookup(&self, name: &str) -> Option<(&'static str, &Value)> {
        self.scopes
            .iter()
            .find_map(|(scope, bindings)| bindings.get(name).map(|value| (*scope, value)))
    }

    /// Flatten the chain into one object; higher scopes shadow lower ones.
    pub fn flatten(&self) -> Bindings {
        let mut flat = Bindings::new();
        for (_, bindings) in self.scopes.iter().rev() {
            flat.merge(bindings.clone());
        }
        flat
    }
}
