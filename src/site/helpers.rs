//! Helper function tables for the configuration block and templates.
//!
//! A [`HelperSet`] is a named table of functions. Registering it with
//! [`HelperTarget::Config`] makes its functions callable from the
//! configuration block through `Site::call_helper`; [`HelperTarget::Template`]
//! registers them as template functions in every render; [`HelperTarget::Both`]
//! does both.

use crate::config::{ConfigError, ConfigStore};
use anyhow::Result;
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// Arguments passed to a helper, keyed by name.
pub type HelperArgs = HashMap<String, Value>;

/// A helper function. It sees the configuration, never the template scope.
pub type HelperFn = Arc<dyn Fn(&ConfigStore, &HelperArgs) -> Result<Value> + Send + Sync>;

/// Function names provided by every render context.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "render",
    "asset_path",
    "canonical_url",
    "http_prefix",
    "asset_http_prefix",
    "include_file",
    "is_server",
    "is_build",
    "is_production",
    "is_development",
];

/// Where a helper set is made available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelperTarget {
    #[default]
    Both,
    Config,
    Template,
}

impl HelperTarget {
    const fn config(self) -> bool {
        matches!(self, Self::Both | Self::Config)
    }

    const fn template(self) -> bool {
        matches!(self, Self::Both | Self::Template)
    }
}

/// A named table of helper functions.
#[derive(Clone)]
pub struct HelperSet {
    name: String,
    functions: Vec<(String, HelperFn)>,
}

impl HelperSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    /// Add a function to the set.
    pub fn function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ConfigStore, &HelperArgs) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.push((name.into(), Arc::new(f)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[(String, HelperFn)] {
        &self.functions
    }

    /// Reject sets that cannot be registered.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.functions.is_empty() {
            return Err(ConfigError::InvalidHelper(format!(
                "helper set `{}` defines no functions",
                self.name
            )));
        }
        for (name, _) in &self.functions {
            if !is_identifier(name) {
                return Err(ConfigError::InvalidHelper(format!(
                    "`{name}` in helper set `{}` is not a valid function name",
                    self.name
                )));
            }
            if BUILTIN_FUNCTIONS.contains(&name.as_str()) {
                return Err(ConfigError::InvalidHelper(format!(
                    "`{name}` in helper set `{}` shadows a built-in function",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HelperSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperSet")
            .field("name", &self.name)
            .field(
                "functions",
                &self.functions.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Registered helpers, split by where they are callable.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    config: Vec<(String, HelperFn)>,
    template: Vec<(String, HelperFn)>,
}

impl HelperRegistry {
    pub fn register(&mut self, set: HelperSet, target: HelperTarget) -> Result<(), ConfigError> {
        set.validate()?;
        if target.config() {
            self.config.extend(set.functions.iter().cloned());
        }
        if target.template() {
            self.template.extend(set.functions);
        }
        Ok(())
    }

    /// Config-side helper by name; later registrations win.
    pub fn config_fn(&self, name: &str) -> Option<&HelperFn> {
        self.config.iter().rev().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// Template-side helpers in registration order.
    pub fn template_functions(&self) -> &[(String, HelperFn)] {
        &self.template
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |fns: &[(String, HelperFn)]| fns.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>();
        f.debug_struct("HelperRegistry")
            .field("config", &names(&self.config))
            .field("template", &names(&self.template))
            .finish()
    }
}

/// Call one of the helpers every context has.
pub fn call_builtin(config: &ConfigStore, name: &str) -> Option<Value> {
    let value = match name {
        "is_server" => config.is_server(),
        "is_build" => config.is_build(),
        "is_production" => config.is_production(),
        "is_development" => config.is_development(),
        _ => return None,
    };
    Some(Value::Bool(value))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, Target};
    use serde_json::json;

    fn shout() -> HelperSet {
        HelperSet::new("text").function("shout", |_, args| {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(json!(text.to_uppercase()))
        })
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let mut registry = HelperRegistry::default();
        let err = registry
            .register(HelperSet::new("nothing"), HelperTarget::Both)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHelper(_)));
    }

    #[test]
    fn test_builtin_names_cannot_be_shadowed() {
        let mut registry = HelperRegistry::default();
        let set = HelperSet::new("bad").function("asset_path", |_, _| Ok(Value::Null));
        assert!(registry.register(set, HelperTarget::Template).is_err());

        let set = HelperSet::new("bad").function("not-an-ident", |_, _| Ok(Value::Null));
        assert!(registry.register(set, HelperTarget::Template).is_err());
    }

    #[test]
    fn test_target_selects_side() {
        let mut registry = HelperRegistry::default();
        registry.register(shout(), HelperTarget::Template).unwrap();
        assert!(registry.config_fn("shout").is_none());
        assert_eq!(registry.template_functions().len(), 1);

        registry.register(shout(), HelperTarget::Config).unwrap();
        let f = registry.config_fn("shout").unwrap();
        let args = HelperArgs::from([("text".to_owned(), json!("hi"))]);
        assert_eq!(f(&ConfigStore::new(), &args).unwrap(), json!("HI"));
    }

    #[test]
    fn test_call_builtin() {
        let mut config = ConfigStore::new();
        config.set_mode(Mode::Build).set_target(Target::Production);
        assert_eq!(call_builtin(&config, "is_build"), Some(json!(true)));
        assert_eq!(call_builtin(&config, "is_server"), Some(json!(false)));
        assert_eq!(call_builtin(&config, "shout"), None);
    }
}
