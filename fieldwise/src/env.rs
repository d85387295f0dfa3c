//! Environment variable sources.
//!
//! Resolution only needs point lookups, so the [`EnvironmentStore`] trait is
//! deliberately small. [`ProcessEnv`] reads the real process environment;
//! [`MapEnv`] holds a fixed set of variables for deterministic tests.

use std::collections::HashMap;

/// Read-only key to value lookup consulted for `env` annotations.
pub trait EnvironmentStore {
    /// Returns the value of `name`, or `None` when the variable is not set.
    ///
    /// A variable set to the empty string is reported as `Some("")`.
    fn lookup(&self, name: &str) -> Option<String>;
}

impl<E: EnvironmentStore + ?Sized> EnvironmentStore for &E {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}

/// The environment of the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvironmentStore for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        let raw = std::env::var_os(name)?;
        Some(raw.into_string().unwrap_or_else(|raw| {
            tracing::warn!(
                variable = name,
                "environment variable is not valid Unicode; replacing invalid sequences"
            );
            raw.to_string_lossy().into_owned()
        }))
    }
}

/// An in-memory environment.
///
/// # Examples
///
/// ```
/// use fieldwise::{EnvironmentStore, MapEnv};
///
/// let env = MapEnv::from_iter([("PORT", "8080")]);
/// assert_eq!(env.lookup("PORT").as_deref(), Some("8080"));
/// assert_eq!(env.lookup("HOST"), None);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, returning the updated environment.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set `name` to `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove `name`, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }
}

impl EnvironmentStore for MapEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
