//! Serialised mutation of process environment variables in tests.
//!
//! Every mutation holds a global re-entrant mutex and returns an RAII guard
//! that restores the previous value (or unsets the variable) on drop.
//! Tests that read the environment through `fieldwise::ProcessEnv` should
//! hold [`lock`] for their whole body so no other test mutates variables
//! between setup and resolution.
//!
//! # Examples
//!
//! ```
//! use test_helpers::env;
//!
//! let lock = env::lock();
//! let _port = lock.set_var("APP_PORT", "8080");
//! assert_eq!(std::env::var("APP_PORT").as_deref(), Ok("8080"));
//! ```

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::LazyLock;

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

/// Applies `mutator` to `key` while `ENV_MUTEX` is held, capturing the prior value.
fn mutate<F>(key: String, mutator: F) -> EnvVarGuard
where
    F: FnOnce(&str),
{
    let _guard = ENV_MUTEX.lock();
    let original = env::var_os(&key);
    mutator(&key);
    EnvVarGuard { key, original }
}

/// RAII guard restoring an environment variable to its prior value on drop.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl fmt::Debug for EnvVarGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let _guard = ENV_MUTEX.lock();
        match self.original.take() {
            // SAFETY: `ENV_MUTEX` is held for the duration of the write.
            Some(value) => unsafe { env::set_var(&self.key, value) },
            // SAFETY: `ENV_MUTEX` is held for the duration of the write.
            None => unsafe { env::remove_var(&self.key) },
        }
    }
}

/// Holds the environment lock for its lifetime.
#[must_use = "dropping releases the environment lock"]
pub struct EnvLock {
    _guard: ReentrantMutexGuard<'static, ()>,
}

impl EnvLock {
    /// Sets `key` to `value` while the lock is held.
    pub fn set_var<K, V>(&self, key: K, value: V) -> EnvVarGuard
    where
        K: Into<String>,
        V: AsRef<OsStr>,
    {
        set_var(key, value)
    }

    /// Removes `key` while the lock is held.
    pub fn remove_var<K>(&self, key: K) -> EnvVarGuard
    where
        K: Into<String>,
    {
        remove_var(key)
    }
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLock").finish_non_exhaustive()
    }
}

/// Acquire the global environment lock.
pub fn lock() -> EnvLock {
    EnvLock {
        _guard: ENV_MUTEX.lock(),
    }
}

/// Sets an environment variable and returns a guard restoring its prior value.
///
/// # Examples
///
/// ```
/// use test_helpers::env;
///
/// let _g = env::set_var("FIELDWISE_DOC_SET", "bar");
/// assert_eq!(std::env::var("FIELDWISE_DOC_SET").as_deref(), Ok("bar"));
/// ```
pub fn set_var<K, V>(key: K, value: V) -> EnvVarGuard
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    // SAFETY: `mutate` holds `ENV_MUTEX` while the closure runs.
    mutate(key.into(), |k| unsafe { env::set_var(k, value.as_ref()) })
}

/// Removes an environment variable and returns a guard restoring its prior value.
///
/// # Examples
///
/// ```
/// use test_helpers::env;
///
/// let _g = env::remove_var("FIELDWISE_DOC_REMOVE");
/// assert!(std::env::var("FIELDWISE_DOC_REMOVE").is_err());
/// ```
pub fn remove_var<K>(key: K) -> EnvVarGuard
where
    K: Into<String>,
{
    // SAFETY: `mutate` holds `ENV_MUTEX` while the closure runs.
    mutate(key.into(), |k| unsafe { env::remove_var(k) })
}
