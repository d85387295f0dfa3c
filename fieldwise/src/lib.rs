//! Declarative configuration fields resolved in one pass.
//!
//! Each field of a configuration record takes its value from, in order of
//! precedence:
//!
//! 1. a command-line flag named by its `cli` annotation, when supplied;
//! 2. the environment variable named by its `env` annotation, when set;
//! 3. its `default` literal;
//! 4. the zero value of its kind (`0`, `""` or `false`).
//!
//! Records describe their fields through a [`Schema`], written by hand with
//! [`FieldSpec`] or generated by `#[derive(Configurable)]`:
//!
//! ```rust,no_run
//! use fieldwise::Configurable;
//!
//! #[derive(Configurable, Default)]
//! struct ServerConfig {
//!     /// Interface to bind.
//!     #[config(default = "127.0.0.1", env = "SERVER_HOST", cli = "host")]
//!     host: String,
//!     #[config(default = "8080", env = "SERVER_PORT", cli = "port", desc = "Port to listen on")]
//!     port: i64,
//!     #[config(env = "SERVER_DEBUG", cli = "debug")]
//!     debug: bool,
//! }
//!
//! # fn main() -> Result<(), fieldwise::ResolveError> {
//! let config = ServerConfig::load()?;
//! # let _ = config;
//! # Ok(())
//! # }
//! ```

pub use fieldwise_macros::Configurable;

mod env;
mod error;
mod kind;
mod registrar;
mod resolver;
mod schema;

pub use env::{EnvironmentStore, MapEnv, ProcessEnv};
pub use error::{ResolveError, ResolveResult};
pub use kind::{CoercionError, Kind, ResolvedValue, coerce, parse_bool, parse_int};
pub use registrar::{ClapRegistrar, CommandLineRegistrar, ParsedArguments};
pub use resolver::{FieldResolution, FieldResolver, Resolution, Source};
pub use schema::{Annotations, FieldKey, FieldSpec, Schema};

/// Trait implemented by configuration records.
///
/// Usually derived; see the crate documentation for the attribute syntax.
pub trait Configurable: Sized + 'static {
    /// Field descriptors in resolution order.
    fn schema() -> Schema<Self>;

    /// Build a default record and resolve it from the process environment
    /// and command line.
    ///
    /// Call this at most once per process.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] when a field cannot be resolved or the
    /// command line is malformed.
    fn load() -> ResolveResult<Self>
    where
        Self: Default,
    {
        let mut record = Self::default();
        resolve(&mut record)?;
        Ok(record)
    }
}

/// Resolve `record` from the process environment and command line.
///
/// Call this at most once per process.
///
/// # Errors
///
/// Returns a [`ResolveError`] when a field cannot be resolved or the command
/// line is malformed.
pub fn resolve<T: Configurable>(record: &mut T) -> ResolveResult<Resolution> {
    FieldResolver::from_process().resolve(record)
}
