//! Error types produced by a resolution pass.

use thiserror::Error;

use crate::kind::{CoercionError, Kind};

/// Errors that can occur while resolving configuration fields.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// A field's storage type is not one of the supported kinds.
    #[error("field '{field}' has unsupported type `{type_name}`")]
    UnsupportedKind {
        /// Name of the offending field.
        field: String,
        /// Rust type name of the field's storage.
        type_name: &'static str,
    },

    /// A default or environment literal could not be parsed as the field's kind.
    #[error("cannot resolve field '{field}' as {kind}: {source}")]
    Coercion {
        /// Name of the field being resolved.
        field: String,
        /// Kind the literal was expected to parse as.
        kind: Kind,
        /// The literal that failed to parse.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: CoercionError,
    },

    /// Two fields claimed the same command-line flag.
    #[error("flag redefined: {flag}")]
    FlagRedefined {
        /// The flag name registered twice.
        flag: String,
    },

    /// A flag name that cannot appear on a command line.
    #[error("invalid flag name '{flag}'")]
    InvalidFlagName {
        /// The rejected flag name.
        flag: String,
    },

    /// The registrar reported a value whose kind differs from the field's.
    #[error("command line supplied {found} for field '{field}', which expects {expected}")]
    KindMismatch {
        /// Name of the field the value was reported for.
        field: String,
        /// Kind of the field's storage.
        expected: Kind,
        /// Kind of the reported value.
        found: Kind,
    },

    /// Parsed arguments could not be read back with the type they were
    /// registered with.
    #[error("cannot read parsed arguments: {0}")]
    ArgumentLookup(#[from] clap::parser::MatchesError),

    /// Error parsing command-line arguments, including help requests.
    #[error("Failed to parse command-line arguments: {0}")]
    CommandLine(#[from] Box<clap::Error>),
}

impl ResolveError {
    /// Construct a coercion error for `field`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fieldwise::{Kind, ResolveError};
    ///
    /// let source = fieldwise::coerce(Kind::Integer, "ten").unwrap_err();
    /// let err = ResolveError::coercion("port", source);
    /// assert!(matches!(err, ResolveError::Coercion { kind: Kind::Integer, .. }));
    /// ```
    #[must_use]
    pub fn coercion(field: impl Into<String>, source: CoercionError) -> Self {
        Self::Coercion {
            field: field.into(),
            kind: source.kind(),
            value: source.value().to_owned(),
            source,
        }
    }

    /// Returns `true` when the error is clap asking to display help or version
    /// text rather than a genuine failure.
    #[must_use]
    pub fn is_help_request(&self) -> bool {
        matches!(
            self,
            Self::CommandLine(err) if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            )
        )
    }
}

impl From<clap::Error> for ResolveError {
    fn from(err: clap::Error) -> Self {
        Self::CommandLine(Box::new(err))
    }
}

/// Result alias used throughout the crate.
pub type ResolveResult<T> = Result<T, ResolveError>;
