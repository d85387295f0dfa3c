//! The resolution pass.
//!
//! [`FieldResolver`] walks a [`Schema`] once. Each field starts from its
//! `default` literal (or the zero literal for its kind), may be overridden by
//! its `env` variable, and is then either written immediately or registered
//! as a command-line flag. Arguments are parsed once after every field has
//! been visited, so the precedence is always command line, environment,
//! declared default, zero value.

use std::ffi::OsString;

use crate::Configurable;
use crate::env::{EnvironmentStore, ProcessEnv};
use crate::error::{ResolveError, ResolveResult};
use crate::kind::{Kind, ResolvedValue, coerce};
use crate::registrar::{ClapRegistrar, CommandLineRegistrar};
use crate::schema::{FieldKey, FieldSpec, Schema};

/// Layer that decided a field's final value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum Source {
    /// Supplied on the command line.
    Cli,
    /// Read from an environment variable.
    Environment,
    /// Taken from the field's `default` annotation.
    Default,
    /// The kind's zero value.
    Zero,
}

/// How one field was resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldResolution {
    /// Field name.
    pub name: String,
    /// Layer that supplied the value.
    pub source: Source,
    /// Value written into the record.
    pub value: ResolvedValue,
}

/// Report produced by a successful resolution pass.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Resolution {
    fields: Vec<FieldResolution>,
    remaining: Vec<OsString>,
}

impl Resolution {
    /// Per-field outcomes in schema order.
    #[must_use]
    pub fn fields(&self) -> &[FieldResolution] {
        &self.fields
    }

    /// Outcome for the field called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldResolution> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Source that decided the field called `name`.
    #[must_use]
    pub fn source_of(&self, name: &str) -> Option<Source> {
        self.field(name).map(|field| field.source)
    }

    /// Positional arguments left after flag parsing stopped.
    #[must_use]
    pub fn remaining(&self) -> &[OsString] {
        &self.remaining
    }
}

/// Resolves configuration records from an environment and a command line.
///
/// A resolver is consumed by the pass it performs.
///
/// # Examples
///
/// ```
/// use fieldwise::{ClapRegistrar, FieldResolver, FieldSpec, MapEnv, Schema};
///
/// #[derive(Default)]
/// struct Cfg { host: String, port: i64 }
///
/// let schema = Schema::new()
///     .field(FieldSpec::new("host", |c: &mut Cfg| &mut c.host).default_value("localhost"))
///     .field(FieldSpec::new("port", |c: &mut Cfg| &mut c.port).env("PORT").cli("port"));
///
/// let mut cfg = Cfg::default();
/// FieldResolver::new(MapEnv::new().with("PORT", "8080"), ClapRegistrar::new("demo"))
///     .with_args(["--port", "9090"])
///     .resolve_with(&mut cfg, &schema)?;
/// assert_eq!(cfg.host, "localhost");
/// assert_eq!(cfg.port, 9090);
/// # Ok::<(), fieldwise::ResolveError>(())
/// ```
#[derive(Debug)]
pub struct FieldResolver<E, R> {
    env: E,
    registrar: R,
    args: Vec<OsString>,
}

impl FieldResolver<ProcessEnv, ClapRegistrar> {
    /// Resolver reading the process environment and `std::env::args_os`.
    ///
    /// The first argument names the program in usage text; the rest are
    /// parsed as flags.
    #[must_use]
    pub fn from_process() -> Self {
        let mut argv = std::env::args_os();
        let program = argv
            .next()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(ProcessEnv, ClapRegistrar::new(program)).with_args(argv)
    }
}

impl<E, R> FieldResolver<E, R>
where
    E: EnvironmentStore,
    R: CommandLineRegistrar,
{
    /// Create a resolver with no command-line arguments.
    #[must_use]
    pub const fn new(env: E, registrar: R) -> Self {
        Self {
            env,
            registrar,
            args: Vec::new(),
        }
    }

    /// Use `args` (without the program name) as the command line.
    #[must_use]
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve every field of `record` using its declared schema.
    ///
    /// # Errors
    ///
    /// See [`FieldResolver::resolve_with`].
    pub fn resolve<T: Configurable>(self, record: &mut T) -> ResolveResult<Resolution> {
        self.resolve_with(record, &T::schema())
    }

    /// Resolve every field of `record` described by `schema`.
    ///
    /// Fields already written when an error occurs keep their new values.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::UnsupportedKind`] before anything is written when a
    ///   field's storage type is not supported;
    /// - [`ResolveError::Coercion`] when a default or environment literal
    ///   does not parse as the field's kind;
    /// - [`ResolveError::KindMismatch`] when the registrar reports a value of
    ///   the wrong kind for a field;
    /// - registration and parsing errors from the command-line registrar.
    pub fn resolve_with<T>(
        mut self,
        record: &mut T,
        schema: &Schema<T>,
    ) -> ResolveResult<Resolution> {
        let kinds = supported_kinds(schema)?;
        let mut fields = Vec::with_capacity(schema.len());
        for ((key, field), kind) in schema.iter().zip(kinds) {
            let (literal, source) = self.base_literal(field, kind);
            let value =
                coerce(kind, &literal).map_err(|err| ResolveError::coercion(field.name(), err))?;
            if let Some(flag) = &field.annotations().cli {
                let description = field.annotations().desc.as_deref().unwrap_or_default();
                self.registrar.register(key, flag, &value, description)?;
            }
            commit(record, field, value.clone())?;
            fields.push(FieldResolution {
                name: field.name().to_owned(),
                source,
                value,
            });
        }

        let parsed = self.registrar.parse_arguments(&self.args)?;
        for (key, value) in parsed.assignments {
            apply_cli(record, schema, &mut fields, key, value)?;
        }
        for resolved in &fields {
            tracing::debug!(
                field = %resolved.name,
                source = ?resolved.source,
                value = %resolved.value,
                "resolved configuration field"
            );
        }
        Ok(Resolution {
            fields,
            remaining: parsed.remaining,
        })
    }

    fn base_literal<T>(&self, field: &FieldSpec<T>, kind: Kind) -> (String, Source) {
        let annotations = field.annotations();
        let from_env = annotations
            .env
            .as_deref()
            .and_then(|name| self.env.lookup(name));
        match (from_env, &annotations.default) {
            (Some(value), _) => (value, Source::Environment),
            (None, Some(default)) => (default.clone(), Source::Default),
            (None, None) => (kind.zero_literal().to_owned(), Source::Zero),
        }
    }
}

fn supported_kinds<T>(schema: &Schema<T>) -> ResolveResult<Vec<Kind>> {
    schema
        .fields()
        .iter()
        .map(|field| {
            field.kind().ok_or_else(|| ResolveError::UnsupportedKind {
                field: field.name().to_owned(),
                type_name: field.type_name(),
            })
        })
        .collect()
}

fn commit<T>(record: &mut T, field: &FieldSpec<T>, value: ResolvedValue) -> ResolveResult<()> {
    if value.assign(field.slot(record)) {
        Ok(())
    } else {
        Err(ResolveError::UnsupportedKind {
            field: field.name().to_owned(),
            type_name: field.type_name(),
        })
    }
}

fn apply_cli<T>(
    record: &mut T,
    schema: &Schema<T>,
    fields: &mut [FieldResolution],
    key: FieldKey,
    value: ResolvedValue,
) -> ResolveResult<()> {
    let (Some(field), Some(resolved)) = (schema.get(key), fields.get_mut(key.index())) else {
        tracing::warn!(key = key.index(), "registrar reported a value for an unknown field");
        return Ok(());
    };
    let expected = resolved.value.kind();
    if value.kind() != expected {
        return Err(ResolveError::KindMismatch {
            field: field.name().to_owned(),
            expected,
            found: value.kind(),
        });
    }
    commit(record, field, value.clone())?;
    resolved.source = Source::Cli;
    resolved.value = value;
    Ok(())
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests panic to surface resolution mistakes"
)]
mod tests {
    use super::*;
    use crate::env::MapEnv;
    use crate::registrar::ParsedArguments;

    #[derive(Debug, Default)]
    struct Cfg {
        name: String,
        count: i64,
        on: bool,
    }

    /// Registrar double recording registrations and replaying fixed values.
    #[derive(Default)]
    struct Recording {
        registered: Vec<(FieldKey, String, ResolvedValue, String)>,
        replay: Vec<(FieldKey, ResolvedValue)>,
        parses: usize,
    }

    impl Recording {
        fn record(&mut self, key: FieldKey, name: &str, value: ResolvedValue, description: &str) {
            self.registered
                .push((key, name.to_owned(), value, description.to_owned()));
        }
    }

    impl CommandLineRegistrar for &mut Recording {
        fn register_int(
            &mut self,
            key: FieldKey,
            name: &str,
            default: i64,
            description: &str,
        ) -> ResolveResult<()> {
            self.record(key, name, ResolvedValue::Integer(default), description);
            Ok(())
        }

        fn register_string(
            &mut self,
            key: FieldKey,
            name: &str,
            default: &str,
            description: &str,
        ) -> ResolveResult<()> {
            self.record(key, name, ResolvedValue::String(default.to_owned()), description);
            Ok(())
        }

        fn register_bool(
            &mut self,
            key: FieldKey,
            name: &str,
            default: bool,
            description: &str,
        ) -> ResolveResult<()> {
            self.record(key, name, ResolvedValue::Boolean(default), description);
            Ok(())
        }

        fn parse_arguments(&mut self, _argv: &[OsString]) -> ResolveResult<ParsedArguments> {
            self.parses += 1;
            Ok(ParsedArguments {
                assignments: std::mem::take(&mut self.replay),
                remaining: Vec::new(),
            })
        }
    }

    fn schema() -> Schema<Cfg> {
        Schema::new()
            .field(
                FieldSpec::new("name", |c: &mut Cfg| &mut c.name)
                    .env("NAME")
                    .cli("name")
                    .desc("who"),
            )
            .field(
                FieldSpec::new("count", |c: &mut Cfg| &mut c.count)
                    .default_value("4")
                    .cli("count"),
            )
            .field(FieldSpec::new("on", |c: &mut Cfg| &mut c.on).env("ON"))
    }

    #[test]
    fn registers_cli_fields_with_resolved_defaults_and_parses_once() {
        let mut recording = Recording::default();
        let mut cfg = Cfg::default();
        FieldResolver::new(MapEnv::new().with("NAME", "env-name"), &mut recording)
            .resolve_with(&mut cfg, &schema())
            .expect("resolve");
        assert_eq!(
            recording.registered,
            vec![
                (
                    FieldKey::new(0),
                    "name".to_owned(),
                    ResolvedValue::String("env-name".to_owned()),
                    "who".to_owned(),
                ),
                (
                    FieldKey::new(1),
                    "count".to_owned(),
                    ResolvedValue::Integer(4),
                    String::new(),
                ),
            ]
        );
        assert_eq!(recording.parses, 1);
        assert_eq!(cfg.name, "env-name");
        assert_eq!(cfg.count, 4);
    }

    #[test]
    fn parsed_values_are_written_by_key() {
        let mut recording = Recording {
            replay: vec![(FieldKey::new(1), ResolvedValue::Integer(11))],
            ..Recording::default()
        };
        let mut cfg = Cfg::default();
        let resolution = FieldResolver::new(MapEnv::new(), &mut recording)
            .resolve_with(&mut cfg, &schema())
            .expect("resolve");
        assert_eq!(cfg.count, 11);
        assert_eq!(resolution.source_of("count"), Some(Source::Cli));
        assert_eq!(resolution.source_of("name"), Some(Source::Zero));
    }

    #[test]
    fn mismatched_parsed_value_is_rejected() {
        let mut recording = Recording {
            replay: vec![(FieldKey::new(1), ResolvedValue::Boolean(true))],
            ..Recording::default()
        };
        let mut cfg = Cfg::default();
        let err = FieldResolver::new(MapEnv::new(), &mut recording)
            .resolve_with(&mut cfg, &schema())
            .expect_err("kind mismatch");
        assert!(matches!(
            err,
            ResolveError::KindMismatch {
                field,
                expected: Kind::Integer,
                found: Kind::Boolean,
            } if field == "count"
        ));
        assert_eq!(cfg.count, 4);
    }

    #[test]
    fn unknown_keys_from_registrar_are_ignored() {
        let mut recording = Recording {
            replay: vec![(FieldKey::new(9), ResolvedValue::Integer(1))],
            ..Recording::default()
        };
        let mut cfg = Cfg::default();
        FieldResolver::new(MapEnv::new(), &mut recording)
            .resolve_with(&mut cfg, &schema())
            .expect("resolve");
        assert_eq!(cfg.count, 4);
    }

    #[test]
    fn parses_once_even_without_flags() {
        let mut recording = Recording::default();
        let mut cfg = Cfg::default();
        let schema = Schema::new().field(FieldSpec::new("on", |c: &mut Cfg| &mut c.on));
        FieldResolver::new(MapEnv::new(), &mut recording)
            .resolve_with(&mut cfg, &schema)
            .expect("resolve");
        assert!(recording.registered.is_empty());
        assert_eq!(recording.parses, 1);
    }

    #[test]
    fn coercion_failure_keeps_earlier_commits() {
        let mut recording = Recording::default();
        let mut cfg = Cfg::default();
        let err = FieldResolver::new(MapEnv::new().with("ON", "perhaps"), &mut recording)
            .resolve_with(&mut cfg, &schema())
            .expect_err("bad boolean");
        assert!(matches!(
            err,
            ResolveError::Coercion { field, kind: Kind::Boolean, .. } if field == "on"
        ));
        assert_eq!(cfg.count, 4);
        assert_eq!(recording.parses, 0);
    }
}
