//! Command-line flag registration and parsing.
//!
//! Flags are registered against a [`FieldKey`] rather than a storage
//! location. Parsing reports a value only for flags that were actually
//! supplied, and the resolver writes those values back through the schema.
//!
//! [`ClapRegistrar`] is the default implementation. It accepts the usual
//! flag spellings:
//!
//! - `--name value` and `--name=value`;
//! - `-name value` and `-name=value`, including multi-character names;
//! - `--flag` alone for boolean flags, with `--flag=false` to clear them.
//!
//! Parsing stops at the first positional argument or after `--`; everything
//! from there on is returned as [`ParsedArguments::remaining`], unchanged and
//! without requiring valid UTF-8.

use std::ffi::OsString;

use clap::builder::ValueParser;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::error::{ResolveError, ResolveResult};
use crate::kind::{CoercionError, Kind, ResolvedValue, coerce};
use crate::schema::FieldKey;

const HELP_ID: &str = "help";
const REMAINING_ID: &str = "remaining";

/// Accepts typed flag definitions and later parses arguments for them.
pub trait CommandLineRegistrar {
    /// Register an integer flag.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::FlagRedefined`] or
    /// [`ResolveError::InvalidFlagName`] when `name` cannot be registered.
    fn register_int(
        &mut self,
        key: FieldKey,
        name: &str,
        default: i64,
        description: &str,
    ) -> ResolveResult<()>;

    /// Register a string flag.
    ///
    /// # Errors
    ///
    /// As for [`CommandLineRegistrar::register_int`].
    fn register_string(
        &mut self,
        key: FieldKey,
        name: &str,
        default: &str,
        description: &str,
    ) -> ResolveResult<()>;

    /// Register a boolean flag.
    ///
    /// # Errors
    ///
    /// As for [`CommandLineRegistrar::register_int`].
    fn register_bool(
        &mut self,
        key: FieldKey,
        name: &str,
        default: bool,
        description: &str,
    ) -> ResolveResult<()>;

    /// Parse `argv` (without the program name) against the registered flags.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::CommandLine`] when the arguments are
    /// malformed or help was requested.
    fn parse_arguments(&mut self, argv: &[OsString]) -> ResolveResult<ParsedArguments>;

    /// Register a flag whose type follows `default`.
    ///
    /// # Errors
    ///
    /// As for [`CommandLineRegistrar::register_int`].
    fn register(
        &mut self,
        key: FieldKey,
        name: &str,
        default: &ResolvedValue,
        description: &str,
    ) -> ResolveResult<()> {
        match default {
            ResolvedValue::Integer(v) => self.register_int(key, name, *v, description),
            ResolvedValue::String(v) => self.register_string(key, name, v, description),
            ResolvedValue::Boolean(v) => self.register_bool(key, name, *v, description),
        }
    }
}

/// Outcome of parsing the command line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedArguments {
    /// Values for flags present on the command line, in registration order.
    pub assignments: Vec<(FieldKey, ResolvedValue)>,
    /// Arguments left over after flag parsing stopped.
    pub remaining: Vec<OsString>,
}

#[derive(Clone, Debug)]
struct Flag {
    key: FieldKey,
    name: String,
    default: ResolvedValue,
    description: String,
}

impl Flag {
    fn id(&self) -> String {
        format!("field-{}", self.key.index())
    }

    const fn takes_value(&self) -> bool {
        !matches!(self.default, ResolvedValue::Boolean(_))
    }

    fn to_arg(&self) -> Arg {
        let arg = Arg::new(self.id())
            .long(self.name.clone())
            .help(self.description.clone())
            .action(ArgAction::Set);
        match &self.default {
            ResolvedValue::Integer(v) => arg
                .value_name("int")
                .num_args(1)
                .allow_hyphen_values(true)
                .value_parser(kind_parser(Kind::Integer))
                .default_value(v.to_string()),
            ResolvedValue::String(v) => {
                let text = arg
                    .value_name("string")
                    .num_args(1)
                    .allow_hyphen_values(true)
                    .value_parser(kind_parser(Kind::String));
                if v.is_empty() {
                    text
                } else {
                    text.default_value(v.clone())
                }
            }
            ResolvedValue::Boolean(v) => arg
                .value_name("bool")
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(kind_parser(Kind::Boolean))
                .default_value(v.to_string()),
        }
    }

    fn read(&self, matches: &ArgMatches) -> ResolveResult<Option<ResolvedValue>> {
        let id = self.id();
        if matches.value_source(&id) != Some(ValueSource::CommandLine) {
            return Ok(None);
        }
        Ok(matches.try_get_one::<ResolvedValue>(&id)?.cloned())
    }
}

fn kind_parser(kind: Kind) -> ValueParser {
    ValueParser::new(move |raw: &str| -> Result<ResolvedValue, CoercionError> {
        coerce(kind, raw)
    })
}

/// [`CommandLineRegistrar`] backed by a `clap` command built at parse time.
///
/// # Examples
///
/// ```
/// use std::ffi::OsString;
/// use fieldwise::{ClapRegistrar, CommandLineRegistrar, FieldKey, ResolvedValue};
///
/// let mut registrar = ClapRegistrar::new("demo");
/// registrar.register_int(FieldKey::new(0), "port", 80, "Port")?;
/// let parsed = registrar.parse_arguments(&[OsString::from("-port"), OsString::from("8080")])?;
/// assert_eq!(parsed.assignments, vec![(FieldKey::new(0), ResolvedValue::Integer(8080))]);
/// # Ok::<(), fieldwise::ResolveError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ClapRegistrar {
    program: String,
    about: Option<String>,
    flags: Vec<Flag>,
}

impl ClapRegistrar {
    /// Create a registrar whose usage text names `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            about: None,
            flags: Vec::new(),
        }
    }

    /// Set the summary shown at the top of the help text.
    #[must_use]
    pub fn about(mut self, text: impl Into<String>) -> Self {
        self.about = Some(text.into());
        self
    }

    /// Build the `clap` command describing every registered flag.
    #[must_use]
    pub fn command(&self) -> Command {
        let mut command = Command::new(self.program.clone())
            .disable_help_flag(true)
            .args_override_self(true)
            .args(self.flags.iter().map(Flag::to_arg))
            .arg(
                Arg::new(REMAINING_ID)
                    .num_args(0..)
                    .value_parser(value_parser!(OsString))
                    .trailing_var_arg(true)
                    .hide(true)
                    .action(ArgAction::Append),
            );
        if let Some(about) = &self.about {
            command = command.about(about.clone());
        }
        match self.help_arg() {
            Some(help) => command.arg(help),
            None => command,
        }
    }

    fn help_arg(&self) -> Option<Arg> {
        let long = !self.claims("help");
        let short = !self.claims("h");
        if !long && !short {
            return None;
        }
        let help = Arg::new(HELP_ID)
            .action(ArgAction::Help)
            .help("Print help");
        let with_long = if long { help.long("help") } else { help };
        Some(if short { with_long.short('h') } else { with_long })
    }

    fn claims(&self, name: &str) -> bool {
        self.flags.iter().any(|flag| flag.name == name)
    }

    fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|flag| flag.name == name)
    }

    fn push(
        &mut self,
        key: FieldKey,
        name: &str,
        default: ResolvedValue,
        description: &str,
    ) -> ResolveResult<()> {
        validate_flag_name(name)?;
        if self.claims(name) {
            return Err(ResolveError::FlagRedefined {
                flag: name.to_owned(),
            });
        }
        self.flags.push(Flag {
            key,
            name: name.to_owned(),
            default,
            description: description.to_owned(),
        });
        Ok(())
    }

    /// Rewrite single-dash spellings of known long flags to `--name`.
    ///
    /// Rewriting stops where flag parsing stops, so positional arguments
    /// that happen to start with `-` are passed through untouched.
    fn normalise(&self, argv: &[OsString]) -> Vec<OsString> {
        let mut out = Vec::with_capacity(argv.len());
        let mut args = argv.iter();
        while let Some(arg) = args.next() {
            let Some(token) = arg.to_str().and_then(FlagToken::parse) else {
                out.push(arg.clone());
                break;
            };
            let known = self.lookup(token.name);
            let is_help = token.name == "help" && !self.claims("help");
            if token.single_dash && (known.is_some() || is_help) {
                out.push(OsString::from(format!("--{}", token.raw)));
            } else {
                out.push(arg.clone());
            }
            if !token.inline_value
                && known.is_some_and(Flag::takes_value)
                && let Some(value) = args.next()
            {
                out.push(value.clone());
            }
        }
        out.extend(args.cloned());
        out
    }
}

impl CommandLineRegistrar for ClapRegistrar {
    fn register_int(
        &mut self,
        key: FieldKey,
        name: &str,
        default: i64,
        description: &str,
    ) -> ResolveResult<()> {
        self.push(key, name, ResolvedValue::Integer(default), description)
    }

    fn register_string(
        &mut self,
        key: FieldKey,
        name: &str,
        default: &str,
        description: &str,
    ) -> ResolveResult<()> {
        self.push(
            key,
            name,
            ResolvedValue::String(default.to_owned()),
            description,
        )
    }

    fn register_bool(
        &mut self,
        key: FieldKey,
        name: &str,
        default: bool,
        description: &str,
    ) -> ResolveResult<()> {
        self.push(key, name, ResolvedValue::Boolean(default), description)
    }

    fn parse_arguments(&mut self, argv: &[OsString]) -> ResolveResult<ParsedArguments> {
        let args = self.normalise(argv);
        let matches = self
            .command()
            .try_get_matches_from(std::iter::once(OsString::from(&self.program)).chain(args))?;
        let mut assignments = Vec::new();
        for flag in &self.flags {
            if let Some(value) = flag.read(&matches)? {
                assignments.push((flag.key, value));
            }
        }
        let remaining = matches
            .try_get_many::<OsString>(REMAINING_ID)?
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        Ok(ParsedArguments {
            assignments,
            remaining,
        })
    }
}

/// A command-line token that looks like a flag.
struct FlagToken<'a> {
    /// The token without its leading dash.
    raw: &'a str,
    name: &'a str,
    single_dash: bool,
    inline_value: bool,
}

impl<'a> FlagToken<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        if text == "--" {
            return None;
        }
        let raw = text.strip_prefix('-')?;
        let (single_dash, body) = match raw.strip_prefix('-') {
            Some(rest) => (false, rest),
            None => (true, raw),
        };
        let (name, inline_value) = match body.split_once('=') {
            Some((name, _)) => (name, true),
            None => (body, false),
        };
        if name.is_empty() || name.starts_with('-') {
            return None;
        }
        Some(Self {
            raw,
            name,
            single_dash,
            inline_value,
        })
    }
}

fn validate_flag_name(name: &str) -> ResolveResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && !name.contains('=')
        && !name.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(ResolveError::InvalidFlagName {
            flag: name.to_owned(),
        })
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests panic to surface resolution mistakes"
)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[fixture]
    fn registrar() -> ClapRegistrar {
        let mut registrar = ClapRegistrar::new("test");
        registrar
            .register_string(FieldKey::new(0), "x", "", "single letter")
            .expect("register x");
        registrar
            .register_int(FieldKey::new(1), "count", 1, "a count")
            .expect("register count");
        registrar
            .register_bool(FieldKey::new(2), "verbose", false, "chatty")
            .expect("register verbose");
        registrar
    }

    #[rstest]
    #[case(&["-x", "BAR"])]
    #[case(&["--x", "BAR"])]
    #[case(&["--x=BAR"])]
    #[case(&["-x=BAR"])]
    fn accepts_every_string_spelling(mut registrar: ClapRegistrar, #[case] args: &[&str]) {
        let parsed = registrar.parse_arguments(&argv(args)).expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(0), ResolvedValue::String("BAR".to_owned()))]
        );
    }

    #[rstest]
    #[case(&["-count", "5"], 5)]
    #[case(&["--count", "-5"], -5)]
    #[case(&["-count=12"], 12)]
    #[case(&["--count", "1", "--count", "2"], 2)]
    #[case(&["-count", "-7"], -7)]
    #[case(&["-count", "1", "-count=2"], 2)]
    fn parses_integer_flags(
        mut registrar: ClapRegistrar,
        #[case] args: &[&str],
        #[case] expected: i64,
    ) {
        let parsed = registrar.parse_arguments(&argv(args)).expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(1), ResolvedValue::Integer(expected))]
        );
    }

    #[rstest]
    #[case(&["--verbose"], true)]
    #[case(&["-verbose"], true)]
    #[case(&["--verbose=false"], false)]
    #[case(&["-verbose=T"], true)]
    fn parses_boolean_flags(
        mut registrar: ClapRegistrar,
        #[case] args: &[&str],
        #[case] expected: bool,
    ) {
        let parsed = registrar.parse_arguments(&argv(args)).expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(2), ResolvedValue::Boolean(expected))]
        );
    }

    #[rstest]
    fn absent_flags_report_nothing(mut registrar: ClapRegistrar) {
        let parsed = registrar.parse_arguments(&[]).expect("parse");
        assert_eq!(parsed, ParsedArguments::default());
    }

    #[rstest]
    fn boolean_flag_does_not_consume_next_argument(mut registrar: ClapRegistrar) {
        let parsed = registrar
            .parse_arguments(&argv(&["--verbose", "false", "-count", "3"]))
            .expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(2), ResolvedValue::Boolean(true))]
        );
        assert_eq!(parsed.remaining, vec!["false", "-count", "3"]);
    }

    #[rstest]
    fn double_dash_ends_flag_parsing(mut registrar: ClapRegistrar) {
        let parsed = registrar
            .parse_arguments(&argv(&["-x", "a", "--", "-x", "b"]))
            .expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(0), ResolvedValue::String("a".to_owned()))]
        );
        assert_eq!(parsed.remaining, vec!["-x", "b"]);
    }

    #[rstest]
    fn string_value_may_start_with_dash(mut registrar: ClapRegistrar) {
        let parsed = registrar
            .parse_arguments(&argv(&["-x", "-count"]))
            .expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(0), ResolvedValue::String("-count".to_owned()))]
        );
    }

    #[rstest]
    fn single_dash_value_may_be_double_dash(mut registrar: ClapRegistrar) {
        let parsed = registrar
            .parse_arguments(&argv(&["-x", "--"]))
            .expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(0), ResolvedValue::String("--".to_owned()))]
        );
        assert!(parsed.remaining.is_empty());
    }

    #[rstest]
    fn flags_after_positional_are_left_alone(mut registrar: ClapRegistrar) {
        let parsed = registrar
            .parse_arguments(&argv(&["-verbose", "pos", "-5", "-x", "a"]))
            .expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(2), ResolvedValue::Boolean(true))]
        );
        assert_eq!(parsed.remaining, vec!["pos", "-5", "-x", "a"]);
    }

    #[cfg(unix)]
    #[rstest]
    fn non_unicode_positionals_pass_through(mut registrar: ClapRegistrar) {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![b'f', 0xff, b'o']);
        let parsed = registrar
            .parse_arguments(&[OsString::from("-count=3"), raw.clone()])
            .expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(1), ResolvedValue::Integer(3))]
        );
        assert_eq!(parsed.remaining, vec![raw]);
    }

    #[rstest]
    #[case(&["--count", "many"])]
    #[case(&["--verbose=maybe"])]
    #[case(&["--unknown"])]
    fn malformed_arguments_fail(mut registrar: ClapRegistrar, #[case] args: &[&str]) {
        let err = registrar
            .parse_arguments(&argv(args))
            .expect_err("malformed arguments");
        assert!(matches!(err, ResolveError::CommandLine(_)));
        assert!(!err.is_help_request());
    }

    #[rstest]
    #[case(&["--help"])]
    #[case(&["-help"])]
    #[case(&["-h"])]
    fn help_is_reported_as_request(mut registrar: ClapRegistrar, #[case] args: &[&str]) {
        let err = registrar
            .parse_arguments(&argv(args))
            .expect_err("help short-circuits parsing");
        assert!(err.is_help_request());
    }

    #[rstest]
    fn help_lists_flags_and_defaults(registrar: ClapRegistrar) {
        let help = registrar.command().render_help().to_string();
        assert!(help.contains("--count <int>"), "{help}");
        assert!(help.contains("a count"), "{help}");
        assert!(help.contains("[default: 1]"), "{help}");
        assert!(help.contains("--verbose"), "{help}");
    }

    #[rstest]
    fn help_shows_about_text(registrar: ClapRegistrar) {
        let help = registrar
            .about("Serves files over HTTP")
            .command()
            .render_help()
            .to_string();
        assert!(help.contains("Serves files over HTTP"), "{help}");
        assert!(help.contains("Usage: test"), "{help}");
    }

    #[test]
    fn field_may_claim_help_name() {
        let mut registrar = ClapRegistrar::new("test");
        registrar
            .register_string(FieldKey::new(0), "help", "", "topic")
            .expect("register help");
        let parsed = registrar
            .parse_arguments(&argv(&["-help", "flags"]))
            .expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(0), ResolvedValue::String("flags".to_owned()))]
        );
    }

    #[rstest]
    fn redefinition_is_rejected(mut registrar: ClapRegistrar) {
        let err = registrar
            .register_int(FieldKey::new(3), "count", 0, "")
            .expect_err("duplicate flag");
        assert!(matches!(err, ResolveError::FlagRedefined { flag } if flag == "count"));
    }

    #[rstest]
    #[case("")]
    #[case("-dash")]
    #[case("a=b")]
    #[case("two words")]
    fn invalid_names_are_rejected(#[case] name: &str) {
        let mut registrar = ClapRegistrar::new("test");
        let err = registrar
            .register_bool(FieldKey::new(0), name, false, "")
            .expect_err("invalid name");
        assert!(matches!(err, ResolveError::InvalidFlagName { .. }));
    }

    #[test]
    fn register_dispatches_on_value_kind() {
        let mut registrar = ClapRegistrar::new("test");
        registrar
            .register(FieldKey::new(4), "flag", &ResolvedValue::Boolean(true), "")
            .expect("register");
        let parsed = registrar
            .parse_arguments(&argv(&["--flag=0"]))
            .expect("parse");
        assert_eq!(
            parsed.assignments,
            vec![(FieldKey::new(4), ResolvedValue::Boolean(false))]
        );
    }
}
