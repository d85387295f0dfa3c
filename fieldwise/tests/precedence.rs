//! Precedence of command-line, environment, default and zero values.
//!
//! A single field carries every annotation. Each case removes one layer and
//! checks that the next one down decides the value.

use anyhow::{Result, ensure};
use fieldwise::{
    ClapRegistrar, FieldResolver, FieldSpec, Kind, MapEnv, ResolveError, ResolvedValue, Schema,
    Source,
};
use rstest::rstest;
use test_helpers::argv;

#[derive(Debug, Default)]
struct Layered {
    text: String,
    number: i64,
    flag: bool,
}

fn schema(with_default: bool) -> Schema<Layered> {
    let text = FieldSpec::new("text", |c: &mut Layered| &mut c.text)
        .env("LAYERED_TEXT")
        .cli("text");
    let number = FieldSpec::new("number", |c: &mut Layered| &mut c.number)
        .env("LAYERED_NUMBER")
        .cli("number");
    let flag = FieldSpec::new("flag", |c: &mut Layered| &mut c.flag)
        .env("LAYERED_FLAG")
        .cli("flag");
    if with_default {
        Schema::new()
            .field(text.default_value("from-default"))
            .field(number.default_value("1"))
            .field(flag.default_value("true"))
    } else {
        Schema::new().field(text).field(number).field(flag)
    }
}

fn full_env() -> MapEnv {
    MapEnv::new()
        .with("LAYERED_TEXT", "from-env")
        .with("LAYERED_NUMBER", "2")
        .with("LAYERED_FLAG", "false")
}

fn run(
    env: MapEnv,
    args: &[&str],
    with_default: bool,
) -> Result<(Layered, fieldwise::Resolution)> {
    let mut cfg = Layered::default();
    let resolution = FieldResolver::new(env, ClapRegistrar::new("layered"))
        .with_args(argv(args))
        .resolve_with(&mut cfg, &schema(with_default))?;
    Ok((cfg, resolution))
}

#[test]
fn cli_beats_environment_and_default() -> Result<()> {
    let (cfg, resolution) = run(
        full_env(),
        &["--text", "from-cli", "-number=3", "--flag"],
        true,
    )?;
    ensure!(cfg.text == "from-cli", "text was {:?}", cfg.text);
    ensure!(cfg.number == 3, "number was {}", cfg.number);
    ensure!(cfg.flag, "flag should be set from the command line");
    for name in ["text", "number", "flag"] {
        ensure!(resolution.source_of(name) == Some(Source::Cli), "{name}");
    }
    Ok(())
}

#[test]
fn environment_beats_default_without_cli() -> Result<()> {
    let (cfg, resolution) = run(full_env(), &[], true)?;
    ensure!(cfg.text == "from-env");
    ensure!(cfg.number == 2);
    ensure!(!cfg.flag);
    ensure!(resolution.source_of("number") == Some(Source::Environment));
    Ok(())
}

#[test]
fn default_beats_zero_without_environment() -> Result<()> {
    let (cfg, resolution) = run(MapEnv::new(), &[], true)?;
    ensure!(cfg.text == "from-default");
    ensure!(cfg.number == 1);
    ensure!(cfg.flag);
    ensure!(resolution.source_of("flag") == Some(Source::Default));
    Ok(())
}

#[test]
fn zero_values_without_any_source() -> Result<()> {
    let mut cfg = Layered {
        text: "stale".to_owned(),
        number: 99,
        flag: true,
    };
    let resolution = FieldResolver::new(MapEnv::new(), ClapRegistrar::new("layered"))
        .resolve_with(&mut cfg, &schema(false))?;
    ensure!(cfg.text.is_empty());
    ensure!(cfg.number == 0);
    ensure!(!cfg.flag);
    ensure!(
        resolution
            .fields()
            .iter()
            .all(|field| field.source == Source::Zero)
    );
    Ok(())
}

#[test]
fn unsupplied_flags_keep_environment_values() -> Result<()> {
    let (cfg, resolution) = run(full_env(), &["--number", "7"], true)?;
    ensure!(cfg.number == 7);
    ensure!(cfg.text == "from-env");
    ensure!(resolution.source_of("text") == Some(Source::Environment));
    Ok(())
}

#[rstest]
#[case::short_dash(&["-text", "v"])]
#[case::long_space(&["--text", "v"])]
#[case::long_equals(&["--text=v"])]
fn every_flag_spelling_overrides(#[case] args: &[&str]) -> Result<()> {
    let (cfg, _) = run(full_env(), args, true)?;
    ensure!(cfg.text == "v", "text was {:?}", cfg.text);
    Ok(())
}

#[rstest]
#[case::separate_value(&["-number", "8080"])]
#[case::inline_value(&["-number=8080"])]
fn single_dash_flag_overrides_environment(#[case] args: &[&str]) -> Result<()> {
    let (cfg, resolution) = run(full_env(), args, true)?;
    ensure!(cfg.number == 8080, "number was {}", cfg.number);
    ensure!(resolution.source_of("number") == Some(Source::Cli));
    ensure!(cfg.text == "from-env", "text was {:?}", cfg.text);
    Ok(())
}

#[test]
fn empty_environment_value_overrides_default() -> Result<()> {
    let (cfg, _) = run(MapEnv::new().with("LAYERED_TEXT", ""), &[], true)?;
    ensure!(cfg.text.is_empty());
    Ok(())
}

#[test]
fn remaining_arguments_are_reported() -> Result<()> {
    let (_, resolution) = run(MapEnv::new(), &["--flag", "serve", "--text", "x"], true)?;
    ensure!(
        resolution.remaining() == ["serve", "--text", "x"],
        "remaining: {:?}",
        resolution.remaining()
    );
    Ok(())
}

#[test]
fn resolution_reports_values_in_schema_order() -> Result<()> {
    let (_, resolution) = run(MapEnv::new(), &["--number=5"], true)?;
    let values: Vec<_> = resolution
        .fields()
        .iter()
        .map(|field| field.value.clone())
        .collect();
    ensure!(
        values
            == [
                ResolvedValue::String("from-default".to_owned()),
                ResolvedValue::Integer(5),
                ResolvedValue::Boolean(true),
            ]
    );
    Ok(())
}

#[test]
fn malformed_environment_integer_fails() -> Result<()> {
    let env = MapEnv::new().with("LAYERED_NUMBER", "two");
    let Err(err) = run(env, &[], true) else {
        anyhow::bail!("expected a coercion error");
    };
    let err = err.downcast::<ResolveError>()?;
    ensure!(
        matches!(
            &err,
            ResolveError::Coercion { field, kind: Kind::Integer, value, .. }
                if field == "number" && value == "two"
        ),
        "unexpected error: {err}"
    );
    Ok(())
}

#[test]
fn malformed_command_line_value_is_a_registrar_error() -> Result<()> {
    let Err(err) = run(MapEnv::new(), &["--number", "lots"], true) else {
        anyhow::bail!("expected a command-line error");
    };
    let err = err.downcast::<ResolveError>()?;
    ensure!(
        matches!(err, ResolveError::CommandLine(_)),
        "unexpected error: {err}"
    );
    Ok(())
}

#[test]
fn duplicate_flag_names_are_rejected() -> Result<()> {
    let schema = Schema::new()
        .field(FieldSpec::new("text", |c: &mut Layered| &mut c.text).cli("same"))
        .field(FieldSpec::new("number", |c: &mut Layered| &mut c.number).cli("same"));
    let mut cfg = Layered::default();
    let err = FieldResolver::new(MapEnv::new(), ClapRegistrar::new("layered"))
        .resolve_with(&mut cfg, &schema)
        .err();
    ensure!(
        matches!(&err, Some(ResolveError::FlagRedefined { flag }) if flag == "same"),
        "unexpected outcome: {err:?}"
    );
    Ok(())
}
