//! Behaviour of records deriving `Configurable`.

use anyhow::{Result, bail, ensure};
use fieldwise::{
    ClapRegistrar, Configurable, FieldResolver, Kind, MapEnv, ResolveError, Resolution, Source,
};
use rstest::rstest;
use test_helpers::argv;

fn resolve<T: Configurable>(
    record: &mut T,
    env: MapEnv,
    args: &[&str],
) -> fieldwise::ResolveResult<Resolution> {
    FieldResolver::new(env, ClapRegistrar::new("derive-test"))
        .with_args(argv(args))
        .resolve(record)
}

#[derive(Configurable, Debug)]
struct Plain {
    x: String,
    y: i64,
    z: bool,
}

#[test]
fn unannotated_fields_take_zero_values() -> Result<()> {
    let mut cfg = Plain {
        x: "asdfasdf".to_owned(),
        y: 54,
        z: true,
    };
    resolve(&mut cfg, MapEnv::new(), &[])?;
    ensure!(cfg.x.is_empty(), "string zero value: {:?}", cfg.x);
    ensure!(cfg.y == 0, "integer zero value: {}", cfg.y);
    ensure!(!cfg.z, "boolean zero value");
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct EnvOnly {
    #[config(env = "X")]
    x: String,
    #[config(env = "Y")]
    y: i64,
    #[config(env = "Z")]
    z: bool,
}

#[test]
fn environment_only_fields() -> Result<()> {
    let env = MapEnv::from_iter([("X", "FOO"), ("Y", "11"), ("Z", "True")]);
    let mut cfg = EnvOnly::default();
    resolve(&mut cfg, env, &[])?;
    ensure!(cfg.x == "FOO");
    ensure!(cfg.y == 11);
    ensure!(cfg.z);
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct CliOnly {
    #[config(cli = "x")]
    x: String,
    #[config(cli = "yyy")]
    y: String,
    #[config(cli = "zzz")]
    z: String,
}

#[test]
fn cli_only_fields_accept_each_spelling() -> Result<()> {
    let mut cfg = CliOnly::default();
    resolve(
        &mut cfg,
        MapEnv::new(),
        &["-x", "BAR", "--yyy", "yval", "--zzz=zval"],
    )?;
    ensure!(cfg.x == "BAR");
    ensure!(cfg.y == "yval");
    ensure!(cfg.z == "zval");
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct Defaults {
    #[config(default = "XXX")]
    x: String,
    #[config(default = "10")]
    y: i64,
    #[config(default = "true")]
    z: bool,
}

#[test]
fn provided_defaults_are_coerced() -> Result<()> {
    let mut cfg = Defaults::default();
    let resolution = resolve(&mut cfg, MapEnv::new(), &[])?;
    ensure!(cfg.x == "XXX");
    ensure!(cfg.y == 10);
    ensure!(cfg.z);
    ensure!(resolution.source_of("y") == Some(Source::Default));
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct EnvOverDefault {
    #[config(default = "XXX", env = "X")]
    x: String,
    #[config(default = "10", env = "Y")]
    y: i64,
    #[config(default = "true", env = "Z")]
    z: bool,
}

#[test]
fn environment_overrides_defaults() -> Result<()> {
    let env = MapEnv::from_iter([("X", "EnvX"), ("Y", "11"), ("Z", "False")]);
    let mut cfg = EnvOverDefault::default();
    resolve(&mut cfg, env, &[])?;
    ensure!(cfg.x == "EnvX");
    ensure!(cfg.y == 11);
    ensure!(!cfg.z);
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct CliOverEnv {
    #[config(env = "X", cli = "xxxx")]
    x: String,
    #[config(env = "Y", cli = "yyyy")]
    y: i64,
    #[config(env = "Z", cli = "zzzz")]
    z: bool,
}

#[test]
fn command_line_overrides_environment() -> Result<()> {
    let env = MapEnv::from_iter([("X", "EnvX"), ("Y", "10"), ("Z", "TRUE")]);
    let mut cfg = CliOverEnv::default();
    resolve(
        &mut cfg,
        env,
        &["--xxxx=cli_xxx", "--yyyy", "155", "--zzzz=false"],
    )?;
    ensure!(cfg.x == "cli_xxx");
    ensure!(cfg.y == 155);
    ensure!(!cfg.z);
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct Documented {
    /// Number of worker threads.
    #[config(default = "4", cli = "workers")]
    workers: i64,
    #[config(cli = "name", desc = "Display name", unknown = "ignored")]
    name: String,
}

#[test]
fn schema_carries_descriptions() -> Result<()> {
    let schema = Documented::schema();
    let descriptions: Vec<_> = schema
        .fields()
        .iter()
        .map(|field| field.annotations().desc.clone())
        .collect();
    ensure!(
        descriptions
            == [
                Some("Number of worker threads.".to_owned()),
                Some("Display name".to_owned()),
            ],
        "descriptions: {descriptions:?}"
    );
    Ok(())
}

#[test]
fn derived_and_built_schemas_agree() -> Result<()> {
    let derived = CliOverEnv::schema();
    let kinds: Vec<_> = derived
        .fields()
        .iter()
        .map(|f| (f.name().to_owned(), f.kind()))
        .collect();
    ensure!(
        kinds
            == [
                ("x".to_owned(), Some(Kind::String)),
                ("y".to_owned(), Some(Kind::Integer)),
                ("z".to_owned(), Some(Kind::Boolean)),
            ]
    );
    let env_names: Vec<_> = derived
        .fields()
        .iter()
        .filter_map(|f| f.annotations().env.clone())
        .collect();
    ensure!(env_names == ["X", "Y", "Z"]);
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct WithFloat {
    #[config(default = "1")]
    count: i64,
    ratio: f64,
}

#[test]
fn unsupported_kind_fails_before_any_write() -> Result<()> {
    let mut cfg = WithFloat {
        count: 42,
        ratio: 0.5,
    };
    let Err(err) = resolve(&mut cfg, MapEnv::new(), &[]) else {
        bail!("expected an unsupported kind error");
    };
    ensure!(
        matches!(
            &err,
            ResolveError::UnsupportedKind { field, type_name }
                if field == "ratio" && *type_name == "f64"
        ),
        "unexpected error: {err}"
    );
    ensure!(cfg.count == 42, "count was written before the shape check");
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct BadDefault {
    #[config(default = "notanint")]
    n: i64,
}

#[derive(Configurable, Debug, Default)]
struct BadBool {
    #[config(default = "yes", cli = "b")]
    b: bool,
}

#[rstest]
#[case::integer(resolve(&mut BadDefault::default(), MapEnv::new(), &[]), "n", Kind::Integer)]
#[case::boolean(resolve(&mut BadBool::default(), MapEnv::new(), &[]), "b", Kind::Boolean)]
fn malformed_defaults_are_errors(
    #[case] outcome: fieldwise::ResolveResult<Resolution>,
    #[case] expected_field: &str,
    #[case] expected_kind: Kind,
) -> Result<()> {
    let Err(err) = outcome else {
        bail!("expected a coercion error");
    };
    ensure!(
        matches!(
            &err,
            ResolveError::Coercion { field, kind, .. }
                if field == expected_field && *kind == expected_kind
        ),
        "unexpected error: {err}"
    );
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct Keyword {
    #[config(default = "plain", cli = "type")]
    r#type: String,
}

#[test]
fn raw_identifier_fields_use_plain_names() -> Result<()> {
    let mut cfg = Keyword::default();
    let resolution = resolve(&mut cfg, MapEnv::new(), &["-type", "fancy"])?;
    ensure!(cfg.r#type == "fancy");
    ensure!(resolution.field("type").is_some());
    Ok(())
}

#[derive(Configurable, Debug, Default)]
struct Nothing;

#[test]
fn unit_struct_resolves_trivially() -> Result<()> {
    let resolution = resolve(&mut Nothing, MapEnv::new(), &["left", "over"])?;
    ensure!(resolution.fields().is_empty());
    ensure!(resolution.remaining() == ["left", "over"]);
    Ok(())
}
