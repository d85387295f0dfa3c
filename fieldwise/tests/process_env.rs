//! Resolution against the real process environment.
//!
//! These tests mutate process-wide state, so they run serially and hold the
//! shared environment lock for their whole body.

use anyhow::{Result, ensure};
use fieldwise::{
    ClapRegistrar, Configurable, EnvironmentStore, FieldResolver, ProcessEnv, Source,
};
use serial_test::serial;
use test_helpers::{argv, env};

#[derive(Configurable, Debug, Default)]
struct ServiceConfig {
    #[config(default = "localhost", env = "FIELDWISE_TEST_HOST", cli = "host")]
    host: String,
    #[config(default = "8080", env = "FIELDWISE_TEST_PORT", cli = "port")]
    port: i64,
    #[config(env = "FIELDWISE_TEST_DEBUG")]
    debug: bool,
}

fn resolve_with_args(args: &[&str]) -> Result<(ServiceConfig, fieldwise::Resolution)> {
    let mut cfg = ServiceConfig::default();
    let resolution = FieldResolver::new(ProcessEnv, ClapRegistrar::new("service"))
        .with_args(argv(args))
        .resolve(&mut cfg)?;
    Ok((cfg, resolution))
}

#[test]
#[serial]
fn reads_variables_from_process_environment() -> Result<()> {
    let lock = env::lock();
    let _host = lock.set_var("FIELDWISE_TEST_HOST", "example.org");
    let _port = lock.set_var("FIELDWISE_TEST_PORT", "9000");
    let _debug = lock.set_var("FIELDWISE_TEST_DEBUG", "1");

    let (cfg, resolution) = resolve_with_args(&[])?;
    ensure!(cfg.host == "example.org");
    ensure!(cfg.port == 9000);
    ensure!(cfg.debug);
    ensure!(resolution.source_of("host") == Some(Source::Environment));
    Ok(())
}

#[test]
#[serial]
fn unset_variables_fall_back_to_defaults() -> Result<()> {
    let lock = env::lock();
    let _host = lock.remove_var("FIELDWISE_TEST_HOST");
    let _port = lock.remove_var("FIELDWISE_TEST_PORT");
    let _debug = lock.remove_var("FIELDWISE_TEST_DEBUG");

    let (cfg, resolution) = resolve_with_args(&["-port", "1234"])?;
    ensure!(cfg.host == "localhost");
    ensure!(cfg.port == 1234);
    ensure!(!cfg.debug);
    ensure!(resolution.source_of("debug") == Some(Source::Zero));
    Ok(())
}

#[test]
#[serial]
fn empty_variable_is_reported_as_set() -> Result<()> {
    let lock = env::lock();
    let _empty = lock.set_var("FIELDWISE_TEST_EMPTY", "");
    ensure!(ProcessEnv.lookup("FIELDWISE_TEST_EMPTY").as_deref() == Some(""));
    let _gone = lock.remove_var("FIELDWISE_TEST_EMPTY");
    ensure!(ProcessEnv.lookup("FIELDWISE_TEST_EMPTY").is_none());
    Ok(())
}

#[cfg(unix)]
#[test]
#[serial]
fn non_unicode_values_are_converted_lossily() -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let lock = env::lock();
    let _bad = lock.set_var(
        "FIELDWISE_TEST_BYTES",
        OsStr::from_bytes(&[b'a', 0xff, b'b']),
    );
    ensure!(ProcessEnv.lookup("FIELDWISE_TEST_BYTES").as_deref() == Some("a\u{fffd}b"));
    Ok(())
}
