//! Example binary resolving a server configuration from the process.
//!
//! ```text
//! SERVE_PORT=9000 cargo run --example serve -- -host 0.0.0.0 --verbose
//! ```

use std::io::{self, Write};
use std::process::ExitCode;

use fieldwise::{Configurable, FieldResolver, ResolveError};

#[derive(Configurable, Debug, Default)]
struct ServeConfig {
    /// Interface to bind.
    #[config(default = "127.0.0.1", env = "SERVE_HOST", cli = "host")]
    host: String,
    /// Port to listen on.
    #[config(default = "8080", env = "SERVE_PORT", cli = "port")]
    port: i64,
    /// Log every request.
    #[config(env = "SERVE_VERBOSE", cli = "verbose")]
    verbose: bool,
}

fn report(config: &ServeConfig, resolution: &fieldwise::Resolution) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{config:?}")?;
    for field in resolution.fields() {
        writeln!(stdout, "  {} = {} ({:?})", field.name, field.value, field.source)?;
    }
    if !resolution.remaining().is_empty() {
        writeln!(stdout, "  remaining: {:?}", resolution.remaining())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let mut config = ServeConfig::default();
    match FieldResolver::from_process().resolve(&mut config) {
        Ok(resolution) => match report(&config, &resolution) {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        },
        Err(ResolveError::CommandLine(err)) => err.exit(),
        Err(err) => writeln!(io::stderr(), "configuration error: {err}")
            .map_or(ExitCode::FAILURE, |()| ExitCode::from(2)),
    }
}
