//! Procedural macros for `fieldwise`.
//!
//! The [`Configurable`] derive turns a struct with named fields into a
//! `fieldwise::Schema`. Each field may carry a `#[config(...)]` attribute
//! with the string annotations `default`, `env`, `cli` and `desc`:
//!
//! ```rust,ignore
//! #[derive(fieldwise::Configurable, Default)]
//! struct AppConfig {
//!     #[config(default = "10", env = "APP_WORKERS", cli = "workers")]
//!     workers: i64,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod generate;
mod parse;

/// Derive macro for `fieldwise::Configurable`.
#[proc_macro_derive(Configurable, attributes(config))]
pub fn derive_configurable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match parse::parse_input(&input) {
        Ok((ident, fields)) => generate::configurable_impl(&ident, &fields).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
