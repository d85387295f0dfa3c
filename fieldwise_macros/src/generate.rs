//! Token generation for the `Configurable` derive macro.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::Ident;
use syn::ext::IdentExt;

use crate::parse::ConfigField;

/// Builder call appending one field to the generated schema.
pub(crate) fn field_spec(field: &ConfigField) -> TokenStream2 {
    let ident = &field.ident;
    let name = ident.unraw().to_string();
    let annotation = |method: &str, value: Option<&str>| {
        value.map(|v| {
            let method = Ident::new(method, proc_macro2::Span::call_site());
            quote! { .#method(#v) }
        })
    };
    let default = annotation("default_value", field.attrs.default.as_deref());
    let env = annotation("env", field.attrs.env.as_deref());
    let cli = annotation("cli", field.attrs.cli.as_deref());
    let desc = annotation("desc", field.attrs.desc.as_deref());
    quote! {
        .field(
            ::fieldwise::FieldSpec::new(#name, |record: &mut Self| &mut record.#ident)
                #default #env #cli #desc
        )
    }
}

/// Implementation of `fieldwise::Configurable` for `ident`.
pub(crate) fn configurable_impl(ident: &Ident, fields: &[ConfigField]) -> TokenStream2 {
    let specs = fields.iter().map(field_spec);
    quote! {
        impl ::fieldwise::Configurable for #ident {
            fn schema() -> ::fieldwise::Schema<Self> {
                ::fieldwise::Schema::new()
                    #( #specs )*
            }
        }
    }
}
