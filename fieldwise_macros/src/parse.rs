//! Parsing utilities for the `Configurable` derive macro.

use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Fields, Ident, Lit, LitStr, Meta, Token,
    parenthesized,
};

/// Annotations recognised inside `#[config(...)]`.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub(crate) struct FieldAttrs {
    pub default: Option<String>,
    pub env: Option<String>,
    pub cli: Option<String>,
    pub desc: Option<String>,
}

/// A named struct field taking part in resolution.
#[derive(Clone)]
pub(crate) struct ConfigField {
    pub ident: Ident,
    pub attrs: FieldAttrs,
}

/// Consumes an unrecognised key-value or list without recording it.
fn discard_unknown(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        parenthesized!(content in meta.input);
        content.parse::<proc_macro2::TokenStream>()?;
    }
    Ok(())
}

fn lit_str(meta: &syn::meta::ParseNestedMeta, key: &str) -> syn::Result<String> {
    let lit = meta.value()?.parse::<Lit>()?;
    match lit {
        Lit::Str(s) => Ok(s.value()),
        other => Err(syn::Error::new(
            other.span(),
            format!("{key} must be a string literal"),
        )),
    }
}

/// Parses field-level `#[config(...)]` attributes.
///
/// Recognised keys are `default`, `env`, `cli` and `desc`. Unknown keys are
/// ignored. When `desc` is absent the first line of the field's doc comment
/// is used instead.
pub(crate) fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("config")) {
        attr.parse_nested_meta(|meta| {
            let Some(key) = meta.path.get_ident().map(ToString::to_string) else {
                return discard_unknown(&meta);
            };
            let slot = match key.as_str() {
                "default" => &mut out.default,
                "env" => &mut out.env,
                "cli" => &mut out.cli,
                "desc" => &mut out.desc,
                _ => return discard_unknown(&meta),
            };
            *slot = Some(lit_str(&meta, &key)?);
            Ok(())
        })?;
    }
    if out.desc.is_none() {
        out.desc = doc_summary(attrs);
    }
    Ok(out)
}

/// First non-empty line of the `///` comments attached to a field.
fn doc_summary(attrs: &[Attribute]) -> Option<String> {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s),
                _ => None,
            },
            _ => None,
        })
        .map(LitStr::value)
        .flat_map(|doc| {
            doc.lines()
                .map(|line| line.trim().to_owned())
                .collect::<Vec<_>>()
        })
        .find(|line| !line.is_empty())
}

/// Extracts the struct name and its fields from the derive input.
pub(crate) fn parse_input(input: &DeriveInput) -> syn::Result<(Ident, Vec<ConfigField>)> {
    let ident = input.ident.clone();
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Configurable cannot be derived for generic structs",
        ));
    }
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            Fields::Unit => return Ok((ident, Vec::new())),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    data.struct_token,
                    "Configurable requires named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Configurable can only be derived for structs",
            ));
        }
    };
    let parsed = fields
        .iter()
        .map(|field| {
            let field_ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            Ok(ConfigField {
                ident: field_ident,
                attrs: parse_field_attrs(&field.attrs)?,
            })
        })
        .collect::<syn::Result<Vec<_>>>()?;
    Ok((ident, parsed))
}
