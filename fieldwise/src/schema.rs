//! Explicit field descriptors for configuration records.
//!
//! A [`Schema`] lists the fields of a record in resolution order. Each
//! [`FieldSpec`] carries the field's annotations and a safe accessor that
//! yields mutable access to the field's storage, so values are written back
//! by field index rather than through raw addresses.

use std::any::{Any, type_name};
use std::fmt;

use crate::kind::Kind;

type Accessor<T> = Box<dyn for<'a> Fn(&'a mut T) -> &'a mut dyn Any>;

/// Index of a field within its [`Schema`].
///
/// Command-line registrars report parsed values against this key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FieldKey(usize);

impl FieldKey {
    /// Create a key for the field at `index`.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the field in its schema.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Per-field metadata consulted during resolution.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Annotations {
    /// Literal used when neither the command line nor the environment supply a value.
    pub default: Option<String>,
    /// Environment variable consulted for the field.
    pub env: Option<String>,
    /// Command-line flag bound to the field.
    pub cli: Option<String>,
    /// Help text shown alongside the flag.
    pub desc: Option<String>,
}

/// Descriptor for a single configuration field of record type `T`.
pub struct FieldSpec<T> {
    name: String,
    kind: Option<Kind>,
    type_name: &'static str,
    annotations: Annotations,
    accessor: Accessor<T>,
}

impl<T: 'static> FieldSpec<T> {
    /// Describe the field `name` reached through `accessor`.
    ///
    /// The field's [`Kind`] is taken from the accessor's target type. Types
    /// other than `i64`, `String` and `bool` are accepted here and rejected
    /// when the schema is resolved.
    ///
    /// # Examples
    ///
    /// ```
    /// use fieldwise::{FieldSpec, Kind};
    ///
    /// struct Cfg { port: i64 }
    ///
    /// let field = FieldSpec::new("port", |c: &mut Cfg| &mut c.port)
    ///     .default_value("8080")
    ///     .env("APP_PORT")
    ///     .cli("port")
    ///     .desc("Port to listen on");
    /// assert_eq!(field.kind(), Some(Kind::Integer));
    /// ```
    #[must_use]
    pub fn new<V: Any>(name: impl Into<String>, accessor: fn(&mut T) -> &mut V) -> Self {
        Self {
            name: name.into(),
            kind: Kind::of::<V>(),
            type_name: type_name::<V>(),
            annotations: Annotations::default(),
            accessor: erase(accessor),
        }
    }
}

fn erase<T: 'static, V: Any>(accessor: fn(&mut T) -> &mut V) -> Accessor<T> {
    Box::new(higher_ranked(move |record| accessor(record) as &mut dyn Any))
}

// Pins the closure to a signature whose output borrows from its input.
const fn higher_ranked<T, F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut T) -> &'a mut dyn Any,
{
    f
}

impl<T> FieldSpec<T> {
    /// Set the `default` literal.
    #[must_use]
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.annotations.default = Some(literal.into());
        self
    }

    /// Set the environment variable name.
    #[must_use]
    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.annotations.env = Some(name.into());
        self
    }

    /// Set the command-line flag name.
    #[must_use]
    pub fn cli(mut self, name: impl Into<String>) -> Self {
        self.annotations.cli = Some(name.into());
        self
    }

    /// Set the flag's help text.
    #[must_use]
    pub fn desc(mut self, text: impl Into<String>) -> Self {
        self.annotations.desc = Some(text.into());
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Supported kind of the field's storage, or `None` when unsupported.
    #[must_use]
    pub const fn kind(&self) -> Option<Kind> {
        self.kind
    }

    /// Rust type name of the field's storage.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The field's annotations.
    #[must_use]
    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Mutable access to the field's storage within `record`.
    pub fn slot<'a>(&self, record: &'a mut T) -> &'a mut dyn Any {
        (self.accessor)(record)
    }
}

impl<T> fmt::Debug for FieldSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of field descriptors for record type `T`.
pub struct Schema<T> {
    fields: Vec<FieldSpec<T>>,
}

impl<T> Schema<T> {
    /// Create an empty schema.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append `field`, returning the extended schema.
    #[must_use]
    pub fn field(mut self, field: FieldSpec<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Fields in resolution order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec<T>] {
        &self.fields
    }

    /// Iterate over fields paired with their keys.
    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &FieldSpec<T>)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(index, field)| (FieldKey::new(index), field))
    }

    /// Look up the field registered under `key`.
    #[must_use]
    pub fn get(&self, key: FieldKey) -> Option<&FieldSpec<T>> {
        self.fields.get(key.index())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

impl<T> FromIterator<FieldSpec<T>> for Schema<T> {
    fn from_iter<I: IntoIterator<Item = FieldSpec<T>>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests panic to surface resolution mistakes"
)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Cfg {
        name: String,
        retries: i64,
        ratio: f64,
    }

    fn schema() -> Schema<Cfg> {
        Schema::new()
            .field(FieldSpec::new("name", |c: &mut Cfg| &mut c.name).env("NAME"))
            .field(FieldSpec::new("retries", |c: &mut Cfg| &mut c.retries).default_value("3"))
            .field(FieldSpec::new("ratio", |c: &mut Cfg| &mut c.ratio))
    }

    #[test]
    fn keys_follow_declaration_order() {
        let schema = schema();
        let names: Vec<_> = schema
            .iter()
            .map(|(key, field)| (key.index(), field.name().to_owned()))
            .collect();
        assert_eq!(
            names,
            vec![
                (0, "name".to_owned()),
                (1, "retries".to_owned()),
                (2, "ratio".to_owned()),
            ]
        );
        assert_eq!(schema.len(), 3);
        assert!(schema.get(FieldKey::new(3)).is_none());
    }

    #[test]
    fn unsupported_storage_keeps_type_name() {
        let schema = schema();
        let ratio = schema.get(FieldKey::new(2)).expect("ratio field");
        assert_eq!(ratio.kind(), None);
        assert_eq!(ratio.type_name(), "f64");
    }

    #[test]
    fn slot_reaches_field_storage() {
        let schema = schema();
        let mut cfg = Cfg::default();
        let retries = schema.get(FieldKey::new(1)).expect("retries field");
        let slot = retries.slot(&mut cfg);
        *slot.downcast_mut::<i64>().expect("i64 slot") = 9;
        assert_eq!(cfg.retries, 9);
    }

    #[test]
    fn builder_records_annotations() {
        let field = FieldSpec::new("name", |c: &mut Cfg| &mut c.name)
            .default_value("anon")
            .env("APP_NAME")
            .cli("name")
            .desc("Display name");
        assert_eq!(
            field.annotations(),
            &Annotations {
                default: Some("anon".to_owned()),
                env: Some("APP_NAME".to_owned()),
                cli: Some("name".to_owned()),
                desc: Some("Display name".to_owned()),
            }
        );
    }
}
