//! Field kinds, resolved values and literal coercion.
//!
//! Only three kinds are understood. Literals follow the conventions of a
//! typical flag parser: integers are signed decimals in the `i64` range and
//! booleans accept `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
//! counterparts.

use std::any::{Any, TypeId};
use std::fmt;

use thiserror::Error;

/// Primitive type of a configuration field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
    /// A signed 64-bit integer stored as `i64`.
    Integer,
    /// UTF-8 text stored as `String`.
    String,
    /// A flag stored as `bool`.
    Boolean,
}

impl Kind {
    /// Determine the kind backing storage of type `V`, if supported.
    ///
    /// # Examples
    ///
    /// ```
    /// use fieldwise::Kind;
    ///
    /// assert_eq!(Kind::of::<i64>(), Some(Kind::Integer));
    /// assert_eq!(Kind::of::<f64>(), None);
    /// ```
    #[must_use]
    pub fn of<V: Any>() -> Option<Self> {
        let id = TypeId::of::<V>();
        if id == TypeId::of::<i64>() {
            Some(Self::Integer)
        } else if id == TypeId::of::<String>() {
            Some(Self::String)
        } else if id == TypeId::of::<bool>() {
            Some(Self::Boolean)
        } else {
            None
        }
    }

    /// Literal that coerces to this kind's zero value.
    #[must_use]
    pub const fn zero_literal(self) -> &'static str {
        match self {
            Self::Integer => "0",
            Self::String => "",
            Self::Boolean => "false",
        }
    }

    /// The zero value itself.
    #[must_use]
    pub const fn zero(self) -> ResolvedValue {
        match self {
            Self::Integer => ResolvedValue::Integer(0),
            Self::String => ResolvedValue::String(String::new()),
            Self::Boolean => ResolvedValue::Boolean(false),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
        })
    }
}

/// A typed value ready to be written into a field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolvedValue {
    /// Value for an [`Kind::Integer`] field.
    Integer(i64),
    /// Value for a [`Kind::String`] field.
    String(String),
    /// Value for a [`Kind::Boolean`] field.
    Boolean(bool),
}

impl ResolvedValue {
    /// Kind of this value.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Integer(_) => Kind::Integer,
            Self::String(_) => Kind::String,
            Self::Boolean(_) => Kind::Boolean,
        }
    }

    /// Write this value into type-erased storage.
    ///
    /// Returns `false`, leaving the slot untouched, when the slot does not
    /// hold the matching Rust type.
    pub fn assign(self, slot: &mut dyn Any) -> bool {
        match self {
            Self::Integer(v) => store(slot, v),
            Self::String(v) => store(slot, v),
            Self::Boolean(v) => store(slot, v),
        }
    }
}

fn store<V: Any>(slot: &mut dyn Any, value: V) -> bool {
    slot.downcast_mut::<V>().map(|target| *target = value).is_some()
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

/// Failure to parse a literal as a particular kind.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("invalid {kind} literal {value:?}")]
pub struct CoercionError {
    kind: Kind,
    value: String,
}

impl CoercionError {
    /// Kind the literal was expected to parse as.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// The rejected literal.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Parse `literal` as a value of `kind`.
///
/// # Errors
///
/// Returns a [`CoercionError`] when `literal` is not a valid integer or
/// boolean literal. String coercion never fails.
///
/// # Examples
///
/// ```
/// use fieldwise::{Kind, ResolvedValue, coerce};
///
/// assert_eq!(coerce(Kind::Integer, "-12").ok(), Some(ResolvedValue::Integer(-12)));
/// assert_eq!(coerce(Kind::Boolean, "T").ok(), Some(ResolvedValue::Boolean(true)));
/// assert!(coerce(Kind::Integer, "notanint").is_err());
/// ```
pub fn coerce(kind: Kind, literal: &str) -> Result<ResolvedValue, CoercionError> {
    let failed = || CoercionError {
        kind,
        value: literal.to_owned(),
    };
    match kind {
        Kind::Integer => parse_int(literal)
            .map(ResolvedValue::Integer)
            .ok_or_else(failed),
        Kind::Boolean => parse_bool(literal)
            .map(ResolvedValue::Boolean)
            .ok_or_else(failed),
        Kind::String => Ok(ResolvedValue::String(literal.to_owned())),
    }
}

/// Parse a signed decimal integer.
///
/// Surrounding whitespace and digit separators are rejected.
#[must_use]
pub fn parse_int(literal: &str) -> Option<i64> {
    let digits = literal
        .strip_prefix(['+', '-'])
        .unwrap_or(literal);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    literal.parse().ok()
}

/// Parse a boolean literal.
#[must_use]
pub fn parse_bool(literal: &str) -> Option<bool> {
    match literal {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests panic to surface resolution mistakes"
)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::i64(Kind::of::<i64>(), Some(Kind::Integer))]
    #[case::string(Kind::of::<String>(), Some(Kind::String))]
    #[case::bool(Kind::of::<bool>(), Some(Kind::Boolean))]
    #[case::float(Kind::of::<f64>(), None)]
    #[case::narrow_int(Kind::of::<i32>(), None)]
    #[case::str_ref(Kind::of::<&'static str>(), None)]
    fn detects_kind_from_storage_type(
        #[case] detected: Option<Kind>,
        #[case] expected: Option<Kind>,
    ) {
        assert_eq!(detected, expected);
    }

    #[rstest]
    #[case(Kind::Integer)]
    #[case(Kind::String)]
    #[case(Kind::Boolean)]
    fn zero_literal_coerces_to_zero(#[case] kind: Kind) {
        assert_eq!(coerce(kind, kind.zero_literal()), Ok(kind.zero()));
    }

    #[rstest]
    #[case("0", 0)]
    #[case("42", 42)]
    #[case("-7", -7)]
    #[case("+7", 7)]
    #[case("007", 7)]
    #[case("9223372036854775807", i64::MAX)]
    #[case("-9223372036854775808", i64::MIN)]
    fn parses_valid_integers(#[case] literal: &str, #[case] expected: i64) {
        assert_eq!(parse_int(literal), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("notanint")]
    #[case(" 1")]
    #[case("1_000")]
    #[case("0x10")]
    #[case("1.5")]
    #[case("9223372036854775808")]
    fn rejects_malformed_integers(#[case] literal: &str) {
        assert_eq!(parse_int(literal), None);
    }

    #[rstest]
    #[case("1", true)]
    #[case("t", true)]
    #[case("T", true)]
    #[case("TRUE", true)]
    #[case("true", true)]
    #[case("True", true)]
    #[case("0", false)]
    #[case("f", false)]
    #[case("F", false)]
    #[case("FALSE", false)]
    #[case("false", false)]
    #[case("False", false)]
    fn parses_bool_literals(#[case] literal: &str, #[case] expected: bool) {
        assert_eq!(parse_bool(literal), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("yes")]
    #[case("tRuE")]
    #[case("2")]
    fn rejects_malformed_bools(#[case] literal: &str) {
        assert_eq!(parse_bool(literal), None);
    }

    #[rstest]
    #[case(Kind::Integer, "-31")]
    #[case(Kind::Integer, "9001")]
    #[case(Kind::Boolean, "true")]
    #[case(Kind::Boolean, "false")]
    fn canonical_literals_survive_display(#[case] kind: Kind, #[case] literal: &str) {
        let value = coerce(kind, literal).expect("valid literal");
        assert_eq!(value.to_string(), literal);
        assert_eq!(coerce(kind, &value.to_string()), Ok(value));
    }

    #[test]
    fn coercion_error_names_kind_and_literal() {
        let err = coerce(Kind::Boolean, "maybe").expect_err("not a bool");
        assert_eq!(err.kind(), Kind::Boolean);
        assert_eq!(err.value(), "maybe");
        assert_eq!(err.to_string(), "invalid boolean literal \"maybe\"");
    }

    #[test]
    fn assign_rejects_mismatched_slot() {
        let mut slot = String::from("keep");
        assert!(!ResolvedValue::Integer(3).assign(&mut slot));
        assert_eq!(slot, "keep");
        assert!(ResolvedValue::String("new".to_owned()).assign(&mut slot));
        assert_eq!(slot, "new");
    }
}
