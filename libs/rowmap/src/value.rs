use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::codec::NULL_TEXT;
use crate::error::CodecError;

/// Dynamic leaf value moved between a record field and its codec.
///
/// `Null` stands for an absent value: an empty `Option`, or any leaf behind
/// an absent embedded sub-structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(String),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    /// Ordinal into the bound enum's constant list.
    Enum(usize),
    /// Leaf values of a nested record, in its full schema order.
    Record(Vec<Value>),
}

impl Value {
    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::Enum(_) => "enum",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ════════════════════════════════════════════════════════════════
//  Value kind (declared type of a field)
// ════════════════════════════════════════════════════════════════

/// Declared value type of a field, handed to a codec's `bind_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    DateTime,
    Uuid,
    Enum(EnumType),
    /// A nested record, by its type name.
    Record(&'static str),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::I8 => write!(f, "i8"),
            ValueKind::I16 => write!(f, "i16"),
            ValueKind::I32 => write!(f, "i32"),
            ValueKind::I64 => write!(f, "i64"),
            ValueKind::U8 => write!(f, "u8"),
            ValueKind::U16 => write!(f, "u16"),
            ValueKind::U32 => write!(f, "u32"),
            ValueKind::U64 => write!(f, "u64"),
            ValueKind::F32 => write!(f, "f32"),
            ValueKind::F64 => write!(f, "f64"),
            ValueKind::Char => write!(f, "char"),
            ValueKind::String => write!(f, "string"),
            ValueKind::DateTime => write!(f, "datetime"),
            ValueKind::Uuid => write!(f, "uuid"),
            ValueKind::Enum(e) => write!(f, "enum {}", e.name()),
            ValueKind::Record(name) => write!(f, "record {name}"),
        }
    }
}

/// Runtime description of an enum type: its name, constant names and a
/// lookup for constant-level attributes.
#[derive(Clone)]
pub struct EnumType {
    name: &'static str,
    constants: Vec<&'static str>,
    attribute: fn(usize, &str) -> Option<String>,
}

impl EnumType {
    pub fn of<E: EnumValue>() -> Self {
        Self {
            name: E::enum_name(),
            constants: E::variants().iter().map(|v| v.variant_name()).collect(),
            attribute: |ordinal, key| E::variants().get(ordinal).and_then(|v| v.attribute(key)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Symbolic constant names, in ordinal order.
    pub fn constants(&self) -> &[&'static str] {
        &self.constants
    }

    /// Value of the constant-level attribute `key` for the constant at `ordinal`.
    pub fn attribute(&self, ordinal: usize, key: &str) -> Option<String> {
        (self.attribute)(ordinal, key)
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumType")
            .field("name", &self.name)
            .field("constants", &self.constants)
            .finish()
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.constants == other.constants
    }
}

// ════════════════════════════════════════════════════════════════
//  Field value conversion
// ════════════════════════════════════════════════════════════════

/// A Rust type that can sit in a declared record field.
pub trait FieldValue: Sized + 'static {
    fn kind() -> ValueKind;
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self, CodecError>;
}

/// Enum type usable as a field value, normally implemented by
/// `#[derive(RecordEnum)]`.
pub trait EnumValue: Copy + PartialEq + 'static {
    fn enum_name() -> &'static str;
    /// All constants, in declaration order.
    fn variants() -> &'static [Self];
    fn variant_name(&self) -> &'static str;
    /// Constant-level attribute, e.g. an external id.
    fn attribute(&self, _key: &str) -> Option<String> {
        None
    }

    fn ordinal(&self) -> usize {
        Self::variants()
            .iter()
            .position(|v| v == self)
            .unwrap_or_default()
    }
}

/// `FieldValue::kind` for an enum type.
pub fn enum_kind<E: EnumValue>() -> ValueKind {
    ValueKind::Enum(EnumType::of::<E>())
}

/// `FieldValue::to_value` for an enum type.
pub fn enum_to_value<E: EnumValue>(value: &E) -> Value {
    Value::Enum(value.ordinal())
}

/// `FieldValue::from_value` for an enum type.
pub fn enum_from_value<E: EnumValue>(value: Value) -> Result<E, CodecError> {
    match value {
        Value::Enum(ordinal) => E::variants()
            .get(ordinal)
            .copied()
            .ok_or_else(|| CodecError::mismatch(E::enum_name(), format!("ordinal {ordinal}"))),
        Value::Null => Err(CodecError::NullValue(E::enum_name().to_string())),
        other => Err(CodecError::mismatch(E::enum_name(), other.kind_name())),
    }
}

macro_rules! scalar_field_value {
    ($($ty:ty => $kind:ident, $variant:ident, $null:expr;)*) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> ValueKind {
                    ValueKind::$kind
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> Result<Self, CodecError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        Value::Null => Ok($null),
                        other => Err(CodecError::mismatch(stringify!($ty), other.kind_name())),
                    }
                }
            }
        )*
    };
}

scalar_field_value! {
    bool => Bool, Bool, false;
    i8 => I8, I8, 0;
    i16 => I16, I16, 0;
    i32 => I32, I32, 0;
    i64 => I64, I64, 0;
    u8 => U8, U8, 0;
    u16 => U16, U16, 0;
    u32 => U32, U32, 0;
    u64 => U64, U64, 0;
    f32 => F32, F32, 0.0;
    f64 => F64, F64, 0.0;
    char => Char, Char, '\0';
    // a plain string has no absent state: it keeps the null literal as text
    String => String, Str, NULL_TEXT.to_string();
}

impl FieldValue for NaiveDateTime {
    fn kind() -> ValueKind {
        ValueKind::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Null => Err(CodecError::NullValue("datetime".to_string())),
            other => Err(CodecError::mismatch("datetime", other.kind_name())),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn kind() -> ValueKind {
        ValueKind::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(self.naive_utc())
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        NaiveDateTime::from_value(value).map(|v| v.and_utc())
    }
}

impl FieldValue for Uuid {
    fn kind() -> ValueKind {
        ValueKind::Uuid
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Null => Err(CodecError::NullValue("uuid".to_string())),
            other => Err(CodecError::mismatch("uuid", other.kind_name())),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> ValueKind {
        T::kind()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Side {
        Buy,
        Sell,
    }

    impl EnumValue for Side {
        fn enum_name() -> &'static str {
            "Side"
        }

        fn variants() -> &'static [Self] {
            &[Side::Buy, Side::Sell]
        }

        fn variant_name(&self) -> &'static str {
            match self {
                Side::Buy => "BUY",
                Side::Sell => "SELL",
            }
        }

        fn attribute(&self, key: &str) -> Option<String> {
            match key {
                "code" => Some(if *self == Side::Buy { "b" } else { "s" }.to_string()),
                _ => None,
            }
        }
    }

    #[test]
    fn null_maps_to_per_type_default_for_plain_scalars() {
        assert_eq!(i32::from_value(Value::Null).unwrap(), 0);
        assert!(!bool::from_value(Value::Null).unwrap());
        assert_eq!(String::from_value(Value::Null).unwrap(), "null");
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
    }

    #[test]
    fn non_optional_datetime_rejects_null() {
        let err = NaiveDateTime::from_value(Value::Null).unwrap_err();
        assert!(matches!(err, CodecError::NullValue(_)));
    }

    #[test]
    fn mismatched_variant_is_an_error() {
        let err = i64::from_value(Value::I32(5)).unwrap_err();
        assert!(matches!(err, CodecError::Mismatch { .. }));
    }

    #[test]
    fn enum_type_exposes_constants_and_attributes() {
        let ty = EnumType::of::<Side>();
        assert_eq!(ty.name(), "Side");
        assert_eq!(ty.constants(), &["BUY", "SELL"]);
        assert_eq!(ty.attribute(1, "code").as_deref(), Some("s"));
        assert_eq!(ty.attribute(0, "missing"), None);
        assert_eq!(enum_to_value(&Side::Sell), Value::Enum(1));
        assert_eq!(enum_from_value::<Side>(Value::Enum(0)).unwrap(), Side::Buy);
    }
}
