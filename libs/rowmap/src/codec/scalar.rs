use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use super::{BinaryCodec, Codec, NULL_TEXT};
use crate::error::{CodecError, SchemaError};
use crate::value::{Value, ValueKind};

/// Max byte length of a binary string (2-byte length prefix).
const MAX_BINARY_STR: usize = u16::MAX as usize;

/// Primitive kinds served by [`ScalarCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalarKind {
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
    #[default]
    String,
}

impl ScalarKind {
    pub fn from_value_kind(kind: &ValueKind) -> Option<Self> {
        Some(match kind {
            ValueKind::Bool => ScalarKind::Bool,
            ValueKind::I8 => ScalarKind::I8,
            ValueKind::I16 => ScalarKind::I16,
            ValueKind::I32 => ScalarKind::I32,
            ValueKind::I64 => ScalarKind::I64,
            ValueKind::U8 => ScalarKind::U8,
            ValueKind::U16 => ScalarKind::U16,
            ValueKind::U32 => ScalarKind::U32,
            ValueKind::U64 => ScalarKind::U64,
            ValueKind::F32 => ScalarKind::F32,
            ValueKind::F64 => ScalarKind::F64,
            ValueKind::Char => ScalarKind::Char,
            ValueKind::String => ScalarKind::String,
            ValueKind::DateTime | ValueKind::Uuid | ValueKind::Enum(_) | ValueKind::Record(_) => {
                return None;
            }
        })
    }

    /// Per-type null value, used when a `null` scalar must be binary-encoded.
    fn null_value(self) -> Value {
        match self {
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::I8 => Value::I8(0),
            ScalarKind::I16 => Value::I16(0),
            ScalarKind::I32 => Value::I32(0),
            ScalarKind::I64 => Value::I64(0),
            ScalarKind::U8 => Value::U8(0),
            ScalarKind::U16 => Value::U16(0),
            ScalarKind::U32 => Value::U32(0),
            ScalarKind::U64 => Value::U64(0),
            ScalarKind::F32 => Value::F32(0.0),
            ScalarKind::F64 => Value::F64(0.0),
            ScalarKind::Char => Value::Char('\0'),
            ScalarKind::String => Value::Str(String::new()),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Char => "char",
            ScalarKind::String => "String",
        };
        f.write_str(name)
    }
}

/// Numbers, `bool`, `char` and strings.
///
/// The literal `null` parses to [`Value::Null`]; the field then applies its
/// own null policy: `None` for options, the text `null` for a plain
/// `String`, zero/false otherwise.
#[derive(Debug, Clone, Default)]
pub struct ScalarCodec {
    kind: ScalarKind,
}

impl ScalarCodec {
    /// Standalone codec for a fixed kind, outside any schema.
    pub fn for_kind(kind: ScalarKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }
}

fn parse_as<T>(text: &str, kind: ScalarKind) -> Result<T, CodecError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.parse::<T>()
        .map_err(|e| CodecError::parse(text, kind, e))
}

impl Codec for ScalarCodec {
    fn parse_text(&self, text: &str) -> Result<Value, CodecError> {
        if text == NULL_TEXT {
            return Ok(Value::Null);
        }
        let kind = self.kind;
        Ok(match kind {
            ScalarKind::Bool => Value::Bool(parse_as(text, kind)?),
            ScalarKind::I8 => Value::I8(parse_as(text, kind)?),
            ScalarKind::I16 => Value::I16(parse_as(text, kind)?),
            ScalarKind::I32 => Value::I32(parse_as(text, kind)?),
            ScalarKind::I64 => Value::I64(parse_as(text, kind)?),
            ScalarKind::U8 => Value::U8(parse_as(text, kind)?),
            ScalarKind::U16 => Value::U16(parse_as(text, kind)?),
            ScalarKind::U32 => Value::U32(parse_as(text, kind)?),
            ScalarKind::U64 => Value::U64(parse_as(text, kind)?),
            ScalarKind::F32 => Value::F32(parse_as(text, kind)?),
            ScalarKind::F64 => Value::F64(parse_as(text, kind)?),
            ScalarKind::Char => Value::Char(parse_as(text, kind)?),
            ScalarKind::String => Value::Str(text.to_string()),
        })
    }

    fn format_text(&self, value: &Value) -> Result<String, CodecError> {
        Ok(match value {
            Value::Null => NULL_TEXT.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::I8(v) => v.to_string(),
            Value::I16(v) => v.to_string(),
            Value::I32(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::U8(v) => v.to_string(),
            Value::U16(v) => v.to_string(),
            Value::U32(v) => v.to_string(),
            Value::U64(v) => v.to_string(),
            Value::F32(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::Char(v) => v.to_string(),
            Value::Str(v) => v.clone(),
            other => return Err(CodecError::mismatch(self.kind, other.kind_name())),
        })
    }

    fn describe(&self) -> String {
        self.kind.to_string()
    }

    fn bind_type(&mut self, kind: &ValueKind) -> Result<(), SchemaError> {
        self.kind = ScalarKind::from_value_kind(kind)
            .ok_or_else(|| SchemaError::unsupported("Scalar", kind))?;
        Ok(())
    }

    fn binary(&self) -> Option<&dyn BinaryCodec> {
        Some(self)
    }
}

fn read_array<const N: usize>(src: &mut dyn Read) -> Result<[u8; N], CodecError> {
    let mut raw = [0u8; N];
    src.read_exact(&mut raw)?;
    Ok(raw)
}

impl BinaryCodec for ScalarCodec {
    fn read_binary(&self, src: &mut dyn Read) -> Result<Value, CodecError> {
        Ok(match self.kind {
            ScalarKind::Bool => Value::Bool(read_array::<1>(src)?[0] != 0),
            ScalarKind::I8 => Value::I8(i8::from_be_bytes(read_array(src)?)),
            ScalarKind::I16 => Value::I16(i16::from_be_bytes(read_array(src)?)),
            ScalarKind::I32 => Value::I32(i32::from_be_bytes(read_array(src)?)),
            ScalarKind::I64 => Value::I64(i64::from_be_bytes(read_array(src)?)),
            ScalarKind::U8 => Value::U8(u8::from_be_bytes(read_array(src)?)),
            ScalarKind::U16 => Value::U16(u16::from_be_bytes(read_array(src)?)),
            ScalarKind::U32 => Value::U32(u32::from_be_bytes(read_array(src)?)),
            ScalarKind::U64 => Value::U64(u64::from_be_bytes(read_array(src)?)),
            ScalarKind::F32 => Value::F32(f32::from_be_bytes(read_array(src)?)),
            ScalarKind::F64 => Value::F64(f64::from_be_bytes(read_array(src)?)),
            ScalarKind::Char => {
                let raw = u32::from_be_bytes(read_array(src)?);
                let c = char::from_u32(raw)
                    .ok_or_else(|| CodecError::mismatch("char", format!("code point {raw:#x}")))?;
                Value::Char(c)
            }
            ScalarKind::String => {
                let len = u16::from_be_bytes(read_array(src)?) as usize;
                let mut raw = vec![0u8; len];
                src.read_exact(&mut raw)?;
                let text = String::from_utf8(raw)
                    .map_err(|e| CodecError::mismatch("utf-8 string", e))?;
                Value::Str(text)
            }
        })
    }

    fn write_binary(&self, value: &Value, sink: &mut dyn Write) -> Result<(), CodecError> {
        let null;
        let value = if value.is_null() {
            null = self.kind.null_value();
            &null
        } else {
            value
        };
        match (self.kind, value) {
            (ScalarKind::Bool, Value::Bool(v)) => sink.write_all(&[u8::from(*v)])?,
            (ScalarKind::I8, Value::I8(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::I16, Value::I16(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::I32, Value::I32(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::I64, Value::I64(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::U8, Value::U8(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::U16, Value::U16(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::U32, Value::U32(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::U64, Value::U64(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::F32, Value::F32(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::F64, Value::F64(v)) => sink.write_all(&v.to_be_bytes())?,
            (ScalarKind::Char, Value::Char(v)) => sink.write_all(&u32::from(*v).to_be_bytes())?,
            (ScalarKind::String, Value::Str(v)) => {
                if v.len() > MAX_BINARY_STR {
                    return Err(CodecError::TooLong {
                        len: v.len(),
                        max: MAX_BINARY_STR,
                    });
                }
                sink.write_all(&(v.len() as u16).to_be_bytes())?;
                sink.write_all(v.as_bytes())?;
            }
            (kind, other) => return Err(CodecError::mismatch(kind, other.kind_name())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(kind: ValueKind) -> ScalarCodec {
        let mut codec = ScalarCodec::default();
        codec.bind_type(&kind).unwrap();
        codec
    }

    #[test]
    fn parses_and_formats_numbers() {
        let codec = bound(ValueKind::I32);
        assert_eq!(codec.parse_text("666").unwrap(), Value::I32(666));
        assert_eq!(codec.format_text(&Value::I32(-3)).unwrap(), "-3");
        assert_eq!(codec.describe(), "i32");
    }

    #[test]
    fn null_literal_round_trips() {
        let codec = bound(ValueKind::F64);
        assert_eq!(codec.parse_text("null").unwrap(), Value::Null);
        assert_eq!(codec.format_text(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn string_null_literal_is_left_to_the_field() {
        let codec = bound(ValueKind::String);
        assert_eq!(codec.parse_text("null").unwrap(), Value::Null);
        assert_eq!(codec.parse_text("").unwrap(), Value::Str(String::new()));
    }

    #[test]
    fn bad_number_names_input_and_kind() {
        let codec = bound(ValueKind::I64);
        let err = codec.parse_text("12x").unwrap_err();
        assert!(err.to_string().contains("'12x' as i64"), "{err}");
    }

    #[test]
    fn binary_widths_are_fixed() {
        let cases = [
            (ValueKind::Bool, Value::Bool(true), 1),
            (ValueKind::I16, Value::I16(-2), 2),
            (ValueKind::I32, Value::I32(7), 4),
            (ValueKind::F64, Value::F64(0.5), 8),
            (ValueKind::Char, Value::Char('ж'), 4),
        ];
        for (kind, value, width) in cases {
            let codec = bound(kind);
            let mut out = Vec::new();
            codec.write_binary(&value, &mut out).unwrap();
            assert_eq!(out.len(), width);
            assert_eq!(codec.read_binary(&mut out.as_slice()).unwrap(), value);
        }
    }

    #[test]
    fn binary_string_is_length_prefixed() {
        let codec = bound(ValueKind::String);
        let mut out = Vec::new();
        codec.write_binary(&Value::Str("abc".into()), &mut out).unwrap();
        assert_eq!(out, vec![0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn binary_null_writes_type_default() {
        let codec = bound(ValueKind::I32);
        let mut out = Vec::new();
        codec.write_binary(&Value::Null, &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0]);
    }

    #[test]
    fn truncated_input_is_io_error() {
        let codec = bound(ValueKind::I64);
        let err = codec.read_binary(&mut [0u8; 3].as_slice()).unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
