use std::io::{Read, Write};

use ::uuid::Uuid;

use super::{BinaryCodec, Codec};
use crate::binary;
use crate::error::{CodecError, SchemaError};
use crate::value::{Value, ValueKind};

/// Canonical hyphenated text, 16 bytes in binary.
///
/// Unlike the other codecs, an absent UUID is the empty string, not `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

impl Codec for UuidCodec {
    fn parse_text(&self, text: &str) -> Result<Value, CodecError> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Uuid::parse_str(text)
            .map(Value::Uuid)
            .map_err(|e| CodecError::parse(text, "UUID", e))
    }

    fn format_text(&self, value: &Value) -> Result<String, CodecError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Uuid(v) => Ok(v.hyphenated().to_string()),
            other => Err(CodecError::mismatch("UUID", other.kind_name())),
        }
    }

    fn describe(&self) -> String {
        "UUID".to_string()
    }

    fn bind_type(&mut self, kind: &ValueKind) -> Result<(), SchemaError> {
        match kind {
            ValueKind::Uuid => Ok(()),
            other => Err(SchemaError::unsupported("UUID", other)),
        }
    }

    fn binary(&self) -> Option<&dyn BinaryCodec> {
        Some(self)
    }
}

impl BinaryCodec for UuidCodec {
    fn read_binary(&self, src: &mut dyn Read) -> Result<Value, CodecError> {
        let mut raw = [0u8; 16];
        src.read_exact(&mut raw)?;
        Ok(Value::Uuid(Uuid::from_bytes(raw)))
    }

    fn write_binary(&self, value: &Value, sink: &mut dyn Write) -> Result<(), CodecError> {
        match value {
            Value::Uuid(v) => {
                sink.write_all(&binary::uuid_to_bytes(v))?;
                Ok(())
            }
            Value::Null => Err(CodecError::NullNotEncodable("UUID".to_string())),
            other => Err(CodecError::mismatch("UUID", other.kind_name())),
        }
    }
}
