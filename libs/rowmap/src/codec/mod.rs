use std::fmt;
use std::io::{Read, Write};

use crate::error::{CodecError, SchemaError};
use crate::value::{Value, ValueKind};

mod datetime;
mod enumeration;
mod record;
mod scalar;
mod uuid;

pub use datetime::{DEFAULT_DATETIME_PATTERN, DateTimeCodec};
pub use enumeration::EnumCodec;
pub use record::{DEFAULT_NESTED_DELIMITER, RecordCodec, record_codec};
pub use scalar::{ScalarCodec, ScalarKind};
pub use self::uuid::UuidCodec;

/// Literal written for an absent value by every codec except [`UuidCodec`].
pub const NULL_TEXT: &str = "null";

/// Text codec for one field value, with optional binary capability.
///
/// Lifecycle: constructed, then `bind_type` once with the field's declared
/// kind, then `configure` once if the declaration carries arguments. After
/// that the codec is never mutated and may be shared across threads.
pub trait Codec: Send + Sync + fmt::Debug {
    fn parse_text(&self, text: &str) -> Result<Value, CodecError>;
    fn format_text(&self, value: &Value) -> Result<String, CodecError>;
    /// Human-readable type name for diagnostics.
    fn describe(&self) -> String;

    fn bind_type(&mut self, _kind: &ValueKind) -> Result<(), SchemaError> {
        Ok(())
    }

    fn configure(&mut self, args: &[String]) -> Result<(), SchemaError> {
        Err(SchemaError::invalid_args(
            self.describe(),
            format!("codec takes no arguments, got {args:?}"),
        ))
    }

    /// Binary capability, `None` for text-only codecs.
    fn binary(&self) -> Option<&dyn BinaryCodec> {
        None
    }
}

/// Fixed-sequence binary encoding of one field value.
pub trait BinaryCodec: Send + Sync {
    fn read_binary(&self, src: &mut dyn Read) -> Result<Value, CodecError>;
    fn write_binary(&self, value: &Value, sink: &mut dyn Write) -> Result<(), CodecError>;
}

/// Codec selection in a field declaration.
#[derive(Clone, Copy)]
pub enum CodecKind {
    Scalar,
    Enum,
    DateTime,
    Uuid,
    /// Extension point: a factory for a user codec.
    Custom(fn() -> Box<dyn Codec>),
}

impl CodecKind {
    /// Codec chosen when a declaration does not name one.
    pub fn infer(kind: &ValueKind) -> Self {
        match kind {
            ValueKind::DateTime => CodecKind::DateTime,
            ValueKind::Enum(_) => CodecKind::Enum,
            ValueKind::Uuid => CodecKind::Uuid,
            _ => CodecKind::Scalar,
        }
    }

    pub fn instantiate(&self) -> Box<dyn Codec> {
        match self {
            CodecKind::Scalar => Box::new(ScalarCodec::default()),
            CodecKind::Enum => Box::new(EnumCodec::default()),
            CodecKind::DateTime => Box::new(DateTimeCodec::default()),
            CodecKind::Uuid => Box::new(UuidCodec),
            CodecKind::Custom(factory) => factory(),
        }
    }

    /// Parse the short codec names used in derive attributes and config.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scalar" => Some(CodecKind::Scalar),
            "enum" => Some(CodecKind::Enum),
            "datetime" | "date" => Some(CodecKind::DateTime),
            "uuid" => Some(CodecKind::Uuid),
            _ => None,
        }
    }
}

impl fmt::Debug for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Scalar => write!(f, "Scalar"),
            CodecKind::Enum => write!(f, "Enum"),
            CodecKind::DateTime => write!(f, "DateTime"),
            CodecKind::Uuid => write!(f, "Uuid"),
            CodecKind::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Build a ready codec: instantiate, bind to the declared kind, configure.
pub fn resolve(
    kind: Option<CodecKind>,
    value_kind: &ValueKind,
    args: &[String],
) -> Result<Box<dyn Codec>, SchemaError> {
    let mut codec = kind.unwrap_or_else(|| CodecKind::infer(value_kind)).instantiate();
    codec.bind_type(value_kind)?;
    if !args.is_empty() {
        codec.configure(args)?;
    }
    Ok(codec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_follows_value_kind() {
        assert!(matches!(CodecKind::infer(&ValueKind::DateTime), CodecKind::DateTime));
        assert!(matches!(CodecKind::infer(&ValueKind::Uuid), CodecKind::Uuid));
        assert!(matches!(CodecKind::infer(&ValueKind::I32), CodecKind::Scalar));
    }

    #[test]
    fn codec_without_configure_rejects_args() {
        let err = resolve(Some(CodecKind::Uuid), &ValueKind::Uuid, &["x".to_string()]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidArgs { .. }));
    }

    #[test]
    fn scalar_codec_refuses_datetime_kind() {
        let err = resolve(Some(CodecKind::Scalar), &ValueKind::DateTime, &[]).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedKind { .. }));
    }
}
