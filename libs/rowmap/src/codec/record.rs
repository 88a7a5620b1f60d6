use std::fmt;

use super::{Codec, NULL_TEXT};
use crate::config;
use crate::declare::Record;
use crate::error::{CodecError, SchemaError};
use crate::mapper::RecordMapper;
use crate::value::{Value, ValueKind};

pub const DEFAULT_NESTED_DELIMITER: &str = ",";

/// A whole record `E` inside one column, as `E`'s own text row.
///
/// The inner row uses its own delimiter (`,` unless configured with one
/// argument) and always covers `E`'s full schema. The inner delimiter must
/// differ from the outer one. Text only.
pub struct RecordCodec<E> {
    mapper: Option<RecordMapper<E>>,
}

impl<E> Default for RecordCodec<E> {
    fn default() -> Self {
        Self { mapper: None }
    }
}

impl<E> fmt::Debug for RecordCodec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCodec")
            .field("delimiter", &self.mapper.as_ref().map(|m| m.delimiter()))
            .finish()
    }
}

impl<E: Record> RecordCodec<E> {
    fn mapper(&self) -> Result<&RecordMapper<E>, CodecError> {
        self.mapper
            .as_ref()
            .ok_or_else(|| CodecError::mismatch(format!("record {}", E::type_name()), "unbound codec"))
    }
}

/// Factory for [`CodecKind::Custom`](super::CodecKind::Custom).
pub fn record_codec<E: Record>() -> Box<dyn Codec> {
    Box::new(RecordCodec::<E>::default())
}

impl<E: Record> Codec for RecordCodec<E> {
    fn parse_text(&self, text: &str) -> Result<Value, CodecError> {
        if text == NULL_TEXT {
            return Ok(Value::Null);
        }
        self.mapper()?
            .decode_values(text)
            .map(Value::Record)
            .map_err(|e| CodecError::Record(Box::new(e)))
    }

    fn format_text(&self, value: &Value) -> Result<String, CodecError> {
        match value {
            Value::Null => Ok(NULL_TEXT.to_string()),
            Value::Record(values) => self
                .mapper()?
                .encode_values(values)
                .map_err(|e| CodecError::Record(Box::new(e))),
            other => Err(CodecError::mismatch(self.describe(), other.kind_name())),
        }
    }

    fn describe(&self) -> String {
        format!("{}Serializer", E::type_name())
    }

    fn bind_type(&mut self, kind: &ValueKind) -> Result<(), SchemaError> {
        if *kind != ValueKind::Record(E::type_name()) {
            return Err(SchemaError::unsupported(self.describe(), kind));
        }
        let mut mapper = RecordMapper::<E>::new()?;
        mapper.set_delimiter(DEFAULT_NESTED_DELIMITER.to_string());
        self.mapper = Some(mapper);
        Ok(())
    }

    fn configure(&mut self, args: &[String]) -> Result<(), SchemaError> {
        let name = self.describe();
        let [delimiter] = args else {
            return Err(SchemaError::invalid_args(name, format!("expected one delimiter, got {args:?}")));
        };
        let delimiter = config::parse_delimiter(delimiter).map_err(|e| SchemaError::invalid_args(&name, e))?;
        let Some(mapper) = self.mapper.as_mut() else {
            return Err(SchemaError::invalid_args(name, "configured before bind_type"));
        };
        mapper.set_delimiter(delimiter);
        Ok(())
    }
}
