use std::collections::HashMap;

use super::{Codec, NULL_TEXT};
use crate::error::{CodecError, SchemaError};
use crate::value::{EnumType, Value, ValueKind};

/// String key ⇄ enum constant. Text only.
///
/// Keys default to the constants' symbolic names; a single configure
/// argument names a constant-level attribute to key by instead.
#[derive(Debug, Default)]
pub struct EnumCodec {
    ty: Option<EnumType>,
    key_attribute: Option<String>,
    by_key: HashMap<String, usize>,
    keys: Vec<String>,
}

impl EnumCodec {
    fn enum_name(&self) -> &str {
        self.ty.as_ref().map_or("enum", |t| t.name())
    }

    fn rebuild_index(&mut self) -> Result<(), SchemaError> {
        let Some(ty) = &self.ty else {
            return Ok(());
        };
        let mut by_key = HashMap::with_capacity(ty.constants().len());
        let mut keys = Vec::with_capacity(ty.constants().len());
        for (ordinal, name) in ty.constants().iter().enumerate() {
            let key = match &self.key_attribute {
                Some(attr) => ty.attribute(ordinal, attr).ok_or_else(|| {
                    SchemaError::invalid_args(
                        ty.name(),
                        format!("can't find field {attr} in enum constant {name}"),
                    )
                })?,
                None => name.to_string(),
            };
            if by_key.insert(key.clone(), ordinal).is_some() {
                return Err(SchemaError::invalid_args(
                    ty.name(),
                    format!("key '{key}' maps to more than one constant"),
                ));
            }
            keys.push(key);
        }
        self.by_key = by_key;
        self.keys = keys;
        Ok(())
    }
}

impl Codec for EnumCodec {
    fn parse_text(&self, text: &str) -> Result<Value, CodecError> {
        if text == NULL_TEXT {
            return Ok(Value::Null);
        }
        self.by_key
            .get(text)
            .map(|ordinal| Value::Enum(*ordinal))
            .ok_or_else(|| CodecError::UnknownEnumKey {
                enum_name: self.enum_name().to_string(),
                key: text.to_string(),
            })
    }

    fn format_text(&self, value: &Value) -> Result<String, CodecError> {
        match value {
            Value::Null => Ok(NULL_TEXT.to_string()),
            Value::Enum(ordinal) => self
                .keys
                .get(*ordinal)
                .cloned()
                .ok_or_else(|| CodecError::mismatch(self.enum_name(), format!("ordinal {ordinal}"))),
            other => Err(CodecError::mismatch(self.enum_name(), other.kind_name())),
        }
    }

    fn describe(&self) -> String {
        self.enum_name().to_string()
    }

    fn bind_type(&mut self, kind: &ValueKind) -> Result<(), SchemaError> {
        match kind {
            ValueKind::Enum(ty) => {
                self.ty = Some(ty.clone());
                self.rebuild_index()
            }
            other => Err(SchemaError::unsupported("Enum", other)),
        }
    }

    fn configure(&mut self, args: &[String]) -> Result<(), SchemaError> {
        match args {
            [] => Ok(()),
            [attr] => {
                self.key_attribute = Some(attr.clone());
                self.rebuild_index()
            }
            _ => Err(SchemaError::invalid_args(
                self.enum_name().to_string(),
                format!("expected a single key field name, got {args:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EnumValue;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Numbered {
        One,
        Two,
    }

    impl EnumValue for Numbered {
        fn enum_name() -> &'static str {
            "Numbered"
        }

        fn variants() -> &'static [Self] {
            &[Numbered::One, Numbered::Two]
        }

        fn variant_name(&self) -> &'static str {
            match self {
                Numbered::One => "ONE",
                Numbered::Two => "TWO",
            }
        }

        fn attribute(&self, key: &str) -> Option<String> {
            (key == "id").then(|| match self {
                Numbered::One => "1".to_string(),
                Numbered::Two => "2".to_string(),
            })
        }
    }

    fn codec(args: &[&str]) -> Result<EnumCodec, SchemaError> {
        let mut codec = EnumCodec::default();
        codec.bind_type(&ValueKind::Enum(EnumType::of::<Numbered>()))?;
        if !args.is_empty() {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            codec.configure(&args)?;
        }
        Ok(codec)
    }

    #[test]
    fn keys_by_symbolic_name_by_default() {
        let codec = codec(&[]).unwrap();
        assert_eq!(codec.format_text(&Value::Enum(1)).unwrap(), "TWO");
        assert_eq!(codec.parse_text("ONE").unwrap(), Value::Enum(0));
        assert_eq!(codec.describe(), "Numbered");
    }

    #[test]
    fn keys_by_constant_attribute() {
        let codec = codec(&["id"]).unwrap();
        assert_eq!(codec.format_text(&Value::Enum(0)).unwrap(), "1");
        assert_eq!(codec.parse_text("1").unwrap(), Value::Enum(0));
        let err = codec.parse_text("9").unwrap_err();
        assert!(matches!(err, CodecError::UnknownEnumKey { ref key, .. } if key == "9"));
    }

    #[test]
    fn null_both_ways() {
        let codec = codec(&[]).unwrap();
        assert_eq!(codec.parse_text("null").unwrap(), Value::Null);
        assert_eq!(codec.format_text(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn missing_key_attribute_fails_configure() {
        let err = codec(&["code"]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidArgs { .. }));
    }

    #[test]
    fn enum_codec_is_text_only() {
        assert!(codec(&[]).unwrap().binary().is_none());
    }

    #[test]
    fn refuses_non_enum_kind() {
        let mut codec = EnumCodec::default();
        assert!(codec.bind_type(&ValueKind::I32).is_err());
    }
}
