use std::io::{Read, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::{BinaryCodec, Codec, NULL_TEXT};
use crate::error::{CodecError, SchemaError};
use crate::value::{Value, ValueKind};

pub const DEFAULT_DATETIME_PATTERN: &str = "yyyy-MM-dd HH:mm:ss";

/// Pattern-formatted text, epoch milliseconds in binary.
///
/// Patterns use the `yyyy-MM-dd HH:mm:ss` vocabulary and are translated to a
/// chrono format string once, at configure time. A pattern containing `%`
/// is taken as a chrono format string as-is.
#[derive(Debug, Clone)]
pub struct DateTimeCodec {
    pattern: String,
    format: String,
}

impl Default for DateTimeCodec {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DATETIME_PATTERN.to_string(),
            format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl DateTimeCodec {
    pub fn with_pattern(pattern: &str) -> Result<Self, SchemaError> {
        let format = translate_pattern(pattern)?;
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(SchemaError::invalid_args(
                "DateTime",
                format!("invalid pattern '{pattern}'"),
            ));
        }
        Ok(Self {
            pattern: pattern.to_string(),
            format,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn parse(&self, text: &str) -> Result<NaiveDateTime, CodecError> {
        match NaiveDateTime::parse_from_str(text, &self.format) {
            Ok(v) => Ok(v),
            // Date-only patterns carry no time fields.
            Err(first) => NaiveDate::parse_from_str(text, &self.format)
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
                .map_err(|_| CodecError::parse(text, format!("date [{}]", self.pattern), first)),
        }
    }
}

/// A `%` outside quotes marks a pattern already in chrono syntax.
fn is_chrono_format(pattern: &str) -> bool {
    let mut quoted = false;
    for c in pattern.chars() {
        match c {
            '\'' => quoted = !quoted,
            '%' if !quoted => return true,
            _ => {}
        }
    }
    false
}

/// Translate a `yyyy-MM-dd`-style pattern into a chrono format string.
fn translate_pattern(pattern: &str) -> Result<String, SchemaError> {
    if is_chrono_format(pattern) {
        return Ok(pattern.to_string());
    }
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // Quoted literal; '' is an escaped quote.
            let mut j = i + 1;
            if chars.get(j) == Some(&'\'') {
                out.push('\'');
                i = j + 1;
                continue;
            }
            while j < chars.len() && chars[j] != '\'' {
                match chars[j] {
                    '%' => out.push_str("%%"),
                    other => out.push(other),
                }
                j += 1;
            }
            if j == chars.len() {
                return Err(SchemaError::invalid_args(
                    "DateTime",
                    format!("unterminated quote in pattern '{pattern}'"),
                ));
            }
            i = j + 1;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            out.push(c);
            i += 1;
            continue;
        }
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', 3) => "%3f",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            _ => {
                return Err(SchemaError::invalid_args(
                    "DateTime",
                    format!("unsupported pattern letter '{c}' x{run} in '{pattern}'"),
                ));
            }
        };
        out.push_str(spec);
        i += run;
    }
    Ok(out)
}

impl Codec for DateTimeCodec {
    fn parse_text(&self, text: &str) -> Result<Value, CodecError> {
        if text == NULL_TEXT {
            return Ok(Value::Null);
        }
        self.parse(text).map(Value::DateTime)
    }

    fn format_text(&self, value: &Value) -> Result<String, CodecError> {
        match value {
            Value::Null => Ok(NULL_TEXT.to_string()),
            Value::DateTime(v) => {
                let mut out = String::new();
                std::fmt::write(&mut out, format_args!("{}", v.format(&self.format)))
                    .map_err(|_| CodecError::mismatch(format!("date [{}]", self.pattern), v))?;
                Ok(out)
            }
            other => Err(CodecError::mismatch("datetime", other.kind_name())),
        }
    }

    fn describe(&self) -> String {
        format!("Date[{}]", self.pattern)
    }

    fn bind_type(&mut self, kind: &ValueKind) -> Result<(), SchemaError> {
        match kind {
            ValueKind::DateTime => Ok(()),
            other => Err(SchemaError::unsupported(self.describe(), other)),
        }
    }

    fn configure(&mut self, args: &[String]) -> Result<(), SchemaError> {
        let [pattern] = args else {
            return Err(SchemaError::invalid_args(
                self.describe(),
                format!("expected a single pattern, got {args:?}"),
            ));
        };
        *self = Self::with_pattern(pattern)?;
        Ok(())
    }

    fn binary(&self) -> Option<&dyn BinaryCodec> {
        Some(self)
    }
}

impl BinaryCodec for DateTimeCodec {
    fn read_binary(&self, src: &mut dyn Read) -> Result<Value, CodecError> {
        let mut raw = [0u8; 8];
        src.read_exact(&mut raw)?;
        let millis = i64::from_be_bytes(raw);
        DateTime::from_timestamp_millis(millis)
            .map(|v| Value::DateTime(v.naive_utc()))
            .ok_or_else(|| CodecError::mismatch("datetime", format!("epoch millis {millis}")))
    }

    fn write_binary(&self, value: &Value, sink: &mut dyn Write) -> Result<(), CodecError> {
        match value {
            Value::DateTime(v) => {
                sink.write_all(&v.and_utc().timestamp_millis().to_be_bytes())?;
                Ok(())
            }
            Value::Null => Err(CodecError::NullNotEncodable("datetime".to_string())),
            other => Err(CodecError::mismatch("datetime", other.kind_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|d| d.and_hms_opt(h, mi, s))
            .unwrap()
    }

    #[test]
    fn default_pattern_round_trips() {
        let codec = DateTimeCodec::default();
        let value = codec.parse_text("2011-12-12 14:08:01").unwrap();
        assert_eq!(value, Value::DateTime(at(2011, 12, 12, 14, 8, 1)));
        assert_eq!(codec.format_text(&value).unwrap(), "2011-12-12 14:08:01");
        assert_eq!(codec.describe(), "Date[yyyy-MM-dd HH:mm:ss]");
    }

    #[test]
    fn translates_pattern_letters() {
        assert_eq!(translate_pattern("dd.MM.yy HH:mm").unwrap(), "%d.%m.%y %H:%M");
        assert_eq!(
            translate_pattern("yyyy-MM-dd'T'HH:mm:ss.SSS").unwrap(),
            "%Y-%m-%dT%H:%M:%S.%3f"
        );
        assert_eq!(translate_pattern("%Y/%m").unwrap(), "%Y/%m");
        assert!(translate_pattern("yyyy 'open").is_err());
        assert!(translate_pattern("qq").is_err());
        assert!(DateTimeCodec::with_pattern("%Y-%Q").is_err());
    }

    #[test]
    fn quoted_percent_is_a_literal() {
        assert_eq!(translate_pattern("HH'%'mm").unwrap(), "%H%%%M");
        assert_eq!(translate_pattern("'100%' yyyy").unwrap(), "100%% %Y");

        let codec = DateTimeCodec::with_pattern("yyyy-MM-dd HH'%'mm").unwrap();
        let value = codec.parse_text("2011-12-12 14%08").unwrap();
        assert_eq!(value, Value::DateTime(at(2011, 12, 12, 14, 8, 0)));
        assert_eq!(codec.format_text(&value).unwrap(), "2011-12-12 14%08");
    }

    #[test]
    fn configured_date_only_pattern_parses_to_midnight() {
        let mut codec = DateTimeCodec::default();
        codec.configure(&["yyyyMMdd".to_string()]).unwrap();
        assert_eq!(
            codec.parse_text("20240229").unwrap(),
            Value::DateTime(at(2024, 2, 29, 0, 0, 0))
        );
    }

    #[test]
    fn rejects_garbage() {
        let codec = DateTimeCodec::default();
        assert!(matches!(codec.parse_text("yesterday"), Err(CodecError::Parse { .. })));
    }

    #[test]
    fn binary_is_epoch_millis() {
        let codec = DateTimeCodec::default();
        let value = Value::DateTime(at(1970, 1, 1, 0, 0, 1));
        let mut out = Vec::new();
        codec.write_binary(&value, &mut out).unwrap();
        assert_eq!(out, 1000i64.to_be_bytes());
        assert_eq!(codec.read_binary(&mut out.as_slice()).unwrap(), value);
    }

    #[test]
    fn binary_null_is_rejected() {
        let codec = DateTimeCodec::default();
        let err = codec.write_binary(&Value::Null, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CodecError::NullNotEncodable(_)));
    }
}
