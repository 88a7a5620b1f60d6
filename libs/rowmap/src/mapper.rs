use std::io::{Read, Write};

use crate::codec::BinaryCodec;
use crate::config::{self, MapperConfig};
use crate::declare::Record;
use crate::error::{BinaryError, Error, FormatError, SchemaError};
use crate::schema::{FieldDescriptor, Projection, Schema};
use crate::value::Value;

/// Maps records of `R` to delimited text rows and fixed-sequence binary rows.
///
/// The schema is built once at construction. Text operations follow the
/// active header (see [`select_header`](Self::select_header)); binary
/// operations always use the full schema order.
///
/// Decoding and encoding take `&self` and may run concurrently; only
/// `select_header` mutates the mapper.
#[derive(Debug)]
pub struct RecordMapper<R> {
    schema: Schema<R>,
    active: Vec<usize>,
    delimiter: String,
}

impl<R: Record> RecordMapper<R> {
    /// Tab-delimited mapper over the full schema.
    pub fn new() -> Result<Self, SchemaError> {
        let schema = Schema::build()?;
        let active = (0..schema.len()).collect();
        Ok(Self {
            schema,
            active,
            delimiter: config::DEFAULT_DELIMITER.to_string(),
        })
    }

    pub fn with_delimiter(delimiter: &str) -> Result<Self, Error> {
        let mut mapper = Self::new()?;
        mapper.delimiter = config::parse_delimiter(delimiter)?;
        Ok(mapper)
    }

    /// Mapper with a delimiter and an initial header given as one
    /// delimiter-joined header line.
    pub fn with_header_line(delimiter: &str, header: &str) -> Result<Self, Error> {
        let mut mapper = Self::with_delimiter(delimiter)?;
        mapper.select_header_line(header);
        Ok(mapper)
    }

    pub fn with_config(cfg: &MapperConfig) -> Result<Self, Error> {
        let mut mapper = Self::with_delimiter(&cfg.delimiter)?;
        if cfg.require_binary {
            mapper.require_binary()?;
        }
        mapper.select_header(&cfg.header);
        Ok(mapper)
    }

    /// Decode one text row into a fresh `R`.
    pub fn decode_text(&self, line: &str) -> Result<R, FormatError> {
        let values = self.decode_values(line)?;
        let mut record = R::default();
        for (&i, value) in self.active.iter().zip(values) {
            let field = &self.schema.fields()[i];
            field.set(&mut record, value).map_err(|source| FormatError::Field {
                field: field.name().to_string(),
                source,
            })?;
        }
        Ok(record)
    }
}

impl<R> RecordMapper<R> {
    pub fn schema(&self) -> &Schema<R> {
        &self.schema
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// `delimiter` must already be resolved by [`config::parse_delimiter`].
    pub(crate) fn set_delimiter(&mut self, delimiter: String) {
        self.delimiter = delimiter;
    }

    /// Active fields in active order.
    pub fn projection(&self) -> Projection<'_, R> {
        self.schema.at(&self.active)
    }

    /// Restrict and reorder the active fields to `names`, in `names` order.
    /// Names not in the schema are skipped; an empty list changes nothing.
    pub fn select_header<S: AsRef<str>>(&mut self, names: &[S]) {
        if names.is_empty() {
            return;
        }
        self.active = self.schema.project(names).into_order();
        tracing::debug!(requested = names.len(), active = self.active.len(), "applied header");
    }

    /// [`select_header`](Self::select_header) with a delimiter-joined header line.
    pub fn select_header_line(&mut self, header: &str) {
        if header.is_empty() {
            return;
        }
        let names: Vec<&str> = header.split(self.delimiter.as_str()).collect();
        self.select_header(&names);
    }

    /// Names of the active fields, in active order.
    pub fn header(&self) -> Vec<&str> {
        self.active
            .iter()
            .map(|&i| self.schema.fields()[i].name())
            .collect()
    }

    /// Encode the active fields of `record` into one text row.
    pub fn encode_text(&self, record: &R) -> Result<String, FormatError> {
        let values: Vec<Value> = self
            .active
            .iter()
            .map(|&i| self.schema.fields()[i].get(record))
            .collect();
        self.encode_values(&values)
    }

    /// Split and parse one text row into the values of the active fields,
    /// in active order, without touching a record.
    pub fn decode_values(&self, line: &str) -> Result<Vec<Value>, FormatError> {
        let mut values = Vec::with_capacity(self.active.len());
        let mut fields = self.active.iter().map(|&i| &self.schema.fields()[i]);
        for token in line.split(self.delimiter.as_str()) {
            let Some(field) = fields.next() else {
                return Err(FormatError::TooManyFields {
                    expected: self.active.len(),
                    line: line.to_string(),
                });
            };
            let value = field.codec().parse_text(token).map_err(|source| FormatError::Field {
                field: field.name().to_string(),
                source,
            })?;
            values.push(value);
        }
        if values.len() != self.active.len() {
            return Err(FormatError::TooFewFields {
                expected: self.active.len(),
                actual: values.len(),
                line: line.to_string(),
            });
        }
        Ok(values)
    }

    /// Format values of the active fields, given in active order, into one
    /// text row.
    pub fn encode_values(&self, values: &[Value]) -> Result<String, FormatError> {
        if values.len() != self.active.len() {
            return Err(FormatError::ValueCount {
                expected: self.active.len(),
                actual: values.len(),
            });
        }
        let mut row = String::new();
        for (n, (&i, value)) in self.active.iter().zip(values).enumerate() {
            let field = &self.schema.fields()[i];
            if n > 0 {
                row.push_str(&self.delimiter);
            }
            let token = field.codec().format_text(value).map_err(|source| FormatError::Field {
                field: field.name().to_string(),
                source,
            })?;
            row.push_str(&token);
        }
        Ok(row)
    }

    /// Check that every field can be binary-encoded.
    pub fn require_binary(&self) -> Result<(), BinaryError> {
        for field in self.schema.fields() {
            binary_codec(field)?;
        }
        Ok(())
    }

    /// Write `record` in full schema order. Nothing is written when any
    /// field lacks a binary form.
    pub fn write_binary(&self, record: &R, sink: &mut dyn Write) -> Result<(), BinaryError> {
        self.require_binary()?;
        for field in self.schema.fields() {
            binary_codec(field)?
                .write_binary(&field.get(record), sink)
                .map_err(|source| BinaryError::Field {
                    field: field.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    pub fn encode_binary(&self, record: &R) -> Result<Vec<u8>, BinaryError> {
        let mut out = Vec::new();
        self.write_binary(record, &mut out)?;
        Ok(out)
    }

    /// `<Type>Serializer`.
    pub fn describe(&self) -> String
    where
        R: Record,
    {
        format!("{}Serializer", R::type_name())
    }
}

impl<R: Record> RecordMapper<R> {
    /// Read one record in full schema order into a fresh `R`.
    pub fn decode_binary(&self, src: &mut dyn Read) -> Result<R, BinaryError> {
        let mut record = R::default();
        for field in self.schema.fields() {
            let codec = binary_codec(field)?;
            let attach = |source| BinaryError::Field {
                field: field.name().to_string(),
                source,
            };
            let value = codec.read_binary(src).map_err(attach)?;
            field.set(&mut record, value).map_err(attach)?;
        }
        Ok(record)
    }
}

fn binary_codec<R>(field: &FieldDescriptor<R>) -> Result<&dyn BinaryCodec, BinaryError> {
    field.codec().binary().ok_or_else(|| BinaryError::MissingCapability {
        field: field.name().to_string(),
        codec: field.codec().describe(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::codec::CodecKind;
    use crate::declare::{Prefix, RecordDecl};
    use crate::error::CodecError;

    #[derive(Debug, Default, PartialEq)]
    struct Inner {
        note: Option<String>,
        weight: i16,
    }

    impl Record for Inner {
        fn type_name() -> &'static str {
            "Inner"
        }

        fn declare(decl: &mut RecordDecl<Self>) {
            decl.field("note", |i| &i.note, |i| &mut i.note);
            decl.field("weight", |i| &i.weight, |i| &mut i.weight);
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Event {
        at: Option<NaiveDateTime>,
        count: i32,
        inner: Option<Inner>,
    }

    impl Record for Event {
        fn type_name() -> &'static str {
            "Event"
        }

        fn declare(decl: &mut RecordDecl<Self>) {
            decl.field("at", |e| &e.at, |e| &mut e.at)
                .name("eventDate")
                .codec(CodecKind::DateTime)
                .args(["yyyy-MM-dd HH:mm:ss"]);
            decl.field("count", |e| &e.count, |e| &mut e.count);
            decl.embedded(
                "inner",
                |e| e.inner.as_ref(),
                |e| e.inner.get_or_insert_with(Inner::default),
                Prefix::Inherit,
            );
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Tagged {
        count: i32,
        inner: Option<Inner>,
    }

    impl Record for Tagged {
        fn type_name() -> &'static str {
            "Tagged"
        }

        fn declare(decl: &mut RecordDecl<Self>) {
            decl.field("count", |t| &t.count, |t| &mut t.count);
            decl.nested("inner", |t| t.inner.as_ref(), |t| t.inner.get_or_insert_with(Inner::default))
                .args(["|"]);
        }
    }

    fn event() -> Event {
        Event {
            at: NaiveDate::from_ymd_opt(2011, 12, 12).and_then(|d| d.and_hms_opt(14, 8, 1)),
            count: 666,
            inner: Some(Inner {
                note: Some("x".to_string()),
                weight: -3,
            }),
        }
    }

    #[test]
    fn text_round_trip_over_full_schema() {
        let mapper = RecordMapper::<Event>::new().unwrap();
        assert_eq!(mapper.header(), ["eventDate", "count", "inner_note", "inner_weight"]);
        let line = mapper.encode_text(&event()).unwrap();
        assert_eq!(line, "2011-12-12 14:08:01\t666\tx\t-3");
        assert_eq!(mapper.decode_text(&line).unwrap(), event());
    }

    #[test]
    fn absent_embedded_encodes_as_null_leaves() {
        let mapper = RecordMapper::<Event>::new().unwrap();
        let line = mapper.encode_text(&Event::default()).unwrap();
        assert_eq!(line, "null\t0\tnull\tnull");
    }

    #[test]
    fn setting_one_leaf_materializes_embedded() {
        let mut mapper = RecordMapper::<Event>::new().unwrap();
        mapper.select_header(&["inner_weight"]);
        let decoded = mapper.decode_text("7").unwrap();
        assert_eq!(decoded.inner, Some(Inner { note: None, weight: 7 }));
        assert_eq!(decoded.count, 0);
    }

    #[test]
    fn field_count_must_match_exactly() {
        let mut mapper = RecordMapper::<Event>::new().unwrap();
        mapper.select_header(&["count", "inner_weight"]);
        assert!(matches!(
            mapper.decode_text("1\t2\t3"),
            Err(FormatError::TooManyFields { expected: 2, .. })
        ));
        assert!(matches!(
            mapper.decode_text("1"),
            Err(FormatError::TooFewFields { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn bad_token_names_the_field() {
        let mut mapper = RecordMapper::<Event>::new().unwrap();
        mapper.select_header(&["count"]);
        let err = mapper.decode_text("many").unwrap_err();
        assert!(
            matches!(err, FormatError::Field { ref field, source: CodecError::Parse { .. } } if field == "count"),
            "{err}"
        );
    }

    #[test]
    fn header_follows_requested_order() {
        let mut mapper = RecordMapper::<Event>::with_delimiter(",").unwrap();
        mapper.select_header_line("inner_note,unknown,count");
        assert_eq!(mapper.header(), ["inner_note", "count"]);
        assert_eq!(mapper.projection().len(), 2);

        mapper.select_header::<&str>(&[]);
        assert_eq!(mapper.header(), ["inner_note", "count"]);

        let line = mapper.encode_text(&event()).unwrap();
        assert_eq!(line, "x,666");
    }

    #[test]
    fn binary_round_trip_uses_full_order() {
        let mut mapper = RecordMapper::<Event>::new().unwrap();
        mapper.select_header(&["count"]);
        let bytes = mapper.encode_binary(&event()).unwrap();
        // 8 date + 4 count + (2 + 1) note + 2 weight
        assert_eq!(bytes.len(), 17);
        let decoded = mapper.decode_binary(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, event());
    }

    #[test]
    fn binary_null_date_is_rejected() {
        let mapper = RecordMapper::<Event>::new().unwrap();
        let err = mapper.encode_binary(&Event::default()).unwrap_err();
        assert!(
            matches!(err, BinaryError::Field { ref field, source: CodecError::NullNotEncodable(_) } if field == "eventDate"),
            "{err}"
        );
    }

    #[test]
    fn truncated_binary_input_fails() {
        let mapper = RecordMapper::<Event>::new().unwrap();
        let bytes = mapper.encode_binary(&event()).unwrap();
        assert!(mapper.decode_binary(&mut &bytes[..10]).is_err());
    }

    #[test]
    fn nested_column_round_trips_as_text() {
        let mapper = RecordMapper::<Tagged>::new().unwrap();
        let tagged = Tagged {
            count: 2,
            inner: Some(Inner {
                note: Some("n".to_string()),
                weight: 9,
            }),
        };
        let line = mapper.encode_text(&tagged).unwrap();
        assert_eq!(line, "2\tn|9");
        assert_eq!(mapper.decode_text(&line).unwrap(), tagged);
        assert_eq!(mapper.encode_text(&Tagged::default()).unwrap(), "0\tnull");
        assert_eq!(mapper.decode_text("0\tnull").unwrap(), Tagged::default());
    }

    #[test]
    fn text_only_field_fails_binary_without_partial_output() {
        let mapper = RecordMapper::<Tagged>::new().unwrap();
        let mut sink = Vec::new();
        let err = mapper.write_binary(&Tagged::default(), &mut sink).unwrap_err();
        assert!(
            matches!(err, BinaryError::MissingCapability { ref field, .. } if field == "inner"),
            "{err}"
        );
        assert!(sink.is_empty());

        let bytes = 5i32.to_be_bytes();
        let err = mapper.decode_binary(&mut bytes.as_slice()).unwrap_err();
        assert!(
            matches!(err, BinaryError::MissingCapability { ref field, .. } if field == "inner"),
            "{err}"
        );
    }

    #[test]
    fn config_applies_delimiter_and_header() {
        let cfg = MapperConfig::from_json(r#"{"delimiter": "|", "header": ["count", "eventDate"]}"#).unwrap();
        let mapper = RecordMapper::<Event>::with_config(&cfg).unwrap();
        assert_eq!(mapper.delimiter(), "|");
        assert_eq!(mapper.encode_text(&event()).unwrap(), "666|2011-12-12 14:08:01");
        assert_eq!(mapper.describe(), "EventSerializer");
    }
}
