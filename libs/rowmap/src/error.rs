use std::fmt;

/// Failure of a single codec call on a single value.
///
/// Codecs know nothing about the field they serve; the mapper wraps this
/// into [`FormatError::Field`] or [`BinaryError::Field`] with the field name.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("can't parse '{input}' as {expected}: {reason}")]
    Parse {
        input: String,
        expected: String,
        reason: String,
    },

    #[error("unknown enum key '{key}' for {enum_name}")]
    UnknownEnumKey { enum_name: String, key: String },

    #[error("value mismatch: expected {expected}, got {found}")]
    Mismatch { expected: String, found: String },

    #[error("null is not representable for non-optional {0}")]
    NullValue(String),

    #[error("null {0} has no binary encoding")]
    NullNotEncodable(String),

    #[error("string of {len} bytes exceeds binary limit of {max}")]
    TooLong { len: usize, max: usize },

    #[error("nested record: {0}")]
    Record(#[source] Box<FormatError>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub fn parse(input: &str, expected: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Parse {
            input: input.to_string(),
            expected: expected.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        Self::Mismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Schema construction failure. A schema is never exposed after one of these.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("can't register field with name '{0}': field with same name was already registered")]
    DuplicateField(String),

    #[error("codec {codec} can't serve values of kind {kind}")]
    UnsupportedKind { codec: String, kind: String },

    #[error("invalid arguments for codec {codec}: {reason}")]
    InvalidArgs { codec: String, reason: String },

    #[error("embedding too deep at '{0}', does the type embed itself?")]
    RecursiveEmbedding(String),

    #[error("field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    pub fn invalid_args(codec: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::InvalidArgs {
            codec: codec.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported(codec: impl fmt::Display, kind: impl fmt::Display) -> Self {
        Self::UnsupportedKind {
            codec: codec.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Attach the declared field path. Duplicate-name errors already carry
    /// the flattened name and pass through unchanged.
    pub fn with_field(self, field: impl fmt::Display) -> Self {
        match self {
            dup @ SchemaError::DuplicateField(_) => dup,
            other => SchemaError::Field {
                field: field.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Text-path failure: `decode_text` / `encode_text`.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error(
        "number of fields in line exceeded number of fields in object ({expected}). Line: '{line}'"
    )]
    TooManyFields { expected: usize, line: String },

    #[error(
        "too few fields in line ({actual}). It should be equal to fields in object ({expected}). Line: '{line}'"
    )]
    TooFewFields {
        expected: usize,
        actual: usize,
        line: String,
    },

    #[error("expected {expected} values, got {actual}")]
    ValueCount { expected: usize, actual: usize },

    #[error("field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: CodecError,
    },
}

/// Binary-path failure: `decode_binary` / `encode_binary` and the byte helpers.
#[derive(Debug, thiserror::Error)]
pub enum BinaryError {
    #[error("field '{field}': codec {codec} has no binary encoding")]
    MissingCapability { field: String, codec: String },

    #[error("field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: CodecError,
    },

    #[error("need {needed} bytes at offset {offset}, buffer has {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Any rowmap failure, for callers mixing construction, text and binary paths.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("binary error: {0}")]
    Binary(#[from] BinaryError),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
