// Derived code refers to `::rowmap::...`; this lets it compile inside the crate too.
extern crate self as rowmap;

pub mod accessor;
pub mod binary;
pub mod codec;
pub mod config;
pub mod declare;
pub mod error;
pub mod mapper;
pub mod schema;
pub mod value;

pub use rowmap_derive::{Record, RecordEnum};

pub use codec::{BinaryCodec, Codec, CodecKind};
pub use config::MapperConfig;
pub use declare::{Prefix, Record, RecordDecl};
pub use error::{BinaryError, CodecError, Error, FormatError, Result, SchemaError};
pub use mapper::RecordMapper;
pub use schema::{FieldDescriptor, Projection, Schema};
pub use value::{EnumType, EnumValue, FieldValue, Value, ValueKind};
