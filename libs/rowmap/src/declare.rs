use crate::accessor::{Accessor, EmbedStep, Leaf, Nested};
use crate::codec::{self, CodecKind};
use crate::error::SchemaError;
use crate::schema::{self, FieldDescriptor, Schema};
use crate::value::{FieldValue, ValueKind};

/// A record type that can be flattened into a schema.
///
/// Usually derived with `#[derive(Record)]`; hand-written impls call
/// [`RecordDecl::field`] and [`RecordDecl::embedded`] in declaration order.
pub trait Record: Default + 'static {
    fn type_name() -> &'static str;
    fn declare(decl: &mut RecordDecl<Self>);
}

/// Name prefix applied to the fields of an embedded sub-structure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Prefix {
    /// The embedding field's name followed by `_`.
    #[default]
    Inherit,
    /// No prefix: embedded names join the parent namespace as-is.
    None,
    Explicit(String),
}

impl Prefix {
    pub(crate) fn resolve(&self, parent: &str, field: &str) -> String {
        match self {
            Prefix::Inherit => format!("{parent}{field}_"),
            Prefix::None => parent.to_string(),
            Prefix::Explicit(prefix) => format!("{parent}{prefix}"),
        }
    }
}

/// Declaration of a value field.
pub struct ValueDecl<R> {
    pub(crate) field: &'static str,
    pub(crate) name: Option<String>,
    pub(crate) kind: ValueKind,
    pub(crate) codec: Option<CodecKind>,
    pub(crate) args: Vec<String>,
    /// A nested record's schema is built at declaration; its failure
    /// surfaces when the enclosing schema is flattened.
    pub(crate) accessor: Result<Box<dyn Accessor<R>>, SchemaError>,
}

impl<R> ValueDecl<R> {
    /// Serialized name, instead of the field's own name.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn codec(&mut self, codec: CodecKind) -> &mut Self {
        self.codec = Some(codec);
        self
    }

    /// Arguments passed to the codec's `configure`.
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

type Expand<R> = Box<dyn FnOnce(&str, &[&'static str]) -> Result<Vec<FieldDescriptor<R>>, SchemaError>>;

/// Declaration of an embedded sub-structure.
pub struct EmbeddedDecl<R> {
    pub(crate) field: &'static str,
    pub(crate) prefix: Prefix,
    pub(crate) expand: Expand<R>,
}

pub enum FieldDecl<R> {
    Value(ValueDecl<R>),
    Embedded(EmbeddedDecl<R>),
}

/// Ordered field declarations of one record type.
pub struct RecordDecl<R> {
    pub(crate) fields: Vec<FieldDecl<R>>,
}

impl<R: Record> RecordDecl<R> {
    pub(crate) fn collect() -> Self {
        let mut decl = Self { fields: Vec::new() };
        R::declare(&mut decl);
        decl
    }

    pub fn field<T: FieldValue>(
        &mut self,
        field: &'static str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> &mut ValueDecl<R> {
        self.fields.push(FieldDecl::Value(ValueDecl {
            field,
            name: None,
            kind: T::kind(),
            codec: None,
            args: Vec::new(),
            accessor: Ok(Box::new(Leaf::new(get, get_mut))),
        }));
        self.last_value()
    }

    /// Hold a whole `E` in one field. Its text form is `E`'s own row,
    /// joined by the codec's inner delimiter (see [`codec::RecordCodec`]).
    pub fn nested<E: Record>(
        &mut self,
        field: &'static str,
        get: fn(&R) -> Option<&E>,
        get_mut: fn(&mut R) -> &mut E,
    ) -> &mut ValueDecl<R> {
        let step = EmbedStep::new(get, get_mut);
        let accessor = Schema::<E>::build()
            .map(|schema| Box::new(Nested::new(step, schema)) as Box<dyn Accessor<R>>);
        self.fields.push(FieldDecl::Value(ValueDecl {
            field,
            name: None,
            kind: ValueKind::Record(E::type_name()),
            codec: Some(CodecKind::Custom(codec::record_codec::<E>)),
            args: Vec::new(),
            accessor,
        }));
        self.last_value()
    }

    fn last_value(&mut self) -> &mut ValueDecl<R> {
        match self.fields.last_mut() {
            Some(FieldDecl::Value(decl)) => decl,
            _ => unreachable!("value declaration was just pushed"),
        }
    }

    /// Embed `E`'s fields under `prefix`. `get_mut` attaches a default `E`
    /// when the sub-structure is absent.
    pub fn embedded<E: Record>(
        &mut self,
        field: &'static str,
        get: fn(&R) -> Option<&E>,
        get_mut: fn(&mut R) -> &mut E,
        prefix: Prefix,
    ) {
        let step = EmbedStep::new(get, get_mut);
        self.fields.push(FieldDecl::Embedded(EmbeddedDecl {
            field,
            prefix,
            expand: Box::new(move |prefix: &str, path: &[&'static str]| {
                schema::flatten_embedded::<R, E>(step, prefix, path)
            }),
        }));
    }
}
