use std::collections::HashMap;
use std::fmt;

use crate::accessor::{Accessor, EmbedStep, Embedded};
use crate::codec::{self, Codec};
use crate::declare::{FieldDecl, Record, RecordDecl};
use crate::error::{CodecError, SchemaError};
use crate::value::Value;

/// Embedding deeper than this is taken for a type that embeds itself.
const MAX_EMBED_DEPTH: usize = 64;

/// One flattened leaf field: its unique name, its codec and the accessor
/// path from the root record.
pub struct FieldDescriptor<R> {
    name: String,
    codec: Box<dyn Codec>,
    accessor: Box<dyn Accessor<R>>,
    path: Vec<&'static str>,
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Declared field names from the root record down to this leaf.
    pub fn path(&self) -> &[&'static str] {
        &self.path
    }

    /// Leaf value, or `Null` if any sub-structure on the path is absent.
    pub fn get(&self, record: &R) -> Value {
        self.accessor.get(record)
    }

    /// Assign the leaf, attaching default sub-structures along the path.
    pub fn set(&self, record: &mut R, value: Value) -> Result<(), CodecError> {
        self.accessor.set(record, value)
    }

    fn lift<P: 'static>(self, step: EmbedStep<P, R>) -> FieldDescriptor<P>
    where
        R: 'static,
    {
        FieldDescriptor {
            name: self.name,
            codec: self.codec,
            accessor: Box::new(Embedded::new(step, self.accessor)),
            path: self.path,
        }
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("codec", &self.codec.describe())
            .field("path", &self.path.join("."))
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════
//  Flattening
// ════════════════════════════════════════════════════════════════

fn register<R>(
    out: &mut Vec<FieldDescriptor<R>>,
    index: &mut HashMap<String, usize>,
    descriptor: FieldDescriptor<R>,
) -> Result<(), SchemaError> {
    if index.contains_key(&descriptor.name) {
        return Err(SchemaError::DuplicateField(descriptor.name));
    }
    index.insert(descriptor.name.clone(), out.len());
    out.push(descriptor);
    Ok(())
}

/// Depth-first flattening of `R` under `prefix`, `path` being the accessor
/// chain from the root record to `R`.
pub(crate) fn flatten<R: Record>(
    prefix: &str,
    path: &[&'static str],
) -> Result<Vec<FieldDescriptor<R>>, SchemaError> {
    if path.len() > MAX_EMBED_DEPTH {
        return Err(SchemaError::RecursiveEmbedding(path.join(".")));
    }
    let decl = RecordDecl::<R>::collect();
    let mut out = Vec::with_capacity(decl.fields.len());
    let mut index = HashMap::with_capacity(decl.fields.len());
    for field in decl.fields {
        match field {
            FieldDecl::Value(value) => {
                let mut chain = path.to_vec();
                chain.push(value.field);
                let name = format!("{prefix}{}", value.name.as_deref().unwrap_or(value.field));
                let declared = || format!("{}.{}", R::type_name(), value.field);
                let accessor = value.accessor.map_err(|e| e.with_field(declared()))?;
                let codec = codec::resolve(value.codec, &value.kind, &value.args)
                    .map_err(|e| e.with_field(declared()))?;
                register(
                    &mut out,
                    &mut index,
                    FieldDescriptor {
                        name,
                        codec,
                        accessor,
                        path: chain,
                    },
                )?;
            }
            FieldDecl::Embedded(embedded) => {
                let mut chain = path.to_vec();
                chain.push(embedded.field);
                let nested_prefix = embedded.prefix.resolve(prefix, embedded.field);
                for descriptor in (embedded.expand)(&nested_prefix, &chain)? {
                    register(&mut out, &mut index, descriptor)?;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn flatten_embedded<P: Record, E: Record>(
    step: EmbedStep<P, E>,
    prefix: &str,
    path: &[&'static str],
) -> Result<Vec<FieldDescriptor<P>>, SchemaError> {
    Ok(flatten::<E>(prefix, path)?
        .into_iter()
        .map(|descriptor| descriptor.lift(step))
        .collect())
}

// ════════════════════════════════════════════════════════════════
//  Schema
// ════════════════════════════════════════════════════════════════

/// Flattened, uniquely named field list of a record type.
///
/// Built once; immutable afterwards.
pub struct Schema<R> {
    fields: Vec<FieldDescriptor<R>>,
    index: HashMap<String, usize>,
}

impl<R: Record> Schema<R> {
    pub fn build() -> Result<Self, SchemaError> {
        let fields = flatten::<R>("", &[])?;
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        tracing::debug!(record = R::type_name(), fields = fields.len(), "built record schema");
        Ok(Self { fields, index })
    }
}

impl<R> Schema<R> {
    /// Fields in full schema order.
    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor<R>> {
        self.position(name).map(|i| &self.fields[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    /// Full schema order as a projection.
    pub fn full(&self) -> Projection<'_, R> {
        Projection {
            schema: self,
            order: (0..self.fields.len()).collect(),
        }
    }

    /// Fields named in `names`, in `names` order. Unknown names are dropped.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Projection<'_, R> {
        let mut order = Vec::with_capacity(names.len());
        for name in names {
            match self.position(name.as_ref()) {
                Some(i) => order.push(i),
                None => tracing::debug!(column = name.as_ref(), "header column not in schema, skipped"),
            }
        }
        Projection { schema: self, order }
    }

    pub(crate) fn at(&self, order: &[usize]) -> Projection<'_, R> {
        Projection {
            schema: self,
            order: order.to_vec(),
        }
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

/// Narrowed or reordered view of a schema. Borrows the schema's
/// descriptors; codecs are never rebuilt or copied.
pub struct Projection<'a, R> {
    schema: &'a Schema<R>,
    order: Vec<usize>,
}

impl<'a, R> Projection<'a, R> {
    pub fn fields(&self) -> impl Iterator<Item = &'a FieldDescriptor<R>> + '_ {
        self.order.iter().map(|&i| &self.schema.fields[i])
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.fields().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn into_order(self) -> Vec<usize> {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecKind;
    use crate::declare::Prefix;

    #[derive(Default)]
    struct Point {
        x: f64,
        y: Option<f64>,
    }

    impl Record for Point {
        fn type_name() -> &'static str {
            "Point"
        }

        fn declare(decl: &mut RecordDecl<Self>) {
            decl.field("x", |p| &p.x, |p| &mut p.x);
            decl.field("y", |p| &p.y, |p| &mut p.y);
        }
    }

    #[derive(Default)]
    struct Segment {
        id: i32,
        from: Point,
        to: Option<Point>,
    }

    impl Record for Segment {
        fn type_name() -> &'static str {
            "Segment"
        }

        fn declare(decl: &mut RecordDecl<Self>) {
            decl.field("id", |s| &s.id, |s| &mut s.id).name("segmentId");
            decl.embedded("from", |s| Some(&s.from), |s| &mut s.from, Prefix::Inherit);
            decl.embedded(
                "to",
                |s| s.to.as_ref(),
                |s| s.to.get_or_insert_with(Point::default),
                Prefix::Explicit("end_".to_string()),
            );
        }
    }

    #[derive(Default)]
    struct Clash {
        a: Point,
        b: Point,
    }

    impl Record for Clash {
        fn type_name() -> &'static str {
            "Clash"
        }

        fn declare(decl: &mut RecordDecl<Self>) {
            decl.embedded("a", |c| Some(&c.a), |c| &mut c.a, Prefix::None);
            decl.embedded("b", |c| Some(&c.b), |c| &mut c.b, Prefix::None);
        }
    }

    #[derive(Default)]
    struct BadCodec {
        when: i64,
    }

    impl Record for BadCodec {
        fn type_name() -> &'static str {
            "BadCodec"
        }

        fn declare(decl: &mut RecordDecl<Self>) {
            decl.field("when", |b| &b.when, |b| &mut b.when).codec(CodecKind::DateTime);
        }
    }

    #[test]
    fn flattens_depth_first_with_prefixes() {
        let schema = Schema::<Segment>::build().unwrap();
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, ["segmentId", "from_x", "from_y", "end_x", "end_y"]);
        assert_eq!(schema.get("end_y").unwrap().path(), &["to", "y"]);
        assert_eq!(schema.position("from_x"), Some(1));
    }

    #[test]
    fn accessor_paths_read_and_materialize() {
        let schema = Schema::<Segment>::build().unwrap();
        let mut segment = Segment::default();
        let end_x = schema.get("end_x").unwrap();
        assert_eq!(end_x.get(&segment), Value::Null);
        end_x.set(&mut segment, Value::F64(2.5)).unwrap();
        assert_eq!(segment.to.as_ref().map(|p| p.x), Some(2.5));
    }

    #[test]
    fn duplicate_flattened_name_fails_build() {
        let err = Schema::<Clash>::build().unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(ref n) if n == "x"), "{err}");
    }

    #[test]
    fn unresolvable_codec_names_the_field() {
        let err = Schema::<BadCodec>::build().unwrap_err();
        assert!(err.to_string().contains("BadCodec.when"), "{err}");
    }

    #[test]
    fn projection_keeps_requested_order_and_drops_unknown() {
        let schema = Schema::<Segment>::build().unwrap();
        let projection = schema.project(&["end_x", "nope", "segmentId"]);
        assert_eq!(projection.names(), ["end_x", "segmentId"]);
        assert_eq!(schema.full().len(), 5);
    }
}
