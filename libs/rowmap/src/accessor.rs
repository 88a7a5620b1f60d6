//! Accessor paths from a root record down to one leaf value.
//!
//! A path is a chain of [`EmbedStep`]s ending in a [`Leaf`]. Reading stops
//! at the first absent sub-structure and yields [`Value::Null`]; writing
//! materializes every absent sub-structure on the way down. Writing `Null`
//! never materializes: an absent sub-structure already reads as `Null`.

use crate::error::CodecError;
use crate::schema::Schema;
use crate::value::{FieldValue, Value};

/// Read/write access to one leaf of `R`.
pub trait Accessor<R>: Send + Sync {
    fn get(&self, record: &R) -> Value;
    fn set(&self, record: &mut R, value: Value) -> Result<(), CodecError>;
}

/// Final step: a declared field holding a [`FieldValue`].
pub struct Leaf<R, T> {
    get: fn(&R) -> &T,
    get_mut: fn(&mut R) -> &mut T,
}

impl<R, T> Leaf<R, T> {
    pub fn new(get: fn(&R) -> &T, get_mut: fn(&mut R) -> &mut T) -> Self {
        Self { get, get_mut }
    }
}

impl<R, T: FieldValue> Accessor<R> for Leaf<R, T> {
    fn get(&self, record: &R) -> Value {
        (self.get)(record).to_value()
    }

    fn set(&self, record: &mut R, value: Value) -> Result<(), CodecError> {
        *(self.get_mut)(record) = T::from_value(value)?;
        Ok(())
    }
}

/// Intermediate step into an embedded sub-structure `E` of `R`.
///
/// `get` returns `None` when the sub-structure is absent. `get_mut` must
/// return the sub-structure, attaching a default one first if absent.
pub struct EmbedStep<R, E> {
    get: fn(&R) -> Option<&E>,
    get_mut: fn(&mut R) -> &mut E,
}

impl<R, E> EmbedStep<R, E> {
    pub fn new(get: fn(&R) -> Option<&E>, get_mut: fn(&mut R) -> &mut E) -> Self {
        Self { get, get_mut }
    }
}

impl<R, E> Clone for EmbedStep<R, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, E> Copy for EmbedStep<R, E> {}

/// An accessor of `E` lifted through one embed step into `R`.
pub struct Embedded<R, E> {
    step: EmbedStep<R, E>,
    inner: Box<dyn Accessor<E>>,
}

impl<R, E> Embedded<R, E> {
    pub fn new(step: EmbedStep<R, E>, inner: Box<dyn Accessor<E>>) -> Self {
        Self { step, inner }
    }
}

impl<R, E> Accessor<R> for Embedded<R, E> {
    fn get(&self, record: &R) -> Value {
        match (self.step.get)(record) {
            Some(embedded) => self.inner.get(embedded),
            None => Value::Null,
        }
    }

    fn set(&self, record: &mut R, value: Value) -> Result<(), CodecError> {
        if value.is_null() && (self.step.get)(record).is_none() {
            return Ok(());
        }
        self.inner.set((self.step.get_mut)(record), value)
    }
}

/// A whole sub-record `E` held in one field, moved as [`Value::Record`]
/// with `E`'s leaves in full schema order.
pub struct Nested<R, E> {
    step: EmbedStep<R, E>,
    schema: Schema<E>,
}

impl<R, E> Nested<R, E> {
    pub fn new(step: EmbedStep<R, E>, schema: Schema<E>) -> Self {
        Self { step, schema }
    }
}

impl<R, E> Accessor<R> for Nested<R, E> {
    fn get(&self, record: &R) -> Value {
        match (self.step.get)(record) {
            Some(nested) => Value::Record(self.schema.fields().iter().map(|f| f.get(nested)).collect()),
            None => Value::Null,
        }
    }

    fn set(&self, record: &mut R, value: Value) -> Result<(), CodecError> {
        match value {
            Value::Null => {
                if (self.step.get)(record).is_none() {
                    return Ok(());
                }
                let nested = (self.step.get_mut)(record);
                for field in self.schema.fields() {
                    field.set(nested, Value::Null)?;
                }
                Ok(())
            }
            Value::Record(values) if values.len() == self.schema.len() => {
                let nested = (self.step.get_mut)(record);
                for (field, value) in self.schema.fields().iter().zip(values) {
                    field.set(nested, value)?;
                }
                Ok(())
            }
            Value::Record(values) => Err(CodecError::mismatch(
                format!("{} values", self.schema.len()),
                values.len(),
            )),
            other => Err(CodecError::mismatch("record", other.kind_name())),
        }
    }
}
