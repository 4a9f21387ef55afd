use std::{convert::TryFrom, sync::Arc};

use crate::{
    error::{ParseError, PdfResult},
    objects::{Dictionary, Name, Object, ObjectType, Reference},
    stream::Stream,
};

/// Indirect references may point at other references; chains longer than
/// this are treated as broken
const MAX_REFERENCE_CHAIN: usize = 32;

/// Access to the document's object graph
///
/// Implementors only need to look up indirect objects; everything else is
/// built on top of that
pub trait Resolve {
    fn lex_object_from_reference(&mut self, reference: Reference) -> PdfResult<Object>;

    /// Resolve all references
    fn resolve(&mut self, obj: Object) -> PdfResult<Object> {
        let mut obj = obj;

        for _ in 0..MAX_REFERENCE_CHAIN {
            match obj {
                Object::Reference(r) => obj = self.lex_object_from_reference(r)?,
                obj => return Ok(obj),
            }
        }

        anyhow::bail!("reference chain is longer than {} objects", MAX_REFERENCE_CHAIN)
    }

    fn assert_integer(&mut self, obj: Object) -> PdfResult<i32> {
        match self.resolve(obj)? {
            Object::Integer(i) => Ok(i),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Integer,
                found,
            }),
        }
    }

    fn assert_unsigned_integer(&mut self, obj: Object) -> PdfResult<u32> {
        Ok(u32::try_from(self.assert_integer(obj)?)?)
    }

    /// Either an integer, or a real
    fn assert_number(&mut self, obj: Object) -> PdfResult<f32> {
        match self.resolve(obj)? {
            Object::Integer(i) => Ok(i as f32),
            Object::Real(r) => Ok(r),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Real,
                found,
            }),
        }
    }

    fn assert_dict(&mut self, obj: Object) -> PdfResult<Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Ok(d),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Dictionary,
                found,
            }),
        }
    }

    fn assert_name(&mut self, obj: Object) -> PdfResult<Name> {
        match self.resolve(obj)? {
            Object::Name(n) => Ok(n),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Name,
                found,
            }),
        }
    }

    fn assert_arr(&mut self, obj: Object) -> PdfResult<Vec<Object>> {
        match self.resolve(obj)? {
            Object::Array(a) => Ok(a),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Array,
                found,
            }),
        }
    }

    fn assert_bool(&mut self, obj: Object) -> PdfResult<bool> {
        match self.resolve(obj)? {
            Object::True => Ok(true),
            Object::False => Ok(false),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Boolean,
                found,
            }),
        }
    }

    fn assert_stream(&mut self, obj: Object) -> PdfResult<Stream> {
        match self.resolve(obj)? {
            Object::Stream(s) => Ok(s),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Stream,
                found,
            }),
        }
    }
}

/// A document without indirect objects. Every reference resolves to `null`
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolve;

impl Resolve for NoResolve {
    fn lex_object_from_reference(&mut self, _reference: Reference) -> PdfResult<Object> {
        Ok(Object::Null)
    }
}

/// Typed extraction of a value out of a (possibly indirect) object
pub trait FromObj: Sized {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self>;
}

impl FromObj for Object {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver.resolve(obj)
    }
}

impl FromObj for f32 {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver.assert_number(obj)
    }
}

impl FromObj for i32 {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver.assert_integer(obj)
    }
}

impl FromObj for u32 {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver.assert_unsigned_integer(obj)
    }
}

impl FromObj for bool {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver.assert_bool(obj)
    }
}

impl FromObj for Name {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver.assert_name(obj)
    }
}

impl FromObj for Dictionary {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver.assert_dict(obj)
    }
}

impl FromObj for Stream {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver.assert_stream(obj)
    }
}

impl<T: FromObj> FromObj for Vec<T> {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        resolver
            .assert_arr(obj)?
            .into_iter()
            .map(|obj| T::from_obj(obj, resolver))
            .collect()
    }
}

impl<T: FromObj> FromObj for Arc<T> {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        T::from_obj(obj, resolver).map(Arc::new)
    }
}
