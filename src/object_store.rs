use std::collections::HashMap;

use crate::{
    error::PdfResult,
    lex::parse_indirect_objects,
    objects::{Object, Reference},
    resolve::Resolve,
};

/// An in-memory table of indirect objects
///
/// References to objects that are not in the table resolve to `null`
#[derive(Debug, Default, Clone)]
pub struct ObjectStore {
    objects: HashMap<Reference, Object>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a sequence of `n g obj ... endobj` definitions
    pub fn from_source(source: &[u8]) -> PdfResult<Self> {
        Ok(Self {
            objects: parse_indirect_objects(source)?,
        })
    }

    pub fn insert(&mut self, reference: Reference, obj: Object) {
        self.objects.insert(reference, obj);
    }

    pub fn get(&self, reference: Reference) -> Option<&Object> {
        self.objects.get(&reference)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Resolve for ObjectStore {
    fn lex_object_from_reference(&mut self, reference: Reference) -> PdfResult<Object> {
        match self.objects.get(&reference) {
            Some(obj) => Ok(obj.clone()),
            None => {
                log::debug!("reference to missing object {}", reference);
                Ok(Object::Null)
            }
        }
    }
}

impl FromIterator<(Reference, Object)> for ObjectStore {
    fn from_iter<I: IntoIterator<Item = (Reference, Object)>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}
