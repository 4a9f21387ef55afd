use std::{borrow::Borrow, collections::HashMap, fmt};

use crate::{
    error::{ParseError, PdfResult},
    resolve::{FromObj, Resolve},
    stream::Stream,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Null,
    Boolean,
    Integer,
    Real,
    String,
    Name,
    Array,
    Stream,
    Dictionary,
    Reference,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    True,
    False,
    Integer(i32),
    Real(f32),
    String(Vec<u8>),
    Name(Name),
    Array(Vec<Self>),
    Stream(Stream),
    Dictionary(Dictionary),
    Reference(Reference),
}

impl Object {
    pub fn name(name: &str) -> Self {
        Object::Name(Name::new(name))
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Null => ObjectType::Null,
            Object::True | Object::False => ObjectType::Boolean,
            Object::Integer(..) => ObjectType::Integer,
            Object::Real(..) => ObjectType::Real,
            Object::String(..) => ObjectType::String,
            Object::Name(..) => ObjectType::Name,
            Object::Array(..) => ObjectType::Array,
            Object::Stream(..) => ObjectType::Stream,
            Object::Dictionary(..) => ObjectType::Dictionary,
            Object::Reference(..) => ObjectType::Reference,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }
}

/// A reference to a non-existing object is considered a `null`
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Reference {
    pub object_number: usize,
    pub generation: usize,
}

impl Reference {
    pub const fn new(object_number: usize, generation: usize) -> Self {
        Self {
            object_number,
            generation,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.object_number, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    dict: HashMap<String, Object>,
}

impl Dictionary {
    pub fn new(dict: HashMap<String, Object>) -> Self {
        Self { dict }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: Object) {
        self.dict.insert(key.to_owned(), value);
    }

    /// `null` values are indistinguishable from missing entries
    pub fn get_object(&self, key: &str) -> Option<&Object> {
        self.dict.get(key).filter(|obj| !obj.is_null())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.get_object(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn get<T: FromObj>(&self, key: &str, resolver: &mut dyn Resolve) -> PdfResult<Option<T>> {
        let obj = match self.get_object(key) {
            Some(obj) => resolver.resolve(obj.clone())?,
            None => return Ok(None),
        };

        if obj.is_null() {
            return Ok(None);
        }

        T::from_obj(obj, resolver).map(Some)
    }

    pub fn expect<T: FromObj>(&self, key: &'static str, resolver: &mut dyn Resolve) -> PdfResult<T> {
        self.get(key, resolver)?
            .ok_or_else(|| ParseError::MissingRequiredKey { key }.into())
    }

    /// Reads a single number, falling back to `default` when the entry is
    /// missing or is not a number
    pub fn get_number(&self, key: &str, resolver: &mut dyn Resolve, default: f32) -> f32 {
        match self.get::<f32>(key, resolver) {
            Ok(Some(n)) => n,
            Ok(None) => default,
            Err(err) => {
                log::warn!("ignoring malformed /{}: {}", key, err);
                default
            }
        }
    }

    pub fn get_integer(&self, key: &str, resolver: &mut dyn Resolve, default: i32) -> i32 {
        match self.get::<i32>(key, resolver) {
            Ok(Some(n)) => n,
            Ok(None) => default,
            Err(err) => {
                log::warn!("ignoring malformed /{}: {}", key, err);
                default
            }
        }
    }

    /// Overwrites `out` with the numbers stored under `key`, but only if the
    /// entry is an array of exactly `out.len()` numbers. Otherwise `out` is left
    /// untouched, so callers pre-fill it with their defaults
    pub fn read_number_array_into(&self, key: &str, resolver: &mut dyn Resolve, out: &mut [f32]) {
        let numbers = match self.get::<Vec<f32>>(key, resolver) {
            Ok(Some(numbers)) => numbers,
            Ok(None) => return,
            Err(err) => {
                log::warn!("ignoring malformed /{}: {}", key, err);
                return;
            }
        };

        if numbers.len() != out.len() {
            log::warn!(
                "ignoring /{}: expected {} numbers, found {}",
                key,
                out.len(),
                numbers.len()
            );
            return;
        }

        out.copy_from_slice(&numbers);
    }

    pub fn get_number_array<const N: usize>(
        &self,
        key: &str,
        resolver: &mut dyn Resolve,
        default: [f32; N],
    ) -> [f32; N] {
        let mut out = default;
        self.read_number_array_into(key, resolver, &mut out);
        out
    }
}

impl FromIterator<(String, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, Object)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
