use std::{borrow::Cow, fmt};

use crate::{
    error::PdfResult,
    filter::{decode_stream, FilterKind},
    objects::{Dictionary, Object},
    resolve::{FromObj, Resolve},
};

#[derive(Clone, PartialEq)]
pub struct Stream {
    pub(crate) dict: Dictionary,
    pub(crate) stream: Vec<u8>,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("dict", &self.dict)
            .field("stream", &format!("[ {} bytes ]", self.stream.len()))
            .finish()
    }
}

impl Stream {
    pub fn new(dict: Dictionary, stream: Vec<u8>) -> Self {
        Self { dict, stream }
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// The stream contents as stored in the file, before any filter is applied
    pub fn raw_bytes(&self) -> &[u8] {
        &self.stream
    }

    /// `/Filter` may be a single name or an array of names
    pub fn filters(&self, resolver: &mut dyn Resolve) -> PdfResult<Vec<FilterKind>> {
        let obj = match self.dict.get_object("Filter") {
            Some(obj) => resolver.resolve(obj.clone())?,
            None => return Ok(Vec::new()),
        };

        match obj {
            Object::Array(arr) => arr
                .into_iter()
                .map(|obj| FilterKind::from_obj(obj, resolver))
                .collect(),
            Object::Null => Ok(Vec::new()),
            obj => Ok(vec![FilterKind::from_obj(obj, resolver)?]),
        }
    }

    /// `/DecodeParms` parallels `/Filter`; missing entries are empty dictionaries
    pub(crate) fn decode_parms(&self, idx: usize, resolver: &mut dyn Resolve) -> PdfResult<Dictionary> {
        let obj = match self.dict.get_object("DecodeParms") {
            Some(obj) => resolver.resolve(obj.clone())?,
            None => return Ok(Dictionary::empty()),
        };

        Ok(match obj {
            Object::Array(arr) => match arr.into_iter().nth(idx) {
                Some(obj) => match resolver.resolve(obj)? {
                    Object::Null => Dictionary::empty(),
                    obj => resolver.assert_dict(obj)?,
                },
                None => Dictionary::empty(),
            },
            Object::Dictionary(dict) if idx == 0 => dict,
            _ => Dictionary::empty(),
        })
    }

    pub fn decode(&self, resolver: &mut dyn Resolve) -> PdfResult<Cow<'_, [u8]>> {
        decode_stream(self, resolver)
    }
}
