use std::fmt;

use crate::objects::{Object, ObjectType};

#[derive(Debug)]
pub enum ParseError {
    MismatchedByte {
        expected: u8,
        found: Option<u8>,
    },
    UnexpectedEof,
    MismatchedObjectType {
        expected: ObjectType,
        found: Object,
    },
    MissingRequiredKey {
        key: &'static str,
    },
    UnrecognizedVariant {
        found: String,
        ty: &'static str,
    },
    UnexpectedToken {
        found: String,
        line: usize,
    },

    /// A color space descriptor could not be turned into a color space. All
    /// failures while resolving a descriptor are reported through this variant
    InvalidColorSpace {
        reason: String,
    },

    /// A color tuple was handed to a color space declaring a different number
    /// of components
    ComponentCountMismatch {
        expected: usize,
        found: usize,
    },
}

impl ParseError {
    pub fn invalid_color_space(reason: impl Into<String>) -> Self {
        Self::InvalidColorSpace {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidColorSpace { reason } => write!(f, "invalid color space: {}", reason),
            Self::ComponentCountMismatch { expected, found } => write!(
                f,
                "invalid number of color components: expected {}, found {}",
                expected, found
            ),
            Self::MissingRequiredKey { key } => write!(f, "missing required key /{}", key),
            Self::MismatchedObjectType { expected, found } => write!(
                f,
                "expected {:?}, found {:?}",
                expected,
                found.object_type()
            ),
            err => write!(f, "{:#?}", err),
        }
    }
}

impl std::error::Error for ParseError {}

pub type PdfResult<T> = anyhow::Result<T>;
