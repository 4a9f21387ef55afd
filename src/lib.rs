//! Resolution of PDF color space descriptors, and conversion of colors in
//! those spaces to device RGB

pub mod color;
mod error;
pub mod filter;
pub mod function;
mod lex;
mod object_store;
mod objects;
mod resolve;
mod stream;

pub use crate::{
    color::{resolve as resolve_color_space, Color, ColorSpace, ColorSpaceName, Rgb},
    error::{ParseError, PdfResult},
    function::{Function, TintTransform},
    lex::{parse_indirect_objects, parse_object, Lexer},
    object_store::ObjectStore,
    objects::{Dictionary, Name, Object, ObjectType, Reference},
    resolve::{FromObj, NoResolve, Resolve},
    stream::Stream,
};
