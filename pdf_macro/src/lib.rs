mod pdf_enum;

use pdf_enum::pdf_enum_inner;
use proc_macro::TokenStream;

/// Maps a PDF name (or, with `#[pdf_enum(Integer)]`, an integer) onto a
/// fieldless enum, generating `from_str`/`from_integer` and a `FromObj` impl
#[proc_macro_attribute]
pub fn pdf_enum(attr: TokenStream, item: TokenStream) -> TokenStream {
    pdf_enum_inner(attr, item)
}
