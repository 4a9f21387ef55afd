use std::borrow::Cow;

use pdf_macro::pdf_enum;

use crate::{error::PdfResult, stream::Stream, Resolve};

use flate::{FlateDecoder, FlateDecoderParams};

pub mod ascii;
pub mod flate;

/// Applies every filter named by the stream dictionary, in order
pub(crate) fn decode_stream<'a>(
    stream: &'a Stream,
    resolver: &mut dyn Resolve,
) -> PdfResult<Cow<'a, [u8]>> {
    let filters = stream.filters(resolver)?;

    if filters.is_empty() {
        return Ok(Cow::Borrowed(&stream.stream));
    }

    let mut buffer = stream.stream.clone();

    for (idx, filter) in filters.into_iter().enumerate() {
        buffer = match filter {
            FilterKind::AsciiHex => ascii::decode_ascii_hex(&buffer)?,
            FilterKind::Flate => {
                let decode_parms = stream.decode_parms(idx, resolver)?;
                let params = FlateDecoderParams::from_dict(&decode_parms, resolver)?;

                FlateDecoder::new(&buffer, params)?.decode()?
            }
            other => anyhow::bail!("unsupported stream filter /{}", other.as_str()),
        };
    }

    Ok(Cow::Owned(buffer))
}

#[pdf_enum]
pub enum FilterKind {
    /// Decodes data encoded in an ASCII hexadecimal representation, reproducing
    /// the original binary data
    AsciiHex = "ASCIIHexDecode",

    /// Decodes data encoded in an ASCII base-85 representation, reproducing the
    /// original binary data
    Ascii85 = "ASCII85Decode",

    /// Decompresses data encoded using the LZW (Lempel-ZivWelch) adaptive compression
    /// method, reproducing the original text or binary data
    Lzw = "LZWDecode",

    /// Decompresses data encoded using the zlib/deflate compression method,
    /// reproducing the original text or binary data
    Flate = "FlateDecode",

    /// Decompresses data encoded using a byte-oriented run-length encoding algorithm
    RunLength = "RunLengthDecode",

    /// Decompresses data encoded using a DCT (discrete cosine transform) technique
    /// based on the JPEG standard
    Dct = "DCTDecode",

    /// Decrypts data encrypted by a security handler
    Crypt = "Crypt",
}
