use crate::error::PdfResult;

fn hex_digit(b: u8) -> PdfResult<u8> {
    Ok(match b {
        b'0'..=b'9' => b - b'0',
        b'A'..=b'F' => b - b'A' + 10,
        b'a'..=b'f' => b - b'a' + 10,
        _ => anyhow::bail!("invalid character {:?} in ASCIIHexDecode stream", b as char),
    })
}

/// Whitespace is ignored and `>` ends the data. An odd trailing digit behaves
/// as if it were followed by `0`
pub(crate) fn decode_ascii_hex(stream: &[u8]) -> PdfResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(stream.len() / 2);

    let mut iter = stream
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .take_while(|&b| b != b'>');

    while let Some(high) = iter.next() {
        let high = hex_digit(high)?;
        let low = iter.next().map(hex_digit).transpose()?.unwrap_or(0);

        buffer.push(high << 4 | low);
    }

    Ok(buffer)
}
