use std::collections::HashMap;

use crate::{
    error::{ParseError, PdfResult},
    objects::{Dictionary, Name, Object, Reference},
    stream::Stream,
};

const FORM_FEED: u8 = b'\x0C';
const BACKSPACE: u8 = b'\x08';

pub(crate) trait LexBase {
    fn buffer(&self) -> &[u8];
    fn cursor(&self) -> usize;
    fn cursor_mut(&mut self) -> &mut usize;

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if Self::is_whitespace(b) {
                self.next_byte();
            } else if b == b'%' {
                self.next_byte();
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        self.buffer().get(self.cursor()).copied().map(|b| {
            *self.cursor_mut() += 1;
            b
        })
    }

    fn peek_byte(&self) -> Option<u8> {
        self.buffer().get(self.cursor()).copied()
    }

    fn peek_byte_offset(&self, offset: usize) -> Option<u8> {
        self.buffer().get(self.cursor() + offset).copied()
    }

    fn next_is_delimiter(&self) -> bool {
        self.peek_byte().map_or(false, Self::is_delimiter)
    }

    fn next_is_whitespace(&self) -> bool {
        self.peek_byte().map_or(false, Self::is_whitespace)
    }

    /// Whitespace chars are defined as
    ///
    /// * NUL             0x0
    /// * Horizontal tab  0x9
    /// * Line feed       0xa
    /// * Form feed       0xc
    /// * Carriage return 0xd
    /// * Space           0x20
    ///
    fn is_whitespace(b: u8) -> bool {
        matches!(b, b'\0' | 0x9 | b'\n' | FORM_FEED | b'\r' | b' ')
    }

    fn is_delimiter(b: u8) -> bool {
        matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
    }

    fn is_regular(b: u8) -> bool {
        !Self::is_whitespace(b) && !Self::is_delimiter(b)
    }

    /// Assumes the leading `%` has already been consumed
    fn skip_comment(&mut self) {
        while !self.next_is_eol() {
            self.next_byte();
        }
    }

    fn next_is_eol(&self) -> bool {
        match self.peek_byte() {
            Some(b'\r' | b'\n') => true,
            Some(..) => false,
            None => true,
        }
    }

    /// Does not modify the cursor
    fn next_matches(&self, bytes: &[u8]) -> bool {
        self.buffer()
            .get(self.cursor()..)
            .map_or(false, |rest| rest.starts_with(bytes))
    }

    /// Matches `keyword` only if it is not the prefix of a longer token
    fn next_is_keyword(&self, keyword: &[u8]) -> bool {
        self.next_matches(keyword)
            && self
                .peek_byte_offset(keyword.len())
                .map_or(true, |b| !Self::is_regular(b))
    }

    fn next_byte_err(&mut self) -> PdfResult<u8> {
        match self.next_byte() {
            Some(b) => Ok(b),
            None => anyhow::bail!(ParseError::UnexpectedEof),
        }
    }

    fn expect_byte(&mut self, expected: u8) -> PdfResult<()> {
        match self.next_byte() {
            Some(found) if expected == found => Ok(()),
            found => anyhow::bail!(ParseError::MismatchedByte { expected, found }),
        }
    }

    fn expect_bytes(&mut self, bytes: &[u8]) -> PdfResult<()> {
        for &b in bytes {
            self.expect_byte(b)?;
        }

        Ok(())
    }

    /// The end of line marker after `stream` is either `\n` or `\r\n`, though
    /// a lone `\r` is tolerated
    fn skip_eol(&mut self) {
        match self.peek_byte() {
            Some(b'\n') => {
                self.next_byte();
            }
            Some(b'\r') => {
                self.next_byte();
                if self.peek_byte() == Some(b'\n') {
                    self.next_byte();
                }
            }
            _ => {}
        }
    }

    fn line_number(&self) -> usize {
        let end = self.cursor().min(self.buffer().len());
        self.buffer()[..end].iter().filter(|&&c| c == b'\n').count() + 1
    }

    fn unexpected_token(&self) -> ParseError {
        let start = self.cursor().min(self.buffer().len());
        let end = (start + 16).min(self.buffer().len());

        ParseError::UnexpectedToken {
            found: String::from_utf8_lossy(&self.buffer()[start..end]).into_owned(),
            line: self.line_number(),
        }
    }

    fn hex_byte_to_digit(b: u8) -> PdfResult<u8> {
        Ok(match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => anyhow::bail!("invalid hex digit {:?}", b as char),
        })
    }

    fn lex_name(&mut self) -> PdfResult<Name> {
        self.expect_byte(b'/')?;

        let mut name = Vec::new();

        while let Some(b) = self.peek_byte() {
            if !Self::is_regular(b) {
                break;
            }

            self.next_byte();

            if b == b'#' {
                let high = Self::hex_byte_to_digit(self.next_byte_err()?)?;
                let low = Self::hex_byte_to_digit(self.next_byte_err()?)?;

                name.push(high << 4 | low);
            } else {
                name.push(b);
            }
        }

        Ok(Name(String::from_utf8_lossy(&name).into_owned()))
    }

    fn lex_string(&mut self) -> PdfResult<Vec<u8>> {
        self.expect_byte(b'(')?;

        let mut string = Vec::new();
        let mut num_open_parens = 0;

        loop {
            let b = self.next_byte_err()?;

            match b {
                b')' if num_open_parens == 0 => break,
                b')' => {
                    num_open_parens -= 1;
                    string.push(b')');
                }
                b'(' => {
                    num_open_parens += 1;
                    string.push(b'(');
                }
                b'\\' => match self.next_byte_err()? {
                    b'n' => string.push(b'\n'),
                    b'r' => string.push(b'\r'),
                    b't' => string.push(b'\t'),
                    b'b' => string.push(BACKSPACE),
                    b'f' => string.push(FORM_FEED),
                    b'(' => string.push(b'('),
                    b')' => string.push(b')'),
                    b'\\' => string.push(b'\\'),
                    // line continuation
                    b'\r' => {
                        if self.peek_byte() == Some(b'\n') {
                            self.next_byte();
                        }
                    }
                    b'\n' => {}
                    // octal escape of the form `\d`, `\dd` or `\ddd`
                    c @ b'0'..=b'7' => {
                        let mut n = u32::from(c - b'0');

                        for _ in 0..2 {
                            match self.peek_byte() {
                                Some(d @ b'0'..=b'7') => {
                                    self.next_byte();
                                    n = n * 8 + u32::from(d - b'0');
                                }
                                _ => break,
                            }
                        }

                        string.push(n as u8);
                    }
                    // unknown escapes drop the backslash
                    c => string.push(c),
                },
                _ => string.push(b),
            }
        }

        Ok(string)
    }

    /// If there is an odd number of digits, the last is treated as if it were
    /// followed by `0`
    fn lex_hex_string(&mut self) -> PdfResult<Vec<u8>> {
        self.expect_byte(b'<')?;

        let mut digits = Vec::new();

        loop {
            match self.next_byte_err()? {
                b'>' => break,
                b if Self::is_whitespace(b) => {}
                b => digits.push(Self::hex_byte_to_digit(b)?),
            }
        }

        Ok(digits
            .chunks(2)
            .map(|pair| pair[0] << 4 | pair.get(1).copied().unwrap_or(0))
            .collect())
    }

    fn lex_whole_number(&mut self) -> String {
        let mut whole_number = String::new();

        while let Some(b) = self.peek_byte() {
            if !b.is_ascii_digit() {
                break;
            }

            self.next_byte();

            whole_number.push(b as char);
        }

        whole_number
    }
}

/// Reads PDF objects out of a byte buffer
#[derive(Debug)]
pub struct Lexer<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl LexBase for Lexer<'_> {
    fn buffer(&self) -> &[u8] {
        self.buffer
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn cursor_mut(&mut self) -> &mut usize {
        &mut self.cursor
    }
}

impl<'a> Lexer<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn is_eof(&mut self) -> bool {
        self.skip_whitespace();
        self.peek_byte().is_none()
    }

    pub fn lex_object(&mut self) -> PdfResult<Object> {
        self.skip_whitespace();
        let obj = match self.peek_byte() {
            Some(b't') if self.next_is_keyword(b"true") => self.lex_true(),
            Some(b'f') if self.next_is_keyword(b"false") => self.lex_false(),
            Some(b'n') if self.next_is_keyword(b"null") => self.lex_null(),
            Some(b'<') => self.lex_gt(),
            Some(b'+' | b'-' | b'0'..=b'9' | b'.') => self.lex_number(),
            Some(b'(') => Ok(Object::String(self.lex_string()?)),
            Some(b'/') => Ok(Object::Name(self.lex_name()?)),
            Some(b'[') => self.lex_array(),
            Some(..) => anyhow::bail!(self.unexpected_token()),
            None => anyhow::bail!(ParseError::UnexpectedEof),
        }?;
        self.skip_whitespace();
        Ok(obj)
    }

    /// Assumes leading 't' has not been consumed
    fn lex_true(&mut self) -> PdfResult<Object> {
        self.expect_bytes(b"true")?;

        Ok(Object::True)
    }

    /// Assumes leading 'f' has not been consumed
    fn lex_false(&mut self) -> PdfResult<Object> {
        self.expect_bytes(b"false")?;

        Ok(Object::False)
    }

    /// Assumes leading 'n' has not been consumed
    fn lex_null(&mut self) -> PdfResult<Object> {
        self.expect_bytes(b"null")?;

        Ok(Object::Null)
    }

    fn lex_gt(&mut self) -> PdfResult<Object> {
        match self.peek_byte_offset(1) {
            Some(b'<') => self.lex_dict(),
            Some(..) => Ok(Object::String(self.lex_hex_string()?)),
            None => anyhow::bail!(ParseError::UnexpectedEof),
        }
    }

    fn lex_dict_ignore_stream(&mut self) -> PdfResult<Dictionary> {
        self.expect_bytes(b"<<")?;
        self.skip_whitespace();

        let mut dict = HashMap::new();

        loop {
            match self.peek_byte() {
                Some(b'>') => {
                    self.expect_bytes(b">>")?;
                    break;
                }
                Some(b'/') => {
                    let name = self.lex_name()?;
                    let value = self.lex_object()?;
                    dict.insert(name.0, value);
                }
                Some(..) => anyhow::bail!(self.unexpected_token()),
                None => anyhow::bail!(ParseError::UnexpectedEof),
            }

            self.skip_whitespace();
        }

        self.skip_whitespace();

        Ok(Dictionary::new(dict))
    }

    fn lex_dict(&mut self) -> PdfResult<Object> {
        let dict = self.lex_dict_ignore_stream()?;

        if self.next_is_keyword(b"stream") {
            return Ok(Object::Stream(self.lex_stream(dict)?));
        }

        Ok(Object::Dictionary(dict))
    }

    /// Uses `/Length` when it is a direct integer that lands on `endstream`.
    /// Otherwise the data runs up to the next `endstream` keyword
    fn lex_stream(&mut self, dict: Dictionary) -> PdfResult<Stream> {
        self.expect_bytes(b"stream")?;
        self.skip_eol();

        let start = self.cursor;

        let declared_len = match dict.get_object("Length") {
            Some(Object::Integer(len)) => usize::try_from(*len).ok(),
            _ => None,
        };

        let end = declared_len
            .map(|len| start + len)
            .filter(|&end| {
                let mut lexer = Lexer {
                    buffer: self.buffer,
                    cursor: end,
                };
                end <= self.buffer.len() && {
                    lexer.skip_whitespace();
                    lexer.next_matches(b"endstream")
                }
            })
            .or_else(|| self.find_endstream(start));

        let end = match end {
            Some(end) => end,
            None => anyhow::bail!("unterminated stream starting at line {}", self.line_number()),
        };

        let stream = self.buffer[start..end].to_vec();

        self.cursor = end;
        self.skip_whitespace();
        self.expect_bytes(b"endstream")?;

        Ok(Stream::new(dict, stream))
    }

    /// The end of the stream data, excluding the end of line marker that
    /// precedes `endstream`
    fn find_endstream(&self, start: usize) -> Option<usize> {
        let offset = self.buffer[start..]
            .windows(b"endstream".len())
            .position(|window| window == b"endstream")?;

        let mut end = start + offset;

        if end > start && self.buffer[end - 1] == b'\n' {
            end -= 1;
        }

        if end > start && self.buffer[end - 1] == b'\r' {
            end -= 1;
        }

        Some(end)
    }

    fn lex_number(&mut self) -> PdfResult<Object> {
        let negative = match self.peek_byte() {
            Some(b'+') => {
                self.next_byte();
                false
            }
            Some(b'-') => {
                self.next_byte();
                true
            }
            _ => false,
        };

        let whole_number = self.lex_whole_number();

        if self.peek_byte() == Some(b'.') {
            self.next_byte();

            let fraction = self.lex_whole_number();

            if whole_number.is_empty() && fraction.is_empty() {
                anyhow::bail!(self.unexpected_token());
            }

            let real = format!("0{}.{}0", whole_number, fraction).parse::<f32>()?;

            return Ok(Object::Real(if negative { -real } else { real }));
        }

        if whole_number.is_empty() {
            anyhow::bail!(self.unexpected_token());
        }

        if !negative {
            if let Some(reference) = self.try_lex_reference(&whole_number) {
                return Ok(Object::Reference(reference));
            }
        }

        let n = whole_number.parse::<i64>()?;
        let n = if negative { -n } else { n };

        // integers too large for an i32 are kept as reals
        Ok(match i32::try_from(n) {
            Ok(n) => Object::Integer(n),
            Err(..) => Object::Real(n as f32),
        })
    }

    /// Looks ahead for the `<generation> R` that turns an integer into an
    /// indirect reference. The cursor is restored when there isn't one
    fn try_lex_reference(&mut self, object_number: &str) -> Option<Reference> {
        let whole_end_pos = self.cursor;

        self.skip_whitespace();

        let generation = self.lex_whole_number();

        if !generation.is_empty() {
            self.skip_whitespace();

            if self.peek_byte() == Some(b'R') {
                self.next_byte();

                if self.peek_byte().is_none() || self.next_is_delimiter() || self.next_is_whitespace() {
                    if let (Ok(object_number), Ok(generation)) =
                        (object_number.parse::<usize>(), generation.parse::<usize>())
                    {
                        return Some(Reference::new(object_number, generation));
                    }
                }
            }
        }

        self.cursor = whole_end_pos;

        None
    }

    fn lex_array(&mut self) -> PdfResult<Object> {
        let mut arr = Vec::new();
        self.expect_byte(b'[')?;
        self.skip_whitespace();

        loop {
            match self.peek_byte() {
                Some(b']') => {
                    self.next_byte();
                    break;
                }
                Some(..) => arr.push(self.lex_object()?),
                None => anyhow::bail!(ParseError::UnexpectedEof),
            }
        }

        Ok(Object::Array(arr))
    }

    /// `<object number> <generation> obj <object> endobj`
    pub fn lex_indirect_object(&mut self) -> PdfResult<(Reference, Object)> {
        self.skip_whitespace();

        let object_number = self.lex_whole_number().parse::<usize>()?;
        self.skip_whitespace();
        let generation = self.lex_whole_number().parse::<usize>()?;
        self.skip_whitespace();
        self.expect_bytes(b"obj")?;

        let obj = self.lex_object()?;

        self.skip_whitespace();
        self.expect_bytes(b"endobj")?;

        Ok((Reference::new(object_number, generation), obj))
    }
}

/// Parses a buffer holding exactly one direct object
pub fn parse_object(buffer: &[u8]) -> PdfResult<Object> {
    let mut lexer = Lexer::new(buffer);
    let obj = lexer.lex_object()?;

    if !lexer.is_eof() {
        anyhow::bail!(lexer.unexpected_token());
    }

    Ok(obj)
}

/// Parses a sequence of `n g obj ... endobj` definitions. Later definitions of
/// the same object replace earlier ones
pub fn parse_indirect_objects(buffer: &[u8]) -> PdfResult<HashMap<Reference, Object>> {
    let mut lexer = Lexer::new(buffer);
    let mut objects = HashMap::new();

    while !lexer.is_eof() {
        let (reference, obj) = lexer.lex_indirect_object()?;
        objects.insert(reference, obj);
    }

    Ok(objects)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_with_escapes() {
        assert_eq!(parse_object(b"/Lab").unwrap(), Object::name("Lab"));
        assert_eq!(parse_object(b"/Pan#20Red").unwrap(), Object::name("Pan Red"));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_object(b"42").unwrap(), Object::Integer(42));
        assert_eq!(parse_object(b"-3").unwrap(), Object::Integer(-3));
        assert_eq!(parse_object(b"0.5").unwrap(), Object::Real(0.5));
        assert_eq!(parse_object(b"-.25").unwrap(), Object::Real(-0.25));
        assert_eq!(parse_object(b"4.").unwrap(), Object::Real(4.0));
        assert!(parse_object(b"-").is_err());
    }

    #[test]
    fn references_inside_arrays() {
        let obj = parse_object(b"[/ICCBased 12 0 R 1 2]").unwrap();

        assert_eq!(
            obj,
            Object::Array(vec![
                Object::name("ICCBased"),
                Object::Reference(Reference::new(12, 0)),
                Object::Integer(1),
                Object::Integer(2),
            ])
        );
    }

    #[test]
    fn strings() {
        assert_eq!(
            parse_object(b"(a\\(b\\) \\101\\n)").unwrap(),
            Object::String(b"a(b) A\n".to_vec())
        );
        assert_eq!(
            parse_object(b"<ff 00 7>").unwrap(),
            Object::String(vec![0xff, 0x00, 0x70])
        );
        assert_eq!(parse_object(b"<>").unwrap(), Object::String(Vec::new()));
    }

    #[test]
    fn dictionary() {
        let obj = parse_object(b"<< /WhitePoint [0.9505 1 1.089] /Gamma 2.2 >>").unwrap();

        let dict = match obj {
            Object::Dictionary(dict) => dict,
            obj => panic!("expected dictionary, found {:?}", obj),
        };

        assert_eq!(dict.get_object("Gamma"), Some(&Object::Real(2.2)));
        assert!(dict.has_key("WhitePoint"));
        assert!(!dict.has_key("BlackPoint"));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn stream_with_indirect_length() {
        let objects =
            parse_indirect_objects(b"1 0 obj << /Length 2 0 R >> stream\nabc\nendstream endobj\n2 0 obj 3 endobj")
                .unwrap();

        match &objects[&Reference::new(1, 0)] {
            Object::Stream(stream) => assert_eq!(stream.raw_bytes(), b"abc"),
            obj => panic!("expected stream, found {:?}", obj),
        }
        assert_eq!(objects[&Reference::new(2, 0)], Object::Integer(3));
    }

    #[test]
    fn stream_with_direct_length() {
        let obj = parse_object(b"<< /Length 4 >>\nstream\r\nab\ncendstream").unwrap();

        match obj {
            Object::Stream(stream) => assert_eq!(stream.raw_bytes(), b"ab\nc"),
            obj => panic!("expected stream, found {:?}", obj),
        }
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        assert!(parse_object(b"/DeviceRGB )").is_err());
        assert!(parse_object(b"[/DeviceRGB").is_err());
    }
}
