use pdf_macro::pdf_enum;

use crate::error::PdfResult;

#[derive(Debug, Clone)]
pub(crate) struct PostScriptFunctionLexer<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PostScriptFunctionToken {
    Operator(PostScriptFunctionOperator),
    Real(f32),
    Integer(i32),
    OpenCurlyBrace,
    CloseCurlyBrace,
}

#[pdf_enum]
pub(crate) enum PostScriptFunctionOperator {
    // Arithmetic
    Abs = "abs",
    Add = "add",
    Atan = "atan",
    Ceiling = "ceiling",
    Cos = "cos",
    Cvi = "cvi",
    Cvr = "cvr",
    Div = "div",
    Exp = "exp",
    Floor = "floor",
    Idiv = "idiv",
    Ln = "ln",
    Log = "log",
    Mod = "mod",
    Mul = "mul",
    Neg = "neg",
    Round = "round",
    Sin = "sin",
    Sqrt = "sqrt",
    Sub = "sub",
    Truncate = "truncate",

    // Relational, boolean, and bitwise
    And = "and",
    Bitshift = "bitshift",
    Eq = "eq",
    False = "false",
    Ge = "ge",
    Gt = "gt",
    Le = "le",
    Lt = "lt",
    Ne = "ne",
    Not = "not",
    Or = "or",
    True = "true",
    Xor = "xor",

    // Conditional
    If = "if",
    Ifelse = "ifelse",

    // Stack
    Copy = "copy",
    Dup = "dup",
    Exch = "exch",
    Index = "index",
    Pop = "pop",
    Roll = "roll",
}

impl<'a> PostScriptFunctionLexer<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_whitespace() || b == b'\0' {
                self.next_byte();
            } else if b == b'%' {
                while !matches!(self.next_byte(), Some(b'\n' | b'\r') | None) {}
            } else {
                break;
            }
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = self.buffer.get(self.cursor)?;

        self.cursor += 1;

        Some(*b)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.buffer.get(self.cursor).copied()
    }

    fn lex_ident(&mut self) -> PdfResult<PostScriptFunctionToken> {
        let start = self.cursor;

        while let Some(b) = self.peek_byte() {
            if !b.is_ascii_alphabetic() {
                break;
            }

            self.next_byte();
        }

        let ident = String::from_utf8_lossy(&self.buffer[start..self.cursor]);

        Ok(PostScriptFunctionToken::Operator(
            PostScriptFunctionOperator::from_str(&ident)?,
        ))
    }

    fn lex_whole_number(&mut self) {
        while let Some(b) = self.peek_byte() {
            if !b.is_ascii_digit() {
                break;
            }

            self.next_byte();
        }
    }

    fn consume_if_next_byte_is(&mut self, b: u8) -> bool {
        if self.peek_byte() == Some(b) {
            self.next_byte();
            return true;
        }

        false
    }

    fn lex_number(&mut self) -> PdfResult<PostScriptFunctionToken> {
        let start = self.cursor;
        let _ = self.consume_if_next_byte_is(b'-') || self.consume_if_next_byte_is(b'+');
        self.lex_whole_number();

        let mut is_real = false;

        if self.consume_if_next_byte_is(b'.') {
            is_real = true;
            self.lex_whole_number();
        }

        if self.consume_if_next_byte_is(b'e') || self.consume_if_next_byte_is(b'E') {
            is_real = true;
            let _ = self.consume_if_next_byte_is(b'-') || self.consume_if_next_byte_is(b'+');
            self.lex_whole_number();
        }

        let text = String::from_utf8_lossy(&self.buffer[start..self.cursor]);

        if is_real {
            return Ok(PostScriptFunctionToken::Real(text.parse::<f32>()?));
        }

        // integers that overflow are promoted to reals, as in PostScript
        Ok(match text.parse::<i32>() {
            Ok(i) => PostScriptFunctionToken::Integer(i),
            Err(..) => PostScriptFunctionToken::Real(text.parse::<f32>()?),
        })
    }

    fn next_token(&mut self) -> Option<PdfResult<PostScriptFunctionToken>> {
        self.skip_whitespace();

        Some(match self.peek_byte()? {
            b'0'..=b'9' | b'-' | b'+' | b'.' => self.lex_number(),
            b'a'..=b'z' | b'A'..=b'Z' => self.lex_ident(),
            b'{' => {
                self.next_byte();
                Ok(PostScriptFunctionToken::OpenCurlyBrace)
            }
            b'}' => {
                self.next_byte();
                Ok(PostScriptFunctionToken::CloseCurlyBrace)
            }
            b => {
                self.next_byte();
                Err(anyhow::anyhow!(
                    "unexpected byte {:?} in PostScript calculator function",
                    b as char
                ))
            }
        })
    }
}

impl Iterator for PostScriptFunctionLexer<'_> {
    type Item = PdfResult<PostScriptFunctionToken>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tokens() {
        let tokens = PostScriptFunctionLexer::new(b"{ 1 -2.5 .5 dup { pop } if }")
            .collect::<PdfResult<Vec<_>>>()
            .unwrap();

        assert_eq!(
            tokens,
            vec![
                PostScriptFunctionToken::OpenCurlyBrace,
                PostScriptFunctionToken::Integer(1),
                PostScriptFunctionToken::Real(-2.5),
                PostScriptFunctionToken::Real(0.5),
                PostScriptFunctionToken::Operator(PostScriptFunctionOperator::Dup),
                PostScriptFunctionToken::OpenCurlyBrace,
                PostScriptFunctionToken::Operator(PostScriptFunctionOperator::Pop),
                PostScriptFunctionToken::CloseCurlyBrace,
                PostScriptFunctionToken::Operator(PostScriptFunctionOperator::If),
                PostScriptFunctionToken::CloseCurlyBrace,
            ]
        );
    }

    #[test]
    fn unknown_operator() {
        let mut lexer = PostScriptFunctionLexer::new(b"{ moveto }");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_err());
    }
}
