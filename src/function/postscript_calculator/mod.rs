use crate::{error::PdfResult, stream::Stream, Resolve};

use self::lexer::{PostScriptFunctionLexer, PostScriptFunctionOperator, PostScriptFunctionToken};

mod lexer;

/// Operand stacks deeper than this are an error
const MAX_STACK_DEPTH: usize = 100;

/// Procedures nested deeper than this are an error
const MAX_BLOCK_DEPTH: usize = 64;

/// A type 4 function (PDF 1.3), also called a PostScript calculator function, shall be
/// represented as a stream containing code written in a small subset of the PostScript language
#[derive(Debug, Clone)]
pub struct PostScriptCalculatorFunction {
    program: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq)]
enum Instruction {
    Push(Operand),
    Operator(PostScriptFunctionOperator),
    If(Vec<Instruction>),
    IfElse(Vec<Instruction>, Vec<Instruction>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operand {
    Integer(i32),
    Real(f32),
    Bool(bool),
}

impl Operand {
    fn as_real(self) -> PdfResult<f32> {
        match self {
            Self::Integer(i) => Ok(i as f32),
            Self::Real(r) => Ok(r),
            Self::Bool(..) => anyhow::bail!("expected number, found boolean"),
        }
    }

    fn as_integer(self) -> PdfResult<i32> {
        match self {
            Self::Integer(i) => Ok(i),
            other => anyhow::bail!("expected integer, found {:?}", other),
        }
    }

    fn as_bool(self) -> PdfResult<bool> {
        match self {
            Self::Bool(b) => Ok(b),
            other => anyhow::bail!("expected boolean, found {:?}", other),
        }
    }
}

/// Parses the instructions of a `{ ... }` block whose opening brace has already
/// been consumed. `depth` counts the enclosing blocks, this one included
fn parse_block(tokens: &mut PostScriptFunctionLexer, depth: usize) -> PdfResult<Vec<Instruction>> {
    if depth > MAX_BLOCK_DEPTH {
        anyhow::bail!("PostScript calculator procedures are nested too deeply");
    }

    let mut instructions = Vec::new();
    let mut pending_blocks: Vec<Vec<Instruction>> = Vec::new();

    loop {
        let token = match tokens.next() {
            Some(token) => token?,
            None => anyhow::bail!("unterminated block in PostScript calculator function"),
        };

        match token {
            PostScriptFunctionToken::CloseCurlyBrace => break,
            PostScriptFunctionToken::OpenCurlyBrace => {
                pending_blocks.push(parse_block(tokens, depth + 1)?);
                continue;
            }
            PostScriptFunctionToken::Operator(PostScriptFunctionOperator::If) => {
                match (pending_blocks.pop(), pending_blocks.is_empty()) {
                    (Some(block), true) => instructions.push(Instruction::If(block)),
                    _ => anyhow::bail!("`if` must follow exactly one procedure"),
                }
                continue;
            }
            PostScriptFunctionToken::Operator(PostScriptFunctionOperator::Ifelse) => {
                let else_block = pending_blocks.pop();
                let if_block = pending_blocks.pop();

                match (if_block, else_block, pending_blocks.is_empty()) {
                    (Some(if_block), Some(else_block), true) => {
                        instructions.push(Instruction::IfElse(if_block, else_block))
                    }
                    _ => anyhow::bail!("`ifelse` must follow exactly two procedures"),
                }
                continue;
            }
            _ => {}
        }

        if !pending_blocks.is_empty() {
            anyhow::bail!("procedures may only appear as operands of `if` and `ifelse`");
        }

        instructions.push(match token {
            PostScriptFunctionToken::Integer(i) => Instruction::Push(Operand::Integer(i)),
            PostScriptFunctionToken::Real(r) => Instruction::Push(Operand::Real(r)),
            PostScriptFunctionToken::Operator(op) => Instruction::Operator(op),
            PostScriptFunctionToken::OpenCurlyBrace | PostScriptFunctionToken::CloseCurlyBrace => {
                unreachable!()
            }
        });
    }

    if !pending_blocks.is_empty() {
        anyhow::bail!("procedures may only appear as operands of `if` and `ifelse`");
    }

    Ok(instructions)
}

impl PostScriptCalculatorFunction {
    pub fn from_stream(stream: Stream, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        let buffer = stream.decode(resolver)?;

        Self::parse(&buffer)
    }

    fn parse(buffer: &[u8]) -> PdfResult<Self> {
        let mut tokens = PostScriptFunctionLexer::new(buffer);

        match tokens.next() {
            Some(Ok(PostScriptFunctionToken::OpenCurlyBrace)) => {}
            Some(Err(err)) => return Err(err),
            _ => anyhow::bail!("PostScript calculator function must begin with `{{`"),
        }

        let program = parse_block(&mut tokens, 1)?;

        if let Some(token) = tokens.next() {
            anyhow::bail!(
                "unexpected {:?} after PostScript calculator function",
                token?
            );
        }

        Ok(Self { program })
    }

    pub fn evaluate(&self, input: &[f32]) -> PdfResult<Vec<f32>> {
        let mut stack = OperandStack::default();

        for &x in input {
            stack.push(Operand::Real(x))?;
        }

        stack.execute(&self.program)?;

        stack.0.into_iter().map(Operand::as_real).collect()
    }
}

#[derive(Debug, Default)]
struct OperandStack(Vec<Operand>);

impl OperandStack {
    fn push(&mut self, operand: Operand) -> PdfResult<()> {
        if self.0.len() >= MAX_STACK_DEPTH {
            anyhow::bail!("PostScript calculator stack overflow");
        }

        self.0.push(operand);

        Ok(())
    }

    fn pop(&mut self) -> PdfResult<Operand> {
        match self.0.pop() {
            Some(operand) => Ok(operand),
            None => anyhow::bail!("PostScript calculator stack underflow"),
        }
    }

    fn pop_real(&mut self) -> PdfResult<f32> {
        self.pop()?.as_real()
    }

    fn pop_integer(&mut self) -> PdfResult<i32> {
        self.pop()?.as_integer()
    }

    fn pop_bool(&mut self) -> PdfResult<bool> {
        self.pop()?.as_bool()
    }

    fn push_real(&mut self, r: f32) -> PdfResult<()> {
        self.push(Operand::Real(r))
    }

    fn push_bool(&mut self, b: bool) -> PdfResult<()> {
        self.push(Operand::Bool(b))
    }

    /// Integer arithmetic that stays integral unless it overflows
    fn arithmetic(
        &mut self,
        int_op: fn(i32, i32) -> Option<i32>,
        real_op: fn(f32, f32) -> f32,
    ) -> PdfResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;

        if let (Operand::Integer(a), Operand::Integer(b)) = (a, b) {
            if let Some(n) = int_op(a, b) {
                return self.push(Operand::Integer(n));
            }
        }

        self.push_real(real_op(a.as_real()?, b.as_real()?))
    }

    fn compare(&mut self, op: fn(f32, f32) -> bool) -> PdfResult<()> {
        let b = self.pop_real()?;
        let a = self.pop_real()?;

        self.push_bool(op(a, b))
    }

    fn equality(&mut self) -> PdfResult<bool> {
        let b = self.pop()?;
        let a = self.pop()?;

        Ok(match (a, b) {
            (Operand::Bool(a), Operand::Bool(b)) => a == b,
            (Operand::Bool(..), _) | (_, Operand::Bool(..)) => false,
            (a, b) => a.as_real()? == b.as_real()?,
        })
    }

    fn logical(&mut self, bool_op: fn(bool, bool) -> bool, int_op: fn(i32, i32) -> i32) -> PdfResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;

        match (a, b) {
            (Operand::Bool(a), Operand::Bool(b)) => self.push_bool(bool_op(a, b)),
            (Operand::Integer(a), Operand::Integer(b)) => self.push(Operand::Integer(int_op(a, b))),
            (a, b) => anyhow::bail!("mismatched operands {:?} and {:?}", a, b),
        }
    }

    /// Rounding operators keep integers as they are
    fn round_with(&mut self, op: fn(f32) -> f32) -> PdfResult<()> {
        match self.pop()? {
            Operand::Integer(i) => self.push(Operand::Integer(i)),
            Operand::Real(r) => self.push_real(op(r)),
            Operand::Bool(..) => anyhow::bail!("expected number, found boolean"),
        }
    }

    fn execute(&mut self, program: &[Instruction]) -> PdfResult<()> {
        for instruction in program {
            match instruction {
                Instruction::Push(operand) => self.push(*operand)?,
                Instruction::Operator(op) => self.apply(*op)?,
                Instruction::If(block) => {
                    if self.pop_bool()? {
                        self.execute(block)?;
                    }
                }
                Instruction::IfElse(if_block, else_block) => {
                    if self.pop_bool()? {
                        self.execute(if_block)?;
                    } else {
                        self.execute(else_block)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn apply(&mut self, op: PostScriptFunctionOperator) -> PdfResult<()> {
        use PostScriptFunctionOperator as Op;

        match op {
            Op::Abs => match self.pop()? {
                Operand::Integer(i) => match i.checked_abs() {
                    Some(i) => self.push(Operand::Integer(i)),
                    None => self.push_real((i as f32).abs()),
                },
                other => {
                    let r = other.as_real()?;
                    self.push_real(r.abs())
                }
            },
            Op::Neg => match self.pop()? {
                Operand::Integer(i) => match i.checked_neg() {
                    Some(i) => self.push(Operand::Integer(i)),
                    None => self.push_real(-(i as f32)),
                },
                other => {
                    let r = other.as_real()?;
                    self.push_real(-r)
                }
            },
            Op::Add => self.arithmetic(i32::checked_add, |a, b| a + b),
            Op::Sub => self.arithmetic(i32::checked_sub, |a, b| a - b),
            Op::Mul => self.arithmetic(i32::checked_mul, |a, b| a * b),
            Op::Div => {
                let b = self.pop_real()?;
                let a = self.pop_real()?;

                if b == 0.0 {
                    anyhow::bail!("division by zero");
                }

                self.push_real(a / b)
            }
            Op::Idiv | Op::Mod => {
                let b = self.pop_integer()?;
                let a = self.pop_integer()?;

                let result = if op == Op::Idiv {
                    a.checked_div(b)
                } else {
                    a.checked_rem(b)
                };

                match result {
                    Some(n) => self.push(Operand::Integer(n)),
                    None => anyhow::bail!("division by zero"),
                }
            }
            Op::Atan => {
                let den = self.pop_real()?;
                let num = self.pop_real()?;

                if num == 0.0 && den == 0.0 {
                    anyhow::bail!("atan of 0/0 is undefined");
                }

                let angle = num.atan2(den).to_degrees();
                self.push_real(if angle < 0.0 { angle + 360.0 } else { angle })
            }
            Op::Cos => {
                let angle = self.pop_real()?;
                self.push_real(angle.to_radians().cos())
            }
            Op::Sin => {
                let angle = self.pop_real()?;
                self.push_real(angle.to_radians().sin())
            }
            Op::Exp => {
                let exponent = self.pop_real()?;
                let base = self.pop_real()?;
                self.push_real(base.powf(exponent))
            }
            Op::Ln | Op::Log | Op::Sqrt => {
                let x = self.pop_real()?;

                if x < 0.0 || (x == 0.0 && op != Op::Sqrt) {
                    anyhow::bail!("{} of {} is undefined", op.as_str(), x);
                }

                self.push_real(match op {
                    Op::Ln => x.ln(),
                    Op::Log => x.log10(),
                    _ => x.sqrt(),
                })
            }
            Op::Ceiling => self.round_with(f32::ceil),
            Op::Floor => self.round_with(f32::floor),
            // PostScript rounds halves towards positive infinity
            Op::Round => self.round_with(|r| (r + 0.5).floor()),
            Op::Truncate => self.round_with(f32::trunc),
            Op::Cvi => {
                let r = self.pop_real()?;
                self.push(Operand::Integer(r.trunc() as i32))
            }
            Op::Cvr => {
                let r = self.pop_real()?;
                self.push_real(r)
            }

            Op::And => self.logical(|a, b| a & b, |a, b| a & b),
            Op::Or => self.logical(|a, b| a | b, |a, b| a | b),
            Op::Xor => self.logical(|a, b| a ^ b, |a, b| a ^ b),
            Op::Not => match self.pop()? {
                Operand::Bool(b) => self.push_bool(!b),
                Operand::Integer(i) => self.push(Operand::Integer(!i)),
                Operand::Real(..) => anyhow::bail!("`not` of a real"),
            },
            Op::Bitshift => {
                let shift = self.pop_integer()?;
                let n = self.pop_integer()?;

                let shifted = if shift >= 0 {
                    n.checked_shl(shift as u32).unwrap_or(0)
                } else {
                    ((n as u32).checked_shr(shift.unsigned_abs()).unwrap_or(0)) as i32
                };

                self.push(Operand::Integer(shifted))
            }
            Op::Eq => {
                let eq = self.equality()?;
                self.push_bool(eq)
            }
            Op::Ne => {
                let eq = self.equality()?;
                self.push_bool(!eq)
            }
            Op::Ge => self.compare(|a, b| a >= b),
            Op::Gt => self.compare(|a, b| a > b),
            Op::Le => self.compare(|a, b| a <= b),
            Op::Lt => self.compare(|a, b| a < b),
            Op::True => self.push_bool(true),
            Op::False => self.push_bool(false),

            Op::If | Op::Ifelse => anyhow::bail!("`{}` without procedures", op.as_str()),

            Op::Copy => {
                let n = self.pop_integer()?;
                let n = usize::try_from(n)?;

                if n > self.0.len() {
                    anyhow::bail!("PostScript calculator stack underflow");
                }

                let start = self.0.len() - n;
                for idx in start..start + n {
                    let operand = self.0[idx];
                    self.push(operand)?;
                }

                Ok(())
            }
            Op::Dup => {
                let top = self.pop()?;
                self.push(top)?;
                self.push(top)
            }
            Op::Exch => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(b)?;
                self.push(a)
            }
            Op::Index => {
                let n = usize::try_from(self.pop_integer()?)?;

                match self.0.len().checked_sub(n + 1) {
                    Some(idx) => {
                        let operand = self.0[idx];
                        self.push(operand)
                    }
                    None => anyhow::bail!("PostScript calculator stack underflow"),
                }
            }
            Op::Pop => self.pop().map(|_| ()),
            Op::Roll => {
                let j = self.pop_integer()?;
                let n = usize::try_from(self.pop_integer()?)?;

                if n > self.0.len() {
                    anyhow::bail!("PostScript calculator stack underflow");
                }

                if n > 0 {
                    let start = self.0.len() - n;
                    let shift = j.rem_euclid(n as i32) as usize;
                    self.0[start..].rotate_right(shift);
                }

                Ok(())
            }
        }
    }
}
