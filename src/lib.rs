//! A small end-to-end toolchain for a C-like language: source text is
//! tokenized, parsed into a typed AST, compiled to a custom stack-based
//! bytecode and executed by an interpreter.
//!
//! Look at [`interpret`] to run a program in one step, or drive the phases
//! individually via [`tokenize`](frontend::tokenize), [`parse`],
//! [`compile`](bytecode::compile), [`disassemble`](bytecode::disassemble)
//! and [`run`](runtime::run).

use std::fmt::{self, Display};

pub mod bytecode;
pub mod frontend;
pub mod runtime;
pub mod shared;

pub use frontend::parser::ParsedProgram;
pub use runtime::Value;

/// An error generated during program compilation or execution.
#[derive(Clone, Debug)]
pub enum Error {
    LexError(frontend::LexError),
    ParseError(frontend::ParseError),
    CompileError(bytecode::CompileError),
    RuntimeError(runtime::RuntimeError),
}

impl Error {
    /// 1-based line/column location of the error, where one exists.
    pub fn loc(self: &Self) -> Option<(u32, u32)> {
        match self {
            Self::LexError(e) => Some(e.loc()),
            Self::ParseError(e) => Some(e.loc()),
            Self::CompileError(e) => Some(e.loc()),
            Self::RuntimeError(_) => None,
        }
    }
}

impl Display for Error {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexError(e) => write!(f, "{}", e),
            Self::ParseError(e) => write!(f, "{}", e),
            Self::CompileError(e) => write!(f, "{}", e),
            Self::RuntimeError(e) => write!(f, "{}", e),
        }
    }
}

impl From<frontend::LexError> for Error {
    fn from(error: frontend::LexError) -> Error {
        Error::LexError(error)
    }
}

impl From<frontend::ParseError> for Error {
    fn from(error: frontend::ParseError) -> Error {
        Error::ParseError(error)
    }
}

impl From<bytecode::CompileError> for Error {
    fn from(error: bytecode::CompileError) -> Error {
        Error::CompileError(error)
    }
}

impl From<runtime::RuntimeError> for Error {
    fn from(error: runtime::RuntimeError) -> Error {
        Error::RuntimeError(error)
    }
}

/// Tokenizes and parses the given source code.
pub fn parse(input: &str) -> Result<ParsedProgram, Error> {
    let tokens = frontend::tokenize(input)?;
    Ok(frontend::parse(tokens)?)
}

/// Compiles the given source code to a bytecode stream.
pub fn compile_str(input: &str) -> Result<Vec<u8>, Error> {
    let program = parse(input)?;
    Ok(bytecode::compile(&program)?)
}

/// One stop shop to compile and interpret the given source code. Program
/// execution starts from the `main()` function.
///
/// Returns the integer returned by `main()`, or -1 when it returned no
/// value.
pub fn interpret(input: &str) -> Result<i32, Error> {
    let program = compile_str(input)?;
    match runtime::run(&program)? {
        Some(value) => Ok(value.as_int()?),
        None => Ok(-1),
    }
}
