use std::fmt::{self, Display};

/// Represents the various possible runtime error-kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeErrorKind {
    TruncatedBytecode,
    UnknownOpcode(u8),
    StackUnderflow,
    VariantMismatch,
    InvalidSlot(u32),
    DivisionByZero,
    UnknownFunction(String),
    MissingMain,
}

/// An error reported by the runtime.
#[derive(Clone, Debug)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub(crate) fn new(kind: RuntimeErrorKind) -> RuntimeError {
        Self { kind }
    }
}

impl Display for RuntimeError {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RuntimeErrorKind::TruncatedBytecode => write!(f, "Bytecode ended in the middle of an instruction"),
            RuntimeErrorKind::UnknownOpcode(byte) => write!(f, "Unknown opcode 0x{:02x}", byte),
            RuntimeErrorKind::StackUnderflow => write!(f, "Operand stack underflow"),
            RuntimeErrorKind::VariantMismatch => write!(f, "Operand variant does not match instruction"),
            RuntimeErrorKind::InvalidSlot(slot) => write!(f, "Access to unwritten local slot #{}", slot),
            RuntimeErrorKind::DivisionByZero => write!(f, "Division by zero"),
            RuntimeErrorKind::UnknownFunction(signature) => write!(f, "Call to unknown function `{}`", signature),
            RuntimeErrorKind::MissingMain => write!(f, "Program has no `main()` function"),
        }
    }
}

pub type RuntimeResult<T = ()> = Result<T, RuntimeError>;
