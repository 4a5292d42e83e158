//! Opcode definitions. Implemented on Writer (emission), the disassembler
//! and the VM (dispatch).

/// Macro to implement the opcode enum with byte conversion and mnemonics.
macro_rules! impl_opcodes {
    ( $( $(#[$attr:meta])* $name:ident = $value:literal, $mnemonic:literal; )+ ) => {
        /// A single-byte bytecode instruction opcode.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum OpCode {
            $( $(#[$attr])* $name = $value, )+
        }
        impl OpCode {
            /// Returns the opcode for the given byte, if any.
            pub fn from_u8(byte: u8) -> Option<OpCode> {
                match byte {
                    $( b if b == $value => Some(OpCode::$name), )+
                    _ => None,
                }
            }
            /// Returns the mnemonic used in disassembly listings.
            pub fn mnemonic(self: Self) -> &'static str {
                match self {
                    $( OpCode::$name => $mnemonic, )+
                }
            }
        }
    };
}

impl_opcodes! {
    /// Does nothing.
    Nop = 0, "NOP";
    /// Moves the program counter forward by the u32 payload.
    Skip = 1, "SKIP";
    /// Moves the program counter backward by the u32 payload.
    Back = 2, "BACK";
    /// Pushes the i32 payload onto the operand stack.
    IConst = 3, "ICONST";
    /// Pushes the f32 payload onto the operand stack.
    FConst = 4, "FCONST";
    /// Pushes the integer local at the u32 slot payload.
    ILoad = 5, "ILOAD";
    /// Pushes the float local at the u32 slot payload.
    FLoad = 6, "FLOAD";
    /// Pops into the integer local at the u32 slot payload.
    IStore = 7, "ISTORE";
    /// Pops into the float local at the u32 slot payload.
    FStore = 8, "FSTORE";
    /// Discards the top of the operand stack.
    Pop = 9, "POP";
    /// Duplicates the top of the operand stack.
    Dup = 10, "DUP";
    IAdd = 11, "IADD";
    FAdd = 12, "FADD";
    ISub = 13, "ISUB";
    FSub = 14, "FSUB";
    IMul = 15, "IMUL";
    FMul = 16, "FMUL";
    IDiv = 17, "IDIV";
    FDiv = 18, "FDIV";
    /// Integer remainder.
    Mod = 19, "MOD";
    /// Integer less-than, pushes 0/1.
    ILe = 20, "ILE";
    /// Integer greater-than, pushes 0/1.
    IGe = 21, "IGE";
    /// Float less-than, pushes 0/1.
    FLe = 22, "FLE";
    /// Float greater-than, pushes 0/1.
    FGe = 23, "FGE";
    /// Integer equality, pushes 0/1.
    IEq = 24, "IEQ";
    /// Float equality, pushes 0/1.
    FEq = 25, "FEQ";
    /// Increments the integer local at the u32 slot payload.
    Inc = 26, "INC";
    /// Decrements the integer local at the u32 slot payload.
    Dec = 27, "DEC";
    /// Returns the popped top of stack to the caller.
    IRet = 28, "IRET";
    /// Reserved parallel return opcode for floats.
    FRet = 29, "FRET";
    /// Pops the condition; skips the u32 payload ahead when falsy.
    If = 30, "IF";
    /// Marker between then- and else-branch, no runtime effect.
    Else = 31, "ELSE";
    /// Pops the loop condition; skips the u32 payload ahead when falsy.
    While = 32, "WHILE";
    /// Pops the loop condition; skips the u32 payload ahead when falsy.
    For = 33, "FOR";
    /// Converts the top of stack from float to int.
    Ftoi = 34, "FTOI";
    /// Converts the top of stack from int to float.
    Itof = 35, "ITOF";
    /// Starts a function record: signature line, then the body.
    Function = 36, "FUNCTION";
    /// Calls the signature given in the payload line; u32 argument count follows.
    FunctionCall = 37, "FUNCTIONCALL";
    /// Starts the preamble listing all function signatures.
    FuncsBegin = 38, "FUNCS_BEGIN";
    /// Ends the preamble.
    FuncsEnd = 39, "FUNCS_END";
    /// Ends a function record.
    EndFunc = 40, "ENDFUNC";
    /// Reserved, must never appear in a valid stream.
    None = 255, "NONE";
}
