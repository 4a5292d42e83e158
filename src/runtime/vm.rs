//! Loader and dispatch interpreter for the bytecode.

use std::collections::HashMap;
use std::rc::Rc;
use crate::bytecode::opcodes::OpCode;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
use crate::runtime::stack::{Frame, Stack, Value};

/// Current state of the vm.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum VMState {
    /// The program is loaded and ready to run.
    Ready,
    /// The program is being interpreted.
    Executing,
    /// `main()` returned a value.
    Returned,
    /// Execution ran off the end of `main()` without a return value.
    Halted,
}

/// Byte cursor over one function's instruction slice. The cursor, and with
/// it the program counter, is local to a single invocation.
struct Cursor<'a> {
    bytes   : &'a [u8],
    pc      : usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pc: 0 }
    }
    fn eof(self: &Self) -> bool {
        self.pc >= self.bytes.len()
    }
    fn peek(self: &Self) -> Option<u8> {
        self.bytes.get(self.pc).copied()
    }
    fn read_u8(self: &mut Self) -> RuntimeResult<u8> {
        let byte = self.peek().ok_or_else(|| RuntimeError::new(RuntimeErrorKind::TruncatedBytecode))?;
        self.pc += 1;
        Ok(byte)
    }
    fn read_u32(self: &mut Self) -> RuntimeResult<u32> {
        let payload = self.bytes.get(self.pc..self.pc + 4)
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::TruncatedBytecode))?;
        self.pc += 4;
        Ok(u32::from_le_bytes([ payload[0], payload[1], payload[2], payload[3] ]))
    }
    fn read_i32(self: &mut Self) -> RuntimeResult<i32> {
        Ok(self.read_u32()? as i32)
    }
    fn read_f32(self: &mut Self) -> RuntimeResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }
    /// Reads bytes up to the `\n` terminator.
    fn read_line(self: &mut Self) -> RuntimeResult<String> {
        let length = self.bytes[self.pc.min(self.bytes.len())..].iter()
            .position(|&byte| byte == b'\n')
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::TruncatedBytecode))?;
        let line = String::from_utf8_lossy(&self.bytes[self.pc..self.pc + length]).into_owned();
        self.pc += length + 1;
        Ok(line)
    }
    fn skip(self: &mut Self, offset: u32) {
        self.pc += offset as usize;
    }
    fn back(self: &mut Self, offset: u32) {
        let offset = offset as usize;
        if offset > self.pc {
            self.pc = 0;
        } else {
            self.pc -= offset;
        }
    }
}

/// A virtual machine interpreting loaded bytecode, starting at `main()`.
#[derive(Debug)]
pub struct VM {
    /// Instruction bytes per function, keyed by signature.
    functions   : HashMap<String, Rc<Vec<u8>>>,
    /// Function signatures listed in the preamble.
    manifest    : Vec<String>,
    /// Operand stack shared by all active calls.
    stack       : Stack,
    /// Locals frame per active call.
    frames      : Vec<Frame>,
    state       : VMState,
}

impl VM {
    const NO_FRAME: &'static str = "Attempted to access empty frame stack";

    /// Parses the byte stream into the signature manifest and per-function
    /// instruction slices. A function record ends at an `ENDFUNC` that is
    /// immediately followed by another `FUNCTION` opcode or the end of the
    /// stream.
    pub fn load(bytes: &[u8]) -> RuntimeResult<VM> {
        let mut cursor = Cursor::new(bytes);
        let mut functions = HashMap::new();
        let mut manifest = Vec::new();
        while !cursor.eof() {
            let byte = cursor.read_u8()?;
            match OpCode::from_u8(byte) {
                Some(OpCode::FuncsBegin) => {
                    while cursor.peek() != Some(OpCode::FuncsEnd as u8) {
                        manifest.push(cursor.read_line()?);
                    }
                    cursor.read_u8()?;
                }
                Some(OpCode::Function) => {
                    let signature = cursor.read_line()?;
                    let mut body = Vec::new();
                    loop {
                        if cursor.eof() {
                            break;
                        }
                        let byte = cursor.read_u8()?;
                        if byte == OpCode::EndFunc as u8 {
                            match cursor.peek() {
                                None => break,
                                Some(next) if next == OpCode::Function as u8 => break,
                                Some(_) => body.push(byte),
                            }
                        } else {
                            body.push(byte);
                        }
                    }
                    functions.insert(signature, Rc::new(body));
                }
                _ => {} // stray byte outside any function record
            }
        }
        Ok(VM {
            functions,
            manifest,
            stack   : Stack::new(),
            frames  : Vec::new(),
            state   : VMState::Ready,
        })
    }

    /// The function signatures listed in the preamble.
    pub fn manifest(self: &Self) -> &[String] {
        &self.manifest
    }

    /// Returns the current state of the vm.
    pub fn state(self: &Self) -> VMState {
        self.state
    }

    /// Executes the program from `main()` until it returns or runs off the
    /// end of its bytecode.
    pub fn run(self: &mut Self) -> RuntimeResult<Option<Value>> {
        if !self.functions.contains_key("main()") {
            return Err(RuntimeError::new(RuntimeErrorKind::MissingMain));
        }
        self.state = VMState::Executing;
        self.frames.push(Frame::new());
        let result = self.run_function("main()");
        self.state = match &result {
            Ok(Some(_)) => VMState::Returned,
            _ => VMState::Halted,
        };
        result
    }

    /// Runs the function with the given signature. The caller has pushed
    /// the locals frame and moved the arguments into it; the frame is
    /// discarded again on return.
    fn run_function(self: &mut Self, signature: &str) -> RuntimeResult<Option<Value>> {
        let code = self.functions.get(signature)
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UnknownFunction(signature.to_string())))?
            .clone();
        let result = self.exec(&code);
        self.frames.pop();
        result
    }

    /// Dispatch loop over one function's instruction slice.
    fn exec(self: &mut Self, code: &[u8]) -> RuntimeResult<Option<Value>> {
        let mut cursor = Cursor::new(code);
        while !cursor.eof() {
            let byte = cursor.read_u8()?;
            let opcode = OpCode::from_u8(byte)
                .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UnknownOpcode(byte)))?;
            match opcode {
                OpCode::Nop | OpCode::Else => {}
                OpCode::Skip => {
                    let offset = cursor.read_u32()?;
                    cursor.skip(offset);
                }
                OpCode::Back => {
                    let offset = cursor.read_u32()?;
                    cursor.back(offset);
                }
                OpCode::Pop => {
                    self.stack.pop()?;
                }
                OpCode::Dup => {
                    let value = self.stack.pop()?;
                    self.stack.push(value);
                    self.stack.push(value);
                }
                OpCode::IConst => {
                    let value = cursor.read_i32()?;
                    self.stack.push(Value::Int(value));
                }
                OpCode::FConst => {
                    let value = cursor.read_f32()?;
                    self.stack.push(Value::Float(value));
                }
                OpCode::ILoad | OpCode::FLoad => {
                    let slot = cursor.read_u32()?;
                    let value = self.frame().load(slot as usize)
                        .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidSlot(slot)))?;
                    self.stack.push(value);
                }
                OpCode::IStore | OpCode::FStore => {
                    let slot = cursor.read_u32()?;
                    let value = self.stack.pop()?;
                    self.frame_mut().store(slot as usize, value);
                }
                OpCode::IAdd => self.int_binop(|a, b| Ok(a.wrapping_add(b)))?,
                OpCode::ISub => self.int_binop(|a, b| Ok(a.wrapping_sub(b)))?,
                OpCode::IMul => self.int_binop(|a, b| Ok(a.wrapping_mul(b)))?,
                OpCode::IDiv => self.int_binop(|a, b| {
                    if b == 0 { Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero)) } else { Ok(a.wrapping_div(b)) }
                })?,
                OpCode::Mod => self.int_binop(|a, b| {
                    if b == 0 { Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero)) } else { Ok(a.wrapping_rem(b)) }
                })?,
                OpCode::FAdd => self.float_binop(|a, b| a + b)?,
                OpCode::FSub => self.float_binop(|a, b| a - b)?,
                OpCode::FMul => self.float_binop(|a, b| a * b)?,
                OpCode::FDiv => self.float_binop(|a, b| a / b)?,
                OpCode::ILe => self.int_compare(|a, b| a < b)?,
                OpCode::IGe => self.int_compare(|a, b| a > b)?,
                OpCode::IEq => self.int_compare(|a, b| a == b)?,
                OpCode::FLe => self.float_compare(|a, b| a < b)?,
                OpCode::FGe => self.float_compare(|a, b| a > b)?,
                OpCode::FEq => self.float_compare(|a, b| a == b)?,
                OpCode::Inc | OpCode::Dec => {
                    let slot = cursor.read_u32()?;
                    let value = self.frame().load(slot as usize)
                        .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidSlot(slot)))?
                        .as_int()?;
                    let stepped = if opcode == OpCode::Inc { value.wrapping_add(1) } else { value.wrapping_sub(1) };
                    self.frame_mut().store(slot as usize, Value::Int(stepped));
                }
                OpCode::Itof => {
                    let value = self.stack.pop()?.as_int()?;
                    self.stack.push(Value::Float(value as f32));
                }
                OpCode::Ftoi => {
                    let value = self.stack.pop()?.as_float()?;
                    self.stack.push(Value::Int(value as i32));
                }
                OpCode::If | OpCode::While | OpCode::For => {
                    let offset = cursor.read_u32()?;
                    let condition = self.stack.pop()?;
                    if !condition.is_truthy() {
                        cursor.skip(offset);
                    }
                }
                OpCode::IRet | OpCode::FRet => {
                    return Ok(Some(self.stack.pop()?));
                }
                OpCode::FunctionCall => {
                    let signature = cursor.read_line()?;
                    let argc = cursor.read_u32()?;
                    let mut frame = Frame::new();
                    // the first pop yields the last argument, fill slots back to front
                    for slot in (0..argc).rev() {
                        frame.store(slot as usize, self.stack.pop()?);
                    }
                    self.frames.push(frame);
                    if let Some(value) = self.run_function(&signature)? {
                        self.stack.push(value);
                    }
                }
                OpCode::Function | OpCode::FuncsBegin | OpCode::FuncsEnd | OpCode::EndFunc => {
                    // record framing opcodes end the active function body
                    break;
                }
                OpCode::None => {
                    return Err(RuntimeError::new(RuntimeErrorKind::UnknownOpcode(byte)));
                }
            }
        }
        Ok(None)
    }

    fn frame(self: &Self) -> &Frame {
        self.frames.last().expect(Self::NO_FRAME)
    }

    fn frame_mut(self: &mut Self) -> &mut Frame {
        self.frames.last_mut().expect(Self::NO_FRAME)
    }

    fn int_binop(self: &mut Self, op: impl Fn(i32, i32) -> RuntimeResult<i32>) -> RuntimeResult {
        let b = self.stack.pop()?.as_int()?;
        let a = self.stack.pop()?.as_int()?;
        self.stack.push(Value::Int(op(a, b)?));
        Ok(())
    }

    fn float_binop(self: &mut Self, op: impl Fn(f32, f32) -> f32) -> RuntimeResult {
        let b = self.stack.pop()?.as_float()?;
        let a = self.stack.pop()?.as_float()?;
        self.stack.push(Value::Float(op(a, b)));
        Ok(())
    }

    fn int_compare(self: &mut Self, op: impl Fn(i32, i32) -> bool) -> RuntimeResult {
        let b = self.stack.pop()?.as_int()?;
        let a = self.stack.pop()?.as_int()?;
        self.stack.push(Value::Int(op(a, b) as i32));
        Ok(())
    }

    fn float_compare(self: &mut Self, op: impl Fn(f32, f32) -> bool) -> RuntimeResult {
        let b = self.stack.pop()?.as_float()?;
        let a = self.stack.pop()?.as_float()?;
        self.stack.push(Value::Int(op(a, b) as i32));
        Ok(())
    }
}

/// Loads the given bytecode and interprets it from `main()`. Returns the
/// value returned by `main()`, or `None` when it ran off the end of its
/// bytecode without one.
pub fn run(bytes: &[u8]) -> RuntimeResult<Option<Value>> {
    let mut vm = VM::load(bytes)?;
    vm.run()
}
