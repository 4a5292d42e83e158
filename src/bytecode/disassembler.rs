//! Bytecode disassembler. Produces one listing line per instruction,
//! prefixed with the byte offset. Doubles as a format-conformance check.

use crate::bytecode::opcodes::OpCode;

/// Disassembles the given bytecode stream into a listing. Unrecognized
/// opcodes are reported in-line and skipped; a truncated payload ends the
/// listing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut pos = 0;
    while pos < bytes.len() {
        match describe_instruction(bytes, pos) {
            Some((description, next)) => {
                out.push_str(&format!("{:>5}  {}\n", pos, description));
                pos = next;
            }
            None => {
                out.push_str(&format!("{:>5}  <truncated>\n", pos));
                break;
            }
        }
    }
    out
}

/// Describes the instruction at the given position and returns the position
/// of the next one. Returns `None` when the payload is truncated.
pub fn describe_instruction(bytes: &[u8], pos: usize) -> Option<(String, usize)> {
    let byte = *bytes.get(pos)?;
    let mut next = pos + 1;
    let opcode = match OpCode::from_u8(byte) {
        Some(opcode) => opcode,
        None => return Some((format!("?? 0x{:02x}", byte), next)),
    };
    let description = match opcode {
        OpCode::Skip | OpCode::Back | OpCode::If | OpCode::While | OpCode::For => {
            let (offset, end) = read_u32(bytes, next)?;
            next = end;
            format!("{} {}", opcode.mnemonic(), offset)
        }
        OpCode::IConst => {
            let (value, end) = read_u32(bytes, next)?;
            next = end;
            format!("{} {}", opcode.mnemonic(), value as i32)
        }
        OpCode::FConst => {
            let (value, end) = read_u32(bytes, next)?;
            next = end;
            format!("{} {}", opcode.mnemonic(), f32::from_bits(value))
        }
        OpCode::ILoad | OpCode::FLoad | OpCode::IStore | OpCode::FStore | OpCode::Inc | OpCode::Dec => {
            let (slot, end) = read_u32(bytes, next)?;
            next = end;
            format!("{} #{}", opcode.mnemonic(), slot)
        }
        OpCode::Function => {
            let (signature, end) = read_line(bytes, next)?;
            next = end;
            format!("{} {}", opcode.mnemonic(), signature)
        }
        OpCode::FunctionCall => {
            let (signature, end) = read_line(bytes, next)?;
            let (argc, end) = read_u32(bytes, end)?;
            next = end;
            format!("{} {} {}", opcode.mnemonic(), signature, argc)
        }
        OpCode::FuncsBegin => {
            // the preamble's signature lines are data, consume through FUNCS_END
            let mut signatures = Vec::new();
            while bytes.get(next) != Some(&(OpCode::FuncsEnd as u8)) {
                let (signature, end) = read_line(bytes, next)?;
                signatures.push(signature);
                next = end;
            }
            next += 1;
            format!("{} {} {}", opcode.mnemonic(), signatures.join(" "), OpCode::FuncsEnd.mnemonic())
        }
        _ => opcode.mnemonic().to_string(),
    };
    Some((description, next))
}

/// Returns the end position of the instruction at the given position, if it
/// is well-formed.
pub fn instruction_end(bytes: &[u8], pos: usize) -> Option<usize> {
    describe_instruction(bytes, pos).map(|(_, next)| next)
}

fn read_u32(bytes: &[u8], pos: usize) -> Option<(u32, usize)> {
    let payload = bytes.get(pos..pos + 4)?;
    Some((u32::from_le_bytes([ payload[0], payload[1], payload[2], payload[3] ]), pos + 4))
}

fn read_line(bytes: &[u8], pos: usize) -> Option<(String, usize)> {
    let end = bytes[pos..].iter().position(|&byte| byte == b'\n')? + pos;
    Some((String::from_utf8_lossy(&bytes[pos..end]).into_owned(), end + 1))
}
