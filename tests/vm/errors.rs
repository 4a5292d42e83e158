use crate::util::*;
use minic::bytecode::OpCode;
use minic::runtime::RuntimeErrorKind;

/// Hand-builds a stream containing a single `main()` with the given body.
fn stream_with_main(body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![ OpCode::FuncsBegin as u8 ];
    bytes.extend_from_slice(b"main()\n");
    bytes.push(OpCode::FuncsEnd as u8);
    bytes.push(OpCode::Function as u8);
    bytes.extend_from_slice(b"main()\n");
    bytes.extend_from_slice(body);
    bytes.push(OpCode::EndFunc as u8);
    bytes
}

fn run_err(bytes: &[u8]) -> RuntimeErrorKind {
    runtime::run(bytes).unwrap_err().kind
}

#[test]
fn missing_main() {
    let program = compile("int five(){ return 5; }");
    assert_eq!(run_err(&program), RuntimeErrorKind::MissingMain);
}

#[test]
fn unknown_opcode() {
    let bytes = stream_with_main(&[ 0xaa ]);
    assert_eq!(run_err(&bytes), RuntimeErrorKind::UnknownOpcode(0xaa));
}

#[test]
fn reserved_opcode_faults() {
    let bytes = stream_with_main(&[ OpCode::None as u8 ]);
    assert_eq!(run_err(&bytes), RuntimeErrorKind::UnknownOpcode(255));
}

#[test]
fn truncated_payload() {
    let bytes = stream_with_main(&[ OpCode::IConst as u8, 0x01 ]);
    assert_eq!(run_err(&bytes), RuntimeErrorKind::TruncatedBytecode);
}

#[test]
fn stack_underflow() {
    let bytes = stream_with_main(&[ OpCode::IRet as u8 ]);
    assert_eq!(run_err(&bytes), RuntimeErrorKind::StackUnderflow);
}

#[test]
fn unwritten_slot_read() {
    let bytes = stream_with_main(&[ OpCode::ILoad as u8, 3, 0, 0, 0 ]);
    assert_eq!(run_err(&bytes), RuntimeErrorKind::InvalidSlot(3));
}

#[test]
fn variant_mismatch_in_mixed_arithmetic() {
    // 1 + 1.5 promotes to double, so FADD pops an integer operand
    let program = compile("int main(){ return 1 + 1.5; }");
    assert_eq!(run_err(&program), RuntimeErrorKind::VariantMismatch);
}

#[test]
fn division_by_zero() {
    let program = compile("int main(){ return 1/0; }");
    assert_eq!(run_err(&program), RuntimeErrorKind::DivisionByZero);
    let program = compile("int main(){ return 1%0; }");
    assert_eq!(run_err(&program), RuntimeErrorKind::DivisionByZero);
}

#[test]
fn float_returned_from_main_is_an_error() {
    let result = minic::interpret("float main(){ return 1.5; }");
    assert!(matches!(result, Err(minic::Error::RuntimeError(_))));
}

#[test]
fn call_to_undefined_forward_declaration() {
    // parses and compiles, but the record never shows up in the stream
    let program = match minic::compile_str("int ghost(int x); int main(){ return ghost(1); }") {
        Ok(program) => program,
        Err(err) => panic!("{}", err),
    };
    assert_eq!(run_err(&program), RuntimeErrorKind::UnknownFunction("ghost(int)".to_string()));
}
