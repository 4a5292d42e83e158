mod util;
use util::*;
use minic::bytecode::{disassembler, OpCode};

/// Programs exercising every control-flow shape the encoder emits.
const CORPUS: &[&str] = &[
    "int main(){ return 2+3*4; }",
    "int main(){ int i; i=0; while(i<10){ i=i+1; } return i; }",
    "int main(){ int i; int s; s=0; for(i=0;i<5;i=i+1){ s=s+i; } return s; }",
    "int fib(int n){ if(n<2){ return n; } return fib(n-1)+fib(n-2); } int main(){ return fib(10); }",
    "int main(){ float x; x=3.5; int y; y=(int)(x*2.0); return y; }",
    "int main(){ int i; for(i=0;i<100;i=i+1){ if(i==7){ break; } } return i; }",
    "int main(){ int i; i=0; int s; s=0; while(i<5){ i=i+1; if(i==3){ continue; } s=s+i; } return s; }",
    "int main(){ int t; t=0; int i; int j; for(i=0;i<3;++i){ for(j=0;j<9;++j){ if(j==2){ break; } t=t+1; } } return t; }",
    "int main(){ int x; x=1; if(x<2){ x=10; } else { x=20; } return x; }",
];

/// Collects the start offsets of every instruction, plus the stream end.
fn boundaries(bytes: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        positions.push(pos);
        pos = disassembler::instruction_end(bytes, pos).expect("well-formed instruction");
    }
    positions.push(bytes.len());
    positions
}

fn read_offset(bytes: &[u8], pos: usize) -> usize {
    u32::from_le_bytes([ bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3] ]) as usize
}

/// Every forward branch offset counts from the byte after the offset field
/// and must land on the first byte of a valid instruction.
#[test]
fn forward_offsets_land_on_instruction_boundaries() {
    for source in CORPUS {
        let bytes = compile(source);
        let bounds = boundaries(&bytes);
        for &pos in &bounds[..bounds.len() - 1] {
            let opcode = OpCode::from_u8(bytes[pos]).unwrap();
            if matches!(opcode, OpCode::If | OpCode::While | OpCode::For | OpCode::Skip) {
                let target = pos + 5 + read_offset(&bytes, pos + 1);
                assert!(bounds.contains(&target), "{}: {} at {} jumps into the middle of an instruction ({})", source, opcode.mnemonic(), pos, target);
            }
        }
    }
}

/// Every BACK lands on the first byte of an earlier instruction (the
/// recorded loop start).
#[test]
fn back_jumps_land_on_instruction_boundaries() {
    for source in CORPUS {
        let bytes = compile(source);
        let bounds = boundaries(&bytes);
        for &pos in &bounds[..bounds.len() - 1] {
            if OpCode::from_u8(bytes[pos]) == Some(OpCode::Back) {
                let offset = read_offset(&bytes, pos + 1);
                assert!(offset <= pos + 5, "{}: BACK at {} jumps before the stream start", source, pos);
                let target = pos + 5 - offset;
                assert!(target < pos, "{}: BACK at {} does not jump backwards", source, pos);
                assert!(bounds.contains(&target), "{}: BACK at {} lands inside an instruction ({})", source, pos, target);
            }
        }
    }
}

/// Within a function, slot indices form a contiguous prefix starting at 0.
#[test]
fn slots_are_a_contiguous_prefix_per_function() {
    fn assert_contiguous(slots: &[u32], source: &str) {
        if slots.is_empty() {
            return;
        }
        let max = *slots.iter().max().unwrap();
        for slot in 0..=max {
            assert!(slots.contains(&slot), "{}: slot {} missing from {:?}", source, slot, slots);
        }
    }
    for source in CORPUS {
        let bytes = compile(source);
        let bounds = boundaries(&bytes);
        let mut slots: Vec<u32> = Vec::new();
        for &pos in &bounds[..bounds.len() - 1] {
            match OpCode::from_u8(bytes[pos]).unwrap() {
                OpCode::Function => {
                    assert_contiguous(&slots, source);
                    slots.clear();
                }
                OpCode::ILoad | OpCode::FLoad | OpCode::IStore | OpCode::FStore | OpCode::Inc | OpCode::Dec => {
                    slots.push(read_offset(&bytes, pos + 1) as u32);
                }
                _ => {}
            }
        }
        assert_contiguous(&slots, source);
    }
}

/// The arithmetic opcode variant follows the evaluated type of the subtree.
#[test]
fn binary_opcode_variant_matches_evaluated_type() {
    let float_program = compile("int main(){ float x; x=2.5; float y; y=x*2.0; return (int)y; }");
    let listing = disassembler::disassemble(&float_program);
    assert!(listing.contains("FMUL"));
    assert!(!listing.contains("IMUL"));

    let int_program = compile("int main(){ return 2*3; }");
    let listing = disassembler::disassemble(&int_program);
    assert!(listing.contains("IMUL"));
    assert!(!listing.contains("FMUL"));
}

#[test]
fn preamble_lists_all_function_signatures() {
    let bytes = compile("int fib(int n){ if(n<2){ return n; } return fib(n-1)+fib(n-2); } int main(){ return fib(10); }");
    let vm = runtime::VM::load(&bytes).unwrap();
    assert_eq!(vm.manifest(), &[ "fib(int)".to_string(), "main()".to_string() ]);
}

#[test]
fn forward_declarations_appear_in_the_preamble_once() {
    let bytes = compile("int twice(int x); int main(){ return twice(2); } int twice(int x){ return x+x; }");
    let vm = runtime::VM::load(&bytes).unwrap();
    assert_eq!(vm.manifest(), &[ "twice(int)".to_string(), "main()".to_string() ]);
}

#[test]
fn disassembly_shows_calls_and_headers() {
    let bytes = compile("int fib(int n){ if(n<2){ return n; } return fib(n-1)+fib(n-2); } int main(){ return fib(10); }");
    let listing = disassembler::disassemble(&bytes);
    assert!(listing.contains("FUNCS_BEGIN fib(int) main() FUNCS_END"));
    assert!(listing.contains("FUNCTION fib(int)"));
    assert!(listing.contains("FUNCTIONCALL fib(int) 1"));
    assert!(listing.contains("ENDFUNC"));
}

#[test]
fn unknown_opcodes_are_reported_and_skipped() {
    let listing = disassembler::disassemble(&[ 0xaa, OpCode::Nop as u8 ]);
    assert!(listing.contains("?? 0xaa"));
    assert!(listing.contains("NOP"));
}

#[test]
fn uninitialized_declaration_binds_a_slot_without_code() {
    // `int i;` emits nothing, the first assignment stores into slot 0
    let bytes = compile("int main(){ int i; i=7; return i; }");
    let listing = disassembler::disassemble(&bytes);
    assert!(listing.contains("ISTORE #0"));
    assert!(listing.contains("ILOAD #0"));
}
