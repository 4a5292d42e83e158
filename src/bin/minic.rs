use std::{env, fs, process, time::Instant};
use minic::{bytecode, runtime, Error, Value};

/*
 * Batch driver: reads a source file (testcode.c by default), writes the
 * compiled bytecode to tmp.bin, prints the disassembly, re-reads the file
 * and interprets it, reporting the result and wall-clock time. The process
 * exit status is the interpreter result, or -1 when main() returned no
 * value.
 */

fn main() {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("testcode.c");

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to read {}: {}", path, err);
            process::exit(-1);
        }
    };

    let program = match minic::compile_str(&source) {
        Ok(program) => program,
        Err(err) => fail(&err),
    };
    if let Err(err) = fs::write("tmp.bin", &program) {
        eprintln!("Failed to write tmp.bin: {}", err);
        process::exit(-1);
    }

    let program = match fs::read("tmp.bin") {
        Ok(program) => program,
        Err(err) => {
            eprintln!("Failed to read tmp.bin: {}", err);
            process::exit(-1);
        }
    };
    print!("{}", bytecode::disassemble(&program));

    let start = Instant::now();
    let result = match runtime::run(&program) {
        Ok(result) => result,
        Err(err) => fail(&Error::from(err)),
    };
    let elapsed = start.elapsed().as_millis();
    let returned = match result {
        Some(Value::Int(value)) => value,
        Some(Value::Float(value)) => value as i32,
        None => -1,
    };
    println!("Interp returned: {} in {}ms", returned, elapsed);
    process::exit(returned);
}

fn fail(err: &Error) -> ! {
    match err.loc() {
        Some((line, col)) => eprintln!("{} in line {}, column {}.", err, line, col),
        None => eprintln!("{}", err),
    }
    process::exit(-1);
}
