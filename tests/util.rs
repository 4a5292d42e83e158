pub use minic::{runtime, Value};

/// Compiles a bit of source code into a bytecode stream, panicking with the
/// error location on failure.
#[allow(dead_code)]
pub fn compile(code: &str) -> Vec<u8> {
    match minic::compile_str(code) {
        Ok(program) => program,
        Err(err) => match err.loc() {
            Some((line, col)) => panic!("{} in line {}, column {}.", err, line, col),
            None => panic!("{}", err),
        },
    }
}

/// Compiles and runs a bit of source code and returns the integer result of
/// its `main()`, or -1 when `main()` returned no value.
#[allow(dead_code)]
pub fn run(code: &str) -> i32 {
    let program = compile(code);
    match runtime::run(&program) {
        Ok(Some(Value::Int(value))) => value,
        Ok(Some(Value::Float(value))) => panic!("main() returned a float <{}>", value),
        Ok(None) => -1,
        Err(err) => panic!("{}", err),
    }
}
