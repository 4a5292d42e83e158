use crate::util::*;

#[test]
fn recursion() {
    let source = "
        int fib(int n){
            if(n < 2){ return n; }
            return fib(n-1) + fib(n-2);
        }
        int main(){ return fib(10); }
    ";
    assert_eq!(run(source), 55);
}

#[test]
fn argument_order() {
    assert_eq!(run("int sub(int a, int b){ return a - b; } int main(){ return sub(10, 4); }"), 6);
}

#[test]
fn three_arguments_land_in_declaration_order() {
    let source = "
        int pick(int a, int b, int c){ return a*100 + b*10 + c; }
        int main(){ return pick(1, 2, 3); }
    ";
    assert_eq!(run(source), 123);
}

#[test]
fn nested_calls() {
    let source = "
        int add(int a, int b){ return a + b; }
        int main(){ return add(add(1, 2), add(3, 4)); }
    ";
    assert_eq!(run(source), 10);
}

#[test]
fn forward_declaration() {
    let source = "
        int twice(int x);
        int main(){ return twice(5); }
        int twice(int x){ return x * 2; }
    ";
    assert_eq!(run(source), 10);
}

#[test]
fn implicit_argument_cast() {
    let source = "
        float half(float x){ return x / 2.0; }
        int main(){ return (int)half(9); }
    ";
    assert_eq!(run(source), 4);
}

#[test]
fn call_statement_discards_the_result() {
    let source = "
        int five(){ return 5; }
        int main(){ five(); five(); return 1; }
    ";
    assert_eq!(run(source), 1);
}

#[test]
fn void_function_call_statement() {
    assert_eq!(run("void noop(){ } int main(){ noop(); return 7; }"), 7);
}

#[test]
fn locals_are_per_call() {
    // each recursive call gets a fresh locals frame
    let source = "
        int count(int n){
            int local;
            local = n * 10;
            if(n < 1){ return local; }
            count(n - 1);
            return local;
        }
        int main(){ return count(3); }
    ";
    assert_eq!(run(source), 30);
}

#[test]
fn callee_sees_no_caller_variables() {
    // slot 0 holds different variables in main and in helper
    let source = "
        int helper(int x){ return x + 1; }
        int main(){ int a; a = 41; return helper(a) + a; }
    ";
    assert_eq!(run(source), 83);
}

#[test]
fn main_without_return_yields_no_value() {
    assert_eq!(run("int main(){ int x; x = 2; }"), -1);
}

#[test]
fn vm_state_after_run() {
    use minic::runtime::{VMState, VM};
    let program = compile("int main(){ return 3; }");
    let mut vm = VM::load(&program).unwrap();
    assert_eq!(vm.state(), VMState::Ready);
    assert_eq!(vm.run().unwrap(), Some(Value::Int(3)));
    assert_eq!(vm.state(), VMState::Returned);

    let program = compile("int main(){ int x; x = 1; }");
    let mut vm = VM::load(&program).unwrap();
    assert_eq!(vm.run().unwrap(), None);
    assert_eq!(vm.state(), VMState::Halted);
}
