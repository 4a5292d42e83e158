use crate::util::*;

#[test]
fn precedence() {
    assert_eq!(run("int main(){ return 2+3*4; }"), 14);
    assert_eq!(run("int main(){ return 2*3+4; }"), 10);
    assert_eq!(run("int main(){ return (2+3)*4; }"), 20);
}

#[test]
fn division_and_remainder() {
    assert_eq!(run("int main(){ return 7/2; }"), 3);
    assert_eq!(run("int main(){ return 17%5; }"), 2);
}

#[test]
fn comparisons_yield_zero_or_one() {
    assert_eq!(run("int main(){ return (1<2) + (2>1) + (2==2); }"), 3);
    assert_eq!(run("int main(){ return (2<1) + (1>2) + (1==2); }"), 0);
}

#[test]
fn comparison_drives_branches() {
    assert_eq!(run("int main(){ if(3 == 3){ return 1; } return 0; }"), 1);
    assert_eq!(run("int main(){ if(3 == 4){ return 1; } return 0; }"), 0);
}

#[test]
fn float_arithmetic() {
    assert_eq!(run("int main(){ float x; x = 1.5; float y; y = x + 2.5; return (int)y; }"), 4);
    assert_eq!(run("int main(){ float x; x = 10.0; float y; y = x / 4.0; return (int)y; }"), 2);
}

#[test]
fn float_comparison() {
    assert_eq!(run("int main(){ float x; x = 1.5; if(x < 2.0){ return 1; } return 0; }"), 1);
}

#[test]
fn prefix_increment_and_decrement() {
    assert_eq!(run("int main(){ int i; i = 5; ++i; ++i; --i; return i; }"), 6);
    assert_eq!(run("int main(){ int i; i = 3; --i; --i; --i; --i; return i; }"), -1);
}

#[test]
fn const_declaration_with_initializer() {
    assert_eq!(run("int main(){ const int x = 3; return x; }"), 3);
}

#[test]
fn variable_shadowing_uses_innermost_slot() {
    assert_eq!(run("int main(){ int x; x = 1; { int x; x = 9; } return x; }"), 1);
}

#[test]
fn negative_results() {
    assert_eq!(run("int main(){ return 3 - 10; }"), -7);
}
