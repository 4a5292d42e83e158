use crate::util::*;

#[test]
fn float_to_int_cast() {
    assert_eq!(run("int main(){ float x; x = 3.5; int y; y = (int)(x*2.0); return y; }"), 7);
}

#[test]
fn float_to_int_truncates() {
    assert_eq!(run("int main(){ return (int)3.9; }"), 3);
}

#[test]
fn int_to_float_and_back() {
    assert_eq!(run("int main(){ float x; x = (float)7; return (int)x; }"), 7);
}

#[test]
fn same_category_cast_emits_no_conversion() {
    assert_eq!(run("int main(){ return (long)5; }"), 5);
    assert_eq!(run("int main(){ return (char)65; }"), 65);
}

#[test]
fn cast_applies_to_the_whole_following_expression() {
    // the cast wraps the full expression, not just the next primary
    assert_eq!(run("int main(){ return (int)2.5 * 2.0; }"), 5);
}

#[test]
fn sizeof_primitives() {
    assert_eq!(run("int main(){ return sizeof(int); }"), 4);
    assert_eq!(run("int main(){ return sizeof(int) + sizeof(char) + sizeof(double); }"), 13);
}

#[test]
fn sizeof_struct() {
    let source = "
        struct Point { int x; int y; };
        int main(){ return sizeof(Point); }
    ";
    assert_eq!(run(source), 8);
}

#[test]
fn sizeof_in_arithmetic() {
    assert_eq!(run("int main(){ return sizeof(long) * 2 + 1; }"), 17);
}
