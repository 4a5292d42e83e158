use minic::frontend::{tokenize, TokenKind};

#[test]
fn empty_input() {
    let stream = tokenize("").unwrap();
    assert_eq!(stream.tokens().len(), 1);
    assert_eq!(stream.peek().kind, TokenKind::None);
}

#[test]
fn keywords_and_identifiers() {
    let stream = tokenize("int intx return returns while whiled").unwrap();
    let kinds = stream.tokens().iter().map(|token| token.kind).collect::<Vec<_>>();
    assert_eq!(kinds, vec![
        TokenKind::TypeInt, TokenKind::Ident,
        TokenKind::Return, TokenKind::Ident,
        TokenKind::While, TokenKind::Ident,
        TokenKind::None,
    ]);
}

#[test]
fn type_keyword_range() {
    for (source, expected) in [ ("void", true), ("double", true), ("struct", true), ("enum", true), ("return", false), ("x", false) ] {
        let stream = tokenize(source).unwrap();
        assert_eq!(stream.peek().kind.is_type_keyword(), expected, "source: {}", source);
    }
}

#[test]
fn greedy_two_char_operators() {
    let stream = tokenize("== = ++ + += || |=").unwrap();
    let kinds = stream.tokens().iter().map(|token| token.kind).collect::<Vec<_>>();
    assert_eq!(kinds, vec![
        TokenKind::Equals, TokenKind::Assign,
        TokenKind::Increment, TokenKind::Plus, TokenKind::PlusAssign,
        TokenKind::Or, TokenKind::OrAssign,
        TokenKind::None,
    ]);
}

#[test]
fn adjacent_operators_match_greedily() {
    // `a+++b` lexes as `a ++ + b`
    let stream = tokenize("a+++b").unwrap();
    let kinds = stream.tokens().iter().map(|token| token.kind).collect::<Vec<_>>();
    assert_eq!(kinds, vec![
        TokenKind::Ident, TokenKind::Increment, TokenKind::Plus, TokenKind::Ident,
        TokenKind::None,
    ]);
}

#[test]
fn integer_and_float_literals() {
    let stream = tokenize("42 4.2 0.5").unwrap();
    let tokens = stream.tokens();
    assert_eq!(tokens[0].kind, TokenKind::Integer);
    assert_eq!(tokens[0].lexeme, "42");
    assert_eq!(tokens[1].kind, TokenKind::Float);
    assert_eq!(tokens[1].lexeme, "4.2");
    assert_eq!(tokens[2].kind, TokenKind::Float);
}

#[test]
fn two_dot_literal_fails() {
    let err = tokenize("int x;\nx = 1.2.3;").unwrap_err();
    assert_eq!(err.loc(), (2, 5));
}

#[test]
fn unexpected_character_fails() {
    assert!(tokenize("int x @ 1;").is_err());
}

#[test]
fn line_and_column_tracking() {
    let stream = tokenize("int x;\n  x = 1;").unwrap();
    let tokens = stream.tokens();
    assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
    assert_eq!((tokens[1].line, tokens[1].col), (1, 5));
    assert_eq!((tokens[2].line, tokens[2].col), (1, 6));
    assert_eq!((tokens[3].line, tokens[3].col), (2, 3));
    assert_eq!((tokens[4].line, tokens[4].col), (2, 5));
}

#[test]
fn cursor_back_and_set_index() {
    let mut stream = tokenize("a b c").unwrap();
    assert_eq!(stream.advance().lexeme, "a");
    let index = stream.index();
    assert_eq!(stream.advance().lexeme, "b");
    assert_eq!(stream.advance().lexeme, "c");
    stream.back();
    assert_eq!(stream.peek().lexeme, "c");
    stream.set_index(index);
    assert_eq!(stream.peek().lexeme, "b");
}

#[test]
fn reads_past_the_end_stay_on_the_sentinel() {
    let mut stream = tokenize("x").unwrap();
    stream.advance();
    assert_eq!(stream.advance().kind, TokenKind::None);
    assert_eq!(stream.advance().kind, TokenKind::None);
}

/// Concatenating all lexemes with a space re-lexes to an equivalent
/// sequence.
#[test]
fn lex_round_trip() {
    let sources = [
        "int main() { return 2 + 3 * 4; }",
        "int fib(int n){ if(n<2){ return n; } return fib(n-1)+fib(n-2); }",
        "float x; x = 3.5; int y; y = (int)(x*2.0);",
        "for(i=0;i<100;i=i+1){ if(i==7){ break; } }",
        "struct Point { int x; int y; };",
    ];
    for source in sources {
        let first = tokenize(source).unwrap();
        let spaced = first.tokens().iter().map(|token| token.lexeme.as_str()).collect::<Vec<_>>().join(" ");
        let second = tokenize(&spaced).unwrap();
        assert_eq!(first.tokens().len(), second.tokens().len(), "source: {}", source);
        for (a, b) in first.tokens().iter().zip(second.tokens().iter()) {
            assert_eq!(a.kind, b.kind, "source: {}", source);
            assert_eq!(a.lexeme, b.lexeme, "source: {}", source);
        }
    }
}
