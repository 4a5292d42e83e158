//! Nom-based tokenizer for the C-like source language.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::combinator::recognize;
use nom::sequence::pair;
use nom::IResult;
use crate::shared::compute_loc;
use crate::frontend::error::{LexError, LexErrorKind};

/// The kind of a lexed token.
///
/// Type keywords occupy a contiguous discriminant range so that membership
/// can be checked by range comparison, see [`TokenKind::is_type_keyword`].
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    None,

    Ident,

    Float,
    Integer,

    TypeVoid,
    TypeBool,
    TypeChar,
    TypeShort,
    TypeInt,
    TypeLong,
    TypeFloat,
    TypeDouble,
    Struct,
    Enum,

    Semicolon,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,

    If,
    Else,
    Do,
    While,
    For,
    Break,
    Continue,

    Const,
    Unsigned,
    Return,

    Assign,
    Not,
    Or,
    And,
    Xor,
    Less,
    Greater,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    Comma,
    Dot,

    Equals,
    NotEquals,
    OrAssign,
    AndAssign,
    XorAssign,

    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,

    Increment,
    Decrement,
}

impl TokenKind {
    pub const TYPES_BEGIN: TokenKind = TokenKind::TypeVoid;
    pub const TYPES_END: TokenKind = TokenKind::Enum;

    /// Whether this kind lies in the type-keyword range.
    pub fn is_type_keyword(self: Self) -> bool {
        self >= Self::TYPES_BEGIN && self <= Self::TYPES_END
    }
}

/// A single lexed token with its 1-based source location.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind    : TokenKind,
    pub line    : u32,
    pub col     : u32,
    pub lexeme  : String,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32, col: u32, lexeme: impl Into<String>) -> Self {
        Token { kind, line, col, lexeme: lexeme.into() }
    }
    /// The sentinel token terminating every token sequence.
    pub fn none() -> Self {
        Token::new(TokenKind::None, 0, 0, "")
    }
}

// identifier ([A-Za-z][A-Za-z0-9_]*)

fn word(i: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(i)
}

// numeric literal: a maximal run of digits and dots starting with a digit

fn numerical(i: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_digit()),
        take_while(|c: char| c.is_ascii_digit() || c == '.'),
    ))(i)
}

// operators and punctuation, two-character candidates first

fn operator(i: &str) -> IResult<&str, &str> {
    alt((
        alt((
            tag("=="), tag("!="), tag("|="), tag("&="), tag("^="),
            tag("+="), tag("-="), tag("*="), tag("/="),
            tag("++"), tag("--"), tag("||"), tag("&&"),
        )),
        alt((
            tag(";"), tag("("), tag(")"), tag("{"), tag("}"), tag("["), tag("]"),
            tag("="), tag("!"), tag("^"), tag("<"), tag(">"),
            tag("+"), tag("-"), tag("*"), tag("/"), tag("%"),
            tag(","), tag("."),
        )),
    ))(i)
}

/// Reclassifies an identifier that matches a keyword exactly.
fn keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "void" => TokenKind::TypeVoid,
        "bool" => TokenKind::TypeBool,
        "char" => TokenKind::TypeChar,
        "short" => TokenKind::TypeShort,
        "int" => TokenKind::TypeInt,
        "long" => TokenKind::TypeLong,
        "float" => TokenKind::TypeFloat,
        "double" => TokenKind::TypeDouble,
        "struct" => TokenKind::Struct,
        "enum" => TokenKind::Enum,
        "const" => TokenKind::Const,
        "unsigned" => TokenKind::Unsigned,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "do" => TokenKind::Do,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        _ => return None,
    })
}

/// Maps an operator/punctuation lexeme to its token kind.
fn symbol(lexeme: &str) -> Option<TokenKind> {
    Some(match lexeme {
        ";" => TokenKind::Semicolon,
        "(" => TokenKind::OpenParen,
        ")" => TokenKind::CloseParen,
        "{" => TokenKind::OpenBrace,
        "}" => TokenKind::CloseBrace,
        "[" => TokenKind::OpenBracket,
        "]" => TokenKind::CloseBracket,
        "=" => TokenKind::Assign,
        "!" => TokenKind::Not,
        "||" => TokenKind::Or,
        "&&" => TokenKind::And,
        "^" => TokenKind::Xor,
        "<" => TokenKind::Less,
        ">" => TokenKind::Greater,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "%" => TokenKind::Percent,
        "," => TokenKind::Comma,
        "." => TokenKind::Dot,
        "==" => TokenKind::Equals,
        "!=" => TokenKind::NotEquals,
        "|=" => TokenKind::OrAssign,
        "&=" => TokenKind::AndAssign,
        "^=" => TokenKind::XorAssign,
        "+=" => TokenKind::PlusAssign,
        "-=" => TokenKind::MinusAssign,
        "*=" => TokenKind::StarAssign,
        "/=" => TokenKind::SlashAssign,
        "++" => TokenKind::Increment,
        "--" => TokenKind::Decrement,
        _ => return None,
    })
}

/// Tokenizes the given source text.
///
/// The returned stream is terminated by a [`TokenKind::None`] sentinel.
pub fn tokenize(input: &str) -> Result<TokenStream, LexError> {
    let mut tokens = Vec::new();
    let mut remaining = input.trim_start();

    while !remaining.is_empty() {
        let offset = input.len() - remaining.len();
        let (line, col) = compute_loc(input, offset);
        let first = remaining.chars().next();

        if let Ok((rest, ident)) = word(remaining) {
            let kind = keyword(ident).unwrap_or(TokenKind::Ident);
            tokens.push(Token::new(kind, line, col, ident));
            remaining = rest;
        } else if matches!(first, Some(c) if c.is_ascii_digit()) {
            let (rest, literal) = numerical(remaining)
                .map_err(|_| LexError::new(LexErrorKind::MalformedNumber, line, col))?;
            let kind = match literal.matches('.').count() {
                0 => TokenKind::Integer,
                1 => TokenKind::Float,
                _ => return Err(LexError::new(LexErrorKind::MalformedNumber, line, col)),
            };
            tokens.push(Token::new(kind, line, col, literal));
            remaining = rest;
        } else if let Ok((rest, lexeme)) = operator(remaining) {
            match symbol(lexeme) {
                Some(kind) => tokens.push(Token::new(kind, line, col, lexeme)),
                None => return Err(LexError::new(LexErrorKind::UnexpectedCharacter(lexeme.chars().next().unwrap_or(' ')), line, col)),
            }
            remaining = rest;
        } else {
            return Err(LexError::new(LexErrorKind::UnexpectedCharacter(first.unwrap_or(' ')), line, col));
        }

        remaining = remaining.trim_start();
    }

    tokens.push(Token::none());
    Ok(TokenStream::new(tokens))
}

/// A cursor over the lexed token sequence.
///
/// Reads past the end keep yielding the sentinel token. `index`/`set_index`
/// allow the parser to snapshot and restore its position for bounded
/// lookahead.
#[derive(Debug)]
pub struct TokenStream {
    tokens  : Vec<Token>,
    index   : usize,
}

impl TokenStream {
    fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, index: 0 }
    }
    /// Returns the current token without consuming it.
    pub fn peek(self: &Self) -> &Token {
        &self.tokens[self.index]
    }
    /// Returns the current token and moves to the next one.
    pub fn advance(self: &mut Self) -> Token {
        let token = self.tokens[self.index].clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        token
    }
    /// Moves back one token.
    pub fn back(self: &mut Self) {
        if self.index > 0 {
            self.index -= 1;
        }
    }
    /// Returns the current cursor position.
    pub fn index(self: &Self) -> usize {
        self.index
    }
    /// Restores a cursor position previously obtained from `index`.
    pub fn set_index(self: &mut Self, index: usize) {
        self.index = index.min(self.tokens.len() - 1);
    }
    /// Returns the lexed tokens, including the trailing sentinel.
    pub fn tokens(self: &Self) -> &[Token] {
        &self.tokens
    }
}
