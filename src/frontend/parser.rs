//! Token-level parser. Builds the AST and the scope tables, resolving
//! identifiers and inserting implicit numeric casts as it goes.

use crate::shared::typed_ids::{ScopeId, TypeId, FuncId};
use crate::frontend::ast::*;
use crate::frontend::error::{ParseError, ParseErrorKind, ParseResult};
use crate::frontend::lexer::{Token, TokenKind, TokenStream};
use crate::frontend::scopes::Scopes;
use crate::frontend::types::{Function, Member, Modifiers, Type, TypeKind, Variable};

/// Parsed program: top-level statements plus the scope tables they refer to.
#[derive(Debug)]
pub struct ParsedProgram {
    pub scopes      : Scopes,
    pub statements  : Vec<Statement>,
}

/// Parses the given token stream into a program.
pub fn parse(tokens: TokenStream) -> Result<ParsedProgram, ParseError> {
    Parser::new(tokens).parse_program()
}

/// Binary operator precedence. Higher binds tighter, 0 terminates the climb.
fn precedence(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 3,
        TokenKind::Plus | TokenKind::Minus => 2,
        TokenKind::Less | TokenKind::Greater | TokenKind::Equals => 1,
        _ => 0,
    }
}

struct Parser {
    tokens  : TokenStream,
    scopes  : Scopes,
    current : ScopeId,
}

impl Parser {

    fn new(tokens: TokenStream) -> Self {
        Parser {
            tokens,
            scopes  : Scopes::new(),
            current : ScopeId::ROOT,
        }
    }

    /// Parses the token stream to completion. Only type definitions and
    /// function declarations are allowed at the top level.
    fn parse_program(mut self: Self) -> Result<ParsedProgram, ParseError> {
        let mut statements = Vec::new();
        while self.tokens.peek().kind != TokenKind::None {
            if self.tokens.peek().kind == TokenKind::Struct {
                self.parse_struct_def()?;
                continue;
            }
            statements.push(self.parse_func()?);
        }
        Ok(ParsedProgram { scopes: self.scopes, statements })
    }

    /// Consumes the current token, failing unless it has the expected kind.
    fn expect(self: &mut Self, kind: TokenKind) -> ParseResult<Token> {
        let token = self.tokens.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(Self::unexpected(&token))
        }
    }

    fn unexpected(token: &Token) -> ParseError {
        let found = if token.kind == TokenKind::None { "end of input".to_string() } else { token.lexeme.clone() };
        ParseError::new(ParseErrorKind::UnexpectedToken(found), token)
    }

    /// Resolves a type-naming token (type keyword or identifier) to a type id.
    fn find_type(self: &Self, token: &Token) -> ParseResult<TypeId> {
        if token.kind.is_type_keyword() || token.kind == TokenKind::Ident {
            self.scopes.lookup_type(self.current, &token.lexeme)
                .ok_or_else(|| ParseError::new(ParseErrorKind::UnresolvedType(token.lexeme.clone()), token))
        } else {
            Err(Self::unexpected(token))
        }
    }

    /// Evaluates the type of an expression, failing if it cannot be typed.
    fn eval_type(self: &Self, expr: &Expression, at: &Token) -> ParseResult<TypeId> {
        self.scopes.eval_type(expr, self.current)
            .ok_or_else(|| ParseError::new(ParseErrorKind::UntypedExpression, at))
    }

    /// Fails unless the given identifier resolves to a visible variable.
    fn check_var(self: &Self, name: &Token) -> ParseResult {
        if self.scopes.lookup_var(self.current, &name.lexeme).is_none() {
            Err(ParseError::new(ParseErrorKind::UnresolvedIdentifier(name.lexeme.clone()), name))
        } else {
            Ok(())
        }
    }

    // expressions

    /// Pratt expression parsing: parse a primary, then while the next
    /// operator binds at least as tightly as the threshold, consume it and
    /// recurse at its precedence.
    fn parse_expr(self: &mut Self, threshold: u8) -> ParseResult<Expression> {
        let mut left = self.parse_primary()?;
        loop {
            let next = precedence(self.tokens.peek().kind);
            if next == 0 || next < threshold {
                break;
            }
            let op = self.tokens.advance();
            let right = self.parse_expr(next)?;
            left = Expression::Binary(Box::new(Binary { op, lhs: left, rhs: right }));
        }
        Ok(left)
    }

    fn parse_primary(self: &mut Self) -> ParseResult<Expression> {
        match self.tokens.peek().kind {
            TokenKind::Integer | TokenKind::Float => {
                Ok(Expression::Value(Value { val: self.tokens.advance() }))
            }
            TokenKind::Increment | TokenKind::Decrement => {
                let op = self.tokens.advance();
                let ident = self.expect(TokenKind::Ident)?;
                self.check_var(&ident)?;
                Ok(Expression::Unary(Box::new(Unary { op, expr: Value { val: ident } })))
            }
            TokenKind::Ident => {
                let name = self.tokens.advance();
                if self.tokens.peek().kind == TokenKind::OpenParen {
                    self.tokens.advance();
                    self.parse_call(name)
                } else {
                    self.check_var(&name)?;
                    Ok(Expression::Value(Value { val: name }))
                }
            }
            TokenKind::OpenParen => {
                self.tokens.advance();
                let next = self.tokens.peek();
                let is_cast = next.kind.is_type_keyword()
                    || (next.kind == TokenKind::Ident && self.scopes.lookup_type(self.current, &next.lexeme).is_some());
                if is_cast {
                    self.parse_cast()
                } else {
                    let expr = self.parse_expr(0)?;
                    self.expect(TokenKind::CloseParen)?;
                    Ok(expr)
                }
            }
            _ => Err(Self::unexpected(self.tokens.peek())),
        }
    }

    /// Parses `(type) expr` after the opening parenthesis was consumed.
    fn parse_cast(self: &mut Self) -> ParseResult<Expression> {
        if matches!(self.tokens.peek().kind, TokenKind::Struct | TokenKind::Enum) {
            self.tokens.advance();
        }
        let type_token = self.tokens.advance();
        let dest = self.find_type(&type_token)?;
        self.expect(TokenKind::CloseParen)?;
        let expr = self.parse_expr(0)?;
        let orig = self.eval_type(&expr, &type_token)?;
        Ok(Expression::Cast(Box::new(Cast { orig, dest, expr })))
    }

    /// Parses a call's argument list after `name(` was consumed, resolves
    /// the callee, checks arity and wraps implicitly convertible arguments
    /// of differing type in cast nodes.
    fn parse_call(self: &mut Self, name: Token) -> ParseResult<Expression> {
        if name.lexeme == "sizeof" {
            return self.parse_sizeof(name);
        }
        let mut args = Vec::new();
        if self.tokens.peek().kind == TokenKind::CloseParen {
            self.tokens.advance();
        } else {
            loop {
                args.push(self.parse_expr(0)?);
                if self.tokens.peek().kind == TokenKind::Comma {
                    self.tokens.advance();
                    continue;
                }
                self.expect(TokenKind::CloseParen)?;
                break;
            }
        }
        let func_id = self.scopes.lookup_func(self.current, &name.lexeme)
            .ok_or_else(|| ParseError::new(ParseErrorKind::UnresolvedFunction(name.lexeme.clone()), &name))?;
        let param_types = self.scopes.func_ref(func_id).params.iter().map(|param| param.ty).collect::<Vec<_>>();
        if param_types.len() != args.len() {
            return Err(ParseError::new(ParseErrorKind::ArityMismatch(name.lexeme.clone()), &name));
        }
        let mut cast_args = Vec::with_capacity(args.len());
        for (arg, dest) in args.into_iter().zip(param_types.into_iter()) {
            let orig = self.eval_type(&arg, &name)?;
            if orig == dest {
                cast_args.push(arg);
                continue;
            }
            if self.scopes.type_ref(orig).is_struct() || self.scopes.type_ref(dest).is_struct() {
                return Err(ParseError::new(ParseErrorKind::IllegalConversion(
                    self.scopes.type_ref(orig).name.lexeme.clone(),
                    self.scopes.type_ref(dest).name.lexeme.clone(),
                ), &name));
            }
            cast_args.push(Expression::Cast(Box::new(Cast { orig, dest, expr: arg })));
        }
        Ok(Expression::FuncCall(FuncCall { func: name, args: cast_args }))
    }

    /// `sizeof(T)` is a compile-time integer literal equal to `T`'s size.
    fn parse_sizeof(self: &mut Self, name: Token) -> ParseResult<Expression> {
        if matches!(self.tokens.peek().kind, TokenKind::Struct | TokenKind::Enum) {
            self.tokens.advance();
        }
        let type_token = self.tokens.advance();
        let ty = self.find_type(&type_token)?;
        self.expect(TokenKind::CloseParen)?;
        let size = self.scopes.type_ref(ty).size;
        Ok(Expression::Value(Value {
            val: Token::new(TokenKind::Integer, name.line, name.col, size.to_string()),
        }))
    }

    // statements

    fn parse_stmt(self: &mut Self) -> ParseResult<Statement> {
        while self.tokens.peek().kind == TokenKind::Struct {
            self.parse_struct_def()?;
        }
        let peeked = self.tokens.peek();
        match peeked.kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::OpenBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                self.tokens.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.tokens.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Continue)
            }
            TokenKind::Increment | TokenKind::Decrement => {
                let stmt = self.parse_step_stmt()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(stmt)
            }
            TokenKind::Const => Ok(Statement::VarDecl(self.parse_var_decl(false)?)),
            kind if kind.is_type_keyword() => Ok(Statement::VarDecl(self.parse_var_decl(false)?)),
            TokenKind::Ident if self.scopes.lookup_type(self.current, &peeked.lexeme).is_some() => {
                Ok(Statement::VarDecl(self.parse_var_decl(false)?))
            }
            TokenKind::Ident => {
                // snapshot, look one token ahead to tell a call from an assignment
                let index = self.tokens.index();
                self.tokens.advance();
                let next = self.tokens.peek().kind;
                self.tokens.set_index(index);
                if next == TokenKind::OpenParen {
                    let expr = self.parse_primary()?;
                    self.expect(TokenKind::Semicolon)?;
                    Ok(Statement::ExprStmt(ExprStmt { expr }))
                } else {
                    Ok(Statement::VarAssign(self.parse_var_assign(true)?))
                }
            }
            _ => Err(Self::unexpected(peeked)),
        }
    }

    /// Parses a prefix `++`/`--` in statement position.
    fn parse_step_stmt(self: &mut Self) -> ParseResult<Statement> {
        let op = self.tokens.advance();
        let ident = self.expect(TokenKind::Ident)?;
        self.check_var(&ident)?;
        Ok(Statement::ExprStmt(ExprStmt {
            expr: Expression::Unary(Box::new(Unary { op, expr: Value { val: ident } })),
        }))
    }

    /// Parses a variable declaration. Parameters take no initializer and no
    /// semicolon and are registered by the caller into the function scope.
    fn parse_var_decl(self: &mut Self, is_param: bool) -> ParseResult<VarDecl> {
        let mut mods = Modifiers::none();
        if self.tokens.peek().kind == TokenKind::Const {
            self.tokens.advance();
            mods.add(Modifiers::CONST);
        }
        let type_token = self.tokens.advance();
        let ty = self.find_type(&type_token)?;
        let name = self.expect(TokenKind::Ident)?;
        if !is_param && self.scopes.local_var(self.current, &name.lexeme).is_some() {
            return Err(ParseError::new(ParseErrorKind::Redeclaration(name.lexeme.clone()), &name));
        }
        let mut init = None;
        if !is_param {
            if self.tokens.peek().kind == TokenKind::Assign {
                self.tokens.advance();
                init = Some(self.parse_expr(0)?);
            }
            self.expect(TokenKind::Semicolon)?;
        }
        let mut var = Variable::new(ty, name);
        var.mods = mods;
        if !is_param {
            self.scopes.insert_var(self.current, var.clone());
        }
        Ok(VarDecl { var, init })
    }

    fn parse_var_assign(self: &mut Self, check_semicolon: bool) -> ParseResult<VarAssign> {
        let name = self.expect(TokenKind::Ident)?;
        self.check_var(&name)?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr(0)?;
        if check_semicolon {
            self.expect(TokenKind::Semicolon)?;
        }
        Ok(VarAssign { name, value })
    }

    fn parse_return(self: &mut Self) -> ParseResult<Statement> {
        self.expect(TokenKind::Return)?;
        let expr = self.parse_expr(0)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::Return(Return { expr }))
    }

    /// Parses a braced statement list in a fresh child scope.
    fn parse_block(self: &mut Self) -> ParseResult<Block> {
        self.expect(TokenKind::OpenBrace)?;
        let parent = self.current;
        self.current = self.scopes.create_scope(parent);
        let mut statements = Vec::new();
        while !matches!(self.tokens.peek().kind, TokenKind::CloseBrace | TokenKind::None) {
            statements.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::CloseBrace)?;
        self.current = parent;
        Ok(Block { statements })
    }

    /// Parses a loop or branch body: either a block or a single statement.
    fn parse_branch_body(self: &mut Self) -> ParseResult<Statement> {
        if self.tokens.peek().kind == TokenKind::OpenBrace {
            Ok(Statement::Block(self.parse_block()?))
        } else {
            self.parse_stmt()
        }
    }

    fn parse_if(self: &mut Self) -> ParseResult<Statement> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expr(0)?;
        self.expect(TokenKind::CloseParen)?;
        let then_branch = Box::new(self.parse_branch_body()?);
        let else_branch = if self.tokens.peek().kind == TokenKind::Else {
            self.tokens.advance();
            Some(Box::new(self.parse_branch_body()?))
        } else {
            None
        };
        Ok(Statement::If(If { cond, then_branch, else_branch }))
    }

    fn parse_while(self: &mut Self) -> ParseResult<Statement> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expr(0)?;
        self.expect(TokenKind::CloseParen)?;
        let body = Box::new(self.parse_branch_body()?);
        Ok(Statement::While(While { cond, body }))
    }

    /// Parses a for loop. The header gets its own scope so that a variable
    /// declared in the initializer stays local to the loop.
    fn parse_for(self: &mut Self) -> ParseResult<Statement> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::OpenParen)?;
        let parent = self.current;
        self.current = self.scopes.create_scope(parent);
        let initial = if self.tokens.peek().kind == TokenKind::Semicolon {
            self.tokens.advance();
            None
        } else {
            Some(self.parse_for_init()?)
        };
        let cond = self.parse_expr(0)?;
        self.expect(TokenKind::Semicolon)?;
        let post_loop = if self.tokens.peek().kind == TokenKind::CloseParen {
            None
        } else {
            Some(self.parse_for_post()?)
        };
        self.expect(TokenKind::CloseParen)?;
        let body = self.parse_branch_body()?;
        self.current = parent;
        Ok(Statement::For(Box::new(For { initial, cond, post_loop, body })))
    }

    fn parse_for_init(self: &mut Self) -> ParseResult<Statement> {
        let peeked = self.tokens.peek();
        if peeked.kind.is_type_keyword()
            || (peeked.kind == TokenKind::Ident && self.scopes.lookup_type(self.current, &peeked.lexeme).is_some()) {
            Ok(Statement::VarDecl(self.parse_var_decl(false)?))
        } else if peeked.kind == TokenKind::Ident {
            Ok(Statement::VarAssign(self.parse_var_assign(true)?))
        } else {
            Err(Self::unexpected(peeked))
        }
    }

    fn parse_for_post(self: &mut Self) -> ParseResult<Statement> {
        match self.tokens.peek().kind {
            TokenKind::Increment | TokenKind::Decrement => self.parse_step_stmt(),
            TokenKind::Ident => Ok(Statement::VarAssign(self.parse_var_assign(false)?)),
            _ => Err(Self::unexpected(self.tokens.peek())),
        }
    }

    /// Parses a function declaration: forward declaration (`;`) or
    /// definition with a body. The body gets one child scope which also
    /// holds the parameters.
    fn parse_func(self: &mut Self) -> ParseResult<Statement> {
        let ret_token = self.tokens.advance();
        let ret = self.find_type(&ret_token)?;
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::OpenParen)?;
        let mut params = Vec::new();
        if self.tokens.peek().kind != TokenKind::CloseParen {
            loop {
                let decl = self.parse_var_decl(true)?;
                params.push(decl.var);
                if self.tokens.peek().kind == TokenKind::Comma {
                    self.tokens.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;

        let existing = self.scopes.lookup_func(self.current, &name.lexeme);
        if self.tokens.peek().kind == TokenKind::Semicolon {
            self.tokens.advance();
            if existing.is_some() {
                return Err(ParseError::new(ParseErrorKind::Redeclaration(name.lexeme.clone()), &name));
            }
            let func_id = self.scopes.insert_func(self.current, Function { defined: false, ret, name, params });
            return Ok(Statement::FuncDecl(FuncDecl { func: func_id, body: None }));
        }

        let func_id = self.declare_func(existing, &name, ret, &params)?;
        self.expect(TokenKind::OpenBrace)?;
        let parent = self.current;
        self.current = self.scopes.create_scope(parent);
        for param in &params {
            if self.scopes.local_var(self.current, &param.name.lexeme).is_some() {
                return Err(ParseError::new(ParseErrorKind::Redeclaration(param.name.lexeme.clone()), &param.name));
            }
            self.scopes.insert_var(self.current, param.clone());
        }
        let mut body = Vec::new();
        while !matches!(self.tokens.peek().kind, TokenKind::CloseBrace | TokenKind::None) {
            body.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::CloseBrace)?;
        self.current = parent;
        self.scopes.func_mut(func_id).defined = true;
        Ok(Statement::FuncDecl(FuncDecl { func: func_id, body: Some(body) }))
    }

    /// Registers a function about to be defined, checking any earlier
    /// forward declaration for signature agreement.
    fn declare_func(self: &mut Self, existing: Option<FuncId>, name: &Token, ret: TypeId, params: &[Variable]) -> ParseResult<FuncId> {
        match existing {
            Some(func_id) => {
                let func = self.scopes.func_ref(func_id);
                let matches = !func.defined
                    && func.ret == ret
                    && func.params.len() == params.len()
                    && func.params.iter().zip(params.iter()).all(|(a, b)| a.ty == b.ty);
                if matches {
                    Ok(func_id)
                } else {
                    Err(ParseError::new(ParseErrorKind::Redeclaration(name.lexeme.clone()), name))
                }
            }
            None => Ok(self.scopes.insert_func(self.current, Function {
                defined : false,
                ret,
                name    : name.clone(),
                params  : params.to_vec(),
            })),
        }
    }

    /// Parses a struct definition or forward declaration into the type table.
    fn parse_struct_def(self: &mut Self) -> ParseResult {
        self.expect(TokenKind::Struct)?;
        let name = self.expect(TokenKind::Ident)?;
        let existing = self.scopes.local_type(self.current, &name.lexeme);
        if self.tokens.peek().kind == TokenKind::Semicolon {
            self.tokens.advance();
            if existing.is_none() {
                self.scopes.insert_type(self.current, Type {
                    name,
                    size    : 0,
                    align   : 0,
                    kind    : TypeKind::Struct { defined: false, members: Vec::new() },
                });
            }
            return Ok(());
        }
        self.expect(TokenKind::OpenBrace)?;
        let mut members = Vec::new();
        let mut size = 0;
        while self.tokens.peek().kind != TokenKind::CloseBrace {
            let type_token = self.tokens.advance();
            let ty = self.find_type(&type_token)?;
            let member_name = self.expect(TokenKind::Ident)?;
            self.expect(TokenKind::Semicolon)?;
            let (member_size, member_align) = {
                let member_type = self.scopes.type_ref(ty);
                (member_type.size, member_type.align)
            };
            let mut offset = size;
            if member_align > 0 {
                offset += offset % member_align;
            }
            members.push(Member { var: Variable::new(ty, member_name), offset });
            size = offset + member_size;
        }
        self.expect(TokenKind::CloseBrace)?;
        self.expect(TokenKind::Semicolon)?;
        let mut align = size;
        if align % 2 == 1 || align > 8 {
            align = if align > 8 { 8 } else { align + 1 };
        }
        let ty = Type { name: name.clone(), size, align, kind: TypeKind::Struct { defined: true, members } };
        match existing {
            Some(type_id) => {
                if matches!(self.scopes.type_ref(type_id).kind, TypeKind::Struct { defined: true, .. }) {
                    return Err(ParseError::new(ParseErrorKind::Redeclaration(name.lexeme.clone()), &name));
                }
                *self.scopes.type_mut(type_id) = ty;
            }
            None => {
                self.scopes.insert_type(self.current, ty);
            }
        }
        Ok(())
    }
}
