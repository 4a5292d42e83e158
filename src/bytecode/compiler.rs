//! Bytecode compiler. Walks the AST and emits the instruction stream,
//! back-patching forward jump offsets as targets become known.

use std::collections::HashMap;
use std::fmt::{self, Display};
use crate::shared::typed_ids::{ScopeId, TypeId};
use crate::frontend::ast::*;
use crate::frontend::lexer::{Token, TokenKind};
use crate::frontend::parser::ParsedProgram;
use crate::frontend::scopes::Scopes;
use crate::bytecode::opcodes::OpCode;
use crate::bytecode::writer::Writer;

/// Represents the various possible compiler error-kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum CompileErrorKind {
    UnresolvedVariable(String),
    UnresolvedFunction(String),
    UntypedExpression,
    UnsupportedOperator(String),
    MalformedLiteral(String),
    BreakOutsideLoop,
    ContinueOutsideLoop,
}

/// An error reported by the bytecode compiler.
#[derive(Clone, Debug)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    line: u32,
    col: u32,
}

impl CompileError {
    fn new(kind: CompileErrorKind, token: &Token) -> CompileError {
        Self { kind, line: token.line, col: token.col }
    }
    fn bare(kind: CompileErrorKind) -> CompileError {
        Self { kind, line: 0, col: 0 }
    }
    /// 1-based line/column number of the offending construct, (0, 0) when
    /// no source token maps to it.
    pub fn loc(self: &Self) -> (u32, u32) {
        (self.line, self.col)
    }
}

impl Display for CompileError {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CompileErrorKind::UnresolvedVariable(name) => write!(f, "Unresolved variable `{}`", name),
            CompileErrorKind::UnresolvedFunction(name) => write!(f, "Unresolved function `{}`", name),
            CompileErrorKind::UntypedExpression => write!(f, "Expression has no type"),
            CompileErrorKind::UnsupportedOperator(op) => write!(f, "Unsupported operator `{}`", op),
            CompileErrorKind::MalformedLiteral(lit) => write!(f, "Malformed literal `{}`", lit),
            CompileErrorKind::BreakOutsideLoop => write!(f, "`break` outside of a loop"),
            CompileErrorKind::ContinueOutsideLoop => write!(f, "`continue` outside of a loop"),
        }
    }
}

pub type CompileResult<T = ()> = Result<T, CompileError>;

/// Maps variable names to slot indices and declared types for one lexical
/// frame.
struct SlotFrame {
    map: HashMap<String, (u32, TypeId)>,
}

impl SlotFrame {
    fn new() -> Self {
        SlotFrame { map: HashMap::new() }
    }
}

/// A stack of slot frames mirroring the parser's scope stack. Lookup walks
/// from the innermost frame outwards, first match wins.
struct SlotFrames(Vec<SlotFrame>);

impl SlotFrames {
    const NO_FRAME: &'static str = "Attempted to access empty slot frame stack";

    fn new() -> Self {
        SlotFrames(Vec::new())
    }
    fn push(self: &mut Self, frame: SlotFrame) {
        self.0.push(frame);
    }
    fn pop(self: &mut Self) -> SlotFrame {
        self.0.pop().expect(Self::NO_FRAME)
    }
    fn insert(self: &mut Self, name: String, slot: u32, ty: TypeId) {
        self.0.last_mut().expect(Self::NO_FRAME).map.insert(name, (slot, ty));
    }
    fn lookup(self: &Self, name: &str) -> Option<(u32, TypeId)> {
        self.0.iter().rev().find_map(|frame| frame.map.get(name).copied())
    }
}

/// Bytecode compiler state. All of it is per-invocation; nothing is global.
pub struct Compiler<'ast> {
    /// Bytecode writer used to output to.
    writer      : Writer,
    /// Scope tables produced by the parser.
    scopes      : &'ast Scopes,
    /// Maps names to slots for each lexical frame.
    frames      : SlotFrames,
    /// Index assigned to the next local, unique within the current function.
    next_slot   : u32,
    /// Scope cursor tracking the parser's scope creation order.
    scope_stack : Vec<(ScopeId, usize)>,
    /// Byte positions of enclosing loop starts, for `continue`.
    loop_starts : Vec<usize>,
    /// Reserved offset fields of `break` jumps per enclosing loop.
    open_breaks : Vec<Vec<usize>>,
    /// Post-loop statements of enclosing `for` loops, for `continue`.
    post_loops  : Vec<Option<&'ast Statement>>,
}

/// Compiles a parsed program into a bytecode stream.
pub fn compile(program: &ParsedProgram) -> Result<Vec<u8>, CompileError> {
    let mut compiler = Compiler {
        writer      : Writer::new(),
        scopes      : &program.scopes,
        frames      : SlotFrames::new(),
        next_slot   : 0,
        scope_stack : vec![ (ScopeId::ROOT, 0) ],
        loop_starts : Vec::new(),
        open_breaks : Vec::new(),
        post_loops  : Vec::new(),
    };

    // preamble: one signature line per function
    compiler.writer.opcode(OpCode::FuncsBegin);
    for func in program.scopes.funcs_of(ScopeId::ROOT) {
        compiler.writer.write_line(&func.signature(&program.scopes));
    }
    compiler.writer.opcode(OpCode::FuncsEnd);

    for statement in program.statements.iter() {
        compiler.compile_statement(statement)?;
    }
    Ok(compiler.writer.into_bytes())
}

/// Methods for compiling statements.
impl<'ast> Compiler<'ast> {
    const NO_SCOPE: &'static str = "Attempted to access empty scope stack";
    const OUT_OF_SYNC: &'static str = "Scope cursor out of sync with parsed scopes";

    fn compile_statement(self: &mut Self, item: &'ast Statement) -> CompileResult {
        match item {
            Statement::Block(block) => self.compile_block(block),
            Statement::VarDecl(decl) => self.compile_var_decl(decl),
            Statement::VarAssign(assign) => self.compile_var_assign(assign),
            Statement::FuncDecl(decl) => self.compile_func_decl(decl),
            Statement::If(if_stmt) => self.compile_if(if_stmt),
            Statement::While(while_stmt) => self.compile_while(while_stmt),
            Statement::For(for_stmt) => self.compile_for(for_stmt),
            Statement::Break => self.compile_break(),
            Statement::Continue => self.compile_continue(),
            Statement::ExprStmt(stmt) => self.compile_expr_stmt(stmt),
            Statement::Return(ret) => {
                self.compile_expression(&ret.expr)?;
                self.writer.opcode(OpCode::IRet);
                Ok(())
            }
        }
    }

    /// Compiles a braced block in its own scope and slot frame.
    fn compile_block(self: &mut Self, item: &'ast Block) -> CompileResult {
        self.descend();
        self.frames.push(SlotFrame::new());
        for statement in item.statements.iter() {
            self.compile_statement(statement)?;
        }
        self.frames.pop();
        self.ascend();
        Ok(())
    }

    /// Compiles a variable declaration. The initializer is optional; the
    /// slot is bound either way.
    fn compile_var_decl(self: &mut Self, item: &'ast VarDecl) -> CompileResult {
        let slot = self.next_slot;
        if let Some(init) = &item.init {
            self.compile_expression(init)?;
            self.write_store(slot, item.var.ty);
        }
        self.frames.insert(item.var.name.lexeme.clone(), slot, item.var.ty);
        self.next_slot += 1;
        Ok(())
    }

    fn compile_var_assign(self: &mut Self, item: &'ast VarAssign) -> CompileResult {
        self.compile_expression(&item.value)?;
        let (slot, ty) = self.frames.lookup(&item.name.lexeme)
            .ok_or_else(|| CompileError::new(CompileErrorKind::UnresolvedVariable(item.name.lexeme.clone()), &item.name))?;
        self.write_store(slot, ty);
        Ok(())
    }

    /// Compiles a function definition: header with signature line, body,
    /// end marker. Parameters are bound to the leading slots in declaration
    /// order; all slots are released again on exit.
    fn compile_func_decl(self: &mut Self, item: &'ast FuncDecl) -> CompileResult {
        let body = match &item.body {
            Some(body) => body,
            None => return Ok(()), // forward declaration, nothing to emit
        };
        let func = self.scopes.func_ref(item.func);
        let signature = func.signature(self.scopes);
        self.descend();
        self.frames.push(SlotFrame::new());
        let entry_slot = self.next_slot;
        for param in func.params.iter() {
            self.frames.insert(param.name.lexeme.clone(), self.next_slot, param.ty);
            self.next_slot += 1;
        }
        self.writer.opcode(OpCode::Function);
        self.writer.write_line(&signature);
        for statement in body.iter() {
            self.compile_statement(statement)?;
        }
        self.writer.opcode(OpCode::EndFunc);
        self.next_slot = entry_slot;
        self.frames.pop();
        self.ascend();
        Ok(())
    }

    /// Compiles an if statement: condition, conditional forward skip over
    /// the then-branch, unconditional skip over the else-branch.
    fn compile_if(self: &mut Self, item: &'ast If) -> CompileResult {
        self.compile_expression(&item.cond)?;
        self.writer.opcode(OpCode::If);
        let false_skip = self.writer.reserve_u32();
        self.compile_statement(&item.then_branch)?;
        self.writer.opcode(OpCode::Skip);
        let else_skip = self.writer.reserve_u32();
        self.patch_offset(false_skip);
        if let Some(else_branch) = &item.else_branch {
            self.writer.opcode(OpCode::Else);
            self.compile_statement(else_branch)?;
        }
        self.patch_offset(else_skip);
        Ok(())
    }

    fn compile_while(self: &mut Self, item: &'ast While) -> CompileResult {
        let loop_start = self.writer.len();
        self.loop_starts.push(loop_start);
        self.open_breaks.push(Vec::new());
        self.post_loops.push(None);
        self.compile_expression(&item.cond)?;
        self.writer.opcode(OpCode::While);
        let exit_skip = self.writer.reserve_u32();
        self.compile_statement(&item.body)?;
        self.write_back_jump(loop_start);
        self.finish_loop(exit_skip);
        Ok(())
    }

    /// Compiles a for loop. The initializer runs once in the loop's own
    /// frame; the post-loop statement is emitted after the body and inline
    /// at every `continue`.
    fn compile_for(self: &mut Self, item: &'ast For) -> CompileResult {
        self.descend();
        self.frames.push(SlotFrame::new());
        if let Some(initial) = &item.initial {
            self.compile_statement(initial)?;
        }
        let cond_pos = self.writer.len();
        self.loop_starts.push(cond_pos);
        self.open_breaks.push(Vec::new());
        self.post_loops.push(item.post_loop.as_ref());
        self.compile_expression(&item.cond)?;
        self.writer.opcode(OpCode::For);
        let exit_skip = self.writer.reserve_u32();
        self.compile_statement(&item.body)?;
        if let Some(post_loop) = &item.post_loop {
            self.compile_statement(post_loop)?;
        }
        self.write_back_jump(cond_pos);
        self.finish_loop(exit_skip);
        self.frames.pop();
        self.ascend();
        Ok(())
    }

    /// Emits a forward jump out of the innermost loop and records its
    /// offset field for back-patching when the loop ends.
    fn compile_break(self: &mut Self) -> CompileResult {
        if self.open_breaks.is_empty() {
            return Err(CompileError::bare(CompileErrorKind::BreakOutsideLoop));
        }
        self.writer.opcode(OpCode::Skip);
        let site = self.writer.reserve_u32();
        self.open_breaks.last_mut().expect(Self::NO_SCOPE).push(site);
        Ok(())
    }

    /// Emits the innermost loop's post-loop statement (if any) followed by
    /// a jump back to the loop start.
    fn compile_continue(self: &mut Self) -> CompileResult {
        if self.loop_starts.is_empty() {
            return Err(CompileError::bare(CompileErrorKind::ContinueOutsideLoop));
        }
        if let Some(post_loop) = self.post_loops.last().copied().flatten() {
            self.compile_statement(post_loop)?;
        }
        let target = *self.loop_starts.last().expect(Self::NO_SCOPE);
        self.write_back_jump(target);
        Ok(())
    }

    /// Compiles a call or `++`/`--` in statement position. A call result
    /// left on the operand stack is discarded.
    fn compile_expr_stmt(self: &mut Self, item: &'ast ExprStmt) -> CompileResult {
        self.compile_expression(&item.expr)?;
        if let Expression::FuncCall(_) = &item.expr {
            let ty = self.eval_type(&item.expr)?;
            if self.scopes.type_ref(ty).name.lexeme != "void" {
                self.writer.opcode(OpCode::Pop);
            }
        }
        Ok(())
    }
}

/// Methods for compiling expressions.
impl<'ast> Compiler<'ast> {

    fn compile_expression(self: &mut Self, item: &'ast Expression) -> CompileResult {
        match item {
            Expression::Value(value) => self.compile_value(value),
            Expression::Unary(unary) => self.compile_unary(unary),
            Expression::Binary(binary) => self.compile_binary(item, binary),
            Expression::Cast(cast) => self.compile_cast(cast),
            Expression::FuncCall(call) => self.compile_call(call),
        }
    }

    /// Compiles a literal or variable load.
    fn compile_value(self: &mut Self, item: &'ast Value) -> CompileResult {
        match item.val.kind {
            TokenKind::Integer => {
                let value = item.val.lexeme.parse::<i32>()
                    .map_err(|_| CompileError::new(CompileErrorKind::MalformedLiteral(item.val.lexeme.clone()), &item.val))?;
                self.writer.opcode(OpCode::IConst);
                self.writer.write_i32(value);
            }
            TokenKind::Float => {
                let value = item.val.lexeme.parse::<f32>()
                    .map_err(|_| CompileError::new(CompileErrorKind::MalformedLiteral(item.val.lexeme.clone()), &item.val))?;
                self.writer.opcode(OpCode::FConst);
                self.writer.write_f32(value);
            }
            TokenKind::Ident => {
                let (slot, ty) = self.frames.lookup(&item.val.lexeme)
                    .ok_or_else(|| CompileError::new(CompileErrorKind::UnresolvedVariable(item.val.lexeme.clone()), &item.val))?;
                self.writer.opcode(if self.is_float(ty) { OpCode::FLoad } else { OpCode::ILoad });
                self.writer.write_u32(slot);
            }
            _ => {
                return Err(CompileError::new(CompileErrorKind::MalformedLiteral(item.val.lexeme.clone()), &item.val));
            }
        }
        Ok(())
    }

    /// Compiles a prefix `++`/`--` into an in-place slot increment.
    fn compile_unary(self: &mut Self, item: &'ast Unary) -> CompileResult {
        let (slot, _) = self.frames.lookup(&item.expr.val.lexeme)
            .ok_or_else(|| CompileError::new(CompileErrorKind::UnresolvedVariable(item.expr.val.lexeme.clone()), &item.expr.val))?;
        let opcode = match item.op.kind {
            TokenKind::Increment => OpCode::Inc,
            TokenKind::Decrement => OpCode::Dec,
            _ => return Err(CompileError::new(CompileErrorKind::UnsupportedOperator(item.op.lexeme.clone()), &item.op)),
        };
        self.writer.opcode(opcode);
        self.writer.write_u32(slot);
        Ok(())
    }

    /// Compiles both operands, then the variant of the operator matching
    /// the evaluated type of the whole subtree.
    fn compile_binary(self: &mut Self, whole: &'ast Expression, item: &'ast Binary) -> CompileResult {
        self.compile_expression(&item.lhs)?;
        self.compile_expression(&item.rhs)?;
        let ty = self.eval_type(whole)?;
        let floating = self.scopes.type_ref(ty).is_floating();
        let opcode = match item.op.kind {
            TokenKind::Plus => if floating { OpCode::FAdd } else { OpCode::IAdd },
            TokenKind::Minus => if floating { OpCode::FSub } else { OpCode::ISub },
            TokenKind::Star => if floating { OpCode::FMul } else { OpCode::IMul },
            TokenKind::Slash => if floating { OpCode::FDiv } else { OpCode::IDiv },
            TokenKind::Percent => OpCode::Mod,
            TokenKind::Less => if floating { OpCode::FLe } else { OpCode::ILe },
            TokenKind::Greater => if floating { OpCode::FGe } else { OpCode::IGe },
            TokenKind::Equals => if floating { OpCode::FEq } else { OpCode::IEq },
            _ => return Err(CompileError::new(CompileErrorKind::UnsupportedOperator(item.op.lexeme.clone()), &item.op)),
        };
        self.writer.opcode(opcode);
        Ok(())
    }

    /// Compiles a cast; a conversion opcode is only emitted when the
    /// primitive category changes.
    fn compile_cast(self: &mut Self, item: &'ast Cast) -> CompileResult {
        self.compile_expression(&item.expr)?;
        let orig_floating = self.scopes.type_ref(item.orig).is_floating();
        let dest_floating = self.scopes.type_ref(item.dest).is_floating();
        if orig_floating != dest_floating {
            self.writer.opcode(if dest_floating { OpCode::Itof } else { OpCode::Ftoi });
        }
        Ok(())
    }

    /// Compiles the arguments left to right, then the call keyed by the
    /// callee's signature.
    fn compile_call(self: &mut Self, item: &'ast FuncCall) -> CompileResult {
        for arg in item.args.iter() {
            self.compile_expression(arg)?;
        }
        let func_id = self.scopes.lookup_func(self.current_scope(), &item.func.lexeme)
            .ok_or_else(|| CompileError::new(CompileErrorKind::UnresolvedFunction(item.func.lexeme.clone()), &item.func))?;
        let signature = self.scopes.func_ref(func_id).signature(self.scopes);
        self.writer.opcode(OpCode::FunctionCall);
        self.writer.write_line(&signature);
        self.writer.write_u32(item.args.len() as u32);
        Ok(())
    }
}

/// Shared helpers.
impl<'ast> Compiler<'ast> {

    fn current_scope(self: &Self) -> ScopeId {
        self.scope_stack.last().expect(Self::NO_SCOPE).0
    }

    /// Descends into the next child of the current scope, mirroring the
    /// order in which the parser created them.
    fn descend(self: &mut Self) {
        let (scope, cursor) = {
            let top = self.scope_stack.last_mut().expect(Self::NO_SCOPE);
            let state = *top;
            top.1 += 1;
            state
        };
        let child = self.scopes.nth_child(scope, cursor).expect(Self::OUT_OF_SYNC);
        self.scope_stack.push((child, 0));
    }

    fn ascend(self: &mut Self) {
        self.scope_stack.pop().expect(Self::NO_SCOPE);
    }

    fn eval_type(self: &Self, expr: &Expression) -> CompileResult<TypeId> {
        self.scopes.eval_type(expr, self.current_scope())
            .ok_or_else(|| CompileError::bare(CompileErrorKind::UntypedExpression))
    }

    /// Whether loads and stores of this type use the float opcode variant.
    fn is_float(self: &Self, ty: TypeId) -> bool {
        self.scopes.type_ref(ty).name.lexeme == "float"
    }

    fn write_store(self: &mut Self, slot: u32, ty: TypeId) {
        self.writer.opcode(if self.is_float(ty) { OpCode::FStore } else { OpCode::IStore });
        self.writer.write_u32(slot);
    }

    /// Back-patches a reserved forward offset to land at the current end
    /// of the buffer. Offsets count from the byte after the offset field.
    fn patch_offset(self: &mut Self, field_pos: usize) {
        let offset = (self.writer.len() - (field_pos + 4)) as u32;
        self.writer.overwrite(field_pos, |writer| writer.write_u32(offset));
    }

    /// Emits a jump returning the PC to the given earlier position.
    fn write_back_jump(self: &mut Self, target: usize) {
        self.writer.opcode(OpCode::Back);
        let offset = (self.writer.position() + 4 - target) as u32;
        self.writer.write_u32(offset);
    }

    /// Patches the loop exit offset and all recorded break sites to the
    /// position just past the loop, then pops the loop bookkeeping.
    fn finish_loop(self: &mut Self, exit_skip: usize) {
        self.patch_offset(exit_skip);
        for site in self.open_breaks.pop().expect(Self::NO_SCOPE) {
            self.patch_offset(site);
        }
        self.loop_starts.pop().expect(Self::NO_SCOPE);
        self.post_loops.pop().expect(Self::NO_SCOPE);
    }
}
