//! Flat scope tables with parent-walking name lookup.

use crate::shared::typed_ids::{ScopeId, TypeId, VarId, FuncId};
use crate::frontend::ast::Expression;
use crate::frontend::lexer::{Token, TokenKind};
use crate::frontend::types::{Type, Variable, Function};

/// A type alias visible in a scope.
#[derive(Clone, Debug)]
pub struct Typedef {
    pub alias       : Token,
    pub original    : Token,
}

/// Flat lists of types, typedefs, variables and functions and which scope
/// they belong to. Scopes form a tree via `parent_map`; the root maps to
/// itself. Lookups search the given scope first, then walk parent links.
#[derive(Debug)]
pub struct Scopes {
    types       : Vec<(ScopeId, Type)>,
    typedefs    : Vec<(ScopeId, Typedef)>,
    vars        : Vec<(ScopeId, Variable)>,
    funcs       : Vec<(ScopeId, Function)>,
    /// Maps ScopeId => parent ScopeId (vector as usize=>usize map).
    parent_map  : Vec<ScopeId>,
}

impl Scopes {

    /// Creates a new Scopes instance with the primitive types seeded into
    /// the root scope.
    pub fn new() -> Self {
        let mut scopes = Scopes {
            types       : Vec::new(),
            typedefs    : Vec::new(),
            vars        : Vec::new(),
            funcs       : Vec::new(),
            parent_map  : vec![ ScopeId::ROOT ],
        };
        for (kind, name, size, align) in [
            (TokenKind::TypeVoid, "void", 0, 0),
            (TokenKind::TypeBool, "bool", 1, 1),
            (TokenKind::TypeChar, "char", 1, 1),
            (TokenKind::TypeShort, "short", 2, 2),
            (TokenKind::TypeInt, "int", 4, 4),
            (TokenKind::TypeLong, "long", 8, 8),
            (TokenKind::TypeFloat, "float", 4, 4),
            (TokenKind::TypeDouble, "double", 8, 8),
        ] {
            scopes.insert_type(ScopeId::ROOT, Type::primitive(Token::new(kind, 0, 0, name), size, align));
        }
        scopes
    }

    /// Creates a new scope within the parent and returns its id.
    pub fn create_scope(self: &mut Self, parent: ScopeId) -> ScopeId {
        let index = self.parent_map.len();
        self.parent_map.push(parent);
        index.into()
    }

    /// Returns the parent of the given scope. The root is its own parent.
    pub fn parent(self: &Self, scope_id: ScopeId) -> ScopeId {
        self.parent_map[scope_id.into_usize()]
    }

    /// Returns the id of the n-th child of the given scope, in creation order.
    pub fn nth_child(self: &Self, scope_id: ScopeId, n: usize) -> Option<ScopeId> {
        self.parent_map.iter()
            .enumerate()
            .filter(|&(index, &parent)| parent == scope_id && index != scope_id.into_usize())
            .map(|(index, _)| ScopeId::new(index))
            .nth(n)
    }
}

/// Type handling.
impl Scopes {

    /// Inserts a type into the given scope, returning its type id.
    pub fn insert_type(self: &mut Self, scope_id: ScopeId, ty: Type) -> TypeId {
        let index = self.types.len();
        self.types.push((scope_id, ty));
        index.into()
    }

    /// Inserts a type alias into the given scope.
    pub fn insert_typedef(self: &mut Self, scope_id: ScopeId, typedef: Typedef) {
        self.typedefs.push((scope_id, typedef));
    }

    /// Finds the id of the named type within the scope or its parent scopes,
    /// resolving typedef aliases.
    pub fn lookup_type(self: &Self, scope_id: ScopeId, name: &str) -> Option<TypeId> {
        let found = self.types.iter()
            .enumerate()
            .find(|(_, (scope, ty))| *scope == scope_id && ty.name.lexeme == name)
            .map(|(index, _)| TypeId::new(index));
        if let Some(type_id) = found {
            return Some(type_id);
        }
        if let Some((_, alias)) = self.typedefs.iter().find(|(scope, alias)| *scope == scope_id && alias.alias.lexeme == name) {
            return self.lookup_type(scope_id, &alias.original.lexeme.clone());
        }
        let parent = self.parent(scope_id);
        if parent != scope_id {
            self.lookup_type(parent, name)
        } else {
            None
        }
    }

    /// Returns the id of the named type originating in exactly this scope.
    pub fn local_type(self: &Self, scope_id: ScopeId, name: &str) -> Option<TypeId> {
        self.types.iter()
            .enumerate()
            .find(|(_, (scope, ty))| *scope == scope_id && ty.name.lexeme == name)
            .map(|(index, _)| TypeId::new(index))
    }

    /// Returns a reference to the type of the given type id.
    pub fn type_ref(self: &Self, type_id: TypeId) -> &Type {
        &self.types[type_id.into_usize()].1
    }

    /// Returns a mutable reference to the type of the given type id.
    pub fn type_mut(self: &mut Self, type_id: TypeId) -> &mut Type {
        &mut self.types[type_id.into_usize()].1
    }
}

/// Variable handling.
impl Scopes {

    /// Inserts a variable into the given scope, returning its variable id.
    pub fn insert_var(self: &mut Self, scope_id: ScopeId, var: Variable) -> VarId {
        let index = self.vars.len();
        self.vars.push((scope_id, var));
        index.into()
    }

    /// Returns the id of the named variable originating in exactly this scope.
    pub fn local_var(self: &Self, scope_id: ScopeId, name: &str) -> Option<VarId> {
        self.vars.iter()
            .enumerate()
            .find(|(_, (scope, var))| *scope == scope_id && var.name.lexeme == name)
            .map(|(index, _)| VarId::new(index))
    }

    /// Finds the id of the named variable within the scope or its parent scopes.
    pub fn lookup_var(self: &Self, scope_id: ScopeId, name: &str) -> Option<VarId> {
        if let Some(var_id) = self.local_var(scope_id, name) {
            return Some(var_id);
        }
        let parent = self.parent(scope_id);
        if parent != scope_id {
            self.lookup_var(parent, name)
        } else {
            None
        }
    }

    /// Returns a reference to the variable of the given variable id.
    pub fn var_ref(self: &Self, var_id: VarId) -> &Variable {
        &self.vars[var_id.into_usize()].1
    }
}

/// Function handling.
impl Scopes {

    /// Inserts a function into the given scope, returning its function id.
    pub fn insert_func(self: &mut Self, scope_id: ScopeId, func: Function) -> FuncId {
        let index = self.funcs.len();
        self.funcs.push((scope_id, func));
        index.into()
    }

    /// Finds the id of the named function within the scope or its parent scopes.
    pub fn lookup_func(self: &Self, scope_id: ScopeId, name: &str) -> Option<FuncId> {
        let found = self.funcs.iter()
            .enumerate()
            .find(|(_, (scope, func))| *scope == scope_id && func.name.lexeme == name)
            .map(|(index, _)| FuncId::new(index));
        if let Some(func_id) = found {
            return Some(func_id);
        }
        let parent = self.parent(scope_id);
        if parent != scope_id {
            self.lookup_func(parent, name)
        } else {
            None
        }
    }

    /// Returns a reference to the function of the given function id.
    pub fn func_ref(self: &Self, func_id: FuncId) -> &Function {
        &self.funcs[func_id.into_usize()].1
    }

    /// Returns a mutable reference to the function of the given function id.
    pub fn func_mut(self: &mut Self, func_id: FuncId) -> &mut Function {
        &mut self.funcs[func_id.into_usize()].1
    }

    /// Returns the functions declared in the given scope, in declaration order.
    pub fn funcs_of(self: &Self, scope_id: ScopeId) -> impl Iterator<Item = &Function> {
        self.funcs.iter()
            .filter(move |(scope, _)| *scope == scope_id)
            .map(|(_, func)| func)
    }
}

/// Expression type evaluation.
impl Scopes {

    /// Evaluates the type of the given expression as seen from the given
    /// scope. Literals type as `int`/`double`, identifiers as their declared
    /// type; when binary operand types differ the floating-point side wins,
    /// otherwise the left side.
    pub fn eval_type(self: &Self, expr: &Expression, scope_id: ScopeId) -> Option<TypeId> {
        match expr {
            Expression::Value(value) => {
                match value.val.kind {
                    TokenKind::Ident => {
                        let var_id = self.lookup_var(scope_id, &value.val.lexeme)?;
                        Some(self.var_ref(var_id).ty)
                    }
                    TokenKind::Integer => self.lookup_type(scope_id, "int"),
                    TokenKind::Float => self.lookup_type(scope_id, "double"),
                    _ => None,
                }
            }
            Expression::Unary(unary) => {
                let var_id = self.lookup_var(scope_id, &unary.expr.val.lexeme)?;
                Some(self.var_ref(var_id).ty)
            }
            Expression::Binary(binary) => {
                let left = self.eval_type(&binary.lhs, scope_id)?;
                let right = self.eval_type(&binary.rhs, scope_id)?;
                if left != right {
                    if self.type_ref(right).is_floating() && !self.type_ref(left).is_floating() {
                        Some(right)
                    } else {
                        Some(left)
                    }
                } else {
                    Some(left)
                }
            }
            Expression::Cast(cast) => Some(cast.dest),
            Expression::FuncCall(call) => {
                let func_id = self.lookup_func(scope_id, &call.func.lexeme)?;
                Some(self.func_ref(func_id).ret)
            }
        }
    }
}
