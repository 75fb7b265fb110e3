//! Symbol facts: variables, functions and scopes of one translation unit.
//!
//! The database is built once by [`resolver::resolve`] and is read-only for
//! the rest of the analysis. Tokens refer to facts by id; every lookup has a
//! well-defined "not found" result instead of a fault.

pub mod resolver;

use crate::tokens::{TokenId, TokenKind, TokenList};

pub use resolver::resolve;

/// Identifier of a [`Variable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

/// Identifier of a [`Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u32);

/// Identifier of a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

macro_rules! id_index {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub(crate) fn new(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    )*};
}

id_index!(VarId, FunctionId, ScopeId);

/// Well-known typedefs that name unsigned integer types.
const UNSIGNED_ALIASES: &[&str] = &[
    "size_t", "uint8_t", "uint16_t", "uint32_t", "uint64_t", "uintptr_t", "uintmax_t",
    "uint_least8_t", "uint_least16_t", "uint_least32_t", "uint_least64_t", "uint_fast8_t",
    "uint_fast16_t", "uint_fast32_t", "uint_fast64_t",
];

/// A declared variable or function argument.
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VarId,
    pub name: String,
    /// Declaring name token; `None` for unnamed arguments.
    pub name_token: Option<TokenId>,
    /// First token of the declared type.
    pub type_start: TokenId,
    /// One past the last type token (the name token when present).
    pub type_end: TokenId,
    pub is_argument: bool,
    pub is_reference: bool,
    pub is_pointer: bool,
    pub is_unsigned: bool,
    /// Scope the declaration belongs to.
    pub scope: Option<ScopeId>,
    /// Owning function for arguments.
    pub function: Option<FunctionId>,
}

impl Variable {
    pub(crate) fn new(
        id: VarId,
        tokens: &TokenList,
        name_token: Option<TokenId>,
        type_start: TokenId,
        type_end: TokenId,
    ) -> Self {
        let name = name_token.map(|t| tokens.text(t).to_string()).unwrap_or_default();
        let mut var = Self {
            id,
            name,
            name_token,
            type_start,
            type_end,
            is_argument: false,
            is_reference: false,
            is_pointer: false,
            is_unsigned: false,
            scope: None,
            function: None,
        };
        // Only top-level words describe the variable itself; template
        // arguments and parameter lists describe other types.
        let mut angles = 0usize;
        let mut parens = 0usize;
        for tok in tokens.range(type_start, type_end) {
            match tokens.text(tok) {
                "<" => angles += 1,
                ">" => angles = angles.saturating_sub(1),
                ">>" => angles = angles.saturating_sub(2),
                "(" => parens += 1,
                ")" => parens = parens.saturating_sub(1),
                _ if angles > 0 || parens > 0 => {}
                "*" => var.is_pointer = true,
                "&" | "&&" => var.is_reference = true,
                "unsigned" => var.is_unsigned = true,
                _ => {}
            }
        }
        if let Some(last) = var.type_name(tokens) {
            if UNSIGNED_ALIASES.contains(&last) {
                var.is_unsigned = true;
            }
        }
        var
    }

    /// Declared type tokens, in order.
    pub fn type_tokens<'t>(&self, tokens: &'t TokenList) -> impl Iterator<Item = TokenId> + 't {
        tokens.range(self.type_start, self.type_end)
    }

    /// Text of the terminal type token, ignoring trailing `const`/`volatile`.
    pub fn type_name<'t>(&self, tokens: &'t TokenList) -> Option<&'t str> {
        let mut tok = tokens.previous(self.type_end)?;
        while tok >= self.type_start {
            match tokens.text(tok) {
                "const" | "volatile" => tok = tokens.previous(tok)?,
                text => return Some(text),
            }
        }
        None
    }

    pub fn is_ref_or_pointer(&self) -> bool {
        self.is_reference || self.is_pointer
    }
}

/// A function declaration or definition.
#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    /// Name token of the declaration.
    pub token: TokenId,
    pub arguments: Vec<VarId>,
    pub has_body: bool,
    /// Scope of the body, when defined.
    pub body: Option<ScopeId>,
    /// Scope the function is declared in.
    pub nested_in: Option<ScopeId>,
}

impl Function {
    pub fn arg_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn argument(&self, index: usize) -> Option<VarId> {
        self.arguments.get(index).copied()
    }
}

/// Kind of a bracketed scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    Function,
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Try,
    Catch,
    Unconditional,
}

impl ScopeKind {
    /// Scopes whose bodies hold declarations rather than statements.
    pub fn is_declarative(self) -> bool {
        matches!(
            self,
            ScopeKind::Namespace | ScopeKind::Class | ScopeKind::Struct | ScopeKind::Union
        )
    }
}

/// A `{ ... }` region. `start` is the opening brace, `end` the closing one;
/// analysis covers the half-open range `[start, end)`.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub name: String,
    /// Token that introduces the scope (`namespace`, `class`, function name, ...).
    pub class_def: Option<TokenId>,
    pub start: TokenId,
    pub end: TokenId,
    pub parent: Option<ScopeId>,
    pub function: Option<FunctionId>,
    pub variables: Vec<VarId>,
}

/// Read-only symbol tables for one translation unit.
#[derive(Debug, Clone, Default)]
pub struct SymbolDatabase {
    variables: Vec<Variable>,
    functions: Vec<Function>,
    scopes: Vec<Scope>,
    function_scopes: Vec<ScopeId>,
}

impl SymbolDatabase {
    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.index())
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Every scope, in order of appearance.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Body scopes of defined functions, in order of appearance.
    pub fn function_scopes(&self) -> impl Iterator<Item = &Scope> {
        self.function_scopes.iter().filter_map(|&id| self.scope(id))
    }

    /// Variable a token refers to, if it is a resolved variable token.
    pub fn variable_of(&self, tokens: &TokenList, tok: TokenId) -> Option<&Variable> {
        let token = tokens.get(tok)?;
        if token.kind != TokenKind::Variable {
            return None;
        }
        self.variable(token.var_id?)
    }

    pub(crate) fn add_variable(&mut self, mut var: Variable) -> VarId {
        let id = VarId::new(self.variables.len());
        var.id = id;
        self.variables.push(var);
        id
    }

    pub(crate) fn add_function(&mut self, mut func: Function) -> FunctionId {
        let id = FunctionId::new(self.functions.len());
        func.id = id;
        self.functions.push(func);
        id
    }

    pub(crate) fn add_scope(&mut self, mut scope: Scope) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        scope.id = id;
        if scope.kind == ScopeKind::Function {
            self.function_scopes.push(id);
        }
        self.scopes.push(scope);
        id
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        self.functions.get_mut(id.index())
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::tokenize;

    fn single_var(decl: &str) -> (TokenList, Variable) {
        let tokens = tokenize(decl);
        // Type spans everything up to the last token, which is the name
        let name = TokenId::new(tokens.len() - 1);
        let var = Variable::new(VarId::new(0), &tokens, Some(name), TokenId::new(0), name);
        (tokens, var)
    }

    #[test]
    fn test_flags_from_type_range() {
        let (_, v) = single_var("const std::vector<int>& v");
        assert!(v.is_reference);
        assert!(!v.is_pointer);

        let (_, p) = single_var("char * p");
        assert!(p.is_pointer);
        assert!(p.is_ref_or_pointer());
    }

    #[test]
    fn test_template_arguments_do_not_set_flags() {
        let (_, v) = single_var("std::vector<int*> v");
        assert!(!v.is_ref_or_pointer());

        let (_, m) = single_var("std::map<std::string, char*> m");
        assert!(!m.is_pointer);

        let (_, nested) = single_var("std::vector<std::vector<int&&>>& nested");
        assert!(nested.is_reference);
        assert!(!nested.is_pointer);

        let (_, f) = single_var("std::function<void(int*)> f");
        assert!(!f.is_pointer);
    }

    #[test]
    fn test_unsigned_detection() {
        assert!(single_var("unsigned char c").1.is_unsigned);
        assert!(single_var("std::size_t n").1.is_unsigned);
        assert!(!single_var("signed char c").1.is_unsigned);
        assert!(!single_var("int i").1.is_unsigned);
        assert!(!single_var("std::vector<unsigned> v").1.is_unsigned);
        assert!(!single_var("std::map<size_t, int> m").1.is_unsigned);
        assert!(single_var("unsigned const * p").1.is_unsigned);
    }

    #[test]
    fn test_type_name_skips_trailing_cv() {
        let (tokens, v) = single_var("time_t const t");
        assert_eq!(v.type_name(&tokens), Some("time_t"));
        assert_eq!(v.name, "t");
    }

    #[test]
    fn test_missing_ids_are_not_found() {
        let db = SymbolDatabase::default();
        assert!(db.variable(VarId::new(3)).is_none());
        assert!(db.function(FunctionId::new(0)).is_none());
        assert!(db.scope(ScopeId::new(0)).is_none());
        assert_eq!(db.function_scopes().count(), 0);
    }
}
