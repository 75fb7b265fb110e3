//! Heuristic symbol resolution over a token arena.
//!
//! One linear walk keeps a stack of open brace frames. Namespaces, records,
//! functions and control blocks become [`Scope`]s; declarations become
//! [`Variable`]s; later identifier uses are bound to them through the frame
//! chain. This is not a C++ front-end: anything it cannot classify is left
//! unresolved, which the rules treat as "no match".

use super::{Function, FunctionId, Scope, ScopeId, ScopeKind, SymbolDatabase, VarId, Variable};
use crate::tokens::{TokenId, TokenKind, TokenList};
use std::collections::{HashMap, HashSet};

/// Maximum tokens scanned when skipping a template argument list.
const MAX_TEMPLATE_TOKENS: usize = 256;

/// Resolve symbols and annotate the tokens with their references.
pub fn resolve(tokens: &mut TokenList) -> SymbolDatabase {
    let mut resolver = Resolver::new(tokens);
    resolver.run();
    let Resolver {
        db,
        bindings,
        function_names,
        ..
    } = resolver;

    for (tok, var) in bindings {
        if let Some(token) = tokens.get_mut(tok) {
            token.kind = TokenKind::Variable;
            token.var_id = Some(var);
        }
    }
    for (tok, func) in function_names {
        if let Some(token) = tokens.get_mut(tok) {
            token.function = Some(func);
        }
    }

    // Scopes are created in order of their opening brace, so later (inner)
    // scopes overwrite outer ones.
    for scope in db.scopes() {
        for index in scope.start.index()..=scope.end.index() {
            if let Some(token) = tokens.get_mut(TokenId::new(index)) {
                token.scope = Some(scope.id);
            }
        }
    }

    db
}

struct Frame {
    scope: Option<ScopeId>,
    declarative: bool,
    close: TokenId,
    names: HashMap<String, VarId>,
}

/// Body scope created ahead of its opening brace.
struct PendingBody {
    scope: ScopeId,
    declarative: bool,
    names: HashMap<String, VarId>,
}

struct Resolver<'t> {
    tokens: &'t TokenList,
    db: SymbolDatabase,
    frames: Vec<Frame>,
    globals: HashMap<String, VarId>,
    pending: HashMap<TokenId, PendingBody>,
    /// Braces whose frame was already pushed.
    opened: HashSet<TokenId>,
    /// Tokens that start a declaration even though the previous token says otherwise.
    decl_starts: HashSet<TokenId>,
    declared: HashSet<TokenId>,
    bindings: Vec<(TokenId, VarId)>,
    function_names: Vec<(TokenId, FunctionId)>,
}

impl<'t> Resolver<'t> {
    fn new(tokens: &'t TokenList) -> Self {
        Self {
            tokens,
            db: SymbolDatabase::default(),
            frames: Vec::new(),
            globals: HashMap::new(),
            pending: HashMap::new(),
            opened: HashSet::new(),
            decl_starts: HashSet::new(),
            declared: HashSet::new(),
            bindings: Vec::new(),
            function_names: Vec::new(),
        }
    }

    fn run(&mut self) {
        let mut cur = self.tokens.first();
        while let Some(tok) = cur {
            cur = self.step(tok);
        }
    }

    fn current_scope(&self) -> Option<ScopeId> {
        self.frames.iter().rev().find_map(|f| f.scope)
    }

    fn in_declarative(&self) -> bool {
        self.frames.last().is_none_or(|f| f.declarative)
    }

    fn text(&self, tok: TokenId) -> &'t str {
        self.tokens.text(tok)
    }

    fn kind(&self, tok: TokenId) -> Option<TokenKind> {
        self.tokens.kind(tok)
    }

    fn after(&self, tok: TokenId) -> Option<TokenId> {
        self.tokens.next(tok)
    }

    /// Process one token and return the next one to visit.
    fn step(&mut self, tok: TokenId) -> Option<TokenId> {
        let tokens = self.tokens;
        match tokens.text(tok) {
            "}" => {
                while self.frames.last().is_some_and(|f| f.close == tok) {
                    self.frames.pop();
                }
                return tokens.next(tok);
            }
            "{" => {
                self.open_brace(tok);
                return tokens.next(tok);
            }
            "namespace" => {
                if let Some(next) = self.open_namespace(tok) {
                    return Some(next);
                }
            }
            "class" | "struct" | "union" => {
                if let Some(next) = self.open_record(tok) {
                    return Some(next);
                }
            }
            "enum" => {
                if let Some(next) = self.skip_enum(tok) {
                    return Some(next);
                }
            }
            "extern" => {
                if tokens.kind(tokens.next(tok)?) == Some(TokenKind::String)
                    && tokens.str_at(tok, 2) == "{"
                {
                    let brace = tokens.tok_at(tok, 2)?;
                    self.push_frame(brace, None, true, HashMap::new());
                    return tokens.next(brace);
                }
            }
            "typedef" | "using" => return self.skip_statement(tok),
            "template" if tokens.str_at(tok, 1) == "<" => {
                let next = self.skip_template(tokens.next(tok)?);
                if let Some(next) = next {
                    self.decl_starts.insert(next);
                }
                return next.or_else(|| tokens.next(tok));
            }
            "if" | "for" | "while" | "switch" | "catch" if !self.in_declarative() => {
                self.open_control(tok);
                return tokens.next(tok);
            }
            "else" | "try" | "do" if tokens.str_at(tok, 1) == "{" => {
                let kind = match tokens.text(tok) {
                    "else" => ScopeKind::Else,
                    "try" => ScopeKind::Try,
                    _ => ScopeKind::Do,
                };
                let brace = tokens.next(tok)?;
                self.open_scope(brace, kind, String::new(), Some(tok));
                return tokens.next(brace);
            }
            _ => {}
        }

        if self.in_declarative()
            && (self.kind(tok) == Some(TokenKind::Name) || self.text(tok) == "operator")
        {
            if let Some(next) = self.try_function(tok) {
                return Some(next);
            }
        }

        if self.is_statement_start(tok) {
            self.try_declaration(tok);
        }

        self.bind_use(tok);
        tokens.next(tok)
    }

    fn is_statement_start(&self, tok: TokenId) -> bool {
        if self.decl_starts.contains(&tok) {
            return true;
        }
        match self.tokens.previous(tok) {
            None => true,
            Some(prev) => matches!(self.text(prev), ";" | "{" | "}" | ":"),
        }
    }

    fn push_frame(
        &mut self,
        brace: TokenId,
        scope: Option<ScopeId>,
        declarative: bool,
        names: HashMap<String, VarId>,
    ) {
        let Some(close) = self.tokens.link(brace) else {
            return;
        };
        self.opened.insert(brace);
        self.frames.push(Frame {
            scope,
            declarative,
            close,
            names,
        });
    }

    /// Create a scope for `brace` and push its frame.
    fn open_scope(
        &mut self,
        brace: TokenId,
        kind: ScopeKind,
        name: String,
        class_def: Option<TokenId>,
    ) -> Option<ScopeId> {
        let end = self.tokens.link(brace)?;
        let id = self.db.add_scope(Scope {
            id: ScopeId::new(0),
            kind,
            name,
            class_def,
            start: brace,
            end,
            parent: self.current_scope(),
            function: None,
            variables: Vec::new(),
        });
        self.push_frame(brace, Some(id), kind.is_declarative(), HashMap::new());
        Some(id)
    }

    fn open_brace(&mut self, brace: TokenId) {
        if self.opened.contains(&brace) {
            return;
        }
        if let Some(body) = self.pending.remove(&brace) {
            self.push_frame(brace, Some(body.scope), body.declarative, body.names);
            return;
        }
        self.open_scope(brace, ScopeKind::Unconditional, String::new(), None);
    }

    fn open_namespace(&mut self, tok: TokenId) -> Option<TokenId> {
        let mut name = String::new();
        let mut cur = self.after(tok)?;
        while matches!(self.kind(cur), Some(TokenKind::Name)) || self.text(cur) == "::" {
            name.push_str(self.text(cur));
            cur = self.after(cur)?;
        }
        if self.text(cur) != "{" {
            return None;
        }
        self.open_scope(cur, ScopeKind::Namespace, name, Some(tok))?;
        self.after(cur)
    }

    fn open_record(&mut self, tok: TokenId) -> Option<TokenId> {
        let kind = match self.text(tok) {
            "class" => ScopeKind::Class,
            "struct" => ScopeKind::Struct,
            _ => ScopeKind::Union,
        };
        let next = self.after(tok)?;
        let name = if self.kind(next) == Some(TokenKind::Name) {
            self.text(next).to_string()
        } else {
            String::new()
        };

        let mut depth = 0i32;
        let mut cur = next;
        loop {
            match self.text(cur) {
                "{" if depth == 0 => break,
                ";" | "(" | ")" | "=" | "{" | "}" => return None,
                "," if depth == 0 => return None,
                "<" => depth += 1,
                ">" => depth -= 1,
                ">>" => depth -= 2,
                _ => {}
            }
            // Template parameter list like `template <class T>`
            if depth < 0 {
                return None;
            }
            cur = self.after(cur)?;
        }
        self.open_scope(cur, kind, name, Some(tok))?;
        self.after(cur)
    }

    fn skip_enum(&mut self, tok: TokenId) -> Option<TokenId> {
        let mut cur = self.after(tok)?;
        while !matches!(self.text(cur), "{" | ";" | "(" | ")" | "=") {
            cur = self.after(cur)?;
        }
        if self.text(cur) != "{" {
            return None;
        }
        let end = self.tokens.link(cur)?;
        let name = self
            .tokens
            .range(tok, cur)
            .filter(|&t| self.kind(t) == Some(TokenKind::Name))
            .map(|t| self.text(t))
            .next()
            .unwrap_or_default()
            .to_string();
        self.db.add_scope(Scope {
            id: ScopeId::new(0),
            kind: ScopeKind::Enum,
            name,
            class_def: Some(tok),
            start: cur,
            end,
            parent: self.current_scope(),
            function: None,
            variables: Vec::new(),
        });
        self.after(end)
    }

    /// Skip to the token after the terminating `;` of a statement.
    fn skip_statement(&self, tok: TokenId) -> Option<TokenId> {
        let mut cur = Some(tok);
        while let Some(t) = cur {
            match self.text(t) {
                ";" => return self.after(t),
                "(" | "[" | "{" => cur = self.tokens.link(t).and_then(|c| self.after(c)),
                _ => cur = self.after(t),
            }
        }
        None
    }

    /// Skip a `<...>` list starting at `open`; returns the token after `>`.
    fn skip_template(&self, open: TokenId) -> Option<TokenId> {
        let mut depth = 0i32;
        let mut cur = open;
        for _ in 0..MAX_TEMPLATE_TOKENS {
            match self.text(cur) {
                "<" => depth += 1,
                ">" => depth -= 1,
                ">>" => depth -= 2,
                ";" | "{" | "}" => return None,
                "(" | "[" => cur = self.tokens.link(cur)?,
                _ => {}
            }
            if depth <= 0 {
                return self.after(cur);
            }
            cur = self.after(cur)?;
        }
        None
    }

    fn open_control(&mut self, tok: TokenId) {
        let tokens = self.tokens;
        let Some(open) = tokens.next(tok).filter(|&t| tokens.text(t) == "(") else {
            return;
        };
        let Some(brace) = tokens
            .link(open)
            .and_then(|close| tokens.next(close))
            .filter(|&t| tokens.text(t) == "{")
        else {
            return;
        };
        let kind = match tokens.text(tok) {
            "if" => ScopeKind::If,
            "for" => ScopeKind::For,
            "while" => ScopeKind::While,
            "switch" => ScopeKind::Switch,
            _ => ScopeKind::Catch,
        };
        // The frame opens early so condition/init declarations land in it.
        if self.open_scope(brace, kind, String::new(), Some(tok)).is_some() {
            if let Some(first) = tokens.next(open) {
                self.decl_starts.insert(first);
            }
        }
    }

    /// The token before a function name must look like the end of a return
    /// type, a specifier, or a statement boundary.
    fn function_prefix_ok(&self, name: TokenId) -> bool {
        let tokens = self.tokens;
        let mut prev = tokens.previous(name);
        if prev.is_some_and(|p| tokens.text(p) == "~") {
            prev = prev.and_then(|p| tokens.previous(p));
        }
        while let Some(p) = prev.filter(|&p| tokens.text(p) == "::") {
            prev = tokens.previous(p).and_then(|q| tokens.previous(q));
        }
        let Some(prev) = prev else {
            return true;
        };
        match tokens.kind(prev) {
            Some(TokenKind::Type | TokenKind::Name) => true,
            Some(TokenKind::Keyword) => matches!(
                tokens.text(prev),
                "inline" | "static" | "virtual" | "explicit" | "constexpr" | "extern" | "friend"
                    | "const" | "volatile"
            ),
            _ => matches!(tokens.text(prev), ";" | "{" | "}" | ":" | "*" | "&" | "&&" | ">"),
        }
    }

    fn try_function(&mut self, name_tok: TokenId) -> Option<TokenId> {
        let tokens = self.tokens;
        let (name, open) = if tokens.text(name_tok) == "operator" {
            let mut cur = tokens.next(name_tok)?;
            let mut name = String::from("operator");
            // `operator()` has its own pair of parens before the arguments
            if tokens.text(cur) == "(" && tokens.str_at(cur, 1) == ")" {
                name.push_str("()");
                cur = tokens.tok_at(cur, 2)?;
            }
            while tokens.text(cur) != "(" {
                if matches!(tokens.text(cur), ";" | "{" | "}") {
                    return None;
                }
                name.push_str(tokens.text(cur));
                cur = tokens.next(cur)?;
            }
            (name, cur)
        } else {
            (tokens.text(name_tok).to_string(), tokens.next(name_tok)?)
        };
        if tokens.text(open) != "(" || !self.function_prefix_ok(name_tok) {
            return None;
        }
        let close = tokens.link(open)?;
        let (body, resume) = self.function_tail(close)?;

        let fid = self.db.add_function(Function {
            id: FunctionId::new(0),
            name: name.clone(),
            token: name_tok,
            arguments: Vec::new(),
            has_body: body.is_some(),
            body: None,
            nested_in: self.current_scope(),
        });
        let body_scope = body.and_then(|brace| {
            let end = tokens.link(brace)?;
            Some(self.db.add_scope(Scope {
                id: ScopeId::new(0),
                kind: ScopeKind::Function,
                name,
                class_def: Some(name_tok),
                start: brace,
                end,
                parent: self.current_scope(),
                function: Some(fid),
                variables: Vec::new(),
            }))
        });

        let (arguments, names) = self.parse_arguments(open, close, fid, body_scope);
        if let Some(func) = self.db.function_mut(fid) {
            func.arguments = arguments.clone();
            func.body = body_scope;
            func.has_body = body_scope.is_some();
        }
        if let Some(scope) = body_scope.and_then(|id| self.db.scope_mut(id)) {
            scope.variables = arguments;
        }
        self.function_names.push((name_tok, fid));

        if let (Some(brace), Some(scope)) = (body, body_scope) {
            self.pending.insert(
                brace,
                PendingBody {
                    scope,
                    declarative: false,
                    names,
                },
            );
        }
        Some(resume)
    }

    /// Classify what follows an argument list. Returns the body brace (if
    /// any) and the token to resume scanning at.
    fn function_tail(&self, close: TokenId) -> Option<(Option<TokenId>, TokenId)> {
        let tokens = self.tokens;
        let mut cur = tokens.next(close)?;
        loop {
            match tokens.text(cur) {
                "const" | "volatile" | "override" | "final" | "&" | "&&" => {}
                "noexcept" | "throw" => {
                    if tokens.str_at(cur, 1) == "(" {
                        cur = tokens.link(tokens.next(cur)?)?;
                    }
                }
                "->" => {
                    while !matches!(tokens.text(cur), "{" | ";" | "=") {
                        cur = tokens.next(cur)?;
                    }
                    continue;
                }
                _ => break,
            }
            cur = tokens.next(cur)?;
        }

        match tokens.text(cur) {
            ";" => Some((None, cur)),
            "=" => {
                // `= 0;`, `= default;`, `= delete;`
                let semi = tokens.tok_at(cur, 2)?;
                (tokens.text(semi) == ";").then_some((None, semi))
            }
            "{" => Some((Some(cur), cur)),
            ":" => {
                // Constructor initializer list
                let mut t = tokens.next(cur)?;
                loop {
                    match tokens.text(t) {
                        "(" => t = tokens.link(t)?,
                        "{" => {
                            let prev = tokens.previous(t)?;
                            if matches!(tokens.text(prev), ")" | "}") {
                                return Some((Some(t), t));
                            }
                            t = tokens.link(t)?;
                        }
                        ";" => return None,
                        _ => {}
                    }
                    t = tokens.next(t)?;
                }
            }
            _ => None,
        }
    }

    /// Split `( ... )` at top-level commas and declare each argument.
    fn parse_arguments(
        &mut self,
        open: TokenId,
        close: TokenId,
        func: FunctionId,
        body: Option<ScopeId>,
    ) -> (Vec<VarId>, HashMap<String, VarId>) {
        let tokens = self.tokens;
        let mut slices = Vec::new();
        let mut depth = 0i32;
        let mut start = tokens.next(open);
        let mut cur = start;
        while let Some(t) = cur.filter(|&t| t < close) {
            match tokens.text(t) {
                "(" | "[" | "{" => {
                    cur = tokens.link(t).and_then(|c| tokens.next(c));
                    continue;
                }
                "<" => depth += 1,
                ">" => depth -= 1,
                ">>" => depth -= 2,
                "," if depth <= 0 => {
                    slices.push((start, t));
                    start = tokens.next(t);
                }
                _ => {}
            }
            cur = tokens.next(t);
        }
        slices.push((start, close));

        let mut arguments = Vec::new();
        let mut names = HashMap::new();
        for (start, end) in slices {
            let Some(start) = start.filter(|&s| s < end) else {
                continue;
            };
            let len = end.index() - start.index();
            if (len == 1 && tokens.text(start) == "void") || tokens.text(start) == "..." {
                continue;
            }
            let end = tokens
                .range(start, end)
                .find(|&t| tokens.text(t) == "=")
                .unwrap_or(end);
            let Some(mut last) = tokens.previous(end).filter(|&l| l >= start) else {
                continue;
            };
            let mut is_array = false;
            while tokens.text(last) == "]" {
                is_array = true;
                match tokens.link(last).and_then(|l| tokens.previous(l)) {
                    Some(before) if before > start => last = before,
                    _ => break,
                }
            }
            let name = (last > start
                && tokens.kind(last) == Some(TokenKind::Name)
                && tokens.str_at(last, -1) != "::")
                .then_some(last);

            let mut var = Variable::new(VarId::new(0), tokens, name, start, name.unwrap_or(end));
            var.is_argument = true;
            var.is_pointer |= is_array && name.is_some();
            var.function = Some(func);
            var.scope = body;
            let id = self.db.add_variable(var);
            arguments.push(id);
            if let Some(name) = name {
                names.insert(tokens.text(name).to_string(), id);
                self.declared.insert(name);
                self.bindings.push((name, id));
            }
        }
        (arguments, names)
    }

    /// Recognise `specifiers type declarator[, declarator]...` at `start`.
    fn try_declaration(&mut self, start: TokenId) {
        let tokens = self.tokens;
        let mut cur = start;

        while matches!(
            tokens.text(cur),
            "static" | "extern" | "register" | "mutable" | "inline" | "constexpr" | "thread_local"
                | "friend" | "typename" | "struct" | "class" | "union" | "enum"
        ) {
            let Some(next) = tokens.next(cur) else { return };
            cur = next;
        }
        let type_start = cur;
        while matches!(tokens.text(cur), "const" | "volatile") {
            let Some(next) = tokens.next(cur) else { return };
            cur = next;
        }

        // Base type
        match tokens.kind(cur) {
            Some(TokenKind::Type) => {
                while tokens.kind(cur) == Some(TokenKind::Type)
                    || matches!(tokens.text(cur), "const" | "volatile")
                {
                    let Some(next) = tokens.next(cur) else { return };
                    cur = next;
                }
            }
            Some(TokenKind::Name) | Some(TokenKind::Punctuation) => {
                if tokens.text(cur) == "::" {
                    let Some(next) = tokens.next(cur) else { return };
                    cur = next;
                }
                if tokens.kind(cur) != Some(TokenKind::Name) {
                    return;
                }
                if tokens.str_at(cur, 1) != "::" && self.lookup(tokens.text(cur)).is_some() {
                    return;
                }
                let Some(mut next) = tokens.next(cur) else { return };
                loop {
                    if tokens.text(next) == "::"
                        && tokens.next(next).and_then(|t| tokens.kind(t)) == Some(TokenKind::Name)
                    {
                        let Some(after) = tokens.tok_at(next, 2) else { return };
                        next = after;
                    } else if tokens.text(next) == "<" {
                        let Some(after) = self.skip_template(next) else { return };
                        next = after;
                    } else {
                        break;
                    }
                }
                cur = next;
            }
            _ => return,
        }
        let base_end = cur;

        // Declarators
        let mut first = true;
        loop {
            let mut is_pointer = false;
            let mut is_reference = false;
            while matches!(tokens.text(cur), "*" | "&" | "&&" | "const" | "volatile") {
                match tokens.text(cur) {
                    "*" => is_pointer = true,
                    "&" | "&&" => is_reference = true,
                    _ => {}
                }
                let Some(next) = tokens.next(cur) else { return };
                cur = next;
            }
            if tokens.kind(cur) != Some(TokenKind::Name) {
                return;
            }
            let name = cur;
            let Some(after) = tokens.next(name) else { return };
            if !matches!(tokens.text(after), ";" | "=" | "," | "[" | ")" | ":" | "{") {
                return;
            }

            let type_end = if first { name } else { base_end };
            let mut var = Variable::new(VarId::new(0), tokens, Some(name), type_start, type_end);
            var.is_pointer |= is_pointer;
            var.is_reference |= is_reference;
            self.declare(name, var);
            first = false;

            // Skip array suffixes and initializer up to the next declarator
            let mut t = after;
            loop {
                match tokens.text(t) {
                    "(" | "[" | "{" => match tokens.link(t).and_then(|c| tokens.next(c)) {
                        Some(next) => t = next,
                        None => return,
                    },
                    "," => break,
                    ";" | ")" | "}" | ":" => return,
                    _ => match tokens.next(t) {
                        Some(next) => t = next,
                        None => return,
                    },
                }
            }
            let Some(next) = tokens.next(t) else { return };
            cur = next;
        }
    }

    fn declare(&mut self, name: TokenId, mut var: Variable) {
        let scope = self.current_scope();
        var.scope = scope;
        let id = self.db.add_variable(var);
        if let Some(scope) = scope.and_then(|s| self.db.scope_mut(s)) {
            scope.variables.push(id);
        }
        let key = self.text(name).to_string();
        // `extern "C"` frames are transparent
        match self.frames.iter_mut().rev().find(|f| f.scope.is_some()) {
            Some(frame) => frame.names.insert(key, id),
            None => self.globals.insert(key, id),
        };
        self.declared.insert(name);
        self.bindings.push((name, id));
    }

    fn lookup(&self, name: &str) -> Option<VarId> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.names.get(name))
            .or_else(|| self.globals.get(name))
            .copied()
    }

    /// Bind an identifier use to the nearest visible declaration.
    fn bind_use(&mut self, tok: TokenId) {
        if self.kind(tok) != Some(TokenKind::Name) || self.declared.contains(&tok) {
            return;
        }
        let tokens = self.tokens;
        if matches!(tokens.str_at(tok, -1), "." | "->" | "::") || tokens.str_at(tok, 1) == "::" {
            return;
        }
        if let Some(id) = self.lookup(tokens.text(tok)) {
            self.bindings.push((tok, id));
        }
    }
}
