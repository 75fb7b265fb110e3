//! Token model: an index-addressed arena of lexical tokens.
//!
//! Tokens live in one `Vec` per translation unit. Neighbours are reached by
//! index arithmetic, bracket pairs through a precomputed link table, so rules
//! never hold references into the arena beyond the lifetime of a pass.

pub mod lexer;

use crate::symbols::{FunctionId, ScopeId, VarId};

pub use lexer::tokenize;

/// Index of a token inside its [`TokenList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl TokenId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Semantic kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier that is neither a keyword nor a resolved variable.
    Name,
    /// Identifier bound to a declared variable.
    Variable,
    Keyword,
    /// Builtin type word (`int`, `unsigned`, `double`, ...).
    Type,
    Number,
    String,
    Char,
    Boolean,
    ComparisonOp,
    ArithmeticOp,
    BitOp,
    LogicalOp,
    AssignmentOp,
    IncDecOp,
    Punctuation,
}

impl TokenKind {
    /// Identifier-like kinds.
    pub fn is_name(self) -> bool {
        matches!(
            self,
            TokenKind::Name | TokenKind::Variable | TokenKind::Keyword | TokenKind::Type | TokenKind::Boolean
        )
    }

    /// Operators that do not modify their operands.
    pub fn is_const_op(self) -> bool {
        matches!(
            self,
            TokenKind::ComparisonOp | TokenKind::ArithmeticOp | TokenKind::BitOp | TokenKind::LogicalOp
        )
    }

    /// Any operator, including assignments and increments.
    pub fn is_op(self) -> bool {
        self.is_const_op() || matches!(self, TokenKind::AssignmentOp | TokenKind::IncDecOp)
    }
}

/// One lexical token with its resolved symbol references.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    pub var_id: Option<VarId>,
    pub function: Option<FunctionId>,
    pub scope: Option<ScopeId>,
}

impl Token {
    pub(crate) fn new(text: impl Into<String>, kind: TokenKind, line: usize, column: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            line,
            column,
            var_id: None,
            function: None,
            scope: None,
        }
    }

    /// Literal contents without the surrounding quotes (and encoding prefix).
    pub fn str_value(&self) -> &str {
        if self.kind != TokenKind::String {
            return &self.text;
        }
        let Some(open) = self.text.find('"') else {
            return &self.text;
        };
        let inner = &self.text[open + 1..];
        inner.strip_suffix('"').unwrap_or(inner)
    }

    /// Single character of a one-character token.
    pub fn single_char(&self) -> Option<char> {
        let mut chars = self.text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

/// All tokens of one translation unit.
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    tokens: Vec<Token>,
    links: Vec<Option<TokenId>>,
}

impl TokenList {
    /// Build a list from raw tokens, linking matching brackets.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let links = link_brackets(&tokens);
        Self { tokens, links }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn first(&self) -> Option<TokenId> {
        (!self.tokens.is_empty()).then(|| TokenId::new(0))
    }

    pub fn ids(&self) -> impl Iterator<Item = TokenId> {
        (0..self.tokens.len()).map(TokenId::new)
    }

    /// Tokens in the half-open range `[start, end)`.
    pub fn range(&self, start: TokenId, end: TokenId) -> impl Iterator<Item = TokenId> {
        let end = end.index().min(self.tokens.len());
        (start.index()..end).map(TokenId::new)
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.index())
    }

    pub fn text(&self, id: TokenId) -> &str {
        self.get(id).map_or("", |t| t.text.as_str())
    }

    pub fn kind(&self, id: TokenId) -> Option<TokenKind> {
        self.get(id).map(|t| t.kind)
    }

    pub fn next(&self, id: TokenId) -> Option<TokenId> {
        self.tok_at(id, 1)
    }

    pub fn previous(&self, id: TokenId) -> Option<TokenId> {
        self.tok_at(id, -1)
    }

    /// Token `offset` positions away, or `None` outside the list.
    pub fn tok_at(&self, id: TokenId, offset: isize) -> Option<TokenId> {
        let target = id.index().checked_add_signed(offset)?;
        (target < self.tokens.len()).then(|| TokenId::new(target))
    }

    /// Text of the token `offset` positions away, empty outside the list.
    pub fn str_at(&self, id: TokenId, offset: isize) -> &str {
        self.tok_at(id, offset).map_or("", |t| self.text(t))
    }

    /// Matching bracket of `(`, `)`, `[`, `]`, `{` or `}`.
    pub fn link(&self, id: TokenId) -> Option<TokenId> {
        self.links.get(id.index()).copied().flatten()
    }

    /// First token of the argument following the one containing `id`.
    ///
    /// Walks forward over nested brackets and stops at the closing `)` of the
    /// enclosing call, in which case there is no next argument.
    pub fn next_argument(&self, id: TokenId) -> Option<TokenId> {
        let mut cur = Some(id);
        while let Some(tok) = cur {
            match self.text(tok) {
                "," => return self.next(tok),
                ")" | ";" => return None,
                "(" | "[" | "{" => cur = self.link(tok).and_then(|close| self.next(close)),
                _ => cur = self.next(tok),
            }
        }
        None
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub(crate) fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(id.index())
    }
}

fn link_brackets(tokens: &[Token]) -> Vec<Option<TokenId>> {
    let mut links = vec![None; tokens.len()];
    let mut stack: Vec<(char, usize)> = Vec::new();

    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Punctuation {
            continue;
        }
        match tok.text.as_str() {
            "(" | "[" | "{" => stack.push((tok.text.as_bytes()[0] as char, i)),
            ")" | "]" | "}" => {
                let open = match tok.text.as_str() {
                    ")" => '(',
                    "]" => '[',
                    _ => '{',
                };
                // Only pop the matching opener; stray closers stay unlinked.
                if let Some(pos) = stack.iter().rposition(|(c, _)| *c == open) {
                    let (_, start) = stack[pos];
                    stack.truncate(pos);
                    links[start] = Some(TokenId::new(i));
                    links[i] = Some(TokenId::new(start));
                }
            }
            _ => {}
        }
    }

    links
}
