//! Token pattern matching.
//!
//! A pattern is a whitespace-separated list of atoms, each consuming exactly
//! one token. Patterns are compiled once into a [`Pattern`] and matched
//! left-to-right without backtracking.
//!
//! | Atom          | Matches                                              |
//! |---------------|------------------------------------------------------|
//! | `return`      | a token with exactly that text                       |
//! | `float\|double` | any of the alternatives (literals or wildcards)    |
//! | `%var%`       | a token of the wildcard's kind                       |
//! | `!!else`      | any token except `else`, or the end of the stream    |
//! | `[;{}]`       | a one-character token from the set                   |

use crate::symbols::VarId;
use crate::tokens::{Token, TokenId, TokenKind, TokenList};

/// Typed single-token wildcard (`%name%`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    Any,
    Bool,
    Char,
    Comp,
    Num,
    Op,
    Cop,
    Or,
    OrOr,
    Str,
    Type,
    Var,
    VarId,
}

impl Wildcard {
    /// Names accepted between `%` markers.
    pub const KNOWN: &'static [&'static str] = &[
        "any", "bool", "char", "comp", "num", "op", "cop", "or", "oror", "str", "type", "var",
        "varid",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let wildcard = match name {
            "any" => Wildcard::Any,
            "bool" => Wildcard::Bool,
            "char" => Wildcard::Char,
            "comp" => Wildcard::Comp,
            "num" => Wildcard::Num,
            "op" => Wildcard::Op,
            "cop" => Wildcard::Cop,
            "or" => Wildcard::Or,
            "oror" => Wildcard::OrOr,
            "str" => Wildcard::Str,
            "type" => Wildcard::Type,
            "var" => Wildcard::Var,
            "varid" => Wildcard::VarId,
            _ => return None,
        };
        Some(wildcard)
    }

    /// Parse a `%name%` piece.
    fn parse(piece: &str) -> Option<Self> {
        let name = piece.strip_prefix('%')?.strip_suffix('%')?;
        Self::from_name(name)
    }

    fn matches(self, token: &Token, varid: Option<VarId>) -> bool {
        match self {
            Wildcard::Any => true,
            Wildcard::Bool => token.kind == TokenKind::Boolean,
            Wildcard::Char => token.kind == TokenKind::Char,
            Wildcard::Comp => token.kind == TokenKind::ComparisonOp,
            Wildcard::Num => token.kind == TokenKind::Number,
            Wildcard::Op => token.kind.is_op(),
            Wildcard::Cop => token.kind.is_const_op(),
            Wildcard::Or => token.text == "|",
            Wildcard::OrOr => token.text == "||",
            Wildcard::Str => token.kind == TokenKind::String,
            Wildcard::Type => matches!(token.kind, TokenKind::Name | TokenKind::Type),
            Wildcard::Var => token.kind == TokenKind::Variable,
            Wildcard::VarId => {
                token.kind == TokenKind::Variable && varid.is_some() && token.var_id == varid
            }
        }
    }
}

/// One alternative of an alternation atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alternative {
    Literal(String),
    Wildcard(Wildcard),
}

impl Alternative {
    fn matches(&self, token: &Token, varid: Option<VarId>) -> bool {
        match self {
            Alternative::Literal(text) => token.text == *text,
            Alternative::Wildcard(w) => w.matches(token, varid),
        }
    }
}

/// A compiled pattern element; consumes exactly one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Literal(String),
    Alternation(Vec<Alternative>),
    Wildcard(Wildcard),
    Negated(String),
    CharClass(Vec<char>),
}

impl Atom {
    fn compile(piece: &str) -> Atom {
        if let Some(rest) = piece.strip_prefix("!!").filter(|r| !r.is_empty()) {
            return Atom::Negated(rest.to_string());
        }
        if piece.len() > 2 && piece.starts_with('[') && piece.ends_with(']') {
            return Atom::CharClass(piece[1..piece.len() - 1].chars().collect());
        }
        if piece.contains('|') && piece != "|" && piece != "||" {
            let mut alternatives: Vec<Alternative> = piece
                .split('|')
                .filter(|alt| !alt.is_empty())
                .map(|alt| match Wildcard::parse(alt) {
                    Some(w) => Alternative::Wildcard(w),
                    None => Alternative::Literal(alt.to_string()),
                })
                .collect();
            return match alternatives.len() {
                0 => Atom::Literal(piece.to_string()),
                1 => match alternatives.remove(0) {
                    Alternative::Literal(text) => Atom::Literal(text),
                    Alternative::Wildcard(w) => Atom::Wildcard(w),
                },
                _ => Atom::Alternation(alternatives),
            };
        }
        match Wildcard::parse(piece) {
            Some(w) => Atom::Wildcard(w),
            None => Atom::Literal(piece.to_string()),
        }
    }

    /// Match against a token; `None` is the end of the stream.
    fn matches(&self, token: Option<&Token>, varid: Option<VarId>) -> bool {
        let Some(token) = token else {
            return matches!(self, Atom::Negated(_));
        };
        match self {
            Atom::Literal(text) => token.text == *text,
            Atom::Alternation(alternatives) => alternatives.iter().any(|a| a.matches(token, varid)),
            Atom::Wildcard(w) => w.matches(token, varid),
            Atom::Negated(text) => token.text != *text,
            Atom::CharClass(set) => token.single_char().is_some_and(|c| set.contains(&c)),
        }
    }
}

/// A compiled token pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    atoms: Vec<Atom>,
    source: String,
}

impl Pattern {
    /// Compile a general pattern. Never fails: unknown `%name%` pieces are
    /// kept as literals.
    pub fn compile(source: &str) -> Self {
        Self {
            atoms: source.split_whitespace().map(Atom::compile).collect(),
            source: source.to_string(),
        }
    }

    /// Compile a pattern whose every piece is matched verbatim.
    pub fn exact(source: &str) -> Self {
        Self {
            atoms: source
                .split_whitespace()
                .map(|piece| Atom::Literal(piece.to_string()))
                .collect(),
            source: source.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// True when every atom is a plain literal.
    pub fn is_literal(&self) -> bool {
        self.atoms.iter().all(|a| matches!(a, Atom::Literal(_)))
    }

    /// Match starting at `start`. A `None` start matches nothing.
    pub fn matches(&self, tokens: &TokenList, start: Option<TokenId>) -> bool {
        self.match_with(tokens, start, None)
    }

    /// Match with `%varid%` bound to `varid`.
    pub fn matches_varid(&self, tokens: &TokenList, start: Option<TokenId>, varid: VarId) -> bool {
        self.match_with(tokens, start, Some(varid))
    }

    fn match_with(&self, tokens: &TokenList, start: Option<TokenId>, varid: Option<VarId>) -> bool {
        let Some(start) = start else {
            return false;
        };
        let mut index = start.index();
        for atom in &self.atoms {
            let token = tokens.tokens().get(index);
            if !atom.matches(token, varid) {
                return false;
            }
            if token.is_some() {
                index += 1;
            }
        }
        true
    }
}

/// Literal-only match: the tokens at `start` spell `pattern` verbatim.
pub fn simple_match(tokens: &TokenList, start: Option<TokenId>, pattern: &str) -> bool {
    let Some(start) = start else {
        return false;
    };
    let mut cur = Some(start);
    for piece in pattern.split_whitespace() {
        match cur {
            Some(tok) if tokens.text(tok) == piece => cur = tokens.next(tok),
            _ => return false,
        }
    }
    true
}

/// One-shot general match. Rules that match in a loop should compile once.
pub fn token_match(tokens: &TokenList, start: Option<TokenId>, pattern: &str) -> bool {
    Pattern::compile(pattern).matches(tokens, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::resolve;
    use crate::tokens::tokenize;
    use pretty_assertions::assert_eq;

    fn at(tokens: &TokenList, index: usize) -> Option<TokenId> {
        tokens.tok_at(tokens.first()?, index as isize)
    }

    #[test]
    fn test_compile_atoms() {
        let pattern = Pattern::compile("return float|double ; %num% !!else [;{}] | ||");
        assert_eq!(
            pattern.atoms(),
            &[
                Atom::Literal("return".into()),
                Atom::Alternation(vec![
                    Alternative::Literal("float".into()),
                    Alternative::Literal("double".into())
                ]),
                Atom::Literal(";".into()),
                Atom::Wildcard(Wildcard::Num),
                Atom::Negated("else".into()),
                Atom::CharClass(vec![';', '{', '}']),
                Atom::Literal("|".into()),
                Atom::Literal("||".into()),
            ]
        );
    }

    #[test]
    fn test_alternation_with_wildcard_and_empty_parts() {
        let pattern = Pattern::compile(";||%type%");
        assert_eq!(
            pattern.atoms(),
            &[Atom::Alternation(vec![
                Alternative::Literal(";".into()),
                Alternative::Wildcard(Wildcard::Type)
            ])]
        );
        assert_eq!(Pattern::compile("|x|").atoms(), &[Atom::Literal("x".into())]);
    }

    #[test]
    fn test_unknown_wildcard_is_literal() {
        let pattern = Pattern::compile("%foo%");
        assert_eq!(pattern.atoms(), &[Atom::Literal("%foo%".into())]);
        let tokens = tokenize("x");
        assert!(!pattern.matches(&tokens, tokens.first()));
    }

    #[test]
    fn test_wildcards_match_kinds() {
        let mut tokens = tokenize("void f() { float x; if (x == 3.14) { } }");
        resolve(&mut tokens);
        // "if ( x == 3.14 )"
        let if_tok = tokens.ids().find(|&t| tokens.text(t) == "if");
        assert!(token_match(&tokens, if_tok, "if ( %var% %comp% %num% )"));
        assert!(token_match(&tokens, if_tok, "%any% %any% %var% %cop% %num%"));
        assert!(!token_match(&tokens, if_tok, "if ( %num%"));
    }

    #[test]
    fn test_varid_binding() {
        let mut tokens = tokenize("void f(int a, int b) { a = b; }");
        let db = resolve(&mut tokens);
        let a = db.variables().iter().find(|v| v.name == "a").unwrap().id;
        let b = db.variables().iter().find(|v| v.name == "b").unwrap().id;
        let assign = tokens.ids().filter(|&t| tokens.text(t) == "a").nth(1);
        let pattern = Pattern::compile("%varid% = %var% ;");
        assert!(pattern.matches_varid(&tokens, assign, a));
        assert!(!pattern.matches_varid(&tokens, assign, b));
        // Unbound %varid% never matches
        assert!(!pattern.matches(&tokens, assign));
    }

    #[test]
    fn test_negation_matches_end_of_stream() {
        let tokens = tokenize("if ( x ) { }");
        let close = at(&tokens, 5);
        assert!(token_match(&tokens, close, "} !!else"));
        assert!(!token_match(&tokens, close, "} %any%"));

        let tokens = tokenize("} else");
        assert!(!token_match(&tokens, tokens.first(), "} !!else"));
    }

    #[test]
    fn test_never_matches_past_end() {
        let tokens = tokenize("return errno");
        assert!(!simple_match(&tokens, tokens.first(), "return errno ;"));
        assert!(!token_match(&tokens, tokens.first(), "return errno ;"));
        assert!(!simple_match(&tokens, None, "return"));
    }

    #[test]
    fn test_exact_form_equals_general_form_on_literals() {
        let tokens = tokenize("for ( double d = 0 ; ; ) { }");
        for pattern in ["for ( double", "for ( float", "for", "( double", "for ( double d = 0 ; ; ) { } x"] {
            for start in tokens.ids() {
                let simple = simple_match(&tokens, Some(start), pattern);
                assert_eq!(simple, token_match(&tokens, Some(start), pattern), "{pattern}");
                assert_eq!(simple, Pattern::exact(pattern).matches(&tokens, Some(start)));
            }
        }
    }

    #[test]
    fn test_exact_form_does_not_interpret_wildcards() {
        let tokens = tokenize("3.14");
        let exact = Pattern::exact("%num%");
        let general = Pattern::compile("%num%");
        assert!(exact.is_literal());
        assert!(!general.is_literal());
        assert!(!exact.matches(&tokens, tokens.first()));
        assert!(general.matches(&tokens, tokens.first()));
    }

    #[test]
    fn test_char_class() {
        let tokens = tokenize("; x {");
        let class = Pattern::compile("[;{}]");
        assert!(class.matches(&tokens, tokens.first()));
        assert!(!class.matches(&tokens, at(&tokens, 1)));
        assert!(class.matches(&tokens, at(&tokens, 2)));
    }
}
