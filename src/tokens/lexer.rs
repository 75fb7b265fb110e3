//! C/C++ lexer built on logos.
//!
//! Produces the token arena consumed by symbol resolution and the rules.
//! Comments and preprocessor directives are dropped; everything else becomes
//! exactly one [`Token`]. The lexer never fails: bytes logos cannot match are
//! kept as single punctuation tokens.

use super::{Token, TokenKind, TokenList};
use logos::Logos;

/// Raw lexical classes recognised by logos.
///
/// Identifiers and operators are classified further by text afterwards,
/// which keeps the keyword tables out of the DFA.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f\v]+")]
enum RawToken {
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[token("/*", skip_block_comment)]
    BlockComment,

    #[token("#", skip_directive)]
    Directive,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9]([0-9A-Za-z_.']|[eEpP][+-])*")]
    #[regex(r"\.[0-9]([0-9A-Za-z_.']|[eEpP][+-])*")]
    Number,

    #[regex(r#"(L|u8|u|U)?"([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"(L|u8|u|U)?'([^'\\\n]|\\.)*'")]
    Char,

    // Longest match wins, so multi-character operators need no ordering.
    #[token("::")]
    #[token("->*")]
    #[token("->")]
    #[token(".*")]
    #[token("...")]
    #[token("<=>")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("<<")]
    #[token(">>")]
    #[token("<=")]
    #[token(">=")]
    #[token("==")]
    #[token("!=")]
    #[token("&&")]
    #[token("||")]
    #[token("++")]
    #[token("--")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("<")]
    #[token(">")]
    #[token("=")]
    #[token("!")]
    #[token("~")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("?")]
    #[token(":")]
    #[token(";")]
    #[token(",")]
    #[token(".")]
    #[token("(")]
    #[token(")")]
    #[token("[")]
    #[token("]")]
    #[token("{")]
    #[token("}")]
    Operator,
}

fn skip_block_comment(lex: &mut logos::Lexer<RawToken>) -> logos::Skip {
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end) => lex.bump(end + 2),
        // Unterminated comment - consume to end
        None => lex.bump(remainder.len()),
    }
    logos::Skip
}

/// Consume a preprocessor line, honouring backslash continuations.
fn skip_directive(lex: &mut logos::Lexer<RawToken>) -> logos::Skip {
    let bytes = lex.remainder().as_bytes();
    let mut end = bytes.len();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            b'\\' if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') => i += 3,
            b'\n' => {
                end = i;
                break;
            }
            _ => i += 1,
        }
    }
    lex.bump(end);
    logos::Skip
}

const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "asm", "break", "case", "catch", "class", "const", "const_cast",
    "constexpr", "continue", "decltype", "default", "delete", "do", "dynamic_cast", "else",
    "enum", "explicit", "export", "extern", "final", "for", "friend", "goto", "if", "inline",
    "mutable", "namespace", "new", "noexcept", "nullptr", "operator", "override", "private",
    "protected", "public", "register", "reinterpret_cast", "return", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this", "thread_local",
    "throw", "try", "typedef", "typeid", "typename", "union", "using", "virtual", "volatile",
    "while",
];

const TYPE_WORDS: &[&str] = &[
    "auto", "bool", "char", "char8_t", "char16_t", "char32_t", "double", "float", "int",
    "long", "short", "signed", "unsigned", "void", "wchar_t",
];

fn classify_word(word: &str) -> TokenKind {
    match word {
        "true" | "false" => TokenKind::Boolean,
        w if TYPE_WORDS.contains(&w) => TokenKind::Type,
        w if KEYWORDS.contains(&w) => TokenKind::Keyword,
        _ => TokenKind::Name,
    }
}

fn classify_operator(op: &str) -> TokenKind {
    match op {
        "==" | "!=" | "<" | ">" | "<=" | ">=" | "<=>" => TokenKind::ComparisonOp,
        "+" | "-" | "*" | "/" | "%" | "<<" | ">>" => TokenKind::ArithmeticOp,
        "&" | "|" | "^" | "~" => TokenKind::BitOp,
        "&&" | "||" | "!" => TokenKind::LogicalOp,
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=" => {
            TokenKind::AssignmentOp
        }
        "++" | "--" => TokenKind::IncDecOp,
        _ => TokenKind::Punctuation,
    }
}

/// Byte offsets of line starts, for offset -> (line, column) lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line.saturating_sub(1)];
        (line.max(1), offset - start + 1)
    }
}

/// Tokenize C/C++ source into a linked token arena.
pub fn tokenize(source: &str) -> TokenList {
    let index = LineIndex::new(source);
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let slice = lexer.slice();
        let (line, column) = index.line_col(lexer.span().start);
        let kind = match result {
            Ok(RawToken::Ident) => classify_word(slice),
            Ok(RawToken::Number) => TokenKind::Number,
            Ok(RawToken::Str) => TokenKind::String,
            Ok(RawToken::Char) => TokenKind::Char,
            Ok(RawToken::Operator) => classify_operator(slice),
            // Skipped variants never reach here
            Ok(RawToken::LineComment | RawToken::BlockComment | RawToken::Directive) => continue,
            Err(()) => {
                tracing::trace!(line, column, text = slice, "unrecognised input kept as punctuation");
                TokenKind::Punctuation
            }
        };
        tokens.push(Token::new(slice, kind, line, column));
    }

    TokenList::from_tokens(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source).tokens().iter().map(|t| t.text.clone()).collect()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).tokens().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_skips_comments_and_directives() {
        let src = "#include <vector>\n#define X \\\n  1\n// note\nint /* inline */ x;";
        assert_eq!(texts(src), vec!["int", "x", ";"]);
    }

    #[test]
    fn test_operator_longest_match() {
        assert_eq!(
            texts("a<<=b->c::d...e<=>f"),
            vec!["a", "<<=", "b", "->", "c", "::", "d", "...", "e", "<=>", "f"]
        );
    }

    #[test]
    fn test_operator_kinds() {
        assert_eq!(
            kinds("== + & && = ++ ; <<"),
            vec![
                TokenKind::ComparisonOp,
                TokenKind::ArithmeticOp,
                TokenKind::BitOp,
                TokenKind::LogicalOp,
                TokenKind::AssignmentOp,
                TokenKind::IncDecOp,
                TokenKind::Punctuation,
                TokenKind::ArithmeticOp,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds("3.14 0x1F 1e+5 .5f 'c' \"s\" true"),
            vec![
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Char,
                TokenKind::String,
                TokenKind::Boolean,
            ]
        );
        assert_eq!(texts("x = 1e+5;"), vec!["x", "=", "1e+5", ";"]);
    }

    #[test]
    fn test_words() {
        assert_eq!(
            kinds("return unsigned time_t"),
            vec![TokenKind::Keyword, TokenKind::Type, TokenKind::Name]
        );
    }

    #[test]
    fn test_line_and_column() {
        let tokens = tokenize("int a;\n  float b;");
        let b = &tokens.tokens()[4];
        assert_eq!(b.text, "b");
        assert_eq!((b.line, b.column), (2, 9));
    }

    #[test]
    fn test_unknown_bytes_are_kept() {
        let tokens = tokenize("a @ b");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.tokens()[1].kind, TokenKind::Punctuation);
    }
}
