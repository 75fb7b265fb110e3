//! Self-checks over code that calls a `Token::Match`-style matcher API.
//!
//! These rules lint analyzers written against a token API like this crate's
//! own: `Token::Match(tok, "pattern")` (general form) and
//! `Token::simpleMatch(tok, "pattern")` (exact form). They are in the
//! `internal` category and only run when it is enabled.

use super::{Category, Diagnostic, Rule, Severity, Walk};
use crate::engine::AnalysisContext;
use crate::pattern::{Pattern, Wildcard};
use crate::tokens::{TokenId, TokenKind};

const GENERAL_CALL: &str = "Token :: Match|findmatch (";
const EXACT_CALL: &str = "Token :: simpleMatch|findsimplematch (";

/// A matcher call with a string-literal pattern argument.
struct MatcherCall<'a> {
    /// The `Token` token starting the call.
    anchor: TokenId,
    function: &'a str,
    pattern: &'a str,
}

fn matcher_call<'a>(
    ctx: &AnalysisContext<'a>,
    tok: TokenId,
    call: &Pattern,
) -> Option<MatcherCall<'a>> {
    let tokens = ctx.tokens;
    if !call.matches(tokens, Some(tok)) {
        return None;
    }
    // Pattern is the second argument
    let first_arg = tokens.tok_at(tok, 4)?;
    let pattern_tok = tokens.get(tokens.next_argument(first_arg)?)?;
    if pattern_tok.kind != TokenKind::String {
        return None;
    }
    Some(MatcherCall {
        anchor: tok,
        function: tokens.str_at(tok, 2),
        pattern: pattern_tok.str_value(),
    })
}

fn is_char_class(piece: &str) -> bool {
    piece.len() > 2 && piece.starts_with('[') && piece.ends_with(']')
}

fn is_alternation(piece: &str) -> bool {
    piece.contains('|') && piece.chars().any(|c| c != '|' && c != '=')
}

/// Wildcard name of a `%name%` or unterminated `%name` piece, and whether
/// the closing `%` is present.
fn percent_name(piece: &str) -> Option<(&str, bool)> {
    let rest = piece.strip_prefix('%')?;
    let (name, terminated) = match rest.find('%') {
        Some(end) => (&rest[..end], true),
        None => (rest, false),
    };
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some((name, terminated))
}

fn is_known_wildcard(name: &str) -> bool {
    Wildcard::KNOWN.contains(&name)
}

/// Alternatives of every piece outside `[...]` classes.
fn alternatives(pattern: &str) -> impl Iterator<Item = &str> {
    pattern
        .split_whitespace()
        .filter(|piece| !is_char_class(piece))
        .flat_map(|piece| piece.split('|'))
}

/// A general-form call whose pattern could use the exact form.
pub struct SimplePatternRule {
    call: Pattern,
}

impl SimplePatternRule {
    pub fn new() -> Self {
        Self {
            call: Pattern::compile(GENERAL_CALL),
        }
    }
}

impl Default for SimplePatternRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for SimplePatternRule {
    fn id(&self) -> &'static str {
        "simple-pattern"
    }

    fn name(&self) -> &'static str {
        "Simple Pattern"
    }

    fn description(&self) -> &'static str {
        "Detects Token::Match calls whose pattern has no wildcards"
    }

    fn category(&self) -> Category {
        Category::Internal
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn walk(&self) -> Walk {
        Walk::WholeUnit
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        let Some(call) = matcher_call(ctx, tok, &self.call) else {
            return Vec::new();
        };
        let pattern = call.pattern;
        let complex = pattern.contains(['[', '|', '%']) || pattern.contains("!!");
        if !pattern.is_empty() && complex {
            return Vec::new();
        }
        vec![ctx.diagnostic(
            self,
            call.anchor,
            format!(
                "Found simple pattern inside Token::{}() call: \"{}\".\n\
                 The pattern is purely literal; Token::simpleMatch() matches it without \
                 interpreting wildcards.",
                call.function, pattern
            ),
        )]
    }
}

/// An exact-form call whose pattern needs the general form.
pub struct ComplexPatternRule {
    call: Pattern,
}

impl ComplexPatternRule {
    pub fn new() -> Self {
        Self {
            call: Pattern::compile(EXACT_CALL),
        }
    }

    fn is_complex_piece(piece: &str) -> bool {
        let percent = piece != "%=" && piece.find('%').is_some_and(|i| i + 1 < piece.len());
        let negated = piece.len() > 2 && piece.starts_with("!!");
        is_char_class(piece) || is_alternation(piece) || percent || negated
    }
}

impl Default for ComplexPatternRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ComplexPatternRule {
    fn id(&self) -> &'static str {
        "complex-pattern"
    }

    fn name(&self) -> &'static str {
        "Complex Pattern"
    }

    fn description(&self) -> &'static str {
        "Detects Token::simpleMatch calls whose pattern uses wildcards or alternations"
    }

    fn category(&self) -> Category {
        Category::Internal
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn walk(&self) -> Walk {
        Walk::WholeUnit
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        let Some(call) = matcher_call(ctx, tok, &self.call) else {
            return Vec::new();
        };
        let pattern = call.pattern;
        if !pattern.is_empty() && !pattern.split_whitespace().any(Self::is_complex_piece) {
            return Vec::new();
        }
        vec![ctx.diagnostic(
            self,
            call.anchor,
            format!(
                "Found complex pattern inside Token::{}() call: \"{}\".\n\
                 The exact form compares every piece verbatim, so wildcards, alternations \
                 and classes in this pattern never match.",
                call.function, pattern
            ),
        )]
    }
}

/// A known wildcard written without its closing `%`.
pub struct MissingPercentCharacterRule {
    call: Pattern,
}

impl MissingPercentCharacterRule {
    pub fn new() -> Self {
        Self {
            call: Pattern::compile(GENERAL_CALL),
        }
    }
}

impl Default for MissingPercentCharacterRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for MissingPercentCharacterRule {
    fn id(&self) -> &'static str {
        "missing-percent-character"
    }

    fn name(&self) -> &'static str {
        "Missing Percent Character"
    }

    fn description(&self) -> &'static str {
        "Detects wildcards missing their terminating % in Token::Match patterns"
    }

    fn category(&self) -> Category {
        Category::Internal
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn walk(&self) -> Walk {
        Walk::WholeUnit
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        let Some(call) = matcher_call(ctx, tok, &self.call) else {
            return Vec::new();
        };
        let missing = alternatives(call.pattern).any(|alt| {
            percent_name(alt).is_some_and(|(name, terminated)| !terminated && is_known_wildcard(name))
        });
        if !missing {
            return Vec::new();
        }
        vec![ctx.diagnostic(
            self,
            call.anchor,
            format!(
                "Missing percent end character in Token::{}() pattern: \"{}\".\n\
                 Without the closing % the wildcard is compared as literal text.",
                call.function, call.pattern
            ),
        )]
    }
}

/// A `%name%` piece naming no known wildcard.
pub struct UnknownPatternRule {
    call: Pattern,
}

impl UnknownPatternRule {
    pub fn new() -> Self {
        Self {
            call: Pattern::compile(GENERAL_CALL),
        }
    }
}

impl Default for UnknownPatternRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UnknownPatternRule {
    fn id(&self) -> &'static str {
        "unknown-pattern"
    }

    fn name(&self) -> &'static str {
        "Unknown Pattern"
    }

    fn description(&self) -> &'static str {
        "Detects unrecognised %wildcard% names in Token::Match patterns"
    }

    fn category(&self) -> Category {
        Category::Internal
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn walk(&self) -> Walk {
        Walk::WholeUnit
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        let Some(call) = matcher_call(ctx, tok, &self.call) else {
            return Vec::new();
        };
        call.pattern
            .split_whitespace()
            .filter(|piece| !is_char_class(piece))
            .filter_map(|piece| {
                piece.split('|').find(|alt| {
                    percent_name(alt).is_some_and(|(name, _)| !is_known_wildcard(name))
                })
            })
            .map(|unknown| {
                ctx.diagnostic(
                    self,
                    call.anchor,
                    format!(
                        "Unknown pattern used: \"{}\".\n\
                         Known wildcards are {}.",
                        unknown,
                        Wildcard::KNOWN
                            .iter()
                            .map(|w| format!("%{}%", w))
                            .collect::<Vec<_>>()
                            .join(" ")
                    ),
                )
            })
            .collect()
    }
}

/// Chained navigation that a single offset accessor can replace.
pub struct RedundantNextPreviousRule {
    back_then_forward: Pattern,
    forward_then_back: Pattern,
    tok_at: Pattern,
    after_tok_at: Pattern,
    triple: Pattern,
}

impl RedundantNextPreviousRule {
    pub fn new() -> Self {
        Self {
            back_then_forward: Pattern::compile("previous ( ) .|-> next|tokAt|strAt|linkAt ("),
            forward_then_back: Pattern::compile("next ( ) .|-> previous|tokAt|strAt|linkAt ("),
            tok_at: Pattern::exact("tokAt ("),
            after_tok_at: Pattern::compile(") .|-> previous|next|tokAt|strAt|linkAt|str|link ("),
            triple: Pattern::compile(
                "next|previous ( ) .|-> next|previous ( ) .|-> next|previous|linkAt|strAt|link|str (",
            ),
        }
    }

    /// The two chained call names, if `tok` starts a redundant chain.
    fn chain<'a>(&self, ctx: &AnalysisContext<'a>, tok: TokenId) -> Option<(&'a str, &'a str)> {
        let tokens = ctx.tokens;
        let start = Some(tok);
        let first_close = if self.back_then_forward.matches(tokens, start)
            || self.forward_then_back.matches(tokens, start)
        {
            tokens.tok_at(tok, 2)
        } else if self.tok_at.matches(tokens, start) {
            tokens
                .next(tok)
                .and_then(|open| tokens.link(open))
                .filter(|&close| self.after_tok_at.matches(tokens, Some(close)))
        } else {
            None
        };

        if let Some(close) = first_close {
            let second = tokens.str_at(close, 2);
            // previous(n)/next(n) style calls with arguments are a different API
            let takes_no_args = matches!(second, "previous" | "next" | "str" | "link");
            if takes_no_args && tokens.str_at(close, 4) != ")" {
                return None;
            }
            return Some((tokens.text(tok), second));
        }

        if self.triple.matches(tokens, start) {
            let first = tokens.text(tok);
            let second = tokens.str_at(tok, 4);
            if first == second {
                return Some((first, second));
            }
        }
        None
    }
}

impl Default for RedundantNextPreviousRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for RedundantNextPreviousRule {
    fn id(&self) -> &'static str {
        "redundant-next-previous"
    }

    fn name(&self) -> &'static str {
        "Redundant Next/Previous"
    }

    fn description(&self) -> &'static str {
        "Detects chained token navigation calls that tokAt/strAt/linkAt can replace"
    }

    fn category(&self) -> Category {
        Category::Internal
    }

    fn default_severity(&self) -> Severity {
        Severity::Style
    }

    fn walk(&self) -> Walk {
        Walk::WholeUnit
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        if !matches!(ctx.tokens.text(tok), "." | "->") {
            return Vec::new();
        }
        let Some(call) = ctx.tokens.next(tok) else {
            return Vec::new();
        };
        let Some((first, second)) = self.chain(ctx, call) else {
            return Vec::new();
        };
        vec![ctx.diagnostic(
            self,
            call,
            format!(
                "Call to 'Token::{}()' followed by 'Token::{}()' can be simplified.\n\
                 A single offset accessor reaches the same token in one step.",
                first, second
            ),
        )]
    }
}
