use crate::rules::{Diagnostic, Rule};
use crate::symbols::{SymbolDatabase, Variable};
use crate::tokens::{TokenId, TokenKind, TokenList};
use crate::Config;
use std::path::Path;

/// Context passed to rules during analysis of one translation unit
pub struct AnalysisContext<'a> {
    pub file_path: &'a Path,
    pub source: &'a str,
    pub tokens: &'a TokenList,
    pub symbols: &'a SymbolDatabase,
    pub config: &'a Config,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        file_path: &'a Path,
        source: &'a str,
        tokens: &'a TokenList,
        symbols: &'a SymbolDatabase,
        config: &'a Config,
    ) -> Self {
        Self {
            file_path,
            source,
            tokens,
            symbols,
            config,
        }
    }

    /// Resolved variable fact of a token, if any.
    pub fn variable(&self, tok: Option<TokenId>) -> Option<&'a Variable> {
        self.symbols.variable_of(self.tokens, tok?)
    }

    pub fn is_kind(&self, tok: Option<TokenId>, kind: TokenKind) -> bool {
        tok.and_then(|t| self.tokens.kind(t)) == Some(kind)
    }

    /// Build a finding anchored at `tok` with the rule's default severity.
    ///
    /// A token outside the list anchors at the start of the file.
    pub fn diagnostic<R: Rule + ?Sized>(
        &self,
        rule: &R,
        tok: TokenId,
        message: impl Into<String>,
    ) -> Diagnostic {
        let (line, column) = self
            .tokens
            .get(tok)
            .map_or((1, 1), |t| (t.line, t.column));
        Diagnostic {
            rule_id: rule.id(),
            severity: rule.default_severity(),
            message: message.into(),
            file_path: self.file_path.to_path_buf(),
            line,
            column,
            suggestion: None,
        }
    }
}
