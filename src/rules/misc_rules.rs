//! Undefined and implementation-defined behaviour checks.
//!
//! The body-token rules here are offered each function-body token in
//! registration order and the first one that reports wins, so a token is
//! never reported twice.

use super::{Category, Diagnostic, Rule, Severity};
use crate::engine::AnalysisContext;
use crate::pattern::{simple_match, Pattern};
use crate::symbols::{Scope, ScopeKind, Variable};
use crate::tokens::{TokenId, TokenKind};

/// Character classification and conversion functions from `<ctype.h>`.
pub const CTYPE_FUNCTIONS: &[&str] = &[
    "isalnum", "isalpha", "isascii", "isblank", "iscntrl", "isdigit", "isgraph", "islower",
    "isprint", "ispunct", "isspace", "isupper", "isxdigit", "toascii", "toupper", "tolower",
];

/// A `float *` or `double &` is not a float value.
fn is_float(var: &Variable, ctx: &AnalysisContext) -> bool {
    !var.is_ref_or_pointer() && matches!(var.type_name(ctx.tokens), Some("float" | "double"))
}

fn is_time_t(var: &Variable, ctx: &AnalysisContext) -> bool {
    !var.is_ref_or_pointer() && var.type_name(ctx.tokens) == Some("time_t")
}

fn is_float_variable(ctx: &AnalysisContext, tok: Option<TokenId>) -> bool {
    ctx.variable(tok).is_some_and(|v| is_float(v, ctx))
}

fn is_time_t_variable(ctx: &AnalysisContext, tok: Option<TokenId>) -> bool {
    ctx.variable(tok).is_some_and(|v| is_time_t(v, ctx))
}

fn is_unsigned_variable(ctx: &AnalysisContext, tok: Option<TokenId>) -> bool {
    ctx.variable(tok).is_some_and(|v| v.is_unsigned)
}

fn is_number_or_variable(ctx: &AnalysisContext, tok: Option<TokenId>) -> bool {
    ctx.is_kind(tok, TokenKind::Number) || ctx.is_kind(tok, TokenKind::Variable)
}

/// Detects `==` between a float variable and another float variable or a
/// numeric literal.
pub struct FloatEqualityRule;

impl FloatEqualityRule {
    fn is_float_comparison(ctx: &AnalysisContext, tok: TokenId) -> bool {
        let prev = ctx.tokens.previous(tok);
        let next = ctx.tokens.next(tok);
        let comparable = |other| {
            ctx.is_kind(other, TokenKind::Number) || is_float_variable(ctx, other)
        };
        (is_float_variable(ctx, prev) && comparable(next))
            || (is_float_variable(ctx, next) && comparable(prev))
    }
}

impl Rule for FloatEqualityRule {
    fn id(&self) -> &'static str {
        "float-equality"
    }

    fn name(&self) -> &'static str {
        "Float Equality"
    }

    fn description(&self) -> &'static str {
        "Detects exact == comparison of floating-point values"
    }

    fn category(&self) -> Category {
        Category::Warning
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        if ctx.tokens.text(tok) != "==" || !Self::is_float_comparison(ctx, tok) {
            return Vec::new();
        }
        let mut diag = ctx.diagnostic(
            self,
            tok,
            "Comparing two float variables is improper.\n\
             Floating-point values should not be compared for exact equality; \
             rounding makes the result depend on how each value was computed.",
        );
        diag.suggestion = Some("Compare the difference against an epsilon instead".to_string());
        vec![diag]
    }
}

/// Detects arithmetic applied directly to `time_t` values.
pub struct TimeArithmeticRule;

impl Rule for TimeArithmeticRule {
    fn id(&self) -> &'static str {
        "time-t-arithmetic"
    }

    fn name(&self) -> &'static str {
        "time_t Arithmetic"
    }

    fn description(&self) -> &'static str {
        "Detects arithmetic operators applied to time_t variables"
    }

    fn category(&self) -> Category {
        Category::Warning
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        if ctx.tokens.kind(tok) != Some(TokenKind::ArithmeticOp) {
            return Vec::new();
        }
        if !is_time_t_variable(ctx, ctx.tokens.next(tok))
            && !is_time_t_variable(ctx, ctx.tokens.previous(tok))
        {
            return Vec::new();
        }
        let mut diag = ctx.diagnostic(
            self,
            tok,
            "There is no safe way to manually perform arithmetic on the time_t type.\n\
             The encoding of time_t is unspecified, so its values should not be modified directly \
             (CERT MSC05-CPP).",
        );
        diag.suggestion = Some("Use difftime() or convert through struct tm".to_string());
        vec![diag]
    }
}

/// Detects bitwise operators whose operands are not both known unsigned.
///
/// An operand that is a literal or a variable without a proven unsigned type
/// counts as signed.
pub struct SignedBitwiseRule;

impl Rule for SignedBitwiseRule {
    fn id(&self) -> &'static str {
        "signed-bitwise-operand"
    }

    fn name(&self) -> &'static str {
        "Signed Bitwise Operand"
    }

    fn description(&self) -> &'static str {
        "Detects bitwise operators applied to operands that are not unsigned"
    }

    fn category(&self) -> Category {
        Category::Warning
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        if ctx.tokens.kind(tok) != Some(TokenKind::BitOp) {
            return Vec::new();
        }
        let prev = ctx.tokens.previous(tok);
        let next = ctx.tokens.next(tok);
        if !is_number_or_variable(ctx, prev) || !is_number_or_variable(ctx, next) {
            return Vec::new();
        }
        if is_unsigned_variable(ctx, prev) && is_unsigned_variable(ctx, next) {
            return Vec::new();
        }
        vec![ctx.diagnostic(
            self,
            tok,
            "Bitwise operators should only be used with unsigned integer operands.\n\
             The result of some bitwise operations on signed integers is implementation defined \
             (CERT INT13-CPP).",
        )]
    }
}

/// Detects `<ctype.h>` calls whose argument is a variable that is not unsigned.
pub struct SignedCharArgumentRule {
    pattern: Pattern,
}

impl SignedCharArgumentRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::compile(&format!("{} ( %var% )", CTYPE_FUNCTIONS.join("|"))),
        }
    }
}

impl Default for SignedCharArgumentRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for SignedCharArgumentRule {
    fn id(&self) -> &'static str {
        "signed-char-argument"
    }

    fn name(&self) -> &'static str {
        "Signed Char Argument"
    }

    fn description(&self) -> &'static str {
        "Detects character handling functions called with a possibly negative char"
    }

    fn category(&self) -> Category {
        Category::Warning
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        if !self.pattern.matches(ctx.tokens, Some(tok)) {
            return Vec::new();
        }
        let Some(arg) = ctx.tokens.tok_at(tok, 2) else {
            return Vec::new();
        };
        if ctx.variable(Some(arg)).is_none_or(|v| v.is_unsigned) {
            return Vec::new();
        }
        let mut diag = ctx.diagnostic(
            self,
            arg,
            "Arguments to character handling functions must be representable as an unsigned char.\n\
             The <ctype.h> functions take an int whose value must be EOF or fit in an unsigned char; \
             a negative char is undefined behaviour (CERT STR37-C).",
        );
        diag.suggestion = Some(format!(
            "Cast the argument: {}((unsigned char){})",
            ctx.tokens.text(tok),
            ctx.tokens.text(arg)
        ));
        vec![diag]
    }
}

/// Detects `return errno ;`.
pub struct ReturnErrnoRule;

impl Rule for ReturnErrnoRule {
    fn id(&self) -> &'static str {
        "return-errno"
    }

    fn name(&self) -> &'static str {
        "Return errno"
    }

    fn description(&self) -> &'static str {
        "Detects functions returning errno through a plain int"
    }

    fn category(&self) -> Category {
        Category::Warning
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        if !simple_match(ctx.tokens, Some(tok), "return errno ;") {
            return Vec::new();
        }
        let mut diag = ctx.diagnostic(
            self,
            tok,
            "Functions that return errno should change to a return type of errno_t.\n\
             An int return type does not say whether the function returns an error status, \
             a value, or some combination of the two (CERT DCL09-CPP).",
        );
        diag.suggestion = Some("Declare the function as returning errno_t".to_string());
        vec![diag]
    }
}

/// Detects `for ( float` and `for ( double` loop headers.
pub struct FloatLoopCounterRule;

impl Rule for FloatLoopCounterRule {
    fn id(&self) -> &'static str {
        "float-loop-counter"
    }

    fn name(&self) -> &'static str {
        "Float Loop Counter"
    }

    fn description(&self) -> &'static str {
        "Detects floating-point variables declared as loop counters"
    }

    fn category(&self) -> Category {
        Category::Warning
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
        let start = Some(tok);
        if !simple_match(ctx.tokens, start, "for ( double")
            && !simple_match(ctx.tokens, start, "for ( float")
        {
            return Vec::new();
        }
        let mut diag = ctx.diagnostic(
            self,
            tok,
            "Do not use floating-point variables as loop counters.\n\
             Precision limits differ between implementations, so the number of iterations \
             is not portable (CERT FLP30-CPP).",
        );
        diag.suggestion = Some("Count with an integer and derive the float value".to_string());
        vec![diag]
    }
}

/// Detects declarations added to namespace `std`.
pub struct ModifyStdNamespaceRule;

impl Rule for ModifyStdNamespaceRule {
    fn id(&self) -> &'static str {
        "modify-std-namespace"
    }

    fn name(&self) -> &'static str {
        "Modify std Namespace"
    }

    fn description(&self) -> &'static str {
        "Detects namespace std blocks in user code"
    }

    fn category(&self) -> Category {
        Category::Warning
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_scope(&self, ctx: &AnalysisContext, scope: &Scope) -> Vec<Diagnostic> {
        if scope.kind != ScopeKind::Namespace || scope.name != "std" {
            return Vec::new();
        }
        vec![ctx.diagnostic(
            self,
            scope.class_def.unwrap_or(scope.start),
            "Do not modify the standard namespaces.\n\
             Adding declarations to namespace std is undefined behavior \
             outside a few explicitly permitted specializations (CERT MSC34-CPP).",
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::resolve;
    use crate::tokens::tokenize;
    use crate::Config;
    use std::path::Path;

    fn run_token_rule(rule: &dyn Rule, source: &str) -> Vec<Diagnostic> {
        let mut tokens = tokenize(source);
        let symbols = resolve(&mut tokens);
        let config = Config::default();
        let ctx = AnalysisContext::new(Path::new("test.cpp"), source, &tokens, &symbols, &config);
        let mut out = Vec::new();
        for scope in symbols.function_scopes() {
            for tok in tokens.range(scope.start, scope.end) {
                out.extend(rule.check_token(&ctx, tok));
            }
        }
        out
    }

    fn run_scope_rule(rule: &dyn Rule, source: &str) -> Vec<Diagnostic> {
        let mut tokens = tokenize(source);
        let symbols = resolve(&mut tokens);
        let config = Config::default();
        let ctx = AnalysisContext::new(Path::new("test.cpp"), source, &tokens, &symbols, &config);
        symbols
            .scopes()
            .iter()
            .flat_map(|s| rule.check_scope(&ctx, s))
            .collect()
    }

    #[test]
    fn test_float_equality_with_literal() {
        let diags = run_token_rule(&FloatEqualityRule, "void f() { float x = 0; if (x == 3.14) {} }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule_id, "float-equality");
        assert!(diags[0].message.starts_with("Comparing two float variables is improper.\n"));
    }

    #[test]
    fn test_float_equality_two_doubles_and_literal_on_left() {
        let source = "void f(double a, double b) { if (a == b) {} if (1.0 == a) {} }";
        assert_eq!(run_token_rule(&FloatEqualityRule, source).len(), 2);
    }

    #[test]
    fn test_float_equality_ignores_ints_and_other_ops() {
        let source = "void f(int x, int y, float z) { if (x == y) {} if (z != 1.0) {} if (z < 2.0) {} }";
        assert!(run_token_rule(&FloatEqualityRule, source).is_empty());
    }

    #[test]
    fn test_float_equality_float_vs_int_variable() {
        let source = "void f(float a, int b) { if (a == b) {} }";
        assert!(run_token_rule(&FloatEqualityRule, source).is_empty());
    }

    #[test]
    fn test_time_arithmetic() {
        let source = "void f(time_t t1, time_t t2) { long d = t1 - t2; }";
        let diags = run_token_rule(&TimeArithmeticRule, source);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].column, source.find(" - ").unwrap() + 2);

        let source = "void f(int t1, int t2) { long d = t1 - t2; }";
        assert!(run_token_rule(&TimeArithmeticRule, source).is_empty());
    }

    #[test]
    fn test_pointers_in_declarator_lists_are_not_values() {
        let source = "void f() {\n    float a = 0, *b = 0;\n    if (b == 0) {}\n}\n";
        assert!(run_token_rule(&FloatEqualityRule, source).is_empty());

        let source = "void f() {\n    time_t a = 0, *p = 0;\n    p = p + 1;\n}\n";
        assert!(run_token_rule(&TimeArithmeticRule, source).is_empty());
    }

    #[test]
    fn test_float_reference_is_not_compared() {
        let source = "void f(double& d) { if (d == 0.5) {} }";
        assert!(run_token_rule(&FloatEqualityRule, source).is_empty());
    }

    #[test]
    fn test_time_arithmetic_either_side() {
        let source = "void f(time_t t) { t = 60 + t; t = t * 2; }";
        assert_eq!(run_token_rule(&TimeArithmeticRule, source).len(), 2);
    }

    #[test]
    fn test_signed_bitwise() {
        let source = "void f(int a, unsigned int b, unsigned c) { a = a & 1; b = b | c; c = 4 ^ c; }";
        let diags = run_token_rule(&SignedBitwiseRule, source);
        // `a & 1` and `4 ^ c`; `b | c` are both unsigned
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_signed_bitwise_container_of_unsigned() {
        let source = "void f(std::vector<unsigned> v, std::vector<unsigned> w) { int y = v | w; }";
        let diags = run_token_rule(&SignedBitwiseRule, source);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule_id, "signed-bitwise-operand");
    }

    #[test]
    fn test_signed_bitwise_needs_operands() {
        let source = "void f(int& r, int a) { g(&a); a = ~a; }";
        assert!(run_token_rule(&SignedBitwiseRule, source).is_empty());
    }

    #[test]
    fn test_signed_char_argument() {
        let rule = SignedCharArgumentRule::new();
        let source = "void f() { signed char c = 'a'; if (isalpha(c)) {} }";
        let diags = run_token_rule(&rule, source);
        assert_eq!(diags.len(), 1);
        // Anchored at the argument
        assert_eq!(diags[0].column, source.find("(c)").unwrap() + 2);

        let source = "void f() { unsigned char c = 'a'; if (isalpha(c)) {} }";
        assert!(run_token_rule(&rule, source).is_empty());
    }

    #[test]
    fn test_signed_char_argument_needs_resolved_variable() {
        let rule = SignedCharArgumentRule::new();
        assert!(run_token_rule(&rule, "void f() { toupper(c); tolower(1); }").is_empty());
        assert_eq!(run_token_rule(&rule, "void f(char c) { toupper(c); }").len(), 1);
    }

    #[test]
    fn test_return_errno() {
        let diags = run_token_rule(&ReturnErrnoRule, "int f() { return errno; }");
        assert_eq!(diags.len(), 1);
        assert!(run_token_rule(&ReturnErrnoRule, "int f() { return errno + 1; }").is_empty());
    }

    #[test]
    fn test_float_loop_counter() {
        let source = "void f() { for (double d = 0; d < 1; d += 0.1) {} for (float x = 0; x < 1;) {} for (int i = 0; i < 3; i++) {} }";
        assert_eq!(run_token_rule(&FloatLoopCounterRule, source).len(), 2);
    }

    #[test]
    fn test_modify_std_namespace() {
        let source = "namespace std { }\nnamespace a { namespace std { namespace b {} } }\nnamespace stdx {}";
        let diags = run_scope_rule(&ModifyStdNamespaceRule, source);
        assert_eq!(diags.len(), 2);
        assert_eq!((diags[0].line, diags[0].column), (1, 1));
        assert_eq!(diags[1].line, 2);
    }
}
