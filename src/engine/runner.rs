//! Rule dispatch over one translation unit.

use super::context::AnalysisContext;
use super::file_analyzer::extract_panic_message;
use crate::rules::registry::RuleSet;
use crate::rules::{Diagnostic, DiagnosticSink, Rule, Severity, Walk};
use crate::symbols::{ScopeId, ScopeKind};
use crate::tokens::TokenId;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A rule that survived config filtering, with its effective severity.
struct ActiveRule<'r> {
    rule: &'r dyn Rule,
    severity: Severity,
    walk: Walk,
    panicked: bool,
}

impl ActiveRule<'_> {
    /// Run one hook and forward its findings. Returns whether anything was reported.
    ///
    /// A rule that panics is logged and not called again for this unit.
    fn run<F>(&mut self, ctx: &AnalysisContext, sink: &mut dyn DiagnosticSink, hook: F) -> bool
    where
        F: FnOnce(&dyn Rule) -> Vec<Diagnostic>,
    {
        if self.panicked {
            return false;
        }

        let rule = self.rule;
        match catch_unwind(AssertUnwindSafe(|| hook(rule))) {
            Ok(diagnostics) => {
                let fired = !diagnostics.is_empty();
                for mut diag in diagnostics {
                    diag.severity = self.severity;
                    sink.report(diag);
                }
                fired
            }
            Err(payload) => {
                tracing::warn!(
                    rule = rule.id(),
                    path = %ctx.file_path.display(),
                    "rule panicked: {}",
                    extract_panic_message(&payload)
                );
                self.panicked = true;
                false
            }
        }
    }
}

/// Innermost function body scope enclosing `tok`.
fn owning_function_scope(ctx: &AnalysisContext, tok: TokenId) -> Option<ScopeId> {
    let mut scope = ctx.symbols.scope(ctx.tokens.get(tok)?.scope?)?;
    while scope.kind != ScopeKind::Function {
        scope = ctx.symbols.scope(scope.parent?)?;
    }
    Some(scope.id)
}

/// Run every enabled rule of `rules` over the unit in `ctx`.
///
/// Order of findings: per function body, signature hooks then body tokens;
/// then scope hooks over the whole scope table; then whole-unit token rules.
/// On each body token the first rule that reports wins.
pub fn run_rules(ctx: &AnalysisContext, rules: &RuleSet, sink: &mut dyn DiagnosticSink) {
    let mut active: Vec<ActiveRule> = rules
        .rules()
        .iter()
        .filter_map(|rule| {
            let severity =
                ctx.config
                    .rule_severity(rule.id(), rule.category(), rule.default_severity())?;
            Some(ActiveRule {
                rule: rule.as_ref(),
                severity,
                walk: rule.walk(),
                panicked: false,
            })
        })
        .collect();

    if active.is_empty() {
        return;
    }

    for scope in ctx.symbols.function_scopes() {
        if let Some(func) = scope.function.and_then(|id| ctx.symbols.function(id)) {
            for rule in active.iter_mut() {
                rule.run(ctx, sink, |r| r.check_function(ctx, func));
            }
        }

        for tok in ctx.tokens.range(scope.start, scope.end) {
            // Bodies of nested functions (local class members) get their own pass
            if owning_function_scope(ctx, tok).is_some_and(|owner| owner != scope.id) {
                continue;
            }
            for rule in active
                .iter_mut()
                .filter(|r| r.walk == Walk::FunctionBodies)
            {
                if rule.run(ctx, sink, |r| r.check_token(ctx, tok)) {
                    break;
                }
            }
        }
    }

    for scope in ctx.symbols.scopes() {
        for rule in active.iter_mut() {
            rule.run(ctx, sink, |r| r.check_scope(ctx, scope));
        }
    }

    for rule in active.iter_mut().filter(|r| r.walk == Walk::WholeUnit) {
        for tok in ctx.tokens.ids() {
            rule.run(ctx, sink, |r| r.check_token(ctx, tok));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSeverity;
    use crate::rules::Category;
    use crate::symbols::{resolve, SymbolDatabase};
    use crate::tokens::{tokenize, TokenList};
    use crate::Config;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn unit(source: &str) -> (TokenList, SymbolDatabase) {
        let mut tokens = tokenize(source);
        let symbols = resolve(&mut tokens);
        (tokens, symbols)
    }

    fn run(source: &str, config: &Config, rules: &RuleSet) -> Vec<Diagnostic> {
        let (tokens, symbols) = unit(source);
        let ctx = AnalysisContext::new(Path::new("unit.cpp"), source, &tokens, &symbols, config);
        let mut sink = Vec::new();
        run_rules(&ctx, rules, &mut sink);
        sink
    }

    fn ids(diags: &[Diagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.rule_id).collect()
    }

    const MIXED: &str = "\
namespace std { int extra; }
void copy(std::vector<int> v)
{
    float f = 0.5;
    if (f == 1.0) {}
    return errno;
}
";

    #[test]
    fn test_builtin_order() {
        let diags = run(MIXED, &Config::default(), &RuleSet::builtin());
        assert_eq!(
            ids(&diags),
            vec![
                "complex-object-copying",
                "float-equality",
                "return-errno",
                "modify-std-namespace"
            ]
        );
        assert_eq!(diags[0].severity, Severity::Performance);
        assert_eq!(diags[1].line, 5);
    }

    #[test]
    fn test_idempotent() {
        let (tokens, symbols) = unit(MIXED);
        let config = Config::default();
        let rules = RuleSet::builtin();
        let ctx = AnalysisContext::new(Path::new("unit.cpp"), MIXED, &tokens, &symbols, &config);

        let mut first = Vec::new();
        run_rules(&ctx, &rules, &mut first);
        let mut second = Vec::new();
        run_rules(&ctx, &rules, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_disabled_category_is_skipped() {
        let config = Config {
            enable: vec![Category::Warning],
            ..Config::default()
        };
        let diags = run(MIXED, &config, &RuleSet::builtin());
        assert!(!ids(&diags).contains(&"complex-object-copying"));
    }

    #[test]
    fn test_rule_overrides() {
        let mut config = Config::default();
        config.rules.insert("float-equality".to_string(), RuleSeverity::Deny);
        config.rules.insert("modify-std-namespace".to_string(), RuleSeverity::Allow);

        let diags = run(MIXED, &config, &RuleSet::builtin());
        assert_eq!(
            ids(&diags),
            vec!["complex-object-copying", "float-equality", "return-errno"]
        );
        assert_eq!(diags[1].severity, Severity::Error);
    }

    #[test]
    fn test_internal_rules_are_opt_in() {
        let source = "void f(const Token *tok) { Token::Match(tok, \"foo ;\"); }";
        assert!(run(source, &Config::default(), &RuleSet::builtin()).is_empty());

        let config = Config {
            enable: vec![Category::Internal],
            ..Config::default()
        };
        assert_eq!(ids(&run(source, &config, &RuleSet::builtin())), vec!["simple-pattern"]);
    }

    struct EveryToken;

    impl Rule for EveryToken {
        fn id(&self) -> &'static str {
            "every-token"
        }
        fn name(&self) -> &'static str {
            "Every Token"
        }
        fn description(&self) -> &'static str {
            "Reports every body token"
        }
        fn category(&self) -> Category {
            Category::Warning
        }
        fn default_severity(&self) -> Severity {
            Severity::Style
        }
        fn check_token(&self, ctx: &AnalysisContext, tok: TokenId) -> Vec<Diagnostic> {
            vec![ctx.diagnostic(self, tok, "Token.\nSeen.")]
        }
    }

    #[test]
    fn test_first_rule_wins_on_a_token() {
        let mut rules = RuleSet::new();
        rules.add_rule(Box::new(EveryToken));
        rules.add_rule(Box::new(crate::rules::misc_rules::ReturnErrnoRule));

        let diags = run("int f() { return errno; }", &Config::default(), &rules);
        assert!(diags.iter().all(|d| d.rule_id == "every-token"));
        // `{ return errno ;` with the closing brace excluded
        assert_eq!(diags.len(), 4);
    }

    #[test]
    fn test_local_class_member_body_is_scanned_once() {
        let source = "int f(){ struct L { int g(){ return errno; } }; return 0; }";
        let diags = run(source, &Config::default(), &RuleSet::builtin());
        assert_eq!(ids(&diags), vec!["return-errno"]);

        let mut rules = RuleSet::new();
        rules.add_rule(Box::new(EveryToken));
        let diags = run(source, &Config::default(), &rules);
        let mut positions: Vec<_> = diags.iter().map(|d| d.column).collect();
        positions.sort_unstable();
        positions.dedup();
        assert_eq!(positions.len(), diags.len());
    }

    struct Panicky;

    impl Rule for Panicky {
        fn id(&self) -> &'static str {
            "panicky"
        }
        fn name(&self) -> &'static str {
            "Panicky"
        }
        fn description(&self) -> &'static str {
            "Always panics"
        }
        fn category(&self) -> Category {
            Category::Warning
        }
        fn default_severity(&self) -> Severity {
            Severity::Warning
        }
        fn check_token(&self, _ctx: &AnalysisContext, _tok: TokenId) -> Vec<Diagnostic> {
            panic!("boom");
        }
    }

    #[test]
    fn test_panicking_rule_is_isolated() {
        let mut rules = RuleSet::new();
        rules.add_rule(Box::new(Panicky));
        rules.add_rule(Box::new(crate::rules::misc_rules::ReturnErrnoRule));

        let diags = run("int f() { return errno; }", &Config::default(), &rules);
        assert_eq!(ids(&diags), vec!["return-errno"]);
    }
}
