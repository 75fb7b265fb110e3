//! Performance checks for objects passed by value.

use super::{Category, Diagnostic, Rule, Severity};
use crate::engine::AnalysisContext;
use crate::symbols::Function;

/// Standard container templates that are expensive to copy.
pub const COMPLEX_CONTAINERS: &[&str] = &[
    "array",
    "vector",
    "deque",
    "list",
    "forward_list",
    "stack",
    "queue",
    "priority_queue",
    "set",
    "map",
    "multimap",
    "multiset",
    "unordered_set",
    "unordered_map",
    "unordered_multimap",
    "unordered_multiset",
];

/// Detects standard containers passed to a function by value.
///
/// Runs once per defined function over its argument list. Each by-value
/// argument is reported at most once, at the function's name token.
pub struct ComplexObjectCopyingRule;

impl Rule for ComplexObjectCopyingRule {
    fn id(&self) -> &'static str {
        "complex-object-copying"
    }

    fn name(&self) -> &'static str {
        "Complex Object Copying"
    }

    fn description(&self) -> &'static str {
        "Detects standard containers passed by value instead of by reference or pointer"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn default_severity(&self) -> Severity {
        Severity::Performance
    }

    fn check_function(&self, ctx: &AnalysisContext, func: &Function) -> Vec<Diagnostic> {
        // We only look at functions with a body
        if !func.has_body {
            return Vec::new();
        }

        let mut diagnostics = Vec::new();
        for var in func.arguments.iter().filter_map(|&id| ctx.symbols.variable(id)) {
            if var.is_ref_or_pointer() {
                continue;
            }

            let copies_container = var
                .type_tokens(ctx.tokens)
                .any(|tok| COMPLEX_CONTAINERS.contains(&ctx.tokens.text(tok)));
            if !copies_container {
                continue;
            }

            let mut diag = ctx.diagnostic(
                self,
                func.token,
                format!(
                    "Complex objects copying in Function {} may slow down system performance.\n\
                     Please use pointer or reference instead.",
                    func.name
                ),
            );
            let name = if var.name.is_empty() { "argument" } else { var.name.as_str() };
            diag.suggestion = Some(format!("Pass {} as a const reference", name));
            diagnostics.push(diag);
        }
        diagnostics
    }
}
