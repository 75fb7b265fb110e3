//! Explicitly composed rule sets.
//!
//! The engine runs whatever [`RuleSet`] it is given. [`RuleSet::builtin`] is
//! the stock composition; embedders can add or replace rules before running.
//!
//! ```rust,ignore
//! use tokenlint::rules::registry::RuleSet;
//!
//! let mut rules = RuleSet::builtin();
//! rules.add_or_replace_rule(Box::new(MyStricterFloatEqualityRule));
//! let engine = tokenlint::Engine::with_rules(&config, &rules);
//! ```

use super::copy_rules::ComplexObjectCopyingRule;
use super::internal_rules::{
    ComplexPatternRule, MissingPercentCharacterRule, RedundantNextPreviousRule,
    SimplePatternRule, UnknownPatternRule,
};
use super::misc_rules::{
    FloatEqualityRule, FloatLoopCounterRule, ModifyStdNamespaceRule, ReturnErrnoRule,
    SignedBitwiseRule, SignedCharArgumentRule, TimeArithmeticRule,
};
use super::Rule;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// An ordered list of rules with unique IDs.
///
/// Order matters for function-body rules: on each token the first rule
/// that reports wins.
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
    rule_index: HashMap<&'static str, usize>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            rule_index: HashMap::new(),
        }
    }

    /// All built-in rules in evaluation order.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        for rule in all_rules() {
            if let Entry::Vacant(entry) = set.rule_index.entry(rule.id()) {
                entry.insert(set.rules.len());
                set.rules.push(rule);
            }
        }
        set
    }

    /// Add a rule at the end of the evaluation order.
    ///
    /// # Panics
    ///
    /// Panics if a rule with the same ID already exists. Use [`try_add_rule`]
    /// for a non-panicking version.
    ///
    /// [`try_add_rule`]: Self::try_add_rule
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        let id = rule.id();
        if self.try_add_rule(rule).is_err() {
            panic!("Rule with ID '{}' already exists", id);
        }
    }

    /// Try to add a rule.
    ///
    /// # Errors
    ///
    /// Returns `Err` with the rejected rule if a rule with the same ID already exists.
    pub fn try_add_rule(&mut self, rule: Box<dyn Rule>) -> Result<(), Box<dyn Rule>> {
        match self.rule_index.entry(rule.id()) {
            Entry::Occupied(_) => Err(rule),
            Entry::Vacant(entry) => {
                entry.insert(self.rules.len());
                self.rules.push(rule);
                Ok(())
            }
        }
    }

    /// Add a rule, replacing any existing rule with the same ID in place.
    pub fn add_or_replace_rule(&mut self, rule: Box<dyn Rule>) {
        let id = rule.id();
        if let Some(&idx) = self.rule_index.get(id) {
            self.rules[idx] = rule;
            return;
        }
        self.rule_index.insert(id, self.rules.len());
        self.rules.push(rule);
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn get_rule(&self, id: &str) -> Option<&dyn Rule> {
        self.rule_index.get(id).map(|&idx| self.rules[idx].as_ref())
    }

    pub fn has_rule(&self, id: &str) -> bool {
        self.rule_index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Get all built-in rules, in evaluation order.
///
/// The function-body rules come first, in the order their checks are tried
/// on each token.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(FloatEqualityRule),
        Box::new(TimeArithmeticRule),
        Box::new(SignedBitwiseRule),
        Box::new(SignedCharArgumentRule::new()),
        Box::new(ReturnErrnoRule),
        Box::new(FloatLoopCounterRule),
        Box::new(ModifyStdNamespaceRule),
        Box::new(ComplexObjectCopyingRule),
        Box::new(SimplePatternRule::new()),
        Box::new(ComplexPatternRule::new()),
        Box::new(MissingPercentCharacterRule::new()),
        Box::new(UnknownPatternRule::new()),
        Box::new(RedundantNextPreviousRule::new()),
    ]
}

/// Get a built-in rule by its ID
pub fn get_rule(id: &str) -> Option<Box<dyn Rule>> {
    all_rules().into_iter().find(|r| r.id() == id)
}

/// Check if a built-in rule with the given ID exists.
pub fn has_rule(id: &str) -> bool {
    all_rules().iter().any(|r| r.id() == id)
}
