//! The keyword rule registry.
//!
//! A [`Rules`] value groups keyword definitions by the JSON data type they
//! apply to (a [`RuleGroup`]) and keeps each group in the order keywords
//! should be checked in. This mirrors the way the compiler walks a schema:
//! for every data type a value could be, the matching group's rules are
//! consulted in order, and only the rules whose keyword is actually present
//! on the schema fire.
//!
//! The registry is additive: [`Rules::add_keyword`] can register new
//! keywords (optionally scoped to a `before` neighbour, mirroring Ajv's
//! `before` hint) at any point, and [`Rules::remove_keyword`] unregisters
//! them again. Built-in keywords are registered once, in
//! [`Rules::with_builtins`], in the same order the compiler historically
//! checked them in.
use crate::primitive_type::PrimitiveType;
use std::fmt;

/// A target JSON type a [`RuleGroup`] collects keywords for. `Any` holds
/// keywords that apply regardless of the instance's type (`type`, `enum`,
/// `const`, `$ref`, ...).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub(crate) enum RuleType {
    Any,
    Type(PrimitiveType),
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::Any => f.write_str("any"),
            RuleType::Type(t) => write!(f, "{t}"),
        }
    }
}

/// A single keyword definition: its name, the types it applies to, and the
/// declarative ordering hints used when it is registered.
#[derive(Debug, Clone)]
pub(crate) struct Rule {
    pub(crate) keyword: String,
    pub(crate) types: Vec<RuleType>,
    /// If set, this rule is spliced immediately ahead of the named keyword
    /// within every group it belongs to, instead of being appended.
    pub(crate) before: Option<String>,
    /// Keywords implied by this one; registering this rule also registers
    /// (or is assumed to already have registered) these.
    pub(crate) implements: Vec<String>,
    /// Whether this keyword accepts the `{"$data": <pointer>}` runtime
    /// reference form in addition to a literal schema value.
    pub(crate) data: bool,
}

impl Rule {
    pub(crate) fn new(keyword: &str, types: &[RuleType]) -> Self {
        Rule {
            keyword: keyword.to_string(),
            types: types.to_vec(),
            before: None,
            implements: Vec::new(),
            data: false,
        }
    }
    pub(crate) fn before(mut self, keyword: &str) -> Self {
        self.before = Some(keyword.to_string());
        self
    }
    pub(crate) fn implements(mut self, keyword: &str) -> Self {
        self.implements.push(keyword.to_string());
        self
    }
    pub(crate) fn data(mut self) -> Self {
        self.data = true;
        self
    }
}

/// An ordered list of [`Rule`]s that apply to the same [`RuleType`].
#[derive(Debug, Clone, Default)]
pub(crate) struct RuleGroup {
    rules: Vec<Rule>,
}

impl RuleGroup {
    fn insert(&mut self, rule: Rule, warnings: &mut Vec<String>) {
        if let Some(before) = rule.before.clone() {
            if let Some(index) = self.rules.iter().position(|r| r.keyword == before) {
                self.rules.insert(index, rule);
                return;
            }
            warnings.push(format!(
                "keyword `{}` declared `before: {before}`, but `{before}` is not registered yet; appending instead",
                rule.keyword
            ));
        }
        self.rules.push(rule);
    }
    fn remove(&mut self, keyword: &str) {
        self.rules.retain(|r| r.keyword != keyword);
    }
    /// Keywords in this group, in the order they should be dispatched.
    pub(crate) fn keywords_in_order(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.keyword.as_str())
    }
}

/// The keyword rule registry (`RULES` in the specification).
///
/// Three views are kept in sync on every mutation: `all` (keyword -> rule),
/// `present` (a fast membership set) and `groups` (the ordered per-type rule
/// groups actually consulted by the compiler).
#[derive(Debug, Clone, Default)]
pub(crate) struct Rules {
    all: Vec<Rule>,
    groups: Vec<(RuleType, RuleGroup)>,
    pub(crate) warnings: Vec<String>,
}

/// Keyword names must look like an identifier, optionally prefixed with `$`
/// or `_`, matching Ajv's `^[a-z_$][a-z0-9_$-]*$`.
pub(crate) fn is_valid_keyword_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '$' | '-'))
}

impl Rules {
    /// An empty registry with no keywords registered at all.
    pub(crate) fn empty() -> Self {
        Rules::default()
    }

    /// The registry pre-loaded with every keyword this crate implements,
    /// in the order the hand-written compiler historically dispatched them.
    pub(crate) fn with_builtins() -> Self {
        use PrimitiveType::{Array, Boolean, Integer, Null, Number, Object, String as Str};
        use RuleType::{Any, Type};

        let mut rules = Rules::empty();
        let defs: &[Rule] = &[
            Rule::new("$ref", &[Any]),
            Rule::new("type", &[Any]),
            // Not dispatched on its own; folded into `type`'s effective value by the
            // compiler (see `compiler::nullable_effective_type`). Registered here so it
            // is recognized as a known keyword (duplicate checks, strict mode).
            Rule::new("nullable", &[Any]).before("type"),
            Rule::new("enum", &[Any]),
            Rule::new("const", &[Any]),
            Rule::new("allOf", &[Any]),
            Rule::new("anyOf", &[Any]),
            Rule::new("oneOf", &[Any]),
            Rule::new("not", &[Any]),
            Rule::new("if", &[Any]),
            Rule::new("format", &[Type(Str)]),
            Rule::new("pattern", &[Type(Str)]),
            Rule::new("minLength", &[Type(Str)]),
            Rule::new("maxLength", &[Type(Str)]).before("minLength"),
            Rule::new("multipleOf", &[Type(Number), Type(Integer)]),
            Rule::new("minimum", &[Type(Number), Type(Integer)]).data(),
            Rule::new("maximum", &[Type(Number), Type(Integer)])
                .before("minimum")
                .data(),
            Rule::new("exclusiveMinimum", &[Type(Number), Type(Integer)]),
            Rule::new("exclusiveMaximum", &[Type(Number), Type(Integer)])
                .before("exclusiveMinimum"),
            Rule::new("properties", &[Type(Object)]),
            Rule::new("patternProperties", &[Type(Object)]).implements("properties"),
            Rule::new("additionalProperties", &[Type(Object)]),
            Rule::new("propertyNames", &[Type(Object)]),
            Rule::new("required", &[Type(Object)]),
            Rule::new("dependencies", &[Type(Object)]),
            Rule::new("minProperties", &[Type(Object)]),
            Rule::new("maxProperties", &[Type(Object)]).before("minProperties"),
            Rule::new("items", &[Type(Array)]),
            Rule::new("additionalItems", &[Type(Array)]).implements("items"),
            Rule::new("contains", &[Type(Array)]),
            Rule::new("minItems", &[Type(Array)]),
            Rule::new("maxItems", &[Type(Array)]).before("minItems"),
            Rule::new("uniqueItems", &[Type(Array)]),
            Rule::new("$async", &[Any]),
        ];
        for rule in defs {
            rules.add_keyword_rule(rule.clone());
        }
        // Keywords whose data-type bucket is informative but not dispatch-relevant
        // (boolean/null/integer have no keywords of their own beyond the shared
        // numeric ones above); kept so `groups_for` never panics on a missing
        // bucket for a primitive type.
        for t in [Boolean, Null, Integer] {
            rules.ensure_group(Type(t));
        }
        rules
    }

    fn ensure_group(&mut self, rule_type: RuleType) -> &mut RuleGroup {
        if let Some(index) = self.groups.iter().position(|(t, _)| *t == rule_type) {
            &mut self.groups[index].1
        } else {
            self.groups.push((rule_type, RuleGroup::default()));
            let last = self.groups.len() - 1;
            &mut self.groups[last].1
        }
    }

    fn add_keyword_rule(&mut self, rule: Rule) {
        for t in rule.types.clone() {
            let mut warnings = std::mem::take(&mut self.warnings);
            self.ensure_group(t).insert(rule.clone(), &mut warnings);
            self.warnings = warnings;
        }
        self.all.push(rule);
    }

    /// Register a new keyword definition. Mirrors Ajv's `addKeyword`:
    /// rejects invalid names and duplicates, splices `before` hints, and
    /// recursively registers anything the keyword `implements`.
    pub(crate) fn add_keyword(
        &mut self,
        keyword: &str,
        types: &[RuleType],
        before: Option<&str>,
        implements: &[&str],
        data: bool,
    ) -> Result<(), String> {
        if !is_valid_keyword_name(keyword) {
            return Err(format!("invalid keyword name: `{keyword}`"));
        }
        if self.all.iter().any(|r| r.keyword == keyword) {
            return Err(format!("keyword `{keyword}` is already defined"));
        }
        let mut rule = Rule::new(keyword, types);
        if let Some(before) = before {
            rule = rule.before(before);
        }
        if data {
            rule = rule.data();
        }
        for implied in implements {
            rule = rule.implements(implied);
        }
        self.add_keyword_rule(rule);
        Ok(())
    }

    /// Unregister a keyword from every group and from the `all` index.
    pub(crate) fn remove_keyword(&mut self, keyword: &str) {
        self.all.retain(|r| r.keyword != keyword);
        for (_, group) in &mut self.groups {
            group.remove(keyword);
        }
    }

    pub(crate) fn contains(&self, keyword: &str) -> bool {
        self.all.iter().any(|r| r.keyword == keyword)
    }

    pub(crate) fn get(&self, keyword: &str) -> Option<&Rule> {
        self.all.iter().find(|r| r.keyword == keyword)
    }

    /// The order in which keywords of the `any` group and the group for
    /// `rule_type` should be dispatched. `any` keywords (`$ref`, `type`,
    /// `enum`, ...) always run first, matching the historical compiler.
    pub(crate) fn dispatch_order(&self, rule_type: RuleType) -> Vec<&str> {
        let mut order = Vec::new();
        if rule_type != RuleType::Any {
            if let Some((_, group)) = self.groups.iter().find(|(t, _)| *t == RuleType::Any) {
                order.extend(group.keywords_in_order());
            }
        }
        if let Some((_, group)) = self.groups.iter().find(|(t, _)| *t == rule_type) {
            order.extend(group.keywords_in_order());
        }
        order
    }

    /// A single canonical keyword order spanning every group, used by the
    /// compiler to decide in which order the keywords present on a schema
    /// object get compiled (and therefore get a chance to short-circuit
    /// sibling keywords, as `if`/`$ref` do). `any` keywords come first, then
    /// each type group in a fixed, deterministic sequence; a keyword already
    /// placed by an earlier group is not repeated.
    pub(crate) fn global_order(&self) -> Vec<&str> {
        use PrimitiveType::{Array, Boolean, Integer, Null, Number, Object, String as Str};
        use RuleType::{Any, Type};

        let mut seen = std::collections::HashSet::new();
        let mut order = Vec::new();
        let type_sequence = [
            Any,
            Type(Str),
            Type(Number),
            Type(Integer),
            Type(Object),
            Type(Array),
            Type(Boolean),
            Type(Null),
        ];
        for rule_type in type_sequence {
            if let Some((_, group)) = self.groups.iter().find(|(t, _)| *t == rule_type) {
                for keyword in group.keywords_in_order() {
                    if seen.insert(keyword) {
                        order.push(keyword);
                    }
                }
            }
        }
        order
    }
}

/// The registry of builtin keyword rules, shared by every compilation. Custom
/// keywords registered through the orchestrator's `add_keyword` get their own,
/// per-orchestrator copy seeded from this one (see [`crate::orchestrator::Orchestrator`]).
pub(crate) static BUILTIN_RULES: once_cell::sync::Lazy<Rules> =
    once_cell::sync::Lazy::new(Rules::with_builtins);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_keep_before_ordering() {
        let rules = Rules::with_builtins();
        let order = rules.dispatch_order(RuleType::Type(PrimitiveType::Number));
        let max_idx = order.iter().position(|k| *k == "maximum").unwrap();
        let min_idx = order.iter().position(|k| *k == "minimum").unwrap();
        assert!(max_idx < min_idx, "maximum must be checked before minimum");
    }

    #[test]
    fn add_keyword_rejects_invalid_name() {
        let mut rules = Rules::empty();
        assert!(rules
            .add_keyword("Not-Valid!", &[RuleType::Any], None, &[], false)
            .is_err());
    }

    #[test]
    fn add_keyword_rejects_duplicates() {
        let mut rules = Rules::with_builtins();
        assert!(rules
            .add_keyword("minimum", &[RuleType::Any], None, &[], false)
            .is_err());
    }

    #[test]
    fn add_keyword_before_hint_splices() {
        let mut rules = Rules::empty();
        rules
            .add_keyword("b", &[RuleType::Any], None, &[], false)
            .unwrap();
        rules
            .add_keyword("a", &[RuleType::Any], Some("b"), &[], false)
            .unwrap();
        assert_eq!(rules.dispatch_order(RuleType::Any), vec!["a", "b"]);
    }

    #[test]
    fn add_keyword_missing_before_warns_and_appends() {
        let mut rules = Rules::empty();
        rules
            .add_keyword("a", &[RuleType::Any], Some("missing"), &[], false)
            .unwrap();
        assert_eq!(rules.dispatch_order(RuleType::Any), vec!["a"]);
        assert_eq!(rules.warnings.len(), 1);
    }

    #[test]
    fn remove_keyword_unlinks_everywhere() {
        let mut rules = Rules::with_builtins();
        assert!(rules.contains("minimum"));
        rules.remove_keyword("minimum");
        assert!(!rules.contains("minimum"));
        assert!(!rules
            .dispatch_order(RuleType::Type(PrimitiveType::Number))
            .contains(&"minimum"));
    }
}
