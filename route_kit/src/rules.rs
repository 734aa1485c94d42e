//! Process-wide registry of custom validation rules.
//!
//! Rules are registered at runtime with [`register_rule`] / [`register_rules`]
//! or statically with `inventory::submit!`:
//!
//! ```ignore
//! fn even(input: &RuleInput<'_>) -> Result<(), String> { /* ... */ }
//! route_kit::inventory::submit! {
//!     route_kit::rules::RuleRegistration { name: "even", func: even }
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::context::RequestContext;

pub type RuleFunc = Arc<dyn Fn(&RuleInput<'_>) -> Result<(), String> + Send + Sync>;

/// Input handed to a custom rule function.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub ctx: &'a RequestContext,
    /// Full rule text, e.g. `between:1,100`.
    pub rule: &'a str,
    /// Custom message configured after `#`, possibly empty.
    pub message: &'a str,
    pub field: &'a str,
    pub value: &'a Value,
    /// The object the field belongs to.
    pub data: &'a Value,
}

impl RuleInput<'_> {
    /// Arguments after the first `:`.
    pub fn args(&self) -> &str {
        self.rule.split_once(':').map(|(_, args)| args).unwrap_or_default()
    }
}

pub struct RuleRegistration {
    pub name: &'static str,
    pub func: fn(&RuleInput<'_>) -> Result<(), String>,
}

inventory::collect!(RuleRegistration);

static CUSTOM_RULES: Lazy<RwLock<HashMap<String, RuleFunc>>> = Lazy::new(|| {
    let rules = inventory::iter::<RuleRegistration>
        .into_iter()
        .map(|reg| (reg.name.to_string(), Arc::new(reg.func) as RuleFunc))
        .collect();
    RwLock::new(rules)
});

/// Registers `rule` unless a function is already registered under that name.
pub fn register_rule<F>(rule: impl Into<String>, f: F)
where
    F: Fn(&RuleInput<'_>) -> Result<(), String> + Send + Sync + 'static,
{
    let mut rules = CUSTOM_RULES.write().unwrap_or_else(PoisonError::into_inner);
    rules.entry(rule.into()).or_insert_with(|| Arc::new(f));
}

/// Registers every entry, replacing existing ones.
pub fn register_rules(map: HashMap<String, RuleFunc>) {
    let mut rules = CUSTOM_RULES.write().unwrap_or_else(PoisonError::into_inner);
    rules.extend(map);
}

/// Copy of all registered rules, or `None` when nothing is registered.
pub fn registered_rules() -> Option<HashMap<String, RuleFunc>> {
    let rules = CUSTOM_RULES.read().unwrap_or_else(PoisonError::into_inner);
    if rules.is_empty() {
        return None;
    }
    Some(rules.clone())
}

pub fn delete_rules(names: &[&str]) {
    let mut rules = CUSTOM_RULES.write().unwrap_or_else(PoisonError::into_inner);
    for name in names {
        rules.remove(*name);
    }
}

pub fn rule(name: &str) -> Option<RuleFunc> {
    CUSTOM_RULES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
}
