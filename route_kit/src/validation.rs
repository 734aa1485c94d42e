//! Request validation.
//!
//! The dispatch adapter hands every decoded request, serialized to JSON, to a
//! [`Validator`] together with the request's descriptor. [`RuleValidator`] is
//! the default: it reads the `v` tag of each field as a `|`-separated rule
//! list. `required` is built in; every other rule name is looked up in the
//! custom rule registry.

use serde_json::Value;
use tracing::trace;

use crate::context::RequestContext;
use crate::descriptor::TypeDescriptor;
use crate::rules::{self, RuleInput};
use crate::walker::{self, Visited, WalkedField};

pub trait Validator: Send + Sync {
    fn run(
        &self,
        ctx: &RequestContext,
        data: &Value,
        model: &'static TypeDescriptor,
    ) -> Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&RequestContext, &Value, &'static TypeDescriptor) -> Result<(), String> + Send + Sync,
{
    fn run(
        &self,
        ctx: &RequestContext,
        data: &Value,
        model: &'static TypeDescriptor,
    ) -> Result<(), String> {
        self(ctx, data, model)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl Validator for RuleValidator {
    fn run(
        &self,
        ctx: &RequestContext,
        data: &Value,
        model: &'static TypeDescriptor,
    ) -> Result<(), String> {
        check_model(ctx, model, data, &mut Visited::rooted(model))
    }
}

fn check_model(
    ctx: &RequestContext,
    desc: &'static TypeDescriptor,
    data: &Value,
    visited: &mut Visited,
) -> Result<(), String> {
    for walked in walker::walk(desc, visited) {
        let value = data.get(walked.json_name()).unwrap_or(&Value::Null);
        if let Some(rules) = walked.field.tags.rules {
            for rule in rules.split('|') {
                check_rule(ctx, &walked, rule.trim(), value, data)?;
            }
        }
        let Some(nested) = walked.field.shape.struct_model() else {
            continue;
        };
        if value.is_object() && visited.enter(nested) {
            let result = check_model(ctx, nested, value, visited);
            visited.leave(nested);
            result?;
        }
    }
    Ok(())
}

fn check_rule(
    ctx: &RequestContext,
    walked: &WalkedField,
    rule: &str,
    value: &Value,
    data: &Value,
) -> Result<(), String> {
    let (expr, message) = rule.split_once('#').unwrap_or((rule, ""));
    let name = expr.split(':').next().unwrap_or_default().trim();
    if name.is_empty() {
        return Ok(());
    }

    if name == "required" {
        if is_empty(value) {
            return Err(if message.is_empty() {
                format!("The {} field is required", walked.wire_name())
            } else {
                message.to_string()
            });
        }
        return Ok(());
    }

    let Some(func) = rules::rule(name) else {
        trace!(rule = name, field = walked.wire_name(), "no rule registered, skipping");
        return Ok(());
    };
    let input = RuleInput {
        ctx,
        rule: expr,
        message,
        field: walked.wire_name(),
        value,
        data,
    };
    func(&input).map_err(|err| if message.is_empty() { err } else { message.to_string() })
}

/// Zero values count as empty, as in the usual `required` semantics.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
    }
}
