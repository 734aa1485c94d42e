//! Custom validation rules used by the item DTOs.

use route_kit::rules::{self, RuleInput};

/// Upper-case letters, digits and dashes; no leading or trailing dash.
fn sku(input: &RuleInput<'_>) -> Result<(), String> {
    let Some(value) = input.value.as_str() else {
        return Ok(());
    };
    let valid = !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
    if valid {
        return Ok(());
    }
    Err(if input.message.is_empty() {
        format!("The {} field must be a valid sku", input.field)
    } else {
        input.message.to_string()
    })
}

/// Adds this service's rules to the process-wide registry.
pub fn install() {
    rules::register_rule("sku", sku);
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_kit::RequestContext;
    use serde_json::{json, Value};

    fn check(value: Value, message: &str) -> Result<(), String> {
        let ctx = RequestContext::default();
        sku(&RuleInput {
            ctx: &ctx,
            rule: "sku",
            message,
            field: "sku",
            value: &value,
            data: &value,
        })
    }

    #[test]
    fn accepts_upper_case_codes() {
        assert!(check(json!("BOLT-M6"), "").is_ok());
        assert!(check(json!("A1"), "").is_ok());
    }

    #[test]
    fn rejects_lower_case_and_dangling_dashes() {
        assert_eq!(
            check(json!("bolt"), ""),
            Err("The sku field must be a valid sku".into())
        );
        assert!(check(json!("-A"), "").is_err());
        assert_eq!(check(json!("A-"), "bad sku"), Err("bad sku".into()));
    }
}
