//! Field tag resolution.

use crate::descriptor::FieldDescriptor;

/// Declarative tags attached to a field by `#[derive(ApiModel)]`.
///
/// `param` comes from `#[api(p = "...")]`, `json` from `#[serde(rename)]` or the
/// container's `rename_all`, `rules` from `#[api(v = "...")]` and
/// `description` from `#[api(description = "...")]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldTags {
    pub param: Option<&'static str>,
    pub json: Option<&'static str>,
    pub rules: Option<&'static str>,
    pub description: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub wire_name: String,
    pub required: bool,
    pub description: String,
}

/// Resolves the wire name, requiredness and description of a field.
pub fn resolve(field: &FieldDescriptor) -> ResolvedField {
    ResolvedField {
        wire_name: wire_name(field).to_string(),
        required: is_required(&field.tags),
        description: field.tags.description.unwrap_or_default().to_string(),
    }
}

/// `p` tag, then the serialization name.
pub fn wire_name(field: &FieldDescriptor) -> &'static str {
    match field.tags.param {
        Some(param) if !param.is_empty() => param,
        _ => json_name(field),
    }
}

/// The key the serializer writes: first segment of the `json` tag, else the
/// field identifier.
pub fn json_name(field: &FieldDescriptor) -> &'static str {
    if let Some(json) = field.tags.json {
        let head = json.split(',').next().unwrap_or_default();
        if !head.is_empty() {
            return head;
        }
    }
    field.ident
}

/// Substring match on the rule tag, not a parsed grammar.
pub fn is_required(tags: &FieldTags) -> bool {
    tags.rules.is_some_and(|rules| rules.contains("required"))
}
