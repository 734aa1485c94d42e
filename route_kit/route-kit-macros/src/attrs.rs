//! `#[api(...)]` and `#[serde(...)]` attribute parsing.

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Expr, LitStr, Result, Token};

#[derive(Default)]
pub struct ApiAttrs {
    pub param: Option<LitStr>,
    pub rules: Option<LitStr>,
    pub description: Option<LitStr>,
    pub path: Option<LitStr>,
    pub method: Option<LitStr>,
    pub summary: Option<LitStr>,
    pub tags: Option<LitStr>,
}

impl ApiAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = ApiAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("api")) {
            attr.parse_nested_meta(|meta| {
                let slot = if meta.path.is_ident("p") {
                    &mut out.param
                } else if meta.path.is_ident("v") {
                    &mut out.rules
                } else if meta.path.is_ident("description") {
                    &mut out.description
                } else if meta.path.is_ident("path") {
                    &mut out.path
                } else if meta.path.is_ident("method") {
                    &mut out.method
                } else if meta.path.is_ident("summary") {
                    &mut out.summary
                } else if meta.path.is_ident("tags") {
                    &mut out.tags
                } else {
                    return Err(meta.error("unknown api attribute"));
                };
                *slot = Some(meta.value()?.parse()?);
                Ok(())
            })?;
        }
        Ok(out)
    }

    pub fn has_route(&self) -> bool {
        self.path.is_some() || self.method.is_some() || self.summary.is_some() || self.tags.is_some()
    }
}

/// The subset of serde's attributes that changes the wire shape.
#[derive(Default)]
pub struct SerdeAttrs {
    pub rename: Option<String>,
    pub rename_all: Option<String>,
    pub flatten: bool,
    pub skip: bool,
}

impl SerdeAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = SerdeAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = serialize_name(&meta)?;
                } else if meta.path.is_ident("rename_all") {
                    out.rename_all = serialize_name(&meta)?;
                } else if meta.path.is_ident("flatten") {
                    out.flatten = true;
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

/// `name = "x"` or `name(serialize = "x", deserialize = "y")`.
fn serialize_name(meta: &ParseNestedMeta) -> Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        let lit: LitStr = meta.value()?.parse()?;
        return Ok(Some(lit.value()));
    }
    let mut name = None;
    meta.parse_nested_meta(|inner| {
        let lit: LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("serialize") {
            name = Some(lit.value());
        }
        Ok(())
    })?;
    Ok(name)
}

fn skip_meta(meta: &ParseNestedMeta) -> Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }
    Ok(())
}

/// Applies a serde `rename_all` rule to a field or variant name.
pub fn apply_rename_all(rule: &str, name: &str) -> Option<String> {
    let renamed = match rule {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "PascalCase" => name.to_upper_camel_case(),
        "camelCase" => name.to_lower_camel_case(),
        "snake_case" => name.to_snake_case(),
        "SCREAMING_SNAKE_CASE" => name.to_shouty_snake_case(),
        "kebab-case" => name.to_kebab_case(),
        "SCREAMING-KEBAB-CASE" => name.to_shouty_kebab_case(),
        _ => return None,
    };
    Some(renamed)
}
