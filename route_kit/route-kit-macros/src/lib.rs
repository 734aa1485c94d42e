extern crate proc_macro;

mod attrs;
mod controller;
mod model;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, ItemImpl};

/// Derives `route_kit::ApiModel`, a static field table read by the decoder,
/// the validator and the OpenAPI generator.
///
/// Supports structs with named fields and unit-only enums. Structs must also
/// implement `Default` and `Serialize`.
///
/// Field attributes:
/// - `#[api(p = "...")]`: wire name used for query parameters and body keys.
/// - `#[api(v = "...")]`: `|`-separated validation rules.
/// - `#[api(description = "...")]`: parameter/property description.
/// - `#[api(path, method, summary, tags)]`: route of a request type, on its
///   `Meta` field.
///
/// `#[serde(rename)]`, `#[serde(rename_all)]`, `#[serde(flatten)]` and
/// `#[serde(skip)]` are honored so the table matches what serde writes.
#[proc_macro_derive(ApiModel, attributes(api))]
pub fn derive_api_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `route_kit::Controller` for the annotated inherent `impl` block.
///
/// Every `pub async fn name(&self, ctx: RequestContext, req: Req) -> Result<Res, E>`
/// becomes a method entry; other methods are left alone. A method named
/// `initialize(&mut self, &FrameworkHandle) -> Result<(), E>` runs during
/// registration.
///
/// Arguments:
/// - `name = "..."`: controller name, defaults to the type name.
/// - `handle = field`: a `FrameworkHandle` field filled in on registration.
#[proc_macro_attribute]
pub fn controller(args: TokenStream, input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemImpl);
    let args = parse_macro_input!(args as controller::ControllerArgs);
    controller::expand(args, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
