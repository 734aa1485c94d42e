use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Error, Fields, GenericArgument, LitStr, PathArguments, Result, Type};

use crate::attrs::{apply_rename_all, ApiAttrs, SerdeAttrs};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "ApiModel cannot be derived for generic types",
        ));
    }
    let ident = &input.ident;
    let name = ident.unraw().to_string();
    let container = SerdeAttrs::parse(&input.attrs)?;

    let (kind, route, zero) = match &input.data {
        Data::Struct(data) => {
            let Fields::Named(named) = &data.fields else {
                return Err(Error::new(
                    data.fields.span(),
                    "ApiModel requires a struct with named fields",
                ));
            };
            let mut fields = Vec::new();
            let mut route = quote!(::std::option::Option::None);
            for field in &named.named {
                let serde = SerdeAttrs::parse(&field.attrs)?;
                let api = ApiAttrs::parse(&field.attrs)?;
                let is_meta = last_ident(&field.ty).is_some_and(|id| id == "Meta");
                if serde.skip && !is_meta {
                    continue;
                }
                if is_meta {
                    route = route_tokens(&api);
                } else if api.has_route() {
                    return Err(Error::new(
                        field.span(),
                        "route attributes belong on the Meta field",
                    ));
                }
                fields.push(field_tokens(field, &serde, &api, container.rename_all.as_deref())?);
            }
            let kind = quote! {
                ::route_kit::descriptor::ModelKind::Struct(::std::vec![#(#fields),*])
            };
            let zero = quote! {
                ::std::option::Option::Some(::route_kit::descriptor::zero_value::<#ident>)
            };
            (kind, route, zero)
        }
        Data::Enum(data) => {
            let mut variants = Vec::new();
            for variant in &data.variants {
                if !matches!(variant.fields, Fields::Unit) {
                    return Err(Error::new(
                        variant.span(),
                        "ApiModel enums must have unit variants only",
                    ));
                }
                let serde = SerdeAttrs::parse(&variant.attrs)?;
                if serde.skip {
                    continue;
                }
                let raw = variant.ident.unraw().to_string();
                let wire = serde
                    .rename
                    .or_else(|| {
                        container
                            .rename_all
                            .as_deref()
                            .and_then(|rule| apply_rename_all(rule, &raw))
                    })
                    .unwrap_or(raw);
                variants.push(wire);
            }
            let kind = quote! {
                ::route_kit::descriptor::ModelKind::Enum(::std::vec![#(#variants),*])
            };
            (
                kind,
                quote!(::std::option::Option::None),
                quote!(::std::option::Option::None),
            )
        }
        Data::Union(data) => {
            return Err(Error::new(
                data.union_token.span(),
                "ApiModel cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl ::route_kit::descriptor::ApiModel for #ident {
            fn descriptor() -> &'static ::route_kit::descriptor::TypeDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<::route_kit::descriptor::TypeDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| ::route_kit::descriptor::TypeDescriptor {
                    name: #name,
                    type_id: ::std::any::TypeId::of::<#ident>(),
                    kind: #kind,
                    route: #route,
                    zero: #zero,
                })
            }
        }
    })
}

fn field_tokens(
    field: &syn::Field,
    serde: &SerdeAttrs,
    api: &ApiAttrs,
    rename_all: Option<&str>,
) -> Result<TokenStream> {
    let Some(ident) = &field.ident else {
        return Err(Error::new(field.span(), "expected a named field"));
    };
    let raw = ident.unraw().to_string();
    let json = serde
        .rename
        .clone()
        .or_else(|| rename_all.and_then(|rule| apply_rename_all(rule, &raw)));

    let is_meta = last_ident(&field.ty).is_some_and(|id| id == "Meta");
    let role = if is_meta {
        quote!(Meta)
    } else if serde.flatten {
        quote!(Embedded)
    } else {
        quote!(Plain)
    };
    let shape = if is_meta {
        quote!(::route_kit::descriptor::Shape::Any)
    } else {
        shape_tokens(&field.ty)?
    };

    let param = opt_lit(api.param.as_ref());
    let json = opt_str(json.as_deref());
    let rules = opt_lit(api.rules.as_ref());
    let description = opt_lit(api.description.as_ref());

    Ok(quote! {
        ::route_kit::descriptor::FieldDescriptor {
            ident: #raw,
            tags: ::route_kit::tags::FieldTags {
                param: #param,
                json: #json,
                rules: #rules,
                description: #description,
            },
            shape: #shape,
            role: ::route_kit::descriptor::FieldRole::#role,
        }
    })
}

fn route_tokens(api: &ApiAttrs) -> TokenStream {
    let value = |lit: &Option<LitStr>| match lit {
        Some(lit) => quote!(#lit),
        None => quote!(""),
    };
    let path = value(&api.path);
    let method = value(&api.method);
    let summary = value(&api.summary);
    let tags = value(&api.tags);
    quote! {
        ::std::option::Option::Some(::route_kit::descriptor::RouteTags {
            path: #path,
            method: #method,
            summary: #summary,
            tags: #tags,
        })
    }
}

/// Maps a field type onto a `Shape` expression.
fn shape_tokens(ty: &Type) -> Result<TokenStream> {
    let shape = quote!(::route_kit::descriptor::Shape);
    match ty {
        Type::Paren(inner) => return shape_tokens(&inner.elem),
        Type::Group(inner) => return shape_tokens(&inner.elem),
        Type::Array(array) => {
            let item = shape_tokens(&array.elem)?;
            return Ok(quote!(#shape::List(::std::boxed::Box::new(#item))));
        }
        Type::Path(_) => {}
        other => {
            return Err(Error::new(
                other.span(),
                "unsupported field type for ApiModel",
            ))
        }
    }

    let Some(ident) = last_ident(ty) else {
        return Err(Error::new(ty.span(), "unsupported field type for ApiModel"));
    };
    let args = generic_types(ty);
    let tokens = match (ident.as_str(), args.as_slice()) {
        ("Option", [inner]) => {
            let inner = shape_tokens(inner)?;
            quote!(#shape::Optional(::std::boxed::Box::new(#inner)))
        }
        ("Box" | "Arc" | "Rc", [inner]) => shape_tokens(inner)?,
        ("Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet", [inner, ..]) => {
            let inner = shape_tokens(inner)?;
            quote!(#shape::List(::std::boxed::Box::new(#inner)))
        }
        ("HashMap" | "BTreeMap" | "IndexMap", [key, value, ..]) => {
            let Some(key) = last_ident(key).and_then(|k| scalar_kind(&k)) else {
                return Err(Error::new(key.span(), "map keys must be strings, numbers or bools"));
            };
            let value = shape_tokens(value)?;
            quote!(#shape::Map(::route_kit::descriptor::ScalarKind::#key, ::std::boxed::Box::new(#value)))
        }
        ("DateTime", _) => quote!(#shape::Time(::route_kit::descriptor::TimeKind::DateTime)),
        ("NaiveDateTime", []) => quote!(#shape::Time(::route_kit::descriptor::TimeKind::NaiveDateTime)),
        ("NaiveDate", []) => quote!(#shape::Time(::route_kit::descriptor::TimeKind::Date)),
        ("DeletedAt", []) => quote!(#shape::SoftDelete),
        ("Value", []) => quote!(#shape::Any),
        (other, []) => match scalar_kind(other) {
            Some(kind) => quote!(#shape::Scalar(::route_kit::descriptor::ScalarKind::#kind)),
            None => quote! {
                #shape::Model(::route_kit::descriptor::TypeRef::of::<#ty>())
            },
        },
        _ => return Err(Error::new(ty.span(), "unsupported field type for ApiModel")),
    };
    Ok(tokens)
}

fn scalar_kind(ident: &str) -> Option<proc_macro2::Ident> {
    let kind = match ident {
        "bool" => "Bool",
        "i8" => "I8",
        "i16" => "I16",
        "i32" => "I32",
        "i64" => "I64",
        "isize" => "Isize",
        "u8" => "U8",
        "u16" => "U16",
        "u32" => "U32",
        "u64" => "U64",
        "usize" => "Usize",
        "f32" => "F32",
        "f64" => "F64",
        "String" | "str" | "char" => "String",
        _ => return None,
    };
    Some(proc_macro2::Ident::new(kind, proc_macro2::Span::call_site()))
}

pub(crate) fn last_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        Type::Paren(inner) => last_ident(&inner.elem),
        Type::Group(inner) => last_ident(&inner.elem),
        _ => None,
    }
}

/// Type arguments of the last path segment, e.g. `[K, V]` for `HashMap<K, V>`.
pub(crate) fn generic_types(ty: &Type) -> Vec<&Type> {
    let Type::Path(path) = ty else {
        return Vec::new();
    };
    let Some(segment) = path.path.segments.last() else {
        return Vec::new();
    };
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return Vec::new();
    };
    args.args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .collect()
}

fn opt_lit(lit: Option<&LitStr>) -> TokenStream {
    match lit {
        Some(lit) => quote!(::std::option::Option::Some(#lit)),
        None => quote!(::std::option::Option::None),
    }
}

fn opt_str(value: Option<&str>) -> TokenStream {
    match value {
        Some(value) => quote!(::std::option::Option::Some(#value)),
        None => quote!(::std::option::Option::None),
    }
}
