use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned;
use syn::{
    Error, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Result, ReturnType, Token, Type,
    Visibility,
};

use crate::model::{generic_types, last_ident};

#[derive(Default)]
pub struct ControllerArgs {
    name: Option<LitStr>,
    handle: Option<Ident>,
}

impl Parse for ControllerArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut args = ControllerArgs::default();
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            if key == "name" {
                args.name = Some(input.parse()?);
            } else if key == "handle" {
                args.handle = Some(input.parse()?);
            } else {
                return Err(Error::new(key.span(), "expected `name` or `handle`"));
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

/// A method of the shape `pub async fn m(&self, ctx: RequestContext, req: Req) -> Result<Res, E>`.
/// One-argument `Result` aliases are accepted as well.
struct Eligible<'a> {
    ident: &'a Ident,
    request: &'a Type,
    response: &'a Type,
}

pub fn expand(args: ControllerArgs, item: ItemImpl) -> Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new(
            path.span(),
            "#[controller] goes on an inherent impl block",
        ));
    }
    let self_ty = &item.self_ty;
    let name = match &args.name {
        Some(name) => name.value(),
        None => last_ident(self_ty)
            .ok_or_else(|| Error::new(self_ty.span(), "cannot infer the controller name"))?,
    };

    let mut methods = Vec::new();
    let mut has_initialize = false;
    for impl_item in &item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        if method.sig.ident == "initialize" {
            has_initialize = true;
            continue;
        }
        if let Some(eligible) = eligible(method)? {
            methods.push(eligible);
        }
    }

    let entries = methods.iter().map(|m| {
        let ident = m.ident;
        let method_name = ident.to_string();
        let request = m.request;
        let response = m.response;
        quote! {
            ::route_kit::MethodEntry::new::<#request, #response, _, _, _>(
                #method_name,
                |this: ::std::sync::Arc<Self>, ctx: ::route_kit::RequestContext, req: #request| async move {
                    this.#ident(ctx, req).await
                },
            )
        }
    });

    let inject = args.handle.as_ref().map(|field| {
        quote!(self.#field = ::std::clone::Clone::clone(handle);)
    });
    let initialize = has_initialize.then(|| {
        quote! {
            Self::initialize(self, handle).map_err(|e| {
                ::route_kit::Error::Registration(::std::format!(
                    "failed to initialize controller {}: {}", #name, e
                ))
            })?;
        }
    });

    let (impl_generics, _, where_clause) = item.generics.split_for_impl();
    Ok(quote! {
        #item

        impl #impl_generics ::route_kit::Controller for #self_ty #where_clause {
            fn name(&self) -> &str {
                #name
            }

            fn attach(&mut self, handle: &::route_kit::FrameworkHandle) -> ::route_kit::Result<()> {
                let _ = handle;
                #inject
                #initialize
                ::std::result::Result::Ok(())
            }

            fn methods() -> ::std::vec::Vec<::route_kit::MethodEntry<Self>> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}

fn eligible(method: &ImplItemFn) -> Result<Option<Eligible<'_>>> {
    let sig = &method.sig;
    if !matches!(method.vis, Visibility::Public(_)) || sig.asyncness.is_none() {
        return Ok(None);
    }
    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => return Ok(None),
    }
    let Some(FnArg::Typed(ctx)) = inputs.next() else {
        return Ok(None);
    };
    if last_ident(&ctx.ty).as_deref() != Some("RequestContext") {
        return Ok(None);
    }
    let Some(FnArg::Typed(req)) = inputs.next() else {
        return Ok(None);
    };
    if inputs.next().is_some() {
        return Ok(None);
    }
    // Handler shape from here on: a non-Result return is a compile error.
    let not_a_result = || {
        Error::new(
            sig.output.span(),
            "controller methods must return `Result<Res, E>` or a one-argument alias such as `route_kit::Result<Res>`",
        )
    };
    let ReturnType::Type(_, output) = &sig.output else {
        return Err(not_a_result());
    };
    if last_ident(output).as_deref() != Some("Result") {
        return Err(not_a_result());
    }
    // `anyhow::Result<T>` and friends: the error type is inferred by `MethodEntry::new`.
    let response = match generic_types(output)[..] {
        [response] | [response, _] => response,
        _ => return Err(not_a_result()),
    };
    Ok(Some(Eligible {
        ident: &sig.ident,
        request: &req.ty,
        response,
    }))
}
