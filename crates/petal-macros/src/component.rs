use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Ident, Item, ItemFn, ItemStruct, LitStr, ReturnType, Type, spanned::Spanned};

/// Implementation of `#[register_component("Const::Path")]`.
///
/// Leaves the item unchanged and appends a `ComponentConstructor` static in
/// `::petal_core::COMPONENT_REGISTRY`.
pub fn register_component(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let path: LitStr = syn::parse2(attr).map_err(|err| {
        syn::Error::new(
            err.span(),
            "expected a constant path, e.g. #[register_component(\"Main::Actions::Greet\")]",
        )
    })?;
    validate_constant_path(&path)?;

    let item: Item = syn::parse2(item)?;
    let (ident, build) = match &item {
        Item::Fn(func) => (func.sig.ident.clone(), build_from_fn(func)?),
        Item::Struct(strukt) => (strukt.ident.clone(), build_from_struct(strukt)?),
        other => {
            return Err(syn::Error::new(
                other.span(),
                "#[register_component] applies to a zero-argument fn or a struct implementing Default",
            ));
        }
    };

    let static_name = Ident::new(
        &format!("_PETAL_COMPONENT_{}", ident.to_string().to_uppercase()),
        Span::call_site(),
    );

    Ok(quote! {
        #item

        #[::petal_core::linkme::distributed_slice(::petal_core::COMPONENT_REGISTRY)]
        #[linkme(crate = ::petal_core::linkme)]
        static #static_name: ::petal_core::ComponentConstructor = ::petal_core::ComponentConstructor {
            constant_path: #path,
            build: #build,
        };
    })
}

/// `Namespace::Const::Path`: non-empty identifier segments joined by `::`.
fn validate_constant_path(path: &LitStr) -> syn::Result<()> {
    let value = path.value();
    let valid = !value.is_empty()
        && value.split("::").all(|segment| {
            let mut chars = segment.chars();
            chars.next().is_some_and(|c| c.is_ascii_uppercase())
                && chars.all(|c| c.is_ascii_alphanumeric())
        });
    if valid {
        Ok(())
    } else {
        Err(syn::Error::new(
            path.span(),
            format!("`{value}` is not a constant path; expected camelized segments joined by `::`"),
        ))
    }
}

fn build_from_fn(func: &ItemFn) -> syn::Result<TokenStream> {
    let sig = &func.sig;
    if sig.asyncness.is_some() {
        return Err(syn::Error::new(sig.asyncness.span(), "component constructors cannot be async"));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(sig.generics.span(), "component constructors cannot be generic"));
    }
    if let Some(arg) = sig.inputs.first() {
        return Err(syn::Error::new(arg.span(), "component constructors take no arguments"));
    }

    let name = &sig.ident;
    let returns_component = match &sig.output {
        ReturnType::Type(_, ty) => match ty.as_ref() {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "Component"),
            _ => false,
        },
        ReturnType::Default => {
            return Err(syn::Error::new(sig.span(), "component constructors must return a value"));
        }
    };

    Ok(if returns_component {
        quote!(|| #name())
    } else {
        quote!(|| ::petal_core::Component::new(#name()))
    })
}

fn build_from_struct(strukt: &ItemStruct) -> syn::Result<TokenStream> {
    if !strukt.generics.params.is_empty() {
        return Err(syn::Error::new(strukt.generics.span(), "generic components cannot be registered"));
    }
    let name = &strukt.ident;
    Ok(quote!(|| ::petal_core::Component::new(<#name as ::core::default::Default>::default())))
}
