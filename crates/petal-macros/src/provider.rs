use proc_macro2::TokenStream;
use quote::quote;
use syn::{ItemStatic, StaticMutability, spanned::Spanned};

/// Implementation of `#[register_provider]`.
///
/// The item must be a `static` of type `ProviderDescriptor`; it is placed in
/// `::petal_framework::PROVIDER_REGISTRY` unchanged.
pub fn register_provider(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    if !attr.is_empty() {
        return Err(syn::Error::new(
            attr.span(),
            "#[register_provider] takes no arguments; set the slice on the descriptor",
        ));
    }
    let item: ItemStatic = syn::parse2(item).map_err(|err| {
        syn::Error::new(
            err.span(),
            "#[register_provider] applies to `static NAME: ProviderDescriptor = ...;`",
        )
    })?;
    if let StaticMutability::Mut(token) = &item.mutability {
        return Err(syn::Error::new(token.span(), "provider descriptors cannot be `static mut`"));
    }

    Ok(quote! {
        #[::petal_framework::linkme::distributed_slice(::petal_framework::PROVIDER_REGISTRY)]
        #[linkme(crate = ::petal_framework::linkme)]
        #item
    })
}
