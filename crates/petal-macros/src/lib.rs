//! Procedural macros for the Petal container.
//!
//! This crate provides:
//!
//! - `#[register_component("...")]` - Registers a constructor for a constant path
//! - `#[register_provider]` - Registers a static `ProviderDescriptor`
//!
//! Both expand to `linkme` distributed slice elements, so registrations
//! anywhere in the final binary are visible at startup without a central
//! list. The expansion names `::petal_core` and `::petal_framework`, so the
//! calling crate depends on those directly.
//!
//! # Components
//!
//! The auto-registration scanner turns `actions/users/create.rs` in the
//! `main` slice into the constant path `Main::Actions::Users::Create`; a
//! constructor registered under that path builds the component.
//!
//! ```rust,ignore
//! use petal::register_component;
//!
//! #[register_component("Main::Actions::Users::Create")]
//! #[derive(Default)]
//! pub struct CreateUser;
//!
//! #[register_component("Main::Jobs::Cleanup")]
//! fn cleanup() -> Cleanup {
//!     Cleanup::with_batch(100)
//! }
//! ```
//!
//! # Providers
//!
//! ```rust,ignore
//! use petal::framework::{ProviderContext, ProviderDescriptor};
//! use petal::register_provider;
//!
//! fn start_db(ctx: &mut ProviderContext) -> Result<(), petal::core::BoxError> {
//!     ctx.register("db.connection", Database::connect()?)?;
//!     Ok(())
//! }
//!
//! #[register_provider]
//! static DB: ProviderDescriptor = ProviderDescriptor::new("main", "db").on_start(start_db);
//! ```

mod component;
mod provider;

use proc_macro::TokenStream;

/// Registers a component constructor under a constant path.
///
/// Applies to:
/// - a zero-argument `fn` returning either `Component` or any
///   `Send + Sync + 'static` value, which is wrapped
/// - a non-generic struct implementing `Default`
///
/// The constructor runs every time a non-memoized component resolves and
/// once for a memoized one.
#[proc_macro_attribute]
pub fn register_component(attr: TokenStream, item: TokenStream) -> TokenStream {
    match component::register_component(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Registers a static `ProviderDescriptor`.
///
/// The slice named in the descriptor attaches the provider when it
/// prepares. A provider registered explicitly under the same name on that
/// slice takes precedence.
#[proc_macro_attribute]
pub fn register_provider(attr: TokenStream, item: TokenStream) -> TokenStream {
    match provider::register_provider(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
