//! Derive macros for Composable Fetch
//!
//! This crate provides procedural macros to reduce boilerplate when
//! declaring the action enums that drive a fetch state machine.
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Generates classification helpers for action enums
//!
//! # Example
//!
//! ```ignore
//! use composable_fetch_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum LoadAction<T> {
//!     #[begin]
//!     Begin,
//!
//!     #[terminal]
//!     Success(T),
//!
//!     #[manual]
//!     SetData(T),
//! }
//!
//! // Generated methods:
//! assert!(LoadAction::<u8>::Begin.is_begin());
//! assert!(LoadAction::Success(1_u8).is_terminal());
//! assert_eq!(LoadAction::SetData(1_u8).action_type(), "set_data");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, parse_macro_input};

/// Attributes that classify a variant. A variant may carry at most one.
const ROLES: [&str; 3] = ["begin", "terminal", "manual"];

/// Derive macro for action enums
///
/// Generates helper methods for action enums:
/// - `is_begin()` - Returns true if this variant starts a fetch attempt
/// - `is_terminal()` - Returns true if this variant concludes a fetch attempt
/// - `is_manual()` - Returns true if this variant is a host-side override
/// - `action_type()` - Returns the `snake_case` wire name of the variant
///
/// Generic enums are supported; the generated `impl` block carries the
/// enum's generics and where clause.
///
/// # Attributes
///
/// - `#[begin]` - Mark a variant as starting an attempt
/// - `#[terminal]` - Mark a variant as concluding an attempt
/// - `#[manual]` - Mark a variant as a manual override
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has more than one role attribute
#[proc_macro_derive(Action, attributes(begin, terminal, manual))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(&input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut begin_arms = Vec::new();
    let mut terminal_arms = Vec::new();
    let mut manual_arms = Vec::new();
    let mut type_arms = Vec::new();

    for variant in &data_enum.variants {
        let roles: Vec<&str> = ROLES
            .iter()
            .copied()
            .filter(|role| has_attribute(&variant.attrs, role))
            .collect();

        if roles.len() > 1 {
            return syn::Error::new_spanned(
                variant,
                "Variant can carry only one of #[begin], #[terminal] or #[manual]",
            )
            .to_compile_error()
            .into();
        }

        let pattern = variant_pattern(&variant.ident, &variant.fields);
        match roles.first() {
            Some(&"begin") => begin_arms.push(quote! { #pattern => true, }),
            Some(&"terminal") => terminal_arms.push(quote! { #pattern => true, }),
            Some(&"manual") => manual_arms.push(quote! { #pattern => true, }),
            _ => {},
        }

        let wire_name = snake_case(&variant.ident.to_string());
        type_arms.push(quote! { #pattern => #wire_name, });
    }

    let expanded = quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            /// Returns true if this action starts a fetch attempt
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_begin(&self) -> bool {
                match self {
                    #(#begin_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action concludes a fetch attempt
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_terminal(&self) -> bool {
                match self {
                    #(#terminal_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is a manual override from the host
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_manual(&self) -> bool {
                match self {
                    #(#manual_arms)*
                    _ => false,
                }
            }

            /// Returns the wire name of this action
            #[must_use]
            pub const fn action_type(&self) -> &'static str {
                match self {
                    #(#type_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Build a match pattern that ignores the variant's fields
fn variant_pattern(variant: &Ident, fields: &Fields) -> TokenStream2 {
    match fields {
        Fields::Named(_) => quote! { Self::#variant { .. } },
        Fields::Unnamed(_) => quote! { Self::#variant(..) },
        Fields::Unit => quote! { Self::#variant },
    }
}

/// Convert a `CamelCase` identifier to `snake_case`
fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (idx, ch) in ident.chars().enumerate() {
        if ch.is_uppercase() {
            if idx > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
