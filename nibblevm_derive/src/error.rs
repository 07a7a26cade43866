//! Derive macro for error enums.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//!
//! ```ignore
//! use nibblevm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum VMError {
//!     #[error("stack overflow at nibble {offset}")]
//!     StackOverflow { offset: usize },
//!
//!     #[error("io error: {0}")]
//!     Io(String),
//!
//!     #[error("halted")]
//!     Halted,
//! }
//! ```
//!
//! Tuple fields are referenced positionally (`{0}`), named fields by name.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, Variant, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Error derive only supports enums",
        ));
    };

    let arms = data
        .variants
        .iter()
        .map(display_arm)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#arms)*
                }
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds the `match` arm that formats one variant.
fn display_arm(variant: &Variant) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &variant.ident;
    let message = message_of(variant)?;

    Ok(match &variant.fields {
        Fields::Unit => quote! {
            Self::#ident => write!(f, #message),
        },
        Fields::Unnamed(fields) => {
            let bindings: Vec<_> = (0..fields.unnamed.len())
                .map(|i| format_ident!("f{}", i))
                .collect();
            let message = positional_to_named(&message, bindings.len());
            let used: Vec<_> = bindings
                .iter()
                .filter(|b| mentions(&message, &b.to_string()))
                .collect();
            quote! {
                #[allow(unused_variables)]
                Self::#ident(#(#bindings),*) => write!(f, #message, #(#used = #used),*),
            }
        }
        Fields::Named(fields) => {
            let bindings: Vec<_> = fields.named.iter().map(|field| &field.ident).collect();
            // Fields not mentioned in the message would trip `unused named argument`.
            let used: Vec<_> = bindings
                .iter()
                .filter(|b| b.as_ref().is_some_and(|b| mentions(&message, &b.to_string())))
                .collect();
            quote! {
                #[allow(unused_variables)]
                Self::#ident { #(#bindings),* } => write!(f, #message, #(#used = #used),*),
            }
        }
    })
}

/// Reads the string literal out of a variant's `#[error("...")]` attribute.
fn message_of(variant: &Variant) -> syn::Result<String> {
    for attr in &variant.attrs {
        if !attr.path().is_ident("error") {
            continue;
        }

        let Meta::List(list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "expected #[error(\"message\")]",
            ));
        };

        return match syn::parse2::<Lit>(list.tokens.clone()) {
            Ok(Lit::Str(lit)) => Ok(lit.value()),
            _ => Err(syn::Error::new_spanned(
                &attr.meta,
                "#[error] takes a single string literal, e.g. #[error(\"bad literal at {offset}\")]",
            )),
        };
    }

    Err(syn::Error::new_spanned(
        &variant.ident,
        format!(
            "variant `{}` is missing its #[error(\"...\")] message",
            variant.ident
        ),
    ))
}

/// Rewrites `{0}`, `{1}` into `{f0}`, `{f1}` so tuple fields can be passed as named arguments.
fn positional_to_named(message: &str, count: usize) -> String {
    (0..count).rev().fold(message.to_string(), |acc, i| {
        acc.replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"))
    })
}

/// Whether `message` interpolates `name`, with or without a format spec.
fn mentions(message: &str, name: &str) -> bool {
    message.contains(&format!("{{{name}}}")) || message.contains(&format!("{{{name}:"))
}
