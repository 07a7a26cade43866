//! Derive macros for the nibblevm crate.
//!
//! Provides:
//! - `#[derive(BinaryCodec)]` - field-order binary encoding for program images
//! - `#[derive(Error)]` - `Display` and `std::error::Error` for error enums

mod binary_codec;
mod error;

use proc_macro::TokenStream;

/// Implements `Encode` and `Decode` for a struct by encoding its fields in declaration order.
#[proc_macro_derive(BinaryCodec)]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    binary_codec::derive_binary_codec(input)
}

/// Implements `Display` and `Error` from `#[error("...")]` attributes.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
