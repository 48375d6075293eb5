//! Derive macros for `postwire`.
use proc_macro::TokenStream;
use syn::DeriveInput;

mod attr;
mod from_row;
mod codec;

macro_rules! error {
    ($span:expr, $($tt:tt)*) => {
        return Err(syn::Error::new_spanned($span, format!($($tt)*)))
    };
}

pub(crate) use error;

/// Derive `FromRow`.
///
/// Struct with named fields is decoded by column name, use `#[postwire(rename = "..")]` to
/// decode from different column name. Tuple struct is decoded by column position.
#[proc_macro_derive(FromRow, attributes(postwire))]
pub fn from_row(input: TokenStream) -> TokenStream {
    match from_row::from_row(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Derive `Encode`.
///
/// Single field struct is encoded as its field, struct with more fields is encoded as `jsonb`
/// record, which requires `json` feature and every field to implement `Serialize`.
#[proc_macro_derive(Encode, attributes(postwire))]
pub fn encode(input: TokenStream) -> TokenStream {
    match codec::encode(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Derive `Decode`, the counterpart of [`Encode`][macro@Encode].
#[proc_macro_derive(Decode, attributes(postwire))]
pub fn decode(input: TokenStream) -> TokenStream {
    match codec::decode(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Derive `PgType` and `ArrayElement`.
///
/// Single field struct has the type of its field, struct with more fields is `jsonb`.
#[proc_macro_derive(PgType)]
pub fn pg_type(input: TokenStream) -> TokenStream {
    match codec::pg_type(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok.into(),
        Err(err) => err.into_compile_error().into(),
    }
}
