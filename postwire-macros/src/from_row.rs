use proc_macro2::TokenStream;
use quote::quote;
use syn::*;

use crate::{attr::FieldAttr, error};

pub fn from_row(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput { attrs: _, vis: _, ident, mut generics, data } = input;
    let Data::Struct(data) = data else {
        error!(&ident, "only struct are supported")
    };

    let body = match &data.fields {
        Fields::Named(FieldsNamed { named, .. }) => {
            let fields = named
                .iter()
                .map(|field| {
                    let attr = FieldAttr::from_field(field)?;
                    let name = attr.name(field);
                    let id = &field.ident;
                    Ok(quote! { #id: row.try_get(#name)?, })
                })
                .collect::<Result<Vec<_>>>()?;
            quote! { Ok(Self { #(#fields)* }) }
        },
        Fields::Unnamed(FieldsUnnamed { unnamed, .. }) => {
            let fields = (0..unnamed.len()).map(|i| quote! { row.try_get(#i)?, });
            quote! { Ok(Self( #(#fields)* )) }
        },
        Fields::Unit => quote! { Ok(Self) },
    };

    for ty in generics.type_params_mut() {
        ty.bounds.push(parse_quote!(::postwire::Decode));
    }

    let (g1, g2, g3) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #g1 ::postwire::FromRow for #ident #g2 #g3 {
            fn from_row(row: ::postwire::Row) -> ::core::result::Result<Self, ::postwire::types::ConversionError> {
                #body
            }
        }
    })
}
