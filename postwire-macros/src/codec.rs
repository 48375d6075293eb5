use proc_macro2::TokenStream;
use quote::quote;
use syn::*;

use crate::{attr::FieldAttr, error};

/// Struct shape relevant to encoding.
enum Shape<'a> {
    /// Single field, encoded as the field itself.
    Transparent(&'a Field, Option<Member>),
    /// Named fields, encoded as `jsonb` record.
    Record(Vec<(&'a Field, String)>),
}

fn shape<'a>(ident: &Ident, data: &'a Data) -> Result<Shape<'a>> {
    let Data::Struct(data) = data else {
        error!(ident, "only struct are supported")
    };

    match &data.fields {
        Fields::Unnamed(FieldsUnnamed { unnamed, .. }) if unnamed.len() == 1 => {
            Ok(Shape::Transparent(&unnamed[0], None))
        },
        Fields::Unnamed(_) => error!(ident, "tuple struct with more than one field is not supported"),
        Fields::Named(FieldsNamed { named, .. }) if named.len() == 1 => {
            let field = &named[0];
            Ok(Shape::Transparent(field, field.ident.clone().map(Member::Named)))
        },
        Fields::Named(FieldsNamed { named, .. }) => {
            let fields = named
                .iter()
                .map(|field| Ok((field, FieldAttr::from_field(field)?.name(field))))
                .collect::<Result<_>>()?;
            Ok(Shape::Record(fields))
        },
        Fields::Unit => error!(ident, "unit struct is not supported"),
    }
}

fn add_bound(generics: &mut Generics, bound: TypeParamBound) {
    for ty in generics.type_params_mut() {
        ty.bounds.push(bound.clone());
    }
}

pub fn encode(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput { ident, mut generics, data, .. } = input;

    let body = match shape(&ident, &data)? {
        Shape::Transparent(_, member) => {
            let member = member.unwrap_or_else(|| Member::Unnamed(Index::from(0)));
            add_bound(&mut generics, parse_quote!(::postwire::Encode));
            quote! { ::postwire::Encode::encode(&self.#member) }
        },
        Shape::Record(fields) => {
            let fields = fields.iter().map(|(field, name)| {
                let id = &field.ident;
                quote! { .field(#name, &self.#id)? }
            });
            add_bound(&mut generics, parse_quote!(::serde::Serialize));
            quote! {
                ::postwire::types::RecordEncoder::new()
                    #(#fields)*
                    .finish()
            }
        },
    };

    let (g1, g2, g3) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #g1 ::postwire::Encode for #ident #g2 #g3 {
            fn encode(&self) -> ::core::result::Result<::postwire::WireValue, ::postwire::types::ConversionError> {
                #body
            }
        }
    })
}

pub fn decode(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput { ident, mut generics, data, .. } = input;

    let body = match shape(&ident, &data)? {
        Shape::Transparent(_, Some(member)) => {
            add_bound(&mut generics, parse_quote!(::postwire::Decode));
            quote! { Ok(Self { #member: ::postwire::Decode::decode(value)? }) }
        },
        Shape::Transparent(_, None) => {
            add_bound(&mut generics, parse_quote!(::postwire::Decode));
            quote! { Ok(Self(::postwire::Decode::decode(value)?)) }
        },
        Shape::Record(fields) => {
            let fields = fields.iter().map(|(field, name)| {
                let id = &field.ident;
                quote! { #id: record.field(#name)?, }
            });
            add_bound(&mut generics, parse_quote!(::serde::de::DeserializeOwned));
            quote! {
                let mut record = ::postwire::types::RecordDecoder::new(value)?;
                Ok(Self { #(#fields)* })
            }
        },
    };

    let (g1, g2, g3) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #g1 ::postwire::Decode for #ident #g2 #g3 {
            fn decode(value: ::postwire::WireValue) -> ::core::result::Result<Self, ::postwire::types::ConversionError> {
                #body
            }
        }
    })
}

pub fn pg_type(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput { ident, mut generics, data, .. } = input;

    let (oid, array_oid) = match shape(&ident, &data)? {
        Shape::Transparent(field, _) => {
            let ty = &field.ty;
            (
                quote! { <#ty as ::postwire::PgType>::OID },
                quote! { <#ty as ::postwire::PgType>::ARRAY_OID },
            )
        },
        Shape::Record(_) => (
            quote! { ::postwire::postgres::oid::JSONB },
            quote! { ::postwire::postgres::oid::JSONB_ARRAY },
        ),
    };

    add_bound(&mut generics, parse_quote!(::postwire::PgType));
    let (g1, g2, g3) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #g1 ::postwire::PgType for #ident #g2 #g3 {
            const OID: ::postwire::postgres::Oid = #oid;
            const ARRAY_OID: ::postwire::postgres::Oid = #array_oid;
        }

        #[automatically_derived]
        impl #g1 ::postwire::types::ArrayElement for #ident #g2 #g3 { }
    })
}
