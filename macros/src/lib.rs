mod traits;

use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Ident};
use traits::StructFields;

#[derive(Clone, FromField)]
#[darling(attributes(authored))]
struct AuthoredField {
    ident: Option<Ident>,

    #[darling(default)]
    author: bool,
}

#[derive(FromDeriveInput)]
#[darling(attributes(authored))]
struct AuthoredStruct {
    ident: Ident,
    data: darling::ast::Data<(), AuthoredField>,
}

/// Implements `crate::models::traits::Authored` for the struct. The field holding the author's id
/// is marked with `#[authored(author)]`.
#[proc_macro_derive(Authored, attributes(authored))]
pub fn authored_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let parsed_struct = match AuthoredStruct::from_derive_input(&ast) {
        Ok(value) => value,
        Err(e) => return e.write_errors().into(),
    };
    let struct_name = parsed_struct.ident;

    let author_fields = match parsed_struct.data {
        darling::ast::Data::Struct(fields) => fields
            .fields
            .into_iter()
            .filter(|field| field.author)
            .collect::<Vec<AuthoredField>>(),
        _ => Vec::new(),
    };

    if author_fields.len() != 1 {
        panic!("Authored requires single #[authored(author)] attribute to determine the author field");
    }

    let field_name = author_fields[0]
        .ident
        .as_ref()
        .expect("Field without an identifier");

    let expanded = quote! {
        impl crate::models::traits::Authored for #struct_name {
            fn author_id(&self) -> charybdis::types::Uuid {
                self.#field_name
            }
        }
    };

    TokenStream::from(expanded)
}

#[proc_macro_derive(Id)]
pub fn id_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    if !input.has_field("id") {
        panic!("Struct must have `id` field to derive Id");
    }

    let expanded = quote! {
        impl crate::models::traits::Id for #name {
            fn id(&self) -> charybdis::types::Uuid {
                self.id
            }
        }
    };

    TokenStream::from(expanded)
}
