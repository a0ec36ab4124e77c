use syn::Fields;

pub trait StructFields {
    fn struct_fields(&self) -> &Fields;

    fn has_field(&self, name: &str) -> bool {
        self.struct_fields()
            .iter()
            .any(|field| field.ident.as_ref().is_some_and(|ident| ident == name))
    }
}

impl StructFields for syn::DeriveInput {
    fn struct_fields(&self) -> &Fields {
        match &self.data {
            syn::Data::Struct(data) => &data.fields,
            _ => {
                panic!("Only structs with named fields can derive model traits");
            }
        }
    }
}
