use crate::util::{self, FieldInput};
use darling::{FromDeriveInput, ast};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Generics, Ident};

// derive_embeddable
pub fn derive_embeddable(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    EmbeddableInput::from_derive_input(&input)
        .and_then(|embeddable| embeddable.expand())
        .unwrap_or_else(darling::Error::write_errors)
}

///
/// EmbeddableInput
///

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named))]
struct EmbeddableInput {
    ident: Ident,
    generics: Generics,
    data: ast::Data<(), FieldInput>,
}

impl EmbeddableInput {
    fn expand(&self) -> darling::Result<TokenStream> {
        util::reject_generics(&self.generics, "Embeddable")?;

        let ident = &self.ident;
        let core = util::core_path();
        let fields = self
            .data
            .as_ref()
            .take_struct()
            .map(|fields| fields.fields)
            .unwrap_or_default();

        let mut writes = Vec::new();
        let mut reads = Vec::new();

        for field in fields {
            field.validate()?;
            let field_ident = field.ident()?;

            if field.id {
                return Err(darling::Error::custom("embedded values have no identifier")
                    .with_span(field_ident));
            }
            if field.skip {
                reads.push(quote!(#field_ident: ::core::default::Default::default()));
                continue;
            }

            let column = field.column()?;
            writes.push(quote! {
                .with(#column, #core::traits::FieldValue::to_value(&self.#field_ident))
            });
            reads.push(quote! {
                #field_ident: #core::traits::FieldValue::from_value(record.value(#column))?
            });
        }

        Ok(quote! {
            impl #core::traits::FieldValue for #ident {
                fn kind() -> #core::traits::FieldValueKind {
                    #core::traits::FieldValueKind::Embedded
                }

                fn to_value(&self) -> #core::value::Value {
                    #core::value::Value::Record(#core::value::Record::new() #(#writes)*)
                }

                #[allow(unused_variables)]
                fn from_value(value: &#core::value::Value) -> ::core::option::Option<Self> {
                    let record = value.as_record()?;

                    ::core::option::Option::Some(Self { #(#reads),* })
                }
            }
        })
    }
}
