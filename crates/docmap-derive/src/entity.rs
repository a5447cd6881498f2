use crate::util::{self, FieldInput};
use darling::{FromDeriveInput, FromVariant, ast};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Generics, Ident};

// derive_entity
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    EntityInput::from_derive_input(&input)
        .and_then(|entity| entity.expand())
        .unwrap_or_else(darling::Error::write_errors)
}

///
/// EntityInput
/// the deriving type plus its `#[entity(..)]` options
///

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(entity), supports(struct_named, enum_newtype))]
struct EntityInput {
    ident: Ident,
    generics: Generics,
    data: ast::Data<VariantInput, FieldInput>,

    #[darling(default)]
    name: Option<String>,

    #[darling(default)]
    collection: Option<String>,

    #[darling(default)]
    discriminator: Option<String>,

    #[darling(default)]
    discriminator_column: Option<String>,

    #[darling(default)]
    default: bool,
}

///
/// VariantInput
/// one subtype of a hierarchy root
///

#[derive(Debug, FromVariant)]
struct VariantInput {
    ident: Ident,
}

impl EntityInput {
    fn expand(&self) -> darling::Result<TokenStream> {
        util::reject_generics(&self.generics, "Entity")?;

        let ident = &self.ident;
        let entity_name = self.name.clone().unwrap_or_else(|| ident.to_string());

        let mut calls = Vec::new();
        if let Some(collection) = &self.collection {
            calls.push(quote!(.collection(#collection)));
        }
        if let Some(discriminator) = &self.discriminator {
            calls.push(quote!(.discriminator(#discriminator)));
        }
        if let Some(column) = &self.discriminator_column {
            calls.push(quote!(.discriminator_column(#column)));
        }

        match &self.data {
            ast::Data::Struct(fields) => calls.extend(self.struct_calls(&fields.fields)?),
            ast::Data::Enum(variants) => calls.extend(hierarchy_calls(ident, variants)?),
        }

        let core = util::core_path();

        Ok(quote! {
            impl #core::traits::Entity for #ident {
                fn metadata() -> #core::model::EntityMetadataBuilder<Self> {
                    #core::model::EntityMetadataBuilder::<Self>::new(#entity_name)
                        #(#calls)*
                }
            }

            impl #core::repository::IntoArgument for #ident {
                const SHAPE: #core::repository::ParamShape = #core::repository::ParamShape::Entity;

                fn into_argument(self) -> #core::repository::Argument {
                    #core::repository::Argument::entity(self)
                }
            }
        })
    }

    // field mappings in declaration order, then the constructor
    fn struct_calls(&self, fields: &[FieldInput]) -> darling::Result<Vec<TokenStream>> {
        let mut errors = darling::Error::accumulator();
        let mut calls = Vec::new();
        let mut parameters = Vec::new();
        let mut inits = Vec::new();
        let mut id_seen = false;

        for field in fields {
            if errors.handle(field.validate()).is_none() {
                continue;
            }
            let Some(ident) = errors.handle(field.ident()) else {
                continue;
            };

            if field.skip {
                inits.push(quote!(#ident: ::core::default::Default::default()));
                continue;
            }

            let Some(name) = errors.handle(field.name()) else {
                continue;
            };
            let mapping = if field.id {
                if id_seen {
                    errors.push(
                        darling::Error::custom("only one field can be the identifier")
                            .with_span(ident),
                    );
                }
                id_seen = true;
                quote!(id)
            } else {
                quote!(field)
            };

            calls.push(quote!(.#mapping(#name, |e| &e.#ident, |e| &mut e.#ident)));
            if let Some(column) = &field.column {
                calls.push(quote!(.column(#column)));
            }

            parameters.push(name);
            inits.push(quote!(#ident: args.take()?));
        }
        errors.finish()?;

        if self.default {
            calls.push(quote!(.default_constructor(<Self as ::core::default::Default>::default)));
        } else {
            calls.push(quote! {
                .constructor(&[#(#parameters),*], |args| {
                    ::core::result::Result::Ok(Self { #(#inits),* })
                })
            });
        }

        Ok(calls)
    }
}

// one subtype per newtype variant
fn hierarchy_calls(root: &Ident, variants: &[VariantInput]) -> darling::Result<Vec<TokenStream>> {
    if variants.is_empty() {
        return Err(
            darling::Error::custom("a hierarchy root needs at least one subtype variant")
                .with_span(root),
        );
    }

    Ok(variants
        .iter()
        .map(|variant| {
            let v = &variant.ident;

            quote! {
                .subtype(Self::#v, |root| match root {
                    Self::#v(subtype) => ::core::option::Option::Some(subtype),
                    #[allow(unreachable_patterns)]
                    _ => ::core::option::Option::None,
                })
            }
        })
        .collect())
}
