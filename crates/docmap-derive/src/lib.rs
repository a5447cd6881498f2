use proc_macro::TokenStream;

mod embeddable;
mod entity;
mod util;

/// Implements `Entity` (and `IntoArgument`) from the type's declaration.
///
/// On a struct with named fields every field is mapped in declaration
/// order. Container options go in `#[entity(..)]`: `name`, `collection`,
/// `discriminator`, `discriminator_column` and the flag `default`, which
/// builds instances through `Default` instead of a constructor over every
/// mapped field. Field options go in `#[field(..)]`: `id`, `column = ".."`
/// and `skip`.
///
/// On an enum whose variants each wrap one entity, the enum becomes the
/// root of a single-level hierarchy with one subtype per variant.
#[proc_macro_derive(Entity, attributes(entity, field))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input.into()).into()
}

/// Implements `FieldValue` for a struct stored as a nested record.
#[proc_macro_derive(Embeddable, attributes(field))]
pub fn derive_embeddable(input: TokenStream) -> TokenStream {
    embeddable::derive_embeddable(input.into()).into()
}
