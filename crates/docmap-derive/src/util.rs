use darling::FromField;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Generics, Ident, LitStr, ext::IdentExt};

/// Path generated code uses to reach the runtime.
pub fn core_path() -> TokenStream {
    quote!(::docmap::core)
}

pub fn reject_generics(generics: &Generics, derive: &str) -> darling::Result<()> {
    if generics.params.is_empty() {
        Ok(())
    } else {
        Err(darling::Error::custom(format!(
            "{derive} cannot be derived for generic types"
        ))
        .with_span(generics))
    }
}

///
/// FieldInput
/// one named field and its `#[field(..)]` options
///

#[derive(Debug, FromField)]
#[darling(attributes(field))]
pub struct FieldInput {
    pub ident: Option<Ident>,

    #[darling(default)]
    pub id: bool,

    #[darling(default)]
    pub skip: bool,

    #[darling(default)]
    pub column: Option<String>,
}

impl FieldInput {
    pub fn ident(&self) -> darling::Result<&Ident> {
        self.ident
            .as_ref()
            .ok_or_else(|| darling::Error::custom("expected a named field"))
    }

    /// Field name as metadata sees it, without any `r#` prefix.
    pub fn name(&self) -> darling::Result<LitStr> {
        let ident = self.ident()?;

        Ok(LitStr::new(&ident.unraw().to_string(), ident.span()))
    }

    /// Storage name: the explicit column, else the field name.
    pub fn column(&self) -> darling::Result<LitStr> {
        match &self.column {
            Some(column) => Ok(LitStr::new(column, self.ident()?.span())),
            None => self.name(),
        }
    }

    pub fn validate(&self) -> darling::Result<()> {
        if self.skip && (self.id || self.column.is_some()) {
            return Err(darling::Error::custom(
                "a skipped field cannot also be the identifier or have a column",
            )
            .with_span(self.ident()?));
        }

        Ok(())
    }
}
