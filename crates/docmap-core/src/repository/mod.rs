//! Repository synthesis and dispatch.
//!
//! A repository is declared once as a [`RepositoryDescriptor`], usually
//! generated by the `repository!` macro. Synthesis classifies every method
//! (fixed vocabulary, derived name or explicit query text), checks its
//! parameters and return shape, and plans it. Invocation binds arguments,
//! runs the query through the template and wraps the mapped rows.

mod argument;
mod asynchronous;
mod compile;
mod derived;
mod descriptor;
mod dispatch;
mod outcome;
mod plan;
mod text;

pub use argument::{Argument, IntoArgument};
pub use asynchronous::AsyncRepository;
pub use descriptor::{
    MethodDescriptor, ParamDescriptor, ParamShape, RepositoryDescriptor, ReturnShape,
};
pub use dispatch::Repository;
pub use outcome::{AsyncEntityStream, AsyncOutcome, EntityStream, FromOutcome, Outcome};
