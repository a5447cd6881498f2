mod condition;
#[expect(clippy::module_inception)]
mod query;
mod sort;

pub use condition::{CompareOp, Comparison, Condition};
pub use query::{Query, QueryBuilder};
pub use sort::{Direction, Order, Sort, merge_sorts};
