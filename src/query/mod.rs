mod filter;
mod where_clause;

pub use filter::{BindParam, Filter};
pub use where_clause::{generate_ordering, generate_where, WhereClause};
