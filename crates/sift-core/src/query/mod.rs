//! Query compilation.
//!
//! [`QueryCompiler`] turns condition trees into backend-neutral
//! [`Criteria`](sift_proto::Criteria), resolves ordering and global search,
//! runs paged queries against a
//! [`PersistenceAdapter`](crate::store::PersistenceAdapter), and shapes the
//! rows it gets back.

pub mod compiler;
pub mod executor;
pub mod operator;
pub mod rows;
pub mod search;
pub mod sort;

pub use compiler::{QueryCompiler, ROOT_CONDITION_ID};
pub use operator::map_operator;
pub use rows::{map_row, DisplayFormatter};
pub use search::{build_global_search, GLOBAL_SEARCH_ID};
pub use sort::resolve_sort;
