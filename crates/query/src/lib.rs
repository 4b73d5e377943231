//! Translation of HTTP query strings into document queries.
//!
//! A query string such as `category=fantasy&price<20&sort=-price&limit=5` becomes a
//! [`TranslatedQuery`]: a typed filter tree ([`Expr`]), find options (projection,
//! skip, limit, sort) and enough of the original parameters to build pagination
//! [`Links`].

pub mod error;
pub mod filter;
pub mod links;
pub mod options;
pub mod parser;
pub mod value;

pub use error::{QueryError, QueryResult};
pub use filter::{Expr, FieldOp, FilterVisitor};
pub use links::Links;
pub use options::{FindOptions, Projection, SortDirection, SortKey};
pub use parser::{QueryTranslator, TranslatedQuery, TranslatorOptions};
