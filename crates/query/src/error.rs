//! Errors raised while translating a query string.

use thiserror::Error;

/// Every way a query string can be rejected. All of them are client errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The raw query string could not be percent-decoded.
    #[error("malformed query string: {0}")]
    Encoding(String),

    /// `offset` / `limit` (or another numeric parameter) is not a valid number.
    #[error("invalid value '{value}' for '{key}': expected a {expected}")]
    InvalidNumber {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// A range comparison whose operand is neither a number nor a date.
    #[error("cannot compare '{field}' with '{value}': expected a number or a date")]
    InvalidComparison { field: String, value: String },

    /// A condition that does not follow the `[!]field[op value]` grammar.
    #[error("malformed condition '{0}'")]
    MalformedCondition(String),

    /// Empty field names or names that would smuggle operators into the store query.
    #[error("invalid field name '{0}'")]
    InvalidField(String),

    /// A `/pattern/` value that does not compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// `fields` / `omit` asked to both include and exclude fields.
    #[error("projection cannot mix included and excluded fields")]
    MixedProjection,
}

pub type QueryResult<T> = Result<T, QueryError>;
