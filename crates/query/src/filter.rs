//! Typed filter tree produced by the translator and consumed by store backends.
//!
//! Backends walk the tree through [`FilterVisitor`]: the MongoDB backend turns it into a
//! query document, the in-memory backend evaluates it against each document.

use bson::{Bson, Regex};

/// Comparison operators a single field condition can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (array fields match when any element is equal).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Equal to any element of the array operand.
    In,
    /// Equal to none of the elements of the array operand.
    Nin,
    /// Matches the regular expression operand.
    Matches,
    /// Does not match the regular expression operand.
    NotMatches,
}

impl FieldOp {
    /// Whether the operator orders values rather than testing (in)equality.
    pub fn is_range(self) -> bool {
        matches!(self, FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte)
    }
}

/// A filter expression. `And` of nothing matches every document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All sub-expressions must match.
    And(Vec<Expr>),
    /// At least one sub-expression must match.
    Or(Vec<Expr>),
    /// The field is present (`true`) or absent (`false`).
    Exists(String, bool),
    /// A single field condition.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    pub fn field(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Self {
        Expr::Field {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Gt, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(field, FieldOp::Lt, value)
    }

    pub fn exists(field: impl Into<String>, should_exist: bool) -> Self {
        Expr::Exists(field.into(), should_exist)
    }

    /// Case-insensitive substring match of `term` taken literally.
    pub fn contains_text(field: impl Into<String>, term: &str) -> Self {
        Self::field(
            field,
            FieldOp::Matches,
            Bson::RegularExpression(Regex {
                pattern: regex::escape(term),
                options: "i".to_string(),
            }),
        )
    }

    /// Conjoins `self` with `other`, flattening nested `And`s.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Collapses a list of conditions into a single criteria expression.
    /// An empty list means "match all" and yields `None`.
    pub fn all(mut exprs: Vec<Expr>) -> Option<Expr> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::And(exprs)),
        }
    }
}

/// Walks an [`Expr`] tree. Implementors decide what a node turns into.
pub trait FilterVisitor {
    type Output;
    type Error;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_exists(&mut self, field: &str, should_exist: bool)
        -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, *op, value),
        }
    }
}
