//! Translation of the filter tree and find options into MongoDB query documents.

use bson::{doc, Bson, Document};
use bookstore_query::{Expr, FieldOp, FilterVisitor, Projection, SortKey};

use crate::error::{StoreError, StoreResult};

pub(crate) struct MongoFilterTranslator;

impl MongoFilterTranslator {
    pub fn criteria(criteria: Option<&Expr>) -> StoreResult<Document> {
        match criteria {
            Some(expr) => MongoFilterTranslator.visit_expr(expr),
            None => Ok(Document::new()),
        }
    }
}

impl FilterVisitor for MongoFilterTranslator {
    type Output = Document;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> StoreResult<Document> {
        if exprs.is_empty() {
            return Ok(Document::new());
        }
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<StoreResult<Vec<_>>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> StoreResult<Document> {
        if exprs.is_empty() {
            // An empty disjunction matches nothing; Mongo rejects `$or: []`.
            return Ok(doc! { "_id": { "$exists": false } });
        }
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<StoreResult<Vec<_>>>()?,
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> StoreResult<Document> {
        Ok(doc! { field: { "$exists": should_exist } })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> StoreResult<Document> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value.clone() },
            FieldOp::Ne => doc! { "$ne": value.clone() },
            FieldOp::Gt => doc! { "$gt": value.clone() },
            FieldOp::Gte => doc! { "$gte": value.clone() },
            FieldOp::Lt => doc! { "$lt": value.clone() },
            FieldOp::Lte => doc! { "$lte": value.clone() },
            FieldOp::In => doc! { "$in": array_operand(op, value)? },
            FieldOp::Nin => doc! { "$nin": array_operand(op, value)? },
            FieldOp::Matches => match value {
                Bson::RegularExpression(re) => doc! {
                    "$regex": re.pattern.clone(),
                    "$options": re.options.clone(),
                },
                _ => return Err(operand_error(op, "a regular expression")),
            },
            FieldOp::NotMatches => match value {
                Bson::RegularExpression(_) => doc! { "$not": value.clone() },
                _ => return Err(operand_error(op, "a regular expression")),
            },
        };
        Ok(doc! { field: condition })
    }
}

pub(crate) fn projection_document(projection: &Projection) -> Option<Document> {
    if projection.is_all() {
        return None;
    }
    let mut document = Document::new();
    for field in &projection.include {
        document.insert(field.clone(), 1);
    }
    for field in &projection.exclude {
        document.insert(field.clone(), 0);
    }
    Some(document)
}

pub(crate) fn sort_document(sort: &[SortKey]) -> Option<Document> {
    if sort.is_empty() {
        return None;
    }
    Some(
        sort.iter()
            .map(|key| (key.field.clone(), Bson::Int32(key.direction.as_i32())))
            .collect(),
    )
}

fn array_operand(op: FieldOp, value: &Bson) -> StoreResult<Bson> {
    match value {
        Bson::Array(_) => Ok(value.clone()),
        _ => Err(operand_error(op, "an array")),
    }
}

fn operand_error(op: FieldOp, expected: &str) -> StoreError {
    StoreError::InvalidQuery(format!("{op:?} requires {expected}"))
}
