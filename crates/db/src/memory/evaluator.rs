//! Evaluation of the filter tree against in-memory BSON documents.
//!
//! Semantics follow MongoDB where the application relies on them: dotted paths reach
//! into embedded documents and arrays of documents, array fields match when any
//! element matches, numbers compare across integer and double representations, range
//! operators only compare values of the same kind, and sorting uses the cross-type
//! order null < numbers < strings < documents < arrays < ids < booleans < dates.

use std::cmp::Ordering;

use bson::{Bson, Document, Regex};
use bookstore_query::{Expr, FieldOp, FilterVisitor, Projection, SortDirection, SortKey};
use regex::RegexBuilder;

use crate::error::{StoreError, StoreResult};

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// `None` criteria match every document.
    pub fn matches(document: &'a Document, criteria: Option<&Expr>) -> StoreResult<bool> {
        match criteria {
            Some(expr) => DocumentEvaluator::new(document).visit_expr(expr),
            None => Ok(true),
        }
    }
}

impl FilterVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> StoreResult<bool> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> StoreResult<bool> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> StoreResult<bool> {
        Ok(!resolve(self.document, field).is_empty() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> StoreResult<bool> {
        let candidates = resolve(self.document, field);

        match op {
            FieldOp::Eq => Ok(any_equal(&candidates, value)),
            FieldOp::Ne => Ok(!any_equal(&candidates, value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                Ok(flatten(&candidates).any(|candidate| {
                    same_kind(candidate, value)
                        && match compare(candidate, value) {
                            Ordering::Greater => matches!(op, FieldOp::Gt | FieldOp::Gte),
                            Ordering::Equal => matches!(op, FieldOp::Gte | FieldOp::Lte),
                            Ordering::Less => matches!(op, FieldOp::Lt | FieldOp::Lte),
                        }
                }))
            }
            FieldOp::In | FieldOp::Nin => {
                let Bson::Array(values) = value else {
                    return Err(StoreError::InvalidQuery(format!("{op:?} requires an array")));
                };
                let mut found = false;
                for value in values {
                    found = match value {
                        Bson::RegularExpression(re) => any_match(&candidates, re)?,
                        _ => any_equal(&candidates, value),
                    };
                    if found {
                        break;
                    }
                }
                Ok(found == (op == FieldOp::In))
            }
            FieldOp::Matches | FieldOp::NotMatches => {
                let Bson::RegularExpression(re) = value else {
                    return Err(StoreError::InvalidQuery(format!(
                        "{op:?} requires a regular expression"
                    )));
                };
                Ok(any_match(&candidates, re)? == (op == FieldOp::Matches))
            }
        }
    }
}

/// Every value reachable through a dotted `path`. Arrays of documents met half-way fan
/// out into each element.
pub(crate) fn resolve<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut current: Vec<&Bson> = Vec::new();
    let mut segments = path.split('.');

    let Some(first) = segments.next() else {
        return current;
    };
    if let Some(value) = document.get(first) {
        current.push(value);
    }

    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match value {
                Bson::Document(inner) => next.extend(inner.get(segment)),
                Bson::Array(items) => {
                    for item in items {
                        if let Bson::Document(inner) = item {
                            next.extend(inner.get(segment));
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn flatten<'a>(candidates: &'a [&'a Bson]) -> impl Iterator<Item = &'a Bson> + 'a {
    candidates.iter().flat_map(|candidate| match candidate {
        Bson::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![*other],
    })
}

fn any_equal(candidates: &[&Bson], value: &Bson) -> bool {
    candidates.iter().any(|candidate| {
        equal(candidate, value)
            || matches!(candidate, Bson::Array(items) if items.iter().any(|item| equal(item, value)))
    })
}

fn any_match(candidates: &[&Bson], re: &Regex) -> StoreResult<bool> {
    let compiled = compile(re)?;
    Ok(flatten(candidates).any(|candidate| match candidate {
        Bson::String(text) => compiled.is_match(text),
        _ => false,
    }))
}

fn compile(re: &Regex) -> StoreResult<regex::Regex> {
    RegexBuilder::new(&re.pattern)
        .case_insensitive(re.options.contains('i'))
        .multi_line(re.options.contains('m'))
        .dot_matches_new_line(re.options.contains('s'))
        .build()
        .map_err(|e| StoreError::InvalidQuery(e.to_string()))
}

fn equal(a: &Bson, b: &Bson) -> bool {
    rank(a) == rank(b) && compare(a, b) == Ordering::Equal
}

fn same_kind(a: &Bson, b: &Bson) -> bool {
    rank(a) == rank(b)
}

fn rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 1,
        Bson::String(_) | Bson::Symbol(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::Binary(_) => 5,
        Bson::ObjectId(_) => 6,
        Bson::Boolean(_) => 7,
        Bson::DateTime(_) => 8,
        Bson::Timestamp(_) => 9,
        Bson::RegularExpression(_) => 10,
        _ => 11,
    }
}

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Total order over BSON values used for sorting and range comparisons.
pub(crate) fn compare(a: &Bson, b: &Bson) -> Ordering {
    let by_rank = rank(a).cmp(&rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        (Bson::Array(x), Bson::Array(y)) => compare_sequences(x.iter(), y.iter()),
        (Bson::Document(x), Bson::Document(y)) => compare_sequences(x.values(), y.values()),
        _ => match (number(a), number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn compare_sequences<'a>(
    mut left: impl Iterator<Item = &'a Bson>,
    mut right: impl Iterator<Item = &'a Bson>,
) -> Ordering {
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Orders two documents by a list of sort keys. Missing fields sort as null.
pub(crate) fn compare_documents(a: &Document, b: &Document, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let left = resolve(a, &key.field).first().copied().unwrap_or(&Bson::Null);
        let right = resolve(b, &key.field).first().copied().unwrap_or(&Bson::Null);
        let ordering = match key.direction {
            SortDirection::Asc => compare(left, right),
            SortDirection::Desc => compare(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Applies a top-level projection. Dotted names are matched on their first segment.
pub(crate) fn project(document: &Document, projection: &Projection) -> Document {
    if projection.is_all() {
        return document.clone();
    }
    let listed = |names: &[String], key: &str| {
        names
            .iter()
            .any(|name| name.split('.').next() == Some(key))
    };

    document
        .iter()
        .filter(|(key, _)| {
            let key = key.as_str();
            !projection.exclude.iter().any(|field| field == key)
                && (projection.include.is_empty()
                    || key == "_id"
                    || listed(&projection.include, key))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use bookstore_query::QueryTranslator;

    fn book() -> Document {
        doc! {
            "_id": ObjectId::new(),
            "title": "The Hobbit",
            "price": 12.5,
            "category": "fantasy",
            "tags": ["classic", "dragons"],
            "address": { "street": "Bag End", "number": 1 },
            "purchases": [ { "title": "A" }, { "title": "B" } ],
        }
    }

    fn matches(raw: &str, document: &Document) -> bool {
        let query = QueryTranslator::default().translate(raw).unwrap();
        DocumentEvaluator::matches(document, query.criteria.as_ref()).unwrap()
    }

    #[test]
    fn equality_and_numbers_across_types() {
        let book = book();
        assert!(matches("category=fantasy", &book));
        assert!(!matches("category=horror", &book));
        assert!(matches("price=12.5", &book));
        assert!(matches("address.number=1", &book));
    }

    #[test]
    fn range_only_compares_same_kind() {
        let book = book();
        assert!(matches("price>10", &book));
        assert!(matches("price<=12.5", &book));
        assert!(!matches("price<12", &book));
        assert!(!matches("title>5", &book));
    }

    #[test]
    fn arrays_match_on_any_element() {
        let book = book();
        assert!(matches("tags=dragons", &book));
        assert!(!matches("tags=!dragons", &book));
        assert!(matches("purchases.title=B", &book));
    }

    #[test]
    fn membership_patterns_and_existence() {
        let book = book();
        assert!(matches("category=history,fantasy", &book));
        assert!(!matches("category!=history,fantasy", &book));
        assert!(matches("title=/hobbit/i", &book));
        assert!(!matches("title=/hobbit/", &book));
        assert!(matches("img=!", &book));
        assert!(matches("title", &book));
    }

    #[test]
    fn ordering_is_total_across_types() {
        assert_eq!(compare(&Bson::Null, &Bson::Int32(0)), Ordering::Less);
        assert_eq!(compare(&Bson::Int64(2), &Bson::Double(1.5)), Ordering::Greater);
        assert_eq!(
            compare(&Bson::String("a".into()), &Bson::Int32(9)),
            Ordering::Greater
        );
    }

    #[test]
    fn sort_by_several_keys() {
        let a = doc! { "category": "fantasy", "price": 5 };
        let b = doc! { "category": "fantasy", "price": 9 };
        let sort = vec![SortKey::asc("category"), SortKey::desc("price")];
        assert_eq!(compare_documents(&a, &b, &sort), Ordering::Greater);
    }

    #[test]
    fn projection_keeps_id_and_selected_fields() {
        let book = book();
        let projected = project(&book, &Projection::include(["title"]));
        assert_eq!(projected.keys().collect::<Vec<_>>(), vec!["_id", "title"]);

        let projected = project(&book, &Projection::exclude(["_id", "tags"]));
        assert!(!projected.contains_key("_id"));
        assert!(!projected.contains_key("tags"));
        assert!(projected.contains_key("title"));
    }
}
