//! Query-string grammar.
//!
//! ```text
//! query     := pair ( "&" pair )*
//! pair      := reserved | condition
//! reserved  := ("fields" | "omit" | "sort" | "offset" | "limit" | "q") "=" value
//! condition := ["!"] field [ op value ]
//! op        := "=" | "!=" | ">" | ">=" | "<" | "<="
//! ```
//!
//! Form decoding splits a pair on its first `=`, so `price>=10` arrives as
//! (`price>`, `10`) and `price>10` as (`price>10`, ``). Conditions are therefore
//! parsed from the key and value joined back together.

use bson::Bson;

use crate::{
    error::{QueryError, QueryResult},
    filter::{Expr, FieldOp},
    links::Links,
    options::{FindOptions, Projection, SortKey},
    value::{split_list, typed_value},
};

const FIELDS: &str = "fields";
const OMIT: &str = "omit";
const SORT: &str = "sort";
const OFFSET: &str = "offset";
const LIMIT: &str = "limit";
const SEARCH: &str = "q";

/// Knobs of a translator, usually one per resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorOptions {
    /// Page size when the query has no `limit`.
    pub default_limit: u64,
    /// Upper bound applied to any requested `limit`.
    pub max_limit: u64,
    /// Fields searched by `q=`. Without any, `q` is an ordinary condition.
    pub text_fields: Vec<String>,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            text_fields: Vec::new(),
        }
    }
}

/// Turns raw query strings into [`TranslatedQuery`] values.
#[derive(Debug, Clone, Default)]
pub struct QueryTranslator {
    options: TranslatorOptions,
}

impl QueryTranslator {
    pub fn new(options: TranslatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Translates the raw (still percent-encoded) query string of a request.
    pub fn translate(&self, raw: &str) -> QueryResult<TranslatedQuery> {
        self.translate_pairs(decode_pairs(raw)?)
    }

    /// Translates already decoded key/value pairs, in request order.
    pub fn translate_pairs(&self, params: Vec<(String, String)>) -> QueryResult<TranslatedQuery> {
        let mut conditions = Vec::new();
        let mut options = FindOptions {
            limit: Some(self.options.default_limit.min(self.options.max_limit)),
            ..FindOptions::default()
        };
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for (key, value) in &params {
            match key.as_str() {
                FIELDS => {
                    for name in list_items(value) {
                        match name.strip_prefix('-') {
                            Some(excluded) => exclude.push(field_name(excluded)?),
                            None => include.push(field_name(name.trim_start_matches('+'))?),
                        }
                    }
                }
                OMIT => {
                    for name in list_items(value) {
                        exclude.push(field_name(name)?);
                    }
                }
                SORT => {
                    options.sort = list_items(value)
                        .map(|name| match name.strip_prefix('-') {
                            Some(desc) => field_name(desc).map(SortKey::desc),
                            None => field_name(name.trim_start_matches('+')).map(SortKey::asc),
                        })
                        .collect::<QueryResult<Vec<_>>>()?;
                }
                OFFSET => {
                    let skip = parse_count(key, value, "non-negative integer")?;
                    // Document stores take signed skips.
                    if i64::try_from(skip).is_err() {
                        return Err(QueryError::InvalidNumber {
                            key: key.clone(),
                            value: value.clone(),
                            expected: "non-negative integer",
                        });
                    }
                    options.skip = skip;
                }
                LIMIT => {
                    let limit = parse_count(key, value, "positive integer")?;
                    if limit == 0 {
                        return Err(QueryError::InvalidNumber {
                            key: key.clone(),
                            value: value.clone(),
                            expected: "positive integer",
                        });
                    }
                    options.limit = Some(limit.min(self.options.max_limit));
                }
                SEARCH if !self.options.text_fields.is_empty() => {
                    let term = value.trim();
                    if !term.is_empty() {
                        conditions.push(Expr::Or(
                            self.options
                                .text_fields
                                .iter()
                                .map(|field| Expr::contains_text(field.clone(), term))
                                .collect(),
                        ));
                    }
                }
                _ => conditions.push(parse_condition(key, value)?),
            }
        }

        options.projection = projection(include, exclude)?;

        Ok(TranslatedQuery {
            criteria: Expr::all(conditions),
            options,
            params,
        })
    }
}

/// Result of translating one query string.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    /// Filter predicate; `None` matches every document.
    pub criteria: Option<Expr>,
    pub options: FindOptions,
    params: Vec<(String, String)>,
}

impl TranslatedQuery {
    /// Page size in effect. Translated queries always carry one.
    pub fn limit(&self) -> u64 {
        self.options.limit.unwrap_or(1).max(1)
    }

    /// `ceil(total / limit)`.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit())
    }

    /// Pagination links for `base_url` given the pre-pagination `total`.
    pub fn links(&self, base_url: &str, total: u64) -> Links {
        Links::build(base_url, &self.params, self.options.skip, self.limit(), total)
    }
}

/// Percent-decodes `a=b&c=d` into ordered pairs. `+` stands for a space.
pub fn decode_pairs(raw: &str) -> QueryResult<Vec<(String, String)>> {
    raw.trim_start_matches('?')
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            Ok((decode(key)?, decode(value)?))
        })
        .collect()
}

fn decode(component: &str) -> QueryResult<String> {
    urlencoding::decode(&component.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|e| QueryError::Encoding(e.to_string()))
}

fn list_items(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn field_name(name: &str) -> QueryResult<String> {
    let name = name.trim();
    if name.is_empty() || name.starts_with('$') || name.split('.').any(str::is_empty) {
        return Err(QueryError::InvalidField(name.to_string()));
    }
    Ok(name.to_string())
}

fn parse_count(key: &str, value: &str, expected: &'static str) -> QueryResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| QueryError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        })
}

fn projection(include: Vec<String>, exclude: Vec<String>) -> QueryResult<Projection> {
    let mixed = !include.is_empty() && exclude.iter().any(|field| field != "_id");
    if mixed {
        return Err(QueryError::MixedProjection);
    }
    Ok(Projection { include, exclude })
}

fn parse_condition(key: &str, value: &str) -> QueryResult<Expr> {
    let joined = if value.is_empty() {
        key.to_string()
    } else {
        format!("{key}={value}")
    };

    let (negated, rest) = match joined.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, joined.as_str()),
    };

    let split = rest.find(['>', '<', '!', '=']).unwrap_or(rest.len());
    let field = field_name(&rest[..split]).map_err(|_| malformed(&joined))?;
    let tail = &rest[split..];

    if tail.is_empty() {
        return Ok(Expr::exists(field, !negated));
    }
    if negated {
        // `!field` only ever tests for absence.
        return Err(malformed(&joined));
    }

    let (op, operand) = split_operator(tail).ok_or_else(|| malformed(&joined))?;
    if operand.is_empty() {
        return Err(malformed(&joined));
    }

    match op {
        "=" if operand == "!" => Ok(Expr::exists(field, false)),
        "=" => match operand.strip_prefix('!') {
            Some(excluded) => equality(field, excluded, true),
            None => equality(field, operand, false),
        },
        "!=" => equality(field, operand, true),
        _ => {
            let value = typed_value(operand)?;
            if !matches!(
                value,
                Bson::Int64(_) | Bson::Double(_) | Bson::DateTime(_)
            ) {
                return Err(QueryError::InvalidComparison {
                    field,
                    value: operand.to_string(),
                });
            }
            let op = match op {
                ">" => FieldOp::Gt,
                ">=" => FieldOp::Gte,
                "<" => FieldOp::Lt,
                _ => FieldOp::Lte,
            };
            Ok(Expr::field(field, op, value))
        }
    }
}

fn split_operator(tail: &str) -> Option<(&'static str, &str)> {
    ["!=", ">=", "<=", "=", ">", "<"]
        .into_iter()
        .find_map(|op| tail.strip_prefix(op).map(|operand| (op, operand)))
}

fn equality(field: String, raw: &str, negated: bool) -> QueryResult<Expr> {
    let items = split_list(raw);
    if items.len() > 1 {
        let values = items
            .into_iter()
            .filter(|item| !item.is_empty())
            .map(typed_value)
            .collect::<QueryResult<Vec<_>>>()?;
        let op = if negated { FieldOp::Nin } else { FieldOp::In };
        return Ok(Expr::field(field, op, Bson::Array(values)));
    }

    let value = typed_value(raw)?;
    let op = match (&value, negated) {
        (Bson::RegularExpression(_), false) => FieldOp::Matches,
        (Bson::RegularExpression(_), true) => FieldOp::NotMatches,
        (_, false) => FieldOp::Eq,
        (_, true) => FieldOp::Ne,
    };
    Ok(Expr::field(field, op, value))
}

fn malformed(condition: &str) -> QueryError {
    QueryError::MalformedCondition(condition.to_string())
}
