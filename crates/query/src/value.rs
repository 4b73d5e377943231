//! Typing of raw query-string values.

use bson::{Bson, DateTime, Regex};
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{QueryError, QueryResult};

/// Converts a raw value into the most specific BSON value it spells:
/// `/re/` and `/re/i` patterns, quoted literals, booleans, ISO-8601 dates, numbers,
/// and finally plain strings. Patterns are compiled to reject invalid ones early.
pub fn typed_value(raw: &str) -> QueryResult<Bson> {
    if let Some(regex) = parse_pattern(raw)? {
        return Ok(Bson::RegularExpression(regex));
    }
    if let Some(literal) = unquote(raw) {
        return Ok(Bson::String(literal.to_string()));
    }
    match raw {
        "true" => return Ok(Bson::Boolean(true)),
        "false" => return Ok(Bson::Boolean(false)),
        _ => {}
    }
    if let Some(date) = parse_date(raw) {
        return Ok(Bson::DateTime(date));
    }
    if let Some(number) = parse_number(raw) {
        return Ok(number);
    }
    Ok(Bson::String(raw.to_string()))
}

/// Splits a comma separated list, keeping commas that sit inside quotes.
pub fn split_list(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in raw.char_indices() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(open), _) if ch == open => quote = None,
            (None, ',') => {
                parts.push(&raw[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn parse_pattern(raw: &str) -> QueryResult<Option<Regex>> {
    let Some(body) = raw.strip_prefix('/') else {
        return Ok(None);
    };
    let (pattern, options) = if let Some(pattern) = body.strip_suffix("/i") {
        (pattern, "i")
    } else if let Some(pattern) = body.strip_suffix('/') {
        (pattern, "")
    } else {
        return Ok(None);
    };

    regex::RegexBuilder::new(pattern)
        .case_insensitive(!options.is_empty())
        .build()
        .map_err(|e| QueryError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

    Ok(Some(Regex {
        pattern: pattern.to_string(),
        options: options.to_string(),
    }))
}

fn unquote(raw: &str) -> Option<&str> {
    if raw.len() < 2 {
        return None;
    }
    let first = raw.chars().next()?;
    if (first == '"' || first == '\'') && raw.ends_with(first) {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

/// ISO-8601 dates: `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.fff]]` with an optional
/// `Z` / `±HH:MM` offset. Bare years are deliberately left to the number parser.
fn parse_date(raw: &str) -> Option<DateTime> {
    let bytes = raw.as_bytes();
    if bytes.len() < 7 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes[4] != b'-' {
        return None;
    }

    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(DateTime::from_millis(parsed.timestamp_millis()));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    Some(DateTime::from_millis(
        Utc.from_utc_datetime(&naive).timestamp_millis(),
    ))
}

fn parse_number(raw: &str) -> Option<Bson> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Bson::Int64(int));
    }
    // Rust accepts "inf" and "NaN"; only plain decimal notation counts here.
    if !raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Bson::Double)
}
