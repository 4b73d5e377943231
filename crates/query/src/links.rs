//! Pagination links echoed back to list callers.

use serde::Serialize;

/// Absolute URLs of neighbouring pages. Absent links are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Links {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

impl Links {
    /// `first`/`prev` exist once the window has moved past the start; `next`/`last` while
    /// matching documents remain after it. Every other parameter is echoed unchanged.
    pub fn build(
        base_url: &str,
        params: &[(String, String)],
        skip: u64,
        limit: u64,
        total: u64,
    ) -> Self {
        let limit = limit.max(1);
        let mut links = Links::default();

        if skip > 0 {
            links.prev = Some(page_url(base_url, params, skip.saturating_sub(limit)));
            links.first = Some(page_url(base_url, params, 0));
        }

        let window_end = skip.saturating_add(limit);
        if window_end < total {
            let last_offset = (total.div_ceil(limit) - 1) * limit;
            links.next = Some(page_url(
                base_url,
                params,
                window_end.min(last_offset),
            ));
            links.last = Some(page_url(base_url, params, last_offset));
        }

        links
    }
}

fn page_url(base_url: &str, params: &[(String, String)], offset: u64) -> String {
    let offset = offset.to_string();
    let mut pairs = Vec::with_capacity(params.len() + 1);
    let mut replaced = false;

    for (key, value) in params {
        if key == "offset" {
            if !replaced {
                pairs.push(encode_pair(key, &offset));
                replaced = true;
            }
        } else {
            pairs.push(encode_pair(key, value));
        }
    }
    if !replaced {
        pairs.push(encode_pair("offset", &offset));
    }

    format!("{}?{}", base_url, pairs.join("&"))
}

fn encode_pair(key: &str, value: &str) -> String {
    format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::decode_pairs;

    const BASE: &str = "http://localhost:3001/books";

    fn params(raw: &str) -> Vec<(String, String)> {
        decode_pairs(raw).unwrap()
    }

    #[test]
    fn first_page_links_forward_only() {
        let links = Links::build(BASE, &params("category=fantasy&limit=10"), 0, 10, 35);
        assert_eq!(links.first, None);
        assert_eq!(links.prev, None);
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost:3001/books?category=fantasy&limit=10&offset=10")
        );
        assert_eq!(
            links.last.as_deref(),
            Some("http://localhost:3001/books?category=fantasy&limit=10&offset=30")
        );
    }

    #[test]
    fn middle_page_links_both_ways_and_rewrites_offset_in_place() {
        let links = Links::build(BASE, &params("offset=10&limit=10"), 10, 10, 35);
        assert_eq!(
            links.prev.as_deref(),
            Some("http://localhost:3001/books?offset=0&limit=10")
        );
        assert_eq!(
            links.first.as_deref(),
            Some("http://localhost:3001/books?offset=0&limit=10")
        );
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost:3001/books?offset=20&limit=10")
        );
    }

    #[test]
    fn last_page_has_no_forward_links() {
        let links = Links::build(BASE, &params("offset=30"), 30, 10, 35);
        assert!(links.next.is_none());
        assert!(links.last.is_none());
        assert!(links.prev.is_some());
    }

    #[test]
    fn operators_survive_the_round_trip() {
        let links = Links::build(BASE, &params("price%3E=10"), 0, 10, 20);
        let next = links.next.unwrap();
        assert_eq!(next, "http://localhost:3001/books?price%3E=10&offset=10");
        let query = next.split_once('?').unwrap().1;
        assert_eq!(
            decode_pairs(query).unwrap()[0],
            ("price>".to_string(), "10".to_string())
        );
    }

    #[test]
    fn empty_result_has_no_links() {
        let links = Links::build(BASE, &[], 0, 10, 0);
        assert_eq!(links, Links::default());
        assert_eq!(serde_json::to_value(&links).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn window_at_the_end_of_the_range_does_not_overflow() {
        let links = Links::build(BASE, &params("offset=18446744073709551615"), u64::MAX, 10, 5);
        assert!(links.next.is_none());
        assert!(links.last.is_none());
        assert_eq!(
            links.first.as_deref(),
            Some("http://localhost:3001/books?offset=0")
        );
    }
}
