use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use crate::api::AppState;
use crate::config::PagingConfig;
use crate::db::{PageWindow, Paged};
use crate::resource::validation::to_non_negative_or_default;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    #[serde(rename = "self")]
    pub current: Link,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Link>,
}

/// List response body: `{ items, total, _links }`.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    #[serde(rename = "_links")]
    pub links: PageLinks,
}

fn href(path: &str, offset: u64, limit: u64) -> Link {
    Link {
        href: format!("{path}?offset={offset}&limit={limit}"),
    }
}

/// `prev` exists past the first page; `next` whenever the page came back
/// full.
#[must_use]
pub fn add_page_metadata<T>(
    paged: Paged<T>,
    path: &str,
    window: PageWindow,
    length: usize,
) -> PageResponse<T> {
    let PageWindow { offset, limit } = window;

    let prev = (offset > 0).then(|| href(path, offset.saturating_sub(limit), limit));
    let next = (length as u64 == limit).then(|| href(path, offset + limit, limit));

    PageResponse {
        items: paged.items,
        total: paged.total,
        links: PageLinks {
            current: href(path, offset, limit),
            prev,
            next,
        },
    }
}

/// Lenient offset/limit parsing: missing, negative or non-numeric values
/// fall back to the defaults and `limit` is capped at the configured max.
#[must_use]
pub fn page_window(params: &HashMap<String, String>, config: &PagingConfig) -> PageWindow {
    let offset = to_non_negative_or_default(params.get("offset").map(String::as_str), 0);
    let limit = to_non_negative_or_default(
        params.get("limit").map(String::as_str),
        config.default_limit,
    );

    let limit = if limit == 0 {
        config.default_limit
    } else {
        limit.min(config.max_limit)
    };

    PageWindow { offset, limit }
}

/// Extracts the request path and its page window.
#[derive(Debug, Clone)]
pub struct Page {
    pub path: String,
    pub window: PageWindow,
}

impl Page {
    #[must_use]
    pub fn respond<T>(&self, paged: Paged<T>) -> PageResponse<T> {
        let length = paged.items.len();
        add_page_metadata(paged, &self.path, self.window, length)
    }
}

impl FromRequestParts<Arc<AppState>> for Page {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let params: HashMap<String, String> =
            url::form_urlencoded::parse(parts.uri.query().unwrap_or_default().as_bytes())
                .into_owned()
                .collect();

        Ok(Self {
            path: parts.uri.path().to_string(),
            window: page_window(&params, &state.config.paging),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paged(n: usize, total: u64) -> Paged<usize> {
        Paged {
            items: (0..n).collect(),
            total,
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_first_full_page() {
        let window = PageWindow {
            offset: 0,
            limit: 10,
        };
        let page = add_page_metadata(paged(10, 25), "/tv", window, 10);

        assert_eq!(page.links.current.href, "/tv?offset=0&limit=10");
        assert!(page.links.prev.is_none());
        assert_eq!(
            page.links.next.map(|l| l.href).as_deref(),
            Some("/tv?offset=10&limit=10")
        );
    }

    #[test]
    fn test_last_partial_page() {
        let window = PageWindow {
            offset: 20,
            limit: 10,
        };
        let page = add_page_metadata(paged(5, 25), "/genres", window, 5);

        assert!(page.links.next.is_none());
        assert_eq!(
            page.links.prev.map(|l| l.href).as_deref(),
            Some("/genres?offset=10&limit=10")
        );
    }

    #[test]
    fn test_prev_never_goes_negative() {
        let window = PageWindow {
            offset: 3,
            limit: 10,
        };
        let page = add_page_metadata(paged(0, 3), "/tv", window, 0);
        assert_eq!(
            page.links.prev.map(|l| l.href).as_deref(),
            Some("/tv?offset=0&limit=10")
        );
    }

    #[test]
    fn test_serialized_shape() {
        let page = add_page_metadata(paged(1, 1), "/tv", PageWindow::default(), 1);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["_links"]["self"]["href"], "/tv?offset=0&limit=10");
        assert!(value["_links"].get("next").is_none());
    }

    #[test]
    fn test_page_window_defaults_and_bounds() {
        let config = PagingConfig::default();

        assert_eq!(page_window(&params(&[]), &config), PageWindow::default());
        assert_eq!(
            page_window(&params(&[("offset", "abc"), ("limit", "-3")]), &config),
            PageWindow::default()
        );
        assert_eq!(
            page_window(&params(&[("offset", "40"), ("limit", "1000")]), &config),
            PageWindow {
                offset: 40,
                limit: 100
            }
        );
        assert_eq!(
            page_window(&params(&[("limit", "0")]), &config).limit,
            10
        );
    }
}
