use std::collections::HashMap;

use axum::http::Method;
use serde_json::Value;

/// Request parameter carrying an API token.
pub const TOKEN_PARAM: &str = "token";

/// Whether a request only reads or may change state. Decides which tokens are acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestIntent {
    Read,
    Write,
}

impl RequestIntent {
    /// Only GET counts as a read; every other verb is treated as a write.
    ///
    /// HEAD is a write here even though axum answers it with the GET handler, so
    /// `HEAD` with a public token is redirected where the same `GET` succeeds.
    /// Public tokens are only ever trusted on plain GET.
    pub fn from_method(method: &Method) -> Self {
        if method == Method::GET { RequestIntent::Read } else { RequestIntent::Write }
    }
}

/// Flat request parameters merged from the query string and, when present, the body.
/// Query values win over body values with the same name.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    values: HashMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self { Self::default() }

    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::new();
        if let Some(q) = query {
            params.merge_form(q);
        }
        params
    }

    /// Merge `application/x-www-form-urlencoded` pairs. Undecodable pairs are skipped.
    pub fn merge_form(&mut self, encoded: &str) {
        for pair in encoded.split('&') {
            if pair.is_empty() { continue; }
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let (Some(k), Some(v)) = (decode_component(k), decode_component(v)) else { continue; };
            self.values.entry(k).or_insert(v);
        }
    }

    /// Merge the top-level string fields of a JSON object body. Anything else is ignored.
    pub fn merge_json(&mut self, body: &[u8]) {
        let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) else { return; };
        for (k, v) in map {
            if let Value::String(s) = v {
                self.values.entry(k).or_insert(s);
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> { self.values.get(key).map(String::as_str) }

    /// The API token, if one was supplied and is non-empty.
    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN_PARAM).filter(|t| !t.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { values }
    }
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_is_read() {
        assert_eq!(RequestIntent::from_method(&Method::GET), RequestIntent::Read);
        for m in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::HEAD] {
            assert_eq!(RequestIntent::from_method(&m), RequestIntent::Write, "{m}");
        }
    }

    #[test]
    fn query_decoding() {
        let p = RequestParams::from_query(Some("token=a%2Bb+c&page=2&flag&=x"));
        assert_eq!(p.token(), Some("a+b c"));
        assert_eq!(p.get("page"), Some("2"));
        assert_eq!(p.get("flag"), Some(""));
    }

    #[test]
    fn empty_or_missing_token_is_absent() {
        assert!(RequestParams::from_query(None).token().is_none());
        assert!(RequestParams::from_query(Some("token=")).token().is_none());
        assert!(RequestParams::from_query(Some("other=1")).token().is_none());
    }

    #[test]
    fn query_wins_over_body() {
        let mut p = RequestParams::from_query(Some("token=from-query"));
        p.merge_form("token=from-form&name=ale");
        p.merge_json(br#"{"token":"from-json","style":"stout","abv":5}"#);
        assert_eq!(p.token(), Some("from-query"));
        assert_eq!(p.get("name"), Some("ale"));
        assert_eq!(p.get("style"), Some("stout"));
        assert!(p.get("abv").is_none());
    }

    #[test]
    fn non_object_json_is_ignored() {
        let mut p = RequestParams::new();
        p.merge_json(b"[1,2,3]");
        p.merge_json(b"not json");
        assert!(p.token().is_none());
    }

    #[test]
    fn collect_from_pairs() {
        let p: RequestParams = [("token", "abc")].into_iter().collect();
        assert_eq!(p.token(), Some("abc"));
    }
}
