//! HTTP request view and response state handed to HTTP functions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an HTTP function sees of the inbound request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    /// Request method, e.g. `GET`
    pub method: String,

    /// Path and query exactly as received
    pub original_url: String,

    /// Parsed query parameters
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// Body parsed as JSON; unset for an empty body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            original_url: original_url.into(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    /// Get a query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Working response state of an HTTP invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpResponseBag {
    /// Status code; 200 when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Response body; strings are sent verbatim, other values as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl HttpResponseBag {
    pub fn new(status: u16, body: impl Into<Value>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
        }
    }

    /// Status only, empty body
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_camel_case() {
        let mut req = HttpRequest::new("POST", "/api/orders?code=k");
        req.query.insert("code".into(), "k".into());
        req.body = Some(json!({"id": 7}));

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["originalUrl"], "/api/orders?code=k");
        assert_eq!(value["query"]["code"], "k");
        assert_eq!(value["body"]["id"], 7);
    }

    #[test]
    fn test_empty_body_is_omitted() {
        let value = serde_json::to_value(HttpRequest::new("GET", "/api/x")).unwrap();
        assert!(value.get("body").is_none());
    }

    #[test]
    fn test_response_bag_from_json() {
        let bag: HttpResponseBag = serde_json::from_str(r#"{"status":201,"body":"ok"}"#).unwrap();
        assert_eq!(bag, HttpResponseBag::new(201, "ok"));

        let bare: HttpResponseBag = serde_json::from_str("{}").unwrap();
        assert_eq!(bare, HttpResponseBag::default());
    }
}
