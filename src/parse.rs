use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pagination cursors of a feed page. Either side may be absent.
///
/// Decoding never fails: a `null` or malformed `paging` object yields empty cursors,
/// and numeric cursors are kept in their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Paging {
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl From<Value> for Paging {
    fn from(value: Value) -> Self {
        Self {
            next: cursor(value.get("next")),
            previous: cursor(value.get("previous")),
        }
    }
}

fn cursor(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One transaction as received from the feed. Kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// A decoded feed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub paging: Paging,
    pub data: Vec<Record>,
}

/// Decodes a feed response body. Only `data` is required; unknown fields are ignored.
pub fn decode_page(body: &[u8]) -> serde_json::Result<Page> {
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_full_page() {
        let body = json!({
            "paging": {
                "next": "https://feed.test/public?until=995",
                "previous": "https://feed.test/public?since=1000"
            },
            "data": [
                { "payment_id": 1, "message": "rent", "actor": { "username": "a" } },
                { "payment_id": 2, "message": "pizza" }
            ]
        });

        let page = decode_page(body.to_string().as_bytes()).unwrap();

        assert_eq!(page.paging.next.as_deref(), Some("https://feed.test/public?until=995"));
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].as_value()["actor"]["username"], "a");
    }

    #[test]
    fn tolerates_unknown_fields_and_missing_paging() {
        let body = br#"{ "data": [{ "story_id": "x" }], "meta": { "version": 5 } }"#;

        let page = decode_page(body).unwrap();

        assert_eq!(page.paging, Paging::default());
        assert_eq!(page.data, vec![Record::new(json!({ "story_id": "x" }))]);
    }

    #[test]
    fn null_cursors_are_absent() {
        let body = br#"{ "paging": { "next": null }, "data": [] }"#;
        let page = decode_page(body).unwrap();
        assert!(page.paging.next.is_none());
        assert!(page.paging.previous.is_none());
        assert!(page.data.is_empty());
    }

    #[test]
    fn null_paging_keeps_records() {
        let page = decode_page(br#"{ "paging": null, "data": [{ "a": 1 }] }"#).unwrap();

        assert_eq!(page.paging, Paging::default());
        assert_eq!(page.data, vec![Record::new(json!({ "a": 1 }))]);
    }

    #[test]
    fn odd_cursor_types_do_not_reject_the_page() {
        let body = json!({
            "paging": { "next": 995, "previous": { "until": 1000 } },
            "data": [{ "payment_id": 3 }]
        });

        let page = decode_page(body.to_string().as_bytes()).unwrap();

        assert_eq!(page.paging.next.as_deref(), Some("995"));
        assert!(page.paging.previous.is_none());
        assert_eq!(page.data.len(), 1);

        let page = decode_page(br#"{ "paging": "none", "data": [] }"#).unwrap();
        assert_eq!(page.paging, Paging::default());
    }

    #[test]
    fn requires_data() {
        assert!(decode_page(br#"{ "paging": {} }"#).is_err());
        assert!(decode_page(b"<html>rate limited</html>").is_err());
    }

    #[test]
    fn record_is_forwarded_verbatim() {
        let raw = json!({ "payment_id": 7, "likes": { "count": 0, "data": [] } });
        let page = decode_page(json!({ "data": [raw.clone()] }).to_string().as_bytes()).unwrap();
        assert_eq!(serde_json::to_value(&page.data[0]).unwrap(), raw);
    }
}
