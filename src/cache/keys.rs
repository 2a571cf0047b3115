//! Cache key namespaces and construction.
//!
//! Every key starts with one of the namespace constants so that a class of
//! reads can be dropped with a single prefix invalidation. Keys derived from
//! filter objects go through [`canonical_key`], which sorts fields and
//! drops nulls, so equal filters always map to the same key.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{EventId, EventListFilter};

/// Top-N highlight lists.
pub const HIGHLIGHTS_NAMESPACE: &str = "highlights";
/// Filtered event lists.
pub const EVENT_LIST_NAMESPACE: &str = "events:list";
/// Per-event ranking detail.
pub const EVENT_RANKING_NAMESPACE: &str = "rankings:event";

/// Key of the top-`limit` highlight list. `limit` must already be clamped.
#[must_use]
pub fn highlights_key(limit: u32) -> String {
    format!("{HIGHLIGHTS_NAMESPACE}:top:{limit}")
}

/// Key of one page of the filtered event list.
#[must_use]
pub fn event_list_key(filter: &EventListFilter) -> String {
    canonical_key(EVENT_LIST_NAMESPACE, &filter.normalized())
}

/// Key of an event's ranking detail.
#[must_use]
pub fn event_ranking_key(event_id: EventId) -> String {
    format!("{EVENT_RANKING_NAMESPACE}:{event_id}")
}

/// Builds `namespace:k1=v1&k2=v2…` from the serialized form of `params`.
///
/// Nested objects flatten to dotted paths and arrays to indexed paths.
/// Null fields are skipped, fields are sorted by path, and `%`, `&` and `=`
/// inside values are percent-escaped. A parameter set with no fields maps
/// to `namespace:all`.
#[must_use]
pub fn canonical_key<T: Serialize>(namespace: &str, params: &T) -> String {
    let value = serde_json::to_value(params).unwrap_or(Value::Null);
    let mut fields = BTreeMap::new();
    flatten(None, &value, &mut fields);
    if fields.is_empty() {
        return format!("{namespace}:all");
    }
    let body = fields
        .iter()
        .map(|(path, value)| format!("{path}={}", escape(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{namespace}:{body}")
}

fn flatten(path: Option<&str>, value: &Value, out: &mut BTreeMap<String, String>) {
    let child = |segment: &str| match path {
        Some(parent) => format!("{parent}.{segment}"),
        None => segment.to_string(),
    };
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, nested) in map {
                flatten(Some(&child(key)), nested, out);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten(Some(&child(&index.to_string())), nested, out);
            }
        }
        Value::String(s) => {
            out.insert(path.unwrap_or("value").to_string(), s.clone());
        }
        Value::Bool(_) | Value::Number(_) => {
            out.insert(path.unwrap_or("value").to_string(), value.to_string());
        }
    }
}

fn escape(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('&', "%26")
        .replace('=', "%3D")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use crate::domain::{EventSort, EventStatus};

    #[test]
    fn highlights_key_embeds_limit() {
        assert_eq!(highlights_key(10), "highlights:top:10");
    }

    #[test]
    fn per_event_keys_are_namespaced() {
        assert_eq!(event_ranking_key(EventId::new(4)), "rankings:event:4");
    }

    #[test]
    fn field_order_does_not_change_key() {
        let mut a = HashMap::new();
        a.insert("status", "published");
        a.insert("city", "braga");
        a.insert("sort", "date");

        let mut b = HashMap::new();
        b.insert("sort", "date");
        b.insert("city", "braga");
        b.insert("status", "published");

        assert_eq!(canonical_key("events:list", &a), canonical_key("events:list", &b));
        assert_eq!(
            canonical_key("events:list", &a),
            "events:list:city=braga&sort=date&status=published"
        );
    }

    #[test]
    fn nulls_are_ignored() {
        let with_null = serde_json::json!({ "city": null, "page": 1 });
        let without = serde_json::json!({ "page": 1 });
        assert_eq!(canonical_key("ns", &with_null), canonical_key("ns", &without));
    }

    #[test]
    fn nested_values_flatten_to_paths() {
        let params = serde_json::json!({ "range": { "to": 5, "from": 1 }, "tags": ["a", "b"] });
        assert_eq!(
            canonical_key("ns", &params),
            "ns:range.from=1&range.to=5&tags.0=a&tags.1=b"
        );
    }

    #[test]
    fn separators_in_values_are_escaped() {
        let tricky = serde_json::json!({ "search": "a&b=c" });
        let split = serde_json::json!({ "search": "a", "b": "c" });
        assert_ne!(canonical_key("ns", &tricky), canonical_key("ns", &split));
        assert_eq!(canonical_key("ns", &tricky), "ns:search=a%26b%3Dc");
    }

    #[test]
    fn empty_params_map_to_all() {
        let empty: HashMap<String, String> = HashMap::new();
        assert_eq!(canonical_key("ns", &empty), "ns:all");
    }

    #[test]
    fn equivalent_filters_share_a_key() {
        let a = EventListFilter {
            city: Some(" Porto ".to_string()),
            status: Some(EventStatus::Published),
            date_from: NaiveDate::from_ymd_opt(2026, 5, 1),
            ..EventListFilter::default()
        };
        let b = EventListFilter {
            date_from: NaiveDate::from_ymd_opt(2026, 5, 1),
            status: Some(EventStatus::Published),
            city: Some("porto".to_string()),
            search: Some("   ".to_string()),
            sort: EventSort::Date,
            ..EventListFilter::default()
        };
        assert_eq!(event_list_key(&a), event_list_key(&b));
        assert!(event_list_key(&a).starts_with("events:list:"));
    }

    #[test]
    fn different_pages_get_different_keys() {
        let first = EventListFilter::default();
        let second = EventListFilter {
            page: 2,
            ..EventListFilter::default()
        };
        assert_ne!(event_list_key(&first), event_list_key(&second));
    }
}
