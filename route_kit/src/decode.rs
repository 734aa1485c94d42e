//! Generic request decoding.
//!
//! The destination starts as the JSON image of `T::default()`, is filled from
//! the query string and/or body according to the HTTP method, and is finally
//! materialized with `serde_json::from_value`.

use axum::http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::coerce::{self, parse_text};
use crate::descriptor::{ApiModel, Shape, TypeDescriptor};
use crate::error::{Error, Result};
use crate::query::QueryValues;
use crate::walker::{self, Visited};

/// Decodes a request of type `T` from query values and body bytes.
pub fn decode<T>(method: &Method, query: &QueryValues, body: &[u8]) -> Result<T>
where
    T: ApiModel + Default + Serialize + DeserializeOwned,
{
    let value = decode_value(T::descriptor(), T::descriptor().zero_object()?, method, query, body)?;
    debug!(model = T::descriptor().name, request = %value, "parsed request object");
    serde_json::from_value(value).map_err(|e| Error::decode(format!("failed to decode request: {e}")))
}

/// Method dispatch over an already zero-initialized destination.
pub fn decode_value(
    desc: &'static TypeDescriptor,
    mut target: Map<String, Value>,
    method: &Method,
    query: &QueryValues,
    body: &[u8],
) -> Result<Value> {
    match *method {
        // axum routes HEAD to GET handlers
        Method::GET | Method::HEAD => {
            fill_from_query(desc, query, &mut target, &mut Visited::rooted(desc))?;
        }
        Method::POST | Method::PUT | Method::PATCH => {
            let source = body_object(body)?;
            coerce::overlay(desc, &source, &mut target, &mut Visited::rooted(desc))?;
        }
        Method::DELETE => {
            fill_from_query(desc, query, &mut target, &mut Visited::rooted(desc))?;
            if !body.is_empty() {
                // Second pass binds straight onto the populated value.
                merge(&mut target, body_object(body)?);
            }
        }
        _ => return Err(Error::MethodNotAllowed(method.to_string())),
    }
    Ok(Value::Object(target))
}

/// Body keys replace query-filled values, except that objects on both sides
/// are merged key by key.
fn merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn body_object(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::decode("failed to decode JSON: expected an object")),
        Err(e) => Err(Error::decode(format!("failed to decode JSON: {e}"))),
    }
}

/// Fills `target` from a flat query namespace. Returns how many fields were
/// written, so optional nested models are only allocated on demand.
pub fn fill_from_query(
    desc: &'static TypeDescriptor,
    query: &QueryValues,
    target: &mut Map<String, Value>,
    visited: &mut Visited,
) -> Result<usize> {
    let mut written = 0;
    for walked in walker::walk(desc, visited) {
        let shape = &walked.field.shape;
        let name = walked.wire_name();
        let key = walked.json_name();

        if let Some(nested) = shape.struct_model() {
            if !visited.enter(nested) {
                continue;
            }
            let mut object = match target.get(key) {
                Some(Value::Object(existing)) => existing.clone(),
                _ => nested.zero_object()?,
            };
            let result = fill_from_query(nested, query, &mut object, visited);
            visited.leave(nested);
            if result? > 0 {
                target.insert(key.to_string(), Value::Object(object));
                written += 1;
            }
            continue;
        }

        match shape.pointee() {
            Shape::List(item) => {
                let values = query.get_all(name);
                if values.is_empty() {
                    continue;
                }
                let items = values
                    .into_iter()
                    .map(|text| parse_text(item, text))
                    .collect::<Result<Vec<_>>>()?;
                target.insert(key.to_string(), Value::Array(items));
                written += 1;
            }
            Shape::Map(key_kind, value_shape) => {
                let entries = query.bracketed(name);
                if entries.is_empty() {
                    continue;
                }
                let mut map = Map::new();
                for (sub, text) in entries {
                    parse_text(&Shape::Scalar(*key_kind), sub)?;
                    map.insert(sub.to_string(), parse_text(value_shape, text)?);
                }
                target.insert(key.to_string(), Value::Object(map));
                written += 1;
            }
            _ => {
                if let Some(text) = query.first(name).filter(|text| !text.is_empty()) {
                    target.insert(key.to_string(), parse_text(shape, text)?);
                    written += 1;
                }
            }
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiModel, Meta};
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct Paging {
        page: u32,
        size: u32,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct Filter {
        status: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct ListReq {
        #[serde(skip)]
        #[api(path = "/items", method = "GET")]
        meta: Meta,
        #[serde(flatten)]
        paging: Paging,
        #[api(p = "limit")]
        limit: i32,
        tags: Vec<String>,
        attrs: BTreeMap<String, i64>,
        filter: Option<Filter>,
        keyword: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct CreateReq {
        #[serde(skip)]
        meta: Meta,
        name: String,
        tags: Vec<String>,
        #[serde(rename = "unitPrice")]
        price: f64,
        #[serde(flatten)]
        paging: Paging,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct DeleteReq {
        id: u64,
        force: bool,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct Chain {
        name: String,
        next: Option<Box<Chain>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct SparseReq {
        #[api(p = "limit")]
        limit: i32,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cursor: Option<String>,
        #[serde(skip_serializing)]
        token: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct Scope {
        status: String,
        kind: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct PurgeReq {
        scope: Scope,
        dry_run: bool,
    }

    fn query(s: &str) -> QueryValues {
        QueryValues::parse(s).unwrap()
    }

    #[test]
    fn get_fills_scalars_lists_maps_and_embedded() {
        let req: ListReq = decode(
            &Method::GET,
            &query("limit=10&page=2&tags=a&tags=b&attrs[x]=1&attrs[y]=2&status=open"),
            b"",
        )
        .unwrap();
        assert_eq!(req.limit, 10);
        assert_eq!(req.paging.page, 2);
        assert_eq!(req.paging.size, 0);
        assert_eq!(req.tags, ["a", "b"]);
        assert_eq!(req.attrs.get("y"), Some(&2));
        assert_eq!(req.filter.unwrap().status.as_deref(), Some("open"));
        assert_eq!(req.keyword, None);
    }

    #[test]
    fn get_leaves_absent_fields_at_zero() {
        let req: ListReq = decode(&Method::GET, &query(""), b"").unwrap();
        assert_eq!(req.limit, 0);
        assert!(req.tags.is_empty());
        assert!(req.filter.is_none());
    }

    #[test]
    fn get_rejects_unparseable_values() {
        let err = decode::<ListReq>(&Method::GET, &query("limit=abc"), b"").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(decode::<ListReq>(&Method::GET, &query("attrs[x]=y"), b"").is_err());
    }

    #[test]
    fn post_reads_body_by_wire_name() {
        let req: CreateReq = decode(
            &Method::POST,
            &query(""),
            br#"{"name":"x","tags":["a","b"],"unitPrice":2.5,"page":9}"#,
        )
        .unwrap();
        assert_eq!(req.name, "x");
        assert_eq!(req.tags, ["a", "b"]);
        assert_eq!(req.price, 2.5);
        // embedded fields are not merged from the body
        assert_eq!(req.paging.page, 0);
    }

    #[test]
    fn post_rejects_type_mismatch_and_bad_json() {
        let err = decode::<CreateReq>(&Method::POST, &query(""), br#"{"name":123}"#).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(decode::<CreateReq>(&Method::PUT, &query(""), b"{").is_err());
        assert!(decode::<CreateReq>(&Method::PATCH, &query(""), b"[1]").is_err());
    }

    #[test]
    fn delete_body_overrides_query() {
        let from_query: DeleteReq = decode(&Method::DELETE, &query("id=5"), b"").unwrap();
        assert_eq!(from_query.id, 5);

        let overridden: DeleteReq =
            decode(&Method::DELETE, &query("id=5&force=true"), br#"{"id":7}"#).unwrap();
        assert_eq!(overridden.id, 7);
        assert!(overridden.force);

        assert!(decode::<DeleteReq>(&Method::DELETE, &query(""), br#"{"id":"x"}"#).is_err());
    }

    #[test]
    fn fields_skipped_on_output_may_be_absent() {
        let req: SparseReq = decode(&Method::GET, &query("limit=3"), b"").unwrap();
        assert_eq!(req.limit, 3);
        assert!(req.tags.is_empty());
        assert_eq!(req.cursor, None);

        let req: SparseReq = decode(&Method::POST, &query(""), br#"{"limit":4}"#).unwrap();
        assert!(req.tags.is_empty());

        let req: SparseReq = decode(&Method::GET, &query("tags=a&token=t1"), b"").unwrap();
        assert_eq!(req.tags, ["a"]);
        assert_eq!(req.token, "t1");
    }

    #[test]
    fn head_reads_the_query_like_get() {
        let req: SparseReq = decode(&Method::HEAD, &query("limit=8"), b"").unwrap();
        assert_eq!(req.limit, 8);
    }

    #[test]
    fn delete_body_merges_into_nested_objects() {
        let req: PurgeReq = decode(
            &Method::DELETE,
            &query("status=open&dry_run=true"),
            br#"{"scope":{"kind":"archived"}}"#,
        )
        .unwrap();
        assert_eq!(req.scope.status, "open");
        assert_eq!(req.scope.kind, "archived");
        assert!(req.dry_run);
    }

    #[test]
    fn unsupported_method_is_rejected() {
        let err = decode::<DeleteReq>(&Method::OPTIONS, &query(""), b"").unwrap_err();
        assert!(matches!(err, Error::MethodNotAllowed(_)));
    }

    #[test]
    fn cyclic_types_terminate() {
        let req: Chain = decode(&Method::GET, &query("name=a"), b"").unwrap();
        assert_eq!(req.name, "a");
        assert!(req.next.is_none());

        let req: Chain = decode(
            &Method::POST,
            &query(""),
            br#"{"name":"a","next":{"name":"b"}}"#,
        )
        .unwrap();
        // the repeated occurrence of Chain is cut, not an error
        assert_eq!(req.name, "a");
        assert!(req.next.is_none());
    }

    #[test]
    fn reserialized_request_has_no_spurious_fields() {
        let req: CreateReq =
            decode(&Method::POST, &query(""), br#"{"name":"x","extra":1}"#).unwrap();
        let out = serde_json::to_value(&req).unwrap();
        let mut keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["name", "page", "size", "tags", "unitPrice"]);
    }
}
