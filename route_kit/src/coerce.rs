//! Value conversion from query text and raw JSON into a field's declared shape.
//!
//! Both directions produce JSON that deserializes cleanly into the Rust type
//! the shape was derived from. Conversion failures are decode errors.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::descriptor::{ScalarKind, Shape, TimeKind, TypeDescriptor};
use crate::error::{Error, Result};
use crate::walker::{self, Visited};

/// Fixed textual format for time values.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a single query value.
pub fn parse_text(shape: &Shape, text: &str) -> Result<Value> {
    match shape {
        Shape::Optional(inner) => parse_text(inner, text),
        Shape::Scalar(kind) => parse_scalar(*kind, text),
        Shape::Time(kind) => parse_time(*kind, text),
        Shape::SoftDelete => parse_time(TimeKind::DateTime, text),
        Shape::Any => Ok(Value::String(text.to_string())),
        Shape::Model(model) => {
            let desc = model.descriptor();
            match desc.variants() {
                Some(variants) => enum_value(desc.name, variants, text),
                None => Err(Error::decode(format!(
                    "cannot decode {} from query value {text:?}",
                    desc.name
                ))),
            }
        }
        Shape::List(_) | Shape::Map(..) => Err(Error::decode(format!(
            "nested collections cannot be decoded from query value {text:?}"
        ))),
    }
}

/// Coerces a raw body value. Returns `Ok(None)` when the value belongs to a
/// model already on the ancestor path; the caller leaves the field unset.
pub fn coerce_json(shape: &Shape, raw: Value, visited: &mut Visited) -> Result<Option<Value>> {
    match shape {
        Shape::Optional(_) if raw.is_null() => Ok(Some(Value::Null)),
        Shape::Optional(inner) => coerce_json(inner, raw, visited),
        Shape::Scalar(kind) => coerce_scalar(*kind, raw).map(Some),
        Shape::Time(kind) => match raw {
            Value::String(text) => parse_time(*kind, &text).map(Some),
            other => Err(mismatch("a time string", &other)),
        },
        Shape::SoftDelete => match raw {
            Value::Null => Ok(Some(Value::Null)),
            Value::String(text) => parse_time(TimeKind::DateTime, &text).map(Some),
            other => Err(mismatch("a time string or null", &other)),
        },
        Shape::Any => Ok(Some(raw)),
        Shape::List(item) => match raw {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for value in items {
                    if let Some(value) = coerce_json(item, value, visited)? {
                        out.push(value);
                    }
                }
                Ok(Some(Value::Array(out)))
            }
            other => Err(mismatch("an array", &other)),
        },
        Shape::Map(key, value_shape) => match raw {
            Value::Object(entries) => {
                let mut out = Map::new();
                for (k, v) in entries {
                    parse_scalar(*key, &k)?;
                    if let Some(v) = coerce_json(value_shape, v, visited)? {
                        out.insert(k, v);
                    }
                }
                Ok(Some(Value::Object(out)))
            }
            other => Err(mismatch("an object", &other)),
        },
        Shape::Model(model) => {
            let desc = model.descriptor();
            if let Some(variants) = desc.variants() {
                return match raw {
                    Value::String(text) => enum_value(desc.name, variants, &text).map(Some),
                    other => Err(mismatch("a string", &other)),
                };
            }
            let Value::Object(entries) = raw else {
                return Err(mismatch("an object", &raw));
            };
            if !visited.enter(desc) {
                return Ok(None);
            }
            let mut target = desc.zero_object()?;
            let result = overlay(desc, &entries, &mut target, visited);
            visited.leave(desc);
            result.map(|_| Some(Value::Object(target)))
        }
    }
}

/// Assigns every direct field of `desc` whose wire name appears in `source`.
/// Embedded fields are not merged.
pub fn overlay(
    desc: &'static TypeDescriptor,
    source: &Map<String, Value>,
    target: &mut Map<String, Value>,
    visited: &mut Visited,
) -> Result<()> {
    for walked in walker::fields(desc) {
        let Some(raw) = source.get(walked.wire_name()) else {
            continue;
        };
        let value = coerce_json(&walked.field.shape, raw.clone(), visited)
            .map_err(|e| Error::decode(format!("error setting field {}: {e}", walked.field.ident)))?;
        if let Some(value) = value {
            target.insert(walked.json_name().to_string(), value);
        }
    }
    Ok(())
}

fn parse_scalar(kind: ScalarKind, text: &str) -> Result<Value> {
    let bad = |what: &str| Error::decode(format!("invalid {what} value: {text:?}"));
    let value = match kind {
        ScalarKind::Bool => match text {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Value::Bool(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Value::Bool(false),
            _ => return Err(bad("boolean")),
        },
        ScalarKind::I8 => text.parse::<i8>().map(Value::from).map_err(|_| bad("i8"))?,
        ScalarKind::I16 => text.parse::<i16>().map(Value::from).map_err(|_| bad("i16"))?,
        ScalarKind::I32 => text.parse::<i32>().map(Value::from).map_err(|_| bad("i32"))?,
        ScalarKind::I64 => text.parse::<i64>().map(Value::from).map_err(|_| bad("i64"))?,
        ScalarKind::Isize => text.parse::<isize>().map(Value::from).map_err(|_| bad("isize"))?,
        ScalarKind::U8 => text.parse::<u8>().map(Value::from).map_err(|_| bad("u8"))?,
        ScalarKind::U16 => text.parse::<u16>().map(Value::from).map_err(|_| bad("u16"))?,
        ScalarKind::U32 => text.parse::<u32>().map(Value::from).map_err(|_| bad("u32"))?,
        ScalarKind::U64 => text.parse::<u64>().map(Value::from).map_err(|_| bad("u64"))?,
        ScalarKind::Usize => text.parse::<usize>().map(Value::from).map_err(|_| bad("usize"))?,
        ScalarKind::F32 => text
            .parse::<f32>()
            .ok()
            .and_then(|v| Number::from_f64(f64::from(v)))
            .map(Value::Number)
            .ok_or_else(|| bad("f32"))?,
        ScalarKind::F64 => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| bad("f64"))?,
        ScalarKind::String => Value::String(text.to_string()),
    };
    Ok(value)
}

fn coerce_scalar(kind: ScalarKind, raw: Value) -> Result<Value> {
    let accepted = match (kind, &raw) {
        (ScalarKind::String, Value::String(_))
        | (ScalarKind::Bool, Value::Bool(_))
        | (ScalarKind::F32 | ScalarKind::F64, Value::Number(_)) => true,
        (ScalarKind::String | ScalarKind::Bool | ScalarKind::F32 | ScalarKind::F64, _) => false,
        (_, Value::Number(n)) => {
            return integer(kind, n).ok_or_else(|| mismatch(expected(kind), &raw));
        }
        _ => false,
    };
    if accepted {
        Ok(raw)
    } else {
        Err(mismatch(expected(kind), &raw))
    }
}

/// Accepts integral numbers, including floats with no fractional part, that
/// fit the target width.
fn integer(kind: ScalarKind, n: &Number) -> Option<Value> {
    let wide: i128 = if let Some(v) = n.as_i64() {
        i128::from(v)
    } else if let Some(v) = n.as_u64() {
        i128::from(v)
    } else {
        let f = n.as_f64()?;
        if f.fract() != 0.0 || !f.is_finite() || f.abs() > 1.8e19 {
            return None;
        }
        f as i128
    };
    let (min, max): (i128, i128) = match kind {
        ScalarKind::I8 => (i8::MIN.into(), i8::MAX.into()),
        ScalarKind::I16 => (i16::MIN.into(), i16::MAX.into()),
        ScalarKind::I32 => (i32::MIN.into(), i32::MAX.into()),
        ScalarKind::I64 => (i64::MIN.into(), i64::MAX.into()),
        ScalarKind::Isize => (isize::MIN as i128, isize::MAX as i128),
        ScalarKind::U8 => (0, u8::MAX.into()),
        ScalarKind::U16 => (0, u16::MAX.into()),
        ScalarKind::U32 => (0, u32::MAX.into()),
        ScalarKind::U64 => (0, u64::MAX.into()),
        ScalarKind::Usize => (0, usize::MAX as i128),
        _ => return None,
    };
    if wide < min || wide > max {
        return None;
    }
    if wide < 0 {
        i64::try_from(wide).ok().map(Value::from)
    } else {
        u64::try_from(wide).ok().map(Value::from)
    }
}

fn parse_time(kind: TimeKind, text: &str) -> Result<Value> {
    let bad = || Error::decode(format!("invalid time value: {text:?}"));
    let value = match kind {
        TimeKind::Date => {
            let date = NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| bad())?;
            serde_json::to_value(date)?
        }
        TimeKind::NaiveDateTime => serde_json::to_value(parse_datetime(text).ok_or_else(bad)?)?,
        TimeKind::DateTime => {
            serde_json::to_value(parse_datetime(text).ok_or_else(bad)?.and_utc())?
        }
    };
    Ok(value)
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIME_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).naive_utc())
        })
}

fn enum_value(name: &str, variants: &[&'static str], text: &str) -> Result<Value> {
    if variants.contains(&text) {
        Ok(Value::String(text.to_string()))
    } else {
        Err(Error::decode(format!(
            "invalid {name} value {text:?}, expected one of {variants:?}"
        )))
    }
}

fn expected(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Bool => "a boolean",
        ScalarKind::String => "a string",
        ScalarKind::F32 | ScalarKind::F64 => "a number",
        _ => "an integer in range",
    }
}

fn mismatch(expected: &str, got: &Value) -> Error {
    let got = match got {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Error::decode(format!("expected {expected}, got {got}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coerce(shape: &Shape, raw: Value) -> Result<Option<Value>> {
        coerce_json(shape, raw, &mut Visited::new())
    }

    #[test]
    fn integer_widths_are_range_checked() {
        let shape = Shape::Scalar(ScalarKind::U8);
        assert_eq!(coerce(&shape, json!(255)).unwrap(), Some(json!(255)));
        assert!(coerce(&shape, json!(256)).is_err());
        assert!(coerce(&shape, json!(-1)).is_err());
        assert!(coerce(&shape, json!(1.5)).is_err());
        assert_eq!(coerce(&shape, json!(3.0)).unwrap(), Some(json!(3)));
    }

    #[test]
    fn strings_are_not_coerced_from_numbers() {
        let shape = Shape::Scalar(ScalarKind::String);
        let err = coerce(&shape, json!(123)).unwrap_err();
        assert_eq!(err.to_string(), "expected a string, got number");
    }

    #[test]
    fn optional_accepts_null() {
        let shape = Shape::Optional(Box::new(Shape::Scalar(ScalarKind::I64)));
        assert_eq!(coerce(&shape, Value::Null).unwrap(), Some(Value::Null));
        assert_eq!(coerce(&shape, json!(7)).unwrap(), Some(json!(7)));
    }

    #[test]
    fn list_elements_are_coerced() {
        let shape = Shape::List(Box::new(Shape::Scalar(ScalarKind::String)));
        assert_eq!(
            coerce(&shape, json!(["a", "b"])).unwrap(),
            Some(json!(["a", "b"]))
        );
        assert!(coerce(&shape, json!(["a", 1])).is_err());
        assert!(coerce(&shape, json!("a")).is_err());
    }

    #[test]
    fn map_keys_follow_key_kind() {
        let shape = Shape::Map(ScalarKind::U32, Box::new(Shape::Scalar(ScalarKind::Bool)));
        assert!(coerce(&shape, json!({"1": true})).is_ok());
        assert!(coerce(&shape, json!({"x": true})).is_err());
    }

    #[test]
    fn time_uses_fixed_format() {
        let shape = Shape::Time(TimeKind::NaiveDateTime);
        assert_eq!(
            parse_text(&shape, "2024-03-01 10:20:30").unwrap(),
            json!("2024-03-01T10:20:30")
        );
        assert!(parse_text(&shape, "01/03/2024").is_err());
        assert!(coerce(&shape, json!("2024-03-01T10:20:30Z")).is_ok());
    }

    #[test]
    fn query_scalars_parse_by_kind() {
        assert_eq!(parse_text(&Shape::Scalar(ScalarKind::I32), "10").unwrap(), json!(10));
        assert!(parse_text(&Shape::Scalar(ScalarKind::I32), "abc").is_err());
        assert_eq!(parse_text(&Shape::Scalar(ScalarKind::Bool), "1").unwrap(), json!(true));
        assert_eq!(
            parse_text(&Shape::Scalar(ScalarKind::F64), "2.5").unwrap(),
            json!(2.5)
        );
        assert!(parse_text(&Shape::Scalar(ScalarKind::F64), "NaN").is_err());
    }

    #[test]
    fn query_booleans_accept_short_and_capitalized_forms() {
        let shape = Shape::Scalar(ScalarKind::Bool);
        for text in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_text(&shape, text).unwrap(), json!(true), "{text}");
        }
        for text in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_text(&shape, text).unwrap(), json!(false), "{text}");
        }
        assert!(parse_text(&shape, "yes").is_err());
        assert!(parse_text(&shape, "tRUE").is_err());
    }
}
