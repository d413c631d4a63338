//! Lenient readers for numeric tool-call arguments.
//!
//! Models send counts as `5`, `5.0` or `"5"`. All three mean the same thing;
//! a fractional or negative count is still rejected.

use serde::de::{Deserializer, Error};
use serde::Deserialize;
use serde_json::Value;

use crate::cell::parse_number;

fn whole(n: f64) -> Option<usize> {
    (n.fract() == 0.0 && n >= 0.0 && n <= usize::MAX as f64).then_some(n as usize)
}

fn count_of<E: Error>(value: &Value) -> Result<Option<usize>, E> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => match n.as_u64() {
            Some(u) => usize::try_from(u).ok(),
            None => n.as_f64().and_then(whole),
        },
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => parse_number(s).and_then(whole),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| E::custom(format!("expected a non-negative whole number, got {value}")))
}

/// `#[serde(default, deserialize_with = "shared::params::opt_count")]`
pub fn opt_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    count_of(&Value::deserialize(deserializer)?)
}

/// Like [`opt_count`], with null and blank read as 0.
pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(opt_count(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Args {
        #[serde(default, deserialize_with = "opt_count")]
        limit: Option<usize>,
        #[serde(default, deserialize_with = "count")]
        offset: usize,
    }

    fn parse(value: Value) -> Result<Args, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_integral_forms_are_accepted() {
        for limit in [json!(5), json!(5.0), json!("5"), json!(" 5 ")] {
            assert_eq!(parse(json!({ "limit": limit })).unwrap().limit, Some(5));
        }
        assert_eq!(parse(json!({ "offset": 100.0 })).unwrap().offset, 100);
    }

    #[test]
    fn test_missing_null_and_blank() {
        let args = parse(json!({})).unwrap();
        assert_eq!((args.limit, args.offset), (None, 0));
        assert_eq!(parse(json!({ "limit": null })).unwrap().limit, None);
        assert_eq!(parse(json!({ "limit": "" })).unwrap().limit, None);
    }

    #[test]
    fn test_non_counts_are_rejected() {
        for limit in [json!(1.5), json!(-1), json!("ten"), json!(true), json!([3])] {
            assert!(parse(json!({ "limit": limit })).is_err());
        }
    }
}
