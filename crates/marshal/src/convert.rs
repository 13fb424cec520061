//! Conversions between [`Value`] and `serde_json::Value`.

use std::collections::HashSet;

use num_traits::ToPrimitive;

use crate::error::{MarshalError, Result};
use crate::value::Value;

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::int(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::str(s),
            serde_json::Value::Array(arr) => {
                Value::list(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::dict(
                obj.into_iter()
                    .map(|(k, v)| (Value::str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Converts a JSON-compatible graph to `serde_json::Value`.
    ///
    /// Tuples and lists become arrays; dicts need string keys. Bytes, sets,
    /// complex numbers, code objects, non-finite floats, integers outside
    /// the 64-bit range and cycles fail with [`MarshalError::NotJson`].
    pub fn to_json(&self) -> Result<serde_json::Value> {
        to_json_inner(self, &mut HashSet::new())
    }
}

fn to_json_inner(value: &Value, active: &mut HashSet<usize>) -> Result<serde_json::Value> {
    let not_json = || MarshalError::NotJson {
        kind: value.kind_name(),
    };
    if let Some(addr) = value.handle_addr() {
        if !active.insert(addr) {
            return Err(not_json());
        }
    }
    let json = match value {
        Value::None => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => {
            if let Some(n) = i.to_i64() {
                serde_json::json!(n)
            } else if let Some(n) = i.to_u64() {
                serde_json::json!(n)
            } else {
                return Err(not_json());
            }
        }
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(not_json)?,
        Value::Str(s) => serde_json::Value::String(s.as_str().to_owned()),
        Value::Tuple(rc) | Value::List(rc) => serde_json::Value::Array(
            rc.borrow()
                .iter()
                .map(|item| to_json_inner(item, active))
                .collect::<Result<_>>()?,
        ),
        Value::Dict(rc) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in rc.borrow().iter() {
                let key = k.as_str().ok_or(MarshalError::NotJson {
                    kind: k.kind_name(),
                })?;
                obj.insert(key.to_owned(), to_json_inner(v, active)?);
            }
            serde_json::Value::Object(obj)
        }
        _ => return Err(not_json()),
    };
    if let Some(addr) = value.handle_addr() {
        active.remove(&addr);
    }
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_builds_dicts_and_lists() {
        let value = Value::from(json!({"a": [1, 2.5, null], "b": true}));
        let expected = Value::dict(vec![
            (
                Value::str("a"),
                Value::list(vec![Value::int(1), Value::Float(2.5), Value::None]),
            ),
            (Value::str("b"), Value::Bool(true)),
        ]);
        assert_eq!(value, expected);
    }

    #[test]
    fn to_json_keeps_key_order() {
        let value = Value::dict(vec![
            (Value::str("z"), Value::int(1)),
            (Value::str("a"), Value::tuple(vec![Value::str("x")])),
        ]);
        let json = value.to_json().unwrap();
        assert_eq!(json.to_string(), r#"{"z":1,"a":["x"]}"#);
    }

    #[test]
    fn shared_but_acyclic_is_fine() {
        let inner = Value::list(vec![Value::int(1)]);
        let outer = Value::list(vec![inner.clone(), inner]);
        assert_eq!(outer.to_json().unwrap(), json!([[1], [1]]));
    }

    #[test]
    fn non_json_values_are_rejected() {
        assert!(Value::bytes(vec![1]).to_json().is_err());
        assert!(Value::Float(f64::NAN).to_json().is_err());
        assert!(Value::set(vec![]).to_json().is_err());
        assert!(Value::int(1u64 << 63).to_json().is_ok());
        let huge = Value::int(num_bigint::BigInt::from(u64::MAX) * 2);
        assert!(huge.to_json().is_err());
        let keyed = Value::dict(vec![(Value::int(1), Value::None)]);
        assert!(matches!(
            keyed.to_json(),
            Err(MarshalError::NotJson { kind: "int" })
        ));
    }

    #[test]
    fn cycles_are_rejected() {
        let list = Value::list(vec![]);
        if let Value::List(rc) = &list {
            rc.borrow_mut().push(list.clone());
        }
        assert!(matches!(
            list.to_json(),
            Err(MarshalError::NotJson { kind: "list" })
        ));
    }
}
