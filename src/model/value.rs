// src/model/value.rs

use crate::error::ParseError;
use serde_json::Value as Json;

/// A single CONTROL value.
///
/// Matrices hold one inner vector per logical row: one lattice vector,
/// one atomic position, one orientation. In the namelist file each of those
/// rows is a Fortran column, `lattvec(:,i)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    StrList(Vec<String>),
    IntMatrix(Vec<Vec<i64>>),
    FloatMatrix(Vec<Vec<f64>>),
}

impl Value {
    /// Short human-readable name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "logical",
            Value::Int(_) => "integer",
            Value::Float(_) => "real",
            Value::Str(_) => "string",
            Value::IntList(_) => "integer list",
            Value::FloatList(_) => "real list",
            Value::StrList(_) => "string list",
            Value::IntMatrix(_) => "integer matrix",
            Value::FloatMatrix(_) => "real matrix",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers are widened; everything else is `None`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int_slice(&self) -> Option<&[i64]> {
        match self {
            Value::IntList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float_slice(&self) -> Option<&[f64]> {
        match self {
            Value::FloatList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float_matrix(&self) -> Option<&[Vec<f64>]> {
        match self {
            Value::FloatMatrix(m) => Some(m),
            _ => None,
        }
    }

    /// Real view of a matrix, widening integer entries.
    pub fn to_float_matrix(&self) -> Option<Vec<Vec<f64>>> {
        match self {
            Value::FloatMatrix(m) => Some(m.clone()),
            Value::IntMatrix(m) => Some(
                m.iter()
                    .map(|r| r.iter().map(|&i| i as f64).collect())
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn as_int_matrix(&self) -> Option<&[Vec<i64>]> {
        match self {
            Value::IntMatrix(m) => Some(m),
            _ => None,
        }
    }

    /// Scalar-or-list view of integer data (`types = 1` and `types = 1, 1`).
    pub fn to_int_vec(&self) -> Option<Vec<i64>> {
        match self {
            Value::Int(i) => Some(vec![*i]),
            Value::IntList(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Scalar-or-list view of string data (`elements = 'Si'`).
    pub fn to_str_vec(&self) -> Option<Vec<String>> {
        match self {
            Value::Str(s) => Some(vec![s.clone()]),
            Value::StrList(v) => Some(v.clone()),
            _ => None,
        }
    }

    // =======================
    //   JSON INTERCHANGE
    // =======================

    pub fn to_json(&self) -> Json {
        match self {
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::from(*f),
            Value::Str(s) => Json::String(s.clone()),
            Value::IntList(v) => Json::from(v.clone()),
            Value::FloatList(v) => Json::from(v.clone()),
            Value::StrList(v) => Json::from(v.clone()),
            Value::IntMatrix(m) => Json::Array(m.iter().map(|r| Json::from(r.clone())).collect()),
            Value::FloatMatrix(m) => {
                Json::Array(m.iter().map(|r| Json::from(r.clone())).collect())
            }
        }
    }

    /// Infers the narrowest `Value` for a JSON value.
    ///
    /// Numbers stay integers unless JSON marks them as floats (`0.0`), so a
    /// dictionary produced by [`Value::to_json`] maps back to the same variant.
    pub fn from_json(key: &str, json: &Json) -> Result<Value, ParseError> {
        match json {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(_) => Ok(match json_number(key, json)? {
                Number::Int(i) => Value::Int(i),
                Number::Float(f) => Value::Float(f),
            }),
            Json::String(s) => Ok(Value::Str(s.clone())),
            Json::Array(items) => array_from_json(key, items),
            Json::Null => Err(unsupported(key, "null")),
            Json::Object(_) => Err(unsupported(key, "nested object")),
        }
    }
}

enum Number {
    Int(i64),
    Float(f64),
}

fn json_number(key: &str, json: &Json) -> Result<Number, ParseError> {
    let Json::Number(n) = json else {
        return Err(ParseError::TypeMismatch {
            key: key.to_string(),
            expected: "number".to_string(),
            found: json_kind(json).to_string(),
        });
    };
    if let Some(i) = n.as_i64() {
        Ok(Number::Int(i))
    } else if n.is_u64() {
        Err(unsupported(key, "integer out of range"))
    } else {
        n.as_f64()
            .map(Number::Float)
            .ok_or_else(|| unsupported(key, "number is not representable"))
    }
}

fn array_from_json(key: &str, items: &[Json]) -> Result<Value, ParseError> {
    let Some(first) = items.first() else {
        return Err(ParseError::EmptyValue {
            key: key.to_string(),
        });
    };

    match first {
        Json::String(_) => items
            .iter()
            .map(|item| match item {
                Json::String(s) => Ok(s.clone()),
                other => Err(mixed(key, "string", other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::StrList),
        Json::Number(_) => {
            let numbers = items
                .iter()
                .map(|item| json_number(key, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(number_list(numbers))
        }
        Json::Array(_) => {
            let mut rows = Vec::with_capacity(items.len());
            for item in items {
                let Json::Array(cells) = item else {
                    return Err(mixed(key, "array", item));
                };
                if cells.is_empty() {
                    return Err(ParseError::EmptyValue {
                        key: key.to_string(),
                    });
                }
                let row = cells
                    .iter()
                    .map(|cell| json_number(key, cell))
                    .collect::<Result<Vec<_>, _>>()?;
                rows.push(row);
            }
            if rows.iter().any(|r| r.len() != rows[0].len()) {
                return Err(ParseError::RaggedMatrix {
                    key: key.to_string(),
                });
            }
            Ok(number_matrix(rows))
        }
        other => Err(unsupported(key, &format!("array of {}", json_kind(other)))),
    }
}

fn number_list(numbers: Vec<Number>) -> Value {
    if numbers.iter().all(|n| matches!(n, Number::Int(_))) {
        Value::IntList(
            numbers
                .into_iter()
                .filter_map(|n| match n {
                    Number::Int(i) => Some(i),
                    Number::Float(_) => None,
                })
                .collect(),
        )
    } else {
        Value::FloatList(numbers.into_iter().map(number_as_f64).collect())
    }
}

fn number_matrix(rows: Vec<Vec<Number>>) -> Value {
    let all_int = rows
        .iter()
        .flatten()
        .all(|n| matches!(n, Number::Int(_)));
    if all_int {
        Value::IntMatrix(
            rows.into_iter()
                .map(|r| {
                    r.into_iter()
                        .filter_map(|n| match n {
                            Number::Int(i) => Some(i),
                            Number::Float(_) => None,
                        })
                        .collect()
                })
                .collect(),
        )
    } else {
        Value::FloatMatrix(
            rows.into_iter()
                .map(|r| r.into_iter().map(number_as_f64).collect())
                .collect(),
        )
    }
}

fn number_as_f64(n: Number) -> f64 {
    match n {
        Number::Int(i) => i as f64,
        Number::Float(f) => f,
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn unsupported(key: &str, message: &str) -> ParseError {
    ParseError::UnsupportedValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn mixed(key: &str, expected: &str, found: &Json) -> ParseError {
    ParseError::TypeMismatch {
        key: key.to_string(),
        expected: format!("{} element", expected),
        found: json_kind(found).to_string(),
    }
}

// =======================
//   CONVERSIONS
// =======================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntList(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::FloatList(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StrList(v)
    }
}

impl From<Vec<Vec<i64>>> for Value {
    fn from(v: Vec<Vec<i64>>) -> Self {
        Value::IntMatrix(v)
    }
}

impl From<Vec<Vec<f64>>> for Value {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Value::FloatMatrix(v)
    }
}

impl From<[[f64; 3]; 3]> for Value {
    fn from(m: [[f64; 3]; 3]) -> Self {
        Value::FloatMatrix(m.iter().map(|r| r.to_vec()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_numbers_keep_their_kind() {
        assert_eq!(Value::from_json("t", &json!(500)).unwrap(), Value::Int(500));
        assert_eq!(Value::from_json("t", &json!(500.0)).unwrap(), Value::Float(500.0));
        assert_eq!(
            Value::from_json("ngrid", &json!([25, 25, 25])).unwrap(),
            Value::IntList(vec![25, 25, 25])
        );
    }

    #[test]
    fn test_json_mixed_numbers_widen() {
        let v = Value::from_json("masses", &json!([28, 72.5])).unwrap();
        assert_eq!(v, Value::FloatList(vec![28.0, 72.5]));

        let m = Value::from_json("positions", &json!([[0, 0, 0], [0.25, 0.25, 0.25]])).unwrap();
        assert_eq!(
            m,
            Value::FloatMatrix(vec![vec![0.0, 0.0, 0.0], vec![0.25, 0.25, 0.25]])
        );
    }

    #[test]
    fn test_json_rejects_bad_shapes() {
        assert!(matches!(
            Value::from_json("x", &json!([[1, 2], [3]])),
            Err(ParseError::RaggedMatrix { .. })
        ));
        assert!(matches!(
            Value::from_json("x", &json!([])),
            Err(ParseError::EmptyValue { .. })
        ));
        assert!(matches!(
            Value::from_json("x", &json!(["Si", 1])),
            Err(ParseError::TypeMismatch { .. })
        ));
        assert!(matches!(
            Value::from_json("x", &json!(null)),
            Err(ParseError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn test_scalar_or_list_views() {
        assert_eq!(Value::Int(1).to_int_vec(), Some(vec![1]));
        assert_eq!(Value::from("Si").to_str_vec(), Some(vec!["Si".to_string()]));
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::Float(2.0).as_int(), None);
    }
}
