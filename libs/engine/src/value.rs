//! Value model for rule evaluation
//!
//! Tagged representation of every value the engine manipulates. Integers and
//! decimals coexist under a single fixed-precision `Number` variant; all
//! arithmetic promotes operands through decimal coercion. Division rounds
//! half-up at scale 10.

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fractional digits kept by division results.
pub const DECIMAL_SCALE: u32 = 10;

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Decimal),
    Text(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Date(NaiveDate),
}

impl Value {
    pub fn number(n: impl Into<Decimal>) -> Self {
        Self::Number(n.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness: null and zero and empty containers are false, everything
    /// else is true.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => !n.is_zero(),
            Self::Text(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Object(map) => !map.is_empty(),
            Self::Date(_) => true,
        }
    }

    /// Forgiving numeric coercion: unparseable text and non-numeric variants
    /// become zero.
    pub fn as_decimal(&self) -> Decimal {
        self.try_decimal().unwrap_or(Decimal::ZERO)
    }

    /// Strict numeric coercion: `Some` only when the value cleanly represents
    /// a number (a `Number`, or text that parses as one).
    pub fn try_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Type tag used by `json_type` and diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Object(_) => "object",
            Self::Date(_) => "date",
        }
    }

    /// Interpret the value as a calendar date. Accepts the date variant,
    /// ISO `YYYY-MM-DD` text and `MM/DD/YYYY` text.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
                    .ok()
            }
            _ => None,
        }
    }

    pub fn from_json(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Number(Decimal::from(i))
                } else if let Some(f) = n.as_f64() {
                    Self::Number(Decimal::from_f64(f).unwrap_or(Decimal::ZERO))
                } else {
                    Self::Null
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn from_yaml(v: serde_yaml::Value) -> Self {
        match v {
            serde_yaml::Value::Null => Self::Null,
            serde_yaml::Value::Bool(b) => Self::Bool(b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Number(Decimal::from(i))
                } else if let Some(f) = n.as_f64() {
                    Self::Number(Decimal::from_f64(f).unwrap_or(Decimal::ZERO))
                } else {
                    Self::Null
                }
            }
            serde_yaml::Value::String(s) => Self::Text(s),
            serde_yaml::Value::Sequence(items) => {
                Self::List(items.into_iter().map(Self::from_yaml).collect())
            }
            serde_yaml::Value::Mapping(map) => Self::Object(
                map.into_iter()
                    .filter_map(|(k, v)| {
                        let key = match k {
                            serde_yaml::Value::String(s) => s,
                            serde_yaml::Value::Number(n) => n.to_string(),
                            serde_yaml::Value::Bool(b) => b.to_string(),
                            _ => return None,
                        };
                        Some((key, Self::from_yaml(v)))
                    })
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Self::from_yaml(tagged.value),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => {
                let n = n.normalize();
                if n.scale() == 0 {
                    match n.to_i64() {
                        Some(i) => serde_json::Value::from(i),
                        None => serde_json::Value::from(n.to_f64().unwrap_or(0.0)),
                    }
                } else {
                    serde_json::Value::from(n.to_f64().unwrap_or(0.0))
                }
            }
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n.normalize()),
            Self::Text(s) => f.write_str(s),
            Self::List(_) | Self::Object(_) => write!(f, "{}", self.to_json()),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Number(Decimal::from(i))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Number(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ============================================
// Arithmetic and comparison
// ============================================

/// `+`: text concatenation when either side is text, decimal addition
/// otherwise.
pub fn add(left: &Value, right: &Value) -> Value {
    if matches!(left, Value::Text(_)) || matches!(right, Value::Text(_)) {
        return Value::Text(format!("{}{}", left, right));
    }
    Value::Number(left.as_decimal() + right.as_decimal())
}

pub fn subtract(left: &Value, right: &Value) -> Value {
    Value::Number(left.as_decimal() - right.as_decimal())
}

pub fn multiply(left: &Value, right: &Value) -> Value {
    Value::Number(left.as_decimal() * right.as_decimal())
}

/// Division rounds half-up at [`DECIMAL_SCALE`]. `None` when the divisor is
/// zero; callers decide how to recover.
pub fn divide(left: &Value, right: &Value) -> Option<Value> {
    let divisor = right.as_decimal();
    let quotient = left.as_decimal().checked_div(divisor)?;
    Some(Value::Number(quotient.round_dp_with_strategy(
        DECIMAL_SCALE,
        RoundingStrategy::MidpointAwayFromZero,
    )))
}

/// `%`: `None` when the modulus is zero.
pub fn modulo(left: &Value, right: &Value) -> Option<Value> {
    left.as_decimal()
        .checked_rem(right.as_decimal())
        .map(Value::Number)
}

/// `^` / `**`: computed through f64 and converted back, matching the library
/// functions that have no exact decimal form.
pub fn power(left: &Value, right: &Value) -> Value {
    let base = left.as_decimal().to_f64().unwrap_or(0.0);
    let exp = right.as_decimal().to_f64().unwrap_or(0.0);
    let result = base.powf(exp);
    if result.is_finite() {
        Decimal::from_f64(result).map(Value::Number).unwrap_or(Value::Null)
    } else {
        Value::Null
    }
}

/// Cross-type equality: numeric when both sides coerce cleanly, variant
/// equality for matching variants, textual comparison otherwise.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (left.try_decimal(), right.try_decimal()) {
        return l == r;
    }
    if std::mem::discriminant(left) == std::mem::discriminant(right) {
        return left == right;
    }
    left.to_string() == right.to_string()
}

/// Ordering used by `<`, `<=`, `>`, `>=`: numeric when both sides coerce
/// cleanly, lexicographic over the textual forms otherwise.
pub fn compare_values(left: &Value, right: &Value) -> std::cmp::Ordering {
    if let (Some(l), Some(r)) = (left.try_decimal(), right.try_decimal()) {
        return l.cmp(&r);
    }
    if let (Value::Date(l), Value::Date(r)) = (left, right) {
        return l.cmp(r);
    }
    left.to_string().cmp(&right.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.as_bool());
        assert!(!Value::Bool(false).as_bool());
        assert!(!num("0").as_bool());
        assert!(num("0.5").as_bool());
        assert!(!Value::text("").as_bool());
        assert!(Value::text("x").as_bool());
        assert!(!Value::List(vec![]).as_bool());
        assert!(Value::List(vec![Value::Null]).as_bool());
    }

    #[test]
    fn test_decimal_coercion() {
        assert_eq!(Value::Null.as_decimal(), Decimal::ZERO);
        assert_eq!(Value::text("12.5").as_decimal(), Decimal::from_str("12.5").unwrap());
        assert_eq!(Value::text("not a number").as_decimal(), Decimal::ZERO);
        assert!(Value::Bool(true).try_decimal().is_none());
        assert!(Value::text(" 42 ").try_decimal().is_some());
    }

    #[test]
    fn test_add_concatenates_text() {
        let v = add(&Value::text("score: "), &num("750"));
        assert_eq!(v, Value::text("score: 750"));
        let v = add(&num("1"), &num("2"));
        assert_eq!(v, num("3"));
    }

    #[test]
    fn test_division_rounds_half_up_at_scale_ten() {
        let v = divide(&num("1"), &num("3")).unwrap();
        assert_eq!(v, num("0.3333333333"));
        let v = divide(&num("2"), &num("3")).unwrap();
        assert_eq!(v, num("0.6666666667"));
    }

    #[test]
    fn test_division_by_zero_is_none() {
        assert!(divide(&num("10"), &num("0")).is_none());
        assert!(modulo(&num("10"), &num("0")).is_none());
    }

    #[test]
    fn test_numeric_equality_across_forms() {
        assert!(values_equal(&num("750"), &Value::text("750")));
        assert!(values_equal(&num("1.0"), &num("1")));
        assert!(!values_equal(&num("750"), &Value::text("751")));
        assert!(values_equal(&Value::Bool(true), &Value::text("true")));
    }

    #[test]
    fn test_comparison_prefers_numeric() {
        use std::cmp::Ordering;
        assert_eq!(compare_values(&num("9"), &Value::text("10")), Ordering::Less);
        // Non-numeric text falls back to lexicographic ordering.
        assert_eq!(
            compare_values(&Value::text("b"), &Value::text("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_json_round_trip() {
        let v = Value::from_json(serde_json::json!({
            "approved": true,
            "score": 750,
            "ratio": 0.5,
            "tags": ["a", "b"],
        }));
        match &v {
            Value::Object(map) => {
                assert_eq!(map["approved"], Value::Bool(true));
                assert_eq!(map["score"], num("750"));
                assert_eq!(map["tags"], Value::List(vec![Value::text("a"), Value::text("b")]));
            }
            other => panic!("expected object, got {:?}", other),
        }
        assert_eq!(v.to_json()["score"], serde_json::json!(750));
    }

    #[test]
    fn test_display_normalizes_numbers() {
        assert_eq!(num("1.50").to_string(), "1.5");
        assert_eq!(num("100").to_string(), "100");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_date_coercion() {
        let d = Value::text("2024-02-29").as_date().unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let d = Value::text("02/29/2024").as_date().unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(Value::text("not a date").as_date().is_none());
    }
}
