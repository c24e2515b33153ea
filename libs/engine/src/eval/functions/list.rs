//! List and range builtins

use crate::value::Value;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// in_range(value, low, high): inclusive numeric range check.
pub fn in_range(args: &[Value]) -> Value {
    match (
        args[0].try_decimal(),
        args[1].try_decimal(),
        args[2].try_decimal(),
    ) {
        (Some(v), Some(lo), Some(hi)) => Value::Bool(lo <= v && v <= hi),
        _ => Value::Bool(false),
    }
}

/// distance_between(a, b): absolute difference for numbers, Euclidean
/// distance for coordinate pairs given as two-element lists.
pub fn distance_between(args: &[Value]) -> Value {
    if let (Value::List(a), Value::List(b)) = (&args[0], &args[1]) {
        if a.len() >= 2 && b.len() >= 2 {
            let coords: Option<Vec<f64>> = [&a[0], &a[1], &b[0], &b[1]]
                .iter()
                .map(|v| v.try_decimal().and_then(|d| d.to_f64()))
                .collect();
            if let Some(c) = coords {
                let distance = ((c[2] - c[0]).powi(2) + (c[3] - c[1]).powi(2)).sqrt();
                return Decimal::from_f64(distance)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
            }
        }
        return Value::Null;
    }

    match (args[0].try_decimal(), args[1].try_decimal()) {
        (Some(a), Some(b)) => Value::Number((a - b).abs()),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn num(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_in_range_inclusive() {
        assert_eq!(in_range(&[num("5"), num("1"), num("10")]), Value::Bool(true));
        assert_eq!(in_range(&[num("1"), num("1"), num("10")]), Value::Bool(true));
        assert_eq!(in_range(&[num("10"), num("1"), num("10")]), Value::Bool(true));
        assert_eq!(in_range(&[num("11"), num("1"), num("10")]), Value::Bool(false));
        assert_eq!(
            in_range(&[Value::text("x"), num("1"), num("10")]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_numeric_distance() {
        assert_eq!(distance_between(&[num("3"), num("10")]), num("7"));
        assert_eq!(distance_between(&[num("10"), num("3")]), num("7"));
        assert_eq!(distance_between(&[Value::Null, num("3")]), Value::Null);
    }

    #[test]
    fn test_point_distance() {
        let a = Value::List(vec![num("0"), num("0")]);
        let b = Value::List(vec![num("3"), num("4")]);
        assert_eq!(distance_between(&[a, b]), num("5"));
    }
}
