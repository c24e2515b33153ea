//! Math builtins

use super::numeric_arg;
use crate::context::EvaluationContext;
use crate::value::{self, Value, DECIMAL_SCALE};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

pub fn abs(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    match numeric_arg(args, 0, "abs", ctx) {
        Some(d) => Value::Number(d.abs()),
        None => Value::Null,
    }
}

/// Variadic; list arguments are flattened one level so `max(scores)` works.
pub fn max(args: &[Value]) -> Value {
    fold_numeric(args, |acc, d| if d > acc { d } else { acc })
}

pub fn min(args: &[Value]) -> Value {
    fold_numeric(args, |acc, d| if d < acc { d } else { acc })
}

fn fold_numeric(args: &[Value], pick: impl Fn(Decimal, Decimal) -> Decimal) -> Value {
    let mut result: Option<Decimal> = None;
    let mut consider = |v: &Value| {
        if let Some(d) = v.try_decimal() {
            result = Some(match result {
                Some(acc) => pick(acc, d),
                None => d,
            });
        }
    };
    for arg in args {
        match arg {
            Value::List(items) => items.iter().for_each(&mut consider),
            other => consider(other),
        }
    }
    result.map(Value::Number).unwrap_or(Value::Null)
}

pub fn round(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    let Some(d) = numeric_arg(args, 0, "round", ctx) else {
        return Value::Null;
    };
    let digits = args
        .get(1)
        .and_then(|v| v.try_decimal())
        .and_then(|d| d.to_u32())
        .unwrap_or(0)
        .min(DECIMAL_SCALE);
    Value::Number(d.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero))
}

pub fn floor(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    match numeric_arg(args, 0, "floor", ctx) {
        Some(d) => Value::Number(d.floor()),
        None => Value::Null,
    }
}

pub fn ceil(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    match numeric_arg(args, 0, "ceil", ctx) {
        Some(d) => Value::Number(d.ceil()),
        None => Value::Null,
    }
}

pub fn pow(args: &[Value]) -> Value {
    value::power(&args[0], &args[1])
}

/// Square roots go through f64 and back; negative input yields `Null`.
pub fn sqrt(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    let Some(d) = numeric_arg(args, 0, "sqrt", ctx) else {
        return Value::Null;
    };
    if d.is_sign_negative() {
        return Value::Null;
    }
    let result = d.to_f64().unwrap_or(0.0).sqrt();
    Decimal::from_f64(result)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn num(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_max_min_variadic_and_flattening() {
        assert_eq!(max(&[num("3"), num("9"), num("5")]), num("9"));
        assert_eq!(min(&[num("3"), num("9"), num("5")]), num("3"));
        let list = Value::List(vec![num("4"), num("11"), num("7")]);
        assert_eq!(max(&[list]), num("11"));
        assert_eq!(max(&[Value::Null]), Value::Null);
    }

    #[test]
    fn test_round_with_precision() {
        let mut ctx = EvaluationContext::default();
        assert_eq!(round(&[num("2.345"), num("2")], &mut ctx), num("2.35"));
        assert_eq!(round(&[num("2.5")], &mut ctx), num("3"));
        assert_eq!(round(&[num("-2.5")], &mut ctx), num("-3"));
    }

    #[test]
    fn test_floor_ceil() {
        let mut ctx = EvaluationContext::default();
        assert_eq!(floor(&[num("2.9")], &mut ctx), num("2"));
        assert_eq!(ceil(&[num("2.1")], &mut ctx), num("3"));
        assert_eq!(floor(&[num("-2.1")], &mut ctx), num("-3"));
    }

    #[test]
    fn test_sqrt() {
        let mut ctx = EvaluationContext::default();
        assert_eq!(sqrt(&[num("9")], &mut ctx), num("3"));
        assert_eq!(sqrt(&[num("-1")], &mut ctx), Value::Null);
    }

    #[test]
    fn test_non_numeric_records_diagnostic() {
        let mut ctx = EvaluationContext::default();
        assert_eq!(abs(&[Value::text("x")], &mut ctx), Value::Null);
        assert_eq!(ctx.diagnostics().len(), 1);
    }
}
