//! String builtins

use super::numeric_arg;
use crate::context::EvaluationContext;
use crate::value::Value;
use rust_decimal::Decimal;

/// Positional template formatting: `format("hello {0}, {1}", a, b)`.
pub fn format(args: &[Value]) -> Value {
    let mut result = args
        .first()
        .map(|t| t.to_string())
        .unwrap_or_default();
    for (i, arg) in args.iter().skip(1).enumerate() {
        result = result.replace(&std::format!("{{{}}}", i), &arg.to_string());
    }
    Value::Text(result)
}

pub fn format_currency(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    match numeric_arg(args, 0, "format_currency", ctx) {
        Some(d) => Value::Text(std::format!("${:.2}", d)),
        None => Value::Null,
    }
}

/// Ratios render as percentages: 0.125 becomes "12.50%".
pub fn format_percentage(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    match numeric_arg(args, 0, "format_percentage", ctx) {
        Some(d) => Value::Text(std::format!("{:.2}%", d * Decimal::from(100))),
        None => Value::Null,
    }
}

pub fn to_upper(args: &[Value]) -> Value {
    Value::Text(args[0].to_string().to_uppercase())
}

pub fn to_lower(args: &[Value]) -> Value {
    Value::Text(args[0].to_string().to_lowercase())
}

pub fn length(args: &[Value]) -> Value {
    let len = match &args[0] {
        Value::Null => 0,
        Value::Text(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Object(map) => map.len(),
        other => other.to_string().chars().count(),
    };
    Value::from(len as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn num(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_format_positional() {
        let v = format(&[
            Value::text("applicant {0} scored {1}"),
            Value::text("A-1"),
            num("720"),
        ]);
        assert_eq!(v, Value::text("applicant A-1 scored 720"));
    }

    #[test]
    fn test_format_currency() {
        let mut ctx = EvaluationContext::default();
        assert_eq!(
            format_currency(&[num("1234.5")], &mut ctx),
            Value::text("$1234.50")
        );
        assert_eq!(
            format_currency(&[num("0.005")], &mut ctx),
            Value::text("$0.01")
        );
    }

    #[test]
    fn test_format_percentage() {
        let mut ctx = EvaluationContext::default();
        assert_eq!(
            format_percentage(&[num("0.125")], &mut ctx),
            Value::text("12.50%")
        );
    }

    #[test]
    fn test_case_and_length() {
        assert_eq!(to_upper(&[Value::text("ok")]), Value::text("OK"));
        assert_eq!(to_lower(&[Value::text("OK")]), Value::text("ok"));
        assert_eq!(length(&[Value::text("hello")]), Value::from(5i64));
        assert_eq!(
            length(&[Value::List(vec![Value::Null, Value::Null])]),
            Value::from(2i64)
        );
        assert_eq!(length(&[Value::Null]), Value::from(0i64));
    }
}
