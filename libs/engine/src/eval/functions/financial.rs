//! Financial builtins
//!
//! Rates are annual percentages (7.5 means 7.5% APR), terms are years.
//! Money results round to two decimal places; ratios keep the engine's
//! division scale. Zero denominators yield `Null` with a warning.

use super::numeric_arg;
use crate::context::EvaluationContext;
use crate::error::{Diagnostic, ErrorCode};
use crate::value::{self, Value};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// calculate_loan_payment(principal, annual_rate_pct, years): standard
/// amortized monthly payment.
pub fn loan_payment(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    match monthly_payment(args, ctx) {
        Some((payment, _)) => money(payment),
        None => Value::Null,
    }
}

/// calculate_compound_interest(principal, annual_rate_pct, years[, periods]):
/// final amount with interest compounded `periods` times a year (default 12).
pub fn compound_interest(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    let (Some(principal), Some(rate), Some(years)) = (
        numeric_arg(args, 0, "calculate_compound_interest", ctx),
        numeric_arg(args, 1, "calculate_compound_interest", ctx),
        numeric_arg(args, 2, "calculate_compound_interest", ctx),
    ) else {
        return Value::Null;
    };
    let periods = args
        .get(3)
        .and_then(|v| v.try_decimal())
        .and_then(|d| d.to_f64())
        .unwrap_or(12.0);
    if periods <= 0.0 {
        ctx.add_diagnostic(Diagnostic::new(
            ErrorCode::TypeMismatch,
            "calculate_compound_interest requires a positive period count",
        ));
        return Value::Null;
    }

    let p = principal.to_f64().unwrap_or(0.0);
    let r = rate.to_f64().unwrap_or(0.0) / 100.0;
    let t = years.to_f64().unwrap_or(0.0);
    money(p * (1.0 + r / periods).powf(periods * t))
}

/// calculate_amortization(principal, annual_rate_pct, years): monthly
/// payment plus totals, as an object.
pub fn amortization(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    let Some((payment, term_months)) = monthly_payment(args, ctx) else {
        return Value::Null;
    };
    let principal = args[0].as_decimal().to_f64().unwrap_or(0.0);
    let total = payment * term_months;

    let mut result = BTreeMap::new();
    result.insert("monthly_payment".to_string(), money(payment));
    result.insert("total_payment".to_string(), money(total));
    result.insert("total_interest".to_string(), money(total - principal));
    Value::Object(result)
}

/// debt_to_income_ratio(monthly_debt, monthly_income): raw ratio.
pub fn debt_to_income_ratio(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    ratio(args, "debt_to_income_ratio", ctx, false)
}

/// credit_utilization(balance, limit): percent of the limit in use.
pub fn credit_utilization(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    ratio(args, "credit_utilization", ctx, true)
}

/// loan_to_value(loan, value): percent of the collateral value borrowed.
pub fn loan_to_value(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    ratio(args, "loan_to_value", ctx, true)
}

/// payment_history_score(on_time, total): percent of payments made on time.
pub fn payment_history_score(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    ratio(args, "payment_history_score", ctx, true)
}

/// Shared payment math. Returns (monthly payment, term in months).
fn monthly_payment(args: &[Value], ctx: &mut EvaluationContext) -> Option<(f64, f64)> {
    let principal = numeric_arg(args, 0, "calculate_loan_payment", ctx)?;
    let rate = numeric_arg(args, 1, "calculate_loan_payment", ctx)?;
    let years = numeric_arg(args, 2, "calculate_loan_payment", ctx)?;

    let n = years.to_f64().unwrap_or(0.0) * 12.0;
    if n <= 0.0 {
        ctx.add_diagnostic(Diagnostic::new(
            ErrorCode::TypeMismatch,
            "loan term must be positive",
        ));
        return None;
    }
    let p = principal.to_f64().unwrap_or(0.0);
    let r = rate.to_f64().unwrap_or(0.0) / 100.0 / 12.0;

    let payment = if r == 0.0 {
        p / n
    } else {
        let growth = (1.0 + r).powf(n);
        p * r * growth / (growth - 1.0)
    };
    Some((payment, n))
}

fn ratio(
    args: &[Value],
    function: &str,
    ctx: &mut EvaluationContext,
    as_percent: bool,
) -> Value {
    let (Some(numerator), Some(denominator)) = (
        numeric_arg(args, 0, function, ctx),
        numeric_arg(args, 1, function, ctx),
    ) else {
        return Value::Null;
    };
    if denominator.is_zero() {
        ctx.add_diagnostic(Diagnostic::new(
            ErrorCode::DivisionByZero,
            format!("{} denominator is zero", function),
        ));
        return Value::Null;
    }

    if as_percent {
        let percent = numerator / denominator * Decimal::from(100);
        Value::Number(percent.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    } else {
        value::divide(&Value::Number(numerator), &Value::Number(denominator))
            .expect("denominator checked non-zero")
    }
}

fn money(amount: f64) -> Value {
    if !amount.is_finite() {
        return Value::Null;
    }
    Decimal::from_f64(amount)
        .map(|d| {
            Value::Number(d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        })
        .unwrap_or(Value::Null)
}
