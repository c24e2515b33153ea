//! Date and time builtins
//!
//! Dates coerce from the date variant, ISO `YYYY-MM-DD` text and
//! `MM/DD/YYYY` text. Malformed input yields `Null`.

use crate::context::EvaluationContext;
use crate::error::{Diagnostic, ErrorCode};
use crate::value::Value;
use chrono::{DateTime, Datelike, Months, NaiveDate, Timelike, Utc};
use rust_decimal::prelude::ToPrimitive;

/// dateadd(date, n, unit) with unit in days|weeks|months|years.
pub fn dateadd(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    let Some(date) = args[0].as_date() else {
        return Value::Null;
    };
    let Some(amount) = args[1].try_decimal().and_then(|d| d.to_i64()) else {
        return Value::Null;
    };
    let unit = args[2].to_string().to_lowercase();

    let result = match unit.as_str() {
        "days" | "day" => date.checked_add_signed(chrono::Duration::days(amount)),
        "weeks" | "week" => date.checked_add_signed(chrono::Duration::weeks(amount)),
        "months" | "month" => add_months(date, amount),
        "years" | "year" => add_months(date, amount.saturating_mul(12)),
        other => {
            ctx.add_diagnostic(Diagnostic::new(
                ErrorCode::TypeMismatch,
                format!("dateadd does not understand unit '{}'", other),
            ));
            None
        }
    };
    result.map(Value::Date).unwrap_or(Value::Null)
}

/// datediff(a, b, unit): signed distance from a to b.
pub fn datediff(args: &[Value], ctx: &mut EvaluationContext) -> Value {
    let (Some(from), Some(to)) = (args[0].as_date(), args[1].as_date()) else {
        return Value::Null;
    };
    let unit = args[2].to_string().to_lowercase();

    let amount = match unit.as_str() {
        "days" | "day" => (to - from).num_days(),
        "weeks" | "week" => (to - from).num_days() / 7,
        "months" | "month" => months_between(from, to),
        "years" | "year" => months_between(from, to) / 12,
        other => {
            ctx.add_diagnostic(Diagnostic::new(
                ErrorCode::TypeMismatch,
                format!("datediff does not understand unit '{}'", other),
            ));
            return Value::Null;
        }
    };
    Value::from(amount)
}

/// Current hour of day (0-23) from the injected clock.
pub fn time_hour(now: DateTime<Utc>) -> Value {
    Value::from(now.hour() as i64)
}

fn add_months(date: NaiveDate, amount: i64) -> Option<NaiveDate> {
    let months = u32::try_from(amount.unsigned_abs()).ok()?;
    if amount >= 0 {
        date.checked_add_months(Months::new(months))
    } else {
        date.checked_sub_months(Months::new(months))
    }
}

/// Whole months from `a` to `b`, partial months truncated toward zero.
fn months_between(a: NaiveDate, b: NaiveDate) -> i64 {
    let mut months =
        (b.year() as i64 - a.year() as i64) * 12 + (b.month() as i64 - a.month() as i64);
    if months > 0 && b.day() < a.day() {
        months -= 1;
    } else if months < 0 && b.day() > a.day() {
        months += 1;
    }
    months
}
