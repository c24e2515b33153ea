//! Builtin function implementations, grouped by family
//!
//! Dispatch happens on the canonical lowercase name after the registry has
//! validated arity. Functions are side-effect-free except the logging family
//! and the injected REST provider, and they recover instead of failing: a bad
//! argument yields `Null` plus a TYPE_MISMATCH diagnostic.

pub mod financial;
pub mod json;
pub mod list;
pub mod logging;
pub mod math;
pub mod rest;
pub mod string;
pub mod temporal;
pub mod validation;

use crate::context::EvaluationContext;
use crate::engine::EngineConfig;
use crate::error::{Diagnostic, ErrorCode};
use crate::value::Value;
use rust_decimal::Decimal;

/// Invoke a builtin by its canonical name. Arity has been checked upstream.
pub fn call_builtin(
    name: &str,
    args: &[Value],
    ctx: &mut EvaluationContext,
    config: &EngineConfig,
) -> Value {
    match name {
        // Math
        "abs" => math::abs(args, ctx),
        "max" => math::max(args),
        "min" => math::min(args),
        "round" => math::round(args, ctx),
        "floor" => math::floor(args, ctx),
        "ceil" => math::ceil(args, ctx),
        "pow" => math::pow(args),
        "sqrt" => math::sqrt(args, ctx),

        // String
        "format" => string::format(args),
        "format_currency" => string::format_currency(args, ctx),
        "format_percentage" => string::format_percentage(args, ctx),
        "to_upper" => string::to_upper(args),
        "to_lower" => string::to_lower(args),
        "length" => string::length(args),

        // Date
        "dateadd" => temporal::dateadd(args, ctx),
        "datediff" => temporal::datediff(args, ctx),
        "time_hour" => temporal::time_hour(config.clock.now()),

        // Financial
        "calculate_loan_payment" => financial::loan_payment(args, ctx),
        "calculate_compound_interest" => financial::compound_interest(args, ctx),
        "calculate_amortization" => financial::amortization(args, ctx),
        "debt_to_income_ratio" => financial::debt_to_income_ratio(args, ctx),
        "credit_utilization" => financial::credit_utilization(args, ctx),
        "loan_to_value" => financial::loan_to_value(args, ctx),
        "payment_history_score" => financial::payment_history_score(args, ctx),

        // Validation
        "is_valid_credit_score" => Value::Bool(validation::is_valid_credit_score(&args[0])),
        "is_valid_ssn" => Value::Bool(validation::is_valid_ssn(&args[0])),
        "is_valid_account" => Value::Bool(validation::is_valid_account(&args[0])),
        "is_valid_routing" => Value::Bool(validation::is_valid_routing(&args[0])),
        "is_valid" => Value::Bool(validation::is_valid(&args[0])),
        "is_business_day" => Value::Bool(validation::is_business_day(&args[0])),
        "age_meets_requirement" => Value::Bool(validation::age_meets_requirement(
            &args[0],
            &args[1],
            config.clock.now(),
        )),

        // List
        "in_range" => list::in_range(args),
        "distance_between" => list::distance_between(args),

        // Logging
        "log" | "print" | "notify" | "alert" | "audit_log" | "send_notification" => {
            logging::emit(name, args)
        }

        // JSON
        "json_get" | "json_path" => json::get(args, config),
        "json_exists" => json::exists(args, config),
        "json_size" => json::size(args, config),
        "json_type" => json::type_of(args, config),

        // REST
        "rest_get" | "rest_post" | "rest_put" | "rest_patch" | "rest_delete" | "rest_call" => {
            rest::call(name, args, ctx, config)
        }

        // The registry and dispatch table are maintained together.
        other => {
            tracing::error!(function = other, "builtin registered but not dispatched");
            Value::Null
        }
    }
}

/// Fetch a numeric argument, recording a TYPE_MISMATCH when it does not
/// coerce cleanly.
pub(crate) fn numeric_arg(
    args: &[Value],
    index: usize,
    function: &str,
    ctx: &mut EvaluationContext,
) -> Option<Decimal> {
    let value = args.get(index)?;
    match value.try_decimal() {
        Some(d) => Some(d),
        None => {
            ctx.add_diagnostic(Diagnostic::new(
                ErrorCode::TypeMismatch,
                format!(
                    "{} expects a numeric argument, got {}",
                    function,
                    value.type_name()
                ),
            ));
            None
        }
    }
}
