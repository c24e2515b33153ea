//! Condition evaluation
//!
//! Returns a boolean for every condition node. `and`/`or` short-circuit.
//! Comparisons involving `Null` are false regardless of operator; only the
//! `is_null` / `is_not_null` validators see missing values.

use super::functions::validation;
use super::Evaluator;
use crate::ast::{ComparisonOp, Condition, LogicalOp, PredicateOp};
use crate::error::{Diagnostic, ErrorCode};
use crate::value::{self, Value};
use std::cmp::Ordering;

impl Evaluator<'_> {
    pub fn eval_condition(&mut self, condition: &Condition) -> bool {
        match condition {
            Condition::Comparison {
                left,
                op,
                right,
                location,
            } => {
                let l = self.eval_expr(left);
                let r = self.eval_expr(right);
                if l.is_null() || r.is_null() {
                    return false;
                }
                match op {
                    ComparisonOp::Eq => value::values_equal(&l, &r),
                    ComparisonOp::Ne => !value::values_equal(&l, &r),
                    ComparisonOp::Lt => value::compare_values(&l, &r) == Ordering::Less,
                    ComparisonOp::Le => value::compare_values(&l, &r) != Ordering::Greater,
                    ComparisonOp::Gt => value::compare_values(&l, &r) == Ordering::Greater,
                    ComparisonOp::Ge => value::compare_values(&l, &r) != Ordering::Less,
                    ComparisonOp::In => membership(&l, &r),
                    ComparisonOp::NotIn => !membership(&l, &r),
                    ComparisonOp::Contains => contains(&l, &r),
                    ComparisonOp::StartsWith => l.to_string().starts_with(&r.to_string()),
                    ComparisonOp::EndsWith => l.to_string().ends_with(&r.to_string()),
                    ComparisonOp::Matches => {
                        let pattern = r.to_string();
                        match regex::Regex::new(&pattern) {
                            Ok(re) => re.is_match(&l.to_string()),
                            Err(e) => {
                                self.ctx.add_diagnostic(Diagnostic::at(
                                    ErrorCode::TypeMismatch,
                                    format!("invalid pattern '{}': {}", pattern, e),
                                    location.clone(),
                                ));
                                false
                            }
                        }
                    }
                    ComparisonOp::AgeAtLeast | ComparisonOp::AgeMeetsRequirement => {
                        validation::age_meets_requirement(&l, &r, self.config.clock.now())
                    }
                }
            }

            Condition::Between {
                value, low, high, ..
            } => {
                let v = self.eval_expr(value);
                let lo = self.eval_expr(low);
                let hi = self.eval_expr(high);
                match (v.try_decimal(), lo.try_decimal(), hi.try_decimal()) {
                    (Some(v), Some(lo), Some(hi)) => lo <= v && v <= hi,
                    _ => false,
                }
            }

            Condition::Predicate { op, operand, .. } => {
                let v = self.eval_expr(operand);
                match op {
                    PredicateOp::IsNull => v.is_null(),
                    PredicateOp::IsNotNull => !v.is_null(),
                    PredicateOp::IsEmpty => is_empty(&v),
                    PredicateOp::IsNotEmpty => !is_empty(&v),
                    PredicateOp::IsNumeric => v.try_decimal().is_some(),
                    PredicateOp::IsPositive => {
                        v.try_decimal().map(|d| d.is_sign_positive() && !d.is_zero()).unwrap_or(false)
                    }
                    PredicateOp::IsNegative => {
                        v.try_decimal().map(|d| d.is_sign_negative() && !d.is_zero()).unwrap_or(false)
                    }
                    PredicateOp::IsEmail => validation::is_email(&v),
                    PredicateOp::IsCreditScore => validation::is_valid_credit_score(&v),
                    PredicateOp::IsSsn => validation::is_valid_ssn(&v),
                    PredicateOp::IsAccountNumber => validation::is_valid_account(&v),
                    PredicateOp::IsRoutingNumber => validation::is_valid_routing(&v),
                    PredicateOp::IsBusinessDay => validation::is_business_day(&v),
                }
            }

            Condition::Logical { op, operands, .. } => match op {
                LogicalOp::And => operands.iter().all(|c| self.eval_condition(c)),
                LogicalOp::Or => operands.iter().any(|c| self.eval_condition(c)),
            },

            Condition::Not { inner, .. } => !self.eval_condition(inner),

            Condition::Expression { expr, .. } => self.eval_expr(expr).as_bool(),
        }
    }
}

/// `l in r`: list membership by value equality, substring search for text.
fn membership(l: &Value, r: &Value) -> bool {
    match r {
        Value::List(items) => items.iter().any(|item| value::values_equal(l, item)),
        Value::Text(haystack) => haystack.contains(&l.to_string()),
        _ => false,
    }
}

/// `l contains r`: mirror image of membership.
fn contains(l: &Value, r: &Value) -> bool {
    match l {
        Value::List(items) => items.iter().any(|item| value::values_equal(r, item)),
        Value::Text(haystack) => haystack.contains(&r.to_string()),
        _ => false,
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Text(s) => s.trim().is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
