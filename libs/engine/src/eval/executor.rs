//! Action execution
//!
//! Runs action lists in declaration order. Each action is best-effort: a
//! runtime problem records a diagnostic and the next action still runs. The
//! circuit breaker is the one exception; once triggered no further action in
//! this evaluation executes.

use super::functions::call_builtin;
use super::Evaluator;
use crate::ast::{Action, ArithmeticOp, AssignOp, ListOp};
use crate::error::{Diagnostic, ErrorCode};
use crate::functions;
use crate::value::{self, Value};
use rust_decimal::{Decimal, RoundingStrategy};

impl Evaluator<'_> {
    /// Execute a list of actions, honoring the circuit breaker between
    /// actions.
    pub fn execute_actions(&mut self, actions: &[Action]) {
        for action in actions {
            if self.ctx.circuit_breaker_triggered() {
                return;
            }
            self.execute_action(action);
        }
    }

    fn execute_action(&mut self, action: &Action) {
        match action {
            Action::Set { name, expr, .. } => {
                let v = self.eval_expr(expr);
                self.ctx.set_computed(name, v);
            }

            Action::Assignment {
                name,
                op,
                expr,
                location,
            } => {
                let operand = self.eval_expr(expr);
                match op {
                    AssignOp::Assign => {
                        self.ctx.set_computed(name, operand);
                    }
                    AssignOp::AddAssign => {
                        // Numeric add when both sides are numbers, string
                        // concatenation otherwise.
                        let current = self.ctx.get(name);
                        let next = match (current.try_decimal(), operand.try_decimal()) {
                            (Some(l), Some(r)) => Value::Number(l + r),
                            _ => Value::Text(format!("{}{}", current, operand)),
                        };
                        self.ctx.set_computed(name, next);
                    }
                    AssignOp::SubAssign | AssignOp::MulAssign | AssignOp::DivAssign => {
                        let current = self.ctx.get(name);
                        let (Some(l), Some(r)) = (current.try_decimal(), operand.try_decimal())
                        else {
                            self.ctx.add_diagnostic(Diagnostic::at(
                                ErrorCode::TypeMismatch,
                                format!(
                                    "'{}' requires numeric operands; '{}' is {} and operand is {}",
                                    op.symbol(),
                                    name,
                                    current.type_name(),
                                    operand.type_name()
                                ),
                                location.clone(),
                            ));
                            return;
                        };
                        let next = match op {
                            AssignOp::SubAssign => l - r,
                            AssignOp::MulAssign => l * r,
                            AssignOp::DivAssign => {
                                if r.is_zero() {
                                    self.ctx.add_diagnostic(Diagnostic::at(
                                        ErrorCode::DivisionByZero,
                                        format!("division by zero assigning '{}'", name),
                                        location.clone(),
                                    ));
                                    return;
                                }
                                round_division(l, r)
                            }
                            _ => unreachable!("outer match covers the remaining operators"),
                        };
                        self.ctx.set_computed(name, Value::Number(next));
                    }
                }
            }

            Action::Arithmetic {
                op,
                target,
                operand,
                location,
            } => {
                let operand_value = self.eval_expr(operand);
                let current = self.ctx.get(target);
                let (Some(cur), Some(arg)) = (current.try_decimal(), operand_value.try_decimal())
                else {
                    self.ctx.add_diagnostic(Diagnostic::at(
                        ErrorCode::TypeMismatch,
                        format!(
                            "arithmetic on non-numeric operands: '{}' is {}, operand is {}",
                            target,
                            current.type_name(),
                            operand_value.type_name()
                        ),
                        location.clone(),
                    ));
                    return;
                };
                let next = match op {
                    ArithmeticOp::Add => cur + arg,
                    ArithmeticOp::Subtract => cur - arg,
                    ArithmeticOp::Multiply => cur * arg,
                    ArithmeticOp::Divide => {
                        if arg.is_zero() {
                            // Logged and skipped; the target keeps its value.
                            self.ctx.add_diagnostic(Diagnostic::at(
                                ErrorCode::DivisionByZero,
                                format!("division by zero dividing '{}'", target),
                                location.clone(),
                            ));
                            return;
                        }
                        round_division(cur, arg)
                    }
                };
                self.ctx.set_computed(target, Value::Number(next));
            }

            Action::Calculate { name, expr, .. } => {
                let mark = self.ctx.diagnostic_count();
                let v = self.eval_expr(expr);
                if self.ctx.diagnostic_since(mark, ErrorCode::DivisionByZero) {
                    // Division by zero leaves an existing target unchanged; a
                    // target that never existed surfaces as null.
                    if self.ctx.lookup(name).is_none() {
                        self.ctx.set_computed(name, Value::Null);
                    } else {
                        tracing::warn!(target_name = %name, "calculate skipped after division by zero");
                    }
                    return;
                }
                self.ctx.set_computed(name, v);
            }

            Action::Run { name, expr, .. } => {
                let v = self.eval_expr(expr);
                self.ctx.set_computed(name, v);
            }

            Action::Call {
                name,
                args,
                result,
                location,
            } => {
                let argv: Vec<Value> = args.iter().map(|a| self.eval_expr(a)).collect();
                let value = match functions::lookup(name) {
                    Some(metadata) if functions::arity_ok(metadata, argv.len()) => {
                        call_builtin(metadata.name, &argv, self.ctx, self.config)
                    }
                    Some(metadata) => {
                        self.ctx.add_diagnostic(Diagnostic::at(
                            ErrorCode::TypeMismatch,
                            format!(
                                "{} called with {} argument(s)",
                                metadata.name,
                                argv.len()
                            ),
                            location.clone(),
                        ));
                        Value::Null
                    }
                    None => {
                        self.ctx.add_diagnostic(Diagnostic::at(
                            ErrorCode::FunctionUnknown,
                            format!("unknown function '{}'", name),
                            location.clone(),
                        ));
                        Value::Null
                    }
                };
                if let Some(result) = result {
                    self.ctx.set_computed(result, value);
                }
            }

            Action::Conditional {
                condition,
                then_actions,
                else_actions,
                ..
            } => {
                if self.eval_condition(condition) {
                    self.execute_actions(then_actions);
                } else {
                    self.execute_actions(else_actions);
                }
            }

            Action::ForEach {
                item,
                index,
                list,
                body,
                ..
            } => {
                let items = match self.eval_expr(list) {
                    Value::List(items) => items,
                    // Null iterates zero times; any other scalar wraps into a
                    // single-element list.
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                for (i, element) in items.into_iter().enumerate() {
                    if self.ctx.circuit_breaker_triggered() {
                        return;
                    }
                    // Bindings stay visible after the loop (accumulators).
                    self.ctx.set_computed(item, element);
                    if let Some(index_name) = index {
                        self.ctx
                            .set_computed(index_name, Value::from(i as i64));
                    }
                    self.execute_actions(body);
                }
            }

            Action::ListOp { op, name, expr, .. } => {
                let element = self.eval_expr(expr);
                let mut items = match self.ctx.lookup(name).cloned() {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::List(items)) => items,
                    Some(other) => vec![other],
                };
                match op {
                    ListOp::Append => items.push(element),
                    ListOp::Prepend => items.insert(0, element),
                    ListOp::Remove => items.retain(|item| !value::values_equal(item, &element)),
                }
                self.ctx.set_computed(name, Value::List(items));
            }

            Action::CircuitBreaker { message, location } => {
                let message = self.eval_expr(message).to_string();
                if !self.circuit_breaker_enabled {
                    self.ctx.add_diagnostic(Diagnostic::at(
                        ErrorCode::CircuitBreaker,
                        format!("circuit breaker disabled by configuration; '{}' ignored", message),
                        location.clone(),
                    ));
                    return;
                }
                self.ctx.trigger_circuit_breaker(message);
            }
        }
    }
}

/// Division inside actions shares the expression rounding: half-up, scale 10.
fn round_division(l: Decimal, r: Decimal) -> Decimal {
    (l / r).round_dp_with_strategy(
        crate::value::DECIMAL_SCALE,
        RoundingStrategy::MidpointAwayFromZero,
    )
}
