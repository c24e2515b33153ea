//! Expression evaluation
//!
//! Returns a [`Value`] for every expression node. Recovery arms are explicit:
//! an unknown function or a division by zero yields `Null` plus a diagnostic
//! that preserves the offending expression's text, and evaluation continues.

use super::functions::call_builtin;
use super::Evaluator;
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{Diagnostic, ErrorCode};
use crate::functions;
use crate::providers::RestRequest;
use crate::value::{self, Value};
use rust_decimal::prelude::ToPrimitive;
use std::time::Duration;

impl Evaluator<'_> {
    pub fn eval_expr(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Literal { value, .. } => value.clone(),

            Expr::Variable { name, .. } => self.ctx.get(name),

            Expr::Binary {
                op,
                left,
                right,
                location,
            } => {
                let l = self.eval_expr(left);
                let r = self.eval_expr(right);
                match op {
                    BinaryOp::Add => value::add(&l, &r),
                    BinaryOp::Subtract => value::subtract(&l, &r),
                    BinaryOp::Multiply => value::multiply(&l, &r),
                    BinaryOp::Power => value::power(&l, &r),
                    BinaryOp::Divide => match value::divide(&l, &r) {
                        Some(v) => v,
                        None => {
                            self.ctx.add_diagnostic(Diagnostic::at(
                                ErrorCode::DivisionByZero,
                                format!("division by zero in '{}'", expr),
                                location.clone(),
                            ));
                            Value::Null
                        }
                    },
                    BinaryOp::Modulo => match value::modulo(&l, &r) {
                        Some(v) => v,
                        None => {
                            self.ctx.add_diagnostic(Diagnostic::at(
                                ErrorCode::DivisionByZero,
                                format!("modulo by zero in '{}'", expr),
                                location.clone(),
                            ));
                            Value::Null
                        }
                    },
                }
            }

            Expr::Unary { op, operand, .. } => {
                let v = self.eval_expr(operand);
                match op {
                    UnaryOp::Plus => Value::Number(v.as_decimal()),
                    UnaryOp::Minus => Value::Number(-v.as_decimal()),
                }
            }

            Expr::List { elements, .. } => {
                Value::List(elements.iter().map(|e| self.eval_expr(e)).collect())
            }

            Expr::FunctionCall {
                name,
                args,
                location,
            } => {
                let Some(metadata) = functions::lookup(name) else {
                    self.ctx.add_diagnostic(Diagnostic::at(
                        ErrorCode::FunctionUnknown,
                        format!("unknown function '{}' in '{}'", name, expr),
                        location.clone(),
                    ));
                    return Value::Null;
                };
                if !functions::arity_ok(metadata, args.len()) {
                    self.ctx.add_diagnostic(Diagnostic::at(
                        ErrorCode::TypeMismatch,
                        format!(
                            "{} called with {} argument(s), expects at least {}{}",
                            metadata.name,
                            args.len(),
                            metadata.min_args,
                            metadata
                                .max_args
                                .map(|m| format!(" and at most {}", m))
                                .unwrap_or_default(),
                        ),
                        location.clone(),
                    ));
                    return Value::Null;
                }

                let argv: Vec<Value> = args.iter().map(|a| self.eval_expr(a)).collect();
                call_builtin(metadata.name, &argv, self.ctx, self.config)
            }

            Expr::JsonPath { source, path, .. } => {
                let source_value = self.eval_expr(source);
                let path_text = self.eval_expr(path).to_string();
                self.config
                    .json_path_provider
                    .get(&source_value, &path_text)
            }

            Expr::RestCall {
                method,
                url,
                body,
                headers,
                timeout,
                location,
            } => {
                let request = RestRequest {
                    method: method.clone(),
                    url: self.eval_expr(url).to_string(),
                    body: body.as_deref().map(|b| self.eval_expr(b)),
                    headers: headers.as_deref().map(|h| self.eval_expr(h)),
                    timeout: timeout
                        .as_deref()
                        .map(|t| self.eval_expr(t))
                        .and_then(|v| v.try_decimal())
                        .and_then(|ms| ms.to_u64())
                        .map(Duration::from_millis)
                        .unwrap_or(self.config.rest_timeout),
                };

                let response = self.config.rest_provider.call(request);
                if let Value::Object(map) = &response {
                    if map.get("success") == Some(&Value::Bool(false)) {
                        let message = map
                            .get("message")
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "request failed".to_string());
                        self.ctx.add_diagnostic(Diagnostic::at(
                            ErrorCode::RestFailure,
                            format!("rest_{} failed: {}", method.to_lowercase(), message),
                            location.clone(),
                        ));
                    }
                }
                response
            }
        }
    }
}
