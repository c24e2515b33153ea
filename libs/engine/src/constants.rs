//! Constant scanning and loading
//!
//! Before an evaluation runs, the document's AST is walked for identifiers
//! that follow the UPPER_SNAKE_CASE constant convention. The union of the
//! referenced names and the declared `constants:` block is requested from
//! the provider in one call; provider values win, inline defaults fill the
//! gaps, and a name with neither is fatal.

use crate::ast::{Action, Condition, Expr};
use crate::document::{is_constant_name, RuleDocument};
use crate::error::{Error, Result};
use crate::providers::ConstantProvider;
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Constant names the document's expressions reference.
pub fn referenced_constants(doc: &RuleDocument) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for block in doc.blocks() {
        if let Some(when) = &block.when {
            walk_condition(when, &mut names);
        }
        for action in block.then_actions.iter().chain(&block.else_actions) {
            walk_action(action, &mut names);
        }
    }
    names
}

/// Fetch and merge the constants an evaluation needs: declared ∪ referenced,
/// provider values first, inline defaults second.
pub async fn load_constants(
    doc: &RuleDocument,
    provider: &dyn ConstantProvider,
) -> Result<BTreeMap<String, Value>> {
    let mut codes = referenced_constants(doc);
    for constant in &doc.inline_constants {
        codes.insert(constant.code.clone());
    }
    if codes.is_empty() {
        return Ok(BTreeMap::new());
    }

    let requested: Vec<String> = codes.iter().cloned().collect();
    let records = provider
        .constants_by_codes(&requested)
        .await
        .map_err(|e| Error::Provider(e.to_string()))?;
    tracing::debug!(
        requested = requested.len(),
        received = records.len(),
        "loaded constants"
    );

    let defaults: BTreeMap<&str, &Value> = doc
        .inline_constants
        .iter()
        .filter_map(|c| c.default_value.as_ref().map(|v| (c.code.as_str(), v)))
        .collect();

    let mut by_code = BTreeMap::new();
    for record in records {
        by_code.insert(record.code.clone(), record);
    }

    let mut values = BTreeMap::new();
    let mut missing = Vec::new();
    for code in codes {
        let record = by_code.get(&code);
        if let Some(value) = record.and_then(|r| r.effective_value()) {
            values.insert(code, value);
        } else if let Some(default) = defaults.get(code.as_str()) {
            values.insert(code, (*default).clone());
        } else if record.map(|r| !r.required).unwrap_or(false) {
            // The store knows the constant but marks it optional.
            values.insert(code, Value::Null);
        } else {
            missing.push(code);
        }
    }

    if missing.is_empty() {
        Ok(values)
    } else {
        Err(Error::ConstantMissing { missing })
    }
}

// ============================================
// AST walkers
// ============================================

fn note(name: &str, names: &mut BTreeSet<String>) {
    if is_constant_name(name) {
        names.insert(name.to_string());
    }
}

fn walk_expr(expr: &Expr, names: &mut BTreeSet<String>) {
    match expr {
        Expr::Literal { .. } => {}
        Expr::Variable { name, .. } => note(name, names),
        Expr::Binary { left, right, .. } => {
            walk_expr(left, names);
            walk_expr(right, names);
        }
        Expr::Unary { operand, .. } => walk_expr(operand, names),
        Expr::List { elements, .. } => elements.iter().for_each(|e| walk_expr(e, names)),
        Expr::FunctionCall { args, .. } => args.iter().for_each(|a| walk_expr(a, names)),
        Expr::JsonPath { source, path, .. } => {
            walk_expr(source, names);
            walk_expr(path, names);
        }
        Expr::RestCall {
            url,
            body,
            headers,
            timeout,
            ..
        } => {
            walk_expr(url, names);
            for arg in [body, headers, timeout].into_iter().flatten() {
                walk_expr(arg, names);
            }
        }
    }
}

fn walk_condition(condition: &Condition, names: &mut BTreeSet<String>) {
    match condition {
        Condition::Comparison { left, right, .. } => {
            walk_expr(left, names);
            walk_expr(right, names);
        }
        Condition::Between {
            value, low, high, ..
        } => {
            walk_expr(value, names);
            walk_expr(low, names);
            walk_expr(high, names);
        }
        Condition::Predicate { operand, .. } => walk_expr(operand, names),
        Condition::Logical { operands, .. } => {
            operands.iter().for_each(|c| walk_condition(c, names))
        }
        Condition::Not { inner, .. } => walk_condition(inner, names),
        Condition::Expression { expr, .. } => walk_expr(expr, names),
    }
}

fn walk_action(action: &Action, names: &mut BTreeSet<String>) {
    match action {
        Action::Set { expr, .. }
        | Action::Assignment { expr, .. }
        | Action::Calculate { expr, .. }
        | Action::Run { expr, .. }
        | Action::ListOp { expr, .. } => walk_expr(expr, names),
        Action::Arithmetic { operand, .. } => walk_expr(operand, names),
        Action::Call { args, .. } => args.iter().for_each(|a| walk_expr(a, names)),
        Action::Conditional {
            condition,
            then_actions,
            else_actions,
            ..
        } => {
            walk_condition(condition, names);
            for inner in then_actions.iter().chain(else_actions) {
                walk_action(inner, names);
            }
        }
        Action::ForEach { list, body, .. } => {
            walk_expr(list, names);
            body.iter().for_each(|a| walk_action(a, names));
        }
        Action::CircuitBreaker { message, .. } => walk_expr(message, names),
    }
}
