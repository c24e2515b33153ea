//! Rule document model and YAML decoding
//!
//! A rule document names its inputs, declares inline constants, carries one
//! of three condition/action shapes and declares outputs:
//!
//! 1. *Simple*: `when:` / `then:` / `else:` lists of source lines.
//! 2. *Structured*: a `conditions:` block with `if:`/`then:`/`else:` nodes
//!    built from `and` / `or` / `not` / `compare` mappings.
//! 3. *Multi*: a `rules:` list of named sub-rules, each with its own
//!    when/then/else.
//!
//! Naming-convention violations (camelCase inputs, UPPER_SNAKE constants,
//! snake_case computed names) are collected as non-fatal diagnostics.

use crate::ast::{Action, ComparisonOp, Condition, Expr, LogicalOp};
use crate::error::{Diagnostic, Error, ErrorCode, Result};
use crate::location::SourceLocation;
use crate::parser;
use crate::value::Value;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

fn input_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("static pattern"))
}

fn constant_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("static pattern"))
}

fn computed_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static pattern"))
}

/// True when `name` matches the UPPER_SNAKE_CASE system-constant convention.
pub fn is_constant_name(name: &str) -> bool {
    constant_name_pattern().is_match(name)
}

/// A parsed rule document. Produced once per YAML text and safe to cache and
/// share between evaluations.
#[derive(Debug, Clone)]
pub struct RuleDocument {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub metadata: BTreeMap<String, Value>,
    pub circuit_breaker: CircuitBreakerConfig,
    pub inputs: Vec<String>,
    pub inline_constants: Vec<InlineConstant>,
    pub body: RuleBody,
    /// Declared outputs in declaration order. The type tag is advisory.
    pub outputs: Vec<(String, OutputType)>,
    /// Non-fatal findings from document validation.
    pub diagnostics: Vec<Diagnostic>,
}

/// Constant declared in the document with an optional inline default.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineConstant {
    pub code: String,
    pub default_value: Option<Value>,
}

/// Top-level shape: a single when/then/else block or a list of sub-rules.
#[derive(Debug, Clone)]
pub enum RuleBody {
    Single(ConditionalBlock),
    Multi(Vec<SubRule>),
}

/// A named entry under `rules:`.
#[derive(Debug, Clone)]
pub struct SubRule {
    pub name: String,
    pub block: ConditionalBlock,
}

/// when/then/else. A missing `when` executes `then` unconditionally.
#[derive(Debug, Clone)]
pub struct ConditionalBlock {
    pub when: Option<Condition>,
    pub then_actions: Vec<Action>,
    pub else_actions: Vec<Action>,
}

/// Circuit breaker configuration. `enabled: false` downgrades
/// `circuit_breaker` actions to logged warnings; the threshold and timeouts
/// are carried for outer-layer breakers.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub timeout: Duration,
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Advisory output type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Text,
    Number,
    Boolean,
    List,
    Object,
}

impl OutputType {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "text" | "string" => Some(Self::Text),
            "number" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "list" | "array" => Some(Self::List),
            "object" | "map" => Some(Self::Object),
            _ => None,
        }
    }
}

impl RuleDocument {
    /// Decode a YAML rule document.
    pub fn parse(yaml_text: &str) -> Result<Self> {
        let root: serde_yaml::Value = serde_yaml::from_str(yaml_text)
            .map_err(|e| Error::YamlStructure(e.to_string()))?;
        let mapping = root
            .as_mapping()
            .ok_or_else(|| Error::YamlStructure("rule document must be a mapping".into()))?;

        let mut diagnostics = Vec::new();

        let name = get_str(mapping, "name")
            .ok_or_else(|| Error::YamlStructure("rule document requires a 'name'".into()))?;
        let description = get_str(mapping, "description");
        let version = get_str(mapping, "version");

        let metadata = match get(mapping, "metadata") {
            Some(value @ serde_yaml::Value::Mapping(_)) => match Value::from_yaml(value.clone()) {
                Value::Object(map) => map,
                _ => BTreeMap::new(),
            },
            Some(_) => {
                return Err(Error::YamlStructure("'metadata' must be a mapping".into()));
            }
            None => BTreeMap::new(),
        };

        let circuit_breaker = decode_circuit_breaker(mapping, &mut diagnostics)?;
        let inputs = decode_inputs(mapping, &mut diagnostics)?;
        let inline_constants = decode_constants(mapping, &mut diagnostics)?;
        let body = decode_body(mapping)?;
        let outputs = decode_outputs(mapping, &mut diagnostics)?;

        validate_written_names(&body, &mut diagnostics);

        Ok(Self {
            name,
            description,
            version,
            metadata,
            circuit_breaker,
            inputs,
            inline_constants,
            body,
            outputs,
            diagnostics,
        })
    }

    /// All conditional blocks of the document, in execution order.
    pub fn blocks(&self) -> Vec<&ConditionalBlock> {
        match &self.body {
            RuleBody::Single(block) => vec![block],
            RuleBody::Multi(rules) => rules.iter().map(|r| &r.block).collect(),
        }
    }
}

// ============================================
// Field decoding
// ============================================

fn get<'a>(mapping: &'a serde_yaml::Mapping, key: &str) -> Option<&'a serde_yaml::Value> {
    mapping.get(serde_yaml::Value::String(key.to_string()))
}

fn get_str(mapping: &serde_yaml::Mapping, key: &str) -> Option<String> {
    get(mapping, key).and_then(|v| v.as_str()).map(String::from)
}

fn decode_inputs(
    mapping: &serde_yaml::Mapping,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<String>> {
    let Some(value) = get(mapping, "inputs") else {
        return Ok(Vec::new());
    };
    let items = value
        .as_sequence()
        .ok_or_else(|| Error::YamlStructure("'inputs' must be a list of names".into()))?;

    let mut inputs = Vec::with_capacity(items.len());
    for item in items {
        let name = item
            .as_str()
            .ok_or_else(|| Error::YamlStructure("'inputs' entries must be strings".into()))?;
        if !input_name_pattern().is_match(name) {
            diagnostics.push(Diagnostic::new(
                ErrorCode::NamingConvention,
                format!("input '{}' is not camelCase", name),
            ));
        }
        inputs.push(name.to_string());
    }
    Ok(inputs)
}

fn decode_constants(
    mapping: &serde_yaml::Mapping,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<InlineConstant>> {
    let Some(value) = get(mapping, "constants") else {
        return Ok(Vec::new());
    };
    let items = value
        .as_sequence()
        .ok_or_else(|| Error::YamlStructure("'constants' must be a list".into()))?;

    let mut constants = Vec::with_capacity(items.len());
    for item in items {
        let entry = item.as_mapping().ok_or_else(|| {
            Error::YamlStructure("'constants' entries must be mappings with a 'code'".into())
        })?;
        let code = get_str(entry, "code")
            .ok_or_else(|| Error::YamlStructure("constant entry requires a 'code'".into()))?;
        if !is_constant_name(&code) {
            diagnostics.push(Diagnostic::new(
                ErrorCode::NamingConvention,
                format!("constant '{}' is not UPPER_SNAKE_CASE", code),
            ));
        }
        let default_value = get(entry, "defaultValue")
            .or_else(|| get(entry, "default_value"))
            .cloned()
            .map(Value::from_yaml);
        constants.push(InlineConstant {
            code,
            default_value,
        });
    }
    Ok(constants)
}

fn decode_outputs(
    mapping: &serde_yaml::Mapping,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<(String, OutputType)>> {
    let Some(value) = get(mapping, "output").or_else(|| get(mapping, "outputs")) else {
        return Ok(Vec::new());
    };
    let entries = value
        .as_mapping()
        .ok_or_else(|| Error::YamlStructure("'output' must map names to type tags".into()))?;

    let mut outputs = Vec::with_capacity(entries.len());
    for (key, tag) in entries {
        let name = key
            .as_str()
            .ok_or_else(|| Error::YamlStructure("output names must be strings".into()))?;
        let tag_text = tag.as_str().unwrap_or("text");
        let output_type = OutputType::from_tag(tag_text).unwrap_or_else(|| {
            diagnostics.push(Diagnostic::new(
                ErrorCode::YamlStructure,
                format!("output '{}' has unknown type tag '{}'", name, tag_text),
            ));
            OutputType::Text
        });
        outputs.push((name.to_string(), output_type));
    }
    Ok(outputs)
}

fn decode_circuit_breaker(
    mapping: &serde_yaml::Mapping,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<CircuitBreakerConfig> {
    let Some(value) = get(mapping, "circuit_breaker") else {
        return Ok(CircuitBreakerConfig::default());
    };
    let block = value
        .as_mapping()
        .ok_or_else(|| Error::YamlStructure("'circuit_breaker' must be a mapping".into()))?;

    let mut config = CircuitBreakerConfig::default();
    if let Some(enabled) = get(block, "enabled").and_then(|v| v.as_bool()) {
        config.enabled = enabled;
    }
    if let Some(threshold) = get(block, "failure_threshold").and_then(|v| v.as_u64()) {
        config.failure_threshold = threshold as u32;
    }
    if let Some(raw) = get(block, "timeout_duration") {
        match decode_duration(raw) {
            Some(duration) => config.timeout = duration,
            None => diagnostics.push(Diagnostic::new(
                ErrorCode::YamlStructure,
                "circuit_breaker 'timeout_duration' is not a valid duration",
            )),
        }
    }
    if let Some(raw) = get(block, "recovery_timeout") {
        match decode_duration(raw) {
            Some(duration) => config.recovery_timeout = duration,
            None => diagnostics.push(Diagnostic::new(
                ErrorCode::YamlStructure,
                "circuit_breaker 'recovery_timeout' is not a valid duration",
            )),
        }
    }
    Ok(config)
}

/// Accepts an integer second count or a `"30s"` / `"500ms"` / `"2m"` string.
fn decode_duration(value: &serde_yaml::Value) -> Option<Duration> {
    if let Some(secs) = value.as_u64() {
        return Some(Duration::from_secs(secs));
    }
    let text = value.as_str()?.trim();
    if let Some(ms) = text.strip_suffix("ms") {
        return ms.trim().parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(secs) = text.strip_suffix('s') {
        return secs.trim().parse::<u64>().ok().map(Duration::from_secs);
    }
    if let Some(mins) = text.strip_suffix('m') {
        return mins
            .trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60));
    }
    text.parse::<u64>().ok().map(Duration::from_secs)
}

// ============================================
// Body decoding
// ============================================

fn decode_body(mapping: &serde_yaml::Mapping) -> Result<RuleBody> {
    if let Some(rules) = get(mapping, "rules") {
        let items = rules
            .as_sequence()
            .ok_or_else(|| Error::YamlStructure("'rules' must be a list".into()))?;
        let mut sub_rules = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let entry = item
                .as_mapping()
                .ok_or_else(|| Error::YamlStructure("'rules' entries must be mappings".into()))?;
            let name =
                get_str(entry, "name").unwrap_or_else(|| format!("rule_{}", index + 1));
            sub_rules.push(SubRule {
                name,
                block: decode_block(entry)?,
            });
        }
        return Ok(RuleBody::Multi(sub_rules));
    }

    if get(mapping, "conditions").is_some()
        || get(mapping, "when").is_some()
        || get(mapping, "then").is_some()
    {
        return Ok(RuleBody::Single(decode_block(mapping)?));
    }

    Err(Error::YamlStructure(
        "rule document requires one of 'when', 'conditions' or 'rules'".into(),
    ))
}

fn decode_block(mapping: &serde_yaml::Mapping) -> Result<ConditionalBlock> {
    if let Some(conditions) = get(mapping, "conditions") {
        return decode_structured_block(conditions);
    }

    let when = match get(mapping, "when") {
        Some(value) => Some(decode_when(value)?),
        None => None,
    };
    let then_actions = match get(mapping, "then") {
        Some(value) => decode_action_lines(value)?,
        None => Vec::new(),
    };
    let else_actions = match get(mapping, "else") {
        Some(value) => decode_action_lines(value)?,
        None => Vec::new(),
    };

    Ok(ConditionalBlock {
        when,
        then_actions,
        else_actions,
    })
}

fn decode_when(value: &serde_yaml::Value) -> Result<Condition> {
    match value {
        serde_yaml::Value::Bool(b) => Ok(Condition::Expression {
            expr: Expr::Literal {
                value: Value::Bool(*b),
                location: SourceLocation::synthetic(),
            },
            location: SourceLocation::synthetic(),
        }),
        serde_yaml::Value::String(line) => parser::parse_condition(line),
        serde_yaml::Value::Sequence(lines) => {
            let mut operands = Vec::with_capacity(lines.len());
            for line in lines {
                operands.push(decode_when(line)?);
            }
            match operands.len() {
                0 => Err(Error::YamlStructure("'when' list is empty".into())),
                1 => Ok(operands.into_iter().next().expect("checked length")),
                _ => Ok(Condition::Logical {
                    op: LogicalOp::And,
                    operands,
                    location: SourceLocation::synthetic(),
                }),
            }
        }
        _ => Err(Error::YamlStructure(
            "'when' must be a condition line or a list of condition lines".into(),
        )),
    }
}

fn decode_action_lines(value: &serde_yaml::Value) -> Result<Vec<Action>> {
    match value {
        serde_yaml::Value::String(line) => Ok(vec![parser::parse_action(line)?]),
        serde_yaml::Value::Sequence(lines) => {
            let mut actions = Vec::with_capacity(lines.len());
            for line in lines {
                let text = line.as_str().ok_or_else(|| {
                    Error::YamlStructure("action entries must be strings".into())
                })?;
                actions.push(parser::parse_action(text)?);
            }
            Ok(actions)
        }
        serde_yaml::Value::Mapping(block) => match get(block, "actions") {
            Some(actions) => decode_action_lines(actions),
            None => Err(Error::YamlStructure(
                "action block requires an 'actions' list".into(),
            )),
        },
        _ => Err(Error::YamlStructure(
            "'then'/'else' must be an action line or a list of action lines".into(),
        )),
    }
}

fn decode_structured_block(value: &serde_yaml::Value) -> Result<ConditionalBlock> {
    let block = value
        .as_mapping()
        .ok_or_else(|| Error::YamlStructure("'conditions' must be a mapping".into()))?;

    let when = match get(block, "if") {
        Some(node) => Some(decode_condition_node(node)?),
        None => None,
    };
    let then_actions = match get(block, "then") {
        Some(node) => decode_action_lines(node)?,
        None => Vec::new(),
    };
    let else_actions = match get(block, "else") {
        Some(node) => decode_action_lines(node)?,
        None => Vec::new(),
    };

    Ok(ConditionalBlock {
        when,
        then_actions,
        else_actions,
    })
}

fn decode_condition_node(value: &serde_yaml::Value) -> Result<Condition> {
    match value {
        serde_yaml::Value::String(line) => parser::parse_condition(line),
        serde_yaml::Value::Bool(b) => Ok(Condition::Expression {
            expr: Expr::Literal {
                value: Value::Bool(*b),
                location: SourceLocation::synthetic(),
            },
            location: SourceLocation::synthetic(),
        }),
        serde_yaml::Value::Mapping(node) => {
            if let Some(operands) = get(node, "and") {
                return decode_logical(operands, LogicalOp::And);
            }
            if let Some(operands) = get(node, "or") {
                return decode_logical(operands, LogicalOp::Or);
            }
            if let Some(inner) = get(node, "not") {
                return Ok(Condition::Not {
                    inner: Box::new(decode_condition_node(inner)?),
                    location: SourceLocation::synthetic(),
                });
            }
            if let Some(compare) = get(node, "compare") {
                return decode_compare(compare);
            }
            Err(Error::YamlStructure(
                "condition block requires one of 'and', 'or', 'not' or 'compare'".into(),
            ))
        }
        _ => Err(Error::YamlStructure(
            "condition node must be a line or an and/or/not/compare block".into(),
        )),
    }
}

fn decode_logical(value: &serde_yaml::Value, op: LogicalOp) -> Result<Condition> {
    let items = value
        .as_sequence()
        .ok_or_else(|| Error::YamlStructure("logical block must hold a list".into()))?;
    let mut operands = Vec::with_capacity(items.len());
    for item in items {
        operands.push(decode_condition_node(item)?);
    }
    if operands.is_empty() {
        return Err(Error::YamlStructure("logical block is empty".into()));
    }
    Ok(Condition::Logical {
        op,
        operands,
        location: SourceLocation::synthetic(),
    })
}

fn decode_compare(value: &serde_yaml::Value) -> Result<Condition> {
    let node = value
        .as_mapping()
        .ok_or_else(|| Error::YamlStructure("'compare' must be a mapping".into()))?;

    let left = get(node, "left")
        .ok_or_else(|| Error::YamlStructure("'compare' requires 'left'".into()))?;
    let operator = get(node, "operator")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::YamlStructure("'compare' requires an 'operator'".into()))?;
    let right = get(node, "right")
        .ok_or_else(|| Error::YamlStructure("'compare' requires 'right'".into()))?;

    let op = comparison_op_from_tag(operator).ok_or_else(|| {
        Error::YamlStructure(format!("unknown compare operator '{}'", operator))
    })?;

    Ok(Condition::Comparison {
        // The left side names what is being tested, so strings parse as
        // expressions; the right side is data, so strings stay text.
        left: decode_compare_operand(left, true)?,
        op,
        right: decode_compare_operand(right, false)?,
        location: SourceLocation::synthetic(),
    })
}

fn decode_compare_operand(value: &serde_yaml::Value, parse_strings: bool) -> Result<Expr> {
    match value {
        serde_yaml::Value::String(text) if parse_strings => parser::parse_expression(text),
        serde_yaml::Value::Mapping(node) => {
            // {expr: "..."} forces expression parsing on either side.
            if let Some(expr) = get(node, "expr").and_then(|v| v.as_str()) {
                return parser::parse_expression(expr);
            }
            Ok(Expr::Literal {
                value: Value::from_yaml(value.clone()),
                location: SourceLocation::synthetic(),
            })
        }
        other => Ok(Expr::Literal {
            value: Value::from_yaml(other.clone()),
            location: SourceLocation::synthetic(),
        }),
    }
}

fn comparison_op_from_tag(tag: &str) -> Option<ComparisonOp> {
    match tag {
        "==" | "=" | "equals" | "eq" => Some(ComparisonOp::Eq),
        "!=" | "ne" | "not_equals" => Some(ComparisonOp::Ne),
        "<" | "less_than" | "lt" => Some(ComparisonOp::Lt),
        "<=" | "at_most" | "less_than_or_equal" | "le" => Some(ComparisonOp::Le),
        ">" | "greater_than" | "gt" => Some(ComparisonOp::Gt),
        ">=" | "at_least" | "greater_than_or_equal" | "ge" => Some(ComparisonOp::Ge),
        "in" | "in_list" => Some(ComparisonOp::In),
        "not_in" => Some(ComparisonOp::NotIn),
        "contains" => Some(ComparisonOp::Contains),
        "starts_with" => Some(ComparisonOp::StartsWith),
        "ends_with" => Some(ComparisonOp::EndsWith),
        "matches" => Some(ComparisonOp::Matches),
        "age_at_least" => Some(ComparisonOp::AgeAtLeast),
        "age_meets_requirement" => Some(ComparisonOp::AgeMeetsRequirement),
        _ => None,
    }
}

// ============================================
// Naming validation
// ============================================

/// Collect every computed name the actions write and flag names that break
/// the snake_case convention.
fn validate_written_names(body: &RuleBody, diagnostics: &mut Vec<Diagnostic>) {
    let mut names = Vec::new();
    let blocks: Vec<&ConditionalBlock> = match body {
        RuleBody::Single(block) => vec![block],
        RuleBody::Multi(rules) => rules.iter().map(|r| &r.block).collect(),
    };
    for block in blocks {
        for action in block.then_actions.iter().chain(&block.else_actions) {
            collect_written_names(action, &mut names);
        }
    }
    names.sort();
    names.dedup();
    for name in names {
        if !computed_name_pattern().is_match(&name) {
            diagnostics.push(Diagnostic::new(
                ErrorCode::NamingConvention,
                format!("computed variable '{}' is not snake_case", name),
            ));
        }
    }
}

fn collect_written_names(action: &Action, names: &mut Vec<String>) {
    match action {
        Action::Set { name, .. }
        | Action::Assignment { name, .. }
        | Action::Calculate { name, .. }
        | Action::Run { name, .. }
        | Action::ListOp { name, .. } => names.push(name.clone()),
        Action::Arithmetic { target, .. } => names.push(target.clone()),
        Action::Call { result, .. } => {
            if let Some(result) = result {
                names.push(result.clone());
            }
        }
        Action::Conditional {
            then_actions,
            else_actions,
            ..
        } => {
            for inner in then_actions.iter().chain(else_actions) {
                collect_written_names(inner, names);
            }
        }
        Action::ForEach { item, index, body, .. } => {
            names.push(item.clone());
            if let Some(index) = index {
                names.push(index.clone());
            }
            for inner in body {
                collect_written_names(inner, names);
            }
        }
        Action::CircuitBreaker { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_shape() {
        let doc = RuleDocument::parse(
            r#"
name: approval
description: basic approval rule
version: 1.0.0
inputs:
  - creditScore
  - annualIncome
constants:
  - code: MIN_CREDIT_SCORE
    defaultValue: 650
when:
  - creditScore at_least MIN_CREDIT_SCORE
  - annualIncome greater_than 50000
then:
  - set approval_status to "APPROVED"
else:
  - set approval_status to "DECLINED"
output:
  approval_status: text
"#,
        )
        .unwrap();

        assert_eq!(doc.name, "approval");
        assert_eq!(doc.inputs, vec!["creditScore", "annualIncome"]);
        assert_eq!(doc.inline_constants.len(), 1);
        assert_eq!(doc.outputs, vec![("approval_status".into(), OutputType::Text)]);
        match &doc.body {
            RuleBody::Single(block) => {
                assert!(matches!(
                    block.when,
                    Some(Condition::Logical {
                        op: LogicalOp::And,
                        ..
                    })
                ));
                assert_eq!(block.then_actions.len(), 1);
                assert_eq!(block.else_actions.len(), 1);
            }
            RuleBody::Multi(_) => panic!("expected single body"),
        }
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn test_structured_shape() {
        let doc = RuleDocument::parse(
            r#"
name: structured
conditions:
  if:
    and:
      - compare:
          left: creditScore
          operator: at_least
          right: 650
      - annualIncome greater_than 50000
  then:
    actions:
      - set decision to "YES"
  else:
    actions:
      - set decision to "NO"
"#,
        )
        .unwrap();

        match &doc.body {
            RuleBody::Single(block) => {
                match block.when.as_ref().unwrap() {
                    Condition::Logical { op, operands, .. } => {
                        assert_eq!(*op, LogicalOp::And);
                        assert_eq!(operands.len(), 2);
                        assert!(matches!(
                            operands[0],
                            Condition::Comparison {
                                op: ComparisonOp::Ge,
                                ..
                            }
                        ));
                    }
                    other => panic!("expected logical, got {:?}", other),
                }
                assert_eq!(block.then_actions.len(), 1);
            }
            RuleBody::Multi(_) => panic!("expected single body"),
        }
    }

    #[test]
    fn test_multi_shape() {
        let doc = RuleDocument::parse(
            r#"
name: multi
rules:
  - name: compute-dti
    then:
      - calculate dti as monthlyDebt / (annualIncome / 12)
  - name: flag-high-risk
    when: dti greater_than 0.4
    then:
      - set risk_level to "HIGH"
"#,
        )
        .unwrap();

        match &doc.body {
            RuleBody::Multi(rules) => {
                assert_eq!(rules.len(), 2);
                assert_eq!(rules[0].name, "compute-dti");
                assert!(rules[0].block.when.is_none());
                assert!(rules[1].block.when.is_some());
            }
            RuleBody::Single(_) => panic!("expected multi body"),
        }
    }

    #[test]
    fn test_when_boolean_scalar() {
        let doc = RuleDocument::parse("name: x\nwhen: true\nthen: []\n").unwrap();
        match &doc.body {
            RuleBody::Single(block) => assert!(matches!(
                block.when,
                Some(Condition::Expression { .. })
            )),
            RuleBody::Multi(_) => panic!("expected single body"),
        }
    }

    #[test]
    fn test_missing_name_is_fatal() {
        let err = RuleDocument::parse("when: true\nthen: []\n").unwrap_err();
        assert!(matches!(err, Error::YamlStructure(_)));
    }

    #[test]
    fn test_missing_body_is_fatal() {
        let err = RuleDocument::parse("name: x\n").unwrap_err();
        assert!(matches!(err, Error::YamlStructure(_)));
    }

    #[test]
    fn test_naming_convention_warnings() {
        let doc = RuleDocument::parse(
            r#"
name: naming
inputs:
  - CreditScore
constants:
  - code: minScore
    defaultValue: 1
when: true
then:
  - set BadName to 1
"#,
        )
        .unwrap();

        let codes: Vec<_> = doc.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes.len(), 3);
        assert!(codes.iter().all(|c| *c == ErrorCode::NamingConvention));
    }

    #[test]
    fn test_circuit_breaker_config() {
        let doc = RuleDocument::parse(
            r#"
name: breaker
circuit_breaker:
  enabled: true
  failure_threshold: 3
  timeout_duration: 10s
  recovery_timeout: 500ms
when: true
then: []
"#,
        )
        .unwrap();

        assert!(doc.circuit_breaker.enabled);
        assert_eq!(doc.circuit_breaker.failure_threshold, 3);
        assert_eq!(doc.circuit_breaker.timeout, Duration::from_secs(10));
        assert_eq!(doc.circuit_breaker.recovery_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_bad_action_line_is_fatal() {
        let err = RuleDocument::parse(
            "name: x\nwhen: true\nthen:\n  - frobnicate a to 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::ActionParse { .. }));
    }

    #[test]
    fn test_unknown_output_tag_warns() {
        let doc =
            RuleDocument::parse("name: x\nwhen: true\nthen: []\noutput:\n  result: decimal\n")
                .unwrap();
        assert_eq!(doc.outputs[0].1, OutputType::Text);
        assert_eq!(doc.diagnostics.len(), 1);
    }
}
