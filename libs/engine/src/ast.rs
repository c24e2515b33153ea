//! Abstract syntax tree for the rule dialect
//!
//! Three sibling node families share a [`SourceLocation`]: expressions
//! (values), conditions (booleans) and actions (effects). Synonym operators
//! (`>=`, `at_least`, `greater_than_or_equal`) are canonicalized to a single
//! internal operator at parse time; `Display` renders the canonical form,
//! which re-parses to an identical tree.

use crate::location::SourceLocation;
use crate::value::Value;
use std::fmt;

// ============================================
// Expressions
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value: number, text, boolean, null, embedded JSON block
    Literal {
        value: Value,
        location: SourceLocation,
    },

    /// Variable reference, resolved computed > input > constant
    Variable {
        name: String,
        location: SourceLocation,
    },

    /// Binary arithmetic: expr op expr
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },

    /// Unary prefix: ('+' | '-') expr
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },

    /// Bracketed list: '[' expr (',' expr)* ']'
    List {
        elements: Vec<Expr>,
        location: SourceLocation,
    },

    /// Builtin function call: name '(' args ')'
    FunctionCall {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },

    /// JSON path extraction: json_get(source, path) and `expr[index]`
    JsonPath {
        source: Box<Expr>,
        path: Box<Expr>,
        location: SourceLocation,
    },

    /// REST invocation through the injected provider
    RestCall {
        method: String,
        url: Box<Expr>,
        body: Option<Box<Expr>>,
        headers: Option<Box<Expr>>,
        timeout: Option<Box<Expr>>,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::Literal { location, .. }
            | Self::Variable { location, .. }
            | Self::Binary { location, .. }
            | Self::Unary { location, .. }
            | Self::List { location, .. }
            | Self::FunctionCall { location, .. }
            | Self::JsonPath { location, .. }
            | Self::RestCall { location, .. } => location,
        }
    }

    /// True when the subtree contains a function, REST or JSON-path node.
    /// `calculate` actions reject such expressions at parse time.
    pub fn contains_call(&self) -> Option<&SourceLocation> {
        match self {
            Self::Literal { .. } | Self::Variable { .. } => None,
            Self::Binary { left, right, .. } => {
                left.contains_call().or_else(|| right.contains_call())
            }
            Self::Unary { operand, .. } => operand.contains_call(),
            Self::List { elements, .. } => elements.iter().find_map(|e| e.contains_call()),
            Self::FunctionCall { location, .. }
            | Self::JsonPath { location, .. }
            | Self::RestCall { location, .. } => Some(location),
        }
    }
}

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
    Power,    // ^ and **
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "^",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Add | Self::Subtract => 1,
            Self::Multiply | Self::Divide | Self::Modulo => 2,
            Self::Power => 3,
        }
    }
}

/// Unary prefix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,  // +
    Minus, // -
}

// ============================================
// Conditions
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Binary comparison: expr op expr
    Comparison {
        left: Expr,
        op: ComparisonOp,
        right: Expr,
        location: SourceLocation,
    },

    /// Inclusive numeric range: expr 'between' expr 'and' expr
    Between {
        value: Expr,
        low: Expr,
        high: Expr,
        location: SourceLocation,
    },

    /// Unary keyword validator: expr 'is_null', expr 'is_credit_score', ...
    Predicate {
        op: PredicateOp,
        operand: Expr,
        location: SourceLocation,
    },

    /// n-ary 'and' / 'or' with short-circuit evaluation
    Logical {
        op: LogicalOp,
        operands: Vec<Condition>,
        location: SourceLocation,
    },

    /// 'not' condition
    Not {
        inner: Box<Condition>,
        location: SourceLocation,
    },

    /// Bare expression promoted to a condition via truthiness
    Expression {
        expr: Expr,
        location: SourceLocation,
    },
}

impl Condition {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::Comparison { location, .. }
            | Self::Between { location, .. }
            | Self::Predicate { location, .. }
            | Self::Logical { location, .. }
            | Self::Not { location, .. }
            | Self::Expression { location, .. } => location,
        }
    }
}

/// Canonical comparison operator. Symbolic and keyword synonyms all map here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq, // == = equals
    Ne, // !=
    Lt, // < less_than
    Le, // <= at_most less_than_or_equal
    Gt, // > greater_than
    Ge, // >= at_least greater_than_or_equal
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    AgeAtLeast,
    AgeMeetsRequirement,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Matches => "matches",
            Self::AgeAtLeast => "age_at_least",
            Self::AgeMeetsRequirement => "age_meets_requirement",
        }
    }
}

/// Unary keyword validator operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    IsNumeric,
    IsPositive,
    IsNegative,
    IsEmail,
    IsCreditScore,
    IsSsn,
    IsAccountNumber,
    IsRoutingNumber,
    IsBusinessDay,
}

impl PredicateOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::IsNumeric => "is_numeric",
            Self::IsPositive => "is_positive",
            Self::IsNegative => "is_negative",
            Self::IsEmail => "is_email",
            Self::IsCreditScore => "is_credit_score",
            Self::IsSsn => "is_ssn",
            Self::IsAccountNumber => "is_account_number",
            Self::IsRoutingNumber => "is_routing_number",
            Self::IsBusinessDay => "is_business_day",
        }
    }
}

/// Logical connective: 'and' | 'or'
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
        }
    }
}

// ============================================
// Actions
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// set NAME to EXPR
    Set {
        name: String,
        expr: Expr,
        location: SourceLocation,
    },

    /// NAME = EXPR, NAME += EXPR, NAME -= EXPR, NAME *= EXPR, NAME /= EXPR
    Assignment {
        name: String,
        op: AssignOp,
        expr: Expr,
        location: SourceLocation,
    },

    /// add EXPR to NAME / subtract EXPR from NAME /
    /// multiply NAME by EXPR / divide NAME by EXPR
    Arithmetic {
        op: ArithmeticOp,
        target: String,
        operand: Expr,
        location: SourceLocation,
    },

    /// calculate NAME as EXPR (arithmetic/variable/literal nodes only)
    Calculate {
        name: String,
        expr: Expr,
        location: SourceLocation,
    },

    /// run NAME as EXPR (function / REST / JSON roots permitted)
    Run {
        name: String,
        expr: Expr,
        location: SourceLocation,
    },

    /// call FN [with ARG, ...] [into NAME]
    Call {
        name: String,
        args: Vec<Expr>,
        result: Option<String>,
        location: SourceLocation,
    },

    /// if COND then ACTION [else ACTION]
    Conditional {
        condition: Condition,
        then_actions: Vec<Action>,
        else_actions: Vec<Action>,
        location: SourceLocation,
    },

    /// forEach NAME[, IDX] in EXPR: ACTION
    ForEach {
        item: String,
        index: Option<String>,
        list: Expr,
        body: Vec<Action>,
        location: SourceLocation,
    },

    /// append/prepend EXPR to NAME / remove EXPR from NAME
    ListOp {
        op: ListOp,
        name: String,
        expr: Expr,
        location: SourceLocation,
    },

    /// circuit_breaker EXPR — controlled stop, not an error
    CircuitBreaker {
        message: Expr,
        location: SourceLocation,
    },
}

impl Action {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::Set { location, .. }
            | Self::Assignment { location, .. }
            | Self::Arithmetic { location, .. }
            | Self::Calculate { location, .. }
            | Self::Run { location, .. }
            | Self::Call { location, .. }
            | Self::Conditional { location, .. }
            | Self::ForEach { location, .. }
            | Self::ListOp { location, .. }
            | Self::CircuitBreaker { location, .. } => location,
        }
    }
}

/// Compound assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,    // =
    AddAssign, // +=
    SubAssign, // -=
    MulAssign, // *=
    DivAssign, // /=
}

impl AssignOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
        }
    }
}

/// Natural-language arithmetic action operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// List mutation operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    Append,
    Prepend,
    Remove,
}

// ============================================
// Display (canonical serialization)
// ============================================

fn fmt_text_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("\"")
}

fn fmt_value_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Number(n) => write!(f, "{}", n.normalize()),
        Value::Text(s) => fmt_text_literal(f, s),
        // Lists and objects re-enter through the list grammar / JSON block.
        Value::List(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_value_literal(f, item)?;
            }
            f.write_str("]")
        }
        Value::Object(_) => write!(f, "{}", value.to_json()),
        Value::Date(d) => fmt_text_literal(f, &d.format("%Y-%m-%d").to_string()),
    }
}

fn fmt_operand(
    f: &mut fmt::Formatter<'_>,
    operand: &Expr,
    parent: BinaryOp,
    is_right: bool,
) -> fmt::Result {
    let needs_parens = match operand {
        Expr::Binary { op, .. } => {
            let (child, par) = (op.precedence(), parent.precedence());
            // Power is right-associative, everything else left-associative.
            let assoc_clash = child == par
                && match parent {
                    BinaryOp::Power => !is_right,
                    _ => is_right,
                };
            child < par || assoc_clash
        }
        Expr::Unary { .. } => true,
        _ => false,
    };
    if needs_parens {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value, .. } => fmt_value_literal(f, value),
            Self::Variable { name, .. } => f.write_str(name),
            Self::Binary {
                op, left, right, ..
            } => {
                fmt_operand(f, left, *op, false)?;
                write!(f, " {} ", op.symbol())?;
                fmt_operand(f, right, *op, true)
            }
            Self::Unary { op, operand, .. } => {
                let symbol = match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                };
                match operand.as_ref() {
                    Expr::Binary { .. } | Expr::Unary { .. } => write!(f, "{}({})", symbol, operand),
                    _ => write!(f, "{}{}", symbol, operand),
                }
            }
            Self::List { elements, .. } => {
                f.write_str("[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                f.write_str("]")
            }
            Self::FunctionCall { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                f.write_str(")")
            }
            Self::JsonPath { source, path, .. } => write!(f, "json_get({}, {})", source, path),
            Self::RestCall {
                method,
                url,
                body,
                headers,
                timeout,
                ..
            } => {
                write!(f, "rest_{}({}", method.to_lowercase(), url)?;
                for arg in [body, headers, timeout].into_iter().flatten() {
                    write!(f, ", {}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison {
                left, op, right, ..
            } => write!(f, "{} {} {}", left, op.symbol(), right),
            Self::Between {
                value, low, high, ..
            } => write!(f, "{} between {} and {}", value, low, high),
            Self::Predicate { op, operand, .. } => write!(f, "{} {}", operand, op.symbol()),
            Self::Logical { op, operands, .. } => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.symbol())?;
                    }
                    let needs_parens = matches!(
                        operand,
                        Self::Logical { op: child, .. } if child.precedence() < op.precedence()
                    );
                    if needs_parens {
                        write!(f, "({})", operand)?;
                    } else {
                        write!(f, "{}", operand)?;
                    }
                }
                Ok(())
            }
            Self::Not { inner, .. } => {
                if matches!(inner.as_ref(), Self::Logical { .. }) {
                    write!(f, "not ({})", inner)
                } else {
                    write!(f, "not {}", inner)
                }
            }
            Self::Expression { expr, .. } => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { name, expr, .. } => write!(f, "set {} to {}", name, expr),
            Self::Assignment { name, op, expr, .. } => {
                write!(f, "{} {} {}", name, op.symbol(), expr)
            }
            Self::Arithmetic {
                op, target, operand, ..
            } => match op {
                ArithmeticOp::Add => write!(f, "add {} to {}", operand, target),
                ArithmeticOp::Subtract => write!(f, "subtract {} from {}", operand, target),
                ArithmeticOp::Multiply => write!(f, "multiply {} by {}", target, operand),
                ArithmeticOp::Divide => write!(f, "divide {} by {}", target, operand),
            },
            Self::Calculate { name, expr, .. } => write!(f, "calculate {} as {}", name, expr),
            Self::Run { name, expr, .. } => write!(f, "run {} as {}", name, expr),
            Self::Call {
                name, args, result, ..
            } => {
                write!(f, "call {}", name)?;
                if !args.is_empty() {
                    f.write_str(" with ")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                }
                if let Some(result) = result {
                    write!(f, " into {}", result)?;
                }
                Ok(())
            }
            Self::Conditional {
                condition,
                then_actions,
                else_actions,
                ..
            } => {
                write!(f, "if {} then ", condition)?;
                if let Some(action) = then_actions.first() {
                    write!(f, "{}", action)?;
                }
                if let Some(action) = else_actions.first() {
                    write!(f, " else {}", action)?;
                }
                Ok(())
            }
            Self::ForEach {
                item,
                index,
                list,
                body,
                ..
            } => {
                match index {
                    Some(idx) => write!(f, "forEach {}, {} in {}: ", item, idx, list)?,
                    None => write!(f, "forEach {} in {}: ", item, list)?,
                }
                if let Some(action) = body.first() {
                    write!(f, "{}", action)?;
                }
                Ok(())
            }
            Self::ListOp { op, name, expr, .. } => match op {
                ListOp::Append => write!(f, "append {} to {}", expr, name),
                ListOp::Prepend => write!(f, "prepend {} to {}", expr, name),
                ListOp::Remove => write!(f, "remove {} from {}", expr, name),
            },
            Self::CircuitBreaker { message, .. } => write!(f, "circuit_breaker {}", message),
        }
    }
}
