//! Recursive-descent parser for conditions, expressions and action lines
//!
//! Precedence (lowest to highest):
//! 1. or
//! 2. and
//! 3. not (prefix)
//! 4. comparison (==, !=, <, <=, >, >=, keyword forms, in, between)
//! 5. additive (+, -)
//! 6. multiplicative (*, /, %)
//! 7. power (^, **) - right associative
//! 8. unary (+, -)
//! 9. postfix (function call, array index)
//! 10. primary (identifier, literal, list, parenthesized)
//!
//! The same parser handles the three contexts of the dialect: a `when` line
//! parses as a condition (a bare expression root is promoted through
//! truthiness), `calculate`/`run` arguments parse as expressions, and
//! `then`/`else` lines parse through the action-line grammar.

use crate::ast::*;
use crate::error::{Error, ParseErrorKind, Result};
use crate::lexer::Lexer;
use crate::location::SourceLocation;
use crate::token::{Token, TokenType};
use crate::value::Value;
use rust_decimal::Decimal;
use std::str::FromStr;

const MAX_RECURSION_DEPTH: usize = 200;

/// Parse a source line as a condition.
pub fn parse_condition(input: &str) -> Result<Condition> {
    Parser::new(input).parse_condition()
}

/// Parse a source line as an expression.
pub fn parse_expression(input: &str) -> Result<Expr> {
    Parser::new(input).parse_expression()
}

/// Parse a source line as an action.
pub fn parse_action(input: &str) -> Result<Action> {
    Parser::new(input).parse_action()
}

/// Parser over a pre-lexed token stream
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    lines: Vec<String>,
    recursion_depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            tokens: Lexer::tokenize(input),
            pos: 0,
            lines: input.lines().map(|l| l.to_string()).collect(),
            recursion_depth: 0,
        }
    }

    /// Parse the input as a condition and require the input to be consumed.
    pub fn parse_condition(mut self) -> Result<Condition> {
        let condition = self.parse_or()?;
        self.expect_eof()?;
        Ok(condition)
    }

    /// Parse the input as an expression and require the input to be consumed.
    pub fn parse_expression(mut self) -> Result<Expr> {
        let expr = self.parse_additive()?;
        self.expect_eof()?;
        Ok(expr)
    }

    /// Parse the input as an action line and require the input to be consumed.
    pub fn parse_action(mut self) -> Result<Action> {
        let action = self.parse_action_item()?;
        self.expect_eof()?;
        Ok(action)
    }

    // ============================================
    // Token helpers
    // ============================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, token_type: &TokenType) -> bool {
        &self.current().token_type == token_type
    }

    /// True when the current token is an identifier with the given word.
    /// Action separators (`to`, `as`, `from`, `by`, `with`, `into`, `then`,
    /// `else`) are contextual, not reserved.
    fn check_word(&self, word: &str) -> bool {
        self.current().token_type == TokenType::Identifier && self.current().value == word
    }

    fn location_of(&self, token: &Token) -> SourceLocation {
        match self.lines.get(token.line.saturating_sub(1)) {
            Some(line) => SourceLocation::with_snippet(token.line, token.column, line.clone()),
            None => SourceLocation::new(token.line, token.column),
        }
    }

    fn current_location(&self) -> SourceLocation {
        self.location_of(self.current())
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = self.current();
        let (kind, found) = match token.token_type {
            TokenType::Eof => (ParseErrorKind::UnexpectedEof, "end of input".to_string()),
            TokenType::Error => (ParseErrorKind::InvalidLiteral, token.value.clone()),
            _ => (
                ParseErrorKind::UnexpectedToken,
                format!("'{}'", token.value),
            ),
        };
        Error::expr_parse(
            kind,
            format!("expected {}, found {}", expected, found),
            self.location_of(token),
        )
    }

    fn expect(&mut self, token_type: TokenType, expected: &str) -> Result<Token> {
        if self.check(&token_type) {
            let token = self.current().clone();
            self.advance();
            Ok(token)
        } else {
            let kind = match token_type {
                TokenType::CloseParen => ParseErrorKind::MissingRParen,
                TokenType::CloseBracket => ParseErrorKind::MissingRBracket,
                _ => ParseErrorKind::UnexpectedToken,
            };
            Err(Error::expr_parse(
                kind,
                format!("expected {}, found '{}'", expected, self.current().value),
                self.current_location(),
            ))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.check(&TokenType::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<(String, SourceLocation)> {
        if self.check(&TokenType::Identifier) {
            let token = self.current().clone();
            self.advance();
            Ok((token.value.clone(), self.location_of(&token)))
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        if self.check_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", word)))
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(Error::expr_parse(
                ParseErrorKind::TooDeeplyNested,
                format!("expression too deeply nested (max depth: {})", MAX_RECURSION_DEPTH),
                self.current_location(),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.recursion_depth -= 1;
    }

    // ============================================
    // Conditions
    // ============================================

    fn parse_or(&mut self) -> Result<Condition> {
        self.enter()?;
        let result = self.parse_or_inner();
        self.leave();
        result
    }

    fn parse_or_inner(&mut self) -> Result<Condition> {
        let first = self.parse_and()?;
        if !self.check(&TokenType::Or) {
            return Ok(first);
        }

        let location = first.location().clone();
        let mut operands = vec![first];
        while self.check(&TokenType::Or) {
            self.advance();
            operands.push(self.parse_and()?);
        }
        Ok(Condition::Logical {
            op: LogicalOp::Or,
            operands,
            location,
        })
    }

    fn parse_and(&mut self) -> Result<Condition> {
        let first = self.parse_not()?;
        if !self.check(&TokenType::And) {
            return Ok(first);
        }

        let location = first.location().clone();
        let mut operands = vec![first];
        while self.check(&TokenType::And) {
            self.advance();
            operands.push(self.parse_not()?);
        }
        Ok(Condition::Logical {
            op: LogicalOp::And,
            operands,
            location,
        })
    }

    fn parse_not(&mut self) -> Result<Condition> {
        if self.check(&TokenType::Not) {
            let location = self.current_location();
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Condition::Not {
                inner: Box::new(inner),
                location,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Condition> {
        // A leading '(' may open either a boolean group or an arithmetic
        // group; try the boolean reading first and backtrack when the
        // parenthesized content was a plain expression.
        if self.check(&TokenType::OpenParen) {
            if let Some(condition) = self.try_parse_paren_condition() {
                return Ok(condition);
            }
        }

        let left = self.parse_additive()?;
        let location = left.location().clone();

        match self.current().token_type.clone() {
            TokenType::Comparison(op) => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Condition::Comparison {
                    left,
                    op,
                    right,
                    location,
                })
            }
            // Bare '=' in condition position is equality, like 'equals'.
            TokenType::Assign => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Condition::Comparison {
                    left,
                    op: ComparisonOp::Eq,
                    right,
                    location,
                })
            }
            TokenType::In => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Condition::Comparison {
                    left,
                    op: ComparisonOp::In,
                    right,
                    location,
                })
            }
            TokenType::NotIn => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Condition::Comparison {
                    left,
                    op: ComparisonOp::NotIn,
                    right,
                    location,
                })
            }
            TokenType::Between => {
                self.advance();
                let low = self.parse_additive()?;
                self.expect(TokenType::And, "'and'")?;
                let high = self.parse_additive()?;
                Ok(Condition::Between {
                    value: left,
                    low,
                    high,
                    location,
                })
            }
            TokenType::Predicate(op) => {
                self.advance();
                Ok(Condition::Predicate {
                    op,
                    operand: left,
                    location,
                })
            }
            // No comparator: promote the expression through truthiness.
            _ => Ok(Condition::Expression {
                expr: left,
                location,
            }),
        }
    }

    /// Attempt `'(' condition ')'`. Returns `None` (with the position
    /// restored) when the parenthesized content was a plain expression, so
    /// the caller can re-parse it as an arithmetic operand.
    fn try_parse_paren_condition(&mut self) -> Option<Condition> {
        let saved_pos = self.pos;
        let saved_depth = self.recursion_depth;
        self.advance(); // Skip '('

        match self.parse_or() {
            Ok(condition) if self.check(&TokenType::CloseParen) => {
                if matches!(condition, Condition::Expression { .. }) {
                    self.pos = saved_pos;
                    self.recursion_depth = saved_depth;
                    None
                } else {
                    self.advance(); // Skip ')'
                    Some(condition)
                }
            }
            _ => {
                self.pos = saved_pos;
                self.recursion_depth = saved_depth;
                None
            }
        }
    }

    // ============================================
    // Expressions
    // ============================================

    fn parse_additive(&mut self) -> Result<Expr> {
        self.enter()?;
        let result = self.parse_additive_inner();
        self.leave();
        result
    }

    fn parse_additive_inner(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current().token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let location = left.location().clone();
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_power()?;

        loop {
            let op = match self.current().token_type {
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Percent => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            let location = left.location().clone();
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }

        Ok(left)
    }

    /// Power is right-associative: 2 ^ 3 ^ 2 is 2 ^ (3 ^ 2)
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_unary()?;

        if self.check(&TokenType::Power) {
            self.advance();
            let exponent = self.parse_power()?;
            let location = base.location().clone();
            return Ok(Expr::Binary {
                op: BinaryOp::Power,
                left: Box::new(base),
                right: Box::new(exponent),
                location,
            });
        }

        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.current().token_type {
            TokenType::Plus => Some(UnaryOp::Plus),
            TokenType::Minus => Some(UnaryOp::Minus),
            _ => None,
        };

        let Some(op) = op else {
            return self.parse_postfix();
        };

        let location = self.current_location();
        self.advance();
        let operand = self.parse_unary()?;

        // Fold a negated number literal so -5 is a literal, not an operation.
        if op == UnaryOp::Minus {
            if let Expr::Literal {
                value: Value::Number(n),
                ..
            } = &operand
            {
                return Ok(Expr::Literal {
                    value: Value::Number(-*n),
                    location,
                });
            }
        }

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            location,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        // Array index: expr '[' index ']' navigates through the JSON path
        // provider with an "[i]" path.
        while self.check(&TokenType::OpenBracket) {
            let location = self.current_location();
            self.advance();
            let index = self.parse_additive()?;
            self.expect(TokenType::CloseBracket, "']'")?;

            let path = match &index {
                Expr::Literal {
                    value: Value::Number(n),
                    ..
                } => Expr::Literal {
                    value: Value::Text(format!("[{}]", n.normalize())),
                    location: location.clone(),
                },
                _ => {
                    // Dynamic index: build the path text at evaluation time.
                    let open = Expr::Literal {
                        value: Value::Text("[".into()),
                        location: location.clone(),
                    };
                    let close = Expr::Literal {
                        value: Value::Text("]".into()),
                        location: location.clone(),
                    };
                    let prefix = Expr::Binary {
                        op: BinaryOp::Add,
                        left: Box::new(open),
                        right: Box::new(index),
                        location: location.clone(),
                    };
                    Expr::Binary {
                        op: BinaryOp::Add,
                        left: Box::new(prefix),
                        right: Box::new(close),
                        location: location.clone(),
                    }
                }
            };

            expr = Expr::JsonPath {
                source: Box::new(expr),
                path: Box::new(path),
                location,
            };
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let location = self.location_of(&token);

        match token.token_type {
            TokenType::IntegerLiteral | TokenType::DecimalLiteral => {
                let value = Decimal::from_str(&token.value).map_err(|e| {
                    Error::expr_parse(
                        ParseErrorKind::InvalidLiteral,
                        format!("invalid number '{}': {}", token.value, e),
                        location.clone(),
                    )
                })?;
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Number(value),
                    location,
                })
            }
            TokenType::StringLiteral => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Text(token.value),
                    location,
                })
            }
            TokenType::BooleanLiteral => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Bool(token.value == "true"),
                    location,
                })
            }
            TokenType::NullLiteral => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Null,
                    location,
                })
            }
            TokenType::JsonBlock => {
                self.advance();
                let value = parse_inline_block(&token.value).ok_or_else(|| {
                    Error::expr_parse(
                        ParseErrorKind::InvalidLiteral,
                        format!("invalid inline block: {}", token.value),
                        location.clone(),
                    )
                })?;
                Ok(Expr::Literal { value, location })
            }
            TokenType::OpenBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenType::CloseBracket) {
                    loop {
                        elements.push(self.parse_additive()?);
                        if self.check(&TokenType::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(TokenType::CloseBracket, "']'")?;
                Ok(Expr::List { elements, location })
            }
            TokenType::OpenParen => {
                self.advance();
                let expr = self.parse_additive()?;
                self.expect(TokenType::CloseParen, "')'")?;
                Ok(expr)
            }
            TokenType::Identifier => {
                self.advance();
                if self.check(&TokenType::OpenParen) {
                    self.parse_call(token.value, location)
                } else {
                    Ok(Expr::Variable {
                        name: token.value,
                        location,
                    })
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Parse a function call argument list and specialize REST / JSON-path
    /// invocations into their dedicated AST nodes.
    fn parse_call(&mut self, name: String, location: SourceLocation) -> Result<Expr> {
        self.advance(); // Skip '('
        let mut args = Vec::new();
        if !self.check(&TokenType::CloseParen) {
            loop {
                args.push(self.parse_additive()?);
                if self.check(&TokenType::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseParen, "')'")?;

        let lowered = name.to_lowercase();
        match lowered.as_str() {
            "rest_get" | "rest_delete" => {
                self.build_rest_call(&lowered[5..].to_uppercase(), args, false, location)
            }
            "rest_post" | "rest_put" | "rest_patch" => {
                self.build_rest_call(&lowered[5..].to_uppercase(), args, true, location)
            }
            "rest_call" => {
                if args.is_empty() {
                    return Err(Error::expr_parse(
                        ParseErrorKind::UnexpectedToken,
                        "rest_call requires a method and a url",
                        location,
                    ));
                }
                let method = match args.remove(0) {
                    Expr::Literal {
                        value: Value::Text(m),
                        ..
                    } => m.to_uppercase(),
                    other => {
                        return Err(Error::expr_parse(
                            ParseErrorKind::UnexpectedToken,
                            "rest_call requires a literal method name",
                            other.location().clone(),
                        ))
                    }
                };
                let has_body = matches!(method.as_str(), "POST" | "PUT" | "PATCH");
                self.build_rest_call(&method, args, has_body, location)
            }
            "json_get" | "json_path" => {
                if args.len() != 2 {
                    return Err(Error::expr_parse(
                        ParseErrorKind::UnexpectedToken,
                        format!("{} requires a source and a path", lowered),
                        location,
                    ));
                }
                let path = args.pop().expect("checked length");
                let source = args.pop().expect("checked length");
                Ok(Expr::JsonPath {
                    source: Box::new(source),
                    path: Box::new(path),
                    location,
                })
            }
            _ => Ok(Expr::FunctionCall {
                name: lowered,
                args,
                location,
            }),
        }
    }

    fn build_rest_call(
        &self,
        method: &str,
        args: Vec<Expr>,
        has_body: bool,
        location: SourceLocation,
    ) -> Result<Expr> {
        let mut args = args.into_iter();
        let Some(url) = args.next() else {
            return Err(Error::expr_parse(
                ParseErrorKind::UnexpectedToken,
                format!("rest_{} requires a url", method.to_lowercase()),
                location,
            ));
        };
        let body = if has_body { args.next().map(Box::new) } else { None };
        Ok(Expr::RestCall {
            method: method.to_string(),
            url: Box::new(url),
            body,
            headers: args.next().map(Box::new),
            timeout: args.next().map(Box::new),
            location,
        })
    }

    // ============================================
    // Actions
    // ============================================

    fn parse_action_item(&mut self) -> Result<Action> {
        let token = self.current().clone();
        let location = self.location_of(&token);

        if token.token_type != TokenType::Identifier {
            return Err(Error::action_parse(
                format!("expected an action keyword, found '{}'", token.value),
                location,
            ));
        }

        // `score += 10` style lines take precedence over keyword dispatch so
        // a computed variable may share its name with an action keyword.
        if let Some(next) = self.tokens.get(self.pos + 1) {
            if matches!(
                next.token_type,
                TokenType::Assign
                    | TokenType::PlusAssign
                    | TokenType::MinusAssign
                    | TokenType::StarAssign
                    | TokenType::SlashAssign
            ) {
                return self.parse_assignment();
            }
        }

        match token.value.as_str() {
            "set" => {
                self.advance();
                let (name, _) = self.expect_identifier("a variable name")?;
                self.expect_word("to")?;
                let expr = self.parse_additive()?;
                Ok(Action::Set {
                    name,
                    expr,
                    location,
                })
            }
            "calculate" => {
                self.advance();
                let (name, _) = self.expect_identifier("a variable name")?;
                self.expect_word("as")?;
                let expr = self.parse_additive()?;
                if let Some(call_location) = expr.contains_call() {
                    return Err(Error::action_parse(
                        "calculate actions allow only arithmetic, variables and literals; use 'run' for function, REST or JSON calls",
                        call_location.clone(),
                    ));
                }
                Ok(Action::Calculate {
                    name,
                    expr,
                    location,
                })
            }
            "run" => {
                self.advance();
                let (name, _) = self.expect_identifier("a variable name")?;
                self.expect_word("as")?;
                let expr = self.parse_additive()?;
                Ok(Action::Run {
                    name,
                    expr,
                    location,
                })
            }
            "call" => {
                self.advance();
                let (name, _) = self.expect_identifier("a function name")?;
                let mut args = Vec::new();
                if self.check_word("with") {
                    self.advance();
                    loop {
                        args.push(self.parse_additive()?);
                        if self.check(&TokenType::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                let result = if self.check_word("into") {
                    self.advance();
                    Some(self.expect_identifier("a result name")?.0)
                } else {
                    None
                };
                Ok(Action::Call {
                    name: name.to_lowercase(),
                    args,
                    result,
                    location,
                })
            }
            "add" => {
                self.advance();
                let operand = self.parse_additive()?;
                self.expect_word("to")?;
                let (target, _) = self.expect_identifier("a variable name")?;
                Ok(Action::Arithmetic {
                    op: ArithmeticOp::Add,
                    target,
                    operand,
                    location,
                })
            }
            "subtract" => {
                self.advance();
                let operand = self.parse_additive()?;
                self.expect_word("from")?;
                let (target, _) = self.expect_identifier("a variable name")?;
                Ok(Action::Arithmetic {
                    op: ArithmeticOp::Subtract,
                    target,
                    operand,
                    location,
                })
            }
            "multiply" | "divide" => {
                let op = if token.value == "multiply" {
                    ArithmeticOp::Multiply
                } else {
                    ArithmeticOp::Divide
                };
                self.advance();
                let (target, _) = self.expect_identifier("a variable name")?;
                self.expect_word("by")?;
                let operand = self.parse_additive()?;
                Ok(Action::Arithmetic {
                    op,
                    target,
                    operand,
                    location,
                })
            }
            "append" | "prepend" => {
                let op = if token.value == "append" {
                    ListOp::Append
                } else {
                    ListOp::Prepend
                };
                self.advance();
                let expr = self.parse_additive()?;
                self.expect_word("to")?;
                let (name, _) = self.expect_identifier("a variable name")?;
                Ok(Action::ListOp {
                    op,
                    name,
                    expr,
                    location,
                })
            }
            "remove" => {
                self.advance();
                let expr = self.parse_additive()?;
                self.expect_word("from")?;
                let (name, _) = self.expect_identifier("a variable name")?;
                Ok(Action::ListOp {
                    op: ListOp::Remove,
                    name,
                    expr,
                    location,
                })
            }
            "if" => {
                self.advance();
                let condition = self.parse_or()?;
                self.expect_word("then")?;
                let then_action = self.parse_action_item()?;
                let else_actions = if self.check_word("else") {
                    self.advance();
                    vec![self.parse_action_item()?]
                } else {
                    Vec::new()
                };
                Ok(Action::Conditional {
                    condition,
                    then_actions: vec![then_action],
                    else_actions,
                    location,
                })
            }
            "forEach" => {
                self.advance();
                let (item, _) = self.expect_identifier("an item name")?;
                let index = if self.check(&TokenType::Comma) {
                    self.advance();
                    Some(self.expect_identifier("an index name")?.0)
                } else {
                    None
                };
                if !self.check(&TokenType::In) {
                    return Err(Error::action_parse(
                        "malformed forEach: expected 'in' after the loop variable",
                        self.current_location(),
                    ));
                }
                self.advance();
                let list = self.parse_additive()?;
                if !self.check(&TokenType::Colon) {
                    return Err(Error::action_parse(
                        "malformed forEach: expected ':' before the loop body",
                        self.current_location(),
                    ));
                }
                self.advance();
                let body = vec![self.parse_action_item()?];
                Ok(Action::ForEach {
                    item,
                    index,
                    list,
                    body,
                    location,
                })
            }
            "circuit_breaker" => {
                self.advance();
                let message = if self.check(&TokenType::Eof) || self.check_word("else") {
                    Expr::Literal {
                        value: Value::Text(String::new()),
                        location: location.clone(),
                    }
                } else {
                    self.parse_additive()?
                };
                Ok(Action::CircuitBreaker { message, location })
            }
            other => Err(Error::action_parse(
                format!("unknown action keyword '{}'", other),
                location,
            )),
        }
    }

    fn parse_assignment(&mut self) -> Result<Action> {
        let (name, location) = self.expect_identifier("a variable name")?;
        let op = match self.current().token_type {
            TokenType::Assign => AssignOp::Assign,
            TokenType::PlusAssign => AssignOp::AddAssign,
            TokenType::MinusAssign => AssignOp::SubAssign,
            TokenType::StarAssign => AssignOp::MulAssign,
            TokenType::SlashAssign => AssignOp::DivAssign,
            _ => return Err(self.unexpected("an assignment operator")),
        };
        self.advance();
        let expr = self.parse_additive()?;
        Ok(Action::Assignment {
            name,
            op,
            expr,
            location,
        })
    }
}

/// Decode an inline `{...}` block: JSON first, YAML flow syntax as fallback.
fn parse_inline_block(raw: &str) -> Option<Value> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) {
        return Some(Value::from_json(json));
    }
    serde_yaml::from_str::<serde_yaml::Value>(raw)
        .ok()
        .map(Value::from_yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_variable() {
        let expr = parse_expression("creditScore").unwrap();
        assert!(matches!(expr, Expr::Variable { ref name, .. } if name == "creditScore"));
    }

    #[test]
    fn test_precedence() {
        // Parses as age + (5 * 2)
        let expr = parse_expression("age + 5 * 2").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Multiply,
                    ..
                }
            )),
            other => panic!("expected additive root, got {:?}", other),
        }
    }

    #[test]
    fn test_power_right_associative() {
        let expr = parse_expression("2 ^ 3 ^ 2").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Power,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Power,
                    ..
                }
            )),
            other => panic!("expected power root, got {:?}", other),
        }
    }

    #[test]
    fn test_double_star_is_power() {
        assert_eq!(
            parse_expression("2 ** 8").unwrap(),
            parse_expression("2 ^ 8").unwrap()
        );
    }

    #[test]
    fn test_parentheses() {
        let expr = parse_expression("(age + 5) * 2").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_negative_literal_folds() {
        let expr = parse_expression("-5").unwrap();
        match expr {
            Expr::Literal {
                value: Value::Number(n),
                ..
            } => assert_eq!(n, Decimal::from(-5)),
            other => panic!("expected folded literal, got {:?}", other),
        }
    }

    #[test]
    fn test_function_call() {
        let expr = parse_expression("max(a, b, 10)").unwrap();
        match expr {
            Expr::FunctionCall { name, args, .. } => {
                assert_eq!(name, "max");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected function call, got {:?}", other),
        }
    }

    #[test]
    fn test_function_names_case_insensitive() {
        let expr = parse_expression("MAX(a, b)").unwrap();
        assert!(matches!(expr, Expr::FunctionCall { ref name, .. } if name == "max"));
    }

    #[test]
    fn test_rest_call_specialization() {
        let expr = parse_expression(r#"rest_get("http://svc/score")"#).unwrap();
        assert!(matches!(expr, Expr::RestCall { ref method, .. } if method == "GET"));

        let expr = parse_expression(r#"rest_post("http://svc", {"a": 1})"#).unwrap();
        match expr {
            Expr::RestCall { method, body, .. } => {
                assert_eq!(method, "POST");
                assert!(body.is_some());
            }
            other => panic!("expected rest call, got {:?}", other),
        }
    }

    #[test]
    fn test_json_get_specialization() {
        let expr = parse_expression(r#"json_get(resp, "body.score")"#).unwrap();
        assert!(matches!(expr, Expr::JsonPath { .. }));
    }

    #[test]
    fn test_array_index_becomes_path() {
        let expr = parse_expression("items[0]").unwrap();
        match expr {
            Expr::JsonPath { path, .. } => match *path {
                Expr::Literal {
                    value: Value::Text(p),
                    ..
                } => assert_eq!(p, "[0]"),
                other => panic!("expected literal path, got {:?}", other),
            },
            other => panic!("expected json path, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_keyword_synonyms() {
        let a = parse_condition("creditScore at_least 650").unwrap();
        let b = parse_condition("creditScore >= 650").unwrap();
        let c = parse_condition("creditScore greater_than_or_equal 650").unwrap();
        match (&a, &b, &c) {
            (
                Condition::Comparison { op: op_a, .. },
                Condition::Comparison { op: op_b, .. },
                Condition::Comparison { op: op_c, .. },
            ) => {
                assert_eq!(*op_a, ComparisonOp::Ge);
                assert_eq!(*op_b, ComparisonOp::Ge);
                assert_eq!(*op_c, ComparisonOp::Ge);
            }
            _ => panic!("expected comparisons"),
        }
    }

    #[test]
    fn test_bare_equals_condition() {
        let cond = parse_condition("creditScore = 700").unwrap();
        match cond {
            Condition::Comparison {
                op: ComparisonOp::Eq,
                right,
                ..
            } => assert!(matches!(right, Expr::Literal { .. })),
            other => panic!("expected equality comparison, got {:?}", other),
        }
        // '=' canonicalizes to the same form as '==' and 'equals'.
        assert_eq!(
            parse_condition("creditScore = 700").unwrap().to_string(),
            parse_condition("creditScore == 700").unwrap().to_string()
        );
        assert_eq!(
            parse_condition(r#"status = "ACTIVE""#).unwrap().to_string(),
            parse_condition(r#"status equals "ACTIVE""#).unwrap().to_string()
        );
    }

    #[test]
    fn test_and_or_conditions() {
        let cond = parse_condition("a > 1 and b > 2 and c > 3").unwrap();
        match cond {
            Condition::Logical { op, operands, .. } => {
                assert_eq!(op, LogicalOp::And);
                assert_eq!(operands.len(), 3);
            }
            other => panic!("expected logical, got {:?}", other),
        }

        // or binds looser than and
        let cond = parse_condition("a > 1 or b > 2 and c > 3").unwrap();
        match cond {
            Condition::Logical { op, operands, .. } => {
                assert_eq!(op, LogicalOp::Or);
                assert_eq!(operands.len(), 2);
                assert!(matches!(
                    operands[1],
                    Condition::Logical {
                        op: LogicalOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected logical, got {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_condition() {
        let cond = parse_condition("(a > 1 or b > 2) and c > 3").unwrap();
        match cond {
            Condition::Logical { op, operands, .. } => {
                assert_eq!(op, LogicalOp::And);
                assert!(matches!(
                    operands[0],
                    Condition::Logical {
                        op: LogicalOp::Or,
                        ..
                    }
                ));
            }
            other => panic!("expected logical, got {:?}", other),
        }
    }

    #[test]
    fn test_between() {
        let cond = parse_condition("score between 300 and 850").unwrap();
        assert!(matches!(cond, Condition::Between { .. }));
    }

    #[test]
    fn test_in_list() {
        let cond = parse_condition(r#"status in ["ACTIVE", "PENDING"]"#).unwrap();
        match cond {
            Condition::Comparison {
                op: ComparisonOp::In,
                right,
                ..
            } => assert!(matches!(right, Expr::List { .. })),
            other => panic!("expected membership, got {:?}", other),
        }
    }

    #[test]
    fn test_predicate_condition() {
        let cond = parse_condition("ssn is_ssn").unwrap();
        assert!(matches!(
            cond,
            Condition::Predicate {
                op: PredicateOp::IsSsn,
                ..
            }
        ));
    }

    #[test]
    fn test_expression_promoted_to_condition() {
        let cond = parse_condition("approved").unwrap();
        assert!(matches!(cond, Condition::Expression { .. }));
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        let cond = parse_condition("not score > 90").unwrap();
        match cond {
            Condition::Not { inner, .. } => {
                assert!(matches!(*inner, Condition::Comparison { .. }))
            }
            other => panic!("expected not, got {:?}", other),
        }
    }

    #[test]
    fn test_action_set() {
        let action = parse_action(r#"set approval_status to "APPROVED""#).unwrap();
        match action {
            Action::Set { name, expr, .. } => {
                assert_eq!(name, "approval_status");
                assert!(matches!(expr, Expr::Literal { .. }));
            }
            other => panic!("expected set, got {:?}", other),
        }
    }

    #[test]
    fn test_action_calculate_rejects_calls() {
        let err = parse_action("calculate x as max(a, b)").unwrap_err();
        assert!(matches!(err, Error::ActionParse { .. }));
        let err = parse_action(r#"calculate x as rest_get("http://x")"#).unwrap_err();
        assert!(matches!(err, Error::ActionParse { .. }));
        // Nested calls are rejected too.
        let err = parse_action("calculate x as 1 + abs(a)").unwrap_err();
        assert!(matches!(err, Error::ActionParse { .. }));
    }

    #[test]
    fn test_action_run_permits_calls() {
        let action = parse_action(r#"run score as json_get(resp, "body.score")"#).unwrap();
        assert!(matches!(action, Action::Run { .. }));
    }

    #[test]
    fn test_action_natural_arithmetic() {
        let action = parse_action("add bonus to total_score").unwrap();
        assert!(matches!(
            action,
            Action::Arithmetic {
                op: ArithmeticOp::Add,
                ..
            }
        ));
        let action = parse_action("subtract fee from balance").unwrap();
        assert!(matches!(
            action,
            Action::Arithmetic {
                op: ArithmeticOp::Subtract,
                ..
            }
        ));
        let action = parse_action("multiply rate by 1.05").unwrap();
        assert!(matches!(
            action,
            Action::Arithmetic {
                op: ArithmeticOp::Multiply,
                ..
            }
        ));
        let action = parse_action("divide total by 12").unwrap();
        assert!(matches!(
            action,
            Action::Arithmetic {
                op: ArithmeticOp::Divide,
                ..
            }
        ));
    }

    #[test]
    fn test_action_compound_assignment() {
        let action = parse_action("score += 10").unwrap();
        match action {
            Action::Assignment { name, op, .. } => {
                assert_eq!(name, "score");
                assert_eq!(op, AssignOp::AddAssign);
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_action_conditional() {
        let action =
            parse_action(r#"if riskScore greater_than 90 then circuit_breaker "HIGH_RISK""#)
                .unwrap();
        match action {
            Action::Conditional {
                then_actions,
                else_actions,
                ..
            } => {
                assert_eq!(then_actions.len(), 1);
                assert!(matches!(then_actions[0], Action::CircuitBreaker { .. }));
                assert!(else_actions.is_empty());
            }
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_action_conditional_with_else() {
        let action =
            parse_action(r#"if ok then set status to "PASS" else set status to "FAIL""#).unwrap();
        match action {
            Action::Conditional { else_actions, .. } => assert_eq!(else_actions.len(), 1),
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_action_for_each() {
        let action = parse_action("forEach n in numbers: calculate total as total + n").unwrap();
        match action {
            Action::ForEach {
                item, index, body, ..
            } => {
                assert_eq!(item, "n");
                assert!(index.is_none());
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected forEach, got {:?}", other),
        }

        let action = parse_action("forEach n, i in numbers: set last_index to i").unwrap();
        match action {
            Action::ForEach { index, .. } => assert_eq!(index.as_deref(), Some("i")),
            other => panic!("expected forEach, got {:?}", other),
        }
    }

    #[test]
    fn test_action_list_ops() {
        assert!(matches!(
            parse_action("append score to history").unwrap(),
            Action::ListOp {
                op: ListOp::Append,
                ..
            }
        ));
        assert!(matches!(
            parse_action("prepend score to history").unwrap(),
            Action::ListOp {
                op: ListOp::Prepend,
                ..
            }
        ));
        assert!(matches!(
            parse_action(r#"remove "STALE" from flags"#).unwrap(),
            Action::ListOp {
                op: ListOp::Remove,
                ..
            }
        ));
    }

    #[test]
    fn test_action_call_with_result() {
        let action =
            parse_action("call calculate_loan_payment with principal, rate, term into payment")
                .unwrap();
        match action {
            Action::Call {
                name, args, result, ..
            } => {
                assert_eq!(name, "calculate_loan_payment");
                assert_eq!(args.len(), 3);
                assert_eq!(result.as_deref(), Some("payment"));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_keyword() {
        let err = parse_action("frobnicate x to 1").unwrap_err();
        assert!(matches!(err, Error::ActionParse { .. }));
    }

    #[test]
    fn test_malformed_for_each() {
        let err = parse_action("forEach n numbers: set x to 1").unwrap_err();
        assert!(matches!(err, Error::ActionParse { .. }));
    }

    #[test]
    fn test_parse_error_carries_location() {
        let err = parse_expression("a + ").unwrap_err();
        match err {
            Error::ExprParse { location, .. } => {
                assert_eq!(location.line, 1);
                assert!(location.snippet.is_some());
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_rparen_category() {
        let err = parse_expression("(a + b").unwrap_err();
        match err {
            Error::ExprParse { kind, .. } => assert_eq!(kind, ParseErrorKind::MissingRParen),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_display_round_trips() {
        for source in [
            "a + b * c",
            "(a + b) * c",
            "2 ^ 3 ^ 2",
            "a - b - c",
            "max(a, 10) + 1",
            r#"name starts_with "Dr""#,
            "score between 300 and 850",
            "a > 1 and (b > 2 or c > 3)",
            "not approved",
            r#"status in ["A", "B"]"#,
        ] {
            if let Ok(cond) = parse_condition(source) {
                let printed = cond.to_string();
                let reparsed = parse_condition(&printed).unwrap();
                assert_eq!(
                    printed,
                    reparsed.to_string(),
                    "round trip failed for {}",
                    source
                );
            }
        }
    }
}
