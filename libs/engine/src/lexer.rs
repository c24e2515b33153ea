//! Expression lexer - tokenizes condition, expression and action strings
//!
//! Converts a source line into a stream of tokens. Keyword operators
//! (`at_least`, `is_credit_score`, ...) are resolved here so the parser only
//! ever sees canonical operators.

use crate::ast::{ComparisonOp, PredicateOp};
use crate::token::{Token, TokenType};

/// The expression lexer
pub struct Lexer {
    position: usize,
    line: usize,
    column: usize,
    chars: Vec<char>,
    current_char: Option<char>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            position: 0,
            line: 1,
            column: 1,
            chars,
            current_char,
        }
    }

    /// Tokenize the whole input, ending with an Eof token
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Self::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.token_type == TokenType::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(c) = self.current_char {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip comments (both // and /* */)
    fn skip_comment(&mut self) -> Result<(), String> {
        if self.current_char == Some('/') && self.peek() == Some('/') {
            while let Some(c) = self.current_char {
                if c == '\n' {
                    self.advance();
                    break;
                }
                self.advance();
            }
            Ok(())
        } else if self.current_char == Some('/') && self.peek() == Some('*') {
            self.advance(); // Skip '/'
            self.advance(); // Skip '*'

            while let Some(c) = self.current_char {
                if c == '*' && self.peek() == Some('/') {
                    self.advance(); // Skip '*'
                    self.advance(); // Skip '/'
                    return Ok(());
                }
                self.advance();
            }
            Err("Unterminated block comment".into())
        } else {
            Ok(())
        }
    }

    /// Read an identifier
    fn read_identifier(&mut self) -> String {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        self.chars[start_pos..self.position].iter().collect()
    }

    /// Read a string literal: "string" with backslash escapes
    fn read_string(&mut self) -> Result<String, String> {
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(c) = self.current_char {
            if c == '"' {
                self.advance(); // Skip closing quote
                return Ok(value);
            } else if c == '\\' {
                self.advance(); // Skip backslash
                let Some(escaped) = self.current_char else {
                    return Err("Incomplete escape sequence in string literal".into());
                };
                match escaped {
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    '/' => value.push('/'),
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    'u' => {
                        // Unicode escape: \uXXXX
                        self.advance(); // Skip 'u'
                        let mut hex = String::new();
                        for _ in 0..4 {
                            match self.current_char {
                                Some(h) if h.is_ascii_hexdigit() => {
                                    hex.push(h);
                                    self.advance();
                                }
                                _ => return Err("Invalid unicode escape sequence".into()),
                            }
                        }
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| "Invalid unicode code point".to_string())?;
                        value.push(
                            char::from_u32(code).ok_or_else(|| "Invalid unicode character".to_string())?,
                        );
                        continue; // Don't advance again after unicode sequence
                    }
                    other => value.push(other),
                }
                self.advance();
            } else {
                value.push(c);
                self.advance();
            }
        }

        Err("Unterminated string literal".into())
    }

    /// Read a number, returning the text and whether it carries a decimal part
    fn read_number(&mut self) -> (String, bool) {
        let start_pos = self.position;
        let mut has_decimal = false;

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Decimal part only when digits follow the dot
        if self.current_char == Some('.') && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            has_decimal = true;
            self.advance(); // Skip '.'
            while let Some(c) = self.current_char {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let value: String = self.chars[start_pos..self.position].iter().collect();
        (value, has_decimal)
    }

    /// Read a balanced `{...}` block as raw text. The block is handed to the
    /// parser, which decodes it with embedded JSON/YAML parsing.
    fn read_json_block(&mut self) -> Result<String, String> {
        let start_pos = self.position;
        let mut depth = 0usize;

        while let Some(c) = self.current_char {
            match c {
                '{' => {
                    depth += 1;
                    self.advance();
                }
                '}' => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return Ok(self.chars[start_pos..self.position].iter().collect());
                    }
                }
                '"' => {
                    // Skip over embedded strings so braces inside them don't count
                    self.advance();
                    while let Some(sc) = self.current_char {
                        if sc == '\\' {
                            self.advance();
                            self.advance();
                        } else if sc == '"' {
                            self.advance();
                            break;
                        } else {
                            self.advance();
                        }
                    }
                }
                _ => self.advance(),
            }
        }

        Err("Unterminated inline block".into())
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        // Skip whitespace and comments
        loop {
            self.skip_whitespace();
            if self.current_char == Some('/')
                && (self.peek() == Some('/') || self.peek() == Some('*'))
            {
                if let Err(message) = self.skip_comment() {
                    return Token::error(message, self.line, self.column);
                }
            } else {
                break;
            }
        }

        let line = self.line;
        let column = self.column;

        let Some(c) = self.current_char else {
            return Token::eof(line, column);
        };

        match c {
            '(' => {
                self.advance();
                Token::new(TokenType::OpenParen, "(".into(), line, column)
            }
            ')' => {
                self.advance();
                Token::new(TokenType::CloseParen, ")".into(), line, column)
            }
            '[' => {
                self.advance();
                Token::new(TokenType::OpenBracket, "[".into(), line, column)
            }
            ']' => {
                self.advance();
                Token::new(TokenType::CloseBracket, "]".into(), line, column)
            }
            ',' => {
                self.advance();
                Token::new(TokenType::Comma, ",".into(), line, column)
            }
            ':' => {
                self.advance();
                Token::new(TokenType::Colon, ":".into(), line, column)
            }
            '+' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenType::PlusAssign, "+=".into(), line, column)
                } else {
                    Token::new(TokenType::Plus, "+".into(), line, column)
                }
            }
            '-' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenType::MinusAssign, "-=".into(), line, column)
                } else {
                    Token::new(TokenType::Minus, "-".into(), line, column)
                }
            }
            '*' => {
                self.advance();
                if self.current_char == Some('*') {
                    self.advance();
                    Token::new(TokenType::Power, "**".into(), line, column)
                } else if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenType::StarAssign, "*=".into(), line, column)
                } else {
                    Token::new(TokenType::Star, "*".into(), line, column)
                }
            }
            '/' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenType::SlashAssign, "/=".into(), line, column)
                } else {
                    Token::new(TokenType::Slash, "/".into(), line, column)
                }
            }
            '%' => {
                self.advance();
                Token::new(TokenType::Percent, "%".into(), line, column)
            }
            '^' => {
                self.advance();
                Token::new(TokenType::Power, "^".into(), line, column)
            }
            '<' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenType::Comparison(ComparisonOp::Le), "<=".into(), line, column)
                } else {
                    Token::new(TokenType::Comparison(ComparisonOp::Lt), "<".into(), line, column)
                }
            }
            '>' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenType::Comparison(ComparisonOp::Ge), ">=".into(), line, column)
                } else {
                    Token::new(TokenType::Comparison(ComparisonOp::Gt), ">".into(), line, column)
                }
            }
            '=' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenType::Comparison(ComparisonOp::Eq), "==".into(), line, column)
                } else {
                    Token::new(TokenType::Assign, "=".into(), line, column)
                }
            }
            '!' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenType::Comparison(ComparisonOp::Ne), "!=".into(), line, column)
                } else {
                    Token::new(TokenType::Not, "!".into(), line, column)
                }
            }
            '"' => match self.read_string() {
                Ok(value) => Token::new(TokenType::StringLiteral, value, line, column),
                Err(message) => Token::error(message, line, column),
            },
            '{' => match self.read_json_block() {
                Ok(raw) => Token::new(TokenType::JsonBlock, raw, line, column),
                Err(message) => Token::error(message, line, column),
            },
            _ => {
                if c.is_ascii_digit() {
                    let (value, has_decimal) = self.read_number();
                    let token_type = if has_decimal {
                        TokenType::DecimalLiteral
                    } else {
                        TokenType::IntegerLiteral
                    };
                    Token::new(token_type, value, line, column)
                } else if c.is_alphabetic() || c == '_' {
                    let ident = self.read_identifier();
                    let token_type = keyword_token_type(&ident);
                    Token::new(token_type, ident, line, column)
                } else {
                    Token::error(format!("Unexpected character: {}", c), line, column)
                }
            }
        }
    }
}

/// Resolve keyword operators; anything unrecognized is a plain identifier.
fn keyword_token_type(ident: &str) -> TokenType {
    match ident {
        "true" | "false" => TokenType::BooleanLiteral,
        "null" => TokenType::NullLiteral,
        "and" => TokenType::And,
        "or" => TokenType::Or,
        "not" => TokenType::Not,
        "in" | "in_list" => TokenType::In,
        "not_in" => TokenType::NotIn,
        "between" => TokenType::Between,
        "contains" => TokenType::Comparison(ComparisonOp::Contains),
        "starts_with" => TokenType::Comparison(ComparisonOp::StartsWith),
        "ends_with" => TokenType::Comparison(ComparisonOp::EndsWith),
        "matches" => TokenType::Comparison(ComparisonOp::Matches),
        "equals" => TokenType::Comparison(ComparisonOp::Eq),
        "at_least" | "greater_than_or_equal" => TokenType::Comparison(ComparisonOp::Ge),
        "at_most" | "less_than_or_equal" => TokenType::Comparison(ComparisonOp::Le),
        "greater_than" => TokenType::Comparison(ComparisonOp::Gt),
        "less_than" => TokenType::Comparison(ComparisonOp::Lt),
        "age_at_least" => TokenType::Comparison(ComparisonOp::AgeAtLeast),
        "age_meets_requirement" => TokenType::Comparison(ComparisonOp::AgeMeetsRequirement),
        "is_null" => TokenType::Predicate(PredicateOp::IsNull),
        "is_not_null" => TokenType::Predicate(PredicateOp::IsNotNull),
        "is_empty" => TokenType::Predicate(PredicateOp::IsEmpty),
        "is_not_empty" => TokenType::Predicate(PredicateOp::IsNotEmpty),
        "is_numeric" => TokenType::Predicate(PredicateOp::IsNumeric),
        "is_positive" => TokenType::Predicate(PredicateOp::IsPositive),
        "is_negative" => TokenType::Predicate(PredicateOp::IsNegative),
        "is_email" => TokenType::Predicate(PredicateOp::IsEmail),
        "is_credit_score" => TokenType::Predicate(PredicateOp::IsCreditScore),
        "is_ssn" => TokenType::Predicate(PredicateOp::IsSsn),
        "is_account_number" => TokenType::Predicate(PredicateOp::IsAccountNumber),
        "is_routing_number" => TokenType::Predicate(PredicateOp::IsRoutingNumber),
        "is_business_day" => TokenType::Predicate(PredicateOp::IsBusinessDay),
        _ => TokenType::Identifier,
    }
}
