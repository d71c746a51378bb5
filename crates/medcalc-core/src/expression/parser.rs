//! Parser for substituted formula expressions
//!
//! Implements a recursive descent parser over a closed token set. Precedence, low to
//! high: `+ -`, `* /`, `**` (right-associative), unary `- +`, parentheses, literals.
//! Nesting (parentheses, unary chains and power chains) is bounded by
//! [`EvaluationLimits::max_expression_depth`], so hostile input is rejected instead of
//! exhausting the stack. Flat `+ - * /` chains are parsed in a loop and do not count.

use crate::error::EvaluationError;
use crate::expression::EvaluationLimits;
use crate::expression::ast::{BinaryOperator, Expression, UnaryOperator};
use std::fmt;

type Result<T> = std::result::Result<T, EvaluationError>;

/// Token types recognized by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),

    Plus,
    Minus,
    Star,
    Slash,
    Power,

    LeftParen,
    RightParen,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Power => write!(f, "**"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Eof => write!(f, "end of expression"),
        }
    }
}

/// Lexer for tokenizing arithmetic expressions
pub struct Lexer<'a> {
    source: &'a str,
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let input: Vec<char> = source.chars().collect();
        let current_char = input.first().copied();

        Self { source, input, position: 0, current_char, token_start: 0 }
    }

    /// Character offset where the most recently returned token starts
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, position: usize, message: impl Into<String>) -> EvaluationError {
        EvaluationError::syntax(self.source, position, message)
    }

    fn read_digits(&mut self, number: &mut String) -> bool {
        let mut any = false;
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
                any = true;
            } else {
                break;
            }
        }
        any
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.position;
        let mut number = String::new();

        let mut has_digits = self.read_digits(&mut number);
        if self.current_char == Some('.') {
            number.push('.');
            self.advance();
            has_digits |= self.read_digits(&mut number);
        }
        if !has_digits {
            return Err(self.error(start, "expected digits in numeric literal"));
        }

        // Exponent only when followed by digits, optionally signed
        if matches!(self.current_char, Some('e' | 'E')) {
            let signed = matches!(self.peek(), Some('+' | '-'));
            let digit_offset = if signed { 2 } else { 1 };
            if self.peek_at(digit_offset).is_some_and(|c| c.is_ascii_digit()) {
                number.push('e');
                self.advance();
                if signed {
                    if let Some(sign) = self.current_char {
                        number.push(sign);
                    }
                    self.advance();
                }
                self.read_digits(&mut number);
            }
        }

        let value = number
            .parse::<f64>()
            .map_err(|e| self.error(start, format!("invalid number '{}': {}", number, e)))?;
        if !value.is_finite() {
            return Err(self.error(start, format!("numeric literal '{}' is out of range", number)));
        }
        Ok(Token::Number(value))
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        self.token_start = self.position;

        match self.current_char {
            None => Ok(Token::Eof),
            Some(ch) => match ch {
                '0'..='9' | '.' => self.read_number(),
                '+' => {
                    self.advance();
                    Ok(Token::Plus)
                }
                '-' => {
                    self.advance();
                    Ok(Token::Minus)
                }
                '*' => {
                    if self.peek() == Some('*') {
                        self.advance();
                        self.advance();
                        Ok(Token::Power)
                    } else {
                        self.advance();
                        Ok(Token::Star)
                    }
                }
                '/' => {
                    self.advance();
                    Ok(Token::Slash)
                }
                '(' => {
                    self.advance();
                    Ok(Token::LeftParen)
                }
                ')' => {
                    self.advance();
                    Ok(Token::RightParen)
                }
                '{' => Err(self.error(self.position, "unresolved placeholder")),
                c if c.is_alphabetic() || c == '_' => {
                    let start = self.position;
                    let word = self.read_word();
                    Err(self.error(
                        start,
                        format!("identifiers are not allowed in formulas (found '{}')", word),
                    ))
                }
                _ => Err(self.error(self.position, format!("unexpected character '{}'", ch))),
            },
        }
    }
}

/// Parser for arithmetic expressions
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
    token_position: usize,
    limits: EvaluationLimits,
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>, limits: EvaluationLimits) -> Result<Self> {
        let current_token = lexer.next_token()?;
        let token_position = lexer.token_start();
        Ok(Self { lexer, current_token, token_position, limits, nesting: 0 })
    }

    fn advance(&mut self) -> Result<()> {
        self.current_token = self.lexer.next_token()?;
        self.token_position = self.lexer.token_start();
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> EvaluationError {
        EvaluationError::syntax(self.lexer.source, self.token_position, message)
    }

    fn enter(&mut self) -> Result<()> {
        self.nesting += 1;
        if self.nesting > self.limits.max_expression_depth {
            return Err(self.error(format!(
                "expression nesting exceeds the maximum depth of {}",
                self.limits.max_expression_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    /// Parse a complete expression, requiring that every token is consumed
    pub fn parse(mut self) -> Result<Expression> {
        if self.current_token == Token::Eof {
            return Err(self.error("empty expression"));
        }

        let tree = self.parse_additive_expression()?;

        match self.current_token {
            Token::Eof => Ok(tree),
            Token::RightParen => Err(self.error("unbalanced ')'")),
            ref token => Err(self.error(format!("unexpected token '{}' after expression", token))),
        }
    }

    fn parse_additive_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative_expression()?;

        while matches!(self.current_token, Token::Plus | Token::Minus) {
            let op = match self.current_token {
                Token::Plus => BinaryOperator::Add,
                _ => BinaryOperator::Subtract,
            };
            self.advance()?;
            let right = self.parse_multiplicative_expression()?;
            left = Expression::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_power_expression()?;

        while matches!(self.current_token, Token::Star | Token::Slash) {
            let op = match self.current_token {
                Token::Star => BinaryOperator::Multiply,
                _ => BinaryOperator::Divide,
            };
            self.advance()?;
            let right = self.parse_power_expression()?;
            left = Expression::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_power_expression(&mut self) -> Result<Expression> {
        let base = self.parse_unary_expression()?;

        // Power is right-associative
        if matches!(self.current_token, Token::Power) {
            self.advance()?;
            self.enter()?;
            let exponent = self.parse_power_expression();
            self.leave();
            return Ok(Expression::binary(base, BinaryOperator::Power, exponent?));
        }

        Ok(base)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression> {
        let operator = match self.current_token {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
            _ => return self.parse_primary_expression(),
        };

        self.advance()?;
        self.enter()?;
        let operand = self.parse_unary_expression();
        self.leave();
        Ok(Expression::unary(operator, operand?))
    }

    fn parse_primary_expression(&mut self) -> Result<Expression> {
        match self.current_token {
            Token::Number(value) => {
                self.advance()?;
                Ok(Expression::number(value))
            }
            Token::LeftParen => {
                let open = self.token_position;
                self.advance()?;
                self.enter()?;
                let inner = self.parse_additive_expression();
                self.leave();
                let inner = inner?;

                if self.current_token != Token::RightParen {
                    return Err(self.error(format!(
                        "expected ')' to close '(' at position {}, found {}",
                        open, self.current_token
                    )));
                }
                self.advance()?;
                Ok(inner)
            }
            Token::RightParen => Err(self.error("unexpected ')'")),
            Token::Eof => Err(self.error("unexpected end of expression")),
            ref token => Err(self.error(format!("unexpected token '{}'", token))),
        }
    }
}

/// Parse an expression string into an AST
pub fn parse_expression(input: &str, limits: EvaluationLimits) -> Result<Expression> {
    let length = input.chars().count();
    if length > limits.max_expression_length {
        return Err(EvaluationError::syntax(
            input,
            limits.max_expression_length,
            format!(
                "expression length {} exceeds the maximum of {}",
                length, limits.max_expression_length
            ),
        ));
    }

    let lexer = Lexer::new(input);
    Parser::new(lexer, limits)?.parse()
}
