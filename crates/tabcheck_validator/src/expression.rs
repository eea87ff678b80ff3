//! Small boolean expression language for the row-constraint check.
//!
//! Supports literals (numbers, quoted strings), row field names as
//! identifiers, arithmetic (`+ - * / %`), comparisons
//! (`== != < <= > >=`), boolean `and`/`or`/`not` and parentheses. The
//! evaluator is a plain recursive-descent interpreter with no access to
//! anything but the provided bindings, so untrusted constraint expressions
//! cannot reach the host.

use std::collections::HashMap;
use tabcheck_core::Value;
use thiserror::Error;

/// Expression parse/evaluation failure.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("Unexpected character '{0}' in expression")]
    UnexpectedChar(char),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unexpected token \"{0}\"")]
    UnexpectedToken(String),

    #[error("Unknown field \"{0}\"")]
    UnknownField(String),

    #[error("Cannot apply \"{operator}\" to {left} and {right}")]
    TypeMismatch {
        operator: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,
}

/// Evaluates an expression against one row's named cells, coercing the
/// result to a boolean.
pub fn evaluate(expression: &str, bindings: &HashMap<String, Value>) -> Result<bool, EvalError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        bindings,
    };
    let result = parser.or_expr()?;
    match parser.peek() {
        None => Ok(result.truthy()),
        Some(token) => Err(EvalError::UnexpectedToken(token.render())),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    Operator(&'static str),
    OpenParen,
    CloseParen,
}

impl Token {
    fn render(&self) -> String {
        match self {
            Token::Number(number) => number.to_string(),
            Token::Text(text) => format!("\"{text}\""),
            Token::Ident(name) => name.clone(),
            Token::Operator(op) => (*op).to_string(),
            Token::OpenParen => "(".to_string(),
            Token::CloseParen => ")".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Evaluated {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Evaluated {
    fn truthy(&self) -> bool {
        match self {
            Evaluated::Null => false,
            Evaluated::Bool(flag) => *flag,
            Evaluated::Number(number) => *number != 0.0,
            Evaluated::Text(text) => !text.is_empty(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Evaluated::Null => "null",
            Evaluated::Bool(_) => "boolean",
            Evaluated::Number(_) => "number",
            Evaluated::Text(_) => "string",
        }
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expression.chars().collect();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        match ch {
            ' ' | '\t' | '\n' | '\r' => index += 1,
            '(' => {
                tokens.push(Token::OpenParen);
                index += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen);
                index += 1;
            }
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Operator(match ch {
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    '/' => "/",
                    _ => "%",
                }));
                index += 1;
            }
            '=' | '!' | '<' | '>' => {
                let next = chars.get(index + 1).copied();
                let (operator, width) = match (ch, next) {
                    ('=', Some('=')) => ("==", 2),
                    ('!', Some('=')) => ("!=", 2),
                    ('<', Some('=')) => ("<=", 2),
                    ('>', Some('=')) => (">=", 2),
                    ('<', _) => ("<", 1),
                    ('>', _) => (">", 1),
                    _ => return Err(EvalError::UnexpectedChar(ch)),
                };
                tokens.push(Token::Operator(operator));
                index += width;
            }
            '\'' | '"' => {
                let quote = ch;
                let mut text = String::new();
                index += 1;
                loop {
                    match chars.get(index) {
                        None => return Err(EvalError::UnexpectedEnd),
                        Some(inner) if *inner == quote => {
                            index += 1;
                            break;
                        }
                        Some(inner) => {
                            text.push(*inner);
                            index += 1;
                        }
                    }
                }
                tokens.push(Token::Text(text));
            }
            _ if ch.is_ascii_digit() => {
                let start = index;
                while index < chars.len()
                    && (chars[index].is_ascii_digit() || chars[index] == '.')
                {
                    index += 1;
                }
                let literal: String = chars[start..index].iter().collect();
                let number = literal
                    .parse()
                    .map_err(|_| EvalError::UnexpectedToken(literal.clone()))?;
                tokens.push(Token::Number(number));
            }
            _ if ch.is_alphabetic() || ch == '_' => {
                let start = index;
                while index < chars.len()
                    && (chars[index].is_alphanumeric() || chars[index] == '_')
                {
                    index += 1;
                }
                let word: String = chars[start..index].iter().collect();
                match word.as_str() {
                    "and" | "or" | "not" => tokens.push(Token::Operator(match word.as_str() {
                        "and" => "and",
                        "or" => "or",
                        _ => "not",
                    })),
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            _ => return Err(EvalError::UnexpectedChar(ch)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    cursor: usize,
    bindings: &'a HashMap<String, Value>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn eat_operator(&mut self, candidates: &[&str]) -> Option<&'static str> {
        if let Some(Token::Operator(op)) = self.peek()
            && candidates.contains(op)
        {
            let op = *op;
            self.cursor += 1;
            return Some(op);
        }
        None
    }

    fn or_expr(&mut self) -> Result<Evaluated, EvalError> {
        let mut left = self.and_expr()?;
        while self.eat_operator(&["or"]).is_some() {
            let right = self.and_expr()?;
            left = Evaluated::Bool(left.truthy() || right.truthy());
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Evaluated, EvalError> {
        let mut left = self.not_expr()?;
        while self.eat_operator(&["and"]).is_some() {
            let right = self.not_expr()?;
            left = Evaluated::Bool(left.truthy() && right.truthy());
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Evaluated, EvalError> {
        if self.eat_operator(&["not"]).is_some() {
            let operand = self.not_expr()?;
            return Ok(Evaluated::Bool(!operand.truthy()));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Evaluated, EvalError> {
        let left = self.sum()?;
        let Some(operator) = self.eat_operator(&["==", "!=", "<", "<=", ">", ">="]) else {
            return Ok(left);
        };
        let right = self.sum()?;

        let verdict = match operator {
            "==" => left == right,
            "!=" => left != right,
            _ => {
                let ordering = match (&left, &right) {
                    (Evaluated::Number(a), Evaluated::Number(b)) => a.partial_cmp(b),
                    (Evaluated::Text(a), Evaluated::Text(b)) => Some(a.cmp(b)),
                    _ => {
                        return Err(EvalError::TypeMismatch {
                            operator: operator.to_string(),
                            left: left.type_name(),
                            right: right.type_name(),
                        });
                    }
                };
                match (operator, ordering) {
                    ("<", Some(ordering)) => ordering.is_lt(),
                    ("<=", Some(ordering)) => ordering.is_le(),
                    (">", Some(ordering)) => ordering.is_gt(),
                    (">=", Some(ordering)) => ordering.is_ge(),
                    _ => false,
                }
            }
        };
        Ok(Evaluated::Bool(verdict))
    }

    fn sum(&mut self) -> Result<Evaluated, EvalError> {
        let mut left = self.term()?;
        while let Some(operator) = self.eat_operator(&["+", "-"]) {
            let right = self.term()?;
            left = match (operator, left, right) {
                ("+", Evaluated::Number(a), Evaluated::Number(b)) => Evaluated::Number(a + b),
                ("+", Evaluated::Text(a), Evaluated::Text(b)) => Evaluated::Text(a + &b),
                ("-", Evaluated::Number(a), Evaluated::Number(b)) => Evaluated::Number(a - b),
                (_, left, right) => {
                    return Err(EvalError::TypeMismatch {
                        operator: operator.to_string(),
                        left: left.type_name(),
                        right: right.type_name(),
                    });
                }
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Evaluated, EvalError> {
        let mut left = self.factor()?;
        while let Some(operator) = self.eat_operator(&["*", "/", "%"]) {
            let right = self.factor()?;
            left = match (left, right) {
                (Evaluated::Number(a), Evaluated::Number(b)) => {
                    if (operator == "/" || operator == "%") && b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    Evaluated::Number(match operator {
                        "*" => a * b,
                        "/" => a / b,
                        _ => a % b,
                    })
                }
                (left, right) => {
                    return Err(EvalError::TypeMismatch {
                        operator: operator.to_string(),
                        left: left.type_name(),
                        right: right.type_name(),
                    });
                }
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Evaluated, EvalError> {
        if self.eat_operator(&["-"]).is_some() {
            return match self.factor()? {
                Evaluated::Number(number) => Ok(Evaluated::Number(-number)),
                other => Err(EvalError::TypeMismatch {
                    operator: "-".to_string(),
                    left: "number",
                    right: other.type_name(),
                }),
            };
        }

        match self.peek().cloned() {
            None => Err(EvalError::UnexpectedEnd),
            Some(Token::Number(number)) => {
                self.cursor += 1;
                Ok(Evaluated::Number(number))
            }
            Some(Token::Text(text)) => {
                self.cursor += 1;
                Ok(Evaluated::Text(text))
            }
            Some(Token::Ident(name)) => {
                self.cursor += 1;
                let value = self
                    .bindings
                    .get(&name)
                    .ok_or(EvalError::UnknownField(name))?;
                Ok(bind(value))
            }
            Some(Token::OpenParen) => {
                self.cursor += 1;
                let inner = self.or_expr()?;
                match self.peek() {
                    Some(Token::CloseParen) => {
                        self.cursor += 1;
                        Ok(inner)
                    }
                    Some(token) => Err(EvalError::UnexpectedToken(token.render())),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(token) => Err(EvalError::UnexpectedToken(token.render())),
        }
    }
}

/// Maps a typed cell into the evaluator's value space; non-scalar cells
/// bind as their canonical text.
fn bind(value: &Value) -> Evaluated {
    match value {
        Value::Null => Evaluated::Null,
        Value::Bool(flag) => Evaluated::Bool(*flag),
        Value::Integer(integer) => Evaluated::Number(*integer as f64),
        Value::Number(number) => Evaluated::Number(*number),
        Value::String(text) => Evaluated::Text(text.clone()),
        other => Evaluated::Text(other.to_string()),
    }
}
