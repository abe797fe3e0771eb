// formula.rs - designer formulas, compiled once at load and evaluated per hit
//
// The kernel depends only on `FormulaEvaluator` / `CompiledFormula`. The
// bundled `ExpressionEvaluator` parses arithmetic over named parameters:
//
//     expr    := term (('+' | '-') term)*
//     term    := unary (('*' | '/') unary)*
//     unary   := '-' unary | power
//     power   := primary ('^' unary)?
//     primary := number | name | name '(' expr (',' expr)* ')' | '(' expr ')'

use crate::error::FormulaError;
use std::fmt;
use std::rc::Rc;

/// Parameter names a combat formula may reference.
pub const COMBAT_PARAMETERS: [&str; 8] = [
    "atk",
    "def",
    "caster_hp",
    "caster_max_hp",
    "target_hp",
    "target_max_hp",
    "targets",
    "crit_rate",
];

/// Compiles formula text into something cheap to evaluate repeatedly.
pub trait FormulaEvaluator {
    fn compile(&self, source: &str) -> Result<Rc<dyn CompiledFormula>, FormulaError>;
}

pub trait CompiledFormula: fmt::Debug {
    /// Deterministic for identical parameters. Referencing a parameter that
    /// is not supplied is an error, never zero.
    fn evaluate(&self, params: &FormulaParams) -> Result<f64, FormulaError>;

    /// Every parameter name the formula reads, without duplicates.
    fn parameters(&self) -> &[String];

    fn source(&self) -> &str;
}

/// Name to value mapping handed to a formula.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaParams {
    values: Vec<(&'static str, f64)>,
}

impl FormulaParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: f64) {
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Default evaluator for designer formulas.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEvaluator;

impl FormulaEvaluator for ExpressionEvaluator {
    fn compile(&self, source: &str) -> Result<Rc<dyn CompiledFormula>, FormulaError> {
        Ok(Rc::new(Expression::parse(source)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Abs,
    Clamp,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        Some(match name {
            "min" => Func::Min,
            "max" => Func::Max,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "round" => Func::Round,
            "abs" => Func::Abs,
            "clamp" => Func::Clamp,
            _ => return None,
        })
    }

    fn check_arity(self, name: &str, found: usize) -> Result<(), FormulaError> {
        let (ok, expected) = match self {
            Func::Min | Func::Max => (found >= 2, "2 or more"),
            Func::Floor | Func::Ceil | Func::Round | Func::Abs => (found == 1, "1"),
            Func::Clamp => (found == 3, "3"),
        };
        if ok {
            Ok(())
        } else {
            Err(FormulaError::Arity {
                name: name.to_string(),
                expected,
                found,
            })
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Func::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Func::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Func::Floor => args[0].floor(),
            Func::Ceil => args[0].ceil(),
            Func::Round => args[0].round(),
            Func::Abs => args[0].abs(),
            Func::Clamp => args[0].max(args[1]).min(args[2]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Param(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

impl Expr {
    fn eval(&self, params: &FormulaParams) -> Result<f64, FormulaError> {
        Ok(match self {
            Expr::Number(value) => *value,
            Expr::Param(name) => params
                .get(name)
                .ok_or_else(|| FormulaError::UnknownParameter(name.clone()))?,
            Expr::Neg(inner) => -inner.eval(params)?,
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(params)?, rhs.eval(params)?);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
            Expr::Call(func, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(params))
                    .collect::<Result<Vec<_>, _>>()?;
                func.apply(&values)
            }
        })
    }

    fn collect_params(&self, out: &mut Vec<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Param(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::Neg(inner) => inner.collect_params(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_params(out);
                rhs.collect_params(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|arg| arg.collect_params(out)),
        }
    }
}

/// A parsed formula.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
    parameters: Vec<String>,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, position: 0 };
        let root = parser.expression()?;
        if let Some((token, offset)) = parser.peek_with_offset() {
            return Err(FormulaError::UnexpectedToken {
                found: token.to_string(),
                expected: "end of formula",
                offset,
            });
        }

        let mut parameters = Vec::new();
        root.collect_params(&mut parameters);
        Ok(Self {
            source: source.to_string(),
            root,
            parameters,
        })
    }
}

impl CompiledFormula for Expression {
    fn evaluate(&self, params: &FormulaParams) -> Result<f64, FormulaError> {
        let value = self.root.eval(params)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite(self.source.clone()))
        }
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn source(&self) -> &str {
        &self.source
    }
}

// ----------------------------------------------------------------------
// Lexing and parsing
// ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "number {value}"),
            Token::Ident(name) => write!(f, "'{name}'"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Caret => f.write_str("'^'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            let mut end = offset;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_digit() || c == '.' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[offset..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| FormulaError::UnexpectedChar { found: ch, offset })?;
            tokens.push((Token::Number(value), offset));
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut end = offset;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((Token::Ident(source[offset..end].to_string()), offset));
            continue;
        }

        let token = match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => return Err(FormulaError::UnexpectedChar { found: other, offset }),
        };
        tokens.push((token, offset));
        chars.next();
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn peek_with_offset(&self) -> Option<(&Token, usize)> {
        self.tokens
            .get(self.position)
            .map(|(token, offset)| (token, *offset))
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).map(|(token, _)| token.clone());
        self.position += 1;
        token
    }

    fn end_offset(&self) -> usize {
        self.tokens.last().map(|(_, offset)| offset + 1).unwrap_or(0)
    }

    fn expect(&mut self, expected: Token, description: &'static str) -> Result<(), FormulaError> {
        if self.peek() == Some(&expected) {
            self.position += 1;
            return Ok(());
        }
        let (found, offset) = match self.peek_with_offset() {
            Some((token, offset)) => (token.to_string(), offset),
            None => ("end of formula".to_string(), self.end_offset()),
        };
        Err(FormulaError::UnexpectedToken {
            found,
            expected: description,
            offset,
        })
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.position += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.position += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if self.peek() == Some(&Token::Minus) {
            self.position += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.position += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let offset = self
            .peek_with_offset()
            .map(|(_, offset)| offset)
            .unwrap_or_else(|| self.end_offset());
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Param(name));
                }
                let func =
                    Func::lookup(&name).ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
                self.position += 1;
                let mut args = vec![self.expression()?];
                while self.peek() == Some(&Token::Comma) {
                    self.position += 1;
                    args.push(self.expression()?);
                }
                self.expect(Token::RParen, "')'")?;
                func.check_arity(&name, args.len())?;
                Ok(Expr::Call(func, args))
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(other) => Err(FormulaError::UnexpectedToken {
                found: other.to_string(),
                expected: "a number, name or '('",
                offset,
            }),
            None => Err(FormulaError::UnexpectedToken {
                found: "end of formula".to_string(),
                expected: "a number, name or '('",
                offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str, params: &FormulaParams) -> Result<f64, FormulaError> {
        ExpressionEvaluator.compile(source)?.evaluate(params)
    }

    #[test]
    fn precedence_and_associativity() {
        let params = FormulaParams::new();
        assert_eq!(eval("1 + 2 * 3", &params), Ok(7.0));
        assert_eq!(eval("(1 + 2) * 3", &params), Ok(9.0));
        assert_eq!(eval("10 - 4 - 3", &params), Ok(3.0));
        assert_eq!(eval("2 ^ 3 ^ 2", &params), Ok(512.0));
        assert_eq!(eval("-2 ^ 2", &params), Ok(-4.0));
    }

    #[test]
    fn parameters_and_functions() {
        let params = FormulaParams::new().with("atk", 50.0).with("targets", 3.0);
        assert_eq!(eval("atk * 1.2", &params), Ok(60.0));
        assert_eq!(eval("max(atk / targets, 20)", &params), Ok(20.0));
        assert_eq!(eval("clamp(atk, 0, 10)", &params), Ok(10.0));
        assert_eq!(eval("floor(7.9) + ceil(0.1) + abs(-2)", &params), Ok(10.0));
    }

    #[test]
    fn compile_lists_parameters_once() {
        let formula = ExpressionEvaluator.compile("atk - def + atk * 0.1").unwrap();
        assert_eq!(formula.parameters(), &["atk".to_string(), "def".to_string()]);
        assert_eq!(formula.source(), "atk - def + atk * 0.1");
    }

    #[test]
    fn unknown_parameter_is_reported() {
        let result = eval("atk + bonus", &FormulaParams::new().with("atk", 1.0));
        assert_eq!(result, Err(FormulaError::UnknownParameter("bonus".into())));
    }

    #[test]
    fn malformed_formulas_fail_to_compile() {
        let evaluator = ExpressionEvaluator;
        assert!(matches!(
            evaluator.compile("1 +").unwrap_err(),
            FormulaError::UnexpectedToken { .. }
        ));
        assert!(matches!(
            evaluator.compile("atk $ 2").unwrap_err(),
            FormulaError::UnexpectedChar { found: '$', .. }
        ));
        assert!(matches!(
            evaluator.compile("sqrt(4)").unwrap_err(),
            FormulaError::UnknownFunction(_)
        ));
        assert!(matches!(
            evaluator.compile("clamp(1, 2)").unwrap_err(),
            FormulaError::Arity { .. }
        ));
        assert!(evaluator.compile("(1 + 2").is_err());
        assert!(evaluator.compile("1 2").is_err());
    }

    #[test]
    fn division_by_zero_is_not_finite() {
        assert!(matches!(
            eval("1 / 0", &FormulaParams::new()),
            Err(FormulaError::NonFinite(_))
        ));
    }
}
