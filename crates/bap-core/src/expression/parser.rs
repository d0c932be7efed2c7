use std::f64::consts::{E, PI};

use crate::error::{BapError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Func {
    Exp,
    Sqrt,
    Abs,
    Min,
    Max,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "exp" => Some(Func::Exp),
            "sqrt" => Some(Func::Sqrt),
            "abs" => Some(Func::Abs),
            "min" => Some(Func::Min),
            "max" => Some(Func::Max),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Func::Min | Func::Max => 2,
            _ => 1,
        }
    }
}

/// Parsed formula. `Var` is the single free variable.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(f64),
    Var,
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

impl Expr {
    pub fn eval(&self, var: f64) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::Var => var,
            Expr::Neg(e) => -e.eval(var),
            Expr::Binary(op, l, r) => {
                let (a, b) = (l.eval(var), r.eval(var));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    // Floored modulo: the result takes the sign of the divisor.
                    BinOp::Rem => a - b * (a / b).floor(),
                    BinOp::Pow => a.powf(b),
                }
            }
            Expr::Call(func, args) => {
                let x = args.first().map(|e| e.eval(var)).unwrap_or(f64::NAN);
                match func {
                    Func::Exp => x.exp(),
                    Func::Sqrt => x.sqrt(),
                    Func::Abs => x.abs(),
                    Func::Min => args.get(1).map(|e| x.min(e.eval(var))).unwrap_or(x),
                    Func::Max => args.get(1).map(|e| x.max(e.eval(var))).unwrap_or(x),
                }
            }
        }
    }

    /// Render in the backend grammar: fully parenthesised, variable named
    /// `var`, `min`/`max` as ternaries.
    pub fn to_backend(&self) -> String {
        match self {
            Expr::Num(v) => format_number(*v),
            Expr::Var => "var".to_string(),
            Expr::Neg(e) => format!("(-{})", e.to_backend()),
            Expr::Binary(op, l, r) => {
                let sym = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                    BinOp::Rem => "%",
                    BinOp::Pow => "**",
                };
                format!("({} {sym} {})", l.to_backend(), r.to_backend())
            }
            Expr::Call(func, args) => {
                let rendered: Vec<String> = args.iter().map(Expr::to_backend).collect();
                match (func, rendered.as_slice()) {
                    (Func::Min, [a, b]) => format!("({a} < {b} ? {a} : {b})"),
                    (Func::Max, [a, b]) => format!("({a} > {b} ? {a} : {b})"),
                    (Func::Exp, [a]) => format!("exp({a})"),
                    (Func::Sqrt, [a]) => format!("sqrt({a})"),
                    (Func::Abs, [a]) => format!("abs({a})"),
                    _ => format!("{func:?}({})", rendered.join(", ")).to_lowercase(),
                }
            }
        }
    }
}

pub(crate) fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(BinOp),
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Op(BinOp::Add));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op(BinOp::Sub));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Op(BinOp::Div));
                i += 1;
            }
            '%' => {
                tokens.push(Token::Op(BinOp::Rem));
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Op(BinOp::Pow));
                    i += 2;
                } else {
                    tokens.push(Token::Op(BinOp::Mul));
                    i += 1;
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent part, e.g. 1e-5.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '-' || chars[j] == '+') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| BapError::Expression(format!("invalid number '{text}'")))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(BapError::Expression(format!(
                    "unexpected character '{other}' at {i}"
                )))
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            other => Err(BapError::Expression(format!(
                "expected {expected:?}, found {other:?}"
            ))),
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ (BinOp::Add | BinOp::Sub))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ (BinOp::Mul | BinOp::Div | BinOp::Rem))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Op(BinOp::Sub)) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op(BinOp::Add)) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // `**` is right associative and binds tighter than a leading minus.
    fn power(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        if let Some(Token::Op(BinOp::Pow)) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "var" => Ok(Expr::Var),
                "pi" => Ok(Expr::Num(PI)),
                "e" => Ok(Expr::Num(E)),
                _ => {
                    let func = Func::from_name(&name)
                        .ok_or_else(|| BapError::Expression(format!("unknown name '{name}'")))?;
                    self.call(func)
                }
            },
            other => Err(BapError::Expression(format!("unexpected token {other:?}"))),
        }
    }

    fn call(&mut self, func: Func) -> Result<Expr> {
        self.expect(Token::LParen)?;
        let mut args = vec![self.expr()?];
        while let Some(Token::Comma) = self.peek() {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;
        if args.len() != func.arity() {
            return Err(BapError::Expression(format!(
                "{func:?} takes {} argument(s), got {}",
                func.arity(),
                args.len()
            )));
        }
        Ok(Expr::Call(func, args))
    }
}

/// Parse a formula whose only free variable is `var`.
pub fn parse(src: &str) -> Result<Expr> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
    };
    let expr = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(BapError::Expression(format!(
            "trailing input after position {} in '{src}'",
            parser.pos
        )));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let e = parse("1 + 2 * 3").unwrap();
        assert!((e.eval(0.0) - 7.0).abs() < 1e-12);
        let e = parse("-2 ** 2").unwrap();
        assert!((e.eval(0.0) + 4.0).abs() < 1e-12);
        let e = parse("2 ** 3 ** 2").unwrap();
        assert!((e.eval(0.0) - 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_functions_and_var() {
        let e = parse("min(var, 10) + max(var, 1) + sqrt(4) + abs(-1)").unwrap();
        assert!((e.eval(20.0) - (10.0 + 20.0 + 2.0 + 1.0)).abs() < 1e-12);
        let e = parse("exp(0) * pi").unwrap();
        assert!((e.eval(0.0) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_floored_modulo() {
        let e = parse("-7 % 3").unwrap();
        assert!((e.eval(0.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_backend_rendering() {
        let e = parse("min(var, 100) * -10").unwrap();
        assert_eq!(
            e.to_backend(),
            "((var < 100.0 ? var : 100.0) * (-10.0))"
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse("1 +").is_err());
        assert!(parse("foo(1)").is_err());
        assert!(parse("min(1)").is_err());
        assert!(parse("(1").is_err());
        assert!(parse("1 $ 2").is_err());
    }
}
