//! a module turns a String expression into a symbolic expression
//!
//! # Example
//! ```
//! use RustedIntegral::symbolic::symbolic_engine::Expr;
//! let parsed = Expr::parse_expression("2x^2 + sin(x)").unwrap();
//! println!("parsed expression {}", parsed);
//! let f = parsed.lambdify1D("x").unwrap();
//! assert!((f(0.0)).abs() < 1e-12);
//! ```
//!
//! Grammar (whitespace allowed between tokens):
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary | power)*      juxtaposition is multiplication: 2x, x(x+1)
//! unary   := ('-' | '+') unary | power
//! power   := primary (('^' | '**') unary)?           right associative
//! primary := number | '(' expr ')' | function | constant | symbol
//! ```
//! Functions may be applied without parentheses (`sin x`) and raised to a power
//! before the argument (`sin^2(x)`). Decimal literals are read as exact rationals.
//!
//! Parsing and every later tree walk recurse, so the input length, the parenthesis
//! nesting and the height of the parsed tree are bounded (`MAX_INPUT_LENGTH`,
//! `MAX_NESTING`, `MAX_TREE_DEPTH`); longer or deeper input is rejected with an error.
use crate::symbolic::symbolic_engine::Expr;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, char, digit1, multispace0, one_of},
    combinator::{opt, recognize},
    sequence::{delimited, preceded},
};
use num::{BigInt, BigRational, Zero};
use std::str::FromStr;
use strum_macros::{EnumIter, EnumString};

/// characters
pub const MAX_INPUT_LENGTH: usize = 256;
/// open parentheses at any point of the input
pub const MAX_NESTING: usize = 16;
/// height of the parsed expression tree
pub const MAX_TREE_DEPTH: usize = 40;

/// Names of the functions the parser understands, with their accepted spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter)]
pub enum FunctionName {
    #[strum(serialize = "sin")]
    Sin,
    #[strum(serialize = "cos")]
    Cos,
    #[strum(serialize = "tan", serialize = "tg")]
    Tan,
    #[strum(serialize = "cot", serialize = "ctg")]
    Cot,
    #[strum(serialize = "sec")]
    Sec,
    #[strum(serialize = "csc", serialize = "cosec")]
    Csc,
    #[strum(serialize = "asin", serialize = "arcsin")]
    Asin,
    #[strum(serialize = "acos", serialize = "arccos")]
    Acos,
    #[strum(serialize = "atan", serialize = "arctan", serialize = "arctg")]
    Atan,
    #[strum(serialize = "acot", serialize = "arccot", serialize = "arcctg")]
    Acot,
    #[strum(serialize = "sinh")]
    Sinh,
    #[strum(serialize = "cosh")]
    Cosh,
    #[strum(serialize = "tanh")]
    Tanh,
    #[strum(serialize = "exp")]
    Exp,
    #[strum(serialize = "log", serialize = "ln")]
    Log,
    #[strum(serialize = "sqrt")]
    Sqrt,
    #[strum(serialize = "abs", serialize = "Abs")]
    Abs,
}

impl FunctionName {
    pub fn build(self, arg: Expr) -> Expr {
        let arg = arg.boxed();
        match self {
            FunctionName::Sin => Expr::sin(arg),
            FunctionName::Cos => Expr::cos(arg),
            FunctionName::Tan => Expr::tg(arg),
            FunctionName::Cot => Expr::ctg(arg),
            FunctionName::Sec => Expr::one() / Expr::cos(arg),
            FunctionName::Csc => Expr::one() / Expr::sin(arg),
            FunctionName::Asin => Expr::arcsin(arg),
            FunctionName::Acos => Expr::arccos(arg),
            FunctionName::Atan => Expr::arctg(arg),
            FunctionName::Acot => Expr::arcctg(arg),
            FunctionName::Sinh => Expr::sinh(arg),
            FunctionName::Cosh => Expr::cosh(arg),
            FunctionName::Tanh => Expr::tanh(arg),
            FunctionName::Exp => Expr::Exp(arg),
            FunctionName::Log => Expr::Ln(arg),
            FunctionName::Sqrt => Expr::Pow(arg, Expr::rational(1, 2).boxed()),
            FunctionName::Abs => Expr::Abs(arg),
        }
    }
}

/// Decimal literal ("8.2", ".5", "3", "1.5e-3") to an exact rational.
fn decimal_to_rational(mantissa: &str, exponent: Option<&str>) -> Option<BigRational> {
    let mut parts = mantissa.split('.');
    let integer_part = parts.next().unwrap_or("");
    let fractional_part = parts.next().unwrap_or("");
    if parts.next().is_some() || (integer_part.is_empty() && fractional_part.is_empty()) {
        return None;
    }
    let ten = BigInt::from(10);
    let denominator = num::pow(ten.clone(), fractional_part.len());
    let int_val: BigInt = if integer_part.is_empty() {
        BigInt::zero()
    } else {
        integer_part.parse().ok()?
    };
    let frac_val: BigInt = if fractional_part.is_empty() {
        BigInt::zero()
    } else {
        fractional_part.parse().ok()?
    };
    let mut value = BigRational::new(int_val * &denominator + frac_val, denominator);
    if let Some(exp) = exponent {
        let e: i64 = exp.parse().ok()?;
        if e.abs() > 400 {
            return None;
        }
        let scale = BigRational::from_integer(num::pow(ten, e.unsigned_abs() as usize));
        value = if e >= 0 { value * scale } else { value / scale };
    }
    Some(value)
}

fn number(input: &str) -> IResult<&str, Expr> {
    let (rest, mantissa) = take_while1(|c: char| c.is_ascii_digit() || c == '.').parse(input)?;
    let (rest, exponent) =
        opt(preceded(one_of("eE"), recognize((opt(one_of("+-")), digit1)))).parse(rest)?;
    match decimal_to_rational(mantissa, exponent) {
        Some(value) => Ok((rest, Expr::Const(value))),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn parenthesized(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        delimited(char('('), expr, preceded(multispace0, char(')'))),
    )
    .parse(input)
}

fn pow_op(input: &str) -> IResult<&str, &str> {
    preceded(multispace0, alt((tag("**"), tag("^")))).parse(input)
}

fn add_op(input: &str) -> IResult<&str, char> {
    preceded(multispace0, one_of("+-")).parse(input)
}

fn mul_op(input: &str) -> IResult<&str, char> {
    preceded(multispace0, one_of("*/")).parse(input)
}

/// "pi", "e" and runs of single-letter symbols ("xe" is x*e)
fn resolve_symbol(name: &str) -> Expr {
    match name {
        "pi" | "Pi" | "PI" | "π" => return Expr::Pi,
        "e" | "E" => return Expr::E,
        _ => {}
    }
    if name.len() == 1 {
        return Expr::Var(name.to_string());
    }
    let mut factors = Vec::new();
    let mut rest = name;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("pi") {
            factors.push(Expr::Pi);
            rest = tail;
            continue;
        }
        let mut chars = rest.chars();
        let Some(c) = chars.next() else { break };
        factors.push(if c == 'e' { Expr::E } else { Expr::Var(c.to_string()) });
        rest = chars.as_str();
    }
    factors
        .into_iter()
        .reduce(|a, b| a * b)
        .unwrap_or_else(|| Expr::Var(name.to_string()))
}

/// argument of a function: "(expr)" or, without parentheses, a power ("sin x^2")
fn function_argument(input: &str) -> IResult<&str, Expr> {
    alt((parenthesized, power)).parse(input)
}

fn function_call(func: FunctionName, input: &str) -> IResult<&str, Expr> {
    // sin^2(x)
    if let Ok((rest, (_, n))) = (pow_op, preceded(multispace0, number)).parse(input) {
        if let Ok((rest, arg)) = parenthesized(rest) {
            return Ok((rest, func.build(arg).pow(n)));
        }
    }
    let (rest, arg) = function_argument(input)?;
    Ok((rest, func.build(arg)))
}

fn identifier(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = alt((alpha1, tag("π"))).parse(input)?;
    if let Ok(func) = FunctionName::from_str(name) {
        return function_call(func, rest);
    }
    if matches!(name, "pi" | "Pi" | "PI" | "e" | "E") {
        return Ok((rest, resolve_symbol(name)));
    }
    // "sinx", "lnx": a function name glued to its argument
    for k in (2..name.len()).rev() {
        if let Ok(func) = FunctionName::from_str(&name[..k]) {
            let glued = resolve_symbol(&name[k..]);
            // "sinx^2" still means sin(x^2)
            if let Ok((after, exponent)) = preceded(pow_op, unary).parse(rest) {
                return Ok((after, func.build(glued.pow(exponent))));
            }
            return Ok((rest, func.build(glued)));
        }
    }
    Ok((rest, resolve_symbol(name)))
}

fn primary(input: &str) -> IResult<&str, Expr> {
    preceded(multispace0, alt((number, parenthesized, identifier))).parse(input)
}

fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = primary(input)?;
    if let Ok((rest, _)) = pow_op(input) {
        let (rest, exponent) = unary(rest)?;
        return Ok((rest, base.pow(exponent)));
    }
    Ok((input, base))
}

fn negate(e: Expr) -> Expr {
    match e {
        Expr::Const(c) => Expr::Const(-c),
        other => -other,
    }
}

fn unary(input: &str) -> IResult<&str, Expr> {
    if let Ok((rest, sign)) = add_op(input) {
        let (rest, operand) = unary(rest)?;
        return Ok((rest, if sign == '-' { negate(operand) } else { operand }));
    }
    power(input)
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut acc) = unary(input)?;
    loop {
        if let Ok((rest, op)) = mul_op(input) {
            let (rest, rhs) = unary(rest)?;
            acc = if op == '*' { acc * rhs } else { acc / rhs };
            input = rest;
            continue;
        }
        // implicit multiplication
        if let Ok((rest, rhs)) = power(input) {
            acc = acc * rhs;
            input = rest;
            continue;
        }
        break;
    }
    Ok((input, acc))
}

fn expr(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut acc) = term(input)?;
    while let Ok((rest, op)) = add_op(input) {
        let (rest, rhs) = term(rest)?;
        acc = if op == '+' { acc + rhs } else { acc - rhs };
        input = rest;
    }
    Ok((input, acc))
}

fn check_size(input: &str) -> Result<(), String> {
    if input.chars().count() > MAX_INPUT_LENGTH {
        return Err(format!(
            "expression is too long (more than {} characters)",
            MAX_INPUT_LENGTH
        ));
    }
    let mut open = 0usize;
    for c in input.chars() {
        match c {
            '(' => {
                open += 1;
                if open > MAX_NESTING {
                    return Err(format!(
                        "parentheses are nested too deeply (more than {} levels)",
                        MAX_NESTING
                    ));
                }
            }
            ')' => open = open.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

/// Parses `input` allowing only the listed variable names.
pub fn parse_expression_func(input: &str, variables: &[&str]) -> Result<Expr, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty expression".to_string());
    }
    check_size(trimmed)?;
    let parsed = match expr(trimmed) {
        Ok((rest, parsed)) => {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Err(format!("unexpected input at '{}'", rest));
            }
            parsed
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let near = e.input.trim();
            return Err(if near.is_empty() {
                "unexpected end of expression".to_string()
            } else {
                format!("invalid syntax at '{}'", near)
            });
        }
        Err(nom::Err::Incomplete(_)) => return Err("unexpected end of expression".to_string()),
    };
    if parsed.depth() > MAX_TREE_DEPTH {
        return Err(format!(
            "expression is too complex (more than {} nested operations)",
            MAX_TREE_DEPTH
        ));
    }
    if let Some(unknown) = parsed
        .free_variables()
        .into_iter()
        .find(|v| !variables.contains(&v.as_str()))
    {
        return Err(format!("unknown symbol '{}'", unknown));
    }
    Ok(parsed)
}

impl Expr {
    /// Parses a function of x.
    pub fn parse_expression(input: &str) -> Result<Expr, String> {
        parse_expression_func(input, &["x"])
    }

    /// Parses a variable-free expression such as a bound ("pi/2", "sqrt(2)", "-1/3").
    pub fn parse_constant(input: &str) -> Result<Expr, String> {
        parse_expression_func(input, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    fn x() -> Expr {
        Expr::var("x")
    }

    fn eval(input: &str, at: f64) -> f64 {
        Expr::parse_expression(input).unwrap().eval_expression("x", at)
    }

    #[test]
    fn test_basic_precedence() {
        assert_eq!(
            Expr::parse_expression("x^2 + 1").unwrap(),
            x().pow(Expr::int(2)) + Expr::int(1)
        );
        assert_relative_eq!(eval("2 + 3*x^2", 2.0), 14.0);
        assert_relative_eq!(eval("-x^2", 3.0), -9.0);
        assert_relative_eq!(eval("2^3^2", 0.0), 512.0);
        assert_relative_eq!(eval("x**2", 3.0), 9.0);
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_relative_eq!(eval("2x", 3.0), 6.0);
        assert_relative_eq!(eval("x(x+1)", 2.0), 6.0);
        assert_relative_eq!(eval("(x+1)(x-1)", 3.0), 8.0);
        assert_relative_eq!(eval("2sin(x)", 0.5), 2.0 * 0.5f64.sin(), epsilon = 1e-12);
        assert_relative_eq!(eval("3x^2", 2.0), 12.0);
        assert_relative_eq!(eval("1/2x", 4.0), 2.0);
    }

    #[test]
    fn test_functions_and_aliases() {
        assert_relative_eq!(eval("tg(x)", 0.3), 0.3f64.tan(), epsilon = 1e-12);
        assert_relative_eq!(eval("arctan(x)", 0.3), 0.3f64.atan(), epsilon = 1e-12);
        assert_relative_eq!(eval("ln(x) + log(x)", 2.0), 2.0 * 2f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(eval("sqrt(x)", 9.0), 3.0, epsilon = 1e-12);
        assert_relative_eq!(eval("sec(x)", 0.2), 1.0 / 0.2f64.cos(), epsilon = 1e-12);
        assert_relative_eq!(eval("sin^2(x)", 0.7), 0.7f64.sin().powi(2), epsilon = 1e-12);
        assert_relative_eq!(eval("sin x", 0.7), 0.7f64.sin(), epsilon = 1e-12);
        assert_relative_eq!(eval("sinx", 0.7), 0.7f64.sin(), epsilon = 1e-12);
        assert_relative_eq!(eval("e^x", 1.0), std::f64::consts::E, epsilon = 1e-12);
        assert_relative_eq!(eval("exp(2x)", 0.5), std::f64::consts::E, epsilon = 1e-12);
    }

    #[test]
    fn test_every_function_name_builds() {
        for func in FunctionName::iter() {
            let built = func.build(Expr::rational(1, 2));
            assert!(built.eval_f64().is_finite(), "{:?}", func);
        }
    }

    #[test]
    fn test_decimals_are_exact() {
        assert_eq!(Expr::parse_constant("2.5").unwrap(), Expr::rational(5, 2));
        assert_eq!(Expr::parse_constant(".25").unwrap(), Expr::rational(1, 4));
        assert_eq!(Expr::parse_constant("1.5e-3").unwrap(), Expr::rational(3, 2000));
        assert_eq!(Expr::parse_constant("-3").unwrap(), Expr::int(-3));
    }

    #[test]
    fn test_constants() {
        let half_pi = Expr::parse_constant("pi/2").unwrap();
        assert_relative_eq!(half_pi.eval_f64(), std::f64::consts::FRAC_PI_2, epsilon = 1e-15);
        let e2 = Expr::parse_constant("2e").unwrap();
        assert_relative_eq!(e2.eval_f64(), 2.0 * std::f64::consts::E, epsilon = 1e-15);
        let root = Expr::parse_constant("sqrt(2)").unwrap();
        assert_relative_eq!(root.eval_f64(), 2f64.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Expr::parse_expression("").is_err());
        assert!(Expr::parse_expression("x +").is_err());
        assert!(Expr::parse_expression("sin(x").is_err());
        assert!(Expr::parse_expression("x $ 2").is_err());
        let err = Expr::parse_expression("y + 1").unwrap_err();
        assert!(err.contains("unknown symbol 'y'"));
        assert!(Expr::parse_constant("x").is_err());
        assert!(Expr::parse_expression("1.2.3").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |d: usize| format!("{}x{}", "(".repeat(d), ")".repeat(d));
        assert_eq!(Expr::parse_expression(&nested(MAX_NESTING)).unwrap(), x());
        let err = Expr::parse_expression(&nested(MAX_NESTING + 1)).unwrap_err();
        assert!(err.contains("nested too deeply"), "{}", err);
        let err = Expr::parse_expression(&nested(2000)).unwrap_err();
        assert!(err.contains("too long"), "{}", err);
    }

    #[test]
    fn test_length_and_depth_limits() {
        let err = Expr::parse_expression(&vec!["x"; 5000].join("+")).unwrap_err();
        assert!(err.contains("too long"), "{}", err);
        // short enough, but a chain of 60 additions
        let err = Expr::parse_expression(&vec!["x"; 60].join("+")).unwrap_err();
        assert!(err.contains("too complex"), "{}", err);
        let err = Expr::parse_expression(&format!("{}x", "-".repeat(100))).unwrap_err();
        assert!(err.contains("too complex"), "{}", err);
        let sum = vec!["x"; 20].join("+");
        assert_relative_eq!(eval(&sum, 1.5), 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_depth() {
        assert_eq!(x().depth(), 1);
        assert_eq!(Expr::parse_expression("x^2 + 1").unwrap().depth(), 3);
        assert_eq!(Expr::parse_expression("sin(cos(x))").unwrap().depth(), 3);
    }
}
