//! LaTeX rendering of symbolic expressions.
//!
//! Output follows the conventions of SymPy's `latex()` printer so the derivation steps
//! look the way users of the web page expect: `\frac{x^{3}}{3}`,
//! `- \cos{\left(x \right)}`, `\sqrt{2}`, `e^{x}`, `\left|{x}\right|`.
use crate::symbolic::symbolic_engine::{Expr, Func};
use num::{BigInt, BigRational, One, Signed, Zero};

impl Expr {
    pub fn to_latex(&self) -> String {
        match self {
            Expr::Var(name) => name.clone(),
            Expr::Const(c) => rational_latex(c),
            Expr::Pi => "\\pi".to_string(),
            Expr::E => "e".to_string(),
            Expr::Add(_, _) | Expr::Sub(_, _) => sum_latex(self),
            Expr::Mul(_, _) | Expr::Div(_, _) => product_latex(self),
            Expr::Pow(base, exp) => power_latex(base, exp),
            other => match other.as_unary() {
                Some((func, arg)) => function_latex(func, arg, None),
                None => String::new(),
            },
        }
    }
}

fn rational_latex(c: &BigRational) -> String {
    if c.is_integer() {
        return c.numer().to_string();
    }
    let frac = format!("\\frac{{{}}}{{{}}}", c.numer().abs(), c.denom());
    if c.is_negative() { format!("- {}", frac) } else { frac }
}

fn sum_latex(e: &Expr) -> String {
    let mut terms = Vec::new();
    collect_terms(e, false, &mut terms);
    let mut out = String::new();
    for (i, (neg, term)) in terms.iter().enumerate() {
        let rendered = term.to_latex();
        let (term_neg, body) = match rendered.strip_prefix("- ") {
            Some(rest) => (true, rest.to_string()),
            None => match rendered.strip_prefix('-') {
                Some(rest) => (true, rest.to_string()),
                None => (false, rendered),
            },
        };
        let negative = *neg != term_neg;
        if i == 0 {
            if negative {
                out.push_str("- ");
            }
        } else if negative {
            out.push_str(" - ");
        } else {
            out.push_str(" + ");
        }
        out.push_str(&body);
    }
    out
}

fn collect_terms<'a>(e: &'a Expr, neg: bool, out: &mut Vec<(bool, &'a Expr)>) {
    match e {
        Expr::Add(l, r) => {
            collect_terms(l, neg, out);
            collect_terms(r, neg, out);
        }
        Expr::Sub(l, r) => {
            collect_terms(l, neg, out);
            collect_terms(r, !neg, out);
        }
        other => out.push((neg, other)),
    }
}

/// splits a product into a rational coefficient, numerator and denominator factors
fn collect_factors(
    e: &Expr,
    in_denominator: bool,
    coef: &mut BigRational,
    num: &mut Vec<Expr>,
    den: &mut Vec<Expr>,
) {
    match e {
        Expr::Mul(l, r) => {
            collect_factors(l, in_denominator, coef, num, den);
            collect_factors(r, in_denominator, coef, num, den);
        }
        Expr::Div(l, r) => {
            collect_factors(l, in_denominator, coef, num, den);
            collect_factors(r, !in_denominator, coef, num, den);
        }
        Expr::Const(c) if !c.is_zero() => {
            if in_denominator {
                *coef /= c;
            } else {
                *coef *= c;
            }
        }
        Expr::Pow(base, exp) if exp.is_negative_const() => {
            // x^-2 is printed as 1/x^2
            let positive = match exp.as_rational() {
                Some(r) => Expr::Const(-r.clone()),
                None => exp.as_ref().clone(),
            };
            let flipped = if positive.is_one() {
                base.as_ref().clone()
            } else {
                Expr::Pow(base.clone(), positive.boxed())
            };
            if in_denominator {
                num.push(flipped);
            } else {
                den.push(flipped);
            }
        }
        other => {
            if in_denominator {
                den.push(other.clone());
            } else {
                num.push(other.clone());
            }
        }
    }
}

fn product_latex(e: &Expr) -> String {
    if let Expr::Mul(l, r) = e {
        if l.is_zero() || r.is_zero() {
            return "0".to_string();
        }
    }
    let mut coef = BigRational::one();
    let mut num = Vec::new();
    let mut den = Vec::new();
    collect_factors(e, false, &mut coef, &mut num, &mut den);
    let num_parts: Vec<String> = num.iter().map(factor_latex).collect();
    let den_parts: Vec<String> = den.iter().map(factor_latex).collect();

    let negative = coef.is_negative();
    let p = coef.numer().abs();
    let q = coef.denom().clone();

    let mut numerator: Vec<String> = Vec::new();
    if !p.is_one() || num_parts.is_empty() {
        numerator.push(p.to_string());
    }
    numerator.extend(num_parts);
    let mut denominator: Vec<String> = Vec::new();
    if !q.is_one() {
        denominator.push(q.to_string());
    }
    denominator.extend(den_parts);

    let body = if denominator.is_empty() {
        numerator.join(" ")
    } else {
        format!("\\frac{{{}}}{{{}}}", numerator.join(" "), denominator.join(" "))
    };
    if negative { format!("- {}", body) } else { body }
}

/// a factor inside a product: sums and negative numbers get parentheses
fn factor_latex(e: &Expr) -> String {
    match e {
        Expr::Add(_, _) | Expr::Sub(_, _) => format!("\\left({}\\right)", e.to_latex()),
        Expr::Const(c) if c.is_negative() => format!("\\left({}\\right)", e.to_latex()),
        _ => e.to_latex(),
    }
}

/// a power base: everything but atoms and function calls gets parentheses
fn base_latex(e: &Expr) -> String {
    match e {
        Expr::Var(_) | Expr::Pi | Expr::E => e.to_latex(),
        Expr::Const(c) if c.is_integer() && !c.is_negative() => e.to_latex(),
        other if other.as_unary().is_some() && !matches!(other, Expr::Exp(_)) => other.to_latex(),
        _ => format!("\\left({}\\right)", e.to_latex()),
    }
}

fn power_latex(base: &Expr, exp: &Expr) -> String {
    if let Some(r) = exp.as_rational() {
        if r.is_negative() {
            let positive = Expr::Pow(base.clone().boxed(), Expr::Const(-r.clone()).boxed());
            return format!("\\frac{{1}}{{{}}}", positive.to_latex());
        }
        if r.numer().is_one() && !r.denom().is_one() {
            let inner = base.to_latex();
            return if r.denom() == &BigInt::from(2) {
                format!("\\sqrt{{{}}}", inner)
            } else {
                format!("\\sqrt[{}]{{{}}}", r.denom(), inner)
            };
        }
        if r.is_integer() && r.is_positive() {
            if let Some((func, arg)) = base.as_unary() {
                if is_power_prefixed(func) {
                    return function_latex(func, arg, Some(&exp.to_latex()));
                }
            }
        }
    }
    format!("{}^{{{}}}", base_latex(base), exp.to_latex())
}

fn is_power_prefixed(func: Func) -> bool {
    matches!(
        func,
        Func::Sin | Func::Cos | Func::Tg | Func::Ctg | Func::Sinh | Func::Cosh | Func::Tanh
    )
}

fn function_latex(func: Func, arg: &Expr, power: Option<&str>) -> String {
    let inner = arg.to_latex();
    let name = match func {
        Func::Exp => return format!("e^{{{}}}", inner),
        Func::Abs => return format!("\\left|{{{}}}\\right|", inner),
        Func::Ln => "\\log",
        Func::Sin => "\\sin",
        Func::Cos => "\\cos",
        Func::Tg => "\\tan",
        Func::Ctg => "\\cot",
        Func::Arcsin => "\\operatorname{asin}",
        Func::Arccos => "\\operatorname{acos}",
        Func::Arctg => "\\operatorname{atan}",
        Func::Arcctg => "\\operatorname{acot}",
        Func::Sinh => "\\sinh",
        Func::Cosh => "\\cosh",
        Func::Tanh => "\\tanh",
    };
    match power {
        Some(p) => format!("{}^{{{}}}{{\\left({} \\right)}}", name, p, inner),
        None => format!("{}{{\\left({} \\right)}}", name, inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn test_numbers() {
        assert_eq!(Expr::rational(8, 3).to_latex(), "\\frac{8}{3}");
        assert_eq!(Expr::rational(-1, 2).to_latex(), "- \\frac{1}{2}");
        assert_eq!(Expr::int(-4).to_latex(), "-4");
        assert_eq!(Expr::Pi.to_latex(), "\\pi");
    }

    #[test]
    fn test_polynomial_antiderivative() {
        let f = (x().pow(Expr::int(3)) / Expr::int(3)).simplify();
        assert_eq!(f.to_latex(), "\\frac{x^{3}}{3}");
        let f = (x().pow(Expr::int(2)) + Expr::int(2) * x() + Expr::int(1)).simplify();
        assert_eq!(f.to_latex(), "x^{2} + 2 x + 1");
    }

    #[test]
    fn test_negative_terms() {
        let f = (-Expr::cos(x().boxed())).simplify();
        assert_eq!(f.to_latex(), "- \\cos{\\left(x \\right)}");
        let f = (x().pow(Expr::int(2)) - Expr::cos(x().boxed())).simplify();
        assert_eq!(f.to_latex(), "x^{2} - \\cos{\\left(x \\right)}");
    }

    #[test]
    fn test_fractions_and_roots() {
        assert_eq!((Expr::one() / x()).simplify().to_latex(), "\\frac{1}{x}");
        assert_eq!((Expr::int(2) / x()).simplify().to_latex(), "\\frac{2}{x}");
        let half_sqrt2 = (Expr::one() / Expr::int(2).sqrt()).simplify();
        assert_eq!(half_sqrt2.to_latex(), "\\frac{\\sqrt{2}}{2}");
        assert_eq!((Expr::Pi / Expr::int(2)).simplify().to_latex(), "\\frac{\\pi}{2}");
        assert_eq!(x().pow(Expr::rational(1, 3)).to_latex(), "\\sqrt[3]{x}");
    }

    #[test]
    fn test_functions() {
        assert_eq!(Expr::Exp(x().boxed()).to_latex(), "e^{x}");
        assert_eq!(Expr::Ln(x().boxed()).to_latex(), "\\log{\\left(x \\right)}");
        assert_eq!(Expr::Abs(x().boxed()).to_latex(), "\\left|{x}\\right|");
        assert_eq!(Expr::arctg(x().boxed()).to_latex(), "\\operatorname{atan}{\\left(x \\right)}");
        let sin2 = Expr::sin(x().boxed()).pow(Expr::int(2));
        assert_eq!(sin2.to_latex(), "\\sin^{2}{\\left(x \\right)}");
    }

    #[test]
    fn test_parenthesized_sums() {
        let f = (x() + Expr::int(1)).pow(Expr::int(2));
        assert_eq!(f.to_latex(), "\\left(x + 1\\right)^{2}");
        let g = x() * Expr::Ln(x().boxed());
        assert_eq!(g.to_latex(), "x \\log{\\left(x \\right)}");
    }
}
