//! Algebraic simplification.
//!
//! `simplify()` brings an expression into a canonical form: sums are flattened and like
//! terms collected, products are flattened into a rational coefficient times a sorted
//! list of powers, constant powers are folded exactly (`sqrt(8) -> 2*sqrt(2)`,
//! `1/sqrt(2) -> sqrt(2)/2`), and elementary functions are evaluated at the special
//! points where the value is known exactly (`sin(pi/6) = 1/2`, `ln(e) = 1`, ...).
//! The canonical form is what makes the printed antiderivatives and step values
//! readable, and what lets the integrator compare subexpressions with `==`.
use crate::symbolic::symbolic_engine::{Expr, Func};
use num::{BigInt, BigRational, One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

/// largest integer exponent folded into a constant
const MAX_FOLDED_EXPONENT: i64 = 512;
/// largest integer power of a sum expanded by `expand()`
const MAX_EXPANDED_POWER: i64 = 12;

fn rat(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

fn ratio(p: i64, q: i64) -> BigRational {
    BigRational::new(BigInt::from(p), BigInt::from(q))
}

impl Expr {
    /// Simplifies to the canonical form, iterating until nothing changes.
    pub fn simplify(&self) -> Expr {
        let mut current = self.simplify_once();
        for _ in 0..8 {
            let next = current.simplify_once();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn simplify_once(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) | Expr::Pi | Expr::E => self.clone(),
            Expr::Add(_, _) | Expr::Sub(_, _) => simplify_sum(self),
            Expr::Mul(_, _) | Expr::Div(_, _) => simplify_product(self),
            Expr::Pow(base, exp) => simplify_power(base.simplify_once(), exp.simplify_once()),
            other => match other.as_unary() {
                Some((func, arg)) => simplify_function(func, arg.simplify_once()),
                None => other.clone(),
            },
        }
    }

    /// Multiplies out products of sums and small integer powers of sums.
    pub fn expand(&self) -> Expr {
        let s = self.simplify();
        let expanded = match &s {
            Expr::Add(_, _) | Expr::Sub(_, _) => {
                let mut terms = Vec::new();
                signed_terms(&s, false, &mut terms);
                rebuild_signed(terms.into_iter().map(|(neg, t)| (neg, t.expand())).collect())
            }
            Expr::Mul(l, r) => {
                let lt = expanded_terms(l);
                let rt = expanded_terms(r);
                let mut out = Vec::with_capacity(lt.len() * rt.len());
                for (ln, a) in &lt {
                    for (rn, b) in &rt {
                        out.push((ln != rn, a.clone() * b.clone()));
                    }
                }
                rebuild_signed(out)
            }
            Expr::Div(num, den) => {
                let terms = expanded_terms(num);
                rebuild_signed(
                    terms
                        .into_iter()
                        .map(|(neg, t)| (neg, t / den.as_ref().clone()))
                        .collect(),
                )
            }
            Expr::Pow(base, exp) => match exp.as_integer() {
                Some(n) if (2..=MAX_EXPANDED_POWER).contains(&n) && is_sum(base) => {
                    let terms = expanded_terms(base);
                    let mut acc = terms.clone();
                    for _ in 1..n {
                        let mut next = Vec::with_capacity(acc.len() * terms.len());
                        for (an, a) in &acc {
                            for (tn, t) in &terms {
                                next.push((an != tn, (a.clone() * t.clone()).simplify()));
                            }
                        }
                        acc = collect_signed(next);
                    }
                    rebuild_signed(acc)
                }
                _ => s.clone(),
            },
            _ => s.clone(),
        };
        expanded.simplify()
    }

    /// Splits off the rational coefficient of a simplified term.
    pub fn split_coefficient(&self) -> (BigRational, Expr) {
        match self {
            Expr::Const(c) => (c.clone(), Expr::one()),
            Expr::Mul(l, r) => match l.as_ref() {
                Expr::Const(c) => (c.clone(), r.as_ref().clone()),
                _ => (BigRational::one(), self.clone()),
            },
            _ => (BigRational::one(), self.clone()),
        }
    }

    /// If the expression is a rational multiple of pi returns the multiple.
    pub fn pi_multiple(&self) -> Option<BigRational> {
        match self {
            Expr::Const(c) if c.is_zero() => Some(BigRational::zero()),
            Expr::Pi => Some(BigRational::one()),
            Expr::Mul(l, r) => match (l.as_ref(), r.as_ref()) {
                (Expr::Const(k), Expr::Pi) => Some(k.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

fn is_sum(e: &Expr) -> bool {
    matches!(e, Expr::Add(_, _) | Expr::Sub(_, _))
}

fn expanded_terms(e: &Expr) -> Vec<(bool, Expr)> {
    let ex = e.expand();
    let mut terms = Vec::new();
    signed_terms(&ex, false, &mut terms);
    terms
}

fn signed_terms(e: &Expr, neg: bool, out: &mut Vec<(bool, Expr)>) {
    match e {
        Expr::Add(l, r) => {
            signed_terms(l, neg, out);
            signed_terms(r, neg, out);
        }
        Expr::Sub(l, r) => {
            signed_terms(l, neg, out);
            signed_terms(r, !neg, out);
        }
        other => out.push((neg, other.clone())),
    }
}

fn collect_signed(terms: Vec<(bool, Expr)>) -> Vec<(bool, Expr)> {
    let rebuilt = rebuild_signed(terms).simplify();
    let mut out = Vec::new();
    signed_terms(&rebuilt, false, &mut out);
    out
}

fn rebuild_signed(terms: Vec<(bool, Expr)>) -> Expr {
    let mut acc: Option<Expr> = None;
    for (neg, t) in terms {
        acc = Some(match acc {
            None => {
                if neg {
                    -t
                } else {
                    t
                }
            }
            Some(a) => {
                if neg {
                    a - t
                } else {
                    a + t
                }
            }
        });
    }
    acc.unwrap_or_else(Expr::zero)
}

//___________________________________SUMS____________________________________

fn flatten_sum(e: &Expr, neg: bool, constant: &mut BigRational, terms: &mut Vec<(Expr, BigRational)>) {
    match e {
        Expr::Add(l, r) => {
            flatten_sum(l, neg, constant, terms);
            flatten_sum(r, neg, constant, terms);
        }
        Expr::Sub(l, r) => {
            flatten_sum(l, neg, constant, terms);
            flatten_sum(r, !neg, constant, terms);
        }
        other => {
            let s = other.simplify_once();
            if is_sum(&s) {
                flatten_simplified_sum(&s, neg, constant, terms);
                return;
            }
            let (coef, body) = s.split_coefficient();
            let coef = if neg { -coef } else { coef };
            if body.is_one() {
                *constant += coef;
            } else {
                push_term(terms, body, coef);
            }
        }
    }
}

// children of an already simplified sum are simplified terms
fn flatten_simplified_sum(
    e: &Expr,
    neg: bool,
    constant: &mut BigRational,
    terms: &mut Vec<(Expr, BigRational)>,
) {
    match e {
        Expr::Add(l, r) => {
            flatten_simplified_sum(l, neg, constant, terms);
            flatten_simplified_sum(r, neg, constant, terms);
        }
        Expr::Sub(l, r) => {
            flatten_simplified_sum(l, neg, constant, terms);
            flatten_simplified_sum(r, !neg, constant, terms);
        }
        other => {
            let (coef, body) = other.split_coefficient();
            let coef = if neg { -coef } else { coef };
            if body.is_one() {
                *constant += coef;
            } else {
                push_term(terms, body, coef);
            }
        }
    }
}

fn push_term(terms: &mut Vec<(Expr, BigRational)>, body: Expr, coef: BigRational) {
    if let Some(existing) = terms.iter_mut().find(|(b, _)| *b == body) {
        existing.1 += coef;
    } else {
        terms.push((body, coef));
    }
}

/// degree used to order the terms of a sum, highest first
fn term_degree(body: &Expr) -> BigRational {
    match body {
        Expr::Const(_) | Expr::Pi | Expr::E => BigRational::zero(),
        Expr::Var(_) => BigRational::one(),
        Expr::Mul(l, r) => term_degree(l) + term_degree(r),
        Expr::Div(l, r) => term_degree(l) - term_degree(r),
        Expr::Pow(base, exp) => match exp.as_rational() {
            Some(e) => term_degree(base) * e,
            None => {
                if base.free_variables().is_empty() && exp.free_variables().is_empty() {
                    BigRational::zero()
                } else {
                    BigRational::one()
                }
            }
        },
        Expr::Add(_, _) | Expr::Sub(_, _) => {
            let mut parts = Vec::new();
            signed_terms(body, false, &mut parts);
            parts
                .iter()
                .map(|(_, t)| term_degree(t))
                .max()
                .unwrap_or_else(BigRational::zero)
        }
        other => {
            if other.free_variables().is_empty() {
                BigRational::zero()
            } else {
                BigRational::one()
            }
        }
    }
}

fn is_monomial(body: &Expr) -> bool {
    match body {
        Expr::Var(_) => true,
        Expr::Pow(base, exp) => matches!(base.as_ref(), Expr::Var(_)) && exp.as_rational().is_some(),
        _ => false,
    }
}

fn compare_terms(a: &Expr, b: &Expr) -> Ordering {
    term_degree(b)
        .cmp(&term_degree(a))
        .then_with(|| is_monomial(b).cmp(&is_monomial(a)))
        .then_with(|| a.cmp(b))
}

fn make_term(coef: BigRational, body: Expr) -> Expr {
    if coef.is_one() {
        body
    } else {
        Expr::Mul(Expr::Const(coef).boxed(), body.boxed())
    }
}

fn simplify_sum(e: &Expr) -> Expr {
    let mut constant = BigRational::zero();
    let mut terms: Vec<(Expr, BigRational)> = Vec::new();
    flatten_sum(e, false, &mut constant, &mut terms);
    terms.retain(|(_, c)| !c.is_zero());
    terms.sort_by(|(a, _), (b, _)| compare_terms(a, b));

    let mut acc: Option<Expr> = None;
    for (body, coef) in terms {
        let negative = coef.is_negative();
        acc = Some(match acc {
            None => make_term(coef, body),
            Some(a) => {
                let term = make_term(coef.abs(), body);
                if negative { a - term } else { a + term }
            }
        });
    }
    match acc {
        None => Expr::Const(constant),
        Some(a) if constant.is_zero() => a,
        Some(a) => {
            if constant.is_negative() {
                a - Expr::Const(-constant)
            } else {
                a + Expr::Const(constant)
            }
        }
    }
}

//___________________________________PRODUCTS____________________________________

/// coefficient times a list of (base, exponent) factors
struct Product {
    coef: BigRational,
    factors: Vec<(Expr, Expr)>,
}

impl Product {
    fn new() -> Self {
        Product { coef: BigRational::one(), factors: Vec::new() }
    }

    fn push(&mut self, base: Expr, exp: Expr) {
        if let Some(existing) = self.factors.iter_mut().find(|(b, _)| *b == base) {
            let summed = match (existing.1.as_rational(), exp.as_rational()) {
                (Some(a), Some(b)) => Expr::Const(a + b),
                _ => Expr::Add(existing.1.clone().boxed(), exp.boxed()).simplify_once(),
            };
            existing.1 = summed;
        } else {
            self.factors.push((base, exp));
        }
    }

    /// multiplies the product by `e^sign`, `e` not yet simplified
    fn absorb(&mut self, e: &Expr, sign: &BigRational) {
        match e {
            Expr::Mul(l, r) => {
                self.absorb(l, sign);
                self.absorb(r, sign);
            }
            Expr::Div(l, r) => {
                self.absorb(l, sign);
                self.absorb(r, &-sign.clone());
            }
            other => {
                let s = other.simplify_once();
                self.absorb_simplified(s, sign);
            }
        }
    }

    fn absorb_simplified(&mut self, s: Expr, sign: &BigRational) {
        match s {
            Expr::Const(c) => {
                if sign.is_positive() {
                    self.coef *= c;
                } else if c.is_zero() {
                    self.push(Expr::Const(c), Expr::Const(sign.clone()));
                } else {
                    self.coef *= c.recip();
                }
            }
            Expr::Mul(l, r) => {
                self.absorb_simplified(*l, sign);
                self.absorb_simplified(*r, sign);
            }
            Expr::Div(l, r) => {
                self.absorb_simplified(*l, sign);
                self.absorb_simplified(*r, &-sign.clone());
            }
            Expr::Pow(base, exp) => {
                let exp = match exp.as_rational().cloned() {
                    Some(r) => Expr::Const(r * sign),
                    None if sign.is_one() => *exp,
                    None => Expr::Mul(Expr::Const(sign.clone()).boxed(), exp).simplify_once(),
                };
                self.push(*base, exp);
            }
            other => self.push(other, Expr::Const(sign.clone())),
        }
    }

    /// folds constant bases and merges exponentials, then rebuilds the expression
    fn build(mut self) -> Expr {
        if self.coef.is_zero() {
            return Expr::zero();
        }
        let mut exp_args: Vec<Expr> = Vec::new();
        let mut kept: Vec<(Expr, Expr)> = Vec::new();
        let mut residual_consts: Vec<(BigRational, BigRational)> = Vec::new();
        for (base, exp) in std::mem::take(&mut self.factors) {
            if exp.is_zero() {
                continue;
            }
            match (&base, exp.as_rational()) {
                (Expr::Const(c), Some(r)) => {
                    let (k, residual) = const_power(c, r);
                    self.coef *= k;
                    if let Some(res) = residual {
                        residual_consts.push(res);
                    }
                }
                (Expr::Exp(arg), Some(r)) => {
                    exp_args.push(Expr::Const(r.clone()) * arg.as_ref().clone());
                }
                _ => kept.push((base, exp)),
            }
        }
        for (c, r) in residual_consts {
            kept.push((Expr::Const(c), Expr::Const(r)));
        }
        if !exp_args.is_empty() {
            let sum = exp_args
                .into_iter()
                .reduce(|a, b| a + b)
                .unwrap_or_else(Expr::zero)
                .simplify_once();
            match simplify_function(Func::Exp, sum) {
                Expr::Const(c) => self.coef *= c,
                other => kept.push((other, Expr::one())),
            }
        }
        if self.coef.is_zero() {
            return Expr::zero();
        }

        let mut numerator: Vec<Expr> = Vec::new();
        let mut denominator: Vec<Expr> = Vec::new();
        kept.sort_by(|(a, _), (b, _)| compare_factors(a, b));
        for (base, exp) in kept {
            match exp.as_rational() {
                Some(r) if r.is_negative() => denominator.push(make_power(base, Expr::Const(-r.clone()))),
                _ => numerator.push(make_power(base, exp)),
            }
        }

        // 2*(x + 1) -> 2*x + 2
        if !self.coef.is_one() && denominator.is_empty() && numerator.len() == 1 && is_sum(&numerator[0]) {
            let mut terms = Vec::new();
            signed_terms(&numerator[0], false, &mut terms);
            let coef = self.coef.clone();
            let distributed = rebuild_signed(
                terms
                    .into_iter()
                    .map(|(neg, t)| (neg, Expr::Const(coef.clone()) * t))
                    .collect(),
            );
            return simplify_sum(&distributed);
        }

        let num = numerator.into_iter().reduce(|a, b| a * b);
        let den = denominator.into_iter().reduce(|a, b| a * b);
        let body = match (num, den) {
            (None, None) => return Expr::Const(self.coef),
            (Some(n), None) => n,
            (None, Some(d)) => Expr::one() / d,
            (Some(n), Some(d)) => n / d,
        };
        make_term(self.coef, body)
    }
}

fn make_power(base: Expr, exp: Expr) -> Expr {
    if exp.is_one() {
        base
    } else {
        Expr::Pow(base.boxed(), exp.boxed())
    }
}

fn factor_rank(e: &Expr) -> u8 {
    match e {
        Expr::Const(_) | Expr::Pi | Expr::E => 0,
        Expr::Var(_) => 1,
        Expr::Pow(b, _) if matches!(b.as_ref(), Expr::Var(_)) => 1,
        Expr::Pow(b, _) if b.free_variables().is_empty() => 0,
        Expr::Add(_, _) | Expr::Sub(_, _) => 2,
        _ => 3,
    }
}

fn compare_factors(a: &Expr, b: &Expr) -> Ordering {
    factor_rank(a).cmp(&factor_rank(b)).then_with(|| a.cmp(b))
}

fn simplify_product(e: &Expr) -> Expr {
    let mut product = Product::new();
    product.absorb(e, &BigRational::one());
    product.build()
}

/// Exact value of `c^r`: a rational factor and, when the power is not rational,
/// a remaining `(base, exponent)` with 0 < exponent < 1 and a square-free base for roots.
fn const_power(c: &BigRational, r: &BigRational) -> (BigRational, Option<(BigRational, BigRational)>) {
    if c.is_one() || r.is_zero() {
        return (BigRational::one(), None);
    }
    if c.is_zero() {
        return if r.is_positive() {
            (BigRational::zero(), None)
        } else {
            (BigRational::one(), Some((c.clone(), r.clone())))
        };
    }
    let int_part = r.floor();
    let frac = r - &int_part;
    let n = match int_part.to_integer().to_i64() {
        Some(n) if n.abs() <= MAX_FOLDED_EXPONENT => n,
        _ => return (BigRational::one(), Some((c.clone(), r.clone()))),
    };
    let mut coef = rational_powi(c, n);
    if frac.is_zero() {
        return (coef, None);
    }
    if c.is_negative() {
        // no real principal root, keep the whole power
        return (BigRational::one(), Some((c.clone(), r.clone())));
    }
    let q = match frac.denom().to_u32() {
        Some(q) => q,
        None => return (coef, Some((c.clone(), frac))),
    };
    let p = match frac.numer().to_i64() {
        Some(p) => p,
        None => return (coef, Some((c.clone(), frac))),
    };
    // c^(p/q) = (c^p)^(1/q)
    let cp = rational_powi(c, p);
    let (a, b) = (cp.numer().clone(), cp.denom().clone());
    let ra = a.nth_root(q);
    let rb = b.nth_root(q);
    if num::pow(ra.clone(), q as usize) == a && num::pow(rb.clone(), q as usize) == b {
        coef *= BigRational::new(ra, rb);
        return (coef, None);
    }
    if q == 2 && p == 1 {
        // sqrt(a/b) = sqrt(a*b)/b, then pull square factors out
        let m = &a * &b;
        let (outside, inside) = extract_square(&m);
        coef *= BigRational::new(outside, b);
        if inside.is_one() {
            return (coef, None);
        }
        return (coef, Some((BigRational::from_integer(inside), ratio(1, 2))));
    }
    (coef, Some((c.clone(), frac)))
}

fn rational_powi(c: &BigRational, n: i64) -> BigRational {
    let powered = num::pow(c.clone(), n.unsigned_abs() as usize);
    if n < 0 { powered.recip() } else { powered }
}

/// m = outside^2 * inside with inside free of small square factors
fn extract_square(m: &BigInt) -> (BigInt, BigInt) {
    let mut outside = BigInt::one();
    let mut inside = m.clone();
    let mut k = BigInt::from(2);
    let limit = BigInt::from(100_000);
    while &k * &k <= inside && k <= limit {
        let sq = &k * &k;
        while (&inside % &sq).is_zero() {
            inside /= &sq;
            outside *= &k;
        }
        k += 1;
    }
    (outside, inside)
}

//___________________________________POWERS____________________________________

fn simplify_power(base: Expr, exp: Expr) -> Expr {
    if exp.is_zero() {
        return Expr::one();
    }
    if exp.is_one() {
        return base;
    }
    if base.is_one() {
        return Expr::one();
    }
    match (&base, exp.as_rational()) {
        (Expr::E, _) => simplify_function(Func::Exp, exp.clone()),
        (Expr::Const(c), Some(r)) => {
            let (k, residual) = const_power(c, r);
            let mut product = Product::new();
            product.coef = k;
            if let Some((b, e)) = residual {
                product.factors.push((Expr::Const(b), Expr::Const(e)));
            }
            product.build()
        }
        (Expr::Pow(inner_base, inner_exp), Some(r)) if r.is_integer() => match inner_exp.as_rational() {
            Some(ie) => simplify_power(inner_base.as_ref().clone(), Expr::Const(ie * r)),
            None => Expr::Pow(base.clone().boxed(), exp.clone().boxed()),
        },
        (Expr::Exp(arg), Some(r)) => simplify_function(Func::Exp, (Expr::Const(r.clone()) * arg.as_ref().clone()).simplify_once()),
        (Expr::Mul(_, _) | Expr::Div(_, _), Some(r)) if r.is_integer() => {
            let mut inner = Product::new();
            inner.absorb_simplified(base.clone(), &BigRational::one());
            let mut powered = Product::new();
            let n = r.to_integer().to_i64().unwrap_or(1);
            powered.coef = rational_powi(&inner.coef, n);
            for (b, e) in inner.factors {
                let e = match e.as_rational() {
                    Some(er) => Expr::Const(er * r),
                    None => Expr::Mul(Expr::Const(r.clone()).boxed(), e.boxed()).simplify_once(),
                };
                powered.push(b, e);
            }
            powered.build()
        }
        _ => {
            // route through the product builder so x^-1 becomes 1/x
            let mut product = Product::new();
            product.push(base.clone(), exp.clone());
            product.build()
        }
    }
}

//___________________________________FUNCTIONS____________________________________

fn sqrt_of(n: i64) -> Expr {
    Expr::Pow(Expr::int(n).boxed(), Expr::Const(ratio(1, 2)).boxed())
}

/// exact sin(k*pi) for k with denominator 1, 2, 3, 4 or 6
fn sin_pi_multiple(k: &BigRational) -> Option<Expr> {
    let two = rat(2);
    // reduce into [0, 2)
    let k = k - &two * (k / &two).floor();
    if k >= BigRational::one() {
        return sin_pi_multiple(&(k - BigRational::one())).map(|v| (-v).simplify());
    }
    let half = ratio(1, 2);
    let k = if k > half { BigRational::one() - k } else { k };
    let value = if k.is_zero() {
        Expr::zero()
    } else if k == ratio(1, 6) {
        Expr::Const(ratio(1, 2))
    } else if k == ratio(1, 4) {
        (Expr::Const(ratio(1, 2)) * sqrt_of(2)).simplify()
    } else if k == ratio(1, 3) {
        (Expr::Const(ratio(1, 2)) * sqrt_of(3)).simplify()
    } else if k == half {
        Expr::one()
    } else {
        return None;
    };
    Some(value)
}

fn cos_pi_multiple(k: &BigRational) -> Option<Expr> {
    sin_pi_multiple(&(k + ratio(1, 2)))
}

fn pi_times(k: BigRational) -> Expr {
    if k.is_zero() {
        Expr::zero()
    } else {
        make_term(k, Expr::Pi)
    }
}

fn inverse_trig_value(func: Func, c: &BigRational) -> Option<Expr> {
    let one = BigRational::one();
    let half = ratio(1, 2);
    let value = match func {
        Func::Arcsin => {
            if c.is_zero() {
                pi_times(BigRational::zero())
            } else if c.abs() == one {
                pi_times(ratio(1, 2) * c)
            } else if c.abs() == half {
                pi_times(ratio(1, 3) * c)
            } else {
                return None;
            }
        }
        Func::Arccos => {
            if c.is_zero() {
                pi_times(ratio(1, 2))
            } else if *c == one {
                Expr::zero()
            } else if *c == -one.clone() {
                Expr::Pi
            } else if *c == half {
                pi_times(ratio(1, 3))
            } else if *c == -half {
                pi_times(ratio(2, 3))
            } else {
                return None;
            }
        }
        Func::Arctg => {
            if c.is_zero() {
                Expr::zero()
            } else if c.abs() == one {
                pi_times(ratio(1, 4) * c)
            } else {
                return None;
            }
        }
        Func::Arcctg => {
            if c.is_zero() {
                pi_times(ratio(1, 2))
            } else if c.abs() == one {
                pi_times(ratio(1, 4) * c)
            } else {
                return None;
            }
        }
        _ => return None,
    };
    Some(value)
}

fn is_odd(func: Func) -> bool {
    matches!(
        func,
        Func::Sin | Func::Tg | Func::Ctg | Func::Arcsin | Func::Arctg | Func::Sinh | Func::Tanh
    )
}

fn is_even(func: Func) -> bool {
    matches!(func, Func::Cos | Func::Cosh)
}

fn simplify_function(func: Func, arg: Expr) -> Expr {
    match func {
        Func::Exp => {
            if arg.is_zero() {
                return Expr::one();
            }
            if arg.is_one() {
                return Expr::E;
            }
            if let Expr::Ln(inner) = &arg {
                return inner.as_ref().clone();
            }
            if let Expr::Mul(l, r) = &arg {
                if let (Expr::Const(c), Expr::Ln(inner)) = (l.as_ref(), r.as_ref()) {
                    return simplify_power(inner.as_ref().clone(), Expr::Const(c.clone()));
                }
            }
        }
        Func::Ln => {
            if arg.is_one() {
                return Expr::zero();
            }
            if arg == Expr::E {
                return Expr::one();
            }
            if let Expr::Exp(inner) = &arg {
                return inner.as_ref().clone();
            }
        }
        Func::Abs => match &arg {
            Expr::Const(c) => return Expr::Const(c.abs()),
            Expr::Pi | Expr::E | Expr::Abs(_) | Expr::Exp(_) => return arg.clone(),
            Expr::Pow(_, e) if e.as_integer().map(|n| n % 2 == 0).unwrap_or(false) => {
                return arg.clone();
            }
            Expr::Mul(l, r) => {
                if let Expr::Const(c) = l.as_ref() {
                    return make_term(c.abs(), simplify_function(Func::Abs, r.as_ref().clone()));
                }
            }
            _ => {}
        },
        Func::Sin | Func::Cos | Func::Tg | Func::Ctg => {
            if let Some(k) = arg.pi_multiple() {
                let value = match func {
                    Func::Sin => sin_pi_multiple(&k),
                    Func::Cos => cos_pi_multiple(&k),
                    Func::Tg => match (sin_pi_multiple(&k), cos_pi_multiple(&k)) {
                        (Some(s), Some(c)) if !c.is_zero() => Some((s / c).simplify()),
                        _ => None,
                    },
                    _ => match (sin_pi_multiple(&k), cos_pi_multiple(&k)) {
                        (Some(s), Some(c)) if !s.is_zero() => Some((c / s).simplify()),
                        _ => None,
                    },
                };
                if let Some(v) = value {
                    return v;
                }
            }
        }
        Func::Arcsin | Func::Arccos | Func::Arctg | Func::Arcctg => {
            if let Expr::Const(c) = &arg {
                if let Some(v) = inverse_trig_value(func, c) {
                    return v;
                }
            }
        }
        Func::Sinh | Func::Tanh => {
            if arg.is_zero() {
                return Expr::zero();
            }
        }
        Func::Cosh => {
            if arg.is_zero() {
                return Expr::one();
            }
        }
    }

    // symmetry: f(-u) = -f(u) for odd f, f(-u) = f(u) for even f
    let (coef, body) = arg.split_coefficient();
    if coef.is_negative() && (is_odd(func) || is_even(func)) {
        let positive = make_term(-coef, body);
        let value = func.apply(positive).simplify_once();
        return if is_odd(func) { (-value).simplify_once() } else { value };
    }
    func.apply(arg)
}
