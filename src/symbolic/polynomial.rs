//! Univariate polynomials with exact rational coefficients.
//!
//! Used by the integrator for polynomial integrands and for rational functions
//! `N(x)/D(x)`: long division, rational root search and partial fractions.
use crate::symbolic::symbolic_engine::{Expr, rational_to_f64};
use num::{BigInt, BigRational, Integer, One, Signed, ToPrimitive, Zero};

/// largest |a0| or |an| for which rational root candidates are enumerated
const MAX_ROOT_SEARCH: u64 = 1_000_000;
/// largest integer exponent expanded by `from_expr`
const MAX_EXPANDED_POWER: i64 = 64;

#[derive(Clone, Debug, PartialEq)]
pub struct Poly {
    /// coeffs[i] multiplies x^i, no trailing zeros
    coeffs: Vec<BigRational>,
}

/// One term of a partial fraction decomposition.
#[derive(Clone, Debug, PartialEq)]
pub enum PartialFraction {
    /// coef / (x - root)^power
    Linear {
        coef: BigRational,
        root: BigRational,
        power: usize,
    },
    /// (b x + c) / quad, `quad` monic quadratic without rational roots
    Quadratic {
        b: BigRational,
        c: BigRational,
        quad: Poly,
    },
}

/// N/D = polynomial + sum of fractions
#[derive(Clone, Debug, PartialEq)]
pub struct Decomposition {
    pub polynomial: Poly,
    pub fractions: Vec<PartialFraction>,
}

impl Poly {
    pub fn new(mut coeffs: Vec<BigRational>) -> Poly {
        while coeffs.last().is_some_and(|c| c.is_zero()) {
            coeffs.pop();
        }
        Poly { coeffs }
    }

    pub fn zero() -> Poly {
        Poly { coeffs: Vec::new() }
    }

    pub fn constant(c: BigRational) -> Poly {
        Poly::new(vec![c])
    }

    pub fn x() -> Poly {
        Poly::new(vec![BigRational::zero(), BigRational::one()])
    }

    pub fn from_i64(coeffs: &[i64]) -> Poly {
        Poly::new(
            coeffs
                .iter()
                .map(|&c| BigRational::from_integer(BigInt::from(c)))
                .collect(),
        )
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn coeff(&self, i: usize) -> BigRational {
        self.coeffs.get(i).cloned().unwrap_or_else(BigRational::zero)
    }

    pub fn coefficients(&self) -> &[BigRational] {
        &self.coeffs
    }

    pub fn leading(&self) -> BigRational {
        self.coeffs.last().cloned().unwrap_or_else(BigRational::zero)
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let n = self.coeffs.len().max(other.coeffs.len());
        Poly::new((0..n).map(|i| self.coeff(i) + other.coeff(i)).collect())
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        let n = self.coeffs.len().max(other.coeffs.len());
        Poly::new((0..n).map(|i| self.coeff(i) - other.coeff(i)).collect())
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        if self.is_zero() || other.is_zero() {
            return Poly::zero();
        }
        let mut out = vec![BigRational::zero(); self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Poly::new(out)
    }

    pub fn scale(&self, k: &BigRational) -> Poly {
        Poly::new(self.coeffs.iter().map(|c| c * k).collect())
    }

    pub fn pow(&self, n: u32) -> Poly {
        let mut out = Poly::constant(BigRational::one());
        for _ in 0..n {
            out = out.mul(self);
        }
        out
    }

    /// Long division; None when dividing by the zero polynomial.
    pub fn div_rem(&self, divisor: &Poly) -> Option<(Poly, Poly)> {
        if divisor.is_zero() {
            return None;
        }
        let mut rem = self.clone();
        let d = divisor.degree();
        let lead = divisor.leading();
        let mut quot = vec![BigRational::zero(); self.coeffs.len().saturating_sub(d).max(1)];
        while !rem.is_zero() && rem.degree() >= d {
            let shift = rem.degree() - d;
            let factor = rem.leading() / &lead;
            quot[shift] = factor.clone();
            let mut term = vec![BigRational::zero(); shift];
            term.extend(divisor.coeffs.iter().map(|c| c * &factor));
            rem = rem.sub(&Poly::new(term));
        }
        Some((Poly::new(quot), rem))
    }

    pub fn derivative(&self) -> Poly {
        Poly::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, c)| c * BigRational::from_integer(BigInt::from(i)))
                .collect(),
        )
    }

    /// antiderivative with zero constant term
    pub fn integrate(&self) -> Poly {
        let mut out = vec![BigRational::zero()];
        for (i, c) in self.coeffs.iter().enumerate() {
            out.push(c / BigRational::from_integer(BigInt::from(i + 1)));
        }
        Poly::new(out)
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + rational_to_f64(c))
    }

    pub fn eval_rational(&self, x: &BigRational) -> BigRational {
        self.coeffs
            .iter()
            .rev()
            .fold(BigRational::zero(), |acc, c| acc * x + c)
    }

    pub fn monic(&self) -> Poly {
        if self.is_zero() {
            return Poly::zero();
        }
        self.scale(&(BigRational::one() / self.leading()))
    }

    /// Polynomial as a simplified expression in `var`.
    pub fn to_expr(&self, var: &str) -> Expr {
        if self.is_zero() {
            return Expr::zero();
        }
        let x = Expr::var(var);
        let mut terms = self
            .coeffs
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, c)| !c.is_zero())
            .map(|(i, c)| {
                let power = match i {
                    0 => Expr::one(),
                    1 => x.clone(),
                    _ => x.clone().pow(Expr::int(i as i64)),
                };
                Expr::Const(c.clone()) * power
            });
        let first = terms.next().unwrap_or_else(Expr::zero);
        terms.fold(first, |acc, t| acc + t).simplify()
    }

    /// Reads `e` as a polynomial in `var`; None if it is not one with rational coefficients.
    pub fn from_expr(e: &Expr, var: &str) -> Option<Poly> {
        match e {
            Expr::Var(name) if name == var => Some(Poly::x()),
            Expr::Var(_) | Expr::Pi | Expr::E => None,
            Expr::Const(c) => Some(Poly::constant(c.clone())),
            Expr::Add(l, r) => Some(Poly::from_expr(l, var)?.add(&Poly::from_expr(r, var)?)),
            Expr::Sub(l, r) => Some(Poly::from_expr(l, var)?.sub(&Poly::from_expr(r, var)?)),
            Expr::Mul(l, r) => Some(Poly::from_expr(l, var)?.mul(&Poly::from_expr(r, var)?)),
            Expr::Div(l, r) => {
                let den = Poly::from_expr(r, var)?;
                if den.is_zero() || den.degree() > 0 {
                    return None;
                }
                Some(Poly::from_expr(l, var)?.scale(&(BigRational::one() / den.leading())))
            }
            Expr::Pow(base, exp) => {
                let n = exp.as_integer()?;
                if !(0..=MAX_EXPANDED_POWER).contains(&n) {
                    return None;
                }
                Some(Poly::from_expr(base, var)?.pow(n as u32))
            }
            _ => None,
        }
    }

    /// Distinct rational roots (rational root theorem on the integer-scaled polynomial).
    pub fn rational_roots(&self) -> Vec<BigRational> {
        let mut roots = Vec::new();
        if self.degree() == 0 {
            return roots;
        }
        let mut p = self.clone();
        // x = 0
        while p.coeff(0).is_zero() && !p.is_zero() {
            if !roots.contains(&BigRational::zero()) {
                roots.push(BigRational::zero());
            }
            p = Poly::new(p.coeffs[1..].to_vec());
        }
        if p.degree() == 0 {
            return roots;
        }
        let ints = p.integer_coefficients();
        let (Some(a0), Some(an)) = (
            ints.first().and_then(|c| c.abs().to_u64()),
            ints.last().and_then(|c| c.abs().to_u64()),
        ) else {
            return roots;
        };
        if a0 > MAX_ROOT_SEARCH || an > MAX_ROOT_SEARCH {
            return roots;
        }
        for num in divisors(a0) {
            for den in divisors(an) {
                for sign in [1i64, -1] {
                    let candidate = BigRational::new(
                        BigInt::from(num) * BigInt::from(sign),
                        BigInt::from(den),
                    );
                    if !roots.contains(&candidate) && p.eval_rational(&candidate).is_zero() {
                        roots.push(candidate);
                    }
                }
            }
        }
        roots.sort();
        roots
    }

    /// coefficients multiplied by the lcm of their denominators
    fn integer_coefficients(&self) -> Vec<BigInt> {
        let lcm = self
            .coeffs
            .iter()
            .fold(BigInt::one(), |acc, c| acc.lcm(c.denom()));
        self.coeffs
            .iter()
            .map(|c| (c * BigRational::from_integer(lcm.clone())).to_integer())
            .collect()
    }

    /// Splits off the rational roots with their multiplicities; the rest is returned monic.
    pub fn factor_rational_roots(&self) -> (Vec<(BigRational, usize)>, Poly) {
        let mut rest = self.monic();
        let mut factors = Vec::new();
        for root in self.rational_roots() {
            let linear = Poly::new(vec![-root.clone(), BigRational::one()]);
            let mut multiplicity = 0;
            while let Some((q, r)) = rest.div_rem(&linear) {
                if !r.is_zero() {
                    break;
                }
                rest = q;
                multiplicity += 1;
            }
            if multiplicity > 0 {
                factors.push((root, multiplicity));
            }
        }
        (factors, rest)
    }
}

fn divisors(n: u64) -> Vec<u64> {
    if n == 0 {
        return vec![];
    }
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut i = 1;
    while i * i <= n {
        if n % i == 0 {
            small.push(i);
            if i * i != n {
                large.push(n / i);
            }
        }
        i += 1;
    }
    small.extend(large.into_iter().rev());
    small
}

/// Gaussian elimination over the rationals; None for singular systems.
pub fn solve_linear(mut a: Vec<Vec<BigRational>>, mut b: Vec<BigRational>) -> Option<Vec<BigRational>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).find(|&r| !a[r][col].is_zero())?;
        a.swap(col, pivot);
        b.swap(col, pivot);
        let p = a[col][col].clone();
        for row in 0..n {
            if row == col || a[row][col].is_zero() {
                continue;
            }
            let factor = &a[row][col] / &p;
            for k in col..n {
                let delta = &factor * &a[col][k];
                a[row][k] -= delta;
            }
            let delta = &factor * &b[col];
            b[row] -= delta;
        }
    }
    Some((0..n).map(|i| &b[i] / &a[i][i]).collect())
}

/// Partial fraction decomposition of `num/den`.
///
/// Supported denominators: products of rational linear factors (any multiplicity)
/// times at most one quadratic factor without rational roots. None otherwise.
pub fn partial_fractions(num: &Poly, den: &Poly) -> Option<Decomposition> {
    if den.is_zero() {
        return None;
    }
    let (polynomial, rem) = num.div_rem(den)?;
    let lead = den.leading();
    let den = den.monic();
    let rem = rem.scale(&(BigRational::one() / lead));
    let (linear, rest) = den.factor_rational_roots();
    let quadratic = match rest.degree() {
        0 => None,
        2 => Some(rest),
        _ => return None,
    };
    if rem.is_zero() {
        return Some(Decomposition { polynomial, fractions: vec![] });
    }

    // basis polynomials den / factor, one unknown each
    let mut basis: Vec<Poly> = Vec::new();
    let mut shapes: Vec<(usize, usize)> = Vec::new(); // (linear index, power) or quadratic marker
    for (idx, (root, mult)) in linear.iter().enumerate() {
        let factor = Poly::new(vec![-root.clone(), BigRational::one()]);
        for k in 1..=*mult {
            let (q, r) = den.div_rem(&factor.pow(k as u32))?;
            if !r.is_zero() {
                return None;
            }
            basis.push(q);
            shapes.push((idx, k));
        }
    }
    if let Some(quad) = &quadratic {
        let (q, r) = den.div_rem(quad)?;
        if !r.is_zero() {
            return None;
        }
        basis.push(q.mul(&Poly::x()));
        shapes.push((usize::MAX, 1));
        basis.push(q);
        shapes.push((usize::MAX, 0));
    }
    let n = den.degree();
    if basis.len() != n {
        return None;
    }
    let matrix: Vec<Vec<BigRational>> = (0..n)
        .map(|row| basis.iter().map(|p| p.coeff(row)).collect())
        .collect();
    let rhs: Vec<BigRational> = (0..n).map(|row| rem.coeff(row)).collect();
    let solution = solve_linear(matrix, rhs)?;

    let mut fractions = Vec::new();
    let mut quad_b = BigRational::zero();
    let mut quad_c = BigRational::zero();
    for ((idx, k), value) in shapes.into_iter().zip(solution) {
        if idx == usize::MAX {
            if k == 1 {
                quad_b = value;
            } else {
                quad_c = value;
            }
        } else if !value.is_zero() {
            fractions.push(PartialFraction::Linear {
                coef: value,
                root: linear[idx].0.clone(),
                power: k,
            });
        }
    }
    if let Some(quad) = quadratic {
        if !(quad_b.is_zero() && quad_c.is_zero()) {
            fractions.push(PartialFraction::Quadratic { b: quad_b, c: quad_c, quad });
        }
    }
    Some(Decomposition { polynomial, fractions })
}

impl PartialFraction {
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            PartialFraction::Linear { coef, root, power } => {
                rational_to_f64(coef) / (x - rational_to_f64(root)).powi(*power as i32)
            }
            PartialFraction::Quadratic { b, c, quad } => {
                (rational_to_f64(b) * x + rational_to_f64(c)) / quad.eval(x)
            }
        }
    }
}

/// true if the number is a positive perfect square of a rational
pub fn is_rational_square(c: &BigRational) -> bool {
    if c.is_negative() {
        return false;
    }
    let n = c.numer().sqrt();
    let d = c.denom().sqrt();
    &(&n * &n) == c.numer() && &(&d * &d) == c.denom()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn r(p: i64, q: i64) -> BigRational {
        BigRational::new(BigInt::from(p), BigInt::from(q))
    }

    #[test]
    fn test_arithmetic_and_division() {
        let p = Poly::from_i64(&[-1, 0, 1]); // x^2 - 1
        let d = Poly::from_i64(&[-1, 1]); // x - 1
        let (q, rem) = p.div_rem(&d).unwrap();
        assert_eq!(q, Poly::from_i64(&[1, 1]));
        assert!(rem.is_zero());
        assert_eq!(d.mul(&q), p);
        let (q, rem) = Poly::from_i64(&[1, 0, 0, 1]).div_rem(&Poly::from_i64(&[1, 0, 1])).unwrap();
        assert_eq!(q, Poly::from_i64(&[0, 1]));
        assert_eq!(rem, Poly::from_i64(&[1, -1]));
        assert!(p.div_rem(&Poly::zero()).is_none());
    }

    #[test]
    fn test_calculus() {
        let p = Poly::from_i64(&[0, 0, 1]);
        assert_eq!(p.integrate(), Poly::new(vec![r(0, 1), r(0, 1), r(0, 1), r(1, 3)]));
        assert_eq!(p.integrate().derivative(), p);
        assert_relative_eq!(p.integrate().eval(2.0), 8.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_from_and_to_expr() {
        let x = Expr::var("x");
        let e = (x.clone() + Expr::one()).pow(Expr::int(2)) / Expr::int(2);
        let p = Poly::from_expr(&e, "x").unwrap();
        assert_eq!(p, Poly::new(vec![r(1, 2), r(1, 1), r(1, 2)]));
        assert_relative_eq!(p.to_expr("x").eval_expression("x", 3.0), 8.0, epsilon = 1e-12);
        assert!(Poly::from_expr(&Expr::sin(x.clone().boxed()), "x").is_none());
        assert!(Poly::from_expr(&(Expr::one() / x), "x").is_none());
    }

    #[test]
    fn test_rational_roots() {
        // (2x - 1)(x + 3) x
        let p = Poly::from_i64(&[0, -3, 5, 2]);
        assert_eq!(p.rational_roots(), vec![r(-3, 1), r(0, 1), r(1, 2)]);
        assert!(Poly::from_i64(&[1, 0, 1]).rational_roots().is_empty());
        let (factors, rest) = Poly::from_i64(&[1, -2, 1]).factor_rational_roots();
        assert_eq!(factors, vec![(r(1, 1), 2)]);
        assert_eq!(rest.degree(), 0);
    }

    #[test]
    fn test_partial_fractions() {
        // 1/(x^2 - 1) = 1/2/(x-1) - 1/2/(x+1)
        let d = partial_fractions(&Poly::from_i64(&[1]), &Poly::from_i64(&[-1, 0, 1])).unwrap();
        assert!(d.polynomial.is_zero());
        assert_eq!(d.fractions.len(), 2);
        for x in [0.3, 2.5, -4.0] {
            let sum: f64 = d.fractions.iter().map(|f| f.eval(x)).sum();
            assert_relative_eq!(sum, 1.0 / (x * x - 1.0), epsilon = 1e-12);
        }
        // (x^3 + 2)/(x (x^2 + 1)) has a polynomial part and a quadratic factor
        let num = Poly::from_i64(&[2, 0, 0, 1]);
        let den = Poly::from_i64(&[0, 1, 0, 1]);
        let d = partial_fractions(&num, &den).unwrap();
        for x in [0.7, -1.9] {
            let sum: f64 = d.polynomial.eval(x) + d.fractions.iter().map(|f| f.eval(x)).sum::<f64>();
            assert_relative_eq!(sum, (x * x * x + 2.0) / (x * x * x + x), epsilon = 1e-12);
        }
        // repeated root
        let d = partial_fractions(&Poly::from_i64(&[0, 1]), &Poly::from_i64(&[1, 2, 1])).unwrap();
        for x in [0.5, 3.0] {
            let sum: f64 = d.fractions.iter().map(|f| f.eval(x)).sum();
            assert_relative_eq!(sum, x / ((x + 1.0) * (x + 1.0)), epsilon = 1e-12);
        }
        // quartic without rational roots is out of reach
        assert!(partial_fractions(&Poly::from_i64(&[1]), &Poly::from_i64(&[2, 0, 0, 0, 1])).is_none());
    }

    #[test]
    fn test_rational_square() {
        assert!(is_rational_square(&r(9, 4)));
        assert!(!is_rational_square(&r(2, 1)));
        assert!(!is_rational_square(&r(-4, 1)));
    }
}
