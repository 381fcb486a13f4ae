use num::{BigInt, BigRational};

/// `num_values` evenly spaced values from `start` to `end`, both ends included
pub fn linspace(start: f64, end: f64, num_values: usize) -> Vec<f64> {
    if num_values == 1 {
        return vec![start];
    }
    let mut values = Vec::with_capacity(num_values);
    let step = (end - start) / (num_values as f64 - 1.0);

    for i in 0..num_values {
        let value = start + (i as f64 * step);
        values.push(value);
    }
    // hit the right end exactly
    if let Some(last) = values.last_mut() {
        *last = end;
    }
    values
}

/// Best rational approximation of `x` with denominator not above `max_den`
/// (continued fractions). Returns None when no such fraction is within `tol`.
pub fn rationalize(x: f64, max_den: i64, tol: f64) -> Option<BigRational> {
    if !x.is_finite() {
        return None;
    }
    let (mut h0, mut h1): (i64, i64) = (0, 1);
    let (mut k0, mut k1): (i64, i64) = (1, 0);
    let mut rest = x;
    for _ in 0..40 {
        let a = rest.floor();
        if a.abs() > 1e15 {
            break;
        }
        let a = a as i64;
        let h2 = a.checked_mul(h1)?.checked_add(h0)?;
        let k2 = a.checked_mul(k1)?.checked_add(k0)?;
        if k2 > max_den {
            break;
        }
        (h0, h1) = (h1, h2);
        (k0, k1) = (k1, k2);
        let approx = h1 as f64 / k1 as f64;
        if (approx - x).abs() <= tol * x.abs().max(1.0) {
            return Some(BigRational::new(BigInt::from(h1), BigInt::from(k1)));
        }
        let frac = rest - a as f64;
        if frac.abs() < 1e-15 {
            break;
        }
        rest = 1.0 / frac;
    }
    if k1 > 0 && ((h1 as f64 / k1 as f64) - x).abs() <= tol * x.abs().max(1.0) {
        return Some(BigRational::new(BigInt::from(h1), BigInt::from(k1)));
    }
    None
}

/// Bisection on a bracketing interval, `f(a)` and `f(b)` of opposite sign.
pub fn bisection<F: Fn(f64) -> f64>(f: F, mut a: f64, mut b: f64, iterations: usize) -> f64 {
    let mut fa = f(a);
    for _ in 0..iterations {
        let mid = 0.5 * (a + b);
        if mid <= a || mid >= b {
            break;
        }
        let fm = f(mid);
        if fm == 0.0 {
            return mid;
        }
        if fm.is_nan() {
            // a NaN inside the bracket behaves like a sign change
            b = mid;
            continue;
        }
        if (fa < 0.0) == (fm < 0.0) {
            a = mid;
            fa = fm;
        } else {
            b = mid;
        }
    }
    0.5 * (a + b)
}

/// Golden-section search for a minimum of `f` on `[a, b]`.
pub fn golden_section_min<F: Fn(f64) -> f64>(f: F, mut a: f64, mut b: f64, iterations: usize) -> (f64, f64) {
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    for _ in 0..iterations {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = f(d);
        }
    }
    let x = 0.5 * (a + b);
    (x, f(x))
}

/// Central-difference derivative at every point of `x_values`.
pub fn numerical_derivative<F>(f: F, x_values: &[f64], h: f64) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    x_values
        .iter()
        .map(|&x| (f(x + h) - f(x - h)) / (2.0 * h))
        .collect()
}

/// Prints a float with `digits` significant digits the way SymPy prints `evalf()`
/// results: fixed notation for moderate exponents ("2.66666666666667"),
/// scientific notation otherwise ("1.00000000000000e-20").
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "oo".to_string() } else { "-oo".to_string() };
    }
    let digits = digits.max(1);
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };
    if (-5..15).contains(&exponent) {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{:.*}", decimals, value);
        if decimals == 0 { format!("{}.", fixed) } else { fixed }
    } else {
        let sign = if exponent < 0 { "-" } else { "+" };
        format!("{}e{}{}", mantissa, sign, exponent.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_ends() {
        let v = linspace(-1.0, 3.0, 200);
        assert_eq!(v.len(), 200);
        assert_eq!(v[0], -1.0);
        assert_eq!(v[199], 3.0);
        assert_relative_eq!(v[1] - v[0], 4.0 / 199.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rationalize() {
        let r = rationalize(2.0 / 3.0, 1000, 1e-12).unwrap();
        assert_eq!(r, BigRational::new(BigInt::from(2), BigInt::from(3)));
        let r = rationalize(-1.25, 1000, 1e-12).unwrap();
        assert_eq!(r, BigRational::new(BigInt::from(-5), BigInt::from(4)));
        assert!(rationalize(std::f64::consts::PI, 100, 1e-12).is_none());
    }

    #[test]
    fn test_bisection_and_golden() {
        let root = bisection(|x| x * x - 2.0, 0.0, 2.0, 80);
        assert_relative_eq!(root, 2f64.sqrt(), epsilon = 1e-12);
        let (xmin, fmin) = golden_section_min(|x| (x - 0.3).powi(2), 0.0, 1.0, 100);
        assert_relative_eq!(xmin, 0.3, epsilon = 1e-6);
        assert!(fmin < 1e-12);
    }

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(8.0 / 3.0, 15), "2.66666666666667");
        assert_eq!(format_significant(2.0, 15), "2.00000000000000");
        assert_eq!(format_significant(-0.5, 15), "-0.500000000000000");
        assert_eq!(format_significant(0.0, 15), "0");
        assert_eq!(format_significant(1e-20, 15), "1.00000000000000e-20");
        assert_eq!(format_significant(1.5e20, 15), "1.50000000000000e+20");
    }

    #[test]
    fn test_numerical_derivative() {
        let d = numerical_derivative(|x| x * x, &[1.0, 2.0], 1e-5);
        assert_relative_eq!(d[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(d[1], 4.0, epsilon = 1e-6);
    }
}
