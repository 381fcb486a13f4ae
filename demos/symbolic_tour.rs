use RustedIntegral::symbolic::symbolic_engine::Expr;

fn main() {
    println!("=== Parsing ===\n");
    for input in ["2x sin(x)", "(x+1)(x-1)", "x^2/3 + 0.25", "sqrt(1 - x^2)", "e^(2x)"] {
        let f = Expr::parse_expression(input).unwrap();
        println!("{:>16}  ->  {}   LaTeX: {}", input, f.simplify(), f.to_latex());
    }

    println!("\n=== Derivatives ===\n");
    let f = Expr::parse_expression("x^3 ln(x)").unwrap();
    let df = f.diff("x");
    println!("d/dx {} = {}", f.to_latex(), df.to_latex());
    let (norm, ok) = f.compare_num1D("x", 0.5, 3.0, 100, 1e-5);
    println!("analytical vs numerical derivative: max difference {:e}, within tolerance: {}", norm, ok);

    println!("\n=== Antiderivatives ===\n");
    for input in [
        "x^2 + 3x - 1",
        "x cos(x)",
        "1/(x^2 - 1)",
        "(2x+1)/(x^2+x+1)",
        "sin(x)^2",
        "x exp(x^2)",
        "arctan(x)",
        "tan(x)",
    ] {
        let f = Expr::parse_expression(input).unwrap();
        match f.integrate("x") {
            Ok(big_f) => println!("∫ {} dx = {} + C", f.to_latex(), big_f.to_latex()),
            Err(e) => println!("∫ {} dx: {}", f.to_latex(), e),
        }
    }

    println!("\n=== Definite integrals and quadrature ===\n");
    let f = Expr::parse_expression("exp(-x) sin(x)").unwrap();
    let pi = Expr::parse_constant("pi").unwrap();
    let exact = f.definite_integral("x", &Expr::zero(), &pi).unwrap();
    let numeric = f.quad("x", 32, 0.0, std::f64::consts::PI).unwrap();
    println!("∫_0^pi {} dx = {} = {}", f.to_latex(), exact.to_latex(), exact.eval_f64());
    println!("Gauss-Legendre (32 points) = {}", numeric);
    println!("difference = {:e}", (numeric - exact.eval_f64()).abs());

    let f = Expr::parse_expression("1/x^2").unwrap();
    match f.definite_integral("x", &Expr::int(-1), &Expr::int(1)) {
        Ok(v) => println!("∫_-1^1 1/x^2 dx = {}", v),
        Err(e) => println!("∫_-1^1 1/x^2 dx: {}", e),
    }
}
