//! The six-step worked solution shown next to the result. Every step is a short
//! caption followed by a display-math LaTeX block, ready for MathJax.

pub const STEP_COUNT: usize = 6;

/// LaTeX pieces the steps are assembled from
#[derive(Debug, Clone, Default)]
pub struct DerivationInput {
    pub function: String,
    pub lower: String,
    pub upper: String,
    pub antiderivative: String,
    pub at_upper: String,
    pub at_lower: String,
    pub exact: String,
    /// floating value of the exact result
    pub approx: f64,
}

/// Fixed order, no branching on the shape of the integrand.
pub fn derivation_steps(input: &DerivationInput) -> [String; STEP_COUNT] {
    let DerivationInput {
        function: f,
        lower: a,
        upper: b,
        antiderivative: big_f,
        at_upper,
        at_lower,
        exact,
        approx,
    } = input;
    [
        format!("1. Identify the function:<br>$$f(x) = {}$$", f),
        format!(
            "2. Write the definite integral:<br>$$\\int_{{{}}}^{{{}}} {} \\, dx$$",
            a, b, f
        ),
        format!("3. Find the antiderivative:<br>$$F(x) = {}$$", big_f),
        format!(
            "4. Apply the Fundamental Theorem of Calculus:<br>$$F({}) - F({})$$",
            b, a
        ),
        format!("5. Evaluate at the bounds:<br>$${} - ({})$$", at_upper, at_lower),
        format!(
            "6. Final result:<br>$$\\boxed{{{}}} \\approx {:.4}$$",
            exact, approx
        ),
    ]
}
