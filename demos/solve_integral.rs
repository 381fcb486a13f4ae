use RustedIntegral::integral::error::CalculationError;
use RustedIntegral::integral::pipeline::{CalculationRequest, IntegralPipeline};

fn main() {
    println!("=== Definite integrals through the calculation pipeline ===\n");
    let pipeline = IntegralPipeline::default();

    let problems = [
        ("x^2", "0", "2"),
        ("sin(x)", "0", "pi"),
        ("x e^x", "0", "1"),
        ("1/(1+x^2)", "-1", "1"),
        ("1/sqrt(x)", "0", "4"),
        ("ln(x)", "0", "1"),
        ("1/x", "-1", "1"),
        ("x", "3", "1"),
    ];

    for (function, lower, upper) in problems {
        let request = CalculationRequest::new(function, lower, upper);
        println!("∫ {} dx on [{}, {}]", function, lower, upper);
        match pipeline.calculate(&request) {
            Ok(response) => {
                println!("  exact: {}", response.latex_result);
                println!("  value: {}", response.result);
                for step in &response.steps {
                    println!("    {}", step.replace("<br>", " "));
                }
                let plot = &response.plot_data;
                println!(
                    "  curve: {} points on [{:.3}, {:.3}], area: {} points\n",
                    plot.x.len(),
                    plot.x[0],
                    plot.x[plot.x.len() - 1],
                    plot.x_area.len()
                );
            }
            Err(e @ CalculationError::Computation(_)) => {
                println!("  computation failed ({}): {}\n", e.status_code(), e)
            }
            Err(e) => println!("  rejected ({}): {}\n", e.status_code(), e),
        }
    }
}
