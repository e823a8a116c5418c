use bh_types::*;
use std::time::Duration;

struct Shifted {
    name: String,
    dim: usize,
}

impl Objective for Shifted {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        x.iter().map(|v| (v - 1.0).abs()).sum()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("bhsat basic usage example");

    // Parse a descriptor the way gofuncs.api is laid out
    let descriptors = parse_descriptors("shifted_2,2\nshifted_4,4\n")?;
    for descriptor in &descriptors {
        println!("Function: {} (dim {})", descriptor.name(), descriptor.dim());
    }

    let config = SearchConfig::default().with_timeout_secs(5.0).with_seed(1);
    config.validate()?;
    println!("Config: {config}");

    // Evaluate each objective at its starting point and report it as an outcome
    for descriptor in &descriptors {
        let objective = Shifted {
            name: descriptor.name().to_string(),
            dim: descriptor.dim(),
        };
        let start = objective.initial_point();
        let value = objective.evaluate(&start);
        let outcome = SearchOutcome::completed(
            objective.name(),
            value,
            start,
            Duration::from_millis(1),
        );
        println!("{}", outcome.to_csv_line());
    }

    let timeout = SearchOutcome::timed_out("slow_fn", config.timeout(), "deadline reached");
    println!("{}", timeout.to_csv_line());

    Ok(())
}
