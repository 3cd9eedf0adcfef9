use cadmium::gpt::{Efp, Gpt};
use cadmium::simulation::{RootCoordinator, StdoutLogger};
use cadmium::shared_cell;
use std::env;

/// USAGE:
/// `cargo run --example gpt_efp [MODEL_TYPE] [FLATTEN]`
/// - `[MODEL_TYPE]` must be `gpt` (default) or `efp`.
/// - pass `flatten` as second argument to flatten the model before simulating.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let model_type = args.get(1).map_or("gpt".to_string(), |m| m.to_lowercase());
    let flatten = args.get(2).is_some_and(|f| f == "flatten");

    let job_period = 3.;
    let processing_time = 1.;
    let obs_time = 50.;

    let mut coupled = match model_type.as_str() {
        "gpt" => Gpt::create("gpt", job_period, processing_time, obs_time),
        "efp" => Efp::create("efp", job_period, processing_time, obs_time),
        _ => panic!("unknown model type. It must be either \"gpt\" or \"efp\""),
    }
    .expect("model could not be built");
    if flatten {
        coupled.flatten().expect("model could not be flattened");
    }

    let mut root = RootCoordinator::new(coupled);
    root.set_logger(shared_cell(StdoutLogger));
    root.start();
    root.simulate_time(f64::INFINITY).expect("simulation failed");
    root.stop();
}
