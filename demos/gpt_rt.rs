use cadmium::gpt::Gpt;
use cadmium::shared_cell;
use cadmium::simulation::{RealTimeRootCoordinator, StdoutLogger, SteadyClock};
use std::env;
use std::time::Duration;

/// USAGE:
/// `cargo run --example gpt_rt [TIME_SCALE] [MAX_JITTER_MS]`
/// - `[TIME_SCALE]` maps virtual seconds to wall seconds (default 1).
/// - `[MAX_JITTER_MS]` aborts the run if the wall clock drifts further (default 10).
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let time_scale = args.get(1).map_or(1., |s| s.parse().expect("time scale"));
    let max_jitter = args.get(2).map_or(10, |j| j.parse().expect("max jitter"));

    let gpt = Gpt::create("gpt", 3., 1., 50.).expect("model could not be built");
    let clock = SteadyClock::new()
        .with_time_scale(time_scale)
        .with_max_jitter(Duration::from_millis(max_jitter));

    let mut root = RealTimeRootCoordinator::new(gpt, clock);
    root.set_logger(shared_cell(StdoutLogger));
    root.start();
    root.simulate_time(f64::INFINITY).expect("simulation failed");
    root.stop();
}
