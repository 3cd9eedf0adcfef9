use cadmium::devstone::{HI, HO, HOmod, LI};
use cadmium::simulation::RootCoordinator;
use std::env;
use std::time::Instant;

/// USAGE:
/// `cargo run --example devstone <MODEL_TYPE> <WIDTH> <DEPTH> [INT_DELAY] [EXT_DELAY]`
/// - `<MODEL_TYPE>` must be `LI`, `HI`, `HO`, or `HOmod`.
/// - `<WIDTH>` and `<DEPTH>` must be equal to or greater than 1.
/// - `[INT_DELAY]` and `[EXT_DELAY]` are optional transition delays (in ms).
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let model_type = args
        .get(1)
        .expect("first argument must select the model type")
        .to_lowercase();
    let width = args
        .get(2)
        .expect("second argument must select the width")
        .parse()
        .expect("width could not be parsed");
    let depth = args
        .get(3)
        .expect("third argument must select the depth")
        .parse()
        .expect("depth could not be parsed");
    let int_delay = args.get(4).map_or(0, |d| d.parse().expect("int delay"));
    let ext_delay = args.get(5).map_or(0, |d| d.parse().expect("ext delay"));

    let start = Instant::now();
    let coupled = match model_type.as_str() {
        "li" => LI::create(width, depth, int_delay, ext_delay),
        "hi" => HI::create(width, depth, int_delay, ext_delay),
        "ho" => HO::create(width, depth, int_delay, ext_delay),
        "homod" => HOmod::create(width, depth, int_delay, ext_delay),
        _ => panic!("unknown DEVStone model type"),
    }
    .expect("DEVStone model could not be built");
    println!("Model creation time: {:?}", start.elapsed());

    let start = Instant::now();
    let mut root = RootCoordinator::new(coupled);
    println!("Simulator creation time: {:?}", start.elapsed());

    let start = Instant::now();
    root.start();
    root.simulate_time(f64::INFINITY)
        .expect("simulation failed");
    root.stop();
    println!("Simulation time: {:?}", start.elapsed());
}
