use cadmium::blinky::Blinky;
use cadmium::modeling::{Atomic, Component, Coupled, OutPort};
use cadmium::simulation::{MemoryLogger, RootCoordinator};
use cadmium::{shared_cell, with_cell};

/// Emits a `false` pulse at every scheduled time.
struct Pulser {
    component: Component,
    clock: f64,
    schedule: Vec<f64>,
    next: usize,
    output: OutPort<bool>,
}

impl Pulser {
    fn new(id: &str, schedule: Vec<f64>) -> Self {
        let mut component = Component::new(id);
        let output = component.add_out_port("out").unwrap();
        Self {
            component,
            clock: 0.,
            schedule,
            next: 0,
            output,
        }
    }
}

impl Atomic for Pulser {
    fn get_component(&self) -> &Component {
        &self.component
    }
    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }
    fn lambda(&self) {
        // Safety: adding messages on the model's output port at lambda
        unsafe { self.output.add_value(false) };
    }
    fn delta_int(&mut self) {
        self.clock = self.schedule[self.next];
        self.next += 1;
    }
    fn delta_ext(&mut self, _e: f64) {}
    fn ta(&self) -> f64 {
        match self.schedule.get(self.next) {
            Some(&t) => t - self.clock,
            None => f64::INFINITY,
        }
    }
}

/// The light toggles every 0.75 until a pulse switches it to the slow rate
/// (3.0); a second pulse switches it back to the fast rate.
#[test]
fn test_blinky_rate_switching() {
    let mut top = Coupled::new("top");
    top.add_component(Blinky::new("blinky", 0.75, 3.0).unwrap())
        .unwrap();
    top.add_component(Pulser::new("pulser", vec![5., 10.]))
        .unwrap();
    top.add_ic("pulser", "out", "blinky", "in").unwrap();

    let log = shared_cell(MemoryLogger::new());
    let mut root = RootCoordinator::new(top);
    root.set_logger(log.clone());
    root.start();
    root.simulate_time(12.).unwrap();
    root.stop();

    with_cell(&log, |log| {
        let blinks: Vec<(f64, &str)> = log
            .outputs
            .iter()
            .filter(|o| o.model_name == "blinky")
            .map(|o| (o.time, o.message.as_str()))
            .collect();
        let expected = [
            // fast rate from the start
            (0.75, "false"),
            (1.5, "true"),
            (2.25, "false"),
            (3.0, "true"),
            (3.75, "false"),
            (4.5, "true"),
            // pulse at t = 5 switches to the slow rate
            (8.0, "false"),
            // pulse at t = 10 switches back to the fast rate
            (10.75, "true"),
            (11.5, "false"),
        ];
        assert_eq!(expected.len(), blinks.len());
        for ((t, value), (expected_t, expected_value)) in blinks.iter().zip(expected.iter()) {
            assert!((t - expected_t).abs() < 1e-9);
            assert_eq!(value, expected_value);
        }
    });
}
