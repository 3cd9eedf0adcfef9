use super::{AbstractSimulator, Coordinator, SharedLogger};
use crate::modeling::{Component, Coupled};
use crate::{with_cell, SimulationError};

/// Top-level driver of sequential simulations.
///
/// The usual workflow is [`RootCoordinator::start`], one of the `simulate_*`
/// methods, and [`RootCoordinator::stop`]:
///
/// ```ignore
/// let mut root = RootCoordinator::new(model);
/// root.start();
/// root.simulate_time(100.)?;
/// root.stop();
/// ```
pub struct RootCoordinator {
    /// Top coordinator of the simulation hierarchy.
    top: Coordinator,
    /// Logger attached to the simulation (if any).
    logger: Option<SharedLogger>,
}

impl RootCoordinator {
    /// Creates a new root coordinator with initial simulation time 0.
    pub fn new(model: Coupled) -> Self {
        Self::new_at(model, 0.)
    }

    /// Creates a new root coordinator with the provided initial simulation time.
    pub fn new_at(model: Coupled, time: f64) -> Self {
        Self {
            top: Coordinator::new(model, time),
            logger: None,
        }
    }

    /// Attaches a logger to the simulation.
    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.top.set_logger(&logger);
        self.logger = Some(logger);
    }

    /// Returns the interface component of the top coupled model.
    pub fn top_component(&self) -> &Component {
        self.top.get_component()
    }

    /// Returns the time of the last simulation cycle.
    #[inline]
    pub fn time_last(&self) -> f64 {
        self.top.time_last()
    }

    /// Returns the time of the next scheduled simulation cycle.
    #[inline]
    pub fn time_next(&self) -> f64 {
        self.top.time_next()
    }

    /// It performs all the tasks needed before simulating: it assigns the model
    /// IDs depth-first, starts the logger, and starts every simulator.
    pub fn start(&mut self) {
        tracing::info!(model = self.top_component().get_id(), "starting simulation");
        if let Some(logger) = &self.logger {
            with_cell(logger, |logger| logger.start());
        }
        self.top.set_model_id(0);
        self.top.start(self.top.time_last());
    }

    /// It performs all the tasks needed after simulating: it stops every
    /// simulator and the logger.
    pub fn stop(&mut self) {
        self.top.stop(self.top.time_last());
        if let Some(logger) = &self.logger {
            with_cell(logger, |logger| logger.stop());
        }
        tracing::info!(model = self.top_component().get_id(), "simulation stopped");
    }

    /// One simulation cycle: log the time, collect outputs, transition, clear.
    pub(crate) fn simulation_advance(&mut self, time: f64) -> Result<(), SimulationError> {
        tracing::debug!(time, "simulation advance");
        if let Some(logger) = &self.logger {
            with_cell(logger, |logger| logger.log_time(time));
        }
        self.top.collection(time)?;
        self.top.transition(time)?;
        self.top.clear();
        Ok(())
    }

    /// Runs the simulation for at most `n_iterations` cycles (or until the
    /// model passivates).
    pub fn simulate_iterations(&mut self, mut n_iterations: usize) -> Result<(), SimulationError> {
        let mut time_next = self.top.time_next();
        while n_iterations > 0 && time_next < f64::INFINITY {
            self.simulation_advance(time_next)?;
            time_next = self.top.time_next();
            n_iterations -= 1;
        }
        Ok(())
    }

    /// Runs the simulation for a given period of virtual time.
    pub fn simulate_time(&mut self, time_interval: f64) -> Result<(), SimulationError> {
        let time_final = self.top.time_last() + time_interval;
        let mut time_next = self.top.time_next();
        while time_next < time_final {
            self.simulation_advance(time_next)?;
            time_next = self.top.time_next();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modeling::{Atomic, Component, OutPort};
    use crate::simulation::MemoryLogger;
    use crate::shared_cell;

    /// Emits its tick count every `period` until `limit` ticks have fired.
    struct Ticker {
        component: Component,
        period: f64,
        limit: usize,
        count: usize,
        output: OutPort<usize>,
    }

    impl Ticker {
        fn new(id: &str, period: f64, limit: usize) -> Self {
            let mut component = Component::new(id);
            let output = component.add_out_port("output").unwrap();
            Self {
                component,
                period,
                limit,
                count: 0,
                output,
            }
        }
    }

    impl Atomic for Ticker {
        fn get_component(&self) -> &Component {
            &self.component
        }
        fn get_component_mut(&mut self) -> &mut Component {
            &mut self.component
        }
        fn lambda(&self) {
            // Safety: adding messages on the model's output port at lambda
            unsafe { self.output.add_value(self.count) };
        }
        fn delta_int(&mut self) {
            self.count += 1;
        }
        fn delta_ext(&mut self, _e: f64) {}
        fn ta(&self) -> f64 {
            match self.count < self.limit {
                true => self.period,
                false => f64::INFINITY,
            }
        }
        fn log_state(&self) -> String {
            self.count.to_string()
        }
    }

    fn tickers() -> Coupled {
        let mut top = Coupled::new("top");
        top.add_component(Ticker::new("fast", 1., 5)).unwrap();
        top.add_component(Ticker::new("slow", 2.5, 2)).unwrap();
        top
    }

    #[test]
    fn test_simulate_time() {
        let log = shared_cell(MemoryLogger::new());
        let mut root = RootCoordinator::new(tickers());
        root.set_logger(log.clone());
        root.start();
        root.simulate_time(f64::INFINITY).unwrap();
        root.stop();

        // fast ticks at 1..=5, slow ticks at 2.5 and 5
        assert_eq!(5., root.time_last());
        assert_eq!(f64::INFINITY, root.time_next());
        crate::with_cell(&log, |log| {
            assert_eq!(vec![1., 2., 2.5, 3., 4., 5.], log.times);
            assert_eq!(7, log.outputs.len());
            let slow: Vec<_> = log
                .outputs
                .iter()
                .filter(|o| o.model_name == "slow")
                .map(|o| o.time)
                .collect();
            assert_eq!(vec![2.5, 5.], slow);
        });
    }

    #[test]
    fn test_simulate_iterations() {
        let mut root = RootCoordinator::new(tickers());
        root.start();
        root.simulate_iterations(3).unwrap();
        // cycles at t = 1, 2, 2.5
        assert_eq!(2.5, root.time_last());
        assert_eq!(3., root.time_next());
        root.simulate_iterations(usize::MAX).unwrap();
        root.stop();
        assert_eq!(f64::INFINITY, root.time_next());
    }

    /// Emits a fixed tag once, at t = 1.
    struct Emitter {
        component: Component,
        tag: i32,
        sigma: f64,
        output: OutPort<i32>,
    }

    impl Emitter {
        fn new(id: &str, tag: i32) -> Self {
            let mut component = Component::new(id);
            let output = component.add_out_port("output").unwrap();
            Self {
                component,
                tag,
                sigma: 1.,
                output,
            }
        }
    }

    impl Atomic for Emitter {
        fn get_component(&self) -> &Component {
            &self.component
        }
        fn get_component_mut(&mut self) -> &mut Component {
            &mut self.component
        }
        fn lambda(&self) {
            // Safety: adding messages on the model's output port at lambda
            unsafe { self.output.add_value(self.tag) };
        }
        fn delta_int(&mut self) {
            self.sigma = f64::INFINITY;
        }
        fn delta_ext(&mut self, _e: f64) {}
        fn ta(&self) -> f64 {
            self.sigma
        }
    }

    /// Records the bag contents it observes on every external transition.
    struct Collector {
        component: Component,
        received: Vec<i32>,
        input: crate::modeling::InPort<i32>,
    }

    impl Collector {
        fn new(id: &str) -> Self {
            let mut component = Component::new(id);
            let input = component.add_in_port("input").unwrap();
            Self {
                component,
                received: Vec::new(),
                input,
            }
        }
    }

    impl Atomic for Collector {
        fn get_component(&self) -> &Component {
            &self.component
        }
        fn get_component_mut(&mut self) -> &mut Component {
            &mut self.component
        }
        fn lambda(&self) {}
        fn delta_int(&mut self) {}
        fn delta_ext(&mut self, _e: f64) {
            // Safety: reading messages on the model's input port at delta_ext
            self.received
                .extend_from_slice(unsafe { self.input.get_values() });
        }
        fn ta(&self) -> f64 {
            f64::INFINITY
        }
        fn log_state(&self) -> String {
            format!("{:?}", self.received)
        }
    }

    /// Within one cycle, the content of a destination bag is the concatenation
    /// of its sources in the order in which the couplings were registered.
    #[test]
    fn test_propagation_order() {
        for reversed in [false, true] {
            let mut top = Coupled::new("top");
            top.add_component(Emitter::new("a", 1)).unwrap();
            top.add_component(Emitter::new("b", 2)).unwrap();
            top.add_component(Collector::new("collector")).unwrap();
            let (first, second) = match reversed {
                false => ("a", "b"),
                true => ("b", "a"),
            };
            top.add_ic(first, "output", "collector", "input").unwrap();
            top.add_ic(second, "output", "collector", "input").unwrap();

            let log = shared_cell(MemoryLogger::new());
            let mut root = RootCoordinator::new(top);
            root.set_logger(log.clone());
            root.start();
            root.simulate_time(10.).unwrap();
            root.stop();

            let expected = match reversed {
                false => "[1, 2]",
                true => "[2, 1]",
            };
            crate::with_cell(&log, |log| {
                let state = log
                    .states
                    .iter()
                    .rev()
                    .find(|s| s.model_name == "collector")
                    .unwrap();
                assert_eq!(expected, state.state);
            });
        }
    }

    /// The time of the next event of a coordinator is always the minimum over
    /// its children, observed in between simulation cycles.
    #[test]
    fn test_min_child_time_next() {
        let mut root = RootCoordinator::new(tickers());
        root.start();
        assert_eq!(1., root.time_next());
        root.simulate_iterations(1).unwrap();
        assert_eq!(2., root.time_next());
        root.simulate_iterations(1).unwrap();
        assert_eq!(2.5, root.time_next());
        root.stop();
    }
}
