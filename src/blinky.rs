//! Blinky toggle model: a light that alternates on and off, switching between
//! a fast and a slow toggle rate whenever it receives a `false` input.

use crate::modeling::{Atomic, Component, InPort, OutPort};
use crate::ModelError;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
struct BlinkyState {
    sigma: f64,
    light_on: bool,
    fast_toggle: bool,
}

impl Display for BlinkyState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "status: {}, sigma: {}", self.light_on, self.sigma)
    }
}

pub struct Blinky {
    component: Component,
    fast_toggle_time: f64,
    slow_toggle_time: f64,
    state: BlinkyState,
    input: InPort<bool>,
    output: OutPort<bool>,
}

impl Blinky {
    /// Creates a new Blinky model. It starts toggling at the fast rate with the
    /// light off.
    pub fn new(
        id: &str,
        fast_toggle_time: f64,
        slow_toggle_time: f64,
    ) -> Result<Self, ModelError> {
        let mut component = Component::new(id);
        let input = component.add_in_port("in")?;
        let output = component.add_out_port("out")?;
        Ok(Self {
            component,
            fast_toggle_time,
            slow_toggle_time,
            state: BlinkyState {
                sigma: fast_toggle_time,
                light_on: false,
                fast_toggle: true,
            },
            input,
            output,
        })
    }
}

impl Atomic for Blinky {
    fn get_component(&self) -> &Component {
        &self.component
    }

    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn lambda(&self) {
        // Safety: adding messages on the model's output port at lambda
        unsafe { self.output.add_value(self.state.light_on) };
    }

    fn delta_int(&mut self) {
        self.state.light_on = !self.state.light_on;
    }

    fn delta_ext(&mut self, _e: f64) {
        // Safety: reading messages on the model's input port at delta_ext
        let received = unsafe { self.input.get_values() };
        if !received.is_empty() {
            // every false input toggles the rate
            for x in received {
                if !x {
                    self.state.fast_toggle = !self.state.fast_toggle;
                }
            }
            self.state.sigma = match self.state.fast_toggle {
                true => self.fast_toggle_time,
                false => self.slow_toggle_time,
            };
        }
    }

    fn ta(&self) -> f64 {
        self.state.sigma
    }

    fn log_state(&self) -> String {
        self.state.to_string()
    }
}
