use super::{AbstractSimulator, SharedLogger};
use crate::modeling::Atomic;
use crate::{with_cell, SimulationError};

/// Runtime wrapper of an atomic DEVS model. It tracks the last and next event
/// times of the model and mediates its output and transition functions.
pub struct Simulator {
    /// The wrapped atomic model.
    model: Box<dyn Atomic>,
    /// Model ID, assigned depth-first at the beginning of the simulation.
    model_id: usize,
    /// Time of the last state transition.
    time_last: f64,
    /// Time of the next scheduled state transition.
    time_next: f64,
    /// Logger attached to the simulation (if any).
    logger: Option<SharedLogger>,
}

impl Simulator {
    pub(crate) fn new(model: Box<dyn Atomic>, time: f64) -> Self {
        let time_next = time + model.ta();
        Self {
            model,
            model_id: 0,
            time_last: time,
            time_next,
            logger: None,
        }
    }

    /// It logs the current state of the model.
    fn log_state(&self, time: f64) {
        if let Some(logger) = &self.logger {
            with_cell(logger, |logger| {
                logger.log_state(
                    time,
                    self.model_id,
                    self.model.get_component().get_id(),
                    &self.model.log_state(),
                )
            });
        }
    }

    /// It logs every message currently held by the output ports of the model.
    fn log_outputs(&self, time: f64) {
        if let Some(logger) = &self.logger {
            with_cell(logger, |logger| {
                let component = self.model.get_component();
                for port in component.out_ports() {
                    for i in 0..port.len() {
                        if let Some(message) = port.log_message(i) {
                            logger.log_output(
                                time,
                                self.model_id,
                                component.get_id(),
                                port.get_id(),
                                &message,
                            );
                        }
                    }
                }
            });
        }
    }
}

impl AbstractSimulator for Simulator {
    #[inline]
    fn time_last(&self) -> f64 {
        self.time_last
    }

    #[inline]
    fn time_next(&self) -> f64 {
        self.time_next
    }

    fn set_model_id(&mut self, next: usize) -> usize {
        self.model_id = next;
        next + 1
    }

    fn set_logger(&mut self, logger: &SharedLogger) {
        self.logger = Some(logger.clone());
    }

    fn start(&mut self, time: f64) {
        self.model.start();
        self.time_last = time;
        self.time_next = time + self.model.ta();
        self.log_state(time);
    }

    fn stop(&mut self, time: f64) {
        self.model.stop();
        self.time_last = time;
        self.time_next = f64::INFINITY;
        self.log_state(time);
    }

    fn collection(&mut self, time: f64) -> Result<(), SimulationError> {
        if time >= self.time_next {
            self.model.lambda();
        }
        Ok(())
    }

    fn transition(&mut self, time: f64) -> Result<(), SimulationError> {
        let in_empty = self.model.get_component().in_empty();
        let imminent = time >= self.time_next;
        if in_empty && !imminent {
            return Ok(());
        }
        if in_empty {
            self.model.delta_int();
        } else {
            let e = time - self.time_last;
            if e < 0. {
                return Err(SimulationError::NegativeElapsed {
                    model: self.model.get_component().get_id().to_string(),
                    elapsed: e,
                });
            }
            match imminent {
                true => self.model.delta_conf(e),
                false => self.model.delta_ext(e),
            }
        }
        if imminent {
            self.log_outputs(time);
        }
        self.log_state(time);
        self.time_last = time;
        self.time_next = time + self.model.ta();
        Ok(())
    }

    fn clear(&mut self) {
        self.model.get_component_mut().clear_ports();
    }
}
