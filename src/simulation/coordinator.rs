use super::{AbstractSimulator, SharedLogger, Simulator};
use crate::modeling::component::Component;
use crate::modeling::coupled::{ChildModel, Coupled, Coupling};
use crate::SimulationError;

/// Runtime wrapper of a coupled DEVS model. It recursively drives the
/// simulators of its children and routes messages along the couplings.
pub struct Coordinator {
    /// Model ID, assigned depth-first at the beginning of the simulation.
    model_id: usize,
    /// Time of the last state transition.
    time_last: f64,
    /// Time of the next scheduled state transition (minimum over the children).
    time_next: f64,
    /// Interface component of the coupled model.
    component: Component,
    /// External input couplings (in insertion order).
    eics: Vec<Coupling>,
    /// Internal couplings (in insertion order).
    ics: Vec<Coupling>,
    /// External output couplings (in insertion order).
    eocs: Vec<Coupling>,
    /// Child simulators (in insertion order).
    children: Vec<Box<dyn AbstractSimulator>>,
}

impl Coordinator {
    /// Builds the simulation hierarchy for a coupled model. The model graph is
    /// consumed: every atomic descendant ends up owned by its simulator.
    pub(crate) fn new(coupled: Coupled, time: f64) -> Self {
        let Coupled {
            component,
            components,
            eics,
            ics,
            eocs,
            ..
        } = coupled;
        let mut time_next = f64::INFINITY;
        let mut children: Vec<Box<dyn AbstractSimulator>> = Vec::with_capacity(components.len());
        for child in components {
            let simulator: Box<dyn AbstractSimulator> = match child {
                ChildModel::Atomic(atomic) => Box::new(Simulator::new(atomic, time)),
                ChildModel::Coupled(coupled) => Box::new(Coordinator::new(coupled, time)),
            };
            time_next = time_next.min(simulator.time_next());
            children.push(simulator);
        }
        Self {
            model_id: 0,
            time_last: time,
            time_next,
            component,
            eics,
            ics,
            eocs,
            children,
        }
    }

    /// Returns the interface component of the coupled model.
    pub fn get_component(&self) -> &Component {
        &self.component
    }
}

impl AbstractSimulator for Coordinator {
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
        let mut next = next + 1;
        for child in self.children.iter_mut() {
            next = child.set_model_id(next);
        }
        next
    }

    fn set_logger(&mut self, logger: &SharedLogger) {
        self.children
            .iter_mut()
            .for_each(|child| child.set_logger(logger));
    }

    fn start(&mut self, time: f64) {
        self.time_last = time;
        let mut time_next = f64::INFINITY;
        for child in self.children.iter_mut() {
            child.start(time);
            time_next = time_next.min(child.time_next());
        }
        self.time_next = time_next;
    }

    fn stop(&mut self, time: f64) {
        self.children.iter_mut().for_each(|child| child.stop(time));
        self.time_last = time;
        self.time_next = f64::INFINITY;
    }

    /// If the model is imminent, it collects the outputs of every child (in
    /// insertion order) and then propagates messages along the internal and
    /// external output couplings (in insertion order).
    fn collection(&mut self, time: f64) -> Result<(), SimulationError> {
        if time >= self.time_next {
            for child in self.children.iter_mut() {
                child.collection(time)?;
            }
            for (from, to) in self.ics.iter().chain(&self.eocs) {
                to.propagate(&**from)?;
            }
        }
        Ok(())
    }

    /// It propagates messages along the external input couplings and then
    /// recursively triggers the transitions of every child, recomputing the
    /// next event time as the minimum over the children.
    fn transition(&mut self, time: f64) -> Result<(), SimulationError> {
        for (from, to) in self.eics.iter() {
            to.propagate(&**from)?;
        }
        self.time_last = time;
        let mut time_next = f64::INFINITY;
        for child in self.children.iter_mut() {
            child.transition(time)?;
            time_next = time_next.min(child.time_next());
        }
        self.time_next = time_next;
        Ok(())
    }

    fn clear(&mut self) {
        self.children.iter_mut().for_each(|child| child.clear());
        self.component.clear_ports();
    }
}
