use super::{AbstractSimulator, Coordinator, SharedLogger, Simulator};
use crate::modeling::component::Component;
use crate::modeling::coupled::{ChildModel, Coupled};
use crate::modeling::port::PortInterface;
use crate::{with_cell, ModelError, Shared, SimulationError};
use rayon::prelude::*;

/// Top-level driver of parallel simulations.
///
/// The model is flattened on construction, so every child of the top coupled
/// model is an atomic model driven by its own simulator. Each simulation cycle
/// runs four phases, and every phase is a parallel iterator that joins before
/// the next phase starts (a full barrier):
///
/// 1. output functions, in parallel over the children;
/// 2. message routing, in parallel over destination ports (the workers write
///    to disjoint destinations, so no locks are needed);
/// 3. transitions and port clearing, in parallel over the children;
/// 4. the next event time, as a parallel min-reduction written by this thread.
///
/// Only the internal couplings of the flat model are routed; its external
/// interface is not consulted while the loop runs.
pub struct ParallelRootCoordinator {
    /// Interface component of the flattened top coupled model.
    component: Component,
    /// One simulator per (atomic) child of the flattened model.
    children: Vec<Box<dyn AbstractSimulator>>,
    /// Internal couplings grouped by destination port.
    stacked_ics: Vec<(Shared<dyn PortInterface>, Vec<Shared<dyn PortInterface>>)>,
    /// Time of the last simulation cycle.
    time_last: f64,
    /// Time of the next scheduled simulation cycle.
    time_next: f64,
    /// Logger attached to the simulation (if any). Calls are serialized by the
    /// mutex inside the shared handle.
    logger: Option<SharedLogger>,
}

impl ParallelRootCoordinator {
    /// Flattens the provided model and builds one simulator per atomic child.
    pub fn new(model: Coupled) -> Result<Self, ModelError> {
        Self::new_at(model, 0.)
    }

    /// Same as [`ParallelRootCoordinator::new`] with an initial simulation time.
    pub fn new_at(mut model: Coupled, time: f64) -> Result<Self, ModelError> {
        model.flatten()?;
        let stacked_ics = model.stacked_ics();
        let Coupled {
            component,
            components,
            ..
        } = model;
        let mut time_next = f64::INFINITY;
        let mut children: Vec<Box<dyn AbstractSimulator>> = Vec::with_capacity(components.len());
        for child in components {
            let simulator: Box<dyn AbstractSimulator> = match child {
                ChildModel::Atomic(atomic) => Box::new(Simulator::new(atomic, time)),
                // a flat model has no coupled children left
                ChildModel::Coupled(coupled) => Box::new(Coordinator::new(coupled, time)),
            };
            time_next = time_next.min(simulator.time_next());
            children.push(simulator);
        }
        Ok(Self {
            component,
            children,
            stacked_ics,
            time_last: time,
            time_next,
            logger: None,
        })
    }

    /// Attaches a logger to the simulation.
    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.children
            .iter_mut()
            .for_each(|child| child.set_logger(&logger));
        self.logger = Some(logger);
    }

    /// Returns the interface component of the flattened top model.
    pub fn top_component(&self) -> &Component {
        &self.component
    }

    /// Returns the time of the last simulation cycle.
    #[inline]
    pub fn time_last(&self) -> f64 {
        self.time_last
    }

    /// Returns the time of the next scheduled simulation cycle.
    #[inline]
    pub fn time_next(&self) -> f64 {
        self.time_next
    }

    /// It performs all the tasks needed before simulating: it assigns the model
    /// IDs depth-first, starts the logger, and starts every simulator.
    pub fn start(&mut self) {
        tracing::info!(
            model = self.component.get_id(),
            children = self.children.len(),
            "starting parallel simulation"
        );
        if let Some(logger) = &self.logger {
            with_cell(logger, |logger| logger.start());
        }
        let mut next = 1;
        for child in self.children.iter_mut() {
            next = child.set_model_id(next);
        }
        let time = self.time_last;
        self.time_next = self
            .children
            .par_iter_mut()
            .map(|child| {
                child.start(time);
                child.time_next()
            })
            .reduce(|| f64::INFINITY, f64::min);
    }

    /// It performs all the tasks needed after simulating: it stops every
    /// simulator and the logger.
    pub fn stop(&mut self) {
        let time = self.time_last;
        self.children
            .par_iter_mut()
            .for_each(|child| child.stop(time));
        self.time_next = f64::INFINITY;
        if let Some(logger) = &self.logger {
            with_cell(logger, |logger| logger.stop());
        }
        tracing::info!(model = self.component.get_id(), "parallel simulation stopped");
    }

    /// One four-phase simulation cycle. Every phase joins before the next one.
    fn simulation_advance(&mut self, time: f64) -> Result<(), SimulationError> {
        if let Some(logger) = &self.logger {
            with_cell(logger, |logger| logger.log_time(time));
        }
        // Phase 1: output functions
        self.children
            .par_iter_mut()
            .try_for_each(|child| child.collection(time))?;
        // Phase 2: message routing, one worker per destination port
        self.stacked_ics.par_iter().try_for_each(|(to, sources)| {
            sources
                .iter()
                .try_for_each(|from| to.propagate(&**from))
                .map_err(SimulationError::from)
        })?;
        // Phase 3: state transitions and port clearing
        self.children.par_iter_mut().try_for_each(|child| {
            child.transition(time)?;
            child.clear();
            Ok::<(), SimulationError>(())
        })?;
        // Phase 4: next event time (single writer between barriers)
        self.time_next = self
            .children
            .par_iter()
            .map(|child| child.time_next())
            .reduce(|| f64::INFINITY, f64::min);
        self.time_last = time;
        Ok(())
    }

    /// Runs the simulation for at most `n_iterations` cycles (or until the
    /// model passivates).
    pub fn simulate_iterations(&mut self, mut n_iterations: usize) -> Result<(), SimulationError> {
        while n_iterations > 0 && self.time_next < f64::INFINITY {
            self.simulation_advance(self.time_next)?;
            n_iterations -= 1;
        }
        Ok(())
    }

    /// Runs the simulation for a given period of virtual time.
    pub fn simulate_time(&mut self, time_interval: f64) -> Result<(), SimulationError> {
        let time_final = self.time_last + time_interval;
        while self.time_next < time_final {
            self.simulation_advance(self.time_next)?;
        }
        Ok(())
    }
}
