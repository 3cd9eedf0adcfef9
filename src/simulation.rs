mod coordinator;
pub mod logger;
#[cfg(feature = "par")]
mod parallel;
mod root_coordinator;
pub mod rt;
mod simulator;

pub use coordinator::Coordinator;
pub use logger::{CsvLogger, Logger, MemoryLogger, SharedLogger, StdoutLogger};
#[cfg(feature = "par")]
pub use parallel::ParallelRootCoordinator;
pub use root_coordinator::RootCoordinator;
pub use rt::{InterruptHandler, RealTimeClock, RealTimeRootCoordinator, SteadyClock};
pub use simulator::Simulator;

use crate::{DynRef, SimulationError};

/// Runtime interface shared by simulators (atomic models) and coordinators
/// (coupled models). Operations take the current simulation time.
pub trait AbstractSimulator: DynRef {
    /// Returns the time of the last state transition.
    fn time_last(&self) -> f64;

    /// Returns the time of the next scheduled state transition.
    fn time_next(&self) -> f64;

    /// Assigns model IDs depth-first: `next` for this model, then its children.
    /// Returns the next free model ID.
    fn set_model_id(&mut self, next: usize) -> usize;

    /// Attaches a logger to this simulator and all its children.
    fn set_logger(&mut self, logger: &SharedLogger);

    /// It performs all the tasks needed before the simulation starts.
    fn start(&mut self, time: f64);

    /// It performs all the tasks needed after the simulation stops.
    fn stop(&mut self, time: f64);

    /// It executes the output functions of imminent models and propagates
    /// messages along internal and external output couplings.
    fn collection(&mut self, time: f64) -> Result<(), SimulationError>;

    /// It propagates messages along external input couplings and triggers the
    /// corresponding state transition functions.
    fn transition(&mut self, time: f64) -> Result<(), SimulationError>;

    /// It clears all the ports of the model and its children.
    fn clear(&mut self);
}
