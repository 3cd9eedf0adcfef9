use super::Component;
use crate::DynRef;

/// Interface for atomic DEVS models.
///
/// Implementers hold their state as regular struct fields. A common convention
/// is to gather it in a dedicated state struct that implements [`std::fmt::Display`]
/// so that [`Atomic::log_state`] can render it (see the `gpt` module).
pub trait Atomic: DynRef {
    /// Returns a reference to the inner [`Component`] of the model.
    fn get_component(&self) -> &Component;

    /// Returns a mutable reference to the inner [`Component`] of the model.
    fn get_component_mut(&mut self) -> &mut Component;

    /// Output function of the atomic DEVS model.
    /// It reads the state and fills the output ports of the model.
    fn lambda(&self);

    /// Internal transition function of the atomic DEVS model.
    fn delta_int(&mut self);

    /// External transition function of the atomic DEVS model.
    /// `e` corresponds to the elapsed time since the last state transition.
    fn delta_ext(&mut self, e: f64);

    /// Confluent transition function of the atomic DEVS model.
    /// By default, it triggers [`Atomic::delta_int`] and then
    /// [`Atomic::delta_ext`] with elapsed time 0.
    fn delta_conf(&mut self, e: f64) {
        let _ = e;
        self.delta_int();
        self.delta_ext(0.);
    }

    /// Time advance function of the atomic DEVS model.
    /// [`f64::INFINITY`] passivates the model.
    fn ta(&self) -> f64;

    /// Hook executed before the simulation starts.
    fn start(&mut self) {}

    /// Hook executed after the simulation stops.
    fn stop(&mut self) {}

    /// Returns a string representation of the current model state.
    /// Used by loggers only; the kernel never inspects the state itself.
    fn log_state(&self) -> String {
        String::new()
    }
}
