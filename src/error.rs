use std::time::Duration;

/// Errors detected while building or transforming a model.
/// They are fatal: the kernel rejects the offending model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("component {component} already contains a port with id {port}")]
    DuplicatePort { component: String, port: String },
    #[error("port {port} already belongs to component {owner}")]
    PortAlreadyOwned { port: String, owner: String },
    #[error("component {component} does not contain a port with id {port}")]
    PortNotFound { component: String, port: String },
    #[error("port {port} of component {component} does not hold messages of the requested type")]
    PortTypeInvalid { component: String, port: String },
    #[error("coupled model {coupled} already contains a component with id {component}")]
    DuplicateChild { coupled: String, component: String },
    #[error("coupled model {coupled} does not contain a component with id {component}")]
    ChildNotFound { coupled: String, component: String },
    #[error("coupling {from}->{to} is already defined in coupled model {coupled}")]
    DuplicateCoupling {
        coupled: String,
        from: String,
        to: String,
    },
    #[error("ports {from} and {to} hold messages of different types")]
    TypeMismatch { from: String, to: String },
    #[error("coupling endpoint {port} is not reachable from coupled model {coupled}")]
    InvalidCouplingEndpoint { coupled: String, port: String },
}

/// Errors raised while running a simulation. They abort the run.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model {model} received a negative elapsed time ({elapsed})")]
    NegativeElapsed { model: String, elapsed: f64 },
    #[error("wall-clock jitter of {jitter:?} exceeds the configured maximum of {max_jitter:?}")]
    JitterExceeded {
        jitter: Duration,
        max_jitter: Duration,
    },
    #[error("cannot inject an external event into port {port}: {reason}")]
    IncompatiblePort { port: String, reason: String },
}
