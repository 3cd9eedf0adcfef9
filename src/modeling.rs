pub mod atomic;
pub mod component;
pub mod coupled;
pub mod port;

pub use atomic::Atomic;
pub use component::Component;
pub use coupled::Coupled;
pub use port::{BigOutPort, InPort, OutPort, PortVal};
