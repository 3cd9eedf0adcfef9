pub mod blinky;
pub mod devstone;
mod error;
pub mod gpt;
pub mod modeling;
pub mod simulation;

pub use error::{ModelError, SimulationError};

/// Helper trait for avoiding verbose trait constraints.
#[cfg(not(feature = "par"))]
pub trait DynRef: 'static {}
/// Helper trait for avoiding verbose trait constraints.
#[cfg(feature = "par")]
pub trait DynRef: 'static + Sync + Send {}

#[cfg(not(feature = "par"))]
impl<T: 'static + ?Sized> DynRef for T {}
#[cfg(feature = "par")]
impl<T: 'static + Sync + Send + ?Sized> DynRef for T {}

/// Shared ownership handle used throughout the kernel (and for big port messages).
#[cfg(not(feature = "par"))]
pub type Shared<T> = std::rc::Rc<T>;
/// Shared ownership handle used throughout the kernel (and for big port messages).
#[cfg(feature = "par")]
pub type Shared<T> = std::sync::Arc<T>;

/// Shared handle with interior mutability. Sequential simulations use
/// `Rc<RefCell<T>>`; parallel simulations use the mutex-guarded `Arc<Mutex<T>>`.
#[cfg(not(feature = "par"))]
pub type SharedCell<T> = std::rc::Rc<std::cell::RefCell<T>>;
/// Shared handle with interior mutability. Sequential simulations use
/// `Rc<RefCell<T>>`; parallel simulations use the mutex-guarded `Arc<Mutex<T>>`.
#[cfg(feature = "par")]
pub type SharedCell<T> = std::sync::Arc<std::sync::Mutex<T>>;

/// Wraps a value in a [`SharedCell`].
pub fn shared_cell<T>(value: T) -> SharedCell<T> {
    #[cfg(not(feature = "par"))]
    {
        std::rc::Rc::new(std::cell::RefCell::new(value))
    }
    #[cfg(feature = "par")]
    {
        std::sync::Arc::new(std::sync::Mutex::new(value))
    }
}

/// Runs a closure over an exclusive borrow of the value in a [`SharedCell`].
pub fn with_cell<T: ?Sized, R>(cell: &SharedCell<T>, f: impl FnOnce(&mut T) -> R) -> R {
    #[cfg(not(feature = "par"))]
    {
        f(&mut *cell.borrow_mut())
    }
    #[cfg(feature = "par")]
    {
        f(&mut *cell.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
    }
}
