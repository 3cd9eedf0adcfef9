use crate::{DynRef, ModelError, Shared};
use std::any::Any;
use std::cell::UnsafeCell;
use std::fmt::Display;
use std::sync::OnceLock;

/// Trait constraints of the message types that ports can hold.
pub trait PortVal: DynRef + Clone + Display {}
impl<T: DynRef + Clone + Display> PortVal for T {}

/// Trait implemented by DEVS ports regardless of their message type and direction.
///
/// Message bags live behind [`UnsafeCell`]s. All the methods that touch a bag rely
/// on the simulation cycle discipline: atomic models only write their own output
/// ports inside their output function and only read their own input ports inside
/// their transition functions, while coupled models propagate and clear messages
/// in between. The kernel never hands out two conflicting references to one bag.
pub(crate) trait PortInterface: DynRef {
    /// Returns the ID of the port.
    fn get_id(&self) -> &str;

    /// Returns the ID of the component that owns the port (if any).
    fn get_parent(&self) -> Option<&str>;

    /// Assigns the port to a component. Ports can be assigned only once.
    fn set_parent(&self, component_id: &str) -> Result<(), ModelError>;

    /// Port-to-any conversion (required for message type checks).
    fn as_any(&self) -> &dyn Any;

    /// Returns `true` if the port does not contain any message.
    fn is_empty(&self) -> bool;

    /// Returns the number of messages in the port bag.
    fn len(&self) -> usize;

    /// It clears all the messages in the port bag.
    fn clear(&self);

    /// Returns `true` if the other port holds messages of the same type.
    fn is_compatible(&self, other: &dyn PortInterface) -> bool;

    /// It creates a new unattached port that holds messages of the same type.
    fn new_compatible(&self, port_id: &str) -> Shared<dyn PortInterface>;

    /// It propagates all the messages from `port_from` to this port.
    /// It fails if the ports hold messages of different types.
    fn propagate(&self, port_from: &dyn PortInterface) -> Result<(), ModelError>;

    /// It pushes a type-erased message to the port bag.
    /// It fails if the message type does not match the port message type.
    fn inject_any(&self, value: Box<dyn Any>) -> Result<(), ModelError>;

    /// Returns a string representation of the i-th message of the bag (if any).
    fn log_message(&self, i: usize) -> Option<String>;
}

/// DEVS port with typed messages. It owns the message bag of the port.
#[derive(Debug)]
pub(crate) struct TypedPort<T> {
    /// ID of the port.
    id: String,
    /// ID of the component that owns the port. Set at most once.
    parent: OnceLock<String>,
    /// Message bag of the port.
    bag: UnsafeCell<Vec<T>>,
}

impl<T: PortVal> TypedPort<T> {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            parent: OnceLock::new(),
            bag: UnsafeCell::new(Vec::new()),
        }
    }

    /// Returns a reference to the message bag.
    ///
    /// # Safety
    ///
    /// The caller must hold no mutable reference to the bag (see [`PortInterface`]).
    #[inline(always)]
    pub(crate) unsafe fn borrow(&self) -> &Vec<T> {
        &*self.bag.get()
    }

    /// Returns a mutable reference to the message bag.
    ///
    /// # Safety
    ///
    /// The caller must hold no other reference to the bag (see [`PortInterface`]).
    #[allow(clippy::mut_from_ref)]
    #[inline(always)]
    pub(crate) unsafe fn borrow_mut(&self) -> &mut Vec<T> {
        &mut *self.bag.get()
    }
}

// Safety: the simulation cycle discipline guarantees that bags are never
// accessed concurrently from more than one thread with conflicting references.
#[cfg(feature = "par")]
unsafe impl<T: Send> Send for TypedPort<T> {}
#[cfg(feature = "par")]
unsafe impl<T: Sync> Sync for TypedPort<T> {}

impl<T: PortVal> PortInterface for TypedPort<T> {
    #[inline]
    fn get_id(&self) -> &str {
        &self.id
    }

    #[inline]
    fn get_parent(&self) -> Option<&str> {
        self.parent.get().map(String::as_str)
    }

    fn set_parent(&self, component_id: &str) -> Result<(), ModelError> {
        self.parent
            .set(component_id.to_string())
            .map_err(|_| ModelError::PortAlreadyOwned {
                port: self.id.clone(),
                owner: self.get_parent().unwrap_or_default().to_string(),
            })
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn is_empty(&self) -> bool {
        // Safety: shared bag access outside of the output functions
        unsafe { self.borrow().is_empty() }
    }

    #[inline]
    fn len(&self) -> usize {
        // Safety: shared bag access outside of the output functions
        unsafe { self.borrow().len() }
    }

    #[inline]
    fn clear(&self) {
        // Safety: ports are cleared at the end of the simulation cycle only
        unsafe { self.borrow_mut().clear() };
    }

    #[inline]
    fn is_compatible(&self, other: &dyn PortInterface) -> bool {
        other.as_any().downcast_ref::<TypedPort<T>>().is_some()
    }

    fn new_compatible(&self, port_id: &str) -> Shared<dyn PortInterface> {
        Shared::new(TypedPort::<T>::new(port_id))
    }

    fn propagate(&self, port_from: &dyn PortInterface) -> Result<(), ModelError> {
        let port_from = port_from
            .as_any()
            .downcast_ref::<TypedPort<T>>()
            .ok_or_else(|| ModelError::TypeMismatch {
                from: port_from.get_id().to_string(),
                to: self.id.clone(),
            })?;
        // Safety: couplings never connect a port to itself, so the two bags are
        // disjoint; coupled models propagate messages one destination at a time.
        unsafe { self.borrow_mut().extend_from_slice(port_from.borrow()) };
        Ok(())
    }

    fn inject_any(&self, value: Box<dyn Any>) -> Result<(), ModelError> {
        let value = value
            .downcast::<T>()
            .map_err(|_| ModelError::PortTypeInvalid {
                component: self.get_parent().unwrap_or_default().to_string(),
                port: self.id.clone(),
            })?;
        // Safety: injection happens while the simulation loop is blocked waiting
        unsafe { self.borrow_mut().push(*value) };
        Ok(())
    }

    fn log_message(&self, i: usize) -> Option<String> {
        // Safety: shared bag access outside of the output functions
        unsafe { self.borrow() }.get(i).map(ToString::to_string)
    }
}

/// Input port handle. It only allows reading messages.
#[derive(Debug)]
pub struct InPort<T>(pub(crate) Shared<TypedPort<T>>);

impl<T: PortVal> InPort<T> {
    /// Returns `true` if the underlying bag is empty.
    ///
    /// # Safety
    ///
    /// The caller must be the atomic model that owns this port, and it must only
    /// call this method inside its external or confluent transition functions.
    #[inline(always)]
    pub unsafe fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Returns a reference to the messages of the underlying bag.
    ///
    /// # Safety
    ///
    /// The caller must be the atomic model that owns this port, and it must only
    /// call this method inside its external or confluent transition functions.
    #[inline(always)]
    pub unsafe fn get_values(&self) -> &Vec<T> {
        self.0.borrow()
    }
}

/// Output port handle. It only allows adding messages.
#[derive(Debug)]
pub struct OutPort<T>(pub(crate) Shared<TypedPort<T>>);

impl<T: PortVal> OutPort<T> {
    /// Adds a new message to the output port.
    ///
    /// # Safety
    ///
    /// The caller must be the atomic model that owns this port, and it must only
    /// call this method inside its output function.
    #[inline(always)]
    pub unsafe fn add_value(&self, value: T) {
        self.0.borrow_mut().push(value);
    }

    /// Adds new messages from a slice to the output port.
    ///
    /// # Safety
    ///
    /// The caller must be the atomic model that owns this port, and it must only
    /// call this method inside its output function.
    #[inline(always)]
    pub unsafe fn add_values(&self, values: &[T]) {
        self.0.borrow_mut().extend_from_slice(values);
    }
}

/// Output port handle for big messages. Messages are stored as shared handles to
/// immutable payloads, so propagating them never clones the payload itself.
#[derive(Debug)]
pub struct BigOutPort<T>(pub(crate) Shared<TypedPort<Shared<T>>>);

impl<T: DynRef + Display> BigOutPort<T> {
    /// Wraps a new message in a shared handle and adds it to the output port.
    ///
    /// # Safety
    ///
    /// The caller must be the atomic model that owns this port, and it must only
    /// call this method inside its output function.
    #[inline(always)]
    pub unsafe fn add_value(&self, value: T) {
        self.0.borrow_mut().push(Shared::new(value));
    }

    /// Adds an already-shared message to the output port.
    ///
    /// # Safety
    ///
    /// The caller must be the atomic model that owns this port, and it must only
    /// call this method inside its output function.
    #[inline(always)]
    pub unsafe fn add_shared(&self, value: Shared<T>) {
        self.0.borrow_mut().push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        let a = TypedPort::<i32>::new("a");
        let b = TypedPort::<i32>::new("b");
        let c = TypedPort::<i64>::new("c");
        assert!(a.is_compatible(&b));
        assert!(!a.is_compatible(&c));

        let d = a.new_compatible("d");
        assert!(a.is_compatible(&*d));
        assert_eq!("d", d.get_id());
        assert_eq!(None, d.get_parent());
    }

    #[test]
    fn test_propagation() {
        let from = TypedPort::<i32>::new("from");
        let to = TypedPort::<i32>::new("to");
        unsafe { to.borrow_mut().push(0) };
        unsafe { from.borrow_mut().extend_from_slice(&[1, 2]) };

        to.propagate(&from).unwrap();
        assert_eq!(&vec![0, 1, 2], unsafe { to.borrow() });
        assert_eq!(3, to.len());
        assert_eq!(Some("2".to_string()), to.log_message(2));
        assert_eq!(None, to.log_message(3));

        let bad = TypedPort::<bool>::new("bad");
        assert_eq!(
            Err(ModelError::TypeMismatch {
                from: "from".to_string(),
                to: "bad".to_string()
            }),
            bad.propagate(&from)
        );

        to.clear();
        assert!(to.is_empty());
    }

    #[test]
    fn test_big_port_shares_payloads() {
        let from = TypedPort::<Shared<String>>::new("from");
        let to = TypedPort::<Shared<String>>::new("to");
        let msg = Shared::new("a big message".to_string());
        unsafe { from.borrow_mut().push(msg.clone()) };

        to.propagate(&from).unwrap();
        // both bags hold handles to the very same payload
        assert_eq!(3, Shared::strong_count(&msg));
        assert_eq!(Some("a big message".to_string()), to.log_message(0));
    }

    #[test]
    fn test_parent() {
        let port = TypedPort::<i32>::new("port");
        port.set_parent("component_a").unwrap();
        assert_eq!(Some("component_a"), port.get_parent());
        assert_eq!(
            Err(ModelError::PortAlreadyOwned {
                port: "port".to_string(),
                owner: "component_a".to_string(),
            }),
            port.set_parent("component_b")
        );
    }

    #[test]
    fn test_injection() {
        let port = TypedPort::<i32>::new("port");
        port.inject_any(Box::new(42)).unwrap();
        assert!(port.inject_any(Box::new("nope".to_string())).is_err());
        assert_eq!(&vec![42], unsafe { port.borrow() });
    }
}
