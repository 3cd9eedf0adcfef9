use super::port::{BigOutPort, InPort, OutPort, PortInterface, PortVal, TypedPort};
use crate::{DynRef, ModelError, Shared};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

/// DEVS component. Every model owns a component that holds its identity and ports.
pub struct Component {
    /// ID of the DEVS component. It must be unique within its parent coupled model.
    id: String,
    /// ID of the parent coupled model (if any). A non-owning back reference.
    parent: Option<String>,
    /// Input ports map. Keys are port IDs; values are indices in `in_ports`.
    in_map: HashMap<String, usize>,
    /// Output ports map. Keys are port IDs; values are indices in `out_ports`.
    out_map: HashMap<String, usize>,
    /// Input port set of the component (serialized, in insertion order).
    in_ports: Vec<Shared<dyn PortInterface>>,
    /// Output port set of the component (serialized, in insertion order).
    out_ports: Vec<Shared<dyn PortInterface>>,
}

impl Component {
    /// It creates a new component with the provided ID.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            parent: None,
            in_map: HashMap::new(),
            out_map: HashMap::new(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
        }
    }

    /// Returns the ID of the component.
    #[inline]
    pub fn get_id(&self) -> &str {
        &self.id
    }

    /// Returns the ID of the parent coupled model (if any).
    #[inline]
    pub fn get_parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub(crate) fn set_parent(&mut self, parent_id: &str) {
        self.parent = Some(parent_id.to_string());
    }

    fn add_port(
        id: &str,
        port: Shared<dyn PortInterface>,
        map: &mut HashMap<String, usize>,
        ports: &mut Vec<Shared<dyn PortInterface>>,
        port_id: &str,
    ) -> Result<(), ModelError> {
        if map.contains_key(port_id) {
            return Err(ModelError::DuplicatePort {
                component: id.to_string(),
                port: port_id.to_string(),
            });
        }
        port.set_parent(id)?;
        map.insert(port_id.to_string(), ports.len());
        ports.push(port);
        Ok(())
    }

    /// Attaches an existing port to the input interface of the component.
    /// It fails if the port already belongs to a component or if the ID is taken.
    pub(crate) fn add_in_port_shared(
        &mut self,
        port: Shared<dyn PortInterface>,
    ) -> Result<(), ModelError> {
        let port_id = port.get_id().to_string();
        Self::add_port(&self.id, port, &mut self.in_map, &mut self.in_ports, &port_id)
    }

    /// Attaches an existing port to the output interface of the component.
    /// It fails if the port already belongs to a component or if the ID is taken.
    pub(crate) fn add_out_port_shared(
        &mut self,
        port: Shared<dyn PortInterface>,
    ) -> Result<(), ModelError> {
        let port_id = port.get_id().to_string();
        Self::add_port(&self.id, port, &mut self.out_map, &mut self.out_ports, &port_id)
    }

    /// Creates a new input port of type `T` and returns a handle to it.
    pub fn add_in_port<T: PortVal>(&mut self, port_id: &str) -> Result<InPort<T>, ModelError> {
        let port = Shared::new(TypedPort::<T>::new(port_id));
        self.add_in_port_shared(port.clone())?;
        Ok(InPort(port))
    }

    /// Creates a new output port of type `T` and returns a handle to it.
    pub fn add_out_port<T: PortVal>(&mut self, port_id: &str) -> Result<OutPort<T>, ModelError> {
        let port = Shared::new(TypedPort::<T>::new(port_id));
        self.add_out_port_shared(port.clone())?;
        Ok(OutPort(port))
    }

    /// Creates a new input big port of type `T` and returns a handle to it.
    /// Big ports store shared handles to immutable payloads.
    pub fn add_in_big_port<T: DynRef + Display>(
        &mut self,
        port_id: &str,
    ) -> Result<InPort<Shared<T>>, ModelError> {
        self.add_in_port::<Shared<T>>(port_id)
    }

    /// Creates a new output big port of type `T` and returns a handle to it.
    /// Big ports store shared handles to immutable payloads.
    pub fn add_out_big_port<T: DynRef + Display>(
        &mut self,
        port_id: &str,
    ) -> Result<BigOutPort<T>, ModelError> {
        let port = Shared::new(TypedPort::<Shared<T>>::new(port_id));
        self.add_out_port_shared(port.clone())?;
        Ok(BigOutPort(port))
    }

    /// Returns a typed handle to an input port with the given ID.
    /// It fails if the port does not exist or holds messages of a different type.
    pub fn get_in_port<T: PortVal>(&self, port_id: &str) -> Result<InPort<T>, ModelError> {
        Self::typed_port(&self.id, self.in_port_handle(port_id)?).map(InPort)
    }

    /// Returns a typed handle to an output port with the given ID.
    /// It fails if the port does not exist or holds messages of a different type.
    pub fn get_out_port<T: PortVal>(&self, port_id: &str) -> Result<OutPort<T>, ModelError> {
        Self::typed_port(&self.id, self.out_port_handle(port_id)?).map(OutPort)
    }

    fn typed_port<T: PortVal>(
        component_id: &str,
        port: Shared<dyn PortInterface>,
    ) -> Result<Shared<TypedPort<T>>, ModelError> {
        if port.as_any().downcast_ref::<TypedPort<T>>().is_none() {
            return Err(ModelError::PortTypeInvalid {
                component: component_id.to_string(),
                port: port.get_id().to_string(),
            });
        }
        // Safety: the downcast above succeeded, so the concrete type is TypedPort<T>
        let raw = Shared::into_raw(port) as *const TypedPort<T>;
        Ok(unsafe { Shared::from_raw(raw) })
    }

    /// Returns an erased handle to an input port with the given ID.
    pub(crate) fn in_port_handle(
        &self,
        port_id: &str,
    ) -> Result<Shared<dyn PortInterface>, ModelError> {
        self.in_map
            .get(port_id)
            .map(|&i| self.in_ports[i].clone())
            .ok_or_else(|| ModelError::PortNotFound {
                component: self.id.clone(),
                port: port_id.to_string(),
            })
    }

    /// Returns an erased handle to an output port with the given ID.
    pub(crate) fn out_port_handle(
        &self,
        port_id: &str,
    ) -> Result<Shared<dyn PortInterface>, ModelError> {
        self.out_map
            .get(port_id)
            .map(|&i| self.out_ports[i].clone())
            .ok_or_else(|| ModelError::PortNotFound {
                component: self.id.clone(),
                port: port_id.to_string(),
            })
    }

    /// Returns `true` if the port is one of the input ports of this component.
    pub(crate) fn contains_in_port(&self, port: &Shared<dyn PortInterface>) -> bool {
        self.in_ports.iter().any(|p| same_port(p, port))
    }

    /// Returns `true` if the port is one of the output ports of this component.
    pub(crate) fn contains_out_port(&self, port: &Shared<dyn PortInterface>) -> bool {
        self.out_ports.iter().any(|p| same_port(p, port))
    }

    /// Returns the serialized input port set.
    pub(crate) fn in_ports(&self) -> &[Shared<dyn PortInterface>] {
        &self.in_ports
    }

    /// Returns the serialized output port set.
    pub(crate) fn out_ports(&self) -> &[Shared<dyn PortInterface>] {
        &self.out_ports
    }

    /// Returns `true` if all the input ports of the component are empty.
    #[inline]
    pub fn in_empty(&self) -> bool {
        self.in_ports.iter().all(|p| p.is_empty())
    }

    /// Returns `true` if all the output ports of the component are empty.
    #[inline]
    pub fn out_empty(&self) -> bool {
        self.out_ports.iter().all(|p| p.is_empty())
    }

    /// It clears all the input and output ports of the component.
    pub fn clear_ports(&mut self) {
        self.in_ports.iter().for_each(|p| p.clear());
        self.out_ports.iter().for_each(|p| p.clear());
    }
}

/// Pointer identity of shared erased ports.
#[inline]
pub(crate) fn same_port(a: &Shared<dyn PortInterface>, b: &Shared<dyn PortInterface>) -> bool {
    std::ptr::eq(
        Shared::as_ptr(a) as *const u8,
        Shared::as_ptr(b) as *const u8,
    )
}

impl Debug for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("in_ports", &self.in_map.keys())
            .field("out_ports", &self.out_map.keys())
            .finish()
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
