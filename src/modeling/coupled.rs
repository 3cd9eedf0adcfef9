use super::component::same_port;
use super::port::{BigOutPort, InPort, OutPort, PortInterface, PortVal};
use super::{Atomic, Component};
use crate::{DynRef, ModelError, Shared};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Directed coupling between two ports: (source, destination).
pub(crate) type Coupling = (Shared<dyn PortInterface>, Shared<dyn PortInterface>);

/// Couplings indexed by destination port: {to: [from_1, from_2, ...]}.
pub(crate) type CouplingsMap = HashMap<PortKey, Vec<Shared<dyn PortInterface>>>;

/// Hashable wrapper over shared ports. Identity is pointer identity.
#[derive(Clone)]
pub(crate) struct PortKey(pub(crate) Shared<dyn PortInterface>);

impl Hash for PortKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Shared::as_ptr(&self.0) as *const u8 as usize).hash(state);
    }
}

impl PartialEq for PortKey {
    fn eq(&self, other: &Self) -> bool {
        same_port(&self.0, &other.0)
    }
}

impl Eq for PortKey {}

/// A subcomponent of a coupled model: either an atomic or a nested coupled model.
pub(crate) enum ChildModel {
    Atomic(Box<dyn Atomic>),
    Coupled(Coupled),
}

impl ChildModel {
    pub(crate) fn get_component(&self) -> &Component {
        match self {
            Self::Atomic(atomic) => atomic.get_component(),
            Self::Coupled(coupled) => &coupled.component,
        }
    }

    pub(crate) fn get_component_mut(&mut self) -> &mut Component {
        match self {
            Self::Atomic(atomic) => atomic.get_component_mut(),
            Self::Coupled(coupled) => &mut coupled.component,
        }
    }
}

/// Coupled DEVS model.
pub struct Coupled {
    /// Component wrapped by the coupled model. It owns the interface ports.
    pub(crate) component: Component,
    /// Components map. Keys are component IDs; values are indices in `components`.
    pub(crate) comp_map: HashMap<String, usize>,
    /// Subcomponents of the coupled model (serialized, in insertion order).
    pub(crate) components: Vec<ChildModel>,
    /// External input couplings (serialized, in insertion order).
    pub(crate) eics: Vec<Coupling>,
    /// Internal couplings (serialized, in insertion order).
    pub(crate) ics: Vec<Coupling>,
    /// External output couplings (serialized, in insertion order).
    pub(crate) eocs: Vec<Coupling>,
    /// External input couplings indexed by destination port.
    pub(crate) eic_map: CouplingsMap,
    /// Internal couplings indexed by destination port.
    pub(crate) ic_map: CouplingsMap,
    /// External output couplings indexed by destination port.
    pub(crate) eoc_map: CouplingsMap,
}

impl Coupled {
    /// Creates a new coupled DEVS model with the provided ID.
    pub fn new(id: &str) -> Self {
        Self {
            component: Component::new(id),
            comp_map: HashMap::new(),
            components: Vec::new(),
            eics: Vec::new(),
            ics: Vec::new(),
            eocs: Vec::new(),
            eic_map: HashMap::new(),
            ic_map: HashMap::new(),
            eoc_map: HashMap::new(),
        }
    }

    /// Returns the ID of the coupled model.
    #[inline]
    pub fn get_id(&self) -> &str {
        self.component.get_id()
    }

    /// Returns the number of subcomponents of the coupled model.
    #[inline]
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Returns the number of external input couplings of the coupled model.
    #[inline]
    pub fn n_eics(&self) -> usize {
        self.eics.len()
    }

    /// Returns the number of internal couplings of the coupled model.
    #[inline]
    pub fn n_ics(&self) -> usize {
        self.ics.len()
    }

    /// Returns the number of external output couplings of the coupled model.
    #[inline]
    pub fn n_eocs(&self) -> usize {
        self.eocs.len()
    }

    /// Creates a new input port of type `T` and returns a handle to it.
    #[inline]
    pub fn add_in_port<T: PortVal>(&mut self, port_id: &str) -> Result<InPort<T>, ModelError> {
        self.component.add_in_port(port_id)
    }

    /// Creates a new output port of type `T` and returns a handle to it.
    #[inline]
    pub fn add_out_port<T: PortVal>(&mut self, port_id: &str) -> Result<OutPort<T>, ModelError> {
        self.component.add_out_port(port_id)
    }

    /// Creates a new input big port of type `T` and returns a handle to it.
    #[inline]
    pub fn add_in_big_port<T: DynRef + Display>(
        &mut self,
        port_id: &str,
    ) -> Result<InPort<Shared<T>>, ModelError> {
        self.component.add_in_big_port(port_id)
    }

    /// Creates a new output big port of type `T` and returns a handle to it.
    #[inline]
    pub fn add_out_big_port<T: DynRef + Display>(
        &mut self,
        port_id: &str,
    ) -> Result<BigOutPort<T>, ModelError> {
        self.component.add_out_big_port(port_id)
    }

    /// Adds a new atomic subcomponent to the coupled model.
    /// It fails if there is already a subcomponent with the same ID.
    pub fn add_component<T: Atomic>(&mut self, component: T) -> Result<(), ModelError> {
        self.add_child(ChildModel::Atomic(Box::new(component)))
    }

    /// Adds a nested coupled subcomponent to the coupled model.
    /// It fails if there is already a subcomponent with the same ID.
    pub fn add_coupled(&mut self, coupled: Coupled) -> Result<(), ModelError> {
        self.add_child(ChildModel::Coupled(coupled))
    }

    fn add_child(&mut self, mut child: ChildModel) -> Result<(), ModelError> {
        let child_id = child.get_component().get_id().to_string();
        if self.comp_map.contains_key(&child_id) {
            return Err(ModelError::DuplicateChild {
                coupled: self.get_id().to_string(),
                component: child_id,
            });
        }
        child
            .get_component_mut()
            .set_parent(self.component.get_id());
        self.comp_map.insert(child_id, self.components.len());
        self.components.push(child);
        Ok(())
    }

    /// Returns a reference to the subcomponent with the provided ID.
    pub(crate) fn get_child(&self, component_id: &str) -> Result<&ChildModel, ModelError> {
        self.comp_map
            .get(component_id)
            .map(|&i| &self.components[i])
            .ok_or_else(|| ModelError::ChildNotFound {
                coupled: self.get_id().to_string(),
                component: component_id.to_string(),
            })
    }

    fn check_compatible(
        from: &Shared<dyn PortInterface>,
        to: &Shared<dyn PortInterface>,
    ) -> Result<(), ModelError> {
        if !to.is_compatible(&**from) {
            return Err(ModelError::TypeMismatch {
                from: qualified(from),
                to: qualified(to),
            });
        }
        Ok(())
    }

    /// Registers a coupling in a destination-indexed map.
    /// It fails if the (from, to) pair is already present.
    fn add_coupling_to_map(
        coupled_id: &str,
        map: &mut CouplingsMap,
        from: &Shared<dyn PortInterface>,
        to: &Shared<dyn PortInterface>,
    ) -> Result<(), ModelError> {
        let sources = map.entry(PortKey(to.clone())).or_default();
        if sources.iter().any(|p| same_port(p, from)) {
            return Err(ModelError::DuplicateCoupling {
                coupled: coupled_id.to_string(),
                from: qualified(from),
                to: qualified(to),
            });
        }
        sources.push(from.clone());
        Ok(())
    }

    /// Adds a new external input coupling to the model. You must provide the
    /// input port ID of the coupled model, the receiving subcomponent ID, and
    /// its input port ID. It fails if an endpoint does not exist, if the ports
    /// are not compatible, or if the coupling is already defined.
    pub fn add_eic(
        &mut self,
        port_from: &str,
        component_to: &str,
        port_to: &str,
    ) -> Result<(), ModelError> {
        let from = self.component.in_port_handle(port_from)?;
        let to = self
            .get_child(component_to)?
            .get_component()
            .in_port_handle(port_to)?;
        Self::check_compatible(&from, &to)?;
        let id = self.get_id().to_string();
        Self::add_coupling_to_map(&id, &mut self.eic_map, &from, &to)?;
        self.eics.push((from, to));
        Ok(())
    }

    /// Adds a new internal coupling to the model. You must provide the sending
    /// subcomponent ID, its output port ID, the receiving subcomponent ID, and
    /// its input port ID. It fails if an endpoint does not exist, if the ports
    /// are not compatible, or if the coupling is already defined.
    pub fn add_ic(
        &mut self,
        component_from: &str,
        port_from: &str,
        component_to: &str,
        port_to: &str,
    ) -> Result<(), ModelError> {
        let from = self
            .get_child(component_from)?
            .get_component()
            .out_port_handle(port_from)?;
        let to = self
            .get_child(component_to)?
            .get_component()
            .in_port_handle(port_to)?;
        Self::check_compatible(&from, &to)?;
        let id = self.get_id().to_string();
        Self::add_coupling_to_map(&id, &mut self.ic_map, &from, &to)?;
        self.ics.push((from, to));
        Ok(())
    }

    /// Adds a new external output coupling to the model. You must provide the
    /// sending subcomponent ID, its output port ID, and the output port ID of
    /// the coupled model. It fails if an endpoint does not exist, if the ports
    /// are not compatible, or if the coupling is already defined.
    pub fn add_eoc(
        &mut self,
        component_from: &str,
        port_from: &str,
        port_to: &str,
    ) -> Result<(), ModelError> {
        let from = self
            .get_child(component_from)?
            .get_component()
            .out_port_handle(port_from)?;
        let to = self.component.out_port_handle(port_to)?;
        Self::check_compatible(&from, &to)?;
        let id = self.get_id().to_string();
        Self::add_coupling_to_map(&id, &mut self.eoc_map, &from, &to)?;
        self.eocs.push((from, to));
        Ok(())
    }

    /// Adds an external input coupling, creating the origin port on demand: if
    /// the coupled model does not own an input port with the provided ID yet, a
    /// port compatible with the destination is added to its input interface.
    pub fn add_dynamic_eic(
        &mut self,
        port_from: &str,
        component_to: &str,
        port_to: &str,
    ) -> Result<(), ModelError> {
        if self.component.in_port_handle(port_from).is_err() {
            let to = self
                .get_child(component_to)?
                .get_component()
                .in_port_handle(port_to)?;
            self.component
                .add_in_port_shared(to.new_compatible(port_from))?;
        }
        self.add_eic(port_from, component_to, port_to)
    }

    /// Adds an external output coupling, creating the destination port on
    /// demand: if the coupled model does not own an output port with the
    /// provided ID yet, a port compatible with the origin is added to its
    /// output interface.
    pub fn add_dynamic_eoc(
        &mut self,
        component_from: &str,
        port_from: &str,
        port_to: &str,
    ) -> Result<(), ModelError> {
        if self.component.out_port_handle(port_to).is_err() {
            let from = self
                .get_child(component_from)?
                .get_component()
                .out_port_handle(port_from)?;
            self.component
                .add_out_port_shared(from.new_compatible(port_to))?;
        }
        self.add_eoc(component_from, port_from, port_to)
    }

    /// Returns the internal couplings grouped by destination port, in the order
    /// in which each destination first appears in the serialized coupling list.
    /// Source ports keep their registration order within each group.
    #[cfg(any(test, feature = "par"))]
    pub(crate) fn stacked_ics(&self) -> Vec<(Shared<dyn PortInterface>, Vec<Shared<dyn PortInterface>>)> {
        let mut stacked: Vec<(Shared<dyn PortInterface>, Vec<Shared<dyn PortInterface>>)> =
            Vec::new();
        for (from, to) in &self.ics {
            match stacked.iter_mut().find(|(dst, _)| same_port(dst, to)) {
                Some((_, sources)) => sources.push(from.clone()),
                None => stacked.push((to.clone(), vec![from.clone()])),
            }
        }
        stacked
    }

    /// Flattens the coupled model: after this call, all the transitive atomic
    /// descendants are direct subcomponents of this model and the couplings are
    /// rewritten to connect them directly.
    pub fn flatten(&mut self) -> Result<(), ModelError> {
        let children = std::mem::take(&mut self.components);
        self.comp_map.clear();
        for child in children {
            match child {
                ChildModel::Coupled(mut coupled) => {
                    coupled.flatten()?;
                    self.absorb(coupled)?;
                }
                atomic => self.add_child(atomic)?,
            }
        }
        // rebuild the destination-indexed maps; duplicates must fail
        self.eic_map = self.deserialize_couplings(&self.eics)?;
        self.ic_map = self.deserialize_couplings(&self.ics)?;
        self.eoc_map = self.deserialize_couplings(&self.eocs)?;
        self.check_local_endpoints()?;
        Ok(())
    }

    /// Hoists the children of an already-flat coupled subcomponent into this
    /// model, rewriting the couplings that traverse its interface. Exactly two
    /// couplings sharing an interface port of the absorbed child combine into one.
    fn absorb(&mut self, child: Coupled) -> Result<(), ModelError> {
        let Coupled {
            component: k_component,
            components: k_children,
            eics: k_eics,
            ics: k_ics,
            eocs: k_eocs,
            ..
        } = child;

        // left rewrites: couplings arriving at an input port of the child chain
        // with the child EICs leaving from that same port
        let mut new_eics = Vec::new();
        let mut new_ics = Vec::new();
        let mut new_eocs = Vec::new();
        for (from, to) in &self.eics {
            if k_component.contains_in_port(to) {
                for (k_from, k_to) in &k_eics {
                    if same_port(k_from, to) {
                        new_eics.push((from.clone(), k_to.clone()));
                    }
                }
            }
        }
        for (from, to) in &self.ics {
            if k_component.contains_in_port(to) {
                for (k_from, k_to) in &k_eics {
                    if same_port(k_from, to) {
                        new_ics.push((from.clone(), k_to.clone()));
                    }
                }
            }
        }
        // right rewrites: child EOCs chain with couplings leaving from an output
        // port of the child
        for (from, to) in &self.ics {
            if k_component.contains_out_port(from) {
                for (k_from, k_to) in &k_eocs {
                    if same_port(k_to, from) {
                        new_ics.push((k_from.clone(), to.clone()));
                    }
                }
            }
        }
        for (from, to) in &self.eocs {
            if k_component.contains_out_port(from) {
                for (k_from, k_to) in &k_eocs {
                    if same_port(k_to, from) {
                        new_eocs.push((k_from.clone(), to.clone()));
                    }
                }
            }
        }
        // couplings with an endpoint on the child interface are now stale
        self.eics.retain(|(_, to)| !k_component.contains_in_port(to));
        self.ics.retain(|(from, to)| {
            !k_component.contains_out_port(from) && !k_component.contains_in_port(to)
        });
        self.eocs
            .retain(|(from, _)| !k_component.contains_out_port(from));

        self.eics.extend(new_eics);
        self.ics.extend(k_ics);
        self.ics.extend(new_ics);
        self.eocs.extend(new_eocs);

        for grandchild in k_children {
            self.add_child(grandchild)?;
        }
        Ok(())
    }

    /// Translates a serialized coupling list into a destination-indexed map.
    fn deserialize_couplings(&self, serial: &[Coupling]) -> Result<CouplingsMap, ModelError> {
        let mut map = CouplingsMap::new();
        for (from, to) in serial {
            Self::add_coupling_to_map(self.get_id(), &mut map, from, to)?;
        }
        Ok(map)
    }

    /// Verifies that every coupling endpoint is a port of this model's interface
    /// or of an immediate subcomponent's interface.
    fn check_local_endpoints(&self) -> Result<(), ModelError> {
        let known_out = |port: &Shared<dyn PortInterface>| {
            self.component.contains_out_port(port)
                || self
                    .components
                    .iter()
                    .any(|c| c.get_component().contains_out_port(port))
        };
        let known_in = |port: &Shared<dyn PortInterface>| {
            self.component.contains_in_port(port)
                || self
                    .components
                    .iter()
                    .any(|c| c.get_component().contains_in_port(port))
        };
        for (from, to) in self.eics.iter().chain(&self.ics).chain(&self.eocs) {
            for (port, ok) in [(from, known_out(from) || known_in(from)), (to, known_out(to) || known_in(to))] {
                if !ok {
                    return Err(ModelError::InvalidCouplingEndpoint {
                        coupled: self.get_id().to_string(),
                        port: qualified(port),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Port name qualified by its owning component (for error reporting).
fn qualified(port: &Shared<dyn PortInterface>) -> String {
    match port.get_parent() {
        Some(parent) => format!("{}.{}", parent, port.get_id()),
        None => port.get_id().to_string(),
    }
}

impl Debug for Coupled {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coupled")
            .field("id", &self.get_id())
            .field("components", &self.components.len())
            .field("eics", &self.eics.len())
            .field("ics", &self.ics.len())
            .field("eocs", &self.eocs.len())
            .finish()
    }
}

impl Display for Coupled {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        component: Component,
        _input: InPort<i32>,
        _output: OutPort<i32>,
    }

    impl Dummy {
        fn new(id: &str) -> Self {
            let mut component = Component::new(id);
            let _input = component.add_in_port("input").unwrap();
            let _output = component.add_out_port("output").unwrap();
            Self {
                component,
                _input,
                _output,
            }
        }
    }

    impl Atomic for Dummy {
        fn get_component(&self) -> &Component {
            &self.component
        }
        fn get_component_mut(&mut self) -> &mut Component {
            &mut self.component
        }
        fn lambda(&self) {}
        fn delta_int(&mut self) {}
        fn delta_ext(&mut self, _e: f64) {}
        fn ta(&self) -> f64 {
            f64::INFINITY
        }
    }

    #[test]
    fn test_duplicate_component() {
        let mut top = Coupled::new("top");
        top.add_component(Dummy::new("component")).unwrap();
        assert_eq!(
            Err(ModelError::DuplicateChild {
                coupled: "top".to_string(),
                component: "component".to_string()
            }),
            top.add_component(Dummy::new("component"))
        );
    }

    #[test]
    fn test_eic_errors() {
        let mut top = Coupled::new("top");
        assert!(matches!(
            top.add_eic("input", "component", "input"),
            Err(ModelError::PortNotFound { .. })
        ));
        top.add_in_port::<i32>("input").unwrap();
        assert!(matches!(
            top.add_eic("input", "component", "input"),
            Err(ModelError::ChildNotFound { .. })
        ));
        top.add_component(Dummy::new("component")).unwrap();
        assert!(matches!(
            top.add_eic("input", "component", "bad_port"),
            Err(ModelError::PortNotFound { .. })
        ));
        top.add_eic("input", "component", "input").unwrap();
        assert!(matches!(
            top.add_eic("input", "component", "input"),
            Err(ModelError::DuplicateCoupling { .. })
        ));
        assert_eq!(1, top.n_eics());
    }

    #[test]
    fn test_incompatible_coupling() {
        let mut top = Coupled::new("top");
        top.add_in_port::<i64>("input").unwrap();
        top.add_component(Dummy::new("component")).unwrap();
        assert!(matches!(
            top.add_eic("input", "component", "input"),
            Err(ModelError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_stacked_ics() {
        let mut top = Coupled::new("top");
        top.add_component(Dummy::new("x")).unwrap();
        top.add_component(Dummy::new("y")).unwrap();
        top.add_component(Dummy::new("z")).unwrap();
        top.add_ic("x", "output", "z", "input").unwrap();
        top.add_ic("y", "output", "z", "input").unwrap();
        top.add_ic("x", "output", "y", "input").unwrap();

        let stacked = top.stacked_ics();
        assert_eq!(2, stacked.len());
        // destinations in first-seen order; sources in registration order
        assert_eq!("z", stacked[0].0.get_parent().unwrap());
        assert_eq!(
            vec!["x", "y"],
            stacked[0]
                .1
                .iter()
                .map(|p| p.get_parent().unwrap().to_string())
                .collect::<Vec<_>>()
        );
        assert_eq!("y", stacked[1].0.get_parent().unwrap());
    }

    #[test]
    fn test_flatten() {
        let mut mid = Coupled::new("mid");
        mid.add_in_port::<i32>("input").unwrap();
        mid.add_out_port::<i32>("output").unwrap();
        mid.add_component(Dummy::new("a")).unwrap();
        mid.add_component(Dummy::new("b")).unwrap();
        mid.add_eic("input", "a", "input").unwrap();
        mid.add_ic("a", "output", "b", "input").unwrap();
        mid.add_eoc("b", "output", "output").unwrap();

        let mut top = Coupled::new("top");
        top.add_in_port::<i32>("input").unwrap();
        top.add_out_port::<i32>("output").unwrap();
        top.add_component(Dummy::new("c")).unwrap();
        top.add_coupled(mid).unwrap();
        top.add_eic("input", "mid", "input").unwrap();
        top.add_ic("mid", "output", "c", "input").unwrap();
        top.add_ic("c", "output", "mid", "input").unwrap();
        top.add_eoc("c", "output", "output").unwrap();

        top.flatten().unwrap();

        assert_eq!(3, top.n_components());
        assert!(top
            .components
            .iter()
            .all(|c| matches!(c, ChildModel::Atomic(_))));
        for id in ["a", "b", "c"] {
            assert_eq!("top", top.get_child(id).unwrap().get_component().get_parent().unwrap());
        }
        // top.input -> a.input
        assert_eq!(1, top.n_eics());
        // a -> b (transferred), c -> a (left rewrite), b -> c (right rewrite)
        assert_eq!(3, top.n_ics());
        // c.output -> top.output
        assert_eq!(1, top.n_eocs());

        let pairs: Vec<(String, String)> = top
            .ics
            .iter()
            .map(|(from, to)| (qualified(from), qualified(to)))
            .collect();
        assert!(pairs.contains(&("a.output".to_string(), "b.input".to_string())));
        assert!(pairs.contains(&("c.output".to_string(), "a.input".to_string())));
        assert!(pairs.contains(&("b.output".to_string(), "c.input".to_string())));
    }

    #[test]
    fn test_dynamic_couplings() {
        let mut top = Coupled::new("top");
        top.add_component(Dummy::new("a")).unwrap();
        top.add_dynamic_eic("input", "a", "input").unwrap();
        top.add_dynamic_eoc("a", "output", "output").unwrap();
        assert_eq!(1, top.n_eics());
        assert_eq!(1, top.n_eocs());
        // the ports created on demand are reused afterwards
        top.add_component(Dummy::new("b")).unwrap();
        top.add_dynamic_eic("input", "b", "input").unwrap();
        assert_eq!(2, top.n_eics());
        assert!(top.component.get_in_port::<i32>("input").is_ok());
        assert!(top.component.get_out_port::<i32>("output").is_ok());
    }

    #[test]
    fn test_flatten_already_flat() {
        let mut top = Coupled::new("top");
        top.add_component(Dummy::new("a")).unwrap();
        top.add_component(Dummy::new("b")).unwrap();
        top.add_ic("a", "output", "b", "input").unwrap();
        top.flatten().unwrap();
        assert_eq!(2, top.n_components());
        assert_eq!(1, top.n_ics());
    }
}
