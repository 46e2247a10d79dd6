//! Cells: instances of internal primitives or of other modules.

use crate::module::Attributes;
use crate::sigspec::{Const, SigSpec};
use cxxsim_utils::Id;
use linked_hash_map::LinkedHashMap;

/// A cell instance. `ty` is either an internal primitive (`$`-prefixed) or
/// the name of another module in the design. Port and parameter names follow
/// the IR identifier convention; the bare-name helpers below prepend the `\`
/// for the well-known internal cell ports (`A`, `Y`, `CLK`, ...).
#[derive(Clone, Debug)]
pub struct Cell {
    pub name: Id,
    pub ty: Id,
    pub connections: LinkedHashMap<Id, SigSpec>,
    pub parameters: LinkedHashMap<Id, Const>,
    pub attributes: Attributes,
}

fn port_id(name: &str) -> Id {
    Id::new(format!("\\{}", name))
}

impl Cell {
    pub fn new<N: Into<Id>, T: Into<Id>>(name: N, ty: T) -> Self {
        Cell {
            name: name.into(),
            ty: ty.into(),
            connections: LinkedHashMap::new(),
            parameters: LinkedHashMap::new(),
            attributes: Attributes::default(),
        }
    }

    pub fn set_port(&mut self, name: &str, sig: SigSpec) {
        self.connections.insert(port_id(name), sig);
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.connections.contains_key(&port_id(name))
    }

    /// The signal connected to a well-known port. Panics if absent; the port
    /// tables of recognized cells guarantee presence.
    pub fn port(&self, name: &str) -> &SigSpec {
        self.connections.get(&port_id(name)).unwrap_or_else(|| {
            panic!("cell `{}' has no port `{}'", self.name, name)
        })
    }

    pub fn set_param(&mut self, name: &str, value: Const) {
        self.parameters.insert(port_id(name), value);
    }

    pub fn set_param_u64(&mut self, name: &str, value: u64) {
        self.set_param(name, Const::from_u64(value, 32));
    }

    pub fn set_param_bool(&mut self, name: &str, value: bool) {
        self.set_param(name, Const::from_u64(value as u64, 1));
    }

    pub fn set_param_str(&mut self, name: &str, value: &str) {
        self.set_param(name, Const::string(value));
    }

    pub fn param(&self, name: &str) -> &Const {
        self.parameters.get(&port_id(name)).unwrap_or_else(|| {
            panic!("cell `{}' has no parameter `{}'", self.name, name)
        })
    }

    pub fn param_bool(&self, name: &str) -> bool {
        self.param(name).as_bool()
    }

    pub fn param_u32(&self, name: &str) -> u32 {
        self.param(name).as_u32()
    }

    pub fn param_str(&self, name: &str) -> &str {
        self.param(name).as_str()
    }
}
