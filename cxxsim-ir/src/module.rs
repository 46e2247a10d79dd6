//! Modules and the entities they own: wires, memories, attribute sets.

use crate::cell::Cell;
use crate::common::{CellId, MemoryId, ProcId, WireId};
use crate::process::Process;
use crate::sigspec::{Const, SigSpec};
use cxxsim_utils::Id;
use linked_hash_map::LinkedHashMap;
use std::collections::HashMap;

/// A pair of signals describing a continuous assignment: `(lhs, rhs)`.
pub type SigSig = (SigSpec, SigSpec);

/// Attribute storage. Attribute names follow the IR identifier convention
/// (`\keep`, `\init`, ...); iteration preserves insertion order.
#[derive(Clone, Debug, Default)]
pub struct Attributes {
    map: LinkedHashMap<Id, Const>,
}

impl Attributes {
    pub fn set<N: Into<Id>>(&mut self, name: N, value: Const) {
        self.map.insert(name.into(), value);
    }

    pub fn set_bool<N: Into<Id>>(&mut self, name: N) {
        self.set(name, Const::from_u64(1, 1));
    }

    pub fn get(&self, name: &Id) -> Option<&Const> {
        self.map.get(name)
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.map
            .get(&Id::new(name))
            .map_or(false, |value| !value.is_string() && value.as_bool())
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Id, &Const)> {
        self.map.iter()
    }
}

/// A named bundle of bits. `port_id` is present iff the wire is a port of its
/// module; positions start at 1, following the upstream convention.
#[derive(Clone, Debug)]
pub struct Wire {
    pub name: Id,
    pub width: u32,
    pub port_id: Option<u32>,
    pub port_input: bool,
    pub port_output: bool,
    pub attributes: Attributes,
}

impl Wire {
    pub fn is_port(&self) -> bool {
        self.port_id.is_some()
    }

    pub fn keep(&self) -> bool {
        self.attributes.get_bool("\\keep")
    }

    pub fn init(&self) -> Option<&Const> {
        self.attributes.get(&Id::new("\\init"))
    }
}

/// An addressable array of `size` words of `width` bits, starting at address
/// `start_offset`.
#[derive(Clone, Debug)]
pub struct Memory {
    pub name: Id,
    pub width: u32,
    pub size: u32,
    pub start_offset: i32,
    pub attributes: Attributes,
}

impl Memory {
    pub fn new<N: Into<Id>>(name: N, width: u32, size: u32) -> Self {
        Memory {
            name: name.into(),
            width,
            size,
            start_offset: 0,
            attributes: Attributes::default(),
        }
    }
}

/// One module of a design: wires, cells, processes, memories, and the list of
/// continuous assignments.
#[derive(Clone, Debug)]
pub struct Module {
    pub name: Id,
    pub attributes: Attributes,
    pub connections: Vec<SigSig>,
    wires: Vec<Wire>,
    cells: Vec<Cell>,
    processes: Vec<Process>,
    memories: Vec<Memory>,
    wire_names: HashMap<Id, WireId>,
    memory_names: HashMap<Id, MemoryId>,
}

impl Module {
    pub fn new<N: Into<Id>>(name: N) -> Self {
        Module {
            name: name.into(),
            attributes: Attributes::default(),
            connections: Vec::new(),
            wires: Vec::new(),
            cells: Vec::new(),
            processes: Vec::new(),
            memories: Vec::new(),
            wire_names: HashMap::new(),
            memory_names: HashMap::new(),
        }
    }

    pub fn is_blackbox(&self) -> bool {
        self.attributes.get_bool("\\blackbox")
    }

    pub fn add_wire<N: Into<Id>>(&mut self, name: N, width: u32) -> WireId {
        let name = name.into();
        let id = WireId::new(self.wires.len());
        let prev = self.wire_names.insert(name, id);
        assert!(prev.is_none(), "duplicate wire name `{}'", name);
        self.wires.push(Wire {
            name,
            width,
            port_id: None,
            port_input: false,
            port_output: false,
            attributes: Attributes::default(),
        });
        id
    }

    pub fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id.index()]
    }

    pub fn wire_mut(&mut self, id: WireId) -> &mut Wire {
        &mut self.wires[id.index()]
    }

    pub fn wire_by_name(&self, name: &Id) -> Option<WireId> {
        self.wire_names.get(name).copied()
    }

    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires
            .iter()
            .enumerate()
            .map(|(index, wire)| (WireId::new(index), wire))
    }

    /// The whole of `wire` as a signal.
    pub fn sig(&self, wire: WireId) -> SigSpec {
        SigSpec::wire(wire, self.wire(wire).width)
    }

    pub fn add_cell(&mut self, cell: Cell) -> CellId {
        let id = CellId::new(self.cells.len());
        self.cells.push(cell);
        id
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.index()]
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| (CellId::new(index), cell))
    }

    pub fn add_process(&mut self, process: Process) -> ProcId {
        let id = ProcId::new(self.processes.len());
        self.processes.push(process);
        id
    }

    pub fn process(&self, id: ProcId) -> &Process {
        &self.processes[id.index()]
    }

    pub fn processes(&self) -> impl Iterator<Item = (ProcId, &Process)> {
        self.processes
            .iter()
            .enumerate()
            .map(|(index, process)| (ProcId::new(index), process))
    }

    pub fn add_memory(&mut self, memory: Memory) -> MemoryId {
        let id = MemoryId::new(self.memories.len());
        let prev = self.memory_names.insert(memory.name, id);
        assert!(prev.is_none(), "duplicate memory name `{}'", memory.name);
        self.memories.push(memory);
        id
    }

    pub fn memory(&self, id: MemoryId) -> &Memory {
        &self.memories[id.index()]
    }

    pub fn memory_by_name(&self, name: &Id) -> Option<MemoryId> {
        self.memory_names.get(name).copied()
    }

    pub fn memories(&self) -> impl Iterator<Item = (MemoryId, &Memory)> {
        self.memories
            .iter()
            .enumerate()
            .map(|(index, memory)| (MemoryId::new(index), memory))
    }

    pub fn add_connection(&mut self, lhs: SigSpec, rhs: SigSpec) {
        assert_eq!(
            lhs.len(),
            rhs.len(),
            "connection width mismatch in `{}'",
            self.name
        );
        self.connections.push((lhs, rhs));
    }
}
