//! Per-design analysis: flow construction, scheduling, optimization sets,
//! edge-sensitivity collection, and the module-ordered emission driver.

use crate::emitter::ModuleEmitter;
use crate::flow::{FlowGraph, Node, NodeId};
use crate::schedule::Scheduler;
use cxxsim_ir::{
    celltypes, CellId, Design, MemoryId, Module, ModuleId, SigBit, SigMap,
    SigSpec, SyncType, WireId,
};
use cxxsim_utils::{Error, Id, SimResult};
use linked_hash_map::LinkedHashMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Code generation options. The optimization level is cumulative; see
/// [`Options::with_opt_level`].
#[derive(Clone, Debug)]
pub struct Options {
    pub split_intf: bool,
    pub intf_filename: Option<String>,
    pub design_ns: String,
    pub elide_internal: bool,
    pub elide_public: bool,
    pub localize_internal: bool,
    pub localize_public: bool,
    /// Level 5 asks the enclosing driver to split multi-driver nets first;
    /// the backend itself has no pass framework to do so.
    pub wants_split_nets: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            split_intf: false,
            intf_filename: None,
            design_ns: "cxxrtl_design".to_string(),
            elide_internal: false,
            elide_public: false,
            localize_internal: false,
            localize_public: false,
            wants_split_nets: false,
        }
    }
}

impl Options {
    pub const DEFAULT_OPT_LEVEL: u32 = 5;

    pub fn with_opt_level(mut self, level: u32) -> SimResult<Self> {
        if level > 5 {
            return Err(Error::misc(format!(
                "Invalid optimization level {}.",
                level
            )));
        }
        self.wants_split_nets = level >= 5;
        self.localize_public = level >= 4;
        self.elide_public = level >= 3;
        self.localize_internal = level >= 2;
        self.elide_internal = level >= 1;
        Ok(self)
    }
}

/// Everything `analyze` learned about one module, consumed by the emitter.
#[derive(Debug, Default)]
pub struct ModuleState {
    pub sigmap: SigMap,
    /// Wires carrying at least one edge-registered bit.
    pub sync_wires: HashSet<WireId>,
    /// Edge sensitivity per wire bit, in registration order.
    pub sync_types: LinkedHashMap<(WireId, u32), SyncType>,
    pub writable_memories: HashSet<MemoryId>,
    /// For each transparent read port, the write ports in its clock domain,
    /// in IR order.
    pub transparent_for: HashMap<CellId, Vec<CellId>>,
    /// Which port of a cell drives each elided output wire.
    pub cell_wire_defs: HashMap<CellId, HashMap<WireId, Id>>,
    /// Elided wire -> the node whose expression replaces reads of it.
    pub elided_wires: HashMap<WireId, Node>,
    pub schedule: Vec<Node>,
    pub localized_wires: HashSet<WireId>,
    pub feedback_wires: HashSet<WireId>,
}

impl ModuleState {
    fn register_edge_signal(&mut self, signal: &SigSpec, kind: SyncType) {
        assert!(kind.is_edge(), "non-edge sync type registered");
        assert!(signal.is_bit(), "edge signal `{:?}' is not a single bit", signal);
        let bit = self.sigmap.bit(signal.bit(0));
        let SigBit::Wire(wire, offset) = bit else {
            panic!("edge signal resolves to a constant");
        };
        match self.sync_types.entry((wire, offset)) {
            linked_hash_map::Entry::Vacant(entry) => {
                entry.insert(kind);
            }
            linked_hash_map::Entry::Occupied(mut entry) => {
                if *entry.get() != kind {
                    entry.insert(SyncType::Edge);
                }
            }
        }
        self.sync_wires.insert(wire);
    }
}

/// The generated text streams.
#[derive(Debug)]
pub struct GeneratedCode {
    pub implementation: String,
    pub interface: Option<String>,
}

/// Checks the preconditions external lowering passes must have established.
pub fn check_design(design: &Design) -> SimResult<()> {
    for (id, module) in design.modules() {
        if module.is_blackbox() {
            continue;
        }
        if design.selected_module(id) && !design.selected_whole_module(id) {
            return Err(Error::unsupported(format!(
                "Can't handle partially selected module `{}'!",
                module.name
            )));
        }
        if !design.selected_module(id) {
            continue;
        }
        for (_, process) in module.processes() {
            for sync in &process.syncs {
                if sync.kind == SyncType::Init {
                    return Err(Error::unsupported(format!(
                        "Module `{}' has an init-type sync rule; run \
                         `proc_init' before this backend.",
                        module.name
                    )));
                }
            }
        }
        for (_, cell) in module.cells() {
            if cell.ty == "$mem" {
                return Err(Error::unsupported(format!(
                    "Module `{}' has a packed memory; run `memory_unpack' \
                     before this backend.",
                    module.name
                )));
            }
        }
    }
    Ok(())
}

/// Owns all analysis state for one code generation run.
pub struct Worker<'d> {
    design: &'d Design,
    opts: Options,
    states: HashMap<ModuleId, ModuleState>,
}

pub(crate) fn is_wire_bit(sig: &SigSpec) -> bool {
    sig.is_bit() && matches!(sig.bit(0), SigBit::Wire(..))
}

impl<'d> Worker<'d> {
    pub fn new(design: &'d Design, opts: Options) -> Self {
        Worker { design, opts, states: HashMap::new() }
    }

    pub fn state(&self, module: ModuleId) -> &ModuleState {
        &self.states[&module]
    }

    pub fn analyze(&mut self) -> SimResult<()> {
        if self.opts.wants_split_nets {
            log::info!(
                "net splitting is delegated to the enclosing driver; \
                 continuing without it"
            );
        }
        let mut has_feedback_arcs = false;
        for (id, module) in self.design.modules() {
            if module.is_blackbox() || !self.design.selected_module(id) {
                continue;
            }
            let state = self.analyze_module(module)?;
            has_feedback_arcs |= !state.feedback_wires.is_empty();
            self.states.insert(id, state);
        }
        if has_feedback_arcs {
            log::warn!("Feedback arcs require delta cycles during evaluation.");
        }
        Ok(())
    }

    fn analyze_module(&self, module: &Module) -> SimResult<ModuleState> {
        let design = self.design;
        let mut state = ModuleState {
            sigmap: SigMap::new(module),
            ..ModuleState::default()
        };
        let mut flow = FlowGraph::default();

        for conn in &module.connections {
            flow.add_connect(module, conn);
        }

        let mut memrw_cell_nodes: HashMap<CellId, NodeId> = HashMap::new();
        let mut memwr_per_domain: HashMap<(SigBit, MemoryId), Vec<CellId>> =
            HashMap::new();
        for (cell_id, cell) in module.cells() {
            if celltypes::is_internal_cell(cell.ty) {
                debug_assert!(cell.ty != "$mem", "packed memory not lowered");
                if !celltypes::is_known_internal_cell(cell.ty) {
                    return Err(Error::unsupported(format!(
                        "Unsupported internal cell `{}'.",
                        cell.ty
                    )));
                }
            } else {
                let target = design
                    .module_by_name(&cell.ty)
                    .unwrap_or_else(|| {
                        panic!(
                            "cell `{}' instantiates unknown module `{}'",
                            cell.name, cell.ty
                        )
                    });
                if design.module(target).is_blackbox() {
                    return Err(Error::unsupported(format!(
                        "Cell `{}' instantiates blackbox module `{}'.",
                        cell.name, cell.ty
                    )));
                }
            }
            let node = flow.add_cell(design, module, cell_id);

            // The flip-flop family is treated like posedge/negedge processes.
            // ($adff and $dffsr reset/set inputs are level-sensitive and do
            // not correspond to an edge-type sync rule.)
            if matches!(
                cell.ty.as_str(),
                "$dff" | "$dffe" | "$adff" | "$dffsr"
            ) && is_wire_bit(cell.port("CLK"))
            {
                let kind = if cell.param_bool("CLK_POLARITY") {
                    SyncType::Posedge
                } else {
                    SyncType::Negedge
                };
                state.register_edge_signal(cell.port("CLK"), kind);
            }
            // Similar for memory port cells.
            if celltypes::is_memory_port_cell(cell.ty) {
                if cell.param_bool("CLK_ENABLE")
                    && is_wire_bit(cell.port("CLK"))
                {
                    let kind = if cell.param_bool("CLK_POLARITY") {
                        SyncType::Posedge
                    } else {
                        SyncType::Negedge
                    };
                    state.register_edge_signal(cell.port("CLK"), kind);
                }
                memrw_cell_nodes.insert(cell_id, node);
            }
            if cell.ty == "$memwr" {
                let memory = memory_of(module, cell_id);
                // Memories nothing writes become const-qualified members.
                state.writable_memories.insert(memory);
                // Group write ports by clock domain for transparency.
                if cell.param_bool("CLK_ENABLE")
                    && is_wire_bit(cell.port("CLK"))
                {
                    let clk_bit = state.sigmap.bit(cell.port("CLK").bit(0));
                    memwr_per_domain
                        .entry((clk_bit, memory))
                        .or_default()
                        .push(cell_id);
                }
            }
        }
        for (cell_id, cell) in module.cells() {
            // A transparent read port observes every write port in its clock
            // domain; the generated code reads their EN, ADDR and DATA, which
            // is not visible in the netlist. Add these uses explicitly so the
            // scheduler orders writes before transparent reads.
            if cell.ty == "$memrd"
                && cell.param_bool("CLK_ENABLE")
                && is_wire_bit(cell.port("CLK"))
                && cell.param_bool("TRANSPARENT")
            {
                let clk_bit = state.sigmap.bit(cell.port("CLK").bit(0));
                let memory = memory_of(module, cell_id);
                let node = memrw_cell_nodes[&cell_id];
                let domain = memwr_per_domain
                    .get(&(clk_bit, memory))
                    .cloned()
                    .unwrap_or_default();
                for memwr_id in domain {
                    let memwr = module.cell(memwr_id);
                    flow.add_uses(module, node, memwr.port("EN"));
                    flow.add_uses(module, node, memwr.port("ADDR"));
                    flow.add_uses(module, node, memwr.port("DATA"));
                    state
                        .transparent_for
                        .entry(cell_id)
                        .or_default()
                        .push(memwr_id);
                }
            }
        }

        for (proc_id, process) in module.processes() {
            flow.add_process(module, proc_id);
            for sync in &process.syncs {
                match sync.kind {
                    // Edge-type sync rules require pre-registration.
                    SyncType::Posedge | SyncType::Negedge | SyncType::Edge => {
                        state.register_edge_signal(&sync.signal, sync.kind);
                    }
                    // Level-type sync rules require no special handling.
                    SyncType::Low | SyncType::High | SyncType::Always => {}
                    // Init-type sync rules are rejected by check_design.
                    SyncType::Init => unreachable!("init sync not lowered"),
                    SyncType::Global => {
                        return Err(Error::unsupported(
                            "Global clock is not supported.",
                        ));
                    }
                }
            }
        }

        for (wire_id, wire) in module.wires() {
            if !flow.is_elidable(wire_id)
                || wire.is_port()
                || wire.keep()
                || (wire.name.is_internal() && !self.opts.elide_internal)
                || (wire.name.is_public() && !self.opts.elide_public)
                || state.sync_wires.contains(&wire_id)
            {
                continue;
            }
            assert_eq!(flow.def_count(wire_id), 1);
            let def = flow.defs(wire_id).next().unwrap();
            state.elided_wires.insert(wire_id, flow.nodes[def].clone());
        }

        // Elided outputs of internal cells are always connected to the well
        // known Y port; for instances the port must be recoverable from the
        // wire alone.
        for (cell_id, cell) in module.cells() {
            for (port, sig) in &cell.connections {
                if let Some(wire) = sig.as_wire(module) {
                    if state.elided_wires.contains_key(&wire) {
                        state
                            .cell_wire_defs
                            .entry(cell_id)
                            .or_default()
                            .insert(wire, *port);
                    }
                }
            }
        }

        let mut node_defs: HashMap<NodeId, BTreeSet<WireId>> = HashMap::new();
        for (wire_id, _) in module.wires() {
            for node in flow.defs(wire_id) {
                node_defs.entry(node).or_default().insert(wire_id);
            }
        }

        let mut scheduler = Scheduler::new();
        for node in 0..flow.nodes.len() {
            let vertex = scheduler.add(node);
            debug_assert_eq!(vertex, node);
        }
        for node in 0..flow.nodes.len() {
            if let Some(defs) = node_defs.get(&node) {
                for &wire in defs {
                    for succ in flow.uses(wire) {
                        scheduler.add_edge(node, succ);
                    }
                }
            }
        }

        let eval_order = scheduler.schedule();
        let mut evaluated: HashSet<NodeId> = HashSet::new();
        for node in eval_order {
            state.schedule.push(flow.nodes[node].clone());
            evaluated.insert(node);
            // Any wire defined by this node but used by an already evaluated
            // node is a feedback wire. Feedback usually indicates benign
            // wire-level (not bit-level) dependency cycles; it cannot be
            // localized, and it cannot be elided either, because feedback
            // requires state while the point of both is to eliminate state.
            if let Some(defs) = node_defs.get(&node) {
                for &wire in defs {
                    for succ in flow.uses(wire) {
                        if evaluated.contains(&succ) {
                            state.feedback_wires.insert(wire);
                            state.elided_wires.remove(&wire);
                        }
                    }
                }
            }
        }

        if !state.feedback_wires.is_empty() {
            log::warn!(
                "Module `{}` contains feedback arcs through wires:",
                module.name
            );
            for (wire_id, wire) in module.wires() {
                if state.feedback_wires.contains(&wire_id) {
                    log::warn!("  {}", wire.name);
                }
            }
        }

        for (wire_id, wire) in module.wires() {
            if state.feedback_wires.contains(&wire_id)
                || state.elided_wires.contains_key(&wire_id)
                || wire.is_port()
                || wire.keep()
                || (wire.name.is_internal() && !self.opts.localize_internal)
                || (wire.name.is_public() && !self.opts.localize_public)
                || state.sync_wires.contains(&wire_id)
            {
                continue;
            }
            // Outputs of flip-flop and clocked read port cells, and the
            // targets of edge-type sync actions, do not end up in defs.
            if flow.def_count(wire_id) != 1 {
                continue;
            }
            state.localized_wires.insert(wire_id);
        }

        Ok(state)
    }

    /// Topological order over the instantiation graph: a module is emitted
    /// after every module it instantiates.
    fn module_order(&self) -> Vec<ModuleId> {
        let mut graph: DiGraph<ModuleId, ()> = DiGraph::new();
        let mut indices: HashMap<ModuleId, NodeIndex> = HashMap::new();
        for (id, module) in self.design.modules() {
            if module.is_blackbox() || !self.design.selected_module(id) {
                continue;
            }
            indices.insert(id, graph.add_node(id));
        }
        for (id, module) in self.design.modules() {
            let Some(&this) = indices.get(&id) else { continue };
            for (_, cell) in module.cells() {
                if celltypes::is_internal_cell(cell.ty) {
                    continue;
                }
                let dep = self
                    .design
                    .module_by_name(&cell.ty)
                    .expect("instantiated module missing from design");
                if let Some(&dep_index) = indices.get(&dep) {
                    graph.add_edge(dep_index, this, ());
                }
            }
        }
        let sorted = toposort(&graph, None)
            .unwrap_or_else(|_| panic!("recursive module instantiation"));
        sorted.into_iter().map(|index| graph[index]).collect()
    }

    pub fn emit_design(&self) -> SimResult<GeneratedCode> {
        let order = self.module_order();

        let interface = if self.opts.split_intf {
            let mut f = String::new();
            // The only thing more depraved than include guards is mangling
            // filenames to produce them; derive the guard from the namespace.
            let guard =
                format!("{}_header", self.opts.design_ns).to_uppercase();
            f.push_str(&format!("#ifndef {}\n", guard));
            f.push_str(&format!("#define {}\n", guard));
            f.push('\n');
            f.push_str("#include <cxxrtl.h>\n");
            f.push('\n');
            f.push_str("using namespace cxxrtl;\n");
            f.push('\n');
            f.push_str(&format!("namespace {} {{\n", self.opts.design_ns));
            f.push('\n');
            for &id in &order {
                f.push_str(&self.emitter(id).finish_intf()?);
            }
            f.push_str(&format!(
                "}} // namespace {}\n",
                self.opts.design_ns
            ));
            f.push('\n');
            f.push_str("#endif\n");
            Some(f)
        } else {
            None
        };

        let mut f = String::new();
        match &self.opts.intf_filename {
            Some(filename) if self.opts.split_intf => {
                f.push_str(&format!("#include \"{}\"\n", filename));
            }
            _ => f.push_str("#include <cxxrtl.h>\n"),
        }
        f.push('\n');
        f.push_str("using namespace cxxrtl;\n");
        f.push('\n');
        f.push_str(&format!("namespace {} {{\n", self.opts.design_ns));
        f.push('\n');
        for &id in &order {
            if !self.opts.split_intf {
                f.push_str(&self.emitter(id).finish_intf()?);
            }
            f.push_str(&self.emitter(id).finish_impl()?);
        }
        f.push_str(&format!("}} // namespace {}\n", self.opts.design_ns));

        Ok(GeneratedCode { implementation: f, interface })
    }

    fn emitter(&self, id: ModuleId) -> ModuleEmitter<'_> {
        ModuleEmitter::new(self.design, self.design.module(id), self.state(id))
    }
}

pub(crate) fn memory_of(module: &Module, cell: CellId) -> MemoryId {
    let cell = module.cell(cell);
    let name = Id::new(cell.param_str("MEMID"));
    module.memory_by_name(&name).unwrap_or_else(|| {
        panic!("cell `{}' references unknown memory `{}'", cell.name, name)
    })
}

/// Analyze `design` and produce the generated text streams.
pub fn generate(design: &Design, opts: &Options) -> SimResult<GeneratedCode> {
    check_design(design)?;
    let mut worker = Worker::new(design, opts.clone());
    worker.analyze()?;
    worker.emit_design()
}
