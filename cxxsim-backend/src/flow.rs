//! The def/use flow graph over connections, cells, and processes.

use cxxsim_ir::{
    celltypes, CellId, Design, Module, ProcId, SigChunk, SigSig, SigSpec,
    WireId,
};
use cxxsim_ir::{CaseRule, SyncRule};
use std::collections::{BTreeSet, HashMap};

/// Index of a node inside its [`FlowGraph`].
pub type NodeId = usize;

/// One schedulable unit of evaluation.
#[derive(Clone, Debug)]
pub enum Node {
    Connect(SigSig),
    Cell(CellId),
    Process(ProcId),
}

/// Def/use relation between flow nodes and wires, plus the per-wire
/// elidability verdicts the optimizer consumes.
#[derive(Debug, Default)]
pub struct FlowGraph {
    pub nodes: Vec<Node>,
    wire_defs: HashMap<WireId, BTreeSet<NodeId>>,
    wire_uses: HashMap<WireId, BTreeSet<NodeId>>,
    wire_def_elidable: HashMap<WireId, bool>,
    wire_use_elidable: HashMap<WireId, bool>,
}

impl FlowGraph {
    pub fn defs(&self, wire: WireId) -> impl Iterator<Item = NodeId> + '_ {
        self.wire_defs.get(&wire).into_iter().flatten().copied()
    }

    pub fn uses(&self, wire: WireId) -> impl Iterator<Item = NodeId> + '_ {
        self.wire_uses.get(&wire).into_iter().flatten().copied()
    }

    pub fn def_count(&self, wire: WireId) -> usize {
        self.wire_defs.get(&wire).map_or(0, BTreeSet::len)
    }

    pub fn use_count(&self, wire: WireId) -> usize {
        self.wire_uses.get(&wire).map_or(0, BTreeSet::len)
    }

    fn add_defs(
        &mut self,
        module: &Module,
        node: NodeId,
        sig: &SigSpec,
        elidable: bool,
    ) {
        for chunk in sig.chunks() {
            if let SigChunk::Wire { wire, .. } = chunk {
                self.wire_defs.entry(*wire).or_default().insert(node);
            }
        }
        // Only defs of an entire wire in the right order can be elided.
        if let Some(wire) = sig.as_wire(module) {
            self.wire_def_elidable.insert(wire, elidable);
        }
    }

    pub fn add_uses(&mut self, module: &Module, node: NodeId, sig: &SigSpec) {
        for chunk in sig.chunks() {
            let &SigChunk::Wire { wire, offset, width } = chunk else {
                continue;
            };
            self.wire_uses.entry(wire).or_default().insert(node);
            // Only a single whole-wire use can be elided.
            let whole = offset == 0 && width == module.wire(wire).width;
            match self.wire_use_elidable.entry(wire) {
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(whole);
                }
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    entry.insert(false);
                }
            }
        }
    }

    pub fn is_elidable(&self, wire: WireId) -> bool {
        match (
            self.wire_def_elidable.get(&wire),
            self.wire_use_elidable.get(&wire),
        ) {
            (Some(def), Some(use_)) => *def && *use_,
            _ => false,
        }
    }

    // Connections

    pub fn add_connect(&mut self, module: &Module, conn: &SigSig) -> NodeId {
        let node = self.nodes.len();
        self.nodes.push(Node::Connect(conn.clone()));
        self.add_defs(module, node, &conn.0, /*elidable=*/ true);
        self.add_uses(module, node, &conn.1);
        node
    }

    // Cells

    pub fn add_cell(
        &mut self,
        design: &Design,
        module: &Module,
        id: CellId,
    ) -> NodeId {
        let node = self.nodes.len();
        self.nodes.push(Node::Cell(id));
        let cell = module.cell(id);
        assert!(design.cell_known(cell), "unknown cell type `{}'", cell.ty);
        let clocked_memrd = cell.ty == "$memrd" && cell.param_bool("CLK_ENABLE");
        for (port, sig) in &cell.connections {
            if design.cell_port_output(cell, *port) {
                if celltypes::is_sync_ff_cell(cell.ty) || clocked_memrd {
                    // Non-combinatorial outputs do not introduce defs; they
                    // are driven from the commit phase.
                } else if celltypes::is_elidable_cell(cell.ty) {
                    self.add_defs(module, node, sig, /*elidable=*/ true);
                } else if celltypes::is_internal_cell(cell.ty) {
                    self.add_defs(module, node, sig, /*elidable=*/ false);
                } else {
                    // Outputs of instances are plain aliases of the instance
                    // output and can be elided, unlike outputs of internal
                    // cells whose generated code writes the wire directly.
                    self.add_defs(module, node, sig, /*elidable=*/ true);
                }
            }
            if design.cell_port_input(cell, *port) {
                self.add_uses(module, node, sig);
            }
        }
        node
    }

    // Processes

    fn add_case(&mut self, module: &Module, node: NodeId, case: &CaseRule) {
        for (lhs, rhs) in &case.actions {
            self.add_defs(module, node, lhs, /*elidable=*/ false);
            self.add_uses(module, node, rhs);
        }
        for switch in &case.switches {
            self.add_uses(module, node, &switch.signal);
            for sub_case in &switch.cases {
                for compare in &sub_case.compare {
                    self.add_uses(module, node, compare);
                }
                self.add_case(module, node, sub_case);
            }
        }
    }

    fn add_sync(&mut self, module: &Module, node: NodeId, sync: &SyncRule) {
        for (lhs, rhs) in &sync.actions {
            if sync.kind.is_edge() {
                // Edge-triggered actions commit on clock edges, not during
                // eval, and so do not introduce feedback.
            } else {
                self.add_defs(module, node, lhs, /*elidable=*/ false);
            }
            self.add_uses(module, node, rhs);
        }
    }

    pub fn add_process(&mut self, module: &Module, id: ProcId) -> NodeId {
        let node = self.nodes.len();
        self.nodes.push(Node::Process(id));
        let process = module.process(id);
        self.add_case(module, node, &process.root_case);
        for sync in &process.syncs {
            self.add_sync(module, node, sync);
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxxsim_ir::Cell;

    fn and_cell(module: &mut Module, name: &str, a: WireId, b: WireId, y: WireId) -> CellId {
        let mut cell = Cell::new(name, "$and");
        cell.set_port("A", module.sig(a));
        cell.set_port("B", module.sig(b));
        cell.set_port("Y", module.sig(y));
        cell.set_param_bool("A_SIGNED", false);
        cell.set_param_bool("B_SIGNED", false);
        cell.set_param_u64("Y_WIDTH", 1);
        module.add_cell(cell)
    }

    #[test]
    fn defs_and_uses_are_exact() {
        let mut design = Design::new();
        let mut module = Module::new("\\top");
        let a = module.add_wire("\\a", 1);
        let b = module.add_wire("\\b", 1);
        let y = module.add_wire("\\y", 1);
        let z = module.add_wire("\\z", 1);
        let and = and_cell(&mut module, "$and$1", a, b, y);
        module.add_connection(module.sig(z), module.sig(y));
        let id = design.add_module(module);
        let module = design.module(id);

        let mut flow = FlowGraph::default();
        let cell_node = flow.add_cell(&design, module, and);
        let conn_node =
            flow.add_connect(module, &module.connections[0]);

        assert_eq!(flow.defs(y).collect::<Vec<_>>(), vec![cell_node]);
        assert_eq!(flow.uses(y).collect::<Vec<_>>(), vec![conn_node]);
        assert_eq!(flow.defs(z).collect::<Vec<_>>(), vec![conn_node]);
        assert_eq!(flow.uses(a).collect::<Vec<_>>(), vec![cell_node]);
        assert_eq!(flow.uses(b).collect::<Vec<_>>(), vec![cell_node]);
        assert_eq!(flow.def_count(a), 0);
    }

    #[test]
    fn single_whole_use_is_elidable() {
        let mut design = Design::new();
        let mut module = Module::new("\\top");
        let a = module.add_wire("\\a", 1);
        let b = module.add_wire("\\b", 1);
        let y = module.add_wire("\\y", 1);
        let z = module.add_wire("\\z", 1);
        let and = and_cell(&mut module, "$and$1", a, b, y);
        module.add_connection(module.sig(z), module.sig(y));
        let id = design.add_module(module);
        let module = design.module(id);

        let mut flow = FlowGraph::default();
        flow.add_cell(&design, module, and);
        flow.add_connect(module, &module.connections[0]);

        assert!(flow.is_elidable(y));
        // `a` has a use but no elidable def.
        assert!(!flow.is_elidable(a));
    }

    #[test]
    fn second_use_revokes_elidability() {
        let mut design = Design::new();
        let mut module = Module::new("\\top");
        let a = module.add_wire("\\a", 1);
        let b = module.add_wire("\\b", 1);
        let y = module.add_wire("\\y", 1);
        let z1 = module.add_wire("\\z1", 1);
        let z2 = module.add_wire("\\z2", 1);
        let and = and_cell(&mut module, "$and$1", a, b, y);
        module.add_connection(module.sig(z1), module.sig(y));
        module.add_connection(module.sig(z2), module.sig(y));
        let id = design.add_module(module);
        let module = design.module(id);

        let mut flow = FlowGraph::default();
        flow.add_cell(&design, module, and);
        flow.add_connect(module, &module.connections[0]);
        flow.add_connect(module, &module.connections[1]);

        assert!(!flow.is_elidable(y));
    }

    #[test]
    fn partial_use_is_not_elidable() {
        let mut design = Design::new();
        let mut module = Module::new("\\top");
        let a = module.add_wire("\\a", 2);
        let b = module.add_wire("\\b", 2);
        let y = module.add_wire("\\y", 2);
        let z = module.add_wire("\\z", 1);
        let mut cell = Cell::new("$and$1", "$and");
        cell.set_port("A", module.sig(a));
        cell.set_port("B", module.sig(b));
        cell.set_port("Y", module.sig(y));
        cell.set_param_bool("A_SIGNED", false);
        cell.set_param_bool("B_SIGNED", false);
        cell.set_param_u64("Y_WIDTH", 2);
        let and = module.add_cell(cell);
        module.add_connection(module.sig(z), SigSpec::slice(y, 0, 1));
        let id = design.add_module(module);
        let module = design.module(id);

        let mut flow = FlowGraph::default();
        flow.add_cell(&design, module, and);
        flow.add_connect(module, &module.connections[0]);

        assert!(!flow.is_elidable(y));
    }

    #[test]
    fn process_defs_are_not_elidable() {
        use cxxsim_ir::{Process, SyncRule, SyncType};
        let mut design = Design::new();
        let mut module = Module::new("\\top");
        let d = module.add_wire("\\d", 1);
        let q = module.add_wire("\\q", 1);
        let clk = module.add_wire("\\clk", 1);
        let mut process = Process::new("$proc$1");
        process.root_case.actions.push((module.sig(q), module.sig(d)));
        process.syncs.push(SyncRule {
            kind: SyncType::Posedge,
            signal: module.sig(clk),
            actions: vec![(module.sig(q), module.sig(d))],
        });
        let process = module.add_process(process);
        let id = design.add_module(module);
        let module = design.module(id);

        let mut flow = FlowGraph::default();
        let node = flow.add_process(module, process);

        // The root-case def registers; the edge-type sync action does not.
        assert_eq!(flow.defs(q).collect::<Vec<_>>(), vec![node]);
        assert!(!flow.is_elidable(q));
        assert_eq!(flow.uses(d).collect::<Vec<_>>(), vec![node]);
    }
}
