//! The top-level design: an ordered collection of modules plus a selection.

use crate::cell::Cell;
use crate::celltypes;
use crate::common::ModuleId;
use crate::module::Module;
use cxxsim_utils::Id;
use std::collections::HashMap;

/// How much of a module the enclosing tool selected for code generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selected {
    Whole,
    Partial,
    No,
}

/// A frozen design. Module iteration order is insertion order; the backend
/// re-sorts topologically over the instantiation graph when emitting.
#[derive(Clone, Debug, Default)]
pub struct Design {
    modules: Vec<Module>,
    names: HashMap<Id, ModuleId>,
    selection: Option<HashMap<Id, Selected>>,
}

impl Design {
    pub fn new() -> Self {
        Design::default()
    }

    pub fn add_module(&mut self, module: Module) -> ModuleId {
        let id = ModuleId::new(self.modules.len());
        let prev = self.names.insert(module.name, id);
        assert!(prev.is_none(), "duplicate module name `{}'", module.name);
        self.modules.push(module);
        id
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }

    pub fn module_by_name(&self, name: &Id) -> Option<ModuleId> {
        self.names.get(name).copied()
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(index, module)| (ModuleId::new(index), module))
    }

    /// Restrict generation to the given selection. Without a call, every
    /// module is wholly selected.
    pub fn set_selection(&mut self, selection: HashMap<Id, Selected>) {
        self.selection = Some(selection);
    }

    fn selected(&self, id: ModuleId) -> Selected {
        match &self.selection {
            None => Selected::Whole,
            Some(map) => map
                .get(&self.module(id).name)
                .copied()
                .unwrap_or(Selected::No),
        }
    }

    pub fn selected_module(&self, id: ModuleId) -> bool {
        self.selected(id) != Selected::No
    }

    pub fn selected_whole_module(&self, id: ModuleId) -> bool {
        self.selected(id) == Selected::Whole
    }

    /// Whether this cell's signature is known: a recognized internal
    /// primitive, or an instance of a module present in the design.
    pub fn cell_known(&self, cell: &Cell) -> bool {
        if celltypes::is_internal_cell(cell.ty) {
            celltypes::is_known_internal_cell(cell.ty)
        } else {
            self.module_by_name(&cell.ty).is_some()
        }
    }

    pub fn cell_port_input(&self, cell: &Cell, port: Id) -> bool {
        if celltypes::is_internal_cell(cell.ty) {
            celltypes::internal_cell_input(cell.ty, port)
        } else {
            self.instance_port(cell, port).map_or(false, |w| w.port_input)
        }
    }

    pub fn cell_port_output(&self, cell: &Cell, port: Id) -> bool {
        if celltypes::is_internal_cell(cell.ty) {
            celltypes::internal_cell_output(cell.ty, port)
        } else {
            self.instance_port(cell, port).map_or(false, |w| w.port_output)
        }
    }

    fn instance_port(&self, cell: &Cell, port: Id) -> Option<&crate::Wire> {
        let target = self.module_by_name(&cell.ty).unwrap_or_else(|| {
            panic!(
                "cell `{}' instantiates unknown module `{}'",
                cell.name, cell.ty
            )
        });
        let module = self.module(target);
        module.wire_by_name(&port).map(|id| module.wire(id))
    }
}
