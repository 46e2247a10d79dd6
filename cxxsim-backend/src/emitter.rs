//! Rendering of analyzed modules into C++ interface and implementation text.

use crate::flow::Node;
use crate::mangle::{
    mangle_cell_name, mangle_memory_name, mangle_module_name, mangle_sig_bit,
    mangle_wire_name,
};
use crate::worker::{is_wire_bit, memory_of, ModuleState};
use cxxsim_ir::{
    celltypes, Attributes, CaseRule, Cell, CellId, Const, Design, MemoryId,
    Module, ProcId, SigBit, SigChunk, SigSig, SigSpec, State, SwitchRule,
    SyncType, WireId,
};
use cxxsim_utils::Id;
use itertools::Itertools;
use std::fmt::{self, Write};

const CHUNK_BITS: usize = 32;

/// Emits one module into an in-memory buffer. The interface stream and the
/// implementation stream use separate emitter instances.
pub(crate) struct ModuleEmitter<'a> {
    design: &'a Design,
    module: &'a Module,
    state: &'a ModuleState,
    f: String,
    indent: String,
    temporary: u32,
}

impl<'a> ModuleEmitter<'a> {
    pub(crate) fn new(
        design: &'a Design,
        module: &'a Module,
        state: &'a ModuleState,
    ) -> Self {
        ModuleEmitter {
            design,
            module,
            state,
            f: String::new(),
            indent: String::new(),
            temporary: 0,
        }
    }

    pub(crate) fn finish_intf(mut self) -> Result<String, fmt::Error> {
        self.emit_module_intf()?;
        Ok(self.f)
    }

    pub(crate) fn finish_impl(mut self) -> Result<String, fmt::Error> {
        self.emit_module_impl()?;
        Ok(self.f)
    }

    fn inc_indent(&mut self) {
        self.indent.push('\t');
    }

    fn dec_indent(&mut self) {
        self.indent.pop();
    }

    fn fresh_temporary(&mut self) -> String {
        let name = format!("tmp_{}", self.temporary);
        self.temporary += 1;
        name
    }

    fn emit_attrs(&mut self, attrs: &Attributes) -> fmt::Result {
        for (name, value) in attrs.iter() {
            let rendered = if value.is_string() {
                value.as_str().to_string()
            } else {
                value.as_u64().to_string()
            };
            writeln!(self.f, "{}// {}: {}", self.indent, name, rendered)?;
        }
        Ok(())
    }

    fn emit_const_init(
        &mut self,
        value: &Const,
        width: usize,
        offset: usize,
        fixed_width: bool,
    ) -> fmt::Result {
        write!(self.f, "{{")?;
        let mut offset = offset;
        let mut width = width;
        while width > 0 {
            let take = width.min(CHUNK_BITS);
            let chunk = value.extract(offset, take).as_u32();
            if fixed_width {
                write!(self.f, "0x{:08x}u", chunk)?;
            } else {
                write!(self.f, "{:#x}u", chunk)?;
            }
            if width > CHUNK_BITS {
                write!(self.f, ",")?;
            }
            offset += take;
            width -= take;
        }
        write!(self.f, "}}")
    }

    fn emit_const_width(
        &mut self,
        value: &Const,
        width: usize,
        offset: usize,
        fixed_width: bool,
    ) -> fmt::Result {
        write!(self.f, "value<{}>", width)?;
        self.emit_const_init(value, width, offset, fixed_width)
    }

    fn emit_const(&mut self, value: &Const) -> fmt::Result {
        self.emit_const_width(value, value.len(), 0, false)
    }

    /// Returns true when the rendered expression is not a plain `value<N>`
    /// and needs `.val()` in value contexts.
    fn emit_sigchunk(
        &mut self,
        chunk: &SigChunk,
        is_lhs: bool,
    ) -> Result<bool, fmt::Error> {
        let module = self.module;
        let state = self.state;
        let &SigChunk::Wire { wire, offset, width } = chunk else {
            let SigChunk::Const(value) = chunk else { unreachable!() };
            self.emit_const(value)?;
            return Ok(false);
        };
        let decl = module.wire(wire);
        if !is_lhs && state.elided_wires.contains_key(&wire) {
            match &state.elided_wires[&wire] {
                Node::Connect(conn) => self.emit_connect_elided(conn)?,
                Node::Cell(cell_id) => {
                    let cell = module.cell(*cell_id);
                    if celltypes::is_elidable_cell(cell.ty) {
                        self.emit_cell_elided(cell)?;
                    } else {
                        let port = state.cell_wire_defs[cell_id][&wire];
                        write!(
                            self.f,
                            "{}.{}.curr",
                            mangle_cell_name(cell.name),
                            mangle_wire_name(port)
                        )?;
                    }
                }
                Node::Process(_) => {
                    unreachable!("process defs are never elided")
                }
            }
        } else if state.localized_wires.contains(&wire) {
            write!(self.f, "{}", mangle_wire_name(decl.name))?;
        } else {
            write!(
                self.f,
                "{}.{}",
                mangle_wire_name(decl.name),
                if is_lhs { "next" } else { "curr" }
            )?;
        }
        if width == decl.width && offset == 0 {
            Ok(false)
        } else if width == 1 {
            write!(self.f, ".slice<{}>()", offset)?;
            Ok(true)
        } else {
            write!(self.f, ".slice<{},{}>()", offset + width - 1, offset)?;
            Ok(true)
        }
    }

    fn emit_sigspec(
        &mut self,
        sig: &SigSpec,
        is_lhs: bool,
    ) -> Result<bool, fmt::Error> {
        if sig.is_empty() {
            write!(self.f, "value<0>()")?;
            return Ok(false);
        }
        if let Some(chunk) = sig.as_chunk() {
            return self.emit_sigchunk(chunk, is_lhs);
        }
        // Chunks are stored LSB first; the concatenation chain reads MSB
        // outward, matching the runtime's `concat` argument order.
        let chunks = sig.chunks();
        self.emit_sigchunk(chunks.last().unwrap(), is_lhs)?;
        for chunk in chunks.iter().rev().skip(1) {
            write!(self.f, ".concat(")?;
            self.emit_sigchunk(chunk, is_lhs)?;
            write!(self.f, ")")?;
        }
        Ok(true)
    }

    fn emit_sigspec_lhs(&mut self, sig: &SigSpec) -> fmt::Result {
        self.emit_sigspec(sig, /*is_lhs=*/ true)?;
        Ok(())
    }

    /// Emit a right-hand side, converting to `value<N>` where template
    /// argument deduction in the runtime library needs it.
    fn emit_sigspec_rhs(&mut self, sig: &SigSpec) -> fmt::Result {
        let is_complex = self.emit_sigspec(sig, /*is_lhs=*/ false)?;
        if is_complex {
            write!(self.f, ".val()")?;
        }
        Ok(())
    }

    fn collect_sigspec_rhs(&self, sig: &SigSpec, cells: &mut Vec<Id>) {
        for chunk in sig.chunks() {
            let SigChunk::Wire { wire, .. } = chunk else { continue };
            let Some(node) = self.state.elided_wires.get(wire) else {
                continue;
            };
            match node {
                Node::Connect(conn) => self.collect_connect(conn, cells),
                Node::Cell(cell_id) => {
                    self.collect_cell(self.module.cell(*cell_id), cells)
                }
                Node::Process(_) => {
                    unreachable!("process defs are never elided")
                }
            }
        }
    }

    // Connections

    fn is_connect_elided(&self, conn: &SigSig) -> bool {
        conn.0
            .as_wire(self.module)
            .map_or(false, |wire| self.state.elided_wires.contains_key(&wire))
    }

    fn collect_connect(&self, conn: &SigSig, cells: &mut Vec<Id>) {
        if !self.is_connect_elided(conn) {
            return;
        }
        self.collect_sigspec_rhs(&conn.1, cells);
    }

    fn emit_connect_elided(&mut self, conn: &SigSig) -> fmt::Result {
        self.emit_sigspec_rhs(&conn.1)
    }

    fn emit_connect(&mut self, conn: &SigSig) -> fmt::Result {
        if self.is_connect_elided(conn) {
            return Ok(());
        }
        writeln!(self.f, "{}// connection", self.indent)?;
        write!(self.f, "{}", self.indent)?;
        self.emit_sigspec_lhs(&conn.0)?;
        write!(self.f, " = ")?;
        self.emit_connect_elided(conn)?;
        writeln!(self.f, ";")
    }

    // Cells

    fn is_cell_elided(&self, cell: &Cell) -> bool {
        celltypes::is_elidable_cell(cell.ty)
            && cell.has_port("Y")
            && cell.port("Y").as_wire(self.module).map_or(false, |wire| {
                self.state.elided_wires.contains_key(&wire)
            })
    }

    fn collect_cell(&self, cell: &Cell, cells: &mut Vec<Id>) {
        if !self.is_cell_elided(cell) {
            return;
        }
        cells.push(cell.name);
        let y = Id::new("\\Y");
        for (port, sig) in &cell.connections {
            if *port != y {
                self.collect_sigspec_rhs(sig, cells);
            }
        }
    }

    fn emit_cell_elided(&mut self, cell: &Cell) -> fmt::Result {
        if celltypes::is_unary_cell(cell.ty) {
            write!(
                self.f,
                "{}_{}<{}>(",
                &cell.ty.as_str()[1..],
                if cell.param_bool("A_SIGNED") { 's' } else { 'u' },
                cell.param_u32("Y_WIDTH")
            )?;
            self.emit_sigspec_rhs(cell.port("A"))?;
            write!(self.f, ")")
        } else if celltypes::is_binary_cell(cell.ty) {
            write!(
                self.f,
                "{}_{}{}<{}>(",
                &cell.ty.as_str()[1..],
                if cell.param_bool("A_SIGNED") { 's' } else { 'u' },
                if cell.param_bool("B_SIGNED") { 's' } else { 'u' },
                cell.param_u32("Y_WIDTH")
            )?;
            self.emit_sigspec_rhs(cell.port("A"))?;
            write!(self.f, ", ")?;
            self.emit_sigspec_rhs(cell.port("B"))?;
            write!(self.f, ")")
        } else if cell.ty == "$mux" {
            write!(self.f, "(")?;
            self.emit_sigspec_rhs(cell.port("S"))?;
            write!(self.f, " ? ")?;
            self.emit_sigspec_rhs(cell.port("B"))?;
            write!(self.f, " : ")?;
            self.emit_sigspec_rhs(cell.port("A"))?;
            write!(self.f, ")")
        } else if cell.ty == "$concat" {
            self.emit_sigspec_rhs(cell.port("B"))?;
            write!(self.f, ".concat(")?;
            self.emit_sigspec_rhs(cell.port("A"))?;
            write!(self.f, ").val()")
        } else if cell.ty == "$slice" {
            let offset = cell.param_u32("OFFSET");
            let width = cell.param_u32("Y_WIDTH");
            self.emit_sigspec_rhs(cell.port("A"))?;
            write!(self.f, ".slice<{},{}>().val()", offset + width - 1, offset)
        } else {
            unreachable!("cell `{}' is not elidable", cell.ty)
        }
    }

    fn emit_cell(&mut self, cell_id: CellId) -> fmt::Result {
        let module = self.module;
        let cell = module.cell(cell_id);
        if self.is_cell_elided(cell) {
            return Ok(());
        }
        if cell.ty == "$meminit" {
            return Ok(()); // Rendered with the memory declaration.
        }

        let mut elided_cells = Vec::new();
        if celltypes::is_elidable_cell(cell.ty) {
            let y = Id::new("\\Y");
            for (port, sig) in &cell.connections {
                if *port != y {
                    self.collect_sigspec_rhs(sig, &mut elided_cells);
                }
            }
        }
        if elided_cells.is_empty() {
            self.emit_attrs(&cell.attributes)?;
            writeln!(self.f, "{}// cell {}", self.indent, cell.name)?;
        } else {
            writeln!(
                self.f,
                "{}// cells {}",
                self.indent,
                elided_cells.iter().join(" ")
            )?;
        }

        if celltypes::is_elidable_cell(cell.ty) {
            write!(self.f, "{}", self.indent)?;
            self.emit_sigspec_lhs(cell.port("Y"))?;
            write!(self.f, " = ")?;
            self.emit_cell_elided(cell)?;
            writeln!(self.f, ";")
        } else if cell.ty == "$pmux" {
            self.emit_pmux_cell(cell)
        } else if celltypes::is_ff_cell(cell.ty) {
            self.emit_ff_cell(cell)
        } else if celltypes::is_memory_port_cell(cell.ty) {
            self.emit_memory_port_cell(cell_id)
        } else if celltypes::is_internal_cell(cell.ty) {
            unreachable!("unsupported internal cell `{}'", cell.ty)
        } else {
            self.emit_instance_cell(cell_id)
        }
    }

    /// Parallel (one-hot) muxes become a priority cascade: the least
    /// significant hot select bit wins.
    fn emit_pmux_cell(&mut self, cell: &Cell) -> fmt::Result {
        let width = cell.param_u32("WIDTH");
        let s_width = cell.param_u32("S_WIDTH");
        let mut first = true;
        for part in 0..s_width {
            if first {
                write!(self.f, "{}", self.indent)?;
            } else {
                write!(self.f, " else ")?;
            }
            first = false;
            write!(self.f, "if (")?;
            let select = cell.port("S").extract_bit(part);
            self.emit_sigspec_rhs(&select)?;
            writeln!(self.f, ") {{")?;
            self.inc_indent();
            write!(self.f, "{}", self.indent)?;
            self.emit_sigspec_lhs(cell.port("Y"))?;
            write!(self.f, " = ")?;
            let input = cell.port("B").extract(part * width, width);
            self.emit_sigspec_rhs(&input)?;
            writeln!(self.f, ";")?;
            self.dec_indent();
            write!(self.f, "{}}}", self.indent)?;
        }
        writeln!(self.f, " else {{")?;
        self.inc_indent();
        write!(self.f, "{}", self.indent)?;
        self.emit_sigspec_lhs(cell.port("Y"))?;
        write!(self.f, " = ")?;
        self.emit_sigspec_rhs(cell.port("A"))?;
        writeln!(self.f, ";")?;
        self.dec_indent();
        writeln!(self.f, "{}}}", self.indent)
    }

    fn emit_ff_cell(&mut self, cell: &Cell) -> fmt::Result {
        let module = self.module;
        let state = self.state;
        if cell.has_port("CLK") && is_wire_bit(cell.port("CLK")) {
            // Edge-sensitive logic.
            let clk_bit = state.sigmap.bit(cell.port("CLK").bit(0));
            writeln!(
                self.f,
                "{}if ({}_{}) {{",
                self.indent,
                if cell.param_bool("CLK_POLARITY") {
                    "posedge"
                } else {
                    "negedge"
                },
                mangle_sig_bit(module, clk_bit)
            )?;
            self.inc_indent();
            if cell.ty == "$dffe" {
                write!(self.f, "{}if (", self.indent)?;
                self.emit_sigspec_rhs(cell.port("EN"))?;
                writeln!(
                    self.f,
                    " == value<1> {{{}u}}) {{",
                    cell.param_bool("EN_POLARITY") as u32
                )?;
                self.inc_indent();
            }
            write!(self.f, "{}", self.indent)?;
            self.emit_sigspec_lhs(cell.port("Q"))?;
            write!(self.f, " = ")?;
            self.emit_sigspec_rhs(cell.port("D"))?;
            writeln!(self.f, ";")?;
            if cell.ty == "$dffe" {
                self.dec_indent();
                writeln!(self.f, "{}}}", self.indent)?;
            }
            self.dec_indent();
            writeln!(self.f, "{}}}", self.indent)?;
        } else if cell.has_port("EN") {
            // Level-sensitive logic.
            write!(self.f, "{}if (", self.indent)?;
            self.emit_sigspec_rhs(cell.port("EN"))?;
            writeln!(
                self.f,
                " == value<1> {{{}u}}) {{",
                cell.param_bool("EN_POLARITY") as u32
            )?;
            self.inc_indent();
            write!(self.f, "{}", self.indent)?;
            self.emit_sigspec_lhs(cell.port("Q"))?;
            write!(self.f, " = ")?;
            self.emit_sigspec_rhs(cell.port("D"))?;
            writeln!(self.f, ";")?;
            self.dec_indent();
            writeln!(self.f, "{}}}", self.indent)?;
        }
        if cell.has_port("ARST") {
            // Asynchronous reset (the entire coarse cell at once).
            write!(self.f, "{}if (", self.indent)?;
            self.emit_sigspec_rhs(cell.port("ARST"))?;
            writeln!(
                self.f,
                " == value<1> {{{}u}}) {{",
                cell.param_bool("ARST_POLARITY") as u32
            )?;
            self.inc_indent();
            write!(self.f, "{}", self.indent)?;
            self.emit_sigspec_lhs(cell.port("Q"))?;
            write!(self.f, " = ")?;
            self.emit_const(cell.param("ARST_VALUE"))?;
            writeln!(self.f, ";")?;
            self.dec_indent();
            writeln!(self.f, "{}}}", self.indent)?;
        }
        if cell.has_port("SET") {
            // Asynchronous set (individual bits).
            let width = cell.param_u32("WIDTH") as usize;
            write!(self.f, "{}", self.indent)?;
            self.emit_sigspec_lhs(cell.port("Q"))?;
            write!(self.f, " = ")?;
            self.emit_sigspec_lhs(cell.port("Q"))?;
            write!(self.f, ".update(")?;
            self.emit_const(&Const::ones(width))?;
            write!(self.f, ", ")?;
            self.emit_sigspec_rhs(cell.port("SET"))?;
            if !cell.param_bool("SET_POLARITY") {
                write!(self.f, ".bit_not()")?;
            }
            writeln!(self.f, ");")?;
        }
        if cell.has_port("CLR") {
            // Asynchronous clear (individual bits; priority over set).
            let width = cell.param_u32("WIDTH") as usize;
            write!(self.f, "{}", self.indent)?;
            self.emit_sigspec_lhs(cell.port("Q"))?;
            write!(self.f, " = ")?;
            self.emit_sigspec_lhs(cell.port("Q"))?;
            write!(self.f, ".update(")?;
            self.emit_const(&Const::zeros(width))?;
            write!(self.f, ", ")?;
            self.emit_sigspec_rhs(cell.port("CLR"))?;
            if !cell.param_bool("CLR_POLARITY") {
                write!(self.f, ".bit_not()")?;
            }
            writeln!(self.f, ");")?;
        }
        Ok(())
    }

    fn emit_memory_port_cell(&mut self, cell_id: CellId) -> fmt::Result {
        let module = self.module;
        let state = self.state;
        let cell = module.cell(cell_id);
        let memory_id = memory_of(module, cell_id);
        let memory = module.memory(memory_id);
        let clocked = cell.param_bool("CLK_ENABLE");
        if clocked {
            let clk_bit = state.sigmap.bit(cell.port("CLK").bit(0));
            writeln!(
                self.f,
                "{}if ({}_{}) {{",
                self.indent,
                if cell.param_bool("CLK_POLARITY") {
                    "posedge"
                } else {
                    "negedge"
                },
                mangle_sig_bit(module, clk_bit)
            )?;
            self.inc_indent();
        }
        let valid_index_temp = self.fresh_temporary();
        write!(self.f, "{}auto {} = memory_index(", self.indent, valid_index_temp)?;
        self.emit_sigspec_rhs(cell.port("ADDR"))?;
        writeln!(self.f, ", {}, {});", memory.start_offset, memory.size)?;
        if cell.ty == "$memrd" {
            let guarded = !cell.port("EN").is_fully_ones();
            if guarded {
                write!(self.f, "{}if (", self.indent)?;
                self.emit_sigspec_rhs(cell.port("EN"))?;
                writeln!(self.f, ") {{")?;
                self.inc_indent();
            }
            // Two bounds checks: the assertion crashes loudly on illegal
            // addresses, and the guard below keeps the behavior defined when
            // assertions are compiled out (out-of-bounds reads return zero).
            writeln!(
                self.f,
                "{}assert({}.valid && \"out of bounds read\");",
                self.indent, valid_index_temp
            )?;
            writeln!(self.f, "{}if({}.valid) {{", self.indent, valid_index_temp)?;
            self.inc_indent();
            if state.writable_memories.contains(&memory_id) {
                let addr_temp = self.fresh_temporary();
                write!(
                    self.f,
                    "{}const value<{}> &{} = ",
                    self.indent,
                    cell.port("ADDR").len(),
                    addr_temp
                )?;
                self.emit_sigspec_rhs(cell.port("ADDR"))?;
                writeln!(self.f, ";")?;
                let lhs_temp = self.fresh_temporary();
                writeln!(
                    self.f,
                    "{}value<{}> {} = {}[{}.index];",
                    self.indent,
                    memory.width,
                    lhs_temp,
                    mangle_memory_name(memory.name),
                    valid_index_temp
                )?;
                // Transparent reads observe writes in their clock domain in
                // ascending priority order; ties follow IR order.
                let mut memwr_cells = state
                    .transparent_for
                    .get(&cell_id)
                    .cloned()
                    .unwrap_or_default();
                memwr_cells
                    .sort_by_key(|id| module.cell(*id).param_u32("PRIORITY"));
                for memwr_id in memwr_cells {
                    let memwr = module.cell(memwr_id);
                    write!(self.f, "{}if ({} == ", self.indent, addr_temp)?;
                    self.emit_sigspec_rhs(memwr.port("ADDR"))?;
                    writeln!(self.f, ") {{")?;
                    self.inc_indent();
                    write!(
                        self.f,
                        "{}{} = {}.update(",
                        self.indent, lhs_temp, lhs_temp
                    )?;
                    self.emit_sigspec_rhs(memwr.port("DATA"))?;
                    write!(self.f, ", ")?;
                    self.emit_sigspec_rhs(memwr.port("EN"))?;
                    writeln!(self.f, ");")?;
                    self.dec_indent();
                    writeln!(self.f, "{}}}", self.indent)?;
                }
                write!(self.f, "{}", self.indent)?;
                self.emit_sigspec_lhs(cell.port("DATA"))?;
                writeln!(self.f, " = {};", lhs_temp)?;
            } else {
                write!(self.f, "{}", self.indent)?;
                self.emit_sigspec_lhs(cell.port("DATA"))?;
                writeln!(
                    self.f,
                    " = {}[{}.index];",
                    mangle_memory_name(memory.name),
                    valid_index_temp
                )?;
            }
            self.dec_indent();
            writeln!(self.f, "{}}} else {{", self.indent)?;
            self.inc_indent();
            write!(self.f, "{}", self.indent)?;
            self.emit_sigspec_lhs(cell.port("DATA"))?;
            writeln!(self.f, " = value<{}> {{}};", memory.width)?;
            self.dec_indent();
            writeln!(self.f, "{}}}", self.indent)?;
            if guarded {
                self.dec_indent();
                writeln!(self.f, "{}}}", self.indent)?;
            }
        } else {
            assert!(
                state.writable_memories.contains(&memory_id),
                "write port to a read-only memory"
            );
            // Out-of-bounds writes are defined to do nothing; see the read
            // port above for the dual-check rationale.
            writeln!(
                self.f,
                "{}assert({}.valid && \"out of bounds write\");",
                self.indent, valid_index_temp
            )?;
            writeln!(
                self.f,
                "{}if ({}.valid) {{",
                self.indent, valid_index_temp
            )?;
            self.inc_indent();
            write!(
                self.f,
                "{}{}.update({}.index, ",
                self.indent,
                mangle_memory_name(memory.name),
                valid_index_temp
            )?;
            self.emit_sigspec_rhs(cell.port("DATA"))?;
            write!(self.f, ", ")?;
            self.emit_sigspec_rhs(cell.port("EN"))?;
            writeln!(self.f, ", {});", cell.param_u32("PRIORITY"))?;
            self.dec_indent();
            writeln!(self.f, "{}}}", self.indent)?;
        }
        if clocked {
            self.dec_indent();
            writeln!(self.f, "{}}}", self.indent)?;
        }
        Ok(())
    }

    fn emit_instance_cell(&mut self, cell_id: CellId) -> fmt::Result {
        let module = self.module;
        let state = self.state;
        let design = self.design;
        let cell = module.cell(cell_id);
        for (port, sig) in &cell.connections {
            if design.cell_port_input(cell, *port) {
                write!(
                    self.f,
                    "{}{}.{}.next = ",
                    self.indent,
                    mangle_cell_name(cell.name),
                    mangle_wire_name(*port)
                )?;
                self.emit_sigspec_rhs(sig)?;
                writeln!(self.f, ";")?;
            }
        }
        writeln!(self.f, "{}{}.eval();", self.indent, mangle_cell_name(cell.name))?;
        for (port, sig) in &cell.connections {
            if let Some(wire) = sig.as_wire(module) {
                let defined_here = state
                    .cell_wire_defs
                    .get(&cell_id)
                    .map_or(false, |defs| defs.contains_key(&wire));
                if state.elided_wires.contains_key(&wire) && defined_here {
                    continue;
                }
            }
            if design.cell_port_output(cell, *port) {
                write!(self.f, "{}", self.indent)?;
                self.emit_sigspec_lhs(sig)?;
                writeln!(
                    self.f,
                    " = {}.{}.curr;",
                    mangle_cell_name(cell.name),
                    mangle_wire_name(*port)
                )?;
            }
        }
        Ok(())
    }

    // Processes

    fn emit_assign(&mut self, (lhs, rhs): &SigSig) -> fmt::Result {
        write!(self.f, "{}", self.indent)?;
        self.emit_sigspec_lhs(lhs)?;
        write!(self.f, " = ")?;
        self.emit_sigspec_rhs(rhs)?;
        writeln!(self.f, ";")
    }

    fn emit_case_rule(&mut self, rule: &CaseRule) -> fmt::Result {
        for action in &rule.actions {
            self.emit_assign(action)?;
        }
        for switch in &rule.switches {
            self.emit_switch_rule(switch)?;
        }
        Ok(())
    }

    fn emit_switch_rule(&mut self, rule: &SwitchRule) -> fmt::Result {
        // The switch attributes precede the captured switch condition.
        self.emit_attrs(&rule.attributes)?;
        let signal_temp = self.fresh_temporary();
        write!(
            self.f,
            "{}const value<{}> &{} = ",
            self.indent,
            rule.signal.len(),
            signal_temp
        )?;
        self.emit_sigspec(&rule.signal, /*is_lhs=*/ false)?;
        writeln!(self.f, ";")?;

        let mut first = true;
        for case in &rule.cases {
            self.emit_attrs(&case.attributes)?;
            write!(self.f, "{}", self.indent)?;
            if !first {
                write!(self.f, "}} else ")?;
            }
            first = false;
            if !case.compare.is_empty() {
                write!(self.f, "if (")?;
                let mut first_compare = true;
                for compare in &case.compare {
                    if !first_compare {
                        write!(self.f, " || ")?;
                    }
                    first_compare = false;
                    if compare.is_fully_def() {
                        write!(self.f, "{} == ", signal_temp)?;
                        self.emit_sigspec(compare, /*is_lhs=*/ false)?;
                    } else if compare.is_fully_const() {
                        // A comparison with x/z bits tests the remaining
                        // defined positions through a mask.
                        let value = compare.as_const().unwrap();
                        let mut mask_bits = Vec::with_capacity(value.len());
                        let mut value_bits = Vec::with_capacity(value.len());
                        for bit in value.bits() {
                            match bit {
                                State::S0 | State::S1 => {
                                    mask_bits.push(State::S1);
                                    value_bits.push(*bit);
                                }
                                State::Sx | State::Sz | State::Sa => {
                                    mask_bits.push(State::S0);
                                    value_bits.push(State::S0);
                                }
                            }
                        }
                        write!(
                            self.f,
                            "and_uu<{}>({}, ",
                            compare.len(),
                            signal_temp
                        )?;
                        self.emit_const(&Const::Bits(mask_bits))?;
                        write!(self.f, ") == ")?;
                        self.emit_const(&Const::Bits(value_bits))?;
                    } else {
                        unreachable!("case compare is not constant")
                    }
                }
                write!(self.f, ") ")?;
            }
            writeln!(self.f, "{{")?;
            self.inc_indent();
            self.emit_case_rule(case)?;
            self.dec_indent();
        }
        writeln!(self.f, "{}}}", self.indent)
    }

    fn emit_process(&mut self, proc_id: ProcId) -> fmt::Result {
        let module = self.module;
        let state = self.state;
        let process = module.process(proc_id);
        self.emit_attrs(&process.attributes)?;
        writeln!(self.f, "{}// process {}", self.indent, process.name)?;
        self.emit_case_rule(&process.root_case)?;
        for sync in &process.syncs {
            match sync.kind {
                SyncType::Posedge | SyncType::Negedge | SyncType::Edge => {
                    let bit = state.sigmap.bit(sync.signal.bit(0));
                    let name = mangle_sig_bit(module, bit);
                    let mut events = Vec::new();
                    if sync.kind != SyncType::Negedge {
                        events.push(format!("posedge_{}", name));
                    }
                    if sync.kind != SyncType::Posedge {
                        events.push(format!("negedge_{}", name));
                    }
                    write!(self.f, "{}if (", self.indent)?;
                    write!(self.f, "{}", events.join(" || "))?;
                    writeln!(self.f, ") {{")?;
                    self.inc_indent();
                    for action in &sync.actions {
                        self.emit_assign(action)?;
                    }
                    self.dec_indent();
                    writeln!(self.f, "{}}}", self.indent)?;
                }
                SyncType::Low | SyncType::High => {
                    write!(self.f, "{}if (", self.indent)?;
                    self.emit_sigspec_rhs(&sync.signal)?;
                    writeln!(
                        self.f,
                        " == value<{}> {{{}u}}) {{",
                        sync.signal.len(),
                        (sync.kind == SyncType::High) as u32
                    )?;
                    self.inc_indent();
                    for action in &sync.actions {
                        self.emit_assign(action)?;
                    }
                    self.dec_indent();
                    writeln!(self.f, "{}}}", self.indent)?;
                }
                SyncType::Always => {
                    for action in &sync.actions {
                        self.emit_assign(action)?;
                    }
                }
                SyncType::Init | SyncType::Global => {
                    unreachable!("sync type rejected during analysis")
                }
            }
        }
        Ok(())
    }

    // Declarations

    fn emit_wire(&mut self, wire_id: WireId, is_local: bool) -> fmt::Result {
        let module = self.module;
        let state = self.state;
        let wire = module.wire(wire_id);
        if state.elided_wires.contains_key(&wire_id) {
            return Ok(());
        }
        if is_local {
            if !state.localized_wires.contains(&wire_id) {
                return Ok(());
            }
            self.emit_attrs(&wire.attributes)?;
            writeln!(
                self.f,
                "{}value<{}> {};",
                self.indent,
                wire.width,
                mangle_wire_name(wire.name)
            )
        } else {
            if state.localized_wires.contains(&wire_id) {
                return Ok(());
            }
            self.emit_attrs(&wire.attributes)?;
            write!(
                self.f,
                "{}wire<{}> {}",
                self.indent,
                wire.width,
                mangle_wire_name(wire.name)
            )?;
            if let Some(init) = wire.init() {
                write!(self.f, " ")?;
                self.emit_const_init(init, init.len(), 0, false)?;
            }
            writeln!(self.f, ";")?;
            if state.sync_wires.contains(&wire_id) {
                for (&(sync_wire, offset), &kind) in state.sync_types.iter() {
                    if sync_wire != wire_id {
                        continue;
                    }
                    let name =
                        mangle_sig_bit(module, SigBit::Wire(sync_wire, offset));
                    if kind != SyncType::Negedge {
                        writeln!(
                            self.f,
                            "{}bool posedge_{} = false;",
                            self.indent, name
                        )?;
                    }
                    if kind != SyncType::Posedge {
                        writeln!(
                            self.f,
                            "{}bool negedge_{} = false;",
                            self.indent, name
                        )?;
                    }
                }
            }
            Ok(())
        }
    }

    fn emit_memory(&mut self, memory_id: MemoryId) -> fmt::Result {
        let module = self.module;
        let state = self.state;
        let memory = module.memory(memory_id);

        let mut init_cells: Vec<CellId> = module
            .cells()
            .filter(|(id, cell)| {
                cell.ty == "$meminit" && memory_of(module, *id) == memory_id
            })
            .map(|(id, _)| id)
            .collect();
        init_cells.sort_by(|&a, &b| {
            let (a, b) = (module.cell(a), module.cell(b));
            let a_prio = a.param_u32("PRIORITY");
            let b_prio = b.param_u32("PRIORITY");
            let a_addr = a.port("ADDR").as_const().unwrap().as_u64();
            let b_addr = b.port("ADDR").as_const().unwrap().as_u64();
            b_prio.cmp(&a_prio).then(a_addr.cmp(&b_addr))
        });

        self.emit_attrs(&memory.attributes)?;
        write!(
            self.f,
            "{}{}memory<{}> {} {{ {}u",
            self.indent,
            if state.writable_memories.contains(&memory_id) {
                ""
            } else {
                "const "
            },
            memory.width,
            mangle_memory_name(memory.name),
            memory.size
        )?;
        if init_cells.is_empty() {
            writeln!(self.f, " }};")?;
        } else {
            writeln!(self.f, ",")?;
            self.inc_indent();
            for cell_id in init_cells {
                let cell = module.cell(cell_id);
                self.emit_attrs(&cell.attributes)?;
                let data = cell.port("DATA").as_const().unwrap();
                let width = cell.param_u32("WIDTH") as usize;
                let words = cell.param_u32("WORDS") as usize;
                let addr = cell.port("ADDR").as_const().unwrap().as_u64();
                write!(
                    self.f,
                    "{}memory<{}>::init<{}> {{ {:#x}, {{",
                    self.indent, memory.width, words, addr
                )?;
                self.inc_indent();
                for word in 0..words {
                    if word % 4 == 0 {
                        write!(self.f, "\n{}", self.indent)?;
                    } else {
                        write!(self.f, " ")?;
                    }
                    self.emit_const_width(
                        &data,
                        width,
                        word * width,
                        /*fixed_width=*/ true,
                    )?;
                    write!(self.f, ",")?;
                }
                self.dec_indent();
                writeln!(self.f, "\n{}}}}},", self.indent)?;
            }
            self.dec_indent();
            writeln!(self.f, "{}}};", self.indent)?;
        }
        Ok(())
    }

    // Modules

    fn emit_module_intf(&mut self) -> fmt::Result {
        let module = self.module;
        self.emit_attrs(&module.attributes)?;
        writeln!(
            self.f,
            "struct {} : public module {{",
            mangle_module_name(module.name)
        )?;
        self.inc_indent();
        for (wire_id, _) in module.wires() {
            self.emit_wire(wire_id, /*is_local=*/ false)?;
        }
        writeln!(self.f)?;
        let mut has_memories = false;
        for (memory_id, _) in module.memories() {
            self.emit_memory(memory_id)?;
            has_memories = true;
        }
        if has_memories {
            writeln!(self.f)?;
        }
        let mut has_cells = false;
        for (_, cell) in module.cells() {
            if celltypes::is_internal_cell(cell.ty) {
                continue;
            }
            writeln!(
                self.f,
                "{}{} {};",
                self.indent,
                mangle_module_name(cell.ty),
                mangle_cell_name(cell.name)
            )?;
            has_cells = true;
        }
        if has_cells {
            writeln!(self.f)?;
        }
        writeln!(self.f, "{}void eval() override;", self.indent)?;
        writeln!(self.f, "{}bool commit() override;", self.indent)?;
        self.dec_indent();
        writeln!(self.f, "}}; // struct {}", mangle_module_name(module.name))?;
        writeln!(self.f)
    }

    fn emit_module_impl(&mut self) -> fmt::Result {
        let module = self.module;
        let state = self.state;

        writeln!(self.f, "void {}::eval() {{", mangle_module_name(module.name))?;
        self.inc_indent();
        for (wire_id, _) in module.wires() {
            self.emit_wire(wire_id, /*is_local=*/ true)?;
        }
        for node in &state.schedule {
            match node {
                Node::Connect(conn) => self.emit_connect(conn)?,
                Node::Cell(cell_id) => self.emit_cell(*cell_id)?,
                Node::Process(proc_id) => self.emit_process(*proc_id)?,
            }
        }
        // The edge flags computed by the previous commit are consumed; clear
        // them so the next commit starts from a clean slate.
        for (&(wire, offset), &kind) in state.sync_types.iter() {
            let name = mangle_sig_bit(module, SigBit::Wire(wire, offset));
            if kind != SyncType::Negedge {
                writeln!(self.f, "{}posedge_{} = false;", self.indent, name)?;
            }
            if kind != SyncType::Posedge {
                writeln!(self.f, "{}negedge_{} = false;", self.indent, name)?;
            }
        }
        self.dec_indent();
        writeln!(self.f, "}}")?;
        writeln!(self.f)?;

        writeln!(self.f, "bool {}::commit() {{", mangle_module_name(module.name))?;
        self.inc_indent();
        writeln!(self.f, "{}bool changed = false;", self.indent)?;
        for (wire_id, wire) in module.wires() {
            if state.elided_wires.contains_key(&wire_id)
                || state.localized_wires.contains(&wire_id)
            {
                continue;
            }
            let name = mangle_wire_name(wire.name);
            if state.sync_wires.contains(&wire_id) {
                let wire_prev = format!("{}_prev", name);
                let wire_curr = format!("{}.curr", name);
                let wire_edge = format!("{}_edge", name);
                writeln!(
                    self.f,
                    "{}value<{}> {} = {};",
                    self.indent, wire.width, wire_prev, wire_curr
                )?;
                writeln!(self.f, "{}if ({}.commit()) {{", self.indent, name)?;
                self.inc_indent();
                writeln!(
                    self.f,
                    "{}value<{}> {} = {}.bit_xor({});",
                    self.indent, wire.width, wire_edge, wire_prev, wire_curr
                )?;
                for (&(sync_wire, offset), &kind) in state.sync_types.iter() {
                    if sync_wire != wire_id {
                        continue;
                    }
                    let bit =
                        mangle_sig_bit(module, SigBit::Wire(sync_wire, offset));
                    if kind != SyncType::Negedge {
                        writeln!(
                            self.f,
                            "{}if ({}.slice<{}>().val() && {}.slice<{}>().val())",
                            self.indent, wire_edge, offset, wire_curr, offset
                        )?;
                        self.inc_indent();
                        writeln!(
                            self.f,
                            "{}posedge_{} = true;",
                            self.indent, bit
                        )?;
                        self.dec_indent();
                    }
                    if kind != SyncType::Posedge {
                        writeln!(
                            self.f,
                            "{}if ({}.slice<{}>().val() && !{}.slice<{}>().val())",
                            self.indent, wire_edge, offset, wire_curr, offset
                        )?;
                        self.inc_indent();
                        writeln!(
                            self.f,
                            "{}negedge_{} = true;",
                            self.indent, bit
                        )?;
                        self.dec_indent();
                    }
                    writeln!(self.f, "{}changed = true;", self.indent)?;
                }
                self.dec_indent();
                writeln!(self.f, "{}}}", self.indent)?;
            } else {
                writeln!(self.f, "{}changed |= {}.commit();", self.indent, name)?;
            }
        }
        for (memory_id, memory) in module.memories() {
            if !state.writable_memories.contains(&memory_id) {
                continue;
            }
            writeln!(
                self.f,
                "{}changed |= {}.commit();",
                self.indent,
                mangle_memory_name(memory.name)
            )?;
        }
        for (_, cell) in module.cells() {
            if celltypes::is_internal_cell(cell.ty) {
                continue;
            }
            writeln!(
                self.f,
                "{}changed |= {}.commit();",
                self.indent,
                mangle_cell_name(cell.name)
            )?;
        }
        writeln!(self.f, "{}return changed;", self.indent)?;
        self.dec_indent();
        writeln!(self.f, "}}")?;
        writeln!(self.f)
    }
}
