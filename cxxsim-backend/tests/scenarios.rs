//! End-to-end checks: small netlists in, generated C++ text out.

use cxxsim_backend::{check_design, generate, Options, Worker};
use cxxsim_ir::{Cell, Const, Design, Memory, Module, SigSpec, WireId};

fn port_in(module: &mut Module, name: &str, width: u32) -> WireId {
    let wire = module.add_wire(name, width);
    let decl = module.wire_mut(wire);
    decl.port_id = Some(decl.name.as_str().len() as u32);
    decl.port_input = true;
    wire
}

fn port_out(module: &mut Module, name: &str, width: u32) -> WireId {
    let wire = module.add_wire(name, width);
    let decl = module.wire_mut(wire);
    decl.port_id = Some(decl.name.as_str().len() as u32);
    decl.port_output = true;
    wire
}

fn binary_cell(
    module: &mut Module,
    name: &str,
    ty: &str,
    a: WireId,
    b: WireId,
    y: WireId,
    width: u32,
) {
    let mut cell = Cell::new(name, ty);
    cell.set_port("A", module.sig(a));
    cell.set_port("B", module.sig(b));
    cell.set_port("Y", module.sig(y));
    cell.set_param_bool("A_SIGNED", false);
    cell.set_param_bool("B_SIGNED", false);
    cell.set_param_u64("Y_WIDTH", width as u64);
    module.add_cell(cell);
}

fn generate_at(design: &Design, level: u32) -> String {
    let opts = Options::default().with_opt_level(level).unwrap();
    generate(design, &opts).unwrap().implementation
}

#[test]
fn and_gate() {
    let mut module = Module::new("\\top");
    let a = port_in(&mut module, "\\a", 1);
    let b = port_in(&mut module, "\\b", 1);
    let y = port_out(&mut module, "\\y", 1);
    binary_cell(&mut module, "$and$top.v:3$1", "$and", a, b, y, 1);
    let mut design = Design::new();
    design.add_module(module);

    let code = generate_at(&design, 5);
    assert!(code.contains("struct p_top : public module {"));
    assert!(code.contains("\twire<1> p_a;"));
    assert!(code.contains("p_y.next = and_uu<1>(p_a.curr, p_b.curr);"));
    assert!(code.contains("changed |= p_a.commit();"));
    assert!(code.contains("changed |= p_y.commit();"));
    assert!(code.contains("return changed;"));
}

#[test]
fn posedge_dff() {
    let mut module = Module::new("\\top");
    let clk = port_in(&mut module, "\\clk", 1);
    let d = port_in(&mut module, "\\d", 1);
    let q = port_out(&mut module, "\\q", 1);
    module
        .wire_mut(q)
        .attributes
        .set("\\init", Const::from_u64(0, 1));
    let mut cell = Cell::new("$dff$top.v:7$1", "$dff");
    cell.set_port("CLK", module.sig(clk));
    cell.set_port("D", module.sig(d));
    cell.set_port("Q", module.sig(q));
    cell.set_param_bool("CLK_POLARITY", true);
    cell.set_param_u64("WIDTH", 1);
    module.add_cell(cell);
    let mut design = Design::new();
    design.add_module(module);

    let code = generate_at(&design, 5);
    // Interface: the clock wire carries its edge flag, Q carries its init.
    assert!(code.contains("\twire<1> p_clk;"));
    assert!(code.contains("\tbool posedge_p_clk = false;"));
    assert!(code.contains("\twire<1> p_q {0x0u};"));
    // Eval: the update is gated on the edge flag, which is then consumed.
    assert!(code.contains("\tif (posedge_p_clk) {"));
    assert!(code.contains("\t\tp_q.next = p_d.curr;"));
    assert!(code.contains("\tposedge_p_clk = false;"));
    // Commit: a 0->1 transition of the committed clock raises the flag.
    assert!(code.contains("\tvalue<1> p_clk_prev = p_clk.curr;"));
    assert!(code.contains("\tif (p_clk.commit()) {"));
    assert!(code
        .contains("\t\tvalue<1> p_clk_edge = p_clk_prev.bit_xor(p_clk.curr);"));
    assert!(code.contains(
        "\t\tif (p_clk_edge.slice<0>().val() && p_clk.curr.slice<0>().val())"
    ));
    assert!(code.contains("\t\t\tposedge_p_clk = true;"));
    // The data input does not raise edge flags.
    assert!(!code.contains("posedge_p_d"));
}

#[test]
fn pmux_priority_cascade() {
    let mut module = Module::new("\\top");
    let a = port_in(&mut module, "\\a", 4);
    let b = port_in(&mut module, "\\b", 12);
    let s = port_in(&mut module, "\\s", 3);
    let y = port_out(&mut module, "\\y", 4);
    let mut cell = Cell::new("$pmux$top.v:11$1", "$pmux");
    cell.set_port("A", module.sig(a));
    cell.set_port("B", module.sig(b));
    cell.set_port("S", module.sig(s));
    cell.set_port("Y", module.sig(y));
    cell.set_param_u64("WIDTH", 4);
    cell.set_param_u64("S_WIDTH", 3);
    module.add_cell(cell);
    let mut design = Design::new();
    design.add_module(module);

    let code = generate_at(&design, 5);
    let first = code.find("if (p_s.curr.slice<0>().val()) {").unwrap();
    let second = code.find("if (p_s.curr.slice<1>().val()) {").unwrap();
    let third = code.find("if (p_s.curr.slice<2>().val()) {").unwrap();
    assert!(first < second && second < third);
    assert!(code.contains("p_y.next = p_b.curr.slice<3,0>().val();"));
    assert!(code.contains("p_y.next = p_b.curr.slice<7,4>().val();"));
    assert!(code.contains("p_y.next = p_b.curr.slice<11,8>().val();"));
    // The default arm reads A last.
    assert!(code.contains(" else {\n\t\tp_y.next = p_a.curr;\n\t}\n"));
}

#[test]
fn transparent_memory_read() {
    let mut module = Module::new("\\top");
    let clk = port_in(&mut module, "\\clk", 1);
    let wa = port_in(&mut module, "\\wa", 4);
    let wd = port_in(&mut module, "\\wd", 8);
    let we = port_in(&mut module, "\\we", 8);
    let ra = port_in(&mut module, "\\ra", 4);
    let rd = port_out(&mut module, "\\rd", 8);
    module.add_memory(Memory::new("\\ram", 8, 16));

    let mut write = Cell::new("$memwr$\\ram$top.v:20$1", "$memwr");
    write.set_port("CLK", module.sig(clk));
    write.set_port("EN", module.sig(we));
    write.set_port("ADDR", module.sig(wa));
    write.set_port("DATA", module.sig(wd));
    write.set_param_str("MEMID", "\\ram");
    write.set_param_bool("CLK_ENABLE", true);
    write.set_param_bool("CLK_POLARITY", true);
    write.set_param_u64("PRIORITY", 1);
    module.add_cell(write);

    let mut read = Cell::new("$memrd$\\ram$top.v:21$2", "$memrd");
    read.set_port("CLK", module.sig(clk));
    read.set_port("EN", SigSpec::constant(Const::ones(1)));
    read.set_port("ADDR", module.sig(ra));
    read.set_port("DATA", module.sig(rd));
    read.set_param_str("MEMID", "\\ram");
    read.set_param_bool("CLK_ENABLE", true);
    read.set_param_bool("CLK_POLARITY", true);
    read.set_param_bool("TRANSPARENT", true);
    module.add_cell(read);

    let mut design = Design::new();
    design.add_module(module);

    let code = generate_at(&design, 5);
    assert!(code.contains("memory_p_ram.update("));
    assert!(code.contains(" = memory_p_ram["));
    // The read fetches the stored word, then forwards the concurrent write
    // where the addresses match.
    assert!(code.contains("if (posedge_p_clk) {"));
    assert!(code.contains(" == p_wa.curr) {"));
    assert!(code.contains(".update(p_wd.curr, p_we.curr);"));
    assert!(code.contains("assert(tmp_0.valid && \"out of bounds read\");"));
    assert!(code.contains("&& \"out of bounds write\");"));
    // The written memory commits.
    assert!(code.contains("changed |= memory_p_ram.commit();"));
    assert!(code.contains("memory<8> memory_p_ram { 16u };"));
}

#[test]
fn async_reset_dff() {
    let mut module = Module::new("\\top");
    let clk = port_in(&mut module, "\\clk", 1);
    let rst = port_in(&mut module, "\\rst", 1);
    let d = port_in(&mut module, "\\d", 4);
    let q = port_out(&mut module, "\\q", 4);
    let mut cell = Cell::new("$adff$top.v:9$1", "$adff");
    cell.set_port("CLK", module.sig(clk));
    cell.set_port("ARST", module.sig(rst));
    cell.set_port("D", module.sig(d));
    cell.set_port("Q", module.sig(q));
    cell.set_param_bool("CLK_POLARITY", true);
    cell.set_param_bool("ARST_POLARITY", true);
    cell.set_param("ARST_VALUE", Const::from_u64(5, 4));
    cell.set_param_u64("WIDTH", 4);
    module.add_cell(cell);
    let mut design = Design::new();
    design.add_module(module);

    let code = generate_at(&design, 5);
    let update = code.find("\t\tp_q.next = p_d.curr;").unwrap();
    let reset = code.find("if (p_rst.curr == value<1> {1u}) {").unwrap();
    // The reset override is emitted after the clocked update and therefore
    // wins whenever the reset is asserted, regardless of clock edges.
    assert!(update < reset);
    assert!(code.contains("p_q.next = value<4>{0x5u};"));
}

#[test]
fn combinational_feedback() {
    let mut module = Module::new("\\top");
    let fb = module.add_wire("\\fb", 1);
    let mut cell = Cell::new("$not$top.v:2$1", "$not");
    cell.set_port("A", module.sig(fb));
    cell.set_port("Y", module.sig(fb));
    cell.set_param_bool("A_SIGNED", false);
    cell.set_param_u64("Y_WIDTH", 1);
    module.add_cell(cell);
    let mut design = Design::new();
    let top = design.add_module(module);

    let opts = Options::default().with_opt_level(4).unwrap();
    check_design(&design).unwrap();
    let mut worker = Worker::new(&design, opts);
    worker.analyze().unwrap();
    let state = worker.state(top);
    assert!(state.feedback_wires.contains(&fb));
    assert!(!state.elided_wires.contains_key(&fb));
    assert!(!state.localized_wires.contains(&fb));

    let code = worker.emit_design().unwrap().implementation;
    // The feedback wire keeps its register pair; the driver re-iterates
    // eval/commit until commit reports quiescence (which never happens for
    // an inverter loop; the simulation visibly oscillates).
    assert!(code.contains("\twire<1> p_fb;"));
    assert!(code.contains("p_fb.next = not_u<1>(p_fb.curr);"));
    assert!(code.contains("changed |= p_fb.commit();"));
}

#[test]
fn instance_hierarchy() {
    let mut leaf = Module::new("\\leaf");
    let li = port_in(&mut leaf, "\\i", 1);
    let lo = port_out(&mut leaf, "\\o", 1);
    let mut cell = Cell::new("$not$leaf.v:2$1", "$not");
    cell.set_port("A", leaf.sig(li));
    cell.set_port("Y", leaf.sig(lo));
    cell.set_param_bool("A_SIGNED", false);
    cell.set_param_u64("Y_WIDTH", 1);
    leaf.add_cell(cell);

    let mut top = Module::new("\\top");
    let ti = port_in(&mut top, "\\i", 1);
    let to = port_out(&mut top, "\\o", 1);
    let mut instance = Cell::new("\\u0", "\\leaf");
    instance.connections.insert("\\i".into(), top.sig(ti));
    instance.connections.insert("\\o".into(), top.sig(to));
    top.add_cell(instance);

    let mut design = Design::new();
    design.add_module(top);
    design.add_module(leaf);

    let code = generate_at(&design, 0);
    // The leaf struct is declared before the parent that embeds it.
    let leaf_at = code.find("struct p_leaf : public module {").unwrap();
    let top_at = code.find("struct p_top : public module {").unwrap();
    assert!(leaf_at < top_at);
    assert!(code.contains("\tp_leaf cell_p_u0;"));
    assert!(code.contains("\tcell_p_u0.p_i.next = p_i.curr;"));
    assert!(code.contains("\tcell_p_u0.eval();"));
    assert!(code.contains("\tp_o.next = cell_p_u0.p_o.curr;"));
    assert!(code.contains("\tchanged |= cell_p_u0.commit();"));
}

#[test]
fn partial_selection_is_rejected() {
    let mut design = Design::new();
    let mut module = Module::new("\\top");
    port_in(&mut module, "\\a", 1);
    design.add_module(module);
    let mut selection = std::collections::HashMap::new();
    selection.insert("\\top".into(), cxxsim_ir::Selected::Partial);
    design.set_selection(selection);
    assert!(check_design(&design).is_err());
}

#[test]
fn elision_and_localization_levels() {
    // \a -> $not -> $mid (single use) -> $not -> \y
    //       $not -> $shared (two uses) -> two $not readers
    fn build() -> (Design, WireId, WireId) {
        let mut module = Module::new("\\top");
        let a = port_in(&mut module, "\\a", 1);
        let y = port_out(&mut module, "\\y", 1);
        let y2 = port_out(&mut module, "\\y2", 1);
        let y3 = port_out(&mut module, "\\y3", 1);
        let mid = module.add_wire("$mid", 1);
        let shared = module.add_wire("$shared", 1);
        for (name, input, output) in [
            ("$not$1", a, mid),
            ("$not$2", mid, y),
            ("$not$3", a, shared),
            ("$not$4", shared, y2),
            ("$not$5", shared, y3),
        ] {
            let mut cell = Cell::new(name, "$not");
            cell.set_port("A", module.sig(input));
            cell.set_port("Y", module.sig(output));
            cell.set_param_bool("A_SIGNED", false);
            cell.set_param_u64("Y_WIDTH", 1);
            module.add_cell(cell);
        }
        let mut design = Design::new();
        design.add_module(module);
        (design, mid, shared)
    }

    let (design, mid, shared) = build();
    let top = design.modules().next().unwrap().0;

    let mut elided_sizes = Vec::new();
    let mut localized_sizes = Vec::new();
    let mut previous: Option<(Vec<WireId>, Vec<WireId>)> = None;
    for level in 0..=4 {
        let opts = Options::default().with_opt_level(level).unwrap();
        let mut worker = Worker::new(&design, opts);
        worker.analyze().unwrap();
        let state = worker.state(top);

        // Elision and localization are mutually exclusive.
        for wire in &state.localized_wires {
            assert!(!state.elided_wires.contains_key(wire));
        }
        // Ports never move out of the interface.
        for (wire_id, wire) in design.module(top).wires() {
            if wire.is_port() {
                assert!(!state.elided_wires.contains_key(&wire_id));
                assert!(!state.localized_wires.contains(&wire_id));
            }
        }

        let mut elided: Vec<WireId> =
            state.elided_wires.keys().copied().collect();
        let mut localized: Vec<WireId> =
            state.localized_wires.iter().copied().collect();
        elided.sort();
        localized.sort();
        // Raising the level only grows both sets.
        if let Some((prev_elided, prev_localized)) = &previous {
            assert!(prev_elided.iter().all(|w| elided.contains(w)));
            assert!(prev_localized.iter().all(|w| localized.contains(w)));
        }
        elided_sizes.push(elided.len());
        localized_sizes.push(localized.len());
        previous = Some((elided, localized));

        match level {
            0 => {
                assert!(elided_sizes[0] == 0 && localized_sizes[0] == 0);
            }
            1 => {
                assert!(state.elided_wires.contains_key(&mid));
                assert!(!state.localized_wires.contains(&shared));
            }
            2 => {
                assert!(state.elided_wires.contains_key(&mid));
                assert!(state.localized_wires.contains(&shared));
            }
            _ => {}
        }
    }
}

#[test]
fn keep_and_sync_wires_stay_registered() {
    let mut module = Module::new("\\top");
    let a = port_in(&mut module, "\\a", 1);
    let clk = port_in(&mut module, "\\clk", 1);
    let q = port_out(&mut module, "\\q", 1);
    // A derived internal clock: sync, so neither elided nor localized.
    let iclk = module.add_wire("$iclk", 1);
    let mut gate = Cell::new("$not$0", "$not");
    gate.set_port("A", module.sig(clk));
    gate.set_port("Y", module.sig(iclk));
    gate.set_param_bool("A_SIGNED", false);
    gate.set_param_u64("Y_WIDTH", 1);
    module.add_cell(gate);
    // A kept internal wire.
    let kept = module.add_wire("$kept", 1);
    module.wire_mut(kept).attributes.set_bool("\\keep");
    let mut not = Cell::new("$not$1", "$not");
    not.set_port("A", module.sig(a));
    not.set_port("Y", module.sig(kept));
    not.set_param_bool("A_SIGNED", false);
    not.set_param_u64("Y_WIDTH", 1);
    module.add_cell(not);
    let mut dff = Cell::new("$dff$1", "$dff");
    dff.set_port("CLK", module.sig(iclk));
    dff.set_port("D", module.sig(kept));
    dff.set_port("Q", module.sig(q));
    dff.set_param_bool("CLK_POLARITY", true);
    dff.set_param_u64("WIDTH", 1);
    module.add_cell(dff);
    let mut design = Design::new();
    let top = design.add_module(module);

    let opts = Options::default().with_opt_level(4).unwrap();
    let mut worker = Worker::new(&design, opts);
    worker.analyze().unwrap();
    let state = worker.state(top);
    for wire in [iclk, kept] {
        assert!(!state.elided_wires.contains_key(&wire));
        assert!(!state.localized_wires.contains(&wire));
    }
    assert!(state.sync_wires.contains(&iclk));
    assert!(!state.sync_wires.contains(&clk));
}

#[test]
fn process_decision_tree() {
    use cxxsim_ir::{CaseRule, Process, State, SwitchRule, SyncRule, SyncType};
    let mut module = Module::new("\\top");
    let clk = port_in(&mut module, "\\clk", 1);
    let sel = port_in(&mut module, "\\sel", 2);
    let a = port_in(&mut module, "\\a", 1);
    let b = port_in(&mut module, "\\b", 1);
    let q = port_out(&mut module, "\\q", 1);
    let next_q = module.add_wire("$next_q", 1);

    let mut process = Process::new("$proc$top.v:12$1");
    let mut switch = SwitchRule::new(module.sig(sel));
    // casez 2'b1?: the low bit is a don't-care.
    let mut hi = CaseRule::default();
    hi.compare.push(SigSpec::constant(Const::Bits(vec![State::Sa, State::S1])));
    hi.actions.push((module.sig(next_q), module.sig(a)));
    switch.cases.push(hi);
    let mut lo = CaseRule::default();
    lo.compare.push(SigSpec::constant(Const::from_u64(1, 2)));
    lo.actions.push((module.sig(next_q), module.sig(b)));
    switch.cases.push(lo);
    let mut default = CaseRule::default();
    default
        .actions
        .push((module.sig(next_q), SigSpec::constant(Const::zeros(1))));
    switch.cases.push(default);
    process.root_case.switches.push(switch);
    process.syncs.push(SyncRule {
        kind: SyncType::Posedge,
        signal: module.sig(clk),
        actions: vec![(module.sig(q), module.sig(next_q))],
    });
    module.add_process(process);
    let mut design = Design::new();
    design.add_module(module);

    let code = generate_at(&design, 0);
    // The switch signal is captured once.
    assert!(code.contains("\tconst value<2> &tmp_0 = p_sel.curr;"));
    // A don't-care comparison masks the undefined positions.
    assert!(code.contains(
        "\tif (and_uu<2>(tmp_0, value<2>{0x2u}) == value<2>{0x2u}) {"
    ));
    assert!(code.contains("\t\ti_next__q.next = p_a.curr;"));
    // A fully defined comparison is a plain equality test.
    assert!(code.contains("\t} else if (tmp_0 == value<2>{0x1u}) {"));
    assert!(code.contains("\t\ti_next__q.next = p_b.curr;"));
    // The default case has no condition.
    assert!(code.contains("\t} else {"));
    assert!(code.contains("\t\ti_next__q.next = value<1>{0x0u};"));
    // Edge-triggered actions are gated on the commit-side flag.
    assert!(code.contains("\tif (posedge_p_clk) {"));
    assert!(code.contains("\t\tp_q.next = i_next__q.curr;"));
    assert!(code.contains("\tposedge_p_clk = false;"));
}
