//! Reader for the Yosys JSON netlist format.
//!
//! The JSON format names nets through `netnames`, each mapping a name to a
//! list of design-global bit numbers; wires as such do not exist. The reader
//! creates one wire per netname, claims each bit number for the first wire
//! that carries it (ports first), and turns every alias into a continuous
//! assignment from the claiming wire. The format carries no memory objects
//! and no processes, so memory port cells are rejected here; designs using
//! them must be built through the IR API.

use cxxsim_ir::{
    Attributes, Cell, Const, Design, Module, SigBit, SigSpec, State, WireId,
};
use cxxsim_utils::{Error, Id, SimResult};
use itertools::Itertools;
use std::collections::HashMap;
use std::io::Read;
use yosys_netlist_json as yosys;

/// Read a design from a Yosys JSON netlist.
pub fn read_design<R: Read>(reader: R) -> SimResult<Design> {
    let netlist = yosys::Netlist::from_reader(reader)
        .map_err(|err| Error::parse(err.to_string()))?;
    let mut design = Design::new();
    // HashMap iteration order is arbitrary; sort for reproducible output.
    for (name, module) in netlist.modules.iter().sorted_by_key(|(name, _)| *name)
    {
        let module = read_module(name, module)?;
        design.add_module(module);
    }
    Ok(design)
}

/// JSON names drop the `\` prefix of public identifiers; restore it.
fn ir_name(name: &str) -> Id {
    if name.starts_with('$') {
        Id::new(name)
    } else {
        Id::new(format!("\\{}", name))
    }
}

fn convert_attribute(value: &yosys::AttributeVal) -> Const {
    match value {
        yosys::AttributeVal::N(n) => Const::from_u64(*n as u64, 32),
        yosys::AttributeVal::S(s) => convert_string(s),
    }
}

/// Yosys encodes wide constants as bit strings (MSB first) and marks real
/// strings that would look like one with a trailing space.
fn convert_string(s: &str) -> Const {
    if let Some(stripped) = s.strip_suffix(' ') {
        return Const::string(stripped);
    }
    if !s.is_empty() && s.chars().all(|c| matches!(c, '0' | '1' | 'x' | 'z')) {
        let bits = s
            .chars()
            .rev()
            .map(|c| match c {
                '0' => State::S0,
                '1' => State::S1,
                'x' => State::Sx,
                _ => State::Sz,
            })
            .collect();
        Const::Bits(bits)
    } else {
        Const::string(s)
    }
}

fn convert_attributes(
    attrs: &HashMap<String, yosys::AttributeVal>,
) -> Attributes {
    let mut attributes = Attributes::default();
    for (name, value) in attrs.iter().sorted_by_key(|(name, _)| *name) {
        attributes.set(ir_name(name), convert_attribute(value));
    }
    attributes
}

struct BitClaims {
    claims: HashMap<usize, (WireId, u32)>,
}

impl BitClaims {
    fn claim(&mut self, wire: WireId, bits: &[yosys::BitVal]) {
        for (offset, bit) in bits.iter().enumerate() {
            if let yosys::BitVal::N(number) = bit {
                self.claims.entry(*number).or_insert((wire, offset as u32));
            }
        }
    }

    fn sig_bit(&self, bit: &yosys::BitVal) -> SimResult<SigBit> {
        Ok(match bit {
            yosys::BitVal::N(number) => {
                let (wire, offset) =
                    self.claims.get(number).ok_or_else(|| {
                        Error::parse(format!(
                            "bit {} is not covered by any netname",
                            number
                        ))
                    })?;
                SigBit::Wire(*wire, *offset)
            }
            yosys::BitVal::S(yosys::SpecialBit::_0) => {
                SigBit::Const(State::S0)
            }
            yosys::BitVal::S(yosys::SpecialBit::_1) => {
                SigBit::Const(State::S1)
            }
            yosys::BitVal::S(yosys::SpecialBit::X) => SigBit::Const(State::Sx),
            yosys::BitVal::S(yosys::SpecialBit::Z) => SigBit::Const(State::Sz),
        })
    }

    fn sig_spec(&self, bits: &[yosys::BitVal]) -> SimResult<SigSpec> {
        let bits: SimResult<Vec<SigBit>> =
            bits.iter().map(|bit| self.sig_bit(bit)).collect();
        Ok(SigSpec::from_bits(bits?))
    }
}

fn read_module(name: &str, source: &yosys::Module) -> SimResult<Module> {
    let mut module = Module::new(ir_name(name));
    module.attributes = convert_attributes(&source.attributes);

    let mut claims = BitClaims { claims: HashMap::new() };
    let mut wire_bits: Vec<(WireId, Vec<yosys::BitVal>)> = Vec::new();

    // Ports claim their bits first and receive positions in name order.
    let ports: Vec<_> =
        source.ports.iter().sorted_by_key(|(name, _)| *name).collect();
    for (index, (port_name, port)) in ports.iter().enumerate() {
        let wire = module.add_wire(ir_name(port_name), port.bits.len() as u32);
        {
            let decl = module.wire_mut(wire);
            decl.port_id = Some(index as u32 + 1);
            decl.port_input = matches!(
                port.direction,
                yosys::PortDirection::Input | yosys::PortDirection::InOut
            );
            decl.port_output = matches!(
                port.direction,
                yosys::PortDirection::Output | yosys::PortDirection::InOut
            );
        }
        claims.claim(wire, &port.bits);
        wire_bits.push((wire, port.bits.clone()));
    }

    for (net_name, netname) in
        source.netnames.iter().sorted_by_key(|(name, _)| *name)
    {
        let name = ir_name(net_name);
        if let Some(wire) = module.wire_by_name(&name) {
            // The wire already exists as a port; its netname repeats the
            // same bits but may add attributes.
            module.wire_mut(wire).attributes =
                convert_attributes(&netname.attributes);
            continue;
        }
        let wire = module.add_wire(name, netname.bits.len() as u32);
        module.wire_mut(wire).attributes =
            convert_attributes(&netname.attributes);
        claims.claim(wire, &netname.bits);
        wire_bits.push((wire, netname.bits.clone()));
    }

    // Netnames that alias already claimed bits, and bits tied to constants,
    // become continuous assignments from the canonical form.
    for (wire, bits) in &wire_bits {
        let canonical = claims.sig_spec(bits)?;
        let identity = module.sig(*wire);
        if canonical != identity {
            module.add_connection(identity, canonical);
        }
    }

    for (cell_name, cell) in
        source.cells.iter().sorted_by_key(|(name, _)| *name)
    {
        if matches!(
            cell.cell_type.as_str(),
            "$mem" | "$memrd" | "$memwr" | "$meminit"
        ) {
            return Err(Error::unsupported(format!(
                "cell `{}': the JSON netlist format carries no memory \
                 objects; construct memories through the IR instead",
                cell_name
            )));
        }
        let mut converted = Cell::new(ir_name(cell_name), ir_name(&cell.cell_type));
        converted.attributes = convert_attributes(&cell.attributes);
        for (param, value) in
            cell.parameters.iter().sorted_by_key(|(name, _)| *name)
        {
            converted
                .parameters
                .insert(ir_name(param), convert_attribute(value));
        }
        for (port, bits) in
            cell.connections.iter().sorted_by_key(|(name, _)| *name)
        {
            converted
                .connections
                .insert(ir_name(port), claims.sig_spec(bits)?);
        }
        module.add_cell(converted);
    }

    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SimResult<Design> {
        read_design(json.as_bytes())
    }

    #[test]
    fn reads_ports_and_cells() {
        let design = parse(
            r#"{
                "creator": "test",
                "modules": {
                    "top": {
                        "attributes": {},
                        "ports": {
                            "a": { "direction": "input", "bits": [2] },
                            "b": { "direction": "input", "bits": [3] },
                            "y": { "direction": "output", "bits": [4] }
                        },
                        "cells": {
                            "$and$top.v:3$1": {
                                "hide_name": 1,
                                "type": "$and",
                                "parameters": {
                                    "A_SIGNED": 0,
                                    "B_SIGNED": 0,
                                    "A_WIDTH": 1,
                                    "B_WIDTH": 1,
                                    "Y_WIDTH": 1
                                },
                                "attributes": {},
                                "port_directions": {
                                    "A": "input", "B": "input", "Y": "output"
                                },
                                "connections": {
                                    "A": [2], "B": [3], "Y": [4]
                                }
                            }
                        },
                        "netnames": {
                            "a": { "hide_name": 0, "bits": [2], "attributes": {} },
                            "b": { "hide_name": 0, "bits": [3], "attributes": {} },
                            "y": { "hide_name": 0, "bits": [4], "attributes": {} }
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let (id, module) = design.modules().next().unwrap();
        assert_eq!(module.name, Id::new("\\top"));
        assert!(design.selected_whole_module(id));
        let a = module.wire_by_name(&Id::new("\\a")).unwrap();
        assert!(module.wire(a).port_input);
        assert_eq!(module.wire(a).width, 1);
        let (_, cell) = module.cells().next().unwrap();
        assert_eq!(cell.ty, Id::new("$and"));
        assert_eq!(cell.port("A"), &module.sig(a));
        assert_eq!(cell.param_u32("Y_WIDTH"), 1);
        assert!(module.connections.is_empty());
    }

    #[test]
    fn aliases_become_connections() {
        let design = parse(
            r#"{
                "creator": "test",
                "modules": {
                    "top": {
                        "attributes": {},
                        "ports": {
                            "x": { "direction": "input", "bits": [2, 3] }
                        },
                        "cells": {},
                        "netnames": {
                            "x": { "hide_name": 0, "bits": [2, 3], "attributes": {} },
                            "alias": { "hide_name": 0, "bits": [3, "0"], "attributes": {} }
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let (_, module) = design.modules().next().unwrap();
        let x = module.wire_by_name(&Id::new("\\x")).unwrap();
        let alias = module.wire_by_name(&Id::new("\\alias")).unwrap();
        assert_eq!(module.connections.len(), 1);
        let (lhs, rhs) = &module.connections[0];
        assert_eq!(lhs, &module.sig(alias));
        let mut expected = SigSpec::slice(x, 1, 1);
        expected.push(cxxsim_ir::SigChunk::Const(Const::from_u64(0, 1)));
        assert_eq!(rhs, &expected);
    }

    #[test]
    fn bit_string_parameters() {
        assert_eq!(convert_string("0101"), Const::from_u64(5, 4));
        assert!(!convert_string("0101").is_string());
        assert_eq!(convert_string("ADDR "), Const::string("ADDR"));
        assert!(convert_string("hello").is_string());
    }

    #[test]
    fn memory_cells_are_rejected() {
        let result = parse(
            r#"{
                "creator": "test",
                "modules": {
                    "top": {
                        "attributes": {},
                        "ports": {},
                        "cells": {
                            "mem_read": {
                                "hide_name": 0,
                                "type": "$memrd",
                                "parameters": {},
                                "attributes": {},
                                "port_directions": {},
                                "connections": {}
                            }
                        },
                        "netnames": {}
                    }
                }
            }"#,
        );
        assert!(result.is_err());
    }
}
