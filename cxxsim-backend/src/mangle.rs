//! Name mangling from IR identifiers to C++ identifiers.
//!
//! The IR allows any characters in names other than whitespace, while C++
//! identifiers may be only alphanumeric, cannot clash with C++ keywords, and
//! cannot clash with runtime library identifiers. The scheme below produces
//! readable identifiers, does not depend on an up-to-date list of C++
//! keywords, and is easy to apply:
//!  1. Mangled names of public identifiers (beginning with `\`) start with
//!     `p_`, of internal identifiers (beginning with `$`) with `i_`.
//!  2. An underscore is escaped with another underscore, i.e. `__`.
//!  3. Any other non-alphanumeric character is escaped with underscores
//!     around its lowercase hex code, e.g. `@` as `_40_`.

use cxxsim_ir::{Module, SigBit};
use cxxsim_utils::Id;
use std::fmt::Write;

pub fn mangle_name(name: Id) -> String {
    let mut mangled = String::new();
    let mut bytes = name.as_str().bytes();
    match bytes.next() {
        Some(b'\\') => mangled.push_str("p_"),
        Some(b'$') => mangled.push_str("i_"),
        _ => panic!("identifier `{}' must begin with `\\' or `$'", name),
    }
    for c in bytes {
        if c.is_ascii_alphanumeric() {
            mangled.push(c as char);
        } else if c == b'_' {
            mangled.push_str("__");
        } else {
            let _ = write!(mangled, "_{:02x}_", c);
        }
    }
    mangled
}

/// Modules share the class namespace.
pub fn mangle_module_name(name: Id) -> String {
    mangle_name(name)
}

/// Memories share the class member namespace with wires.
pub fn mangle_memory_name(name: Id) -> String {
    format!("memory_{}", mangle_name(name))
}

/// Cell instances share the class member namespace with wires.
pub fn mangle_cell_name(name: Id) -> String {
    format!("cell_{}", mangle_name(name))
}

pub fn mangle_wire_name(name: Id) -> String {
    mangle_name(name)
}

/// A single bit of a wire; bits of multi-bit wires carry their offset.
pub fn mangle_sig_bit(module: &Module, bit: SigBit) -> String {
    let SigBit::Wire(wire, offset) = bit else {
        panic!("cannot mangle a constant bit");
    };
    let wire = module.wire(wire);
    if wire.width == 1 {
        mangle_wire_name(wire.name)
    } else {
        format!("{}_{}", mangle_wire_name(wire.name), offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert_eq!(mangle_name(Id::new("\\data")), "p_data");
        assert_eq!(mangle_name(Id::new("$0\\q[0:0]")), "i_0_5c_q_5b_0_3a_0_5d_");
    }

    #[test]
    fn escaping() {
        assert_eq!(mangle_name(Id::new("\\foo_bar\0")), "p_foo__bar_00_");
        assert_eq!(mangle_name(Id::new("\\a@b")), "p_a_40_b");
    }

    #[test]
    fn stable() {
        let name = Id::new("$proc$top.v:5$1");
        assert_eq!(mangle_name(name), mangle_name(name));
    }

    #[test]
    fn injective() {
        let names = [
            "\\a_b", "\\a__b", "\\a_b_", "\\a___b", "\\a_40_b", "\\a@b",
            "\\a@_b", "\\a_@b", "$a_b", "\\x", "$x",
        ];
        let mut mangled: Vec<_> =
            names.iter().map(|n| mangle_name(Id::new(*n))).collect();
        mangled.sort();
        mangled.dedup();
        assert_eq!(mangled.len(), names.len());
    }

    #[test]
    fn namespaces() {
        let name = Id::new("\\ram");
        assert_eq!(mangle_memory_name(name), "memory_p_ram");
        assert_eq!(mangle_cell_name(name), "cell_p_ram");
        assert_eq!(mangle_wire_name(name), "p_ram");
    }

    #[test]
    fn bit_offsets() {
        let mut module = Module::new("\\m");
        let clk = module.add_wire("\\clk", 1);
        let clocks = module.add_wire("\\clocks", 4);
        assert_eq!(mangle_sig_bit(&module, SigBit::Wire(clk, 0)), "p_clk");
        assert_eq!(
            mangle_sig_bit(&module, SigBit::Wire(clocks, 2)),
            "p_clocks_2"
        );
    }
}
