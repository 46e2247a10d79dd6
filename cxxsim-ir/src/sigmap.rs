//! Canonicalization of signal bits under the connection list.
//!
//! Two bits tied together by a continuous whole-width assignment are the same
//! net; the backend needs one representative per net when registering clock
//! edges (the same clock may reach a flip-flop under several aliases).

use crate::module::Module;
use crate::sigspec::SigBit;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct SigMap {
    map: HashMap<SigBit, SigBit>,
}

impl SigMap {
    /// Build the canonical-bit map induced by `module`'s connections:
    /// each driven bit resolves to the representative of its driver.
    pub fn new(module: &Module) -> Self {
        let mut sigmap = SigMap::default();
        for (lhs, rhs) in &module.connections {
            debug_assert_eq!(lhs.len(), rhs.len());
            for index in 0..lhs.len().min(rhs.len()) {
                let driven = lhs.bit(index);
                let driver = sigmap.bit(rhs.bit(index));
                if let SigBit::Wire(..) = driven {
                    if driven != driver {
                        sigmap.map.insert(driven, driver);
                    }
                }
            }
        }
        sigmap
    }

    /// Resolve one bit to its representative.
    pub fn bit(&self, bit: SigBit) -> SigBit {
        let mut current = bit;
        // Chains are short; guard against accidental cycles anyway.
        for _ in 0..self.map.len() + 1 {
            match self.map.get(&current) {
                Some(next) => current = *next,
                None => return current,
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_driver() {
        let mut module = Module::new("\\m");
        let a = module.add_wire("\\a", 1);
        let b = module.add_wire("\\b", 1);
        let c = module.add_wire("\\c", 1);
        // b = a; c = b;
        module.add_connection(module.sig(b), module.sig(a));
        module.add_connection(module.sig(c), module.sig(b));
        let sigmap = SigMap::new(&module);
        assert_eq!(sigmap.bit(SigBit::Wire(c, 0)), SigBit::Wire(a, 0));
        assert_eq!(sigmap.bit(SigBit::Wire(b, 0)), SigBit::Wire(a, 0));
        assert_eq!(sigmap.bit(SigBit::Wire(a, 0)), SigBit::Wire(a, 0));
    }
}
