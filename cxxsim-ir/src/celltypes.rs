//! Classification of internal cell types and their port directions.

use cxxsim_utils::Id;

pub fn is_unary_cell(ty: Id) -> bool {
    matches!(
        ty.as_str(),
        "$not"
            | "$logic_not"
            | "$reduce_and"
            | "$reduce_or"
            | "$reduce_xor"
            | "$reduce_xnor"
            | "$reduce_bool"
            | "$pos"
            | "$neg"
    )
}

pub fn is_binary_cell(ty: Id) -> bool {
    matches!(
        ty.as_str(),
        "$and"
            | "$or"
            | "$xor"
            | "$xnor"
            | "$logic_and"
            | "$logic_or"
            | "$shl"
            | "$sshl"
            | "$shr"
            | "$sshr"
            | "$shift"
            | "$shiftx"
            | "$eq"
            | "$ne"
            | "$eqx"
            | "$nex"
            | "$gt"
            | "$ge"
            | "$lt"
            | "$le"
            | "$add"
            | "$sub"
            | "$mul"
            | "$div"
            | "$mod"
    )
}

/// Cells whose single output can be folded into the expression that reads it.
pub fn is_elidable_cell(ty: Id) -> bool {
    is_unary_cell(ty)
        || is_binary_cell(ty)
        || matches!(ty.as_str(), "$mux" | "$concat" | "$slice")
}

/// Flip-flops updated strictly on a clock edge.
pub fn is_sync_ff_cell(ty: Id) -> bool {
    matches!(ty.as_str(), "$dff" | "$dffe")
}

pub fn is_ff_cell(ty: Id) -> bool {
    is_sync_ff_cell(ty)
        || matches!(ty.as_str(), "$adff" | "$dffsr" | "$dlatch" | "$dlatchsr" | "$sr")
}

pub fn is_memory_port_cell(ty: Id) -> bool {
    matches!(ty.as_str(), "$memrd" | "$memwr")
}

/// Any `$`-prefixed type except parametric module specializations.
pub fn is_internal_cell(ty: Id) -> bool {
    let name = ty.as_str();
    name.starts_with('$') && !name.starts_with("$paramod\\")
}

/// Inputs of a recognized internal cell, by bare port name.
fn internal_cell_inputs(ty: Id) -> Option<&'static [&'static str]> {
    if is_unary_cell(ty) {
        return Some(&["A"]);
    }
    if is_binary_cell(ty) {
        return Some(&["A", "B"]);
    }
    Some(match ty.as_str() {
        "$mux" | "$pmux" => &["A", "B", "S"],
        "$concat" => &["A", "B"],
        "$slice" => &["A"],
        "$dff" => &["CLK", "D"],
        "$dffe" => &["CLK", "EN", "D"],
        "$adff" => &["CLK", "ARST", "D"],
        "$dffsr" => &["CLK", "SET", "CLR", "D"],
        "$dlatch" => &["EN", "D"],
        "$dlatchsr" => &["EN", "SET", "CLR", "D"],
        "$sr" => &["SET", "CLR"],
        "$memrd" => &["CLK", "EN", "ADDR"],
        "$memwr" => &["CLK", "EN", "ADDR", "DATA"],
        "$meminit" => &["ADDR", "DATA"],
        _ => return None,
    })
}

/// Outputs of a recognized internal cell, by bare port name.
fn internal_cell_outputs(ty: Id) -> Option<&'static [&'static str]> {
    if is_unary_cell(ty) || is_binary_cell(ty) {
        return Some(&["Y"]);
    }
    Some(match ty.as_str() {
        "$mux" | "$pmux" | "$concat" | "$slice" => &["Y"],
        "$dff" | "$dffe" | "$adff" | "$dffsr" | "$dlatch" | "$dlatchsr"
        | "$sr" => &["Q"],
        "$memrd" => &["DATA"],
        "$memwr" | "$meminit" => &[],
        _ => return None,
    })
}

/// Whether `ty` is an internal cell this backend knows the signature of.
pub fn is_known_internal_cell(ty: Id) -> bool {
    internal_cell_inputs(ty).is_some()
}

fn bare_port_name(port: Id) -> &'static str {
    let name = port.as_str();
    name.strip_prefix('\\').unwrap_or(name)
}

pub fn internal_cell_input(ty: Id, port: Id) -> bool {
    internal_cell_inputs(ty)
        .map_or(false, |ports| ports.contains(&bare_port_name(port)))
}

pub fn internal_cell_output(ty: Id, port: Id) -> bool {
    internal_cell_outputs(ty)
        .map_or(false, |ports| ports.contains(&bare_port_name(port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(is_unary_cell(Id::new("$not")));
        assert!(is_binary_cell(Id::new("$add")));
        assert!(is_elidable_cell(Id::new("$mux")));
        assert!(!is_elidable_cell(Id::new("$pmux")));
        assert!(is_sync_ff_cell(Id::new("$dffe")));
        assert!(is_ff_cell(Id::new("$adff")));
        assert!(!is_sync_ff_cell(Id::new("$adff")));
        assert!(is_internal_cell(Id::new("$pmux")));
        assert!(!is_internal_cell(Id::new("\\sub")));
        assert!(!is_internal_cell(Id::new("$paramod\\sub\\W=8")));
    }

    #[test]
    fn directions() {
        let dff = Id::new("$dff");
        assert!(internal_cell_input(dff, Id::new("\\CLK")));
        assert!(internal_cell_input(dff, Id::new("\\D")));
        assert!(internal_cell_output(dff, Id::new("\\Q")));
        assert!(!internal_cell_output(dff, Id::new("\\D")));
        let memrd = Id::new("$memrd");
        assert!(internal_cell_output(memrd, Id::new("\\DATA")));
        assert!(internal_cell_input(memrd, Id::new("\\ADDR")));
    }
}
