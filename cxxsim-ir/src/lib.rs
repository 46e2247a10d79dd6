//! The flattened netlist IR consumed by the cxxsim backend.
//!
//! The representation is arena-based: a [`Design`] owns its [`Module`]s, and
//! each module owns its wires, cells, processes, and memories, all addressed
//! through copyable index newtypes. Signals are [`SigSpec`]s, LSB-first
//! sequences of constant or wire-slice chunks.
mod cell;
pub mod celltypes;
mod common;
mod design;
mod module;
mod process;
mod sigmap;
mod sigspec;

pub use cell::Cell;
pub use common::{CellId, MemoryId, ModuleId, ProcId, WireId};
pub use design::{Design, Selected};
pub use module::{Attributes, Memory, Module, SigSig, Wire};
pub use process::{CaseRule, Process, SwitchRule, SyncRule, SyncType};
pub use sigmap::SigMap;
pub use sigspec::{Const, SigBit, SigChunk, SigSpec, State};
