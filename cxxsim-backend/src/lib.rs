//! The cxxsim code generation core: dependency analysis, feedback-minimizing
//! scheduling, wire elision and localization, edge detection, and the C++
//! emitter producing a two-phase (`eval`/`commit`) simulator per module.
mod cxx;
mod emitter;
mod flow;
mod mangle;
mod schedule;
mod traits;
mod worker;

pub use cxx::CxxBackend;
pub use flow::{FlowGraph, Node, NodeId};
pub use mangle::{
    mangle_cell_name, mangle_memory_name, mangle_module_name, mangle_name,
    mangle_sig_bit, mangle_wire_name,
};
pub use schedule::Scheduler;
pub use traits::Backend;
pub use worker::{
    check_design, generate, GeneratedCode, ModuleState, Options, Worker,
};
