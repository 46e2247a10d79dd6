//! Shared utilities for the cxxsim compiler.
mod errors;
mod id;
mod out_file;

pub use errors::{Error, SimResult};
pub use id::Id;
pub use out_file::OutputFile;
