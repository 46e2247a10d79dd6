//! The interface every backend of the compiler exposes to the driver.

use cxxsim_ir::Design;
use cxxsim_utils::{OutputFile, SimResult};

pub trait Backend {
    /// The name of this backend.
    fn name(&self) -> &'static str;

    /// Checks the design against the preconditions of this backend.
    fn validate(&self, design: &Design) -> SimResult<()>;

    /// Generates code for `design` into `file`.
    fn emit(&self, design: &Design, file: &mut OutputFile) -> SimResult<()>;

    /// Validates and emits.
    fn run(&self, design: &Design, mut file: OutputFile) -> SimResult<()> {
        self.validate(design)?;
        self.emit(design, &mut file)
    }
}
