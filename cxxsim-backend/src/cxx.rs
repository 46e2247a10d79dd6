//! The C++ simulation backend: drives analysis and writes the generated
//! streams to their sinks.

use crate::traits::Backend;
use crate::worker::{check_design, generate, Options};
use cxxsim_ir::Design;
use cxxsim_utils::{Error, OutputFile, SimResult};
use std::io::Write;
use std::time::Instant;

#[derive(Default)]
pub struct CxxBackend {
    opts: Options,
}

impl CxxBackend {
    pub fn new(opts: Options) -> Self {
        CxxBackend { opts }
    }
}

impl Backend for CxxBackend {
    fn name(&self) -> &'static str {
        "cxx"
    }

    fn validate(&self, design: &Design) -> SimResult<()> {
        check_design(design)
    }

    fn emit(&self, design: &Design, file: &mut OutputFile) -> SimResult<()> {
        let mut opts = self.opts.clone();
        let intf_file = if opts.split_intf {
            let path = file.as_path().ok_or_else(|| {
                Error::misc("Option -header must be used with a filename.")
            })?;
            let intf_path = path.with_extension("h");
            opts.intf_filename =
                Some(intf_path.to_string_lossy().into_owned());
            Some(OutputFile::file(intf_path))
        } else {
            None
        };

        let time = Instant::now();
        let code = generate(design, &opts)?;
        log::info!("Generated design in {:?}", time.elapsed());

        if let Some(interface) = &code.interface {
            let intf_file = intf_file.expect("interface without a sink");
            let mut writer = intf_file.get_write().map_err(|err| {
                Error::invalid_file(format!(
                    "Can't open file `{}' for writing: {}",
                    intf_file.as_path_string(),
                    err
                ))
            })?;
            writer.write_all(interface.as_bytes())?;
            writer.flush()?;
        }

        let mut writer = file.get_write().map_err(|err| {
            Error::write_error(format!(
                "Can't open file `{}' for writing: {}",
                file.as_path_string(),
                err
            ))
        })?;
        writer.write_all(code.implementation.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
