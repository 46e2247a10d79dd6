//! Driver wiring the frontend to the backend.
use crate::cmdline::Opts;
use cxxsim_backend::{Backend, CxxBackend, Options};
use cxxsim_frontend as frontend;
use cxxsim_utils::{Error, SimResult};

pub fn run_compiler() -> SimResult<()> {
    let opts = Opts::get_opts();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let design = match &opts.input {
        Some(path) => {
            let file = std::fs::File::open(path).map_err(|err| {
                Error::invalid_file(format!(
                    "Can't open file `{}': {}",
                    path.display(),
                    err
                ))
            })?;
            frontend::read_design(std::io::BufReader::new(file))?
        }
        None => frontend::read_design(std::io::stdin().lock())?,
    };

    let options = Options {
        split_intf: opts.header,
        design_ns: opts.namespace.clone(),
        ..Options::default()
    }
    .with_opt_level(opts.opt_level)?;

    let backend = CxxBackend::new(options);
    backend.run(&design, opts.output.clone())
}
