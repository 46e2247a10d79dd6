use argh::FromArgs;
use cxxsim_backend::Options;
use cxxsim_utils::OutputFile;
use std::path::PathBuf;

#[derive(FromArgs)]
/// The cxxsim compiler: convert a netlist to a C++ RTL simulation.
pub struct Opts {
    /// output file for the generated code; defaults to stdout
    #[argh(positional, default = "OutputFile::default()")]
    pub output: OutputFile,

    /// input Yosys JSON netlist; defaults to stdin
    #[argh(option, short = 'i')]
    pub input: Option<PathBuf>,

    /// generate separate interface (.h) and implementation files; requires
    /// a named output file, from which the interface name is derived
    #[argh(switch)]
    pub header: bool,

    /// place the generated code into this namespace
    #[argh(option, default = "\"cxxrtl_design\".to_string()")]
    pub namespace: String,

    /// optimization level (0-5, cumulative): 1 elides internal wires,
    /// 2 also localizes them, 3 and 4 extend both to public wires not
    /// marked (*keep*), 5 also requests driver-side net splitting
    #[argh(
        option,
        short = 'O',
        long = "opt",
        default = "Options::DEFAULT_OPT_LEVEL"
    )]
    pub opt_level: u32,

    /// logging level
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

impl Opts {
    /// Get the current options from the command line. argh does not support
    /// the adjacent `-O<digit>` form, so it is expanded up front.
    pub fn get_opts() -> Opts {
        let args: Vec<String> = std::env::args().collect();
        let mut expanded: Vec<String> = Vec::new();
        for arg in args.iter().skip(1) {
            if arg.len() == 3
                && arg.starts_with("-O")
                && arg.as_bytes()[2].is_ascii_digit()
            {
                expanded.push("-O".to_string());
                expanded.push(arg[2..].to_string());
            } else {
                expanded.push(arg.clone());
            }
        }
        let command = args[0].as_str();
        let expanded: Vec<&str> = expanded.iter().map(String::as_str).collect();
        match Opts::from_args(&[command], &expanded) {
            Ok(opts) => opts,
            Err(exit) => {
                if exit.status.is_ok() {
                    println!("{}", exit.output);
                    std::process::exit(0);
                } else {
                    eprintln!("{}", exit.output);
                    std::process::exit(1);
                }
            }
        }
    }
}
