mod cmdline;
mod driver;

fn main() {
    if let Err(err) = driver::run_compiler() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
