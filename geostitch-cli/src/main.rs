//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use geostitch_cli::CliError;

#[expect(
    clippy::print_stderr,
    reason = "the binary reports fatal errors on stderr"
)]
fn main() {
    match geostitch_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("geostitch: {err}");
            std::process::exit(1);
        }
    }
}
