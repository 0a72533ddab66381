//! docstore CLI entry point
//!
//! Parses arguments, runs one command, prints errors to stderr and exits
//! non-zero on failure. All logic lives in the `cli` module.

use docstore::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
