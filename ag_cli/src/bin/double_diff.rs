//! Print the n-th derivative of a unary function and its graph in DOT.
//!
//! ```bash
//! double_diff --order 2 --func tanh --x 1.0 --verbose
//! ```

use std::process::ExitCode;

use ag_cli::diff::{run, DiffArgs};
use clap::Parser;

fn main() -> ExitCode {
    let args = DiffArgs::parse();
    ag_cli::init_logging(args.verbose);

    match run(&args) {
        Ok(dot) => {
            println!("{dot}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
