//! Fit an LSTM to a noisy sine wave and print a cosine continuation as CSV.
//!
//! ```bash
//! lstm_sine --epoch 100 --batch-size 30 --hidden-size 100 --bptt-length 30 > pred.csv
//! ```

use std::process::ExitCode;

use ag_cli::sine::{predict_cosine, to_csv, train, SineArgs};
use ag_core::Result;
use clap::Parser;

fn run(args: &SineArgs) -> Result<String> {
    let (mut model, _) = train(args)?;
    let rows = predict_cosine(&mut model, args.num_points)?;
    Ok(to_csv(&rows))
}

fn main() -> ExitCode {
    let args = SineArgs::parse();
    ag_cli::init_logging(args.verbose);

    match run(&args) {
        Ok(csv) => {
            print!("{csv}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
