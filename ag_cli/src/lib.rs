//! Shared pieces of the `double_diff` and `lstm_sine` binaries.

pub mod diff;
pub mod sine;

use tracing::Level;

/// Install a stderr `fmt` subscriber at `INFO`, or `DEBUG` when verbose.
/// Stdout is left for the program's output.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
