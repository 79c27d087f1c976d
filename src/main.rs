use clap::Parser;
use tracing::{debug, error};

mod archive;
mod cipher;
mod cli;
mod config;
mod error;
mod permissions;
mod prompt;
mod symlinks;
mod templates;
mod utils;

use cli::Args;

fn main() {
    // Parse command line arguments
    let args = Args::parse();
    cli::init_logging(&args);
    debug!("Starting {:?}", args.command);

    // Run the application
    if let Err(e) = cli::run(args) {
        error!("Application error: {e:#}");
        eprintln!("Error: {e:#}"); // Print error to stderr for user visibility
        std::process::exit(1);
    }

    debug!("Completed successfully");
}
