//! esdump - Elasticsearch index export
//!
//! Streams every document of an index (or the first N matching a filter)
//! to a JSON Lines file, gzip-compressed by default.
//!
//! # Usage
//!
//! ```bash
//! # Whole index to ./tmp_export.json.gz
//! esdump --index logs export
//!
//! # First 1000 matching documents, uncompressed, to stdout
//! esdump --index logs export -c 1000 -m '{"term":{"level":"error"}}' --gzip=false -o -
//! ```

use esdump::cli::CliInterface;
use esdump::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    match run().await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Run the selected subcommand
///
/// # Returns
/// * `Result<i32>` - Exit status, or the error that ended the run
async fn run() -> Result<i32> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);
    cli.execute().await
}

/// Initialize logging on stderr
///
/// `RUST_LOG`, when set, takes precedence over the verbosity flags and the
/// configured level. Stdout is left to the export itself.
fn initialize_logging(cli: &CliInterface) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level().as_str()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
