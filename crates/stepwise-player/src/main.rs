#![forbid(unsafe_code)]

//! Stepwise player binary entry point.

use std::sync::Arc;

use stepwise_client::config::ClientConfig;
use stepwise_client::http::HttpTraceClient;
use stepwise_player::{TracePlayer, cli, logging, terminal};

fn main() {
    let opts = cli::Opts::parse();

    if let Err(e) = logging::init(&opts.log_file) {
        eprintln!("Failed to open log file {}: {e}", opts.log_file.display());
        std::process::exit(1);
    }

    let client = match HttpTraceClient::new(ClientConfig::new(opts.api_url.clone())) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to initialize: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(api_url = %opts.api_url, algorithm = ?opts.algorithm, "starting player");

    let player = TracePlayer::new(Arc::new(client), opts.player_config());
    if let Err(e) = terminal::run(player) {
        tracing::error!(error = %e, "runtime error");
        eprintln!("Runtime error: {e}");
        std::process::exit(1);
    }
}
