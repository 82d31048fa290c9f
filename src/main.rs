//! gkup - GKE upgrade and node pool scaling CLI tool.

use clap::Parser;
use tracing::{debug, error};

use gkup::config::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    gkup::logging::init(args.log_format, &args.log_level);

    debug!("Starting gkup - GKE Upgrade and Scaling Tool");

    if let Err(e) = gkup::run(&args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
