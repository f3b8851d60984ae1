//! Case Lattice CLI
//!
//! Builds parameter lattices and creates, submits and resubmits CESM case
//! clones for them.

use clap::Parser;

use case_lattice::utils::init_logging;
use case_lattice::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging("info");

    let cli = Cli::parse();
    cli.run().await
}
