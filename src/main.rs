//! `slv`: list, renumber and print the directive points of a plain-text
//! document.

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run().await
}
