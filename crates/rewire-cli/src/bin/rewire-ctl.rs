//! `rewire-ctl`: thin authenticated admin client for creating, enabling,
//! and disabling expectations over HTTP (SPEC_FULL.md §4.4/§6).

use clap::Parser;
use rewire_cli::ctl::{run, CtlCli};

#[tokio::main]
async fn main() {
    let cli = CtlCli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
