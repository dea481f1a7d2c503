//! Authorize tubeup and write `secrets.json`.

use std::io;

use anyhow::Result;
use clap::Parser;

use tubeup_cli::logging;
use tubeup_cli::setup::{self, SetupArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = SetupArgs::parse();
    logging::init(args.verbose)?;

    setup::run(&args, &mut io::stdout()).await;
    Ok(())
}
