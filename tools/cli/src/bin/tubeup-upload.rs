//! Upload a video with the credentials from `tubeup-setup`.

use std::io;

use anyhow::Result;
use clap::Parser;

use tubeup_cli::logging;
use tubeup_cli::upload::{self, UploadArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = UploadArgs::parse();
    logging::init(args.verbose)?;

    upload::run(&args, &mut io::stdout()).await;
    Ok(())
}
