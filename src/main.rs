// src/main.rs

use std::process::ExitCode;

use sitewright::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("sitewright error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> anyhow::Result<ExitCode> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
