// src/main.rs

use std::process::ExitCode;

use pipedag::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("pipedag error: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run aborted");
            eprintln!("pipedag error: {err}");
            ExitCode::FAILURE
        }
    }
}
