use std::process::ExitCode;

use branchcast_job::{cli, commands};

#[tokio::main]
async fn main() -> ExitCode {
    branchcast_observability::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match cli::parse(&args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err}\n\n{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    match commands::execute(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "branchcast failed");
            eprintln!("error: {err:#}");
            ExitCode::from(commands::exit_status(&err))
        }
    }
}
