//! Taikun CLI
//!
//! Exit status: 0 done, 1 failed, 2 still pending (timeout or Ctrl-C).

use std::process::ExitCode;

use clap::Parser;

use taikun_cli::Cli;
use taikun_common::telemetry::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.telemetry_config()) {
        eprintln!("Warning: {}", e);
    }

    let report = match cli.run().await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match report.render() {
        Ok(rendered) => {
            println!("{}", rendered);
            report.exit_code()
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
