//! Entry point for mcp-compose.
use std::process::ExitCode;

use clap::Parser;
use mcp_compose::{
    cli::{
        current_executable, dev, execute_cli_command, inspect, render_version, CliArgs,
        CliCommand, DevArgs, ParsedCommand, VersionArgs,
    },
    lib::telemetry,
    server::runtime::{self, RuntimeExit},
};

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(code) => code,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<ExitCode, RuntimeExit> {
    telemetry::init_tracing().map_err(RuntimeExit::from_error)?;
    let args = CliArgs::parse();
    let command = args.into_command().map_err(RuntimeExit::from_error)?;

    match command {
        ParsedCommand::Version(args) => print_version(&args),
        ParsedCommand::RunServer(profile) => {
            runtime::run_server(profile).await?;
            Ok(ExitCode::SUCCESS)
        }
        ParsedCommand::Dev(args) => run_dev(&args).await,
        ParsedCommand::Inspect(args, profile) => {
            let message = inspect::run_inspect(&profile, &args.output).await?;
            println!("{message}");
            Ok(ExitCode::SUCCESS)
        }
        ParsedCommand::Cli(command) => handle_cli_command(command),
    }
}

fn print_version(args: &VersionArgs) -> Result<ExitCode, RuntimeExit> {
    let message = render_version(args).map_err(RuntimeExit::from_error)?;
    println!("{message}");
    Ok(ExitCode::SUCCESS)
}

async fn run_dev(args: &DevArgs) -> Result<ExitCode, RuntimeExit> {
    let executable = current_executable().map_err(RuntimeExit::from_error)?;
    let status = dev::run_dev(args, &executable)
        .await
        .map_err(RuntimeExit::from_error)?;
    Ok(status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map(ExitCode::from)
        .unwrap_or(ExitCode::FAILURE))
}

fn handle_cli_command(command: CliCommand) -> Result<ExitCode, RuntimeExit> {
    let message = execute_cli_command(command).map_err(RuntimeExit::from_error)?;
    println!("{message}");
    Ok(ExitCode::SUCCESS)
}
