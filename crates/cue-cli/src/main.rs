use clap::Parser;
use cue_core::error::CoreError;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

mod cli;
mod commands;
mod config;
mod error;
mod parser;
mod store;
mod util;
mod views;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = cli::Cli::parse();

    let mut config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            handle_error(anyhow::anyhow!("Invalid configuration: {}", e));
            std::process::exit(1);
        }
    };
    if let Some(file) = cli.file {
        config.events_file = file;
    }
    let ctx = commands::Context::new(config);

    let result = match cli.command {
        cli::Commands::Add(command) => commands::add::add_event(&ctx, command).await,
        cli::Commands::List(command) => commands::list::list_events(&ctx, command).await,
        cli::Commands::Expand(command) => commands::expand::expand_template(&ctx, command).await,
        cli::Commands::Check(command) => commands::check::check_schedule(&ctx, command).await,
        cli::Commands::Timeline(command) => commands::timeline::show_timeline(&ctx, command).await,
        cli::Commands::Move(command) => commands::reschedule::move_event(&ctx, command).await,
        cli::Commands::Resize(command) => commands::reschedule::resize_event(&ctx, command).await,
        cli::Commands::Cancel(command) => commands::cancel::cancel_event(&ctx, command).await,
        cli::Commands::Categories => commands::categories::list_categories(),
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `CUE_LOG` takes an EnvFilter directive (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CUE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.chain().find_map(|e| e.downcast_ref::<CoreError>()) {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidRule(s) => {
                eprintln!("{} Invalid recurrence rule: {}", "Error:".style(error_style), s.yellow());
            }
            CoreError::InvalidTimeRange(s) => {
                eprintln!("{} Invalid time range: {}", "Error:".style(error_style), s.yellow());
            }
            CoreError::Timeout(_) | CoreError::Authority(_) => {
                eprintln!("{} {}", "Error:".style(error_style), core_error);
                eprintln!("The change may or may not have been saved; check the schedule and retry.");
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else if let Some(cli_error) = err.downcast_ref::<CliError>() {
        match cli_error {
            CliError::AmbiguousId(events) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, description) in events {
                    eprintln!("  {} ({})", id.yellow(), description);
                }
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), cli_error),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
