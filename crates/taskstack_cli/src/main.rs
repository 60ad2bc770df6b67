mod cli;
mod commands;
mod menu;
mod render;

use crate::cli::{Cli, collect_overrides};
use crate::commands::run_command;
use crate::menu::Menu;
use crate::render::Renderer;
use clap::Parser;
use clap::error::ErrorKind;
use std::io::{self, Write};
use taskstack_core::config::{load_config_with_fallback, merge_overrides, resolve_store_path};
use taskstack_core::{AppError, TaskStore};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "TASKSTACK_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn run(cli: Cli) -> Result<(), AppError> {
    let overrides = collect_overrides(&cli.config_override).map_err(AppError::invalid_input)?;

    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        eprintln!("WARNING: using default configuration: {err}");
    }
    let config = merge_overrides(&loaded.config, &overrides);

    let path = resolve_store_path(cli.store.as_deref(), &config)?;
    let opened = TaskStore::open(path);
    let mut store = opened.store;
    let renderer = Renderer::from_config(&config);

    match cli.command {
        None => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            Menu::new(&mut store, renderer, stdin.lock(), stdout.lock())
                .run(opened.error.as_ref())
        }
        Some(command) => {
            if let Some(err) = opened.error.as_ref() {
                eprintln!("WARNING: starting with an empty task list: {err}");
            }
            let stdout = io::stdout();
            let mut out = stdout.lock();
            run_command(&mut store, command, cli.json, &renderer, &mut out)?;
            out.flush().map_err(|err| AppError::io(err.to_string()))
        }
    }
}

fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}
