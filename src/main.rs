use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod app;
mod cli;
mod client;
mod config;
mod models;
mod recipes;
mod render;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::AppState;
use client::RecipeClient;
use config::Config;
use recipes::RecipeStore;

/// `RUST_LOG` wins, then `LOG_LEVEL`, then info. With `LOG_FILE` set, log
/// lines are also appended to that file.
fn init_logging() -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
        }
    };

    let file_layer = match std::env::var("LOG_FILE") {
        Ok(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {path}"))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        Err(_) => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    init_logging()?;

    let config = Config::load_with(config::base_path()?)?;

    match args.command {
        cli::Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let state = AppState::load(&config);

            if !state.is_ready() {
                log::warn!("starting in degraded mode, /search will answer 503");
            }

            web::start_daemon(state, &bind)
        }

        cli::Command::BuildIndex {} => {
            let index = semantic::build_index_for(&config)?;
            println!(
                "{} recipes indexed into {}",
                index.len(),
                config.resolve(&config.index_path).display()
            );
            Ok(())
        }

        cli::Command::Search {
            query,
            offset,
            limit,
            remote,
            json,
        } => {
            let limit = limit.unwrap_or(config.default_limit);

            let response = match remote {
                Some(addr) => RecipeClient::new(&addr)?.search(&query, offset, limit)?,
                None => AppState::load(&config).search(&query, offset, limit)?,
            };

            if json {
                return print_json(&response);
            }

            print!("{}", render::render_page(&response));
            Ok(())
        }

        cli::Command::Show { id, remote, json } => {
            let recipe = match remote {
                Some(addr) => RecipeClient::new(&addr)?.recipe(id)?,
                None => {
                    // the model is not needed to show a single recipe
                    let recipes = RecipeStore::load(&config.resolve(&config.recipes_path))?;
                    AppState::new(None, Some(Arc::new(recipes))).recipe(id)?
                }
            };

            if json {
                return print_json(&recipe);
            }

            print!("{}", render::render_detail(&recipe));
            Ok(())
        }
    }
}
