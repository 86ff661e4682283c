mod background;
mod builder;
mod comparison;
mod config;
mod dataset;
mod glue;
mod manager;
mod options;
mod page;
mod script;
mod share;
mod spec;
mod stats;

use crate::background::Resize;
use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    site_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the chart options.
    Chart,

    /// Render frames of the background animation.
    Background {
        #[arg(long, default_value_t = 120)]
        frames: usize,

        #[arg(long, default_value_t = 1280.0)]
        width: f64,

        #[arg(long, default_value_t = 720.0)]
        height: f64,

        /// Resize the canvas before a frame, as FRAME:WIDTHxHEIGHT (repeatable).
        #[arg(long = "resize")]
        resizes: Vec<Resize>,
    },

    /// Replay a page script and record what the page does.
    Simulate {
        #[arg(long)]
        script: PathBuf,
    },

    /// Remove generated files.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.site_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Chart => mgr.render_charts()?,
        Command::Background {
            frames,
            width,
            height,
            resizes,
        } => mgr.render_background(frames, width, height, &resizes)?,
        Command::Simulate { script } => mgr.simulate_page(script)?,
        Command::Clean => mgr.clean_site()?,
    }

    Ok(())
}
