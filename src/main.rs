mod audio;
mod cli;
mod config;
mod encode;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;

use audio::grid::validate_frame_rate;
use cli::Cli;
use config::Config;
use encode::csv::{default_output_path, write_track};
use error::AnalysisError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(AnalysisError::Consistency { .. }) = err.downcast_ref::<AnalysisError>() {
                log::warn!("Long clips at fractional samples-per-frame need --hop-rounding floor");
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<AnalysisError>()
        .map_or(1, AnalysisError::exit_code)
}

/// Resolve configuration, then decode, analyze and write. Returns the
/// written path.
fn run(cli: &Cli) -> Result<PathBuf> {
    let mut config = match config::discover_config(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    // CLI values win over the config file
    if let Some(precision) = cli.precision {
        config.output.precision = precision;
    }
    if let Some(ref ffmpeg) = cli.ffmpeg {
        config.decoder.ffmpeg = Some(ffmpeg.clone());
    }
    if cli.no_ffmpeg_fallback {
        config.decoder.ffmpeg_fallback = false;
    }
    if let Some(rounding) = cli.hop_rounding {
        config.analysis.hop_rounding = rounding;
    }
    config.validate()?;

    let fps = validate_frame_rate(
        cli.frame_rate
            .unwrap_or_else(|| i64::from(config.analysis.frame_rate)),
    )?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    log::info!("Input: {}", cli.input.display());
    log::info!("Output: {}", output.display());
    log::info!("Frame rate: {}fps", fps);

    // 1. Decode audio
    log::info!("Decoding audio...");
    let audio = audio::decode::decode_audio(&cli.input, &config.decoder)?;

    // 2. Analyze
    log::info!("Analyzing audio...");
    let progress = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} windows")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );
        pb
    };
    let (grid, track) = audio::analysis::analyze(&audio, fps, &config, progress)?;
    log::info!(
        "Total frames: {} @ {}fps, Duration: {:.1}s",
        track.len(),
        track.frame_rate,
        grid.duration_secs()
    );
    if track.is_empty() {
        log::warn!("Input is shorter than one frame; writing the header only");
    }

    // 3. Write
    let written = write_track(&track, &output, config.output.precision)?;
    log::info!("Done! Output: {}", written.display());
    Ok(written)
}
