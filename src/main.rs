mod audio;
mod cli;
mod config;
mod display;
mod meter;
mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use audio::analyser::{AnalyserFrontend, AnalyserSettings};
use audio::frontend::{AudioFrontend, FrontendError};
use cli::Cli;
use display::{ChartBuffer, ConsoleDisplay, DisplaySink, JsonLinesDisplay};
use meter::{AverageMode, AveragingConfig, LoudnessEngine, LoudnessScale, WindowKind};
use scheduler::{TickLoop, VirtualClock, WallClock};

/// Seconds the loop waits for a frontend that is not ready yet.
const READY_TIMEOUT_SECS: u64 = 5;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Config values apply only where the CLI is still at its default
    let config_path = cli.config.clone().or_else(config::find_config);
    if let Some(ref path) = config_path {
        match config::load_config(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                if cli.window == meter::engine::DEFAULT_WINDOW_SECONDS { cli.window = cfg.meter.window_seconds; }
                if cli.window_kind == WindowKind::default() { cli.window_kind = cfg.meter.window; }
                if cli.average == AverageMode::default() { cli.average = cfg.meter.average; }
                if cli.scale == LoudnessScale::default() { cli.scale = cfg.meter.scale; }
                if cli.tick_rate == 60 { cli.tick_rate = cfg.output.tick_rate; }
                if cli.chart_points == 50 { cli.chart_points = cfg.output.chart_points; }
                let defaults = AnalyserSettings::default();
                if cli.fft_size == defaults.fft_size { cli.fft_size = cfg.analyser.fft_size; }
                if cli.smoothing == defaults.smoothing_time_constant { cli.smoothing = cfg.analyser.smoothing_time_constant; }
                if cli.min_db == defaults.min_decibels { cli.min_db = cfg.analyser.min_decibels; }
                if cli.max_db == defaults.max_decibels { cli.max_db = cfg.analyser.max_decibels; }
            }
            Err(err) => log::warn!("Failed to load config from {}: {:#}", path.display(), err),
        }
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;

    let settings = AnalyserSettings {
        fft_size: cli.fft_size,
        smoothing_time_constant: cli.smoothing,
        min_decibels: cli.min_db,
        max_decibels: cli.max_db,
    };
    settings.validate()?;
    anyhow::ensure!(cli.tick_rate > 0, "Tick rate must be positive");

    let averaging = AveragingConfig {
        window_seconds: cli.window,
        window: cli.window_kind,
        mode: cli.average,
    };

    log::info!("loudmeter - windowed loudness averaging");
    log::info!("Input: {}", input.display());
    log::info!(
        "Scale: {:?}, average: {:?}, window: {}s ({:?})",
        cli.scale, averaging.mode, averaging.window_seconds, averaging.window
    );
    log::info!("Analyser: fft_size={}, {} ticks/s", settings.fft_size, cli.tick_rate);

    // A source that cannot be opened ends the session without ticking
    let frontend = match open_frontend(input, &cli, settings) {
        Ok(frontend) => frontend,
        Err(err) => {
            log::error!("Error accessing audio input: {}", err);
            return Ok(());
        }
    };
    let total_ticks = frontend.frame_count();
    log::info!("{} bins per frame, {} ticks", frontend.bin_count(), total_ticks);

    let mut engine = LoudnessEngine::new(frontend, cli.scale, averaging)?;

    let mut sinks: Vec<Box<dyn DisplaySink>> = Vec::new();
    if !cli.quiet {
        sinks.push(Box::new(ConsoleDisplay::new(cli.scale, Some(total_ticks))?));
    }
    let mut chart = ChartBuffer::new(cli.scale, cli.chart_points);
    if let Some(ref path) = cli.chart {
        chart = chart.with_output(path.clone());
    }
    sinks.push(Box::new(chart));
    if let Some(ref path) = cli.json {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        sinks.push(Box::new(JsonLinesDisplay::new(BufWriter::new(file), cli.json_history)));
    }

    let idle_limit = READY_TIMEOUT_SECS * cli.tick_rate as u64;
    let changes = cli.window_changes.clone();
    let stats = if cli.realtime {
        TickLoop::new(WallClock::new(cli.tick_rate))
            .with_window_changes(changes)
            .with_idle_limit(idle_limit)
            .run(&mut engine, &mut sinks)?
    } else {
        TickLoop::new(VirtualClock::new(cli.tick_rate))
            .with_window_changes(changes)
            .with_idle_limit(idle_limit)
            .run(&mut engine, &mut sinks)?
    };

    if stats.idle_ticks > 0 {
        log::warn!("Audio frontend was idle for {} ticks", stats.idle_ticks);
    }
    let scale = engine.scale();
    log::info!(
        "Done: {} ticks, {} window changes, {} samples in final window",
        stats.ticks,
        stats.reconfigurations,
        engine.history().len()
    );
    log::info!(
        "Final loudness {}, average {} over {}s",
        display::format_loudness(scale, engine.current()),
        display::format_loudness(scale, engine.average()),
        engine.config().window_seconds
    );

    Ok(())
}

fn open_frontend(
    input: &Path,
    cli: &Cli,
    settings: AnalyserSettings,
) -> Result<AnalyserFrontend, FrontendError> {
    let audio = audio::decode::decode_audio(input)?;
    AnalyserFrontend::new(audio, cli.tick_rate, cli.scale.bin_format(), settings)
}
