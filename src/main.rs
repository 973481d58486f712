//! WSI Patches - Export whole-slide image regions as PNG files.
//!
//! This binary parses the command line, sets up logging and the output
//! directory, and hands pairings to the library's extractor.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_patches::{
    config::{
        AnnotationConfig, Cli, Command, ExtractArgs, InspectConfig, InspectFormat, TmaConfig,
        WholeConfig,
    },
    coords::CoordinateProvider,
    extract::{BatchReport, Extractor},
    matching::{
        discover, FileMatcher, MappingColumns, MappingTable, MatchOutcome, ANNOTATION_EXTENSIONS,
        SLIDE_EXTENSIONS, SPOT_EXTENSIONS,
    },
    slide::{LocalSlideSource, SlideReader, SlideSource},
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Whole(config) => run_whole(config),
        Command::Annotations(config) => run_annotations(config),
        Command::Tma(config) => run_tma(config),
        Command::Inspect(config) => run_inspect(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_patches=debug"
    } else {
        "wsi_patches=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Logging, validation and output directory shared by extraction commands.
fn prepare(extract: &ExtractArgs, validation: Result<(), String>) -> bool {
    init_logging(extract.verbose);

    if let Err(e) = validation {
        error!("Configuration error: {}", e);
        return false;
    }

    if let Err(e) = std::fs::create_dir_all(&extract.output) {
        error!(
            "Cannot create output directory {}: {}",
            extract.output.display(),
            e
        );
        return false;
    }

    true
}

// =============================================================================
// Extraction Commands
// =============================================================================

fn run_whole(config: WholeConfig) -> ExitCode {
    let extract = &config.extract;
    if !prepare(extract, config.validate()) {
        return ExitCode::FAILURE;
    }

    let slides = match discover(&extract.input, &extract.staining, &SLIDE_EXTENSIONS) {
        Ok(slides) => slides,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let provider = CoordinateProvider::Unbounded;
    let matcher = FileMatcher::new(extract.naming(), provider.clone(), extract.overwrite);
    run_batch(matcher.whole(&slides), provider, extract, false)
}

fn run_annotations(config: AnnotationConfig) -> ExitCode {
    let extract = &config.extract;
    if !prepare(extract, config.validate()) {
        return ExitCode::FAILURE;
    }

    let provider = config.provider();
    let matcher = FileMatcher::new(extract.naming(), provider.clone(), extract.overwrite);

    let outcome = match &config.mapping_table {
        Some(table) => MappingTable::read(table, &MappingColumns::default())
            .map(|table| matcher.by_table(&table, &extract.input, &config.coords)),
        None => matcher.pair_paths(
            &extract.input,
            &config.coords,
            &extract.staining,
            &ANNOTATION_EXTENSIONS,
        ),
    };

    match outcome {
        Ok(outcome) => run_batch(outcome, provider, extract, !config.no_border_offset),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_tma(config: TmaConfig) -> ExitCode {
    let extract = &config.extract;
    if !prepare(extract, config.validate()) {
        return ExitCode::FAILURE;
    }

    let provider = CoordinateProvider::CsvCircular;
    let matcher = FileMatcher::new(extract.naming(), provider.clone(), extract.overwrite);

    match matcher.pair_paths(&extract.input, &config.csv, &extract.staining, &SPOT_EXTENSIONS) {
        Ok(outcome) => run_batch(outcome, provider, extract, config.border_offset),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_batch(
    outcome: MatchOutcome,
    provider: CoordinateProvider,
    extract: &ExtractArgs,
    border_offset: bool,
) -> ExitCode {
    info!(
        pairings = outcome.pairings.len(),
        skipped = outcome.diagnostics.len(),
        "Matched slides"
    );

    let extractor = Extractor::new(
        LocalSlideSource::new(),
        provider,
        extract.options(border_offset),
    );
    let report = extractor.run(&outcome.pairings);
    log_report(&report);

    if report.failed() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn log_report(report: &BatchReport) {
    info!(
        pairings = report.pairings,
        succeeded = report.succeeded,
        failed = report.failed(),
        written = report.patches_written,
        skipped = report.patches_skipped,
        rejected = report.patches_rejected,
        "Done"
    );
    for failure in &report.failures {
        error!("  {}: {}", failure.slide.display(), failure.error);
    }
}

// =============================================================================
// Inspect Command
// =============================================================================

fn run_inspect(config: InspectConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let slide = match LocalSlideSource::new().open(&config.slide) {
        Ok(slide) => slide,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let levels: Vec<_> = (0..slide.level_count())
        .filter_map(|level| slide.level_info(level))
        .collect();
    let (offset_x, offset_y) = slide.bounds_offset();

    match config.format {
        InspectFormat::Json => {
            let json = serde_json::json!({
                "slide": config.slide.display().to_string(),
                "format": slide.format(),
                "levels": levels,
                "bounds_offset": [offset_x, offset_y],
                "metadata": slide.metadata(),
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        InspectFormat::Text => {
            println!("Slide:  {}", config.slide.display());
            println!("Format: {}", slide.format().name());
            if let Some(mpp) = slide.metadata().mpp {
                println!("MPP:    {}", mpp);
            }
            if let Some(magnification) = slide.metadata().magnification {
                println!("Magnification: {}x", magnification);
            }
            println!("Border offset: ({}, {})", offset_x, offset_y);
            println!();
            println!("Level  Downsample  Dimensions        Tile");
            println!("─────────────────────────────────────────────");
            for (index, info) in levels.iter().enumerate() {
                println!(
                    "{:<6} {:<11} {:<17} {}x{}",
                    index,
                    info.downsample,
                    format!("{}x{}", info.width, info.height),
                    info.tile_width,
                    info.tile_height
                );
            }
        }
    }

    ExitCode::SUCCESS
}
