//! Command-line configuration.
//!
//! Every extraction subcommand shares [`ExtractArgs`]; options can also be
//! set through environment variables with the `WSI_PATCHES_` prefix:
//!
//! - `WSI_PATCHES_OUTPUT` - Output directory
//! - `WSI_PATCHES_STAINING` - Staining suffix filter (default: empty)
//! - `WSI_PATCHES_LEVEL` - Requested downsample level (default: 1)
//! - `WSI_PATCHES_TAG` - Annotation group to export (default: hotspot)
//! - `WSI_PATCHES_MAPPING_TABLE` - Slide/annotation mapping table

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::coords::CoordinateProvider;
use crate::extract::{ExtractOptions, OutputNaming};

/// Default requested level (full resolution).
pub const DEFAULT_LEVEL: u32 = 1;

/// Default annotation group.
pub const DEFAULT_TAG: &str = "hotspot";

// =============================================================================
// CLI Structure
// =============================================================================

/// WSI Patches - Export whole-slide image regions as PNG files.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-patches")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Export whole slides at the requested level.
    Whole(WholeConfig),

    /// Export ASAP annotation regions.
    Annotations(AnnotationConfig),

    /// Export tissue-microarray spots listed in a CSV file.
    Tma(TmaConfig),

    /// Print the pyramid of a slide.
    Inspect(InspectConfig),
}

// =============================================================================
// Shared Extraction Options
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Slide file, or directory of slides.
    pub input: PathBuf,

    /// Directory receiving the PNG files. Created if missing.
    #[arg(short, long, env = "WSI_PATCHES_OUTPUT")]
    pub output: PathBuf,

    /// Only use files whose name (without extension) ends with this suffix.
    #[arg(long, default_value = "", env = "WSI_PATCHES_STAINING")]
    pub staining: String,

    /// Downsample factor of the level to export (1 = full resolution).
    ///
    /// Output names carry this value, e.g. `slide-level1.png`. A factor no
    /// level has, such as 0, exports full resolution under its own name
    /// (`slide-level0.png`).
    #[arg(short, long, default_value_t = DEFAULT_LEVEL, env = "WSI_PATCHES_LEVEL")]
    pub level: u32,

    /// Replace existing output files.
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExtractArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.output.is_file() {
            return Err(format!(
                "output path {} is a file, expected a directory",
                self.output.display()
            ));
        }
        require_exists(&self.input, "input")
    }

    pub fn naming(&self) -> OutputNaming {
        OutputNaming::new(&self.output, self.level)
    }

    pub fn options(&self, border_offset: bool) -> ExtractOptions {
        ExtractOptions {
            level: self.level,
            overwrite: self.overwrite,
            border_offset,
        }
    }
}

fn require_exists(path: &Path, what: &str) -> Result<(), String> {
    if path.exists() {
        Ok(())
    } else {
        Err(format!("{} path {} does not exist", what, path.display()))
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct WholeConfig {
    #[command(flatten)]
    pub extract: ExtractArgs,
}

impl WholeConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.extract.validate()
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnnotationConfig {
    #[command(flatten)]
    pub extract: ExtractArgs,

    /// Annotation XML file, or directory of annotation files.
    ///
    /// With a mapping table this is the directory the table's names are
    /// resolved against.
    #[arg(short, long)]
    pub coords: PathBuf,

    /// Annotation group (PartOfGroup) to export.
    #[arg(short, long, default_value = DEFAULT_TAG, env = "WSI_PATCHES_TAG")]
    pub tag: String,

    /// CSV or spreadsheet listing slide/annotation pairs explicitly.
    #[arg(long, env = "WSI_PATCHES_MAPPING_TABLE")]
    pub mapping_table: Option<PathBuf>,

    /// Use annotation coordinates as raw level-0 pixels.
    ///
    /// By default coordinates are shifted by the slide's scanned-area offset.
    #[arg(long, default_value_t = false)]
    pub no_border_offset: bool,
}

impl AnnotationConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.extract.validate()?;
        require_exists(&self.coords, "coordinate")?;

        if self.tag.trim().is_empty() {
            return Err("annotation tag must not be empty".to_string());
        }

        if let Some(table) = &self.mapping_table {
            require_exists(table, "mapping table")?;
            if !self.extract.input.is_dir() || !self.coords.is_dir() {
                return Err(
                    "with a mapping table, input and coords must be base directories".to_string(),
                );
            }
        }
        Ok(())
    }

    pub fn provider(&self) -> CoordinateProvider {
        CoordinateProvider::XmlAnnotated {
            tag: self.tag.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TmaConfig {
    #[command(flatten)]
    pub extract: ExtractArgs,

    /// Spot CSV file, or directory of spot files.
    #[arg(long)]
    pub csv: PathBuf,

    /// Shift spot coordinates by the slide's scanned-area offset.
    #[arg(long, default_value_t = false)]
    pub border_offset: bool,
}

impl TmaConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.extract.validate()?;
        require_exists(&self.csv, "CSV")
    }
}

/// Output format for `inspect`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum InspectFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Slide file to inspect.
    pub slide: PathBuf,

    #[arg(short, long, value_enum, default_value_t = InspectFormat::Text)]
    pub format: InspectFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.slide.is_file() {
            return Err(format!("{} is not a file", self.slide.display()));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
