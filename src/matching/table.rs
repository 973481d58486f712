//! Explicit slide/annotation mapping tables.
//!
//! A mapping table lists, per row, a slide file name, the folder holding it,
//! the annotation file name, and an inclusion flag. Tables are read from
//! CSV (`;` or `,` separated) or from the first sheet of a spreadsheet.
//!
//! Rows are kept when the inclusion flag is `x` or `yes` (any case) and the
//! annotation name is not a placeholder (`""`, `-`, `nan`).

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::MatchError;

const INCLUDED: [&str; 2] = ["x", "yes"];
const PLACEHOLDERS: [&str; 3] = ["", "-", "nan"];
const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Column names of a mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingColumns {
    pub slide: String,
    pub folder: String,
    pub coordinates: String,
    pub include: String,
}

impl Default for MappingColumns {
    fn default() -> Self {
        MappingColumns {
            slide: "WSI-names".to_string(),
            folder: "Folder".to_string(),
            coordinates: "XML-names".to_string(),
            include: "Include".to_string(),
        }
    }
}

/// One included row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub slide_name: String,
    /// Empty when the slide sits directly in the slide base directory.
    pub folder: String,
    pub coordinate_name: String,
}

impl MappingEntry {
    /// `<slide base>/<folder>/<slide name>`
    pub fn slide_path(&self, slide_base: &Path) -> PathBuf {
        let mut path = slide_base.to_path_buf();
        if !self.folder.is_empty() {
            path.push(&self.folder);
        }
        path.push(&self.slide_name);
        path
    }

    /// `<coordinate base>/<coordinate name>`
    pub fn coordinate_path(&self, coordinate_base: &Path) -> PathBuf {
        coordinate_base.join(&self.coordinate_name)
    }
}

/// The included rows of a mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    pub entries: Vec<MappingEntry>,
    /// Rows dropped by the inclusion or placeholder filters.
    pub excluded: usize,
}

impl MappingTable {
    /// Read a table, choosing the reader from the file extension.
    pub fn read(path: &Path, columns: &MappingColumns) -> Result<Self, MatchError> {
        if !path.exists() {
            return Err(MatchError::MissingInput(path.to_path_buf()));
        }

        let table_error = |message: String| MatchError::MappingTable {
            path: path.to_path_buf(),
            message,
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let rows = if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
            read_spreadsheet_rows(path).map_err(table_error)?
        } else {
            let text = std::fs::read_to_string(path).map_err(|e| table_error(e.to_string()))?;
            read_csv_rows(&text).map_err(table_error)?
        };

        let table = Self::from_rows(&rows, columns).map_err(table_error)?;
        debug!(
            table = %path.display(),
            included = table.entries.len(),
            excluded = table.excluded,
            "Read mapping table"
        );
        Ok(table)
    }

    /// Build a table from a header row followed by data rows.
    pub fn from_rows(rows: &[Vec<String>], columns: &MappingColumns) -> Result<Self, String> {
        let Some((header, data)) = rows.split_first() else {
            return Err("table is empty".to_string());
        };

        let column = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| format!("missing column '{}'", name))
        };
        let slide_col = column(&columns.slide)?;
        let folder_col = column(&columns.folder)?;
        let coord_col = column(&columns.coordinates)?;
        let include_col = column(&columns.include)?;

        let mut table = MappingTable::default();
        for row in data {
            let cell = |col: usize| row.get(col).map(|s| s.trim()).unwrap_or("");

            let include = cell(include_col).to_ascii_lowercase();
            let coordinate_name = cell(coord_col);
            let slide_name = cell(slide_col);
            if !INCLUDED.contains(&include.as_str())
                || is_placeholder(coordinate_name)
                || is_placeholder(slide_name)
            {
                table.excluded += 1;
                continue;
            }

            let folder = cell(folder_col);
            table.entries.push(MappingEntry {
                slide_name: slide_name.to_string(),
                folder: if is_placeholder(folder) {
                    String::new()
                } else {
                    folder.to_string()
                },
                coordinate_name: coordinate_name.to_string(),
            });
        }

        Ok(table)
    }
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.contains(&value.to_ascii_lowercase().as_str())
}

/// Pick `;` or `,` by counting both in the header line.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    if header.matches(';').count() >= header.matches(',').count() && header.contains(';') {
        b';'
    } else {
        b','
    }
}

fn read_csv_rows(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .has_headers(false)
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| e.to_string())
        })
        .collect()
}

fn read_spreadsheet_rows(path: &Path) -> Result<Vec<Vec<String>>, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| e.to_string())?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "workbook has no sheets".to_string())?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| e.to_string())?;

    Ok(range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}
