//! Tabular workbook model
//!
//! A workbook is a list of named sheets, each an ordered list of rows of cell
//! text. The importer only reads sheets; how a workbook gets into this shape is
//! up to the reader. [`Workbook::from_csv_dir`] reads one CSV file per sheet.

use crate::config::{DataSource, DataSources};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Workbook errors
#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Sheet '{sheet}' not found in workbook '{workbook}'")]
    SheetNotFound { workbook: String, sheet: String },

    #[error("Workbook directory not found: {0}")]
    NotFound(PathBuf),

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorkbookResult<T> = Result<T, WorkbookError>;

/// One data row keyed by the header row's cell text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    cells: IndexMap<String, String>,
}

impl Record {
    /// Cell text under `column`, `None` when the column is missing or the cell
    /// is blank
    pub fn field(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Cell text under `column`, empty string when missing
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Map the first row as headers over every following row, by position.
///
/// A row shorter than the header only carries the columns it has.
pub fn rows_to_records(rows: &[Vec<String>]) -> Vec<Record> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };
    data.iter()
        .map(|row| header.iter().cloned().zip(row.iter().cloned()).collect())
        .collect()
}

/// A named sheet of rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
    /// Index of the first row that has every column filled, the header row
    pub first_full_row: usize,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        let first_full_row = first_full_row(&rows);
        Sheet {
            name: name.into(),
            rows,
            first_full_row,
        }
    }

    /// Convenience constructor for literal rows
    pub fn from_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Sheet::new(name, rows)
    }

    /// Rows from the header row on, mapped to records. The header row itself is
    /// not part of the output.
    pub fn records(&self) -> Vec<Record> {
        rows_to_records(self.rows.get(self.first_full_row..).unwrap_or(&[]))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn populated(row: &[String]) -> usize {
    row.iter().filter(|c| !c.trim().is_empty()).count()
}

fn first_full_row(rows: &[Vec<String>]) -> usize {
    let width = rows.iter().map(|r| populated(r)).max().unwrap_or(0);
    if width == 0 {
        return 0;
    }
    rows.iter().position(|r| populated(r) == width).unwrap_or(0)
}

/// A workbook: named sheets in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub name: String,
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(name: impl Into<String>) -> Self {
        Workbook {
            name: name.into(),
            sheets: Vec::new(),
        }
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.add_sheet(sheet);
        self
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> WorkbookResult<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| WorkbookError::SheetNotFound {
                workbook: self.name.clone(),
                sheet: name.to_string(),
            })
    }

    /// Read every `*.csv` file in `dir` as a sheet named after the file stem.
    /// Sheets are ordered by file name.
    pub fn from_csv_dir(dir: impl AsRef<Path>) -> WorkbookResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(WorkbookError::NotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
            .collect();
        paths.sort();

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut workbook = Workbook::new(name);
        for path in paths {
            let sheet_name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let rows = read_csv_rows(&path)?;
            debug!("Read sheet '{}' ({} rows) from {:?}", sheet_name, rows.len(), path);
            workbook.add_sheet(Sheet::new(sheet_name, rows));
        }
        Ok(workbook)
    }
}

fn read_csv_rows(path: &Path) -> WorkbookResult<Vec<Vec<String>>> {
    let csv_err = |source| WorkbookError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// The three workbooks one import reads
#[derive(Debug, Clone, Default)]
pub struct Workbooks {
    pub nist_csf: Workbook,
    pub nice_cwf: Workbook,
    pub nice_competencies: Workbook,
}

impl Workbooks {
    /// Read each workbook from `root/<local file stem>/`, one CSV per sheet
    pub fn from_csv_root(root: impl AsRef<Path>, sources: &DataSources) -> WorkbookResult<Self> {
        let root = root.as_ref();
        let open = |source: &DataSource| Workbook::from_csv_dir(root.join(source.stem()));
        Ok(Workbooks {
            nist_csf: open(&sources.nist_csf)?,
            nice_cwf: open(&sources.nice_cwf)?,
            nice_competencies: open(&sources.nice_competencies)?,
        })
    }
}
