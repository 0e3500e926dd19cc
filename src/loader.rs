use crate::error::{ReportError, Result};
use crate::util::parse_f64_safe;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// One spreadsheet cell, reduced to the shapes the report cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    Bool(bool),
    Error(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric value of the cell. Blank cells are zero; `None` means the
    /// cell holds something that is not a number.
    pub fn as_amount(&self) -> Option<f64> {
        match self {
            Cell::Number(f) => Some(*f),
            c if c.is_empty() => Some(0.0),
            Cell::Text(s) => parse_f64_safe(Some(s.as_str())),
            _ => None,
        }
    }

    /// Text form with surrounding whitespace removed.
    pub fn text(&self) -> String {
        self.to_string().trim().to_string()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(dt) => write!(f, "{}", dt),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Error(e) => f.write_str(e),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
                Some(dt) => Cell::Date(dt),
                None => Cell::Text(data.to_string()),
            },
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Error(format!("{:?}", e)),
        }
    }
}

/// A sheet as a dense grid of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Cell at a zero-based position; out-of-range positions read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    /// View the sheet with row `header_row` as column headers. Headers are
    /// trimmed and any header found in `synonyms` is renamed.
    pub fn table(&self, header_row: usize, synonyms: &[(&str, &str)]) -> Table<'_> {
        let header_cells: Vec<Cell> = self.rows.get(header_row).cloned().unwrap_or_default();
        let headers = header_cells
            .iter()
            .map(|c| {
                let h = c.text();
                synonyms
                    .iter()
                    .find(|(from, _)| *from == h)
                    .map(|(_, to)| to.to_string())
                    .unwrap_or(h)
            })
            .collect();
        Table {
            sheet: &self.name,
            header_cells,
            headers,
            rows: self.rows.get(header_row + 1..).unwrap_or(&[]),
        }
    }
}

/// Headered view over a sheet's data rows.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    pub sheet: &'a str,
    pub header_cells: Vec<Cell>,
    pub headers: Vec<String>,
    pub rows: &'a [Vec<Cell>],
}

impl<'a> Table<'a> {
    /// First column with this header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| ReportError::MissingColumn {
            sheet: self.sheet.to_string(),
            column: name.to_string(),
        })
    }

    pub fn header(&self, col: usize) -> &str {
        self.headers.get(col).map(String::as_str).unwrap_or("")
    }
}

pub fn get<'r>(row: &'r [Cell], col: usize) -> &'r Cell {
    row.get(col).unwrap_or(&Cell::Empty)
}

/// Immutable, fully loaded workbook.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: HashMap<String, Sheet>,
    unreadable: HashMap<String, String>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self> {
        let mut wb = open_workbook_auto(path)
            .map_err(|e| ReportError::Workbook(format!("{}: {}", path.display(), e)))?;
        let mut workbook = Workbook::default();
        for name in wb.sheet_names().to_vec() {
            let key = name.trim().to_string();
            match wb.worksheet_range(&name) {
                Ok(range) => {
                    let rows: Vec<Vec<Cell>> = range
                        .rows()
                        .map(|r| r.iter().map(Cell::from).collect())
                        .collect();
                    // calamine ranges start at the first used cell
                    let (row0, col0) = range.start().unwrap_or((0, 0));
                    let rows = pad_origin(rows, row0 as usize, col0 as usize);
                    debug!(sheet = %key, rows = rows.len(), "loaded sheet");
                    workbook.sheets.insert(key.clone(), Sheet::new(key, rows));
                }
                Err(e) => {
                    warn!(sheet = %key, error = %e, "sheet could not be decoded");
                    workbook.unreadable.insert(key, e.to_string());
                }
            }
        }
        info!(
            path = %path.display(),
            sheets = workbook.sheets.len(),
            unreadable = workbook.unreadable.len(),
            "workbook loaded"
        );
        Ok(workbook)
    }

    #[cfg(test)]
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Workbook {
            sheets: sheets
                .into_iter()
                .map(|mut s| {
                    s.name = s.name.trim().to_string();
                    (s.name.clone(), s)
                })
                .collect(),
            unreadable: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn mark_unreadable(mut self, name: &str, reason: &str) -> Self {
        self.sheets.remove(name);
        self.unreadable.insert(name.to_string(), reason.to_string());
        self
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        let name = name.trim();
        if let Some(reason) = self.unreadable.get(name) {
            return Err(ReportError::UnreadableSheet {
                sheet: name.to_string(),
                reason: reason.clone(),
            });
        }
        self.sheets
            .get(name)
            .ok_or_else(|| ReportError::MissingSheet(name.to_string()))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sheets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn pad_origin(rows: Vec<Vec<Cell>>, row0: usize, col0: usize) -> Vec<Vec<Cell>> {
    let mut out: Vec<Vec<Cell>> = vec![Vec::new(); row0];
    out.extend(rows.into_iter().map(|r| {
        let mut padded = vec![Cell::Empty; col0];
        padded.extend(r);
        padded
    }));
    out
}
