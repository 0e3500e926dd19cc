use crate::error::ReportError;
use serde::Serialize;
use tracing::warn;

pub const SALES: &str = "Sales";
pub const DEFERRED_REVENUE: &str = "Deferred Revenue";
pub const PURCHASE: &str = "Purchase";
pub const GROSS_PROFIT: &str = "Gross Profit";
pub const SALARY: &str = "Salary & Incentives";
pub const TNS_EXPENSES: &str = "TNS Expenses";
pub const NET_PROFIT: &str = "Net Profit";
pub const NET_PROFIT_PCT: &str = "Net Profit %";
pub const PARTICULARS: &str = "Particulars";
pub const TOTAL: &str = "Total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowKind {
    Amount,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub label: String,
    pub kind: RowKind,
    pub values: Vec<f64>,
}

/// Particulars x Domain table.
///
/// Every mutating step takes the matrix by value and hands back the extended
/// one, so a half-built matrix is never observable from two places at once.
/// Each row holds exactly one value per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticularsMatrix {
    columns: Vec<String>,
    rows: Vec<MatrixRow>,
}

impl ParticularsMatrix {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            columns: domains,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn has_total(&self) -> bool {
        self.columns.iter().any(|c| c == TOTAL)
    }

    /// Column positions that hold a domain, i.e. everything except `Total`.
    pub fn domain_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() != TOTAL)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.label == label)
    }

    pub fn row(&self, label: &str) -> Option<&MatrixRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn value(&self, label: &str, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        self.row(label).map(|r| r.values[col])
    }

    pub fn with_row(self, label: impl Into<String>, values: Vec<f64>) -> Self {
        self.push(label.into(), RowKind::Amount, values)
    }

    pub fn with_percent_row(self, label: impl Into<String>, values: Vec<f64>) -> Self {
        self.push(label.into(), RowKind::Percent, values)
    }

    pub fn without_row(mut self, label: &str) -> Self {
        self.rows.retain(|r| r.label != label);
        self
    }

    /// Insert a column at `at`; `values` supplies one entry per existing row.
    pub fn with_column(mut self, at: usize, name: impl Into<String>, values: Vec<f64>) -> Self {
        let at = at.min(self.columns.len());
        self.columns.insert(at, name.into());
        for (row, v) in self.rows.iter_mut().zip(values.into_iter().chain(std::iter::repeat(0.0))) {
            row.values.insert(at, v);
        }
        self
    }

    fn push(mut self, label: String, kind: RowKind, mut values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.columns.len(), "row '{}' width", label);
        values.resize(self.columns.len(), 0.0);
        self.rows.push(MatrixRow {
            label,
            kind,
            values,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    MissingSheet,
    UnreadableSheet,
    MissingColumn,
    UnparseableNumeric,
    UnparseableMonth,
    UnallocatedAmount,
}

/// A recoverable problem met while assembling one Particulars row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportWarning {
    pub category: String,
    pub kind: WarningKind,
    pub message: String,
}

/// Collects every degraded substitution made while building one report.
/// Each entry is also logged as it is recorded.
#[derive(Debug, Default)]
pub struct Warnings(Vec<ReportWarning>);

impl Warnings {
    pub fn push(&mut self, category: &str, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        warn!(category, ?kind, "{}", message);
        self.0.push(ReportWarning {
            category: category.to_string(),
            kind,
            message,
        });
    }

    /// Record a recoverable error against a category.
    pub fn push_error(&mut self, category: &str, err: &ReportError) {
        let kind = match err {
            ReportError::MissingSheet(_) => WarningKind::MissingSheet,
            ReportError::UnreadableSheet { .. } => WarningKind::UnreadableSheet,
            ReportError::MissingColumn { .. } => WarningKind::MissingColumn,
            ReportError::UnparseableNumeric { .. } => WarningKind::UnparseableNumeric,
            ReportError::UnparseableMonth(_) => WarningKind::UnparseableMonth,
            _ => WarningKind::UnreadableSheet,
        };
        self.push(category, kind, err.to_string());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<ReportWarning> {
        self.0
    }
}

/// How a report run ended. Both states produce a complete matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportStatus {
    Assembled,
    /// Some rows were zeroed or skipped; see the warnings.
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfitabilityReport {
    pub fiscal_year: String,
    pub window: String,
    pub status: ReportStatus,
    pub matrix: ParticularsMatrix,
    pub warnings: Vec<ReportWarning>,
}
