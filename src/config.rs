//! Workbook layout contracts.
//!
//! The sheet names, header rows and positional offsets below describe one
//! specific spreadsheet. They are kept in a serde struct so a differently
//! laid out workbook can be described in JSON without touching the code.
//! `ReportConfig::default()` matches the layout the report was built for.

use crate::error::{ReportError, Result};
use crate::months::FiscalYear;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder replaced by the fiscal year's sheet suffix (e.g. `25-26`).
pub const FY_PLACEHOLDER: &str = "{fy}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesLayout {
    pub sheet: String,
    pub header_row: usize,
    pub month_column: String,
    /// Alternative header names renamed to `month_column`.
    pub month_synonyms: Vec<String>,
    /// Optional fiscal-year tag column; rows are filtered on it when present.
    pub fy_column: String,
}

impl Default for SalesLayout {
    fn default() -> Self {
        Self {
            sheet: "Sales".to_string(),
            header_row: 0,
            month_column: "Month_Year".to_string(),
            month_synonyms: vec!["Month".to_string()],
            fy_column: "FY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeferredRevenueLayout {
    pub sheet: String,
    pub header_row: usize,
    pub month_column: String,
    pub amount_column: String,
    /// The whole deferred amount is booked against this domain.
    pub domain: String,
}

impl Default for DeferredRevenueLayout {
    fn default() -> Self {
        Self {
            sheet: "Deferred Revenue {fy}".to_string(),
            header_row: 0,
            month_column: "Month".to_string(),
            amount_column: "Def. Rev.".to_string(),
            domain: "G-Suite Business".to_string(),
        }
    }
}

/// Headerless region: rows `first_row..end_row`, domain name in
/// `name_column`, twelve fiscal months starting at `first_month_column`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseLayout {
    pub sheet: String,
    pub first_row: usize,
    pub end_row: usize,
    pub name_column: usize,
    pub first_month_column: usize,
}

impl Default for PurchaseLayout {
    fn default() -> Self {
        Self {
            sheet: "Purchases {fy}".to_string(),
            first_row: 7,
            end_row: 9,
            name_column: 1,
            first_month_column: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryLayout {
    pub sheet: String,
    pub header_row: usize,
    pub first_month_column: usize,
}

impl Default for SalaryLayout {
    fn default() -> Self {
        Self {
            sheet: "Monthly Salary {fy}".to_string(),
            header_row: 1,
            first_month_column: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpensesLayout {
    pub sheet: String,
    pub header_row: usize,
    pub category_column: String,
    pub first_month_column: usize,
}

impl Default for ExpensesLayout {
    fn default() -> Self {
        Self {
            sheet: "Expenses {fy}".to_string(),
            header_row: 0,
            category_column: "Expenses".to_string(),
            first_month_column: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TnsLayout {
    pub sheet: String,
    pub header_row: usize,
    pub amount_column: String,
    pub month_column: String,
}

impl Default for TnsLayout {
    fn default() -> Self {
        Self {
            sheet: "Expense - TNS {fy}".to_string(),
            header_row: 0,
            amount_column: "Amount".to_string(),
            month_column: "Month".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Fiscal years to compare, by start year, in display order.
    pub fiscal_years: Vec<i32>,
    /// The Total column is placed right after this domain.
    pub total_after: String,
    pub sales: SalesLayout,
    pub deferred_revenue: DeferredRevenueLayout,
    pub purchase: PurchaseLayout,
    pub salary: SalaryLayout,
    pub expenses: ExpensesLayout,
    pub tns: TnsLayout,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fiscal_years: vec![2025, 2024],
            total_after: "Other Services".to_string(),
            sales: SalesLayout::default(),
            deferred_revenue: DeferredRevenueLayout::default(),
            purchase: PurchaseLayout::default(),
            salary: SalaryLayout::default(),
            expenses: ExpensesLayout::default(),
            tns: TnsLayout::default(),
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ReportConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fiscal_years.is_empty() {
            return Err(ReportError::Config(
                "at least one fiscal year is required".to_string(),
            ));
        }
        if self.purchase.end_row < self.purchase.first_row {
            return Err(ReportError::Config(format!(
                "purchase rows {}..{} are reversed",
                self.purchase.first_row, self.purchase.end_row
            )));
        }
        Ok(())
    }

    pub fn fiscal_years(&self) -> Vec<FiscalYear> {
        self.fiscal_years.iter().map(|y| FiscalYear::new(*y)).collect()
    }
}

/// Expand a `{fy}` sheet-name template for one fiscal year.
pub fn sheet_name(template: &str, fy: FiscalYear) -> String {
    template.replace(FY_PLACEHOLDER, &fy.sheet_suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_sheet_names_follow_fiscal_year() {
        let cfg = ReportConfig::default();
        let fy = FiscalYear::new(2024);
        assert_eq!(sheet_name(&cfg.deferred_revenue.sheet, fy), "Deferred Revenue 24-25");
        assert_eq!(sheet_name(&cfg.tns.sheet, fy), "Expense - TNS 24-25");
        assert_eq!(sheet_name(&cfg.sales.sheet, fy), "Sales");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = r#"{"fiscal_years": [2026], "purchase": {"first_row": 10, "end_row": 13}}"#;
        file.write_all(json.as_bytes()).unwrap();
        let cfg = ReportConfig::load(file.path()).unwrap();
        assert_eq!(cfg.fiscal_years, vec![2026]);
        assert_eq!(cfg.purchase.first_row, 10);
        assert_eq!(cfg.purchase.name_column, 1);
        assert_eq!(cfg.salary.header_row, 1);
        assert_eq!(cfg.total_after, "Other Services");
    }

    #[test]
    fn empty_fiscal_years_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fiscal_years": []}}"#).unwrap();
        assert!(matches!(
            ReportConfig::load(file.path()),
            Err(ReportError::Config(_))
        ));
    }
}
