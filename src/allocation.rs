//! Domain allocation strategies.
//!
//! Cost categories that are not recorded per domain are split across the
//! domain columns here. Every function returns one amount per domain, in the
//! order of `domains`, and records a warning for anything it had to zero out.

use crate::config::PurchaseLayout;
use crate::error::ReportError;
use crate::loader::{get, Cell, Sheet, Table};
use crate::months::{canonical_month, FiscalMonth, ResolvedWindow};
use crate::types::{WarningKind, Warnings};
use tracing::debug;

/// Numeric value of a table cell; non-numeric content becomes zero and is
/// recorded as a warning.
pub fn cell_amount(
    table: &Table,
    row_idx: usize,
    col: usize,
    category: &str,
    warnings: &mut Warnings,
) -> f64 {
    let cell = get(&table.rows[row_idx], col);
    match cell.as_amount() {
        Some(v) => v,
        None => {
            let err = ReportError::UnparseableNumeric {
                sheet: table.sheet.to_string(),
                row: row_idx + 1,
                column: table.header(col).to_string(),
                value: cell.to_string(),
            };
            warnings.push_error(category, &err);
            0.0
        }
    }
}

/// Columns of a twelve-month block whose month falls in `window`.
///
/// A column's month comes from its header; headers that are not date-like
/// fall back to the column's fiscal position (first column = April).
pub fn month_columns(table: &Table, first_col: usize, window: &ResolvedWindow) -> Vec<usize> {
    FiscalMonth::ALL
        .iter()
        .enumerate()
        .filter_map(|(i, month)| {
            let col = first_col + i;
            let label = match table.header_cells.get(col).map(canonical_month) {
                Some(Ok(label)) => label,
                _ => {
                    debug!(sheet = table.sheet, col, "month header not date-like, using position");
                    window.fiscal_year.label_for(*month)
                }
            };
            window.contains(&label).then_some(col)
        })
        .collect()
}

/// Salary allocation: `sum(percentage[domain, row] * amount[month, row])`
/// over every row and every month column in the window. Domains without a
/// percentage column get nothing.
pub fn weighted_percentage(
    table: &Table,
    domains: &[String],
    month_cols: &[usize],
    category: &str,
    warnings: &mut Warnings,
) -> Vec<f64> {
    let pct_cols: Vec<Option<usize>> = domains.iter().map(|d| table.column(d)).collect();
    let mut totals = vec![0.0; domains.len()];
    for row_idx in 0..table.rows.len() {
        let amounts: Vec<f64> = month_cols
            .iter()
            .map(|c| cell_amount(table, row_idx, *c, category, warnings))
            .collect();
        let row_amount: f64 = amounts.iter().sum();
        if row_amount == 0.0 {
            continue;
        }
        for (slot, pct_col) in totals.iter_mut().zip(&pct_cols) {
            if let Some(pc) = pct_col {
                let pct = cell_amount(table, row_idx, *pc, category, warnings);
                *slot += amounts.iter().map(|a| pct * a).sum::<f64>();
            }
        }
    }
    totals
}

/// Each domain's share of total sales; all zeros when there are no sales.
pub fn sales_ratios(sales: &[f64]) -> Vec<f64> {
    let total: f64 = sales.iter().sum();
    if total == 0.0 {
        return vec![0.0; sales.len()];
    }
    sales.iter().map(|s| s / total).collect()
}

/// Split `amount` by the sales ratios.
pub fn sales_ratio(amount: f64, ratios: &[f64]) -> Vec<f64> {
    ratios.iter().map(|r| amount * r).collect()
}

/// A ledger line that passed the window filter.
#[derive(Debug, Clone, Copy)]
pub struct LedgerLine {
    pub row_idx: usize,
    pub amount: f64,
}

/// Lines with a non-zero amount whose month (when the sheet has a month
/// column) lies in the window.
pub fn ledger_lines(
    table: &Table,
    amount_col: usize,
    month_col: Option<usize>,
    window: &ResolvedWindow,
    category: &str,
    warnings: &mut Warnings,
) -> Vec<LedgerLine> {
    let mut lines = Vec::new();
    for row_idx in 0..table.rows.len() {
        let amount = cell_amount(table, row_idx, amount_col, category, warnings);
        if amount == 0.0 {
            continue;
        }
        if let Some(mc) = month_col {
            match canonical_month(get(&table.rows[row_idx], mc)) {
                Ok(label) if window.contains(&label) => {}
                Ok(_) => continue,
                Err(e) => {
                    warnings.push_error(category, &e);
                    continue;
                }
            }
        }
        lines.push(LedgerLine { row_idx, amount });
    }
    lines
}

/// Sum of the lines' amounts.
pub fn ledger_total(lines: &[LedgerLine]) -> f64 {
    lines.iter().map(|l| l.amount).sum()
}

/// Header positions of the per-domain percentage columns, if the sheet
/// carries any at all.
pub fn domain_columns(table: &Table, domains: &[String]) -> Option<Vec<Option<usize>>> {
    let cols: Vec<Option<usize>> = domains.iter().map(|d| table.column(d)).collect();
    cols.iter().any(Option::is_some).then_some(cols)
}

/// TNS allocation: each line's amount times that line's percentage for the
/// domain.
pub fn per_line_percentage(
    table: &Table,
    lines: &[LedgerLine],
    domain_cols: &[Option<usize>],
    category: &str,
    warnings: &mut Warnings,
) -> Vec<f64> {
    let mut totals = vec![0.0; domain_cols.len()];
    for line in lines {
        let mut share = 0.0;
        for (slot, col) in totals.iter_mut().zip(domain_cols) {
            if let Some(c) = col {
                let pct = cell_amount(table, line.row_idx, *c, category, warnings);
                share += pct;
                *slot += line.amount * pct;
            }
        }
        if share == 0.0 {
            warnings.push(
                category,
                WarningKind::UnallocatedAmount,
                format!(
                    "sheet '{}' row {}: amount {} has no domain split",
                    table.sheet,
                    line.row_idx + 1,
                    line.amount
                ),
            );
        }
    }
    totals
}

/// Book `amount` entirely against `target`; every other domain gets zero.
pub fn direct_single_domain(
    amount: f64,
    domains: &[String],
    target: &str,
    category: &str,
    warnings: &mut Warnings,
) -> Vec<f64> {
    let mut values = vec![0.0; domains.len()];
    match domains.iter().position(|d| d == target) {
        Some(i) => values[i] = amount,
        None if amount != 0.0 => warnings.push(
            category,
            WarningKind::UnallocatedAmount,
            format!("{} booked to '{}', which is not a report domain", amount, target),
        ),
        None => {}
    }
    values
}

/// Purchase lookup from the fixed domain-by-month region of the sheet,
/// summed over the window's months.
pub fn purchase_region(
    sheet: &Sheet,
    layout: &PurchaseLayout,
    domains: &[String],
    window: &ResolvedWindow,
    category: &str,
    warnings: &mut Warnings,
) -> Vec<f64> {
    // sheet order; later rows win when a domain name repeats
    let mut by_name: Vec<(String, usize)> = Vec::new();
    for row in layout.first_row..layout.end_row {
        let name = sheet.cell(row, layout.name_column).text();
        if name.is_empty() {
            continue;
        }
        match by_name.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = row,
            None => by_name.push((name, row)),
        }
    }

    let mut amount_at = |row: usize, col: usize| -> f64 {
        let cell: &Cell = sheet.cell(row, col);
        cell.as_amount().unwrap_or_else(|| {
            let err = ReportError::UnparseableNumeric {
                sheet: sheet.name.clone(),
                row: row + 1,
                column: format!("#{}", col + 1),
                value: cell.to_string(),
            };
            warnings.push_error(category, &err);
            0.0
        })
    };

    let mut values = vec![0.0; domains.len()];
    for (slot, domain) in values.iter_mut().zip(domains) {
        if let Some((_, row)) = by_name.iter().find(|(n, _)| n == domain) {
            *slot = window
                .months
                .iter()
                .map(|m| amount_at(*row, layout.first_month_column + m.fiscal_index()))
                .sum();
        }
    }
    let mut strays: Vec<(&String, f64)> = Vec::new();
    for (name, row) in &by_name {
        if domains.contains(name) {
            continue;
        }
        let stray: f64 = window
            .months
            .iter()
            .map(|m| amount_at(*row, layout.first_month_column + m.fiscal_index()))
            .sum();
        if stray != 0.0 {
            strays.push((name, stray));
        }
    }
    for (name, stray) in strays {
        warnings.push(
            category,
            WarningKind::UnallocatedAmount,
            format!("purchases of {} recorded for unknown domain '{}'", stray, name),
        );
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::months::{FiscalYear, Window};
    use chrono::NaiveDate;

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn month(y: i32, m: u32) -> Cell {
        Cell::Date(
            NaiveDate::from_ymd_opt(y, m, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn domains() -> Vec<String> {
        vec!["Training Business".to_string(), "G-Suite Business".to_string()]
    }

    fn salary_sheet(training_pct: f64) -> Sheet {
        // header: Name, Apr-25, May-25, Training Business, G-Suite Business
        Sheet::new(
            "Monthly Salary 25-26",
            vec![
                vec![
                    t("Name"),
                    month(2025, 4),
                    month(2025, 5),
                    t("Training Business"),
                    t("G-Suite Business"),
                ],
                vec![t("Asha"), n(1000.0), n(2000.0), n(training_pct), n(0.5)],
                vec![t("Ravi"), n(500.0), t(""), n(training_pct), n(0.0)],
            ],
        )
    }

    #[test]
    fn weighted_percentage_sums_rows_and_months() {
        let sheet = salary_sheet(0.5);
        let table = sheet.table(0, &[]);
        let window = Window::FullYear.resolve(FiscalYear::new(2025));
        let cols = month_columns(&table, 1, &window);
        // columns without a date header fall back to their fiscal position
        assert!(cols.contains(&1) && cols.contains(&2));
        let mut w = Warnings::default();
        let v = weighted_percentage(&table, &domains(), &[1, 2], "Salary", &mut w);
        assert_eq!(v, vec![0.5 * 3000.0 + 0.5 * 500.0, 0.5 * 3000.0]);
        assert!(w.is_empty());
    }

    #[test]
    fn weighted_percentage_is_linear_in_weights() {
        let mut w = Warnings::default();
        let base_sheet = salary_sheet(0.2);
        let scaled_sheet = salary_sheet(0.6);
        let base_table = base_sheet.table(0, &[]);
        let scaled_table = scaled_sheet.table(0, &[]);
        let base = weighted_percentage(&base_table, &domains(), &[1, 2], "S", &mut w);
        let scaled = weighted_percentage(&scaled_table, &domains(), &[1, 2], "S", &mut w);
        assert!((scaled[0] - 3.0 * base[0]).abs() < 1e-9);
        assert_eq!(scaled[1], base[1]);
    }

    #[test]
    fn single_month_picks_matching_header() {
        let sheet = salary_sheet(1.0);
        let table = sheet.table(0, &[]);
        let window = Window::Month(FiscalMonth::May).resolve(FiscalYear::new(2025));
        assert_eq!(month_columns(&table, 1, &window), vec![2]);
        let other_year = Window::Month(FiscalMonth::May).resolve(FiscalYear::new(2024));
        assert!(month_columns(&table, 1, &other_year).is_empty());
    }

    #[test]
    fn missing_domain_percentage_contributes_zero() {
        let sheet = salary_sheet(1.0);
        let mut w = Warnings::default();
        let doms = vec!["Other Services".to_string()];
        let v = weighted_percentage(&sheet.table(0, &[]), &doms, &[1, 2], "S", &mut w);
        assert_eq!(v, vec![0.0]);
    }

    #[test]
    fn ratios_guard_zero_sales() {
        assert_eq!(sales_ratios(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(sales_ratios(&[100.0, 300.0]), vec![0.25, 0.75]);
        assert_eq!(sales_ratio(1000.0, &[0.25, 0.75]), vec![250.0, 750.0]);
    }

    #[test]
    fn per_line_split_filters_month_and_flags_unsplit_lines() {
        let sheet = Sheet::new(
            "Expense - TNS 25-26",
            vec![
                vec![t("Month"), t("Amount"), t("Training Business"), t("G-Suite Business")],
                vec![t("01-06-2025"), n(1000.0), n(0.4), n(0.6)],
                vec![t("01-07-2025"), n(500.0), n(1.0), n(0.0)],
                vec![t("01-06-2025"), n(300.0), t(""), t("")],
                vec![t("sometime"), n(50.0), n(1.0), n(0.0)],
            ],
        );
        let table = sheet.table(0, &[]);
        let window = Window::Month(FiscalMonth::June).resolve(FiscalYear::new(2025));
        let mut w = Warnings::default();
        let lines = ledger_lines(&table, 1, Some(0), &window, "TNS", &mut w);
        assert_eq!(lines.len(), 2);
        let cols = domain_columns(&table, &domains()).unwrap();
        let v = per_line_percentage(&table, &lines, &cols, "TNS", &mut w);
        assert_eq!(v, vec![400.0, 600.0]);
        let kinds: Vec<WarningKind> = w.into_vec().into_iter().map(|x| x.kind).collect();
        assert_eq!(kinds, vec![WarningKind::UnparseableMonth, WarningKind::UnallocatedAmount]);
    }

    #[test]
    fn no_domain_columns_detected() {
        let sheet = Sheet::new("TNS", vec![vec![t("Month"), t("Amount")]]);
        assert!(domain_columns(&sheet.table(0, &[]), &domains()).is_none());
    }

    #[test]
    fn deferred_revenue_goes_to_one_domain() {
        let mut w = Warnings::default();
        let v = direct_single_domain(700.0, &domains(), "G-Suite Business", "DR", &mut w);
        assert_eq!(v, vec![0.0, 700.0]);
        let v = direct_single_domain(700.0, &domains(), "Nope", "DR", &mut w);
        assert_eq!(v, vec![0.0, 0.0]);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn purchase_region_sums_window_months() {
        let mut rows = vec![Vec::new(); 7];
        let mut training = vec![Cell::Empty, t("Training Business")];
        training.extend((1..=12).map(|m| n(m as f64 * 10.0)));
        let mut unknown = vec![Cell::Empty, t("Hardware")];
        unknown.extend((1..=12).map(|_| n(1.0)));
        rows.push(training);
        rows.push(unknown);
        let sheet = Sheet::new("Purchases 25-26", rows);
        let layout = PurchaseLayout::default();
        let fy = FiscalYear::new(2025);
        let mut w = Warnings::default();

        let full = Window::FullYear.resolve(fy);
        let all = purchase_region(&sheet, &layout, &domains(), &full, "P", &mut w);
        assert_eq!(all, vec![780.0, 0.0]);
        assert_eq!(w.len(), 1);

        let jan = Window::Month(FiscalMonth::January).resolve(fy);
        let one = purchase_region(&sheet, &layout, &domains(), &jan, "P", &mut w);
        assert_eq!(one, vec![100.0, 0.0]);
    }

    #[test]
    fn unknown_purchase_rows_warn_in_sheet_order() {
        let mut rows = vec![Vec::new(); 7];
        for name in ["Hardware", "Travel"] {
            let mut row = vec![Cell::Empty, t(name)];
            row.extend((1..=12).map(|_| n(5.0)));
            rows.push(row);
        }
        let sheet = Sheet::new("Purchases 25-26", rows);
        let window = Window::FullYear.resolve(FiscalYear::new(2025));
        let mut w = Warnings::default();
        let layout = PurchaseLayout::default();
        let v = purchase_region(&sheet, &layout, &domains(), &window, "P", &mut w);
        assert_eq!(v, vec![0.0, 0.0]);
        let messages: Vec<String> = w.into_vec().into_iter().map(|x| x.message).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("'Hardware'"));
        assert!(messages[1].contains("'Travel'"));
    }
}
