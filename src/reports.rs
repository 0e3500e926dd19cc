use crate::allocation::{
    cell_amount, direct_single_domain, domain_columns, ledger_lines, ledger_total, month_columns,
    per_line_percentage, purchase_region, sales_ratio, sales_ratios, weighted_percentage,
};
use crate::config::{sheet_name, ReportConfig};
use crate::error::{ReportError, Result};
use crate::loader::{get, Table, Workbook};
use crate::metrics::{gross_profit, net_profit, with_net_profit_pct, with_total_column};
use crate::months::{canonical_month, FiscalYear, ResolvedWindow, Window};
use crate::types::{
    ParticularsMatrix, ProfitabilityReport, ReportStatus, WarningKind, Warnings, DEFERRED_REVENUE,
    GROSS_PROFIT, NET_PROFIT, PARTICULARS, PURCHASE, SALARY, SALES, TNS_EXPENSES, TOTAL,
};
use std::collections::HashMap;
use tracing::{debug, info};

// warning category for the expense sheet as a whole
const EXPENSES: &str = "Expenses";

/// Everything one aggregation run needs to know.
struct Run<'a> {
    workbook: &'a Workbook,
    config: &'a ReportConfig,
    window: ResolvedWindow,
    domains: Vec<String>,
}

impl<'a> Run<'a> {
    fn sheet_name(&self, template: &str) -> String {
        sheet_name(template, self.window.fiscal_year)
    }

    fn zeros(&self) -> Vec<f64> {
        vec![0.0; self.domains.len()]
    }
}

/// Build the Particulars x Domain matrix for one fiscal year and window.
///
/// Only a missing or malformed Sales sheet is fatal. Any other sheet that
/// cannot be read contributes a zero row (or, for TNS, no row) and a warning.
pub fn generate_report(
    workbook: &Workbook,
    config: &ReportConfig,
    fy: FiscalYear,
    window: Window,
) -> Result<ProfitabilityReport> {
    let window = window.resolve(fy);
    info!(fiscal_year = %fy, window = %window.describe(), "building report");
    let mut warnings = Warnings::default();

    let (domains, sales) = sales_by_domain(workbook, config, &window, &mut warnings)?;
    let run = Run {
        workbook,
        config,
        window,
        domains,
    };
    let mut matrix = ParticularsMatrix::new(run.domains.clone()).with_row(SALES, sales.clone());

    let deferred = deferred_revenue(&run, &mut warnings);
    let deferred = recover(deferred, DEFERRED_REVENUE, &run, &mut warnings);
    matrix = matrix.with_row(DEFERRED_REVENUE, deferred);

    let purchase = recover(purchases(&run, &mut warnings), PURCHASE, &run, &mut warnings);
    matrix = matrix.with_row(PURCHASE, purchase);

    let gp = gross_profit(&matrix);
    matrix = matrix.with_row(GROSS_PROFIT, gp);

    let salary = recover(salary(&run, &mut warnings), SALARY, &run, &mut warnings);
    matrix = matrix.with_row(SALARY, salary);

    let ratios = sales_ratios(&sales);
    match expense_categories(&run, &mut warnings) {
        Ok(categories) => {
            for (category, total) in categories {
                if total != 0.0 && ratios.iter().all(|r| *r == 0.0) {
                    warnings.push(
                        &category,
                        WarningKind::UnallocatedAmount,
                        format!("{} cannot be split by sales, window has no sales", total),
                    );
                }
                matrix = matrix.with_row(category, sales_ratio(total, &ratios));
            }
        }
        Err(e) => warnings.push_error(EXPENSES, &e),
    }

    match tns_expenses(&run, &ratios, &mut warnings) {
        Ok(tns) => matrix = matrix.with_row(TNS_EXPENSES, tns),
        Err(e) => warnings.push_error(TNS_EXPENSES, &e),
    }

    let np = net_profit(&matrix);
    matrix = matrix.with_row(NET_PROFIT, np);
    matrix = with_total_column(matrix, &config.total_after);
    matrix = with_net_profit_pct(matrix);

    let status = if warnings.is_empty() {
        ReportStatus::Assembled
    } else {
        ReportStatus::Degraded
    };
    info!(
        fiscal_year = %fy,
        rows = matrix.rows().len(),
        warnings = warnings.len(),
        ?status,
        "report assembled"
    );
    Ok(ProfitabilityReport {
        fiscal_year: fy.label(),
        window: run.window.describe(),
        status,
        matrix,
        warnings: warnings.into_vec(),
    })
}

/// One report per configured fiscal year, same window, in config order.
pub fn generate_comparison(
    workbook: &Workbook,
    config: &ReportConfig,
    window: Window,
) -> Result<Vec<ProfitabilityReport>> {
    config
        .fiscal_years()
        .into_iter()
        .map(|fy| generate_report(workbook, config, fy, window))
        .collect()
}

// A failed step becomes an all-zero row plus a warning.
fn recover(
    result: Result<Vec<f64>>,
    category: &str,
    run: &Run,
    warnings: &mut Warnings,
) -> Vec<f64> {
    match result {
        Ok(values) => values,
        Err(e) => {
            warnings.push_error(category, &e);
            run.zeros()
        }
    }
}

fn fatal(sheet: &str, err: ReportError) -> ReportError {
    ReportError::FatalLoad {
        sheet: sheet.to_string(),
        reason: err.to_string(),
    }
}

/// A column is numeric unless it has content and none of it is a number.
fn is_numeric_column(table: &Table, col: usize) -> bool {
    let mut filled = table
        .rows
        .iter()
        .map(|row| get(row, col))
        .filter(|c| !c.is_empty())
        .peekable();
    filled.peek().is_none() || filled.any(|c| c.as_amount().is_some())
}

/// Columns of the Sales sheet that hold a domain, in sheet order. Text-only
/// columns such as remarks are not domains.
fn sales_domain_columns(table: &Table, skip: &[Option<usize>]) -> Vec<usize> {
    let mut seen: Vec<&str> = Vec::new();
    let mut cols = Vec::new();
    for (i, h) in table.headers.iter().enumerate() {
        if h.is_empty() || h == TOTAL || h == PARTICULARS || skip.contains(&Some(i)) {
            continue;
        }
        if seen.contains(&h.as_str()) {
            continue;
        }
        if !is_numeric_column(table, i) {
            debug!(column = %h, "skipping non-numeric sales column");
            continue;
        }
        seen.push(h);
        cols.push(i);
    }
    cols
}

/// Step 1: domain list and per-domain sales over the window.
fn sales_by_domain(
    workbook: &Workbook,
    config: &ReportConfig,
    window: &ResolvedWindow,
    warnings: &mut Warnings,
) -> Result<(Vec<String>, Vec<f64>)> {
    let layout = &config.sales;
    let sheet = workbook
        .sheet(&layout.sheet)
        .map_err(|e| fatal(&layout.sheet, e))?;
    let synonyms: Vec<(&str, &str)> = layout
        .month_synonyms
        .iter()
        .map(|s| (s.as_str(), layout.month_column.as_str()))
        .collect();
    let table = sheet.table(layout.header_row, &synonyms);
    let month_col = table
        .require_column(&layout.month_column)
        .map_err(|e| fatal(&layout.sheet, e))?;
    let fy_col = table.column(&layout.fy_column);
    let domain_cols = sales_domain_columns(&table, &[Some(month_col), fy_col]);
    let domains: Vec<String> = domain_cols
        .iter()
        .map(|c| table.header(*c).to_string())
        .collect();

    let fy_label = window.fiscal_year.label();
    let mut totals = vec![0.0; domain_cols.len()];
    for (row_idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        if let Some(fc) = fy_col {
            if get(row, fc).text() != fy_label {
                continue;
            }
        }
        match canonical_month(get(row, month_col)) {
            Ok(label) if window.contains(&label) => {}
            Ok(_) => continue,
            Err(e) => {
                warnings.push_error(SALES, &e);
                continue;
            }
        }
        for (slot, col) in totals.iter_mut().zip(&domain_cols) {
            *slot += cell_amount(&table, row_idx, *col, SALES, warnings);
        }
    }
    debug!(domains = ?domains, sales = ?totals, "sales by domain");
    Ok((domains, totals))
}

/// Step 2: deferred revenue in the window, booked to one domain.
fn deferred_revenue(run: &Run, warnings: &mut Warnings) -> Result<Vec<f64>> {
    let layout = &run.config.deferred_revenue;
    let sheet = run.workbook.sheet(&run.sheet_name(&layout.sheet))?;
    let table = sheet.table(layout.header_row, &[]);
    let month_col = table.require_column(&layout.month_column)?;
    let amount_col = table.require_column(&layout.amount_column)?;
    let lines = ledger_lines(
        &table,
        amount_col,
        Some(month_col),
        &run.window,
        DEFERRED_REVENUE,
        warnings,
    );
    let amount = ledger_total(&lines);
    debug!(amount, domain = %layout.domain, "deferred revenue");
    Ok(direct_single_domain(
        amount,
        &run.domains,
        &layout.domain,
        DEFERRED_REVENUE,
        warnings,
    ))
}

/// Step 3: purchases from the fixed region of the sheet.
fn purchases(run: &Run, warnings: &mut Warnings) -> Result<Vec<f64>> {
    let layout = &run.config.purchase;
    let sheet = run.workbook.sheet(&run.sheet_name(&layout.sheet))?;
    Ok(purchase_region(
        sheet,
        layout,
        &run.domains,
        &run.window,
        PURCHASE,
        warnings,
    ))
}

/// Step 5: salary cost split by each employee's allocation percentages.
fn salary(run: &Run, warnings: &mut Warnings) -> Result<Vec<f64>> {
    let layout = &run.config.salary;
    let name = run.sheet_name(&layout.sheet);
    let sheet = run.workbook.sheet(&name)?;
    let table = sheet.table(layout.header_row, &[]);
    if domain_columns(&table, &run.domains).is_none() {
        return Err(ReportError::MissingColumn {
            sheet: name,
            column: "domain allocation percentages".to_string(),
        });
    }
    let cols = month_columns(&table, layout.first_month_column, &run.window);
    Ok(weighted_percentage(
        &table,
        &run.domains,
        &cols,
        SALARY,
        warnings,
    ))
}

/// Step 6: per-category totals over the window, in first-seen order.
fn expense_categories(run: &Run, warnings: &mut Warnings) -> Result<Vec<(String, f64)>> {
    let layout = &run.config.expenses;
    let sheet = run.workbook.sheet(&run.sheet_name(&layout.sheet))?;
    let table = sheet.table(layout.header_row, &[]);
    let category_col = table.require_column(&layout.category_column)?;
    let cols = month_columns(&table, layout.first_month_column, &run.window);

    let mut order: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (row_idx, row) in table.rows.iter().enumerate() {
        let category = get(row, category_col).text();
        if category.is_empty() {
            continue;
        }
        let amount: f64 = cols
            .iter()
            .map(|c| cell_amount(&table, row_idx, *c, &category, warnings))
            .sum();
        let slot = *index.entry(category.clone()).or_insert_with(|| {
            order.push((category, 0.0));
            order.len() - 1
        });
        order[slot].1 += amount;
    }
    debug!(categories = order.len(), "expense categories");
    Ok(order)
}

/// Step 7: TNS expenses, split per line when the sheet carries domain
/// percentage columns, otherwise by sales.
fn tns_expenses(run: &Run, ratios: &[f64], warnings: &mut Warnings) -> Result<Vec<f64>> {
    let layout = &run.config.tns;
    let sheet = run.workbook.sheet(&run.sheet_name(&layout.sheet))?;
    let table = sheet.table(layout.header_row, &[]);
    let amount_col = table.require_column(&layout.amount_column)?;
    let month_col = table.column(&layout.month_column);
    let lines = ledger_lines(
        &table,
        amount_col,
        month_col,
        &run.window,
        TNS_EXPENSES,
        warnings,
    );
    match domain_columns(&table, &run.domains) {
        Some(cols) => Ok(per_line_percentage(
            &table,
            &lines,
            &cols,
            TNS_EXPENSES,
            warnings,
        )),
        None => {
            let total = ledger_total(&lines);
            debug!(total, "no domain split on TNS sheet, allocating by sales");
            if total != 0.0 && ratios.iter().all(|r| *r == 0.0) {
                warnings.push(
                    TNS_EXPENSES,
                    WarningKind::UnallocatedAmount,
                    format!("{} cannot be split by sales, window has no sales", total),
                );
            }
            Ok(sales_ratio(total, ratios))
        }
    }
}
