use crate::charts::{ChartData, RowEmphasis};
use crate::error::Result;
use crate::types::{ParticularsMatrix, ProfitabilityReport, RowKind, PARTICULARS};
use crate::util::{format_indian, format_percent};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};
use tracing::info;

/// Display strings for the matrix, header row first. Amount rows use Indian
/// digit grouping, percentage rows two decimals.
pub fn format_matrix(matrix: &ParticularsMatrix) -> Vec<Vec<String>> {
    let mut out = Vec::with_capacity(matrix.rows().len() + 1);
    let mut header = vec![PARTICULARS.to_string()];
    header.extend(matrix.columns().iter().cloned());
    out.push(header);
    for row in matrix.rows() {
        let mut line = vec![row.label.clone()];
        line.extend(row.values.iter().map(|v| match row.kind {
            RowKind::Amount => format_indian(*v),
            RowKind::Percent => format_percent(*v),
        }));
        out.push(line);
    }
    out
}

/// Markdown table of the report; key rows have their label in bold.
pub fn render_table(report: &ProfitabilityReport) -> String {
    let mut builder = Builder::default();
    for (i, mut line) in format_matrix(&report.matrix).into_iter().enumerate() {
        if i > 0 && RowEmphasis::for_label(&line[0]) != RowEmphasis::Plain {
            line[0] = format!("**{}**", line[0]);
        }
        builder.push_record(line);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn print_report(report: &ProfitabilityReport) {
    println!("\nFY {} ({})\n", report.fiscal_year, report.window);
    println!("{}\n", render_table(report));
    if report.warnings.is_empty() {
        return;
    }
    println!("Warnings ({}):", report.warnings.len());
    for w in &report.warnings {
        println!("- [{}] {:?}: {}", w.category, w.kind, w.message);
    }
    println!();
}

/// The formatted matrix as CSV, header row included.
pub fn write_csv(path: &Path, report: &ProfitabilityReport) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for line in format_matrix(&report.matrix) {
        wtr.write_record(&line)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Full JSON export: the report with its chart series alongside.
#[derive(Debug, Serialize)]
pub struct ReportExport<'a> {
    #[serde(flatten)]
    pub report: &'a ProfitabilityReport,
    pub charts: ChartData,
}

impl<'a> ReportExport<'a> {
    pub fn new(report: &'a ProfitabilityReport) -> Self {
        Self {
            report,
            charts: ChartData::from_report(report),
        }
    }
}

/// File stem shared by a report's exports, e.g. `profitability_2025-26_Apr-25`.
pub fn export_stem(report: &ProfitabilityReport) -> String {
    let window: String = report
        .window
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("profitability_{}_{}", report.fiscal_year, window)
}

/// Write the CSV and JSON exports of `report` into `dir` and return both paths.
pub fn export_report(dir: &Path, report: &ProfitabilityReport) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let stem = export_stem(report);
    let csv_path = dir.join(format!("{}.csv", stem));
    let json_path = dir.join(format!("{}.json", stem));
    write_csv(&csv_path, report)?;
    write_json(&json_path, &ReportExport::new(report))?;
    info!(csv = %csv_path.display(), json = %json_path.display(), "exports written");
    Ok((csv_path, json_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{with_net_profit_pct, with_total_column};
    use crate::types::{ReportStatus, ReportWarning, WarningKind, NET_PROFIT, SALES};

    fn report() -> ProfitabilityReport {
        let domains = vec!["Training Business".to_string(), "Other Services".to_string()];
        let m = ParticularsMatrix::new(domains)
            .with_row(SALES, vec![1234567.0, 0.0])
            .with_row("Rent", vec![1500.75, 0.0])
            .with_row(NET_PROFIT, vec![1233066.25, 0.0]);
        ProfitabilityReport {
            fiscal_year: "2025-26".to_string(),
            window: "Apr-25 to Mar-26".to_string(),
            status: ReportStatus::Degraded,
            matrix: with_net_profit_pct(with_total_column(m, "Other Services")),
            warnings: vec![ReportWarning {
                category: "Purchase".to_string(),
                kind: WarningKind::MissingSheet,
                message: "sheet 'Purchases 25-26' not found".to_string(),
            }],
        }
    }

    #[test]
    fn matrix_is_formatted_per_row_kind() {
        let lines = format_matrix(&report().matrix);
        assert_eq!(lines[0], vec!["Particulars", "Training Business", "Other Services", "Total"]);
        assert_eq!(lines[1], vec!["Sales", "12,34,567", "0", "12,34,567"]);
        assert_eq!(lines[2][1], "1,500");
        assert_eq!(lines[4][0], "Net Profit %");
        assert_eq!(lines[4][2], "0.00%");
        assert!(lines[4][1].ends_with('%'));
    }

    #[test]
    fn markdown_table_bolds_key_rows() {
        let table = render_table(&report());
        assert!(table.contains("**Sales**"));
        assert!(table.contains("**Net Profit**"));
        assert!(!table.contains("**Rent**"));
        assert!(table.contains("| Particulars"));
    }

    #[test]
    fn exports_land_in_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let report = report();
        let (csv_path, json_path) = export_report(dir.path(), &report).unwrap();
        assert!(csv_path.ends_with("profitability_2025-26_Apr-25_to_Mar-26.csv"));

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&csv_path)
            .unwrap();
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 5);
        assert_eq!(&records[1][1], "12,34,567");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["fiscal_year"], "2025-26");
        assert_eq!(json["status"], "Degraded");
        assert_eq!(json["warnings"][0]["kind"], "MissingSheet");
        assert_eq!(json["charts"]["bars"][0]["labels"][0], "12.35L");
    }
}
