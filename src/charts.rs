//! Chart-ready series derived from a finished report.
//!
//! Nothing here draws anything; a front end takes these values as-is.

use crate::types::{ParticularsMatrix, ProfitabilityReport, GROSS_PROFIT, NET_PROFIT, SALES};
use crate::util::{lakh_label, percent_of};
use serde::Serialize;

/// Visual class of a Particulars row. Key rows are emphasised, each with its
/// own colour pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowEmphasis {
    Sales,
    GrossProfit,
    NetProfit,
    Plain,
}

impl RowEmphasis {
    pub fn for_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "sales" => RowEmphasis::Sales,
            "gross profit" => RowEmphasis::GrossProfit,
            "net profit" => RowEmphasis::NetProfit,
            _ => RowEmphasis::Plain,
        }
    }

    /// `(text, background)` hex colours, `None` for plain rows.
    pub fn colours(self) -> Option<(&'static str, &'static str)> {
        match self {
            RowEmphasis::Sales => Some(("#174ea6", "#ffe066")),
            RowEmphasis::GrossProfit => Some(("#0b8043", "#b7e4c7")),
            RowEmphasis::NetProfit => Some(("#b31412", "#f4978e")),
            RowEmphasis::Plain => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub colour: &'static str,
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub domain: String,
    pub value: f64,
    pub share_pct: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    /// Domain names along the x axis; the Total column is left out.
    pub domains: Vec<String>,
    pub bars: Vec<BarSeries>,
    pub sales_pie: Vec<PieSlice>,
    pub net_profit_pie: Vec<PieSlice>,
}

impl ChartData {
    pub fn from_report(report: &ProfitabilityReport) -> Self {
        let m = &report.matrix;
        let cols = m.domain_indices();
        let domains: Vec<String> = cols.iter().map(|c| m.columns()[*c].clone()).collect();

        let bars = [SALES, GROSS_PROFIT, NET_PROFIT]
            .iter()
            .map(|label| {
                let values = domain_values(m, label, &cols);
                BarSeries {
                    name: label.to_string(),
                    colour: RowEmphasis::for_label(label)
                        .colours()
                        .map(|(text, _)| text)
                        .unwrap_or("#666666"),
                    labels: values.iter().map(|v| lakh_label(*v)).collect(),
                    values,
                }
            })
            .collect();

        ChartData {
            title: format!(
                "FY {}: Sales, Gross Profit, and Net Profit by Domain",
                report.fiscal_year
            ),
            sales_pie: pie(&domains, &domain_values(m, SALES, &cols)),
            net_profit_pie: pie(&domains, &domain_values(m, NET_PROFIT, &cols)),
            domains,
            bars,
        }
    }
}

fn domain_values(m: &ParticularsMatrix, label: &str, cols: &[usize]) -> Vec<f64> {
    match m.row(label) {
        Some(row) => cols.iter().map(|c| row.values[*c]).collect(),
        None => vec![0.0; cols.len()],
    }
}

// Pie slices cannot be negative or empty, so only positive values are kept.
fn pie(domains: &[String], values: &[f64]) -> Vec<PieSlice> {
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    domains
        .iter()
        .zip(values)
        .filter(|(_, v)| **v > 0.0)
        .map(|(d, v)| PieSlice {
            domain: d.clone(),
            value: *v,
            share_pct: percent_of(*v, total),
            label: lakh_label(*v),
        })
        .collect()
}
