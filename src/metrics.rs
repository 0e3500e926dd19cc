//! Derived rows and columns of the Particulars matrix.
//!
//! Pure functions: each reads the matrix it is given and returns the
//! extended matrix. Missing input rows read as zeros.

use crate::types::{
    ParticularsMatrix, RowKind, DEFERRED_REVENUE, GROSS_PROFIT, NET_PROFIT, NET_PROFIT_PCT,
    PURCHASE, SALARY, SALES, TOTAL,
};
use crate::util::percent_of;

fn row_or_zero(matrix: &ParticularsMatrix, label: &str) -> Vec<f64> {
    matrix
        .row(label)
        .map(|r| r.values.clone())
        .unwrap_or_else(|| vec![0.0; matrix.columns().len()])
}

/// `Sales - Deferred Revenue - Purchase`, per column.
pub fn gross_profit(matrix: &ParticularsMatrix) -> Vec<f64> {
    let sales = row_or_zero(matrix, SALES);
    let deferred = row_or_zero(matrix, DEFERRED_REVENUE);
    let purchase = row_or_zero(matrix, PURCHASE);
    sales
        .iter()
        .zip(&deferred)
        .zip(&purchase)
        .map(|((s, d), p)| s - d - p)
        .collect()
}

/// Gross Profit minus every cost row, where the cost rows run from
/// `Salary & Incentives` to the end of the matrix. The block is located by
/// label because the number of expense categories varies by period.
pub fn net_profit(matrix: &ParticularsMatrix) -> Vec<f64> {
    let mut result = row_or_zero(matrix, GROSS_PROFIT);
    let start = matrix
        .row_index(SALARY)
        .or_else(|| matrix.row_index(GROSS_PROFIT).map(|i| i + 1))
        .unwrap_or(matrix.rows().len());
    for row in &matrix.rows()[start..] {
        if row.kind != RowKind::Amount {
            continue;
        }
        for (acc, v) in result.iter_mut().zip(&row.values) {
            *acc -= v;
        }
    }
    result
}

/// Insert `Total` right after `after` (or at the end when that column is
/// absent), holding each row's sum over the domain columns. Does nothing if
/// the matrix already has a Total column.
pub fn with_total_column(matrix: ParticularsMatrix, after: &str) -> ParticularsMatrix {
    if matrix.has_total() {
        return matrix;
    }
    let at = matrix
        .column_index(after)
        .map(|i| i + 1)
        .unwrap_or(matrix.columns().len());
    let domain_cols = matrix.domain_indices();
    let totals: Vec<f64> = matrix
        .rows()
        .iter()
        .map(|r| domain_cols.iter().map(|c| r.values[*c]).sum())
        .collect();
    matrix.with_column(at, TOTAL, totals)
}

/// Replace the `Net Profit %` row with `Net Profit / Sales * 100` for every
/// column. Columns without sales show 0.
pub fn with_net_profit_pct(matrix: ParticularsMatrix) -> ParticularsMatrix {
    let matrix = matrix.without_row(NET_PROFIT_PCT);
    let sales = row_or_zero(&matrix, SALES);
    let np = row_or_zero(&matrix, NET_PROFIT);
    let pct = np
        .iter()
        .zip(&sales)
        .map(|(n, s)| percent_of(*n, *s))
        .collect();
    matrix.with_percent_row(NET_PROFIT_PCT, pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ParticularsMatrix {
        let domains = vec![
            "DomainA".to_string(),
            "Other Services".to_string(),
            "DomainB".to_string(),
        ];
        ParticularsMatrix::new(domains)
            .with_row(SALES, vec![100000.0, 0.0, 200000.0])
            .with_row(DEFERRED_REVENUE, vec![0.0, 0.0, 0.0])
            .with_row(PURCHASE, vec![20000.0, 0.0, 50000.0])
    }

    fn assembled() -> ParticularsMatrix {
        let m = base();
        let gp = gross_profit(&m);
        let m = m
            .with_row(GROSS_PROFIT, gp)
            .with_row(SALARY, vec![10000.0, 2000.0, 30000.0])
            .with_row("Rent", vec![1000.0, 3000.0, 2000.0])
            .with_row("TNS Expenses", vec![500.0, 0.0, 500.0]);
        let np = net_profit(&m);
        m.with_row(NET_PROFIT, np)
    }

    #[test]
    fn gross_profit_scenario() {
        let gp = gross_profit(&base());
        assert_eq!(gp, vec![80000.0, 0.0, 150000.0]);
        let m = with_total_column(base().with_row(GROSS_PROFIT, gp), "Other Services");
        assert_eq!(m.value(GROSS_PROFIT, TOTAL), Some(230000.0));
    }

    #[test]
    fn net_profit_subtracts_whole_cost_block() {
        let m = assembled();
        let gp = m.row(GROSS_PROFIT).unwrap().values.clone();
        let start = m.row_index(SALARY).unwrap();
        let end = m.row_index(NET_PROFIT).unwrap();
        let np = &m.row(NET_PROFIT).unwrap().values;
        for col in 0..m.columns().len() {
            let costs: f64 = m.rows()[start..end].iter().map(|r| r.values[col]).sum();
            assert_eq!(np[col], gp[col] - costs);
        }
        assert_eq!(np, &vec![68500.0, -5000.0, 117500.0]);
    }

    #[test]
    fn total_sits_after_anchor_and_is_idempotent() {
        let m = with_total_column(assembled(), "Other Services");
        assert_eq!(m.columns(), &["DomainA", "Other Services", TOTAL, "DomainB"]);
        for row in m.rows() {
            assert_eq!(row.values[2], row.values[0] + row.values[1] + row.values[3]);
        }
        let again = with_total_column(m.clone(), "Other Services");
        assert_eq!(again, m);
    }

    #[test]
    fn total_appended_without_anchor() {
        let m = with_total_column(base(), "Missing Domain");
        assert_eq!(m.columns().last().map(String::as_str), Some(TOTAL));
    }

    #[test]
    fn net_profit_pct_guards_zero_sales() {
        let m = with_net_profit_pct(with_total_column(assembled(), "Other Services"));
        let pct = m.row(NET_PROFIT_PCT).unwrap();
        assert_eq!(pct.kind, RowKind::Percent);
        assert_eq!(pct.values[0], 68.5);
        // Other Services: no sales, net loss of 5000
        assert_eq!(pct.values[1], 0.0);
        assert_eq!(pct.values[2], 181000.0 * 100.0 / 300000.0);

        let again = with_net_profit_pct(m);
        let count = again.rows().iter().filter(|r| r.label == NET_PROFIT_PCT).count();
        assert_eq!(count, 1);
    }
}
