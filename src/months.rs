// Month handling: fiscal months, fiscal years and the canonical `Mon-YY`
// label every sheet's month representation is reduced to.
use crate::error::{ReportError, Result};
use crate::loader::Cell;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Calendar months in fiscal order, April first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FiscalMonth {
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
    January,
    February,
    March,
}

impl FiscalMonth {
    pub const ALL: [FiscalMonth; 12] = [
        FiscalMonth::April,
        FiscalMonth::May,
        FiscalMonth::June,
        FiscalMonth::July,
        FiscalMonth::August,
        FiscalMonth::September,
        FiscalMonth::October,
        FiscalMonth::November,
        FiscalMonth::December,
        FiscalMonth::January,
        FiscalMonth::February,
        FiscalMonth::March,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FiscalMonth::April => "April",
            FiscalMonth::May => "May",
            FiscalMonth::June => "June",
            FiscalMonth::July => "July",
            FiscalMonth::August => "August",
            FiscalMonth::September => "September",
            FiscalMonth::October => "October",
            FiscalMonth::November => "November",
            FiscalMonth::December => "December",
            FiscalMonth::January => "January",
            FiscalMonth::February => "February",
            FiscalMonth::March => "March",
        }
    }

    pub fn abbr(self) -> &'static str {
        &self.name()[..3]
    }

    /// Position within the fiscal year, April = 0.
    pub fn fiscal_index(self) -> usize {
        self as usize
    }

    /// Accepts full names and 3-letter abbreviations, any case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|m| {
            m.name().eq_ignore_ascii_case(name) || m.abbr().eq_ignore_ascii_case(name)
        })
    }

    /// April..December fall in the first calendar year of the fiscal year.
    pub fn in_first_year(self) -> bool {
        self.fiscal_index() < 9
    }
}

impl fmt::Display for FiscalMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical `Mon-YY` label, e.g. `Apr-25`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MonthLabel(String);

impl MonthLabel {
    pub fn from_date(date: NaiveDate) -> Self {
        MonthLabel(date.format("%b-%y").to_string())
    }
}

impl fmt::Display for MonthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// April-to-March accounting year identified by its starting calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FiscalYear {
    start_year: i32,
}

impl FiscalYear {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// Parses `2025-26` (also `2025-2026`).
    pub fn parse(s: &str) -> Option<Self> {
        let (start, end) = s.trim().split_once('-')?;
        let start: i32 = start.trim().parse().ok()?;
        let end: i32 = end.trim().parse().ok()?;
        let expected = start + 1;
        if end == expected || end == expected % 100 {
            Some(Self::new(start))
        } else {
            None
        }
    }

    /// `2025-26`
    pub fn label(self) -> String {
        format!("{}-{:02}", self.start_year, (self.start_year + 1).rem_euclid(100))
    }

    /// `25-26`, the suffix used in per-year sheet names.
    pub fn sheet_suffix(self) -> String {
        format!(
            "{:02}-{:02}",
            self.start_year.rem_euclid(100),
            (self.start_year + 1).rem_euclid(100)
        )
    }

    pub fn calendar_year(self, month: FiscalMonth) -> i32 {
        if month.in_first_year() {
            self.start_year
        } else {
            self.start_year + 1
        }
    }

    pub fn label_for(self, month: FiscalMonth) -> MonthLabel {
        MonthLabel(format!(
            "{}-{:02}",
            month.abbr(),
            self.calendar_year(month).rem_euclid(100)
        ))
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// What the user picked: the whole fiscal year or one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Window {
    FullYear,
    Month(FiscalMonth),
}

impl Window {
    /// `All` or a month name.
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(Window::FullYear);
        }
        FiscalMonth::from_name(s).map(Window::Month)
    }

    /// Selector entries in display order: `All`, then April..March.
    pub fn options() -> Vec<Window> {
        std::iter::once(Window::FullYear)
            .chain(FiscalMonth::ALL.into_iter().map(Window::Month))
            .collect()
    }

    pub fn resolve(self, fy: FiscalYear) -> ResolvedWindow {
        let months: Vec<FiscalMonth> = match self {
            Window::FullYear => FiscalMonth::ALL.to_vec(),
            Window::Month(m) => vec![m],
        };
        ResolvedWindow {
            fiscal_year: fy,
            labels: months.iter().map(|m| fy.label_for(*m)).collect(),
            months,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::FullYear => f.write_str("All"),
            Window::Month(m) => f.write_str(m.name()),
        }
    }
}

/// A window pinned to one fiscal year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub fiscal_year: FiscalYear,
    pub months: Vec<FiscalMonth>,
    pub labels: Vec<MonthLabel>,
}

impl ResolvedWindow {
    pub fn contains(&self, label: &MonthLabel) -> bool {
        self.labels.contains(label)
    }

    /// `Apr-25 to Mar-26`, or the single label.
    pub fn describe(&self) -> String {
        match (self.labels.first(), self.labels.last()) {
            (Some(first), Some(last)) if first != last => format!("{} to {}", first, last),
            (Some(first), _) => first.to_string(),
            _ => String::new(),
        }
    }
}

// Tried in order after the strict day-month-year form. Slash dates are read
// month first, day first only when that fails.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d.%m.%Y",
];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d-%m-%Y %H:%M:%S"];
// Month-year strings, parsed with a day prepended.
const MONTH_FORMATS: &[&str] = &[
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %b %y",
    "%d %B %Y",
    "%d-%B-%Y",
    "%d-%Y-%m",
];

fn parse_text_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d-%m-%Y") {
        return Some(d);
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    let prefixed = format!("01-{}", s);
    let spaced = format!("01 {}", s);
    for fmt in MONTH_FORMATS {
        let candidate = if fmt.starts_with("%d ") { &spaced } else { &prefixed };
        if let Ok(d) = NaiveDate::parse_from_str(candidate, fmt) {
            return Some(d);
        }
    }
    None
}

/// The date a cell stands for, if it is date-like at all.
pub fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(dt) => Some(dt.date()),
        Cell::Text(s) => parse_text_date(s),
        _ => None,
    }
}

/// Reduce a date-like cell to its `Mon-YY` label.
pub fn canonical_month(cell: &Cell) -> Result<MonthLabel> {
    cell_date(cell)
        .map(MonthLabel::from_date)
        .ok_or_else(|| ReportError::UnparseableMonth(cell.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn fiscal_split_of_selected_month() {
        let fy = FiscalYear::parse("2025-26").unwrap();
        assert_eq!(fy.label_for(FiscalMonth::April).to_string(), "Apr-25");
        assert_eq!(fy.label_for(FiscalMonth::December).to_string(), "Dec-25");
        assert_eq!(fy.label_for(FiscalMonth::January).to_string(), "Jan-26");
        assert_eq!(
            FiscalYear::new(2024).label_for(FiscalMonth::March).to_string(),
            "Mar-25"
        );
    }

    #[test]
    fn fiscal_year_has_twelve_distinct_labels() {
        let fy = FiscalYear::new(2025);
        let labels: Vec<MonthLabel> = FiscalMonth::ALL.iter().map(|m| fy.label_for(*m)).collect();
        assert_eq!(labels.len(), 12);
        assert_eq!(labels[0].to_string(), "Apr-25");
        assert_eq!(labels[11].to_string(), "Mar-26");
        let mut dedup = labels.clone();
        dedup.dedup();
        assert_eq!(dedup.len(), 12);
    }

    #[test]
    fn fiscal_year_naming() {
        let fy = FiscalYear::new(2024);
        assert_eq!(fy.label(), "2024-25");
        assert_eq!(fy.sheet_suffix(), "24-25");
        assert_eq!(FiscalYear::parse("2024-2025"), Some(fy));
        assert_eq!(FiscalYear::parse("2024-27"), None);
    }

    #[test]
    fn month_names_and_numbers() {
        assert_eq!(FiscalMonth::from_name("january"), Some(FiscalMonth::January));
        assert_eq!(FiscalMonth::from_name("Sep"), Some(FiscalMonth::September));
        assert_eq!(FiscalMonth::from_name("Smarch"), None);
    }

    #[test]
    fn strict_day_month_year_first() {
        // 01-05-2025 is May, not January 5th.
        assert_eq!(canonical_month(&text("01-05-2025")).unwrap().to_string(), "May-25");
    }

    #[test]
    fn general_formats_accepted() {
        assert_eq!(canonical_month(&text("2025-04-01")).unwrap().to_string(), "Apr-25");
        assert_eq!(
            canonical_month(&text("2026-02-01 00:00:00")).unwrap().to_string(),
            "Feb-26"
        );
        assert_eq!(canonical_month(&text("Apr-25")).unwrap().to_string(), "Apr-25");
        assert_eq!(canonical_month(&text("March 2026")).unwrap().to_string(), "Mar-26");
        assert_eq!(canonical_month(&text("April 2025")).unwrap().to_string(), "Apr-25");
        assert_eq!(canonical_month(&text("April-2025")).unwrap().to_string(), "Apr-25");
    }

    #[test]
    fn slash_dates_read_month_first() {
        assert_eq!(canonical_month(&text("2025/04/01")).unwrap().to_string(), "Apr-25");
        assert_eq!(canonical_month(&text("4/1/2025")).unwrap().to_string(), "Apr-25");
        // no 13th month, so this one can only be day first
        assert_eq!(canonical_month(&text("13/04/2025")).unwrap().to_string(), "Apr-25");
    }

    #[test]
    fn date_cells_format_directly() {
        let dt = NaiveDate::from_ymd_opt(2024, 11, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(canonical_month(&Cell::Date(dt)).unwrap().to_string(), "Nov-24");
    }

    #[test]
    fn unparseable_month_is_reported() {
        let cell = text("Q1 total");
        assert!(matches!(
            canonical_month(&cell),
            Err(ReportError::UnparseableMonth(s)) if s == "Q1 total"
        ));
    }

    #[test]
    fn window_resolves_per_fiscal_year() {
        let w = Window::parse("February").unwrap();
        assert_eq!(w.resolve(FiscalYear::new(2025)).labels[0].to_string(), "Feb-26");
        assert_eq!(w.resolve(FiscalYear::new(2024)).labels[0].to_string(), "Feb-25");
        let all = Window::parse("All").unwrap().resolve(FiscalYear::new(2025));
        assert_eq!(all.months.len(), 12);
        assert_eq!(all.describe(), "Apr-25 to Mar-26");
        assert_eq!(Window::options().len(), 13);
    }
}
