use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),

    #[error("sheet '{sheet}' could not be read: {reason}")]
    UnreadableSheet { sheet: String, reason: String },

    #[error("column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    #[error("sheet '{sheet}' row {row} column {column}: '{value}' is not a number")]
    UnparseableNumeric {
        sheet: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("'{0}' is not a recognizable month")]
    UnparseableMonth(String),

    #[error("cannot build report, sheet '{sheet}' failed to load: {reason}")]
    FatalLoad { sheet: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
