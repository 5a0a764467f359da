use thiserror::Error;

/// User-facing import failures, reported at the granularity of one file /
/// one channel. A failed import never touches other already-imported
/// channels.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("insufficient data: the file needs a header row and at least one data row")]
    InsufficientData,

    #[error("unsupported file type: {0} (expected csv, tsv, txt, xls or xlsx)")]
    UnsupportedFileType(String),

    #[error("unrecognized format for {platform}: could not find a spend or impressions column")]
    UnrecognizedFormat { platform: &'static str },

    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
}
