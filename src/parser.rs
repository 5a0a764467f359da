use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::columns::{candidates, MetricKey};
use crate::error::ImportError;
use crate::models::Platform;

/// Declared input format; the caller derives it from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Delimited,
    Spreadsheet,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Result<FileFormat, ImportError> {
        match ext.to_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Ok(FileFormat::Delimited),
            "xls" | "xlsx" | "xlsb" | "ods" => Ok(FileFormat::Spreadsheet),
            other => Err(ImportError::UnsupportedFileType(other.to_string())),
        }
    }
}

/// A parsed export: one header row plus data rows aligned by position.
/// Missing trailing cells are padded with empty strings.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Cells containing any of these score a line as header-like.
const HEADER_KEYWORDS: [&str; 13] = [
    "campaign", "clicks", "impr", "impressions", "cost", "spend", "conversions", "conv", "ctr",
    "cpc", "cpm", "revenue", "results",
];

/// How many leading non-empty lines are scanned for the header row.
const HEADER_SCAN_LIMIT: usize = 20;

/// Bonus per exact hit on the platform's own canonical column names; set
/// high enough that a single platform hit beats any generic keyword score.
const PLATFORM_HEADER_BONUS: usize = 20;

pub fn parse_table(
    bytes: &[u8],
    format: FileFormat,
    platform: Platform,
) -> Result<ParsedTable, ImportError> {
    match format {
        FileFormat::Delimited => parse_delimited(bytes),
        FileFormat::Spreadsheet => parse_spreadsheet(bytes, platform),
    }
}

/// Pick whichever candidate delimiter splits a sampled line into the most
/// fields, sampling the same leading window the header scorer scans so a
/// title or date-range preamble cannot mask the real delimiter. Ties keep
/// the earlier candidate (comma first).
fn detect_delimiter(text: &str) -> u8 {
    let mut best = b',';
    let mut best_fields = 0usize;
    for &delim in &DELIMITER_CANDIDATES {
        let fields = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(HEADER_SCAN_LIMIT)
            .map(|line| line.split(delim as char).count())
            .max()
            .unwrap_or(0);
        if fields > best_fields {
            best_fields = fields;
            best = delim;
        }
    }
    best
}

/// Count of cells whose lowercased text contains a known metric keyword.
fn keyword_score(cells: &[String]) -> usize {
    cells
        .iter()
        .filter(|cell| {
            let lowered = cell.trim().to_lowercase();
            !lowered.is_empty() && HEADER_KEYWORDS.iter().any(|kw| lowered.contains(kw))
        })
        .count()
}

/// Extra weight when a row carries the platform's own canonical names for
/// campaign, spend, or impressions. Lets a platform-specific header beat a
/// generic-looking preamble row above it.
fn platform_bonus(cells: &[String], platform: Platform) -> usize {
    let lowered: Vec<String> = cells.iter().map(|c| c.trim().to_lowercase()).collect();
    let mut bonus = 0;
    for metric in [MetricKey::Campaign, MetricKey::Spend, MetricKey::Impressions] {
        let hit = candidates(platform, metric)
            .iter()
            .any(|candidate| lowered.iter().any(|cell| cell == candidate));
        if hit {
            bonus += PLATFORM_HEADER_BONUS;
        }
    }
    bonus
}

/// Index of the best-scoring candidate row among the first
/// `HEADER_SCAN_LIMIT` non-empty rows. Ties keep the lowest index.
fn find_header_row<F>(rows: &[Vec<String>], score: F) -> usize
where
    F: Fn(&[String]) -> usize,
{
    let mut best_index = 0;
    let mut best_score = 0;
    for (index, row) in rows.iter().take(HEADER_SCAN_LIMIT).enumerate() {
        let row_score = score(row);
        if row_score > best_score {
            best_score = row_score;
            best_index = index;
        }
    }
    best_index
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Align a row to the header width: pad missing trailing cells, drop extras.
fn align_row(mut row: Vec<String>, width: usize) -> Vec<String> {
    row.resize(width, String::new());
    row
}

fn parse_delimited(bytes: &[u8]) -> Result<ParsedTable, ImportError> {
    let text = String::from_utf8_lossy(bytes);
    if !text.lines().any(|line| !line.trim().is_empty()) {
        return Err(ImportError::InsufficientData);
    }
    let delimiter = detect_delimiter(&text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        if !is_blank(&cells) {
            records.push(cells);
        }
    }

    build_table(records, keyword_score)
}

fn parse_spreadsheet(bytes: &[u8], platform: Platform) -> Result<ParsedTable, ImportError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first_sheet = sheet_names.first().ok_or(ImportError::InsufficientData)?;
    let range = workbook
        .worksheet_range(first_sheet)
        .map_err(calamine::Error::from)?;

    let mut records: Vec<Vec<String>> = Vec::new();
    for row in range.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Data::String(s) => s.trim().to_string(),
                Data::Empty => String::new(),
                other => other.to_string(),
            })
            .collect();
        if !is_blank(&cells) {
            records.push(cells);
        }
    }

    build_table(records, |row| keyword_score(row) + platform_bonus(row, platform))
}

fn build_table<F>(records: Vec<Vec<String>>, score: F) -> Result<ParsedTable, ImportError>
where
    F: Fn(&[String]) -> usize,
{
    if records.len() < 2 {
        return Err(ImportError::InsufficientData);
    }

    let header_index = find_header_row(&records, score);
    let headers = records[header_index].clone();
    let width = headers.len();
    let rows: Vec<Vec<String>> = records
        .into_iter()
        .skip(header_index + 1)
        .map(|row| align_row(row, width))
        .collect();

    if rows.is_empty() {
        return Err(ImportError::InsufficientData);
    }

    Ok(ParsedTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_comma_tab_semicolon_pipe() {
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter("a\tb\tc\td"), b'\t');
        assert_eq!(detect_delimiter("a;b;c;d"), b';');
        assert_eq!(detect_delimiter("a|b|c|d"), b'|');
    }

    #[test]
    fn parses_simple_csv() {
        let data = b"Campaign,Cost,Impressions\nSummer,100,1000\nWinter,200,2000\n";
        let table = parse_table(data, FileFormat::Delimited, Platform::Google).unwrap();
        assert_eq!(table.headers, cells(&["Campaign", "Cost", "Impressions"]));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], cells(&["Summer", "100", "1000"]));
    }

    #[test]
    fn quoted_field_may_contain_delimiter() {
        let data = b"Campaign,Cost\n\"Spring, Launch\",50\n";
        let table = parse_table(data, FileFormat::Delimited, Platform::Google).unwrap();
        assert_eq!(table.rows[0][0], "Spring, Launch");
    }

    #[test]
    fn header_row_may_not_be_first_line() {
        let data = b"Google Ads report\nJan 1 - Jan 31\nCampaign,Cost,Impressions,Clicks\nBrand,10,100,5\n";
        let table = parse_table(data, FileFormat::Delimited, Platform::Google).unwrap();
        assert_eq!(
            table.headers,
            cells(&["Campaign", "Cost", "Impressions", "Clicks"])
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "Brand");
    }

    #[test]
    fn missing_trailing_cells_become_empty() {
        let data = b"Campaign,Cost,Impressions\nShort,5\n";
        let table = parse_table(data, FileFormat::Delimited, Platform::Google).unwrap();
        assert_eq!(table.rows[0], cells(&["Short", "5", ""]));
    }

    #[test]
    fn fewer_than_two_lines_is_insufficient() {
        let err = parse_table(b"Campaign,Cost\n", FileFormat::Delimited, Platform::Google)
            .unwrap_err();
        assert!(matches!(err, ImportError::InsufficientData));

        let err = parse_table(b"", FileFormat::Delimited, Platform::Google).unwrap_err();
        assert!(matches!(err, ImportError::InsufficientData));
    }

    #[test]
    fn preamble_does_not_mask_the_delimiter() {
        // The first non-empty lines carry no tabs; only the header and data
        // rows do. Tab must still win over the comma default.
        let data =
            b"Google Ads report\nJan 1 - Jan 31\nCampaign\tCost\tImpressions\nBrand\t10\t100\n";
        let table = parse_table(data, FileFormat::Delimited, Platform::Google).unwrap();
        assert_eq!(table.headers, cells(&["Campaign", "Cost", "Impressions"]));
        assert_eq!(table.rows, vec![cells(&["Brand", "10", "100"])]);
    }

    #[test]
    fn tab_delimited_export_parses() {
        let data = b"Campaign\tCost\tClicks\nBrand\t10\t3\n";
        let table = parse_table(data, FileFormat::Delimited, Platform::Google).unwrap();
        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.rows[0][2], "3");
    }

    #[test]
    fn keyword_score_counts_cells_once() {
        // "Cost (USD)" hits "cost"; "CTR" hits "ctr"; "Name" hits nothing.
        let score = keyword_score(&cells(&["Cost (USD)", "CTR", "Name"]));
        assert_eq!(score, 2);
    }

    #[test]
    fn platform_bonus_outweighs_generic_keywords() {
        // A preamble row stuffed with generic keywords still loses to the
        // platform's own header names.
        let generic = cells(&[
            "campaign results", "clicks report", "cost summary", "spend overview",
        ]);
        let meta_header = cells(&["Campaign name", "Amount spent (USD)", "Impressions"]);
        let score =
            |row: &[String]| keyword_score(row) + platform_bonus(row, Platform::Meta);
        assert!(score(&meta_header) > score(&generic));
    }

    #[test]
    fn ties_keep_the_first_candidate_row() {
        let rows = vec![cells(&["Campaign", "Cost"]), cells(&["Campaign", "Spend"])];
        assert_eq!(find_header_row(&rows, keyword_score), 0);
    }

    #[test]
    fn file_format_from_extension() {
        assert!(matches!(
            FileFormat::from_extension("CSV"),
            Ok(FileFormat::Delimited)
        ));
        assert!(matches!(
            FileFormat::from_extension("xlsx"),
            Ok(FileFormat::Spreadsheet)
        ));
        assert!(matches!(
            FileFormat::from_extension("pdf"),
            Err(ImportError::UnsupportedFileType(_))
        ));
    }
}
