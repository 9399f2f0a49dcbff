//! CSV parsing for import files
//!
//! The first line is the header row. Header names are trimmed, cell values
//! are kept as written. Required columns are checked against the first data
//! row only; a file is assumed to be uniform.

use csv::ReaderBuilder;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::ImportRow;

const BOM: char = '\u{feff}';

/// CSV parse failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// First syntax error reported by the CSV reader
    #[error("CSV syntax error: {0}")]
    Syntax(String),

    #[error("The file contains no data rows")]
    Empty,

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Successfully parsed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<ImportRow>,
}

/// Parse `content` and check that the first row carries every required column
pub fn parse_csv(content: &str, required_columns: &[&str]) -> Result<ParsedCsv, ParseError> {
    let content = content.strip_prefix(BOM).unwrap_or(content);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::Syntax(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ParseError::Syntax(e.to_string()))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let fields: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        rows.push(ImportRow::new(rows.len(), fields));
    }

    let first = rows.first().ok_or(ParseError::Empty)?;
    let missing: Vec<String> = required_columns
        .iter()
        .filter(|column| !first.has_column(column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::MissingColumns(missing));
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "Parsed CSV file");

    Ok(ParsedCsv { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_COLUMNS: &[&str] = &["Title", "Content", "Date_entree"];

    #[test]
    fn test_parse_trims_headers_and_strips_bom() {
        let content = "\u{feff} Title ,Content, Date_entree\nArticle 5,\"Texte, avec virgule\",01/01/2020\n";
        let parsed = parse_csv(content, ARTICLE_COLUMNS).unwrap();

        assert_eq!(parsed.headers, vec!["Title", "Content", "Date_entree"]);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].get("Title"), "Article 5");
        assert_eq!(parsed.rows[0].get("Content"), "Texte, avec virgule");
        assert_eq!(parsed.rows[0].index, 0);
    }

    #[test]
    fn test_missing_columns_are_named() {
        let content = "Title,Content\nArticle 5,Texte\n";
        let err = parse_csv(content, ARTICLE_COLUMNS).unwrap_err();
        assert_eq!(err, ParseError::MissingColumns(vec!["Date_entree".to_string()]));
        assert_eq!(err.to_string(), "Missing required columns: Date_entree");
    }

    #[test]
    fn test_header_only_file_is_empty() {
        assert_eq!(parse_csv("Title,Content\n", &["Title"]), Err(ParseError::Empty));
        assert_eq!(parse_csv("", &["Title"]), Err(ParseError::Empty));
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let content = "Title,Content\nA,x\n,\nB,y\n";
        let parsed = parse_csv(content, &["Title", "Content"]).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].get("Title"), "B");
        assert_eq!(parsed.rows[1].index, 1);
    }

    #[test]
    fn test_ragged_row_is_a_syntax_error() {
        let content = "Title,Content\nA,x\nB,y,extra\n";
        let err = parse_csv(content, &["Title"]).unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }

    #[test]
    fn test_quoted_newlines_stay_in_cell() {
        let content = "Title,Content\nA,\"ligne 1\nligne 2\"\n";
        let parsed = parse_csv(content, &["Title", "Content"]).unwrap();
        assert_eq!(parsed.rows[0].get("Content"), "ligne 1\nligne 2");
    }
}
