//! # Document Text Extraction
//!
//! Turns an uploaded statement file into plain text that can be handed to the
//! model. The layout of the text does not need to be pretty; it only has to keep
//! each transaction's fields close together.

use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Reader};
use quick_xml::events::Event;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Could not read {format} document: {message}")]
    Unreadable { format: DocumentFormat, message: String },
    #[error("No text could be extracted from the document")]
    NoText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Spreadsheet,
    Csv,
    WordDocument,
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Spreadsheet => "spreadsheet",
            DocumentFormat::Csv => "CSV",
            DocumentFormat::WordDocument => "Word",
        };
        f.write_str(name)
    }
}

impl DocumentFormat {
    /// Pick the format from the file extension, case-insensitively
    pub fn from_file_name(file_name: &str) -> Result<Self, ExtractionError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(DocumentFormat::Spreadsheet),
            "csv" => Ok(DocumentFormat::Csv),
            "docx" => Ok(DocumentFormat::WordDocument),
            "" => Err(ExtractionError::UnsupportedFormat("(none)".to_string())),
            other => Err(ExtractionError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// Extract text from raw file bytes. CPU bound; call from a blocking thread.
pub fn extract_text(format: DocumentFormat, bytes: &[u8]) -> Result<String, ExtractionError> {
    let unreadable = |message: String| ExtractionError::Unreadable { format, message };

    let text = match format {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes).map_err(|e| unreadable(e.to_string()))?,
        DocumentFormat::Spreadsheet => spreadsheet_text(bytes).map_err(unreadable)?,
        DocumentFormat::Csv => csv_text(bytes).map_err(unreadable)?,
        DocumentFormat::WordDocument => docx_text(bytes).map_err(unreadable)?,
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }
    Ok(text)
}

/// First worksheet, one line per row, cells separated by tabs
fn spreadsheet_text(bytes: &[u8]) -> Result<String, String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| format!("open workbook: {e}"))?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "workbook has no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| format!("read sheet {first_sheet}: {e}"))?;

    let mut text = String::new();
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(|cell| cell.to_string().trim().to_string()).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        text.push_str(&cells.join("\t"));
        text.push('\n');
    }
    Ok(text)
}

fn csv_text(bytes: &[u8]) -> Result<String, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut text = String::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        let fields: Vec<&str> = record.iter().map(str::trim).collect();
        text.push_str(&fields.join("\t"));
        text.push('\n');
    }
    Ok(text)
}

/// Walk `word/document.xml`: paragraphs become lines, table rows become
/// lines of tab-separated cells
fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("open archive: {e}"))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing document body: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("read document body: {e}"))?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;
    let mut cell_depth = 0usize;
    let mut row_has_cells = false;

    loop {
        match reader.read_event().map_err(|e| format!("parse document body: {e}"))? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = true,
                b"w:tc" => {
                    if row_has_cells {
                        text.push('\t');
                    }
                    row_has_cells = true;
                    cell_depth += 1;
                }
                b"w:tr" => row_has_cells = false,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" if cell_depth == 0 => text.push('\n'),
                b"w:br" => text.push(' '),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                let unescaped = t.unescape().map_err(|e| format!("decode text: {e}"))?;
                text.push_str(&unescaped);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                // Paragraphs inside a cell stay on the row's line
                b"w:p" if cell_depth > 0 => text.push(' '),
                b"w:p" => text.push('\n'),
                b"w:tc" => cell_depth = cell_depth.saturating_sub(1),
                b"w:tr" => text.push('\n'),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
