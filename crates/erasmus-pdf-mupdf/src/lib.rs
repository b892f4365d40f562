use std::path::Path;

use mupdf::{Document, TextPageFlags};

use erasmus_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that non-PDF code paths do not transitively
/// depend on it.
///
/// Destination documents are wide landscape tables and MuPDF has no table
/// detector, so rows are reconstructed geometrically: extracted lines whose
/// vertical midpoints fall within `row_tolerance` points of each other belong
/// to one row, cells ordered left-to-right and joined with `" | "`. Per page,
/// reconstructed multi-cell rows come first, then the remaining single lines
/// in reading order.
pub struct MupdfExtractor {
    /// Maximum vertical midpoint distance (pt) for two lines to share a row.
    row_tolerance: f32,
}

impl Default for MupdfExtractor {
    fn default() -> Self {
        Self { row_tolerance: 3.0 }
    }
}

impl MupdfExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row grouping tolerance in points.
    pub fn with_row_tolerance(mut self, tolerance: f32) -> Self {
        self.row_tolerance = tolerance;
        self
    }
}

/// One extracted line with enough geometry to group rows.
#[derive(Debug, Clone)]
struct RawLine {
    x0: f32,
    y_mid: f32,
    text: String,
}

/// Collapse internal whitespace runs within a cell.
fn normalize_cell(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Group lines into baseline rows. Returns `(table_rows, running_text)`:
/// rows with two or more cells become pipe-joined table lines, single-cell
/// rows stay as running text. Both keep top-to-bottom order.
fn group_rows(mut lines: Vec<RawLine>, tolerance: f32) -> (Vec<String>, Vec<String>) {
    lines.sort_by(|a, b| {
        (a.y_mid, a.x0)
            .partial_cmp(&(b.y_mid, b.x0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut table_rows = Vec::new();
    let mut running = Vec::new();

    let mut group: Vec<RawLine> = Vec::new();
    for line in lines {
        if let Some(first) = group.first()
            && (line.y_mid - first.y_mid).abs() > tolerance
        {
            flush_group(&mut group, &mut table_rows, &mut running);
        }
        group.push(line);
    }
    flush_group(&mut group, &mut table_rows, &mut running);

    (table_rows, running)
}

fn flush_group(group: &mut Vec<RawLine>, table_rows: &mut Vec<String>, running: &mut Vec<String>) {
    if group.is_empty() {
        return;
    }
    if group.len() >= 2 {
        let cells: Vec<String> = group.iter().map(|l| normalize_cell(&l.text)).collect();
        table_rows.push(cells.join(" | "));
    } else {
        running.push(normalize_cell(&group[0].text));
    }
    group.clear();
}

impl PdfBackend for MupdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut out = String::new();

        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let mut raw_lines = Vec::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    let bounds = line.bounds();
                    let text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    if text.trim().is_empty() {
                        continue;
                    }
                    raw_lines.push(RawLine {
                        x0: bounds.x0,
                        y_mid: (bounds.y0 + bounds.y1) / 2.0,
                        text,
                    });
                }
            }

            let (table_rows, running) = group_rows(raw_lines, self.row_tolerance);
            for row in table_rows {
                out.push_str(&row);
                out.push('\n');
            }
            for line in running {
                out.push_str(&line);
                out.push('\n');
            }
        }

        Ok(out)
    }
}
