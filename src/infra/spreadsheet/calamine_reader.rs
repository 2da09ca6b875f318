use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use crate::core::gaps::{GapError, SpreadsheetReader};

/// Reads the first worksheet of an .xlsx/.xls/.ods workbook with calamine.
pub struct CalamineReader;

impl CalamineReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalamineReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Text form of a cell. Whole floats print without the trailing `.0`
/// so numeric ids and tiers read the way they were typed.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

impl SpreadsheetReader for CalamineReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, GapError> {
        let spreadsheet_error = |reason: String| GapError::Spreadsheet {
            file: path.display().to_string(),
            reason,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| spreadsheet_error("workbook has no worksheets".to_string()))?
            .map_err(|e| spreadsheet_error(e.to_string()))?;

        // calamine trims leading empty rows/columns; pad them back so row 1
        // and column C mean the same thing as in the sheet.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_text));
            rows.push(cells);
        }

        Ok(rows)
    }
}
