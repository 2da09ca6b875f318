// Gap extraction - turns gap spreadsheets into `GapEntry` lists.
//
// The actual spreadsheet parsing sits behind `SpreadsheetReader` so the row
// mapping rules can be tested with plain vectors.

use std::path::Path;
use thiserror::Error;

use super::gap_models::{FileRef, GapEntry, GapReport};

/// Zero-based column positions read from each data row (columns C..F).
const COL_PLATFORM: usize = 2;
const COL_TIER: usize = 3;
const COL_STATUS: usize = 4;
const COL_RECOMMENDATION: usize = 5;

/// Row 1 is the header.
const HEADER_ROWS: usize = 1;

#[derive(Debug, Error)]
pub enum GapError {
    #[error("File {0} was never downloaded")]
    NotDownloaded(String),

    #[error("Failed to read spreadsheet {file}: {reason}")]
    Spreadsheet { file: String, reason: String },
}

/// Port for reading the first worksheet of a spreadsheet as text cells.
///
/// Every row includes the header row; cells are already coerced to text.
pub trait SpreadsheetReader: Send + Sync {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, GapError>;
}

/// Extract gap entries from every gap-tagged file, in input order.
///
/// Files without a gap tag are ignored. A spreadsheet that cannot be read
/// fails the whole extraction.
pub fn extract_gaps<R>(files: &[FileRef], reader: &R) -> Result<GapReport, GapError>
where
    R: SpreadsheetReader + ?Sized,
{
    let mut report = GapReport::default();

    for file in files {
        let Some(category) = file.file_type.gap_category() else {
            continue;
        };

        let path = file
            .local_path
            .as_deref()
            .ok_or_else(|| GapError::NotDownloaded(file.file_name.clone()))?;

        let rows = reader.read_rows(path)?;
        let before = report.len();
        for row in rows.iter().skip(HEADER_ROWS) {
            report.push(category, entry_from_row(row));
        }

        tracing::debug!(
            file_name = %file.file_name,
            file_type = %file.file_type,
            rows = report.len() - before,
            "Extracted gap rows"
        );
    }

    Ok(report)
}

/// Map one data row to an entry. Short rows read as empty cells.
pub fn entry_from_row(row: &[String]) -> GapEntry {
    let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();

    GapEntry {
        platform: cell(COL_PLATFORM),
        tier: cell(COL_TIER),
        status: cell(COL_STATUS),
        recommendation: cell(COL_RECOMMENDATION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gaps::gap_models::FileType;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Serves canned rows keyed by path.
    struct MockReader {
        sheets: HashMap<PathBuf, Vec<Vec<String>>>,
    }

    impl SpreadsheetReader for MockReader {
        fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, GapError> {
            self.sheets
                .get(path)
                .cloned()
                .ok_or_else(|| GapError::Spreadsheet {
                    file: path.display().to_string(),
                    reason: "not a workbook".to_string(),
                })
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn downloaded(name: &str, file_type: FileType) -> FileRef {
        let mut file = FileRef::new(name, Some(format!("http://host/{name}")), file_type);
        file.local_path = Some(PathBuf::from(format!("/tmp/{name}")));
        file
    }

    fn header() -> Vec<String> {
        row(&["Id", "Domain", "Platform", "Tier", "Status", "Recommendation"])
    }

    #[test]
    fn test_rows_go_to_the_list_of_their_file_type() {
        let mut sheets = HashMap::new();
        sheets.insert(
            PathBuf::from("/tmp/hw.xlsx"),
            vec![
                header(),
                row(&["1", "Compute", "Server", "Tier1", "Obsolete", "Replace"]),
                row(&["2", "Storage", "SAN", "Tier2", "Active", ""]),
            ],
        );
        sheets.insert(
            PathBuf::from("/tmp/sw.xlsx"),
            vec![header(), row(&["1", "Apps", "CRM", "Tier2", "Active", "Upgrade"])],
        );
        let reader = MockReader { sheets };

        let files = vec![
            downloaded("hw.xlsx", FileType::HardwareGap),
            downloaded("sw.xlsx", FileType::SoftwareGap),
        ];
        let report = extract_gaps(&files, &reader).unwrap();

        assert_eq!(report.hardware.len(), 2);
        assert_eq!(report.software.len(), 1);
        assert_eq!(report.hardware[0].platform, "Server");
        assert_eq!(report.hardware[1].platform, "SAN");
        assert_eq!(report.software[0].recommendation, "Upgrade");
    }

    #[test]
    fn test_non_gap_files_are_never_opened() {
        let reader = MockReader {
            sheets: HashMap::new(),
        };
        let files = vec![downloaded("contract.pdf", FileType::Other("legal".to_string()))];

        let report = extract_gaps(&files, &reader).unwrap();
        assert_eq!(report.len(), 0);
    }

    #[test]
    fn test_unreadable_gap_file_is_fatal() {
        let reader = MockReader {
            sheets: HashMap::new(),
        };
        let files = vec![downloaded("broken.xlsx", FileType::SoftwareGap)];

        let err = extract_gaps(&files, &reader).unwrap_err();
        assert!(matches!(err, GapError::Spreadsheet { .. }));
    }

    #[test]
    fn test_short_row_defaults_missing_cells() {
        let entry = entry_from_row(&row(&["1", "Compute", "Server", "Tier1", "Active"]));
        assert_eq!(entry.status, "Active");
        assert_eq!(entry.recommendation, "");
    }

    #[test]
    fn test_header_only_sheet_yields_nothing() {
        let mut sheets = HashMap::new();
        sheets.insert(PathBuf::from("/tmp/hw.xlsx"), vec![header()]);
        let reader = MockReader { sheets };

        let files = [downloaded("hw.xlsx", FileType::HardwareGap)];
        let report = extract_gaps(&files, &reader).unwrap();
        assert!(report.is_empty());
    }
}
