// Domain models for the gap analysis.
//
// These types are shared by every stage of the pipeline: the HTTP layer
// deserializes `FileRef`s from the request, the extractor produces
// `GapEntry`s, and the coordinator serializes `FileRef`s into the completion
// payload. Nothing here knows about spreadsheets, Drive, or HTTP.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Component, Path, PathBuf};

// ============================================================================
// FILE REFERENCES
// ============================================================================

/// True when `name` is exactly one ordinary path component: not empty, not
/// `.` or `..`, not absolute, and free of `/` and `\`.
pub fn is_plain_file_name(name: &str) -> bool {
    if name.contains(|c: char| c == '/' || c == '\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Tag that tells the pipeline what a file is.
///
/// Unknown tags are preserved so they can be sent back downstream untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    /// Hardware gap spreadsheet.
    HardwareGap,
    /// Software gap spreadsheet.
    SoftwareGap,
    /// Generated narrative report.
    ReportDocument,
    /// Generated executive slide deck.
    ReportDeck,
    Other(String),
}

impl FileType {
    pub fn as_str(&self) -> &str {
        match self {
            FileType::HardwareGap => "gap_hw",
            FileType::SoftwareGap => "gap_sw",
            FileType::ReportDocument => "docx_target_gap",
            FileType::ReportDeck => "pptx_target_gap",
            FileType::Other(tag) => tag,
        }
    }

    /// Which gap list rows from this file belong to, if any.
    pub fn gap_category(&self) -> Option<GapCategory> {
        match self {
            FileType::HardwareGap => Some(GapCategory::Hardware),
            FileType::SoftwareGap => Some(GapCategory::Software),
            _ => None,
        }
    }
}

impl From<&str> for FileType {
    fn from(tag: &str) -> Self {
        match tag {
            "gap_hw" => FileType::HardwareGap,
            "gap_sw" => FileType::SoftwareGap,
            "docx_target_gap" => FileType::ReportDocument,
            "pptx_target_gap" => FileType::ReportDeck,
            other => FileType::Other(other.to_string()),
        }
    }
}

/// Entries that omit `file_type` are carried as an empty unknown tag.
impl Default for FileType {
    fn default() -> Self {
        FileType::Other(String::new())
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(FileType::from(tag.as_str()))
    }
}

/// A file travelling through the pipeline.
///
/// Lifecycle: created by the caller, `local_path` is set after download,
/// `file_url` is replaced by the Drive URL (or `None`) after upload.
///
/// Missing fields parse as empty so one bad entry is dropped at fetch time
/// instead of rejecting the whole request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: FileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl FileRef {
    pub fn new(
        file_name: impl Into<String>,
        file_url: Option<String>,
        file_type: FileType,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_url,
            file_type,
            local_path: None,
        }
    }

    /// Returns the download URL when one is present and non-blank.
    pub fn download_url(&self) -> Option<&str> {
        self.file_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

// ============================================================================
// GAP ENTRIES
// ============================================================================

/// The two kinds of gap spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapCategory {
    Hardware,
    Software,
}

/// Severity given to entries whose status mentions "obsolete".
pub const SEVERITY_OBSOLETE: u8 = 5;
/// Severity for everything else.
pub const SEVERITY_DEFAULT: u8 = 2;

/// One spreadsheet row of infrastructure-comparison data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapEntry {
    pub platform: String,
    pub tier: String,
    pub status: String,
    pub recommendation: String,
}

impl GapEntry {
    pub fn new(
        platform: impl Into<String>,
        tier: impl Into<String>,
        status: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            tier: tier.into(),
            status: status.into(),
            recommendation: recommendation.into(),
        }
    }

    /// True when the status contains "obsolete", ignoring case.
    pub fn is_obsolete(&self) -> bool {
        self.status.to_lowercase().contains("obsolete")
    }

    pub fn severity(&self) -> u8 {
        if self.is_obsolete() {
            SEVERITY_OBSOLETE
        } else {
            SEVERITY_DEFAULT
        }
    }

    pub fn has_recommendation(&self) -> bool {
        !self.recommendation.is_empty()
    }
}

/// Extracted entries, split by category and kept in spreadsheet order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapReport {
    pub hardware: Vec<GapEntry>,
    pub software: Vec<GapEntry>,
}

impl GapReport {
    pub fn push(&mut self, category: GapCategory, entry: GapEntry) {
        match category {
            GapCategory::Hardware => self.hardware.push(entry),
            GapCategory::Software => self.software.push(entry),
        }
    }

    /// Hardware entries followed by software entries.
    pub fn all_entries(&self) -> impl Iterator<Item = &GapEntry> {
        self.hardware.iter().chain(self.software.iter())
    }

    pub fn len(&self) -> usize {
        self.hardware.len() + self.software.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
