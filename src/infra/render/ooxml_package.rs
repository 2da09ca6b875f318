// Shared plumbing for the Office Open XML writers: XML text escaping and
// writing a set of parts into a zip container.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::core::pipeline::RenderError;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Escape text for element content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab/newline are not allowed in XML 1.0.
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// An in-memory OOXML package. Parts are written in insertion order,
/// `[Content_Types].xml` first by convention.
#[derive(Default)]
pub struct OoxmlPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl OoxmlPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> &mut Self {
        self.parts.push((name.into(), content.into()));
        self
    }

    /// Write the package to `path`, replacing any existing file.
    ///
    /// Every entry carries the same fixed timestamp so equal content gives
    /// byte-identical files.
    pub fn write_to(&self, path: &Path) -> Result<(), RenderError> {
        let io_error = |e: std::io::Error| RenderError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let zip_error = |e: zip::result::ZipError| RenderError::Package {
            file: path.display().to_string(),
            reason: e.to_string(),
        };

        let file = File::create(path).map_err(io_error)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        for (name, content) in &self.parts {
            zip.start_file(name.as_str(), options).map_err(zip_error)?;
            zip.write_all(content).map_err(io_error)?;
        }

        zip.finish().map_err(zip_error)?;
        Ok(())
    }
}
