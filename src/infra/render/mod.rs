// Render infra layer.
// - `ooxml_package.rs` escapes text and zips package parts.
// - `docx_writer.rs` writes the narrative report.
// - `pptx_writer.rs` writes the executive deck.

use std::path::Path;

use crate::core::pipeline::{ArtifactRenderer, RenderError};
use crate::core::report::{ReportDocument, SlideDeck};

#[path = "ooxml_package.rs"]
pub mod ooxml_package;

#[path = "docx_writer.rs"]
pub mod docx_writer;

#[path = "pptx_writer.rs"]
pub mod pptx_writer;

/// Renders reports as Word and PowerPoint files.
#[derive(Debug, Default, Clone, Copy)]
pub struct OoxmlRenderer;

impl ArtifactRenderer for OoxmlRenderer {
    fn render_document(&self, document: &ReportDocument, path: &Path) -> Result<(), RenderError> {
        docx_writer::write_docx(document, path)
    }

    fn render_deck(&self, deck: &SlideDeck, path: &Path) -> Result<(), RenderError> {
        pptx_writer::write_pptx(deck, path)
    }
}
