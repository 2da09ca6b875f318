use std::fmt::Write as _;
use std::path::Path;

use crate::core::pipeline::RenderError;
use crate::core::report::{DocumentBlock, ReportDocument, TableBlock};

use super::ooxml_package::{escape_xml, OoxmlPackage, XML_DECLARATION};

const CONTENT_TYPES: &str = include_str!("templates/docx_content_types.xml");
const ROOT_RELS: &str = include_str!("templates/docx_root_rels.xml");
const DOCUMENT_RELS: &str = include_str!("templates/docx_document_rels.xml");
const STYLES: &str = include_str!("templates/docx_styles.xml");

/// Column width in twentieths of a point; five columns fill a 6.5" text area.
const TABLE_COLUMN_WIDTH: u32 = 1872;

fn run(text: &str, bold: bool) -> String {
    let rpr = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    format!(
        r#"<w:r>{}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        rpr,
        escape_xml(text)
    )
}

fn styled_paragraph(style: Option<&str>, text: &str) -> String {
    let ppr = style
        .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, s))
        .unwrap_or_default();
    format!("<w:p>{}{}</w:p>", ppr, run(text, false))
}

fn table_row(cells: &[String], bold: bool) -> String {
    let mut xml = String::from("<w:tr>");
    for cell in cells {
        let _ = write!(
            xml,
            r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/></w:tcPr><w:p>{}</w:p></w:tc>"#,
            TABLE_COLUMN_WIDTH,
            run(cell, bold)
        );
    }
    xml.push_str("</w:tr>");
    xml
}

fn table(block: &TableBlock) -> String {
    let mut xml = String::from(
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid>"#,
    );
    for _ in &block.header {
        let _ = write!(xml, r#"<w:gridCol w:w="{}"/>"#, TABLE_COLUMN_WIDTH);
    }
    xml.push_str("</w:tblGrid>");
    xml.push_str(&table_row(&block.header, true));
    for row in &block.rows {
        xml.push_str(&table_row(row, false));
    }
    xml.push_str("</w:tbl>");
    xml
}

/// `word/document.xml` for a report.
pub fn document_xml(document: &ReportDocument) -> String {
    let mut body = String::new();
    for block in &document.blocks {
        let xml = match block {
            DocumentBlock::Title(text) => styled_paragraph(Some("Title"), text),
            DocumentBlock::Heading { level, text } => {
                styled_paragraph(Some(&format!("Heading{}", level)), text)
            }
            DocumentBlock::Paragraph(text) => styled_paragraph(None, text),
            DocumentBlock::Table(t) => table(t),
        };
        body.push_str(&xml);
    }

    format!(
        r#"{}<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#,
        XML_DECLARATION, body
    )
}

/// Write a report as a .docx file.
pub fn write_docx(document: &ReportDocument, path: &Path) -> Result<(), RenderError> {
    let mut package = OoxmlPackage::new();
    package
        .add("[Content_Types].xml", CONTENT_TYPES)
        .add("_rels/.rels", ROOT_RELS)
        .add("word/_rels/document.xml.rels", DOCUMENT_RELS)
        .add("word/styles.xml", STYLES)
        .add("word/document.xml", document_xml(document));
    package.write_to(path)
}
