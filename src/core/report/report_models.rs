// Format-independent content for the two generated artifacts.
//
// The builder fills these in; the infra writers turn them into .docx/.pptx
// packages. Keeping the content as plain data makes the report rules testable
// without unzipping anything.

/// One block of the narrative report, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBlock {
    /// Document title.
    Title(String),
    /// Heading with an outline level (1 = section, 2 = subsection).
    Heading { level: u8, text: String },
    Paragraph(String),
    Table(TableBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The narrative GAP analysis report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub file_name: String,
    pub blocks: Vec<DocumentBlock>,
}

impl ReportDocument {
    #[cfg(test)]
    /// Paragraphs that follow the heading with `heading_text`, up to the next heading.
    pub fn section_paragraphs(&self, heading_text: &str) -> Vec<&str> {
        self.blocks
            .iter()
            .skip_while(|b| {
                !matches!(b, DocumentBlock::Heading { text, .. } if text == heading_text)
            })
            .skip(1)
            .take_while(|b| !matches!(b, DocumentBlock::Heading { .. }))
            .filter_map(|b| match b {
                DocumentBlock::Paragraph(p) => Some(p.as_str()),
                _ => None,
            })
            .collect()
    }

    #[cfg(test)]
    pub fn tables(&self) -> impl Iterator<Item = &TableBlock> {
        self.blocks.iter().filter_map(|b| match b {
            DocumentBlock::Table(t) => Some(t),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub title: String,
    /// Subtitle shown on title slides.
    pub subtitle: Option<String>,
    pub bullets: Vec<String>,
}

/// The executive slide deck.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideDeck {
    pub file_name: String,
    pub slides: Vec<Slide>,
}

impl SlideDeck {
    #[cfg(test)]
    pub fn slide(&self, title: &str) -> Option<&Slide> {
        self.slides.iter().find(|s| s.title == title)
    }
}
