// Report builder - the fixed templates for the document and the slide deck.
//
// Both functions are pure: same session and entries in, same content out.

use crate::core::gaps::{GapEntry, GapReport};

use super::report_models::{DocumentBlock, ReportDocument, Slide, SlideDeck, TableBlock};

pub const DOCUMENT_FILE_NAME: &str = "Target_GAP_Analysis_Report.docx";
pub const DECK_FILE_NAME: &str = "Target_GAP_Analysis_Executive_Report.pptx";

pub const RECOMMENDATIONS_HEADING: &str = "4. Recommendations";
pub const HW_SUMMARY_TITLE: &str = "HW GAP Summary";
pub const SW_SUMMARY_TITLE: &str = "SW GAP Summary";
pub const PRIORITY_TITLE: &str = "Priority Recommendations";

const TABLE_HEADER: [&str; 5] = ["Platform", "Tier", "Status", "Recommendation", "Severity"];

fn heading(level: u8, text: &str) -> DocumentBlock {
    DocumentBlock::Heading {
        level,
        text: text.to_string(),
    }
}

fn paragraph(text: impl Into<String>) -> DocumentBlock {
    DocumentBlock::Paragraph(text.into())
}

fn gap_table(entries: &[GapEntry]) -> DocumentBlock {
    DocumentBlock::Table(TableBlock {
        header: TABLE_HEADER.iter().map(|h| h.to_string()).collect(),
        rows: entries
            .iter()
            .map(|e| {
                vec![
                    e.platform.clone(),
                    e.tier.clone(),
                    e.status.clone(),
                    e.recommendation.clone(),
                    e.severity().to_string(),
                ]
            })
            .collect(),
    })
}

/// Build the narrative "Target GAP Analysis Report".
pub fn build_document(session_id: &str, gaps: &GapReport) -> ReportDocument {
    let mut blocks = vec![
        DocumentBlock::Title("Target GAP Analysis Report".to_string()),
        paragraph(format!("Session: {}", session_id)),
        heading(1, "1. Executive Summary"),
        paragraph(
            "This document compares the current infrastructure with the target architecture.",
        ),
        heading(1, "2. GAP Matrix by Domain"),
        paragraph(
            "This section presents technical gaps by IT domain (compute, storage, cloud, etc.).",
        ),
        heading(2, "Compute & HW GAPs"),
        gap_table(&gaps.hardware),
        heading(2, "Applications & SW GAPs"),
        gap_table(&gaps.software),
        heading(1, "3. Functional Impact"),
        paragraph(
            "This section outlines how the current gaps impact scalability, uptime, compliance, etc.",
        ),
        heading(1, RECOMMENDATIONS_HEADING),
    ];

    blocks.extend(
        gaps.all_entries()
            .filter(|e| e.has_recommendation())
            .map(|e| paragraph(format!("- {}: {}", e.platform, e.recommendation))),
    );

    blocks.push(heading(1, "5. Summary & Observations"));
    blocks.push(paragraph(
        "This GAP analysis reveals modernization priorities and transformation areas.",
    ));

    ReportDocument {
        file_name: DOCUMENT_FILE_NAME.to_string(),
        blocks,
    }
}

fn summary_bullets(entries: &[GapEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.has_recommendation())
        .map(|e| format!("{} → {}", e.platform, e.recommendation))
        .collect()
}

fn content_slide(title: &str, bullets: Vec<String>) -> Slide {
    Slide {
        title: title.to_string(),
        subtitle: None,
        bullets,
    }
}

/// Build the "Target GAP Executive Report" deck: a title slide plus three summaries.
pub fn build_deck(session_id: &str, gaps: &GapReport) -> SlideDeck {
    let priority = gaps
        .all_entries()
        .filter(|e| e.is_obsolete())
        .map(|e| e.platform.clone())
        .collect();

    SlideDeck {
        file_name: DECK_FILE_NAME.to_string(),
        slides: vec![
            Slide {
                title: "Target GAP Executive Report".to_string(),
                subtitle: Some(format!("Session: {}", session_id)),
                bullets: Vec::new(),
            },
            content_slide(HW_SUMMARY_TITLE, summary_bullets(&gaps.hardware)),
            content_slide(SW_SUMMARY_TITLE, summary_bullets(&gaps.software)),
            content_slide(PRIORITY_TITLE, priority),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> GapReport {
        GapReport {
            hardware: vec![GapEntry::new("Server", "Tier1", "Obsolete", "Replace with cloud VM")],
            software: vec![GapEntry::new("CRM", "Tier2", "Active", "")],
        }
    }

    #[test]
    fn test_end_to_end_scenario_document() {
        let doc = build_document("S-1", &scenario());

        let tables: Vec<_> = doc.tables().collect();
        assert_eq!(tables.len(), 2);
        assert_eq!(
            tables[0].rows,
            vec![vec!["Server", "Tier1", "Obsolete", "Replace with cloud VM", "5"]]
        );
        assert_eq!(tables[1].rows, vec![vec!["CRM", "Tier2", "Active", "", "2"]]);

        assert_eq!(
            doc.section_paragraphs(RECOMMENDATIONS_HEADING),
            vec!["- Server: Replace with cloud VM"]
        );
    }

    #[test]
    fn test_end_to_end_scenario_deck() {
        let deck = build_deck("S-1", &scenario());

        assert_eq!(deck.slides.len(), 4);
        assert_eq!(deck.slides[0].subtitle.as_deref(), Some("Session: S-1"));
        assert_eq!(
            deck.slide(HW_SUMMARY_TITLE).unwrap().bullets,
            vec!["Server → Replace with cloud VM"]
        );
        assert!(deck.slide(SW_SUMMARY_TITLE).unwrap().bullets.is_empty());
        assert_eq!(deck.slide(PRIORITY_TITLE).unwrap().bullets, vec!["Server"]);
    }

    #[test]
    fn test_recommendations_keep_hardware_then_software_order() {
        let gaps = GapReport {
            hardware: vec![
                GapEntry::new("Z", "T", "Active", "first"),
                GapEntry::new("B", "T", "Active", "second"),
                GapEntry::new("A", "T", "Active", ""),
            ],
            software: vec![GapEntry::new("C", "T", "Active", "third")],
        };

        let doc = build_document("S", &gaps);
        assert_eq!(
            doc.section_paragraphs(RECOMMENDATIONS_HEADING),
            vec!["- Z: first", "- B: second", "- C: third"]
        );
    }

    #[test]
    fn test_priority_slide_matches_obsolete_case_insensitively_across_categories() {
        let gaps = GapReport {
            hardware: vec![
                GapEntry::new("Mainframe", "T", "OBSOLETE since 2019", ""),
                GapEntry::new("Router", "T", "Supported", "Keep"),
            ],
            software: vec![GapEntry::new("ERP", "T", "nearly obsolete", "Migrate")],
        };

        let deck = build_deck("S", &gaps);
        assert_eq!(deck.slide(PRIORITY_TITLE).unwrap().bullets, vec!["Mainframe", "ERP"]);
    }

    #[test]
    fn test_builders_are_deterministic() {
        assert_eq!(build_document("S", &scenario()), build_document("S", &scenario()));
        assert_eq!(build_deck("S", &scenario()), build_deck("S", &scenario()));
    }

    #[test]
    fn test_empty_input_still_produces_every_section() {
        let doc = build_document("S", &GapReport::default());
        assert!(doc.section_paragraphs(RECOMMENDATIONS_HEADING).is_empty());
        assert_eq!(doc.tables().count(), 2);
        assert!(doc.tables().all(|t| t.rows.is_empty() && t.header.len() == 5));

        let deck = build_deck("S", &GapReport::default());
        assert_eq!(deck.slides.len(), 4);
    }
}
