use std::fmt::Write as _;
use std::path::Path;

use crate::core::pipeline::RenderError;
use crate::core::report::{Slide, SlideDeck};

use super::ooxml_package::{escape_xml, OoxmlPackage, XML_DECLARATION};

const ROOT_RELS: &str = include_str!("templates/pptx_root_rels.xml");
const SLIDE_MASTER: &str = include_str!("templates/pptx_slide_master.xml");
const SLIDE_MASTER_RELS: &str = include_str!("templates/pptx_slide_master_rels.xml");
const SLIDE_LAYOUT: &str = include_str!("templates/pptx_slide_layout.xml");
const SLIDE_LAYOUT_RELS: &str = include_str!("templates/pptx_slide_layout_rels.xml");
const SLIDE_RELS: &str = include_str!("templates/pptx_slide_rels.xml");
const THEME: &str = include_str!("templates/pptx_theme.xml");

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_TYPE_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_BASE: &str = "application/vnd.openxmlformats-officedocument.presentationml";

/// 4:3 slide in EMU.
const SLIDE_WIDTH: i64 = 9_144_000;
const SLIDE_HEIGHT: i64 = 6_858_000;

/// Relationship ids 1 and 2 are taken by the master and the theme.
const FIRST_SLIDE_REL_ID: usize = 3;
const FIRST_SLIDE_ID: usize = 256;

struct Frame {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

const TITLE_SLIDE_TITLE: Frame = Frame {
    x: 685_800,
    y: 2_130_425,
    cx: 7_772_400,
    cy: 1_470_025,
};
const TITLE_SLIDE_SUBTITLE: Frame = Frame {
    x: 1_371_600,
    y: 3_886_200,
    cx: 6_400_800,
    cy: 1_752_600,
};
const CONTENT_SLIDE_TITLE: Frame = Frame {
    x: 457_200,
    y: 274_638,
    cx: 8_229_600,
    cy: 1_143_000,
};
const CONTENT_SLIDE_BODY: Frame = Frame {
    x: 457_200,
    y: 1_600_200,
    cx: 8_229_600,
    cy: 4_525_963,
};

fn text_run(text: &str, size: u32, bold: bool) -> String {
    format!(
        r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" dirty="0"/><a:t>{}</a:t></a:r>"#,
        size,
        u8::from(bold),
        escape_xml(text)
    )
}

fn shape(id: usize, name: &str, frame: &Frame, paragraphs: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        id = id,
        name = name,
        x = frame.x,
        y = frame.y,
        cx = frame.cx,
        cy = frame.cy,
        paragraphs = paragraphs
    )
}

fn title_slide_shapes(slide: &Slide) -> String {
    let title = format!(
        r#"<a:p><a:pPr algn="ctr"/>{}</a:p>"#,
        text_run(&slide.title, 4400, true)
    );
    let subtitle = format!(
        r#"<a:p><a:pPr algn="ctr"/>{}</a:p>"#,
        text_run(slide.subtitle.as_deref().unwrap_or_default(), 2400, false)
    );

    shape(2, "Title", &TITLE_SLIDE_TITLE, &title)
        + &shape(3, "Subtitle", &TITLE_SLIDE_SUBTITLE, &subtitle)
}

fn content_slide_shapes(slide: &Slide) -> String {
    let title = format!("<a:p>{}</a:p>", text_run(&slide.title, 3600, true));

    let mut body = String::new();
    for bullet in &slide.bullets {
        let _ = write!(
            body,
            r#"<a:p><a:pPr marL="342900" indent="-342900"><a:buFont typeface="Arial"/><a:buChar char="•"/></a:pPr>{}</a:p>"#,
            text_run(bullet, 2000, false)
        );
    }
    if body.is_empty() {
        // A text body needs at least one paragraph.
        body.push_str(r#"<a:p><a:endParaRPr lang="en-US" dirty="0"/></a:p>"#);
    }

    shape(2, "Title", &CONTENT_SLIDE_TITLE, &title)
        + &shape(3, "Content", &CONTENT_SLIDE_BODY, &body)
}

/// `ppt/slides/slideN.xml` for one slide.
pub fn slide_xml(slide: &Slide) -> String {
    let shapes = if slide.subtitle.is_some() {
        title_slide_shapes(slide)
    } else {
        content_slide_shapes(slide)
    };

    format!(
        r#"{}<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        XML_DECLARATION, NAMESPACES, shapes
    )
}

fn content_types(slide_count: usize) -> String {
    let mut xml = format!(
        r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="{ct}.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{ct}.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{ct}.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
        XML_DECLARATION,
        ct = CT_BASE
    );
    for n in 1..=slide_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="{}.slide+xml"/>"#,
            n, CT_BASE
        );
    }
    xml.push_str("</Types>");
    xml
}

fn presentation_xml(slide_count: usize) -> String {
    let mut ids = String::new();
    for i in 0..slide_count {
        let _ = write!(
            ids,
            r#"<p:sldId id="{}" r:id="rId{}"/>"#,
            FIRST_SLIDE_ID + i,
            FIRST_SLIDE_REL_ID + i
        );
    }

    format!(
        r#"{}<p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="{}" cy="{}" type="screen4x3"/><p:notesSz cx="{}" cy="{}"/></p:presentation>"#,
        XML_DECLARATION, NAMESPACES, ids, SLIDE_WIDTH, SLIDE_HEIGHT, SLIDE_HEIGHT, SLIDE_WIDTH
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let mut xml = format!(
        r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{rel}/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{rel}/theme" Target="theme/theme1.xml"/>"#,
        XML_DECLARATION,
        rel = REL_TYPE_BASE
    );
    for i in 0..slide_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{}" Type="{}/slide" Target="slides/slide{}.xml"/>"#,
            FIRST_SLIDE_REL_ID + i,
            REL_TYPE_BASE,
            i + 1
        );
    }
    xml.push_str("</Relationships>");
    xml
}

/// Write a deck as a .pptx file.
pub fn write_pptx(deck: &SlideDeck, path: &Path) -> Result<(), RenderError> {
    let count = deck.slides.len();
    let mut package = OoxmlPackage::new();
    package
        .add("[Content_Types].xml", content_types(count))
        .add("_rels/.rels", ROOT_RELS)
        .add("ppt/presentation.xml", presentation_xml(count))
        .add("ppt/_rels/presentation.xml.rels", presentation_rels(count))
        .add("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER)
        .add("ppt/slideMasters/_rels/slideMaster1.xml.rels", SLIDE_MASTER_RELS)
        .add("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT)
        .add("ppt/slideLayouts/_rels/slideLayout1.xml.rels", SLIDE_LAYOUT_RELS)
        .add("ppt/theme/theme1.xml", THEME);

    for (i, slide) in deck.slides.iter().enumerate() {
        package
            .add(format!("ppt/slides/slide{}.xml", i + 1), slide_xml(slide))
            .add(format!("ppt/slides/_rels/slide{}.xml.rels", i + 1), SLIDE_RELS);
    }

    package.write_to(path)
}
