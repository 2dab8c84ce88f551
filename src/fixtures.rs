//! In-memory DOCX/PPTX packages for tests

use std::io::{Cursor, Write};
use zip::{write::FileOptions, ZipWriter};

pub const SECT_PR: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#;

pub fn zip_of(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Ein Absatz, jeder Eintrag wird ein eigener formatierter Lauf
pub fn paragraph(runs: &[&str]) -> String {
    let mut xml = String::from("<w:p>");
    for (i, text) in runs.iter().enumerate() {
        let style = if i % 2 == 0 { "<w:b/>" } else { "<w:i/>" };
        xml.push_str(&format!(
            r#"<w:r><w:rPr>{}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
            style, text
        ));
    }
    xml.push_str("</w:p>");
    xml
}

/// Zerlegt einen Text in Einzelzeichen-Läufe
pub fn split_every_char(text: &str) -> Vec<String> {
    text.chars().map(|c| c.to_string()).collect()
}

pub fn document_xml(paragraphs: &[String]) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}{}</w:body></w:document>"
        ),
        paragraphs.concat(),
        SECT_PR
    )
}

pub fn docx(paragraphs: &[String]) -> Vec<u8> {
    let document = document_xml(paragraphs);
    zip_of(&[
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#,
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#,
        ),
        ("word/document.xml", document.as_str()),
        ("word/styles.xml", "<w:styles/>"),
    ])
}

pub fn slide_xml(runs: &[&str]) -> String {
    let mut body = String::new();
    for text in runs {
        body.push_str(&format!(r#"<a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r>"#, text));
    }
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
            "<p:cSld><p:spTree><p:sp><p:txBody><a:p>{}</a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"
        ),
        body
    )
}

const SLIDE_RELS: &str = concat!(
    r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="../notesSlides/notesSlide1.xml"/>"#,
    "</Relationships>"
);

/// Präsentation mit je einem Textabsatz pro Folie
pub fn pptx(slides: &[&[&str]]) -> Vec<u8> {
    let mut overrides = String::new();
    let mut rels = String::from(
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
    );
    let mut ids = String::new();
    for i in 1..=slides.len() {
        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            i
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
            i + 1,
            i
        ));
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i + 1));
    }

    let content_types = format!(
        r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{}</Types>"#,
        overrides
    );
    let presentation = format!(
        r#"<?xml version="1.0"?><p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
        ids
    );
    let presentation_rels = format!(
        r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        rels
    );

    let slide_parts: Vec<(String, String)> = slides
        .iter()
        .enumerate()
        .flat_map(|(i, runs)| {
            [
                (format!("ppt/slides/slide{}.xml", i + 1), slide_xml(runs)),
                (format!("ppt/slides/_rels/slide{}.xml.rels", i + 1), SLIDE_RELS.to_string()),
            ]
        })
        .collect();

    let mut parts: Vec<(&str, &str)> = vec![
        ("[Content_Types].xml", content_types.as_str()),
        ("ppt/presentation.xml", presentation.as_str()),
        ("ppt/_rels/presentation.xml.rels", presentation_rels.as_str()),
        ("ppt/slideMasters/slideMaster1.xml", "<p:sldMaster/>"),
    ];
    parts.extend(slide_parts.iter().map(|(n, c)| (n.as_str(), c.as_str())));
    zip_of(&parts)
}
