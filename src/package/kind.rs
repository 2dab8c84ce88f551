use serde::{Deserialize, Serialize};
use std::fmt;

pub const WORD_DOCUMENT: &str = "word/document.xml";
pub const PRESENTATION: &str = "ppt/presentation.xml";
pub const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
pub const CONTENT_TYPES: &str = "[Content_Types].xml";

/// Art des Office-Pakets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Word,
    Slideshow,
}

/// Ein Textteil des Pakets, der Platzhalter enthalten kann
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    pub name: String,
    /// 1-basierter Folienindex (nur bei Präsentationen)
    pub slide: Option<u32>,
}

impl DocumentKind {
    /// Pflichtteil, an dem die Art erkannt wird
    pub fn descriptor(self) -> &'static str {
        match self {
            DocumentKind::Word => WORD_DOCUMENT,
            DocumentKind::Slideshow => PRESENTATION,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Word => "docx",
            DocumentKind::Slideshow => "pptx",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(DocumentKind::Word),
            "pptx" => Some(DocumentKind::Slideshow),
            _ => None,
        }
    }

    /// Erkennt die Art an den vorhandenen Teilen; Word hat Vorrang
    pub fn detect<'a, I>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut slideshow = false;
        for name in names {
            if name == WORD_DOCUMENT {
                return Some(DocumentKind::Word);
            }
            if name == PRESENTATION {
                slideshow = true;
            }
        }
        slideshow.then_some(DocumentKind::Slideshow)
    }

    /// Markup für einen Zeilenumbruch innerhalb eines Textlaufs
    pub fn line_break(self) -> &'static str {
        match self {
            DocumentKind::Word => r#"</w:t><w:br/><w:t xml:space="preserve">"#,
            DocumentKind::Slideshow => "</a:t></a:r><a:br/><a:r><a:t>",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Word => write!(f, "word"),
            DocumentKind::Slideshow => write!(f, "slideshow"),
        }
    }
}

pub fn slide_part(index: u32) -> String {
    format!("ppt/slides/slide{}.xml", index)
}

pub fn slide_rels_part(index: u32) -> String {
    format!("ppt/slides/_rels/slide{}.xml.rels", index)
}

/// Kopf- und Fußzeilen: word/header1.xml, word/footer2.xml, ...
pub(crate) fn is_header_or_footer(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    let Some(stem) = file.strip_suffix(".xml") else {
        return false;
    };
    ["header", "footer"].iter().any(|prefix| {
        stem.strip_prefix(prefix)
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    })
}
