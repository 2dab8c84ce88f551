use crate::error::{CertforgeError, Result};
use crate::package::kind::{self, CONTENT_TYPES, PRESENTATION, PRESENTATION_RELS, WORD_DOCUMENT};
use crate::package::{DocumentKind, Package};
use log::{debug, info, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

const PAGE_BREAK: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

/// US Letter, falls das erste Dokument keinen eigenen Abschnitt hat
const DEFAULT_SECT_PR: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#;

const SLIDE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const SLIDE_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid merger regex"))
}

fn body_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"<w:body\b[^>]*>")
}

fn rel_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"\bId="rId(\d+)""#)
}

fn slide_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"<p:sldId\s+id="(\d+)""#)
}

fn notes_rel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"<Relationship\b[^>]*Type="[^"]*/notesSlide"[^>]*/>"#)
}

/// Öffnet Eingaben für das Zusammenführen; ungültige Pakete sind inkompatibel
pub fn open_all(inputs: &[Vec<u8>]) -> Result<Vec<Package>> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, bytes)| {
            Package::open(bytes).map_err(|e| CertforgeError::IncompatibleMerge(format!("input #{}: {}", i + 1, e)))
        })
        .collect()
}

/// Führt gleichartige Pakete in Reihenfolge zu einem zusammen
///
/// Styles, Medien und Beziehungen auf oberster Ebene stammen aus dem
/// ersten Paket.
pub fn merge(packages: &[Package]) -> Result<Package> {
    let first = packages
        .first()
        .ok_or_else(|| CertforgeError::IncompatibleMerge("no documents to merge".to_string()))?;

    if let Some(other) = packages.iter().find(|p| p.kind() != first.kind()) {
        return Err(CertforgeError::IncompatibleMerge(format!(
            "cannot combine {} and {} documents",
            first.kind(),
            other.kind()
        )));
    }
    if let Some(p) = packages.iter().find(|p| !p.has_part(p.kind().descriptor())) {
        return Err(CertforgeError::IncompatibleMerge(format!(
            "missing '{}'",
            p.kind().descriptor()
        )));
    }

    info!("Merging {} {} document(s)", packages.len(), first.kind());
    match first.kind() {
        DocumentKind::Word => merge_word(packages),
        DocumentKind::Slideshow => merge_slides(packages),
    }
}

/// Wie [`merge`], aber auf ZIP-Bytes
pub fn merge_bytes(inputs: &[Vec<u8>]) -> Result<Vec<u8>> {
    merge(&open_all(inputs)?)?.to_bytes()
}

fn merge_word(packages: &[Package]) -> Result<Package> {
    let mut merged = packages[0].clone();
    let base = open_empty_body(merged.read_part_str(WORD_DOCUMENT)?).into_owned();
    let (body_start, body_end) = body_bounds(&base)?;

    let mut body = String::with_capacity(base.len() * packages.len());
    let mut section = None;

    for (i, package) in packages.iter().enumerate() {
        let xml = open_empty_body(package.read_part_str(WORD_DOCUMENT)?);
        let (start, end) = body_bounds(&xml)?;
        let (content, trailing) = split_trailing_section(&xml[start..end])?;

        if i == 0 {
            section = trailing.map(str::to_string);
        } else {
            body.push_str(PAGE_BREAK);
        }
        body.push_str(content);
        debug!("Appended body #{} ({} bytes)", i + 1, content.len());
    }
    body.push_str(section.as_deref().unwrap_or(DEFAULT_SECT_PR));

    let document = format!("{}{}{}", &base[..body_start], body, &base[body_end..]);
    merged.write_part(WORD_DOCUMENT, document)?;
    Ok(merged)
}

/// `<w:body/>` wird zu `<w:body></w:body>`
fn open_empty_body(xml: &str) -> Cow<'_, str> {
    match body_open_regex().find(xml) {
        Some(m) if m.as_str().ends_with("/>") => {
            let tag = m.as_str().trim_end_matches("/>").trim_end();
            Cow::Owned(format!("{}{}></w:body>{}", &xml[..m.start()], tag, &xml[m.end()..]))
        }
        _ => Cow::Borrowed(xml),
    }
}

/// Byte-Bereich des Inhalts von `<w:body>`
fn body_bounds(xml: &str) -> Result<(usize, usize)> {
    let open = body_open_regex()
        .find(xml)
        .filter(|m| !m.as_str().ends_with("/>"))
        .ok_or_else(|| CertforgeError::parse(WORD_DOCUMENT, "document body not found"))?;
    let close = xml
        .rfind("</w:body>")
        .filter(|&close| close >= open.end())
        .ok_or_else(|| CertforgeError::parse(WORD_DOCUMENT, "document body is not closed"))?;
    Ok((open.end(), close))
}

/// Trennt einen abschließenden `w:sectPr` auf oberster Ebene ab
///
/// `w:sectPr` innerhalb von Absatzeigenschaften bleibt unberührt.
fn split_trailing_section(body: &str) -> Result<(&str, Option<&str>)> {
    let mut reader = Reader::from_str(body);
    let mut depth = 0usize;
    let mut open_start = 0;
    let mut open_is_section = false;
    let mut last: Option<(usize, usize, bool)> = None;

    loop {
        let pos = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    open_start = tag_start(body, pos);
                    open_is_section = e.name().as_ref() == b"w:sectPr";
                }
                depth += 1;
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    last = Some((open_start, reader.buffer_position() as usize, open_is_section));
                }
            }
            Ok(Event::Empty(e)) if depth == 0 => {
                let is_section = e.name().as_ref() == b"w:sectPr";
                last = Some((tag_start(body, pos), reader.buffer_position() as usize, is_section));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(CertforgeError::parse(WORD_DOCUMENT, e)),
        }
    }

    match last {
        Some((start, end, true)) if body[end..].trim().is_empty() => {
            Ok((&body[..start], Some(&body[start..end])))
        }
        _ => Ok((body, None)),
    }
}

/// Anfang des Tags, der bei `pos` gelesen wurde
fn tag_start(text: &str, pos: usize) -> usize {
    if text[pos..].starts_with('<') {
        return pos;
    }
    // nach Textknoten steht die Leseposition bereits hinter '<'
    if pos > 0 && text.as_bytes()[pos - 1] == b'<' {
        return pos - 1;
    }
    text[pos..].find('<').map_or(pos, |i| pos + i)
}

fn merge_slides(packages: &[Package]) -> Result<Package> {
    let mut merged = packages[0].clone();
    let mut registry = SlideRegistry::load(&merged)?;
    let mut next = merged.slide_count() + 1;

    for (i, package) in packages.iter().enumerate().skip(1) {
        let count = package.slide_count();
        for slide in 1..=count {
            let data = package.read_part(&kind::slide_part(slide))?.to_vec();
            merged.put_part(&kind::slide_part(next), data);

            // Beziehungen im Gleichschritt umbenennen
            let rels = kind::slide_rels_part(slide);
            if package.has_part(&rels) {
                let content = notes_rel_regex().replace_all(package.read_part_str(&rels)?, "");
                merged.put_part(&kind::slide_rels_part(next), content.into_owned());
            }

            registry.register(next);
            next += 1;
        }
        debug!("Appended {} slide(s) from document #{}", count, i + 1);
    }

    registry.store(&mut merged)?;
    Ok(merged)
}

/// Trägt neue Folien in presentation.xml, deren Beziehungen und die
/// Content-Types ein
struct SlideRegistry {
    presentation: Option<String>,
    rels: Option<String>,
    content_types: Option<String>,
    next_rel: u64,
    next_slide_id: u64,
}

impl SlideRegistry {
    fn load(package: &Package) -> Result<Self> {
        let read = |name: &str| -> Result<Option<String>> {
            if package.has_part(name) {
                Ok(Some(package.read_part_str(name)?.to_string()))
            } else {
                warn!("'{}' missing, appended slides are not registered there", name);
                Ok(None)
            }
        };
        let presentation = read(PRESENTATION)?;
        let rels = read(PRESENTATION_RELS)?;
        let content_types = read(CONTENT_TYPES)?;

        let max_of = |text: &Option<String>, re: &Regex| {
            text.as_deref()
                .map(|t| {
                    re.captures_iter(t)
                        .filter_map(|c| c[1].parse::<u64>().ok())
                        .max()
                        .unwrap_or(0)
                })
                .unwrap_or(0)
        };
        let next_rel = max_of(&rels, rel_id_regex()) + 1;
        // Folien-IDs beginnen bei 256
        let next_slide_id = (max_of(&presentation, slide_id_regex()) + 1).max(256);

        Ok(Self {
            presentation,
            rels,
            content_types,
            next_rel,
            next_slide_id,
        })
    }

    fn register(&mut self, slide: u32) {
        let rel_id = format!("rId{}", self.next_rel);
        self.next_rel += 1;

        if let Some(rels) = &mut self.rels {
            let entry = format!(
                r#"<Relationship Id="{}" Type="{}" Target="slides/slide{}.xml"/>"#,
                rel_id, SLIDE_REL_TYPE, slide
            );
            insert_before(rels, "</Relationships>", &entry);
        }

        if let Some(presentation) = &mut self.presentation {
            let entry = format!(r#"<p:sldId id="{}" r:id="{}"/>"#, self.next_slide_id, rel_id);
            self.next_slide_id += 1;
            insert_before(presentation, "</p:sldIdLst>", &entry);
        }

        if let Some(types) = &mut self.content_types {
            let part_name = format!("/{}", kind::slide_part(slide));
            let declares_slides = types.contains(&format!("PartName=\"/{}\"", kind::slide_part(1)));
            if declares_slides && !types.contains(&format!("PartName=\"{}\"", part_name)) {
                let entry = format!(
                    r#"<Override PartName="{}" ContentType="{}"/>"#,
                    part_name, SLIDE_CONTENT_TYPE
                );
                insert_before(types, "</Types>", &entry);
            }
        }
    }

    fn store(self, package: &mut Package) -> Result<()> {
        for (name, content) in [
            (PRESENTATION, self.presentation),
            (PRESENTATION_RELS, self.rels),
            (CONTENT_TYPES, self.content_types),
        ] {
            if let Some(content) = content {
                package.write_part(name, content)?;
            }
        }
        Ok(())
    }
}

fn insert_before(text: &mut String, marker: &str, entry: &str) {
    match text.rfind(marker) {
        Some(at) => text.insert_str(at, entry),
        None => warn!("'{}' not found, cannot register '{}'", marker, entry),
    }
}
