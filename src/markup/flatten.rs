use crate::error::{CertforgeError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::ops::Range;

/// Lokaler Name der Textlauf-Elemente (`w:t`, `a:t`)
const TEXT_ELEMENT: &[u8] = b"t";

#[derive(Debug, Clone, Copy)]
struct Glyph {
    /// Byte-Offset im flachen Text
    flat: usize,
    source_start: usize,
    source_end: usize,
}

/// Zusammenhängender Text eines XML-Teils ohne Formatierungs-Tags
///
/// Word und PowerPoint zerlegen Text an beliebigen Stellen in Läufe:
/// `<w:t>{{</w:t></w:r><w:r><w:t>Name}}</w:t>` wird hier zu `{{Name}}`.
/// Für jedes Zeichen bleibt der Byte-Bereich im Original erhalten, damit
/// Treffer im flachen Text auf das Markup zurückgerechnet werden können.
#[derive(Debug, Clone, Default)]
pub struct FlatText {
    text: String,
    glyphs: Vec<Glyph>,
}

impl FlatText {
    /// Baut die Projektion; fehlerhaftes Markup ergibt `Parse`
    pub fn from_markup(part: &str, markup: &str) -> Result<Self> {
        let mut reader = Reader::from_str(markup);
        let mut flat = FlatText::default();
        let mut open_elements = 0usize;
        let mut text_depth = 0usize;

        loop {
            let pos = reader.buffer_position() as usize;
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    open_elements += 1;
                    if e.local_name().as_ref() == TEXT_ELEMENT {
                        text_depth += 1;
                    }
                }
                Ok(Event::End(e)) => {
                    open_elements = open_elements.saturating_sub(1);
                    if e.local_name().as_ref() == TEXT_ELEMENT {
                        text_depth = text_depth.saturating_sub(1);
                    }
                }
                Ok(Event::Text(t)) if text_depth > 0 => {
                    let raw = source_slice(part, markup, pos, &t)?;
                    flat.push_escaped(raw, pos);
                }
                Ok(Event::CData(c)) if text_depth > 0 => {
                    // nach Textknoten steht die Leseposition schon hinter '<'
                    let from = pos.saturating_sub(1);
                    let start = markup[from..]
                        .find("<![CDATA[")
                        .map_or(pos, |i| from + i + "<![CDATA[".len());
                    let raw = source_slice(part, markup, start, &c)?;
                    flat.push_literal(raw, start);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(CertforgeError::parse(
                        part,
                        format!("{} (at byte {})", e, reader.error_position()),
                    ))
                }
            }
        }

        if open_elements > 0 {
            return Err(CertforgeError::parse(
                part,
                format!("{} element(s) left unclosed", open_elements),
            ));
        }

        Ok(flat)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Rechnet einen Bereich des flachen Texts auf das Markup zurück
    ///
    /// Der Ergebnisbereich reicht vom ersten bis zum letzten Zeichen und
    /// schließt alle dazwischenliegenden Tags ein.
    pub fn source_range(&self, flat: Range<usize>) -> Option<Range<usize>> {
        if flat.is_empty() {
            return None;
        }
        let first = self.glyphs.partition_point(|g| g.flat < flat.start);
        let last = self.glyphs.partition_point(|g| g.flat < flat.end).checked_sub(1)?;
        let (first, last) = (self.glyphs.get(first)?, self.glyphs.get(last)?);
        if first.flat != flat.start || last.flat < first.flat {
            return None;
        }
        Some(first.source_start..last.source_end)
    }

    fn push(&mut self, c: char, source: Range<usize>) {
        self.glyphs.push(Glyph {
            flat: self.text.len(),
            source_start: source.start,
            source_end: source.end,
        });
        self.text.push(c);
    }

    fn push_literal(&mut self, raw: &str, base: usize) {
        for (i, c) in raw.char_indices() {
            self.push(c, base + i..base + i + c.len_utf8());
        }
    }

    /// Zeichendaten mit Entity-Referenzen; eine Referenz wird ein Zeichen
    fn push_escaped(&mut self, raw: &str, base: usize) {
        let mut i = 0;
        while let Some(c) = raw[i..].chars().next() {
            if c == '&' {
                if let Some(len) = raw[i..].find(';') {
                    if let Some(decoded) = decode_entity(&raw[i + 1..i + len]) {
                        self.push(decoded, base + i..base + i + len + 1);
                        i += len + 1;
                        continue;
                    }
                }
            }
            self.push(c, base + i..base + i + c.len_utf8());
            i += c.len_utf8();
        }
    }
}

fn source_slice<'a>(part: &str, markup: &'a str, pos: usize, raw: &[u8]) -> Result<&'a str> {
    markup
        .get(pos..pos + raw.len())
        .filter(|s| s.as_bytes() == raw)
        .ok_or_else(|| CertforgeError::parse(part, format!("cannot locate text at byte {}", pos)))
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}
