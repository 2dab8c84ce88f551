use crate::error::{CertforgeError, Result};
use crate::markup::{find_placeholders, FlatText, PlaceholderMatch};
use crate::package::{DocumentKind, Package};
use crate::template::field::TemplateField;
use log::{debug, info};
use std::collections::HashSet;

/// Findet alle Platzhalter eines XML-Teils, auch über Lauf-Grenzen hinweg
pub fn scan_markup(part: &str, markup: &str) -> Result<Vec<PlaceholderMatch>> {
    let flat = FlatText::from_markup(part, markup)?;
    Ok(find_placeholders(flat.text()))
}

/// Ermittelt die Felder eines Pakets
///
/// Doppelte Schlüssel werden zusammengefasst, das erste Vorkommen
/// bestimmt Anzeigename, Platzhaltertext und Folie.
pub fn scan_package(package: &Package) -> Result<Vec<TemplateField>> {
    let parts = package.content_parts();
    if package.kind() == DocumentKind::Slideshow && parts.is_empty() {
        return Err(CertforgeError::Format("presentation has no slides".to_string()));
    }

    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for part in parts {
        let markup = package.read_part_str(&part.name)?;
        let matches = scan_markup(&part.name, markup)?;
        debug!("{}: {} placeholder(s)", part.name, matches.len());

        for m in matches {
            if seen.insert(m.key.clone()) {
                fields.push(TemplateField::new(m.name, m.literal).on_slide(part.slide));
            }
        }
    }

    info!("Found {} field(s) in {} template", fields.len(), package.kind());
    Ok(fields)
}
