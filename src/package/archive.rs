use crate::error::{CertforgeError, Result};
use crate::package::kind::{self, ContentPart, DocumentKind};
use log::{debug, info};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
    modified: bool,
}

/// Ein geöffnetes DOCX/PPTX-Paket, vollständig im Speicher
///
/// Änderungen betreffen nur die Kopie; der Quellpuffer bleibt unberührt.
#[derive(Debug, Clone)]
pub struct Package {
    kind: DocumentKind,
    entries: Vec<Entry>,
}

impl Package {
    /// Öffnet ein Paket aus Bytes
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| CertforgeError::Format(format!("not a zip container ({})", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| CertforgeError::Format(format!("unreadable entry #{} ({})", i, e)))?;

            // Größenangabe im Header ist nicht vertrauenswürdig
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;

            entries.push(Entry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                is_dir: file.is_dir(),
                modified: false,
            });
        }

        let kind = DocumentKind::detect(entries.iter().map(|e| e.name.as_str())).ok_or_else(|| {
            CertforgeError::Format(format!(
                "missing '{}' or '{}'",
                kind::WORD_DOCUMENT,
                kind::PRESENTATION
            ))
        })?;

        debug!("Opened {} package with {} entries", kind, entries.len());
        Ok(Self { kind, entries })
    }

    /// Öffnet ein Paket von der Festplatte
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CertforgeError::TemplateNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        Self::open(&bytes)
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Namen aller Dateien (ohne Verzeichnisse) in Archivreihenfolge
    pub fn list_parts(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn read_part(&self, name: &str) -> Result<&[u8]> {
        self.entry(name)
            .map(|e| e.data.as_slice())
            .ok_or_else(|| CertforgeError::PartNotFound(name.to_string()))
    }

    /// Liest einen XML-Teil als UTF-8
    pub fn read_part_str(&self, name: &str) -> Result<&str> {
        let bytes = self.read_part(name)?;
        std::str::from_utf8(bytes).map_err(|e| CertforgeError::parse(name, e))
    }

    /// Ersetzt einen vorhandenen Teil, alle anderen bleiben unverändert
    pub fn write_part(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| !e.is_dir && e.name == name)
            .ok_or_else(|| CertforgeError::PartNotFound(name.to_string()))?;

        entry.data = data.into();
        entry.modified = true;
        Ok(())
    }

    /// Fügt einen Teil hinzu oder ersetzt ihn
    pub fn put_part(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| !e.is_dir && e.name == name) {
            entry.data = data.into();
            entry.modified = true;
            return;
        }
        self.entries.push(Entry {
            name: name.to_string(),
            data: data.into(),
            compression: CompressionMethod::Deflated,
            is_dir: false,
            modified: true,
        });
    }

    /// Text-Teile in Verarbeitungsreihenfolge
    ///
    /// Word: Hauptdokument, danach Kopf- und Fußzeilen nach Namen sortiert.
    /// Präsentation: slide1.xml, slide2.xml, ... bis zur ersten Lücke.
    pub fn content_parts(&self) -> Vec<ContentPart> {
        match self.kind {
            DocumentKind::Word => {
                let mut extra: Vec<&str> = self
                    .list_parts()
                    .into_iter()
                    .filter(|name| kind::is_header_or_footer(name))
                    .collect();
                extra.sort_unstable();

                std::iter::once(kind::WORD_DOCUMENT)
                    .chain(extra)
                    .map(|name| ContentPart {
                        name: name.to_string(),
                        slide: None,
                    })
                    .collect()
            }
            DocumentKind::Slideshow => (1..=self.slide_count())
                .map(|i| ContentPart {
                    name: kind::slide_part(i),
                    slide: Some(i),
                })
                .collect(),
        }
    }

    /// Anzahl zusammenhängend nummerierter Folien ab slide1.xml
    pub fn slide_count(&self) -> u32 {
        let mut count = 0;
        while self.has_part(&kind::slide_part(count + 1)) {
            count += 1;
        }
        count
    }

    /// Schreibt das Paket als ZIP-Bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), FileOptions::default())?;
                continue;
            }

            // Geänderte Teile werden komprimiert, alle anderen behalten ihre Kompression
            let compression = if entry.modified {
                CompressionMethod::Deflated
            } else {
                entry.compression
            };
            let options = FileOptions::default().compression_method(compression);

            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&entry.data)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?)?;
        info!("Successfully created: {}", path.display());
        Ok(())
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| !e.is_dir && e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_open_rejects_non_zip() {
        let err = Package::open(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, CertforgeError::Format(_)));
    }

    #[test]
    fn test_open_requires_descriptor() {
        let bytes = fixtures::zip_of(&[("content.xml", "<office:document/>")]);
        let err = Package::open(&bytes).unwrap_err();
        assert!(matches!(err, CertforgeError::Format(_)));
    }

    #[test]
    fn test_read_and_write_part() {
        let bytes = fixtures::docx(&[fixtures::paragraph(&["Hello"])]);
        let mut package = Package::open(&bytes).unwrap();
        assert_eq!(package.kind(), DocumentKind::Word);

        let styles_before = package.read_part("word/styles.xml").unwrap().to_vec();
        package.write_part("word/document.xml", "<w:document/>").unwrap();

        let reopened = Package::open(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(reopened.read_part_str("word/document.xml").unwrap(), "<w:document/>");
        assert_eq!(reopened.read_part("word/styles.xml").unwrap(), styles_before.as_slice());
        assert_eq!(reopened.list_parts(), package.list_parts());
    }

    #[test]
    fn test_missing_part() {
        let bytes = fixtures::docx(&[]);
        let mut package = Package::open(&bytes).unwrap();
        assert!(matches!(
            package.read_part("word/nope.xml"),
            Err(CertforgeError::PartNotFound(_))
        ));
        assert!(matches!(
            package.write_part("word/nope.xml", "x"),
            Err(CertforgeError::PartNotFound(_))
        ));
    }

    #[test]
    fn test_reads_do_not_touch_source() {
        let bytes = fixtures::docx(&[fixtures::paragraph(&["Hello"])]);
        let copy = bytes.clone();
        let mut package = Package::open(&bytes).unwrap();
        package.write_part("word/document.xml", "changed").unwrap();
        assert_eq!(bytes, copy);
    }

    #[test]
    fn test_content_parts_word() {
        let bytes = fixtures::zip_of(&[
            ("word/document.xml", "<w:document/>"),
            ("word/footer1.xml", "<w:ftr/>"),
            ("word/header1.xml", "<w:hdr/>"),
        ]);
        let package = Package::open(&bytes).unwrap();
        let names: Vec<String> = package.content_parts().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["word/document.xml", "word/footer1.xml", "word/header1.xml"]
        );
    }

    #[test]
    fn test_content_parts_slides_stop_at_gap() {
        let bytes = fixtures::zip_of(&[
            ("ppt/presentation.xml", "<p:presentation/>"),
            ("ppt/slides/slide1.xml", "<p:sld/>"),
            ("ppt/slides/slide2.xml", "<p:sld/>"),
            ("ppt/slides/slide4.xml", "<p:sld/>"),
        ]);
        let package = Package::open(&bytes).unwrap();
        assert_eq!(package.kind(), DocumentKind::Slideshow);
        assert_eq!(package.slide_count(), 2);

        let slides: Vec<Option<u32>> = package.content_parts().into_iter().map(|p| p.slide).collect();
        assert_eq!(slides, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_put_part_inserts_or_replaces() {
        let mut package = Package::open(&fixtures::docx(&[])).unwrap();
        let parts_before = package.list_parts().len();

        package.put_part("word/styles.xml", "<w:styles>new</w:styles>");
        package.put_part("word/header1.xml", "<w:hdr/>");
        assert_eq!(package.list_parts().len(), parts_before + 1);

        let reopened = Package::open(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(reopened.read_part_str("word/styles.xml").unwrap(), "<w:styles>new</w:styles>");
        assert_eq!(reopened.read_part_str("word/header1.xml").unwrap(), "<w:hdr/>");
    }

    #[test]
    fn test_from_file_missing() {
        let err = Package::from_file("/definitely/not/here.docx").unwrap_err();
        assert!(matches!(err, CertforgeError::TemplateNotFound(_)));
    }
}
