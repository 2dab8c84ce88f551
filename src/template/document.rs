use crate::error::{CertforgeError, Result};
use crate::package::{DocumentKind, Package};
use crate::template::field::TemplateField;
use crate::template::scanner;
use log::info;
use std::path::Path;

/// Ein hochgeladenes Template mit seinen Feldern
///
/// Generatoren leihen sich das Template unveränderlich; ein erneuter Scan
/// braucht `&mut self` und kann deshalb nicht parallel zu einer laufenden
/// Generierung passieren.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    name: String,
    kind: DocumentKind,
    bytes: Vec<u8>,
    fields: Vec<TemplateField>,
}

impl TemplateDocument {
    /// Öffnet ein Template aus Bytes und scannt seine Felder
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let package = Package::open(&bytes)?;
        let fields = scanner::scan_package(&package)?;
        let name = name.into();
        info!("Template '{}' ({}) has {} field(s)", name, package.kind(), fields.len());

        Ok(Self {
            name,
            kind: package.kind(),
            bytes,
            fields,
        })
    }

    /// Öffnet ein Template von der Festplatte
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CertforgeError::TemplateNotFound(path.display().to_string()));
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string());

        let bytes = std::fs::read(path)?;
        Self::from_bytes(name, bytes)
    }

    /// Übernimmt früher gespeicherte Felddefinitionen statt der gescannten
    pub fn with_fields(mut self, fields: Vec<TemplateField>) -> Self {
        self.fields = fields;
        self
    }

    /// Scannt erneut und ersetzt die Felder vollständig
    ///
    /// Einstellungen (`required`, `default_value`) bleiben für Felder mit
    /// gleichem Schlüssel erhalten.
    pub fn rescan(&mut self) -> Result<&[TemplateField]> {
        let package = self.package()?;
        let mut fields = scanner::scan_package(&package)?;

        for field in &mut fields {
            if let Some(old) = self.fields.iter().find(|f| f.key == field.key) {
                field.required = old.required;
                field.default_value = old.default_value.clone();
            }
        }

        self.fields = fields;
        Ok(&self.fields)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn fields(&self) -> &[TemplateField] {
        &self.fields
    }

    pub fn field_mut(&mut self, key: &str) -> Option<&mut TemplateField> {
        let key = crate::markup::placeholder::normalize_key(key);
        self.fields.iter_mut().find(|f| f.key == key)
    }

    /// Öffnet eine frische Kopie des Pakets
    pub fn package(&self) -> Result<Package> {
        Package::open(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::io::Write;

    fn template() -> TemplateDocument {
        let bytes = fixtures::docx(&[fixtures::paragraph(&["{{Name}} / {{Course}}"])]);
        TemplateDocument::from_bytes("award", bytes).unwrap()
    }

    #[test]
    fn test_from_bytes_scans() {
        let doc = template();
        assert_eq!(doc.kind(), DocumentKind::Word);
        assert_eq!(doc.fields().len(), 2);
        assert_eq!(doc.name(), "award");
    }

    #[test]
    fn test_rescan_keeps_settings() {
        let mut doc = template();
        doc.field_mut("COURSE").unwrap().required = false;
        doc.field_mut("name").unwrap().default_value = Some("Anonymous".to_string());

        let fields = doc.rescan().unwrap();
        assert!(!fields[1].required);
        assert_eq!(fields[0].default_value.as_deref(), Some("Anonymous"));
    }

    #[test]
    fn test_with_fields_replaces_definitions() {
        let doc = template().with_fields(vec![TemplateField::new("Other", "{{Other}}")]);
        assert_eq!(doc.fields().len(), 1);
        assert_eq!(doc.fields()[0].key, "other");
    }

    #[test]
    fn test_open_from_file() {
        let mut file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        file.write_all(&fixtures::docx(&[fixtures::paragraph(&["{{Name}}"])]))
            .unwrap();

        let doc = TemplateDocument::open(file.path()).unwrap();
        assert_eq!(doc.fields()[0].name, "Name");
    }

    #[test]
    fn test_open_missing_file() {
        let err = TemplateDocument::open("/no/such/template.docx").unwrap_err();
        assert!(matches!(err, CertforgeError::TemplateNotFound(_)));
    }

    #[test]
    fn test_invalid_bytes() {
        let err = TemplateDocument::from_bytes("x", b"nope".to_vec()).unwrap_err();
        assert!(matches!(err, CertforgeError::Format(_)));
    }
}
