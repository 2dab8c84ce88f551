use crate::config::AutoIdFormat;
use crate::error::{CertforgeError, Result};
use crate::markup::placeholder::loose_key;
use crate::template::{RecipientRecord, TemplateField};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Zähler für Auto-IDs
///
/// Gehört pro Batch dem Generator, kann aber vom Aufrufer geteilt werden,
/// damit IDs über mehrere Anfragen eindeutig bleiben.
#[derive(Debug)]
pub struct SequenceAllocator {
    next: AtomicU64,
}

impl SequenceAllocator {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Reserviert `count` aufeinanderfolgende Werte und liefert den ersten
    pub fn reserve(&self, count: u64) -> u64 {
        self.next.fetch_add(count, Ordering::SeqCst)
    }

    /// Nächster Wert, ohne ihn zu vergeben
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Aufgelöster Wert eines deklarierten Feldes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub key: String,
    pub value: String,
}

/// Sucht den Wert für einen Feldschlüssel im Datensatz
///
/// Erst exakter Treffer (ohne Groß-/Kleinschreibung, `_`/`-`/Leerzeichen
/// gleichwertig), dann der erste Eintrag, dessen Schlüssel den Feldschlüssel
/// enthält oder umgekehrt. Leere Werte zählen nicht.
pub fn lookup<'r>(key: &str, record: &'r RecipientRecord) -> Option<&'r str> {
    let wanted = loose_key(key);
    if wanted.is_empty() {
        return None;
    }

    let candidates = || {
        record
            .data_entries()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (loose_key(k), v))
            .filter(|(k, _)| !k.is_empty())
    };

    candidates()
        .find(|(k, _)| *k == wanted)
        .or_else(|| candidates().find(|(k, _)| k.contains(&wanted) || wanted.contains(k.as_str())))
        .map(|(_, v)| v)
}

pub struct FieldResolver<'a> {
    fields: &'a [TemplateField],
    auto_id: &'a AutoIdFormat,
}

impl<'a> FieldResolver<'a> {
    pub fn new(fields: &'a [TemplateField], auto_id: &'a AutoIdFormat) -> Self {
        Self { fields, auto_id }
    }

    /// Löst alle Felder in Deklarationsreihenfolge auf
    ///
    /// Reihenfolge: Datensatz, Standardwert, Auto-ID aus `sequence`.
    /// Optionale Felder ohne Wert werden ausgelassen.
    pub fn resolve(&self, record: &RecipientRecord, sequence: u64) -> Result<Vec<Binding>> {
        let mut bindings = Vec::with_capacity(self.fields.len());

        for field in self.fields {
            let value = lookup(&field.key, record)
                .map(str::to_string)
                .or_else(|| {
                    field
                        .default_value
                        .clone()
                        .filter(|v| !v.trim().is_empty())
                })
                .or_else(|| field.is_auto_id().then(|| self.auto_id.render(sequence)));

            match value {
                Some(value) => {
                    debug!("{} = '{}'", field.name, value);
                    bindings.push(Binding {
                        name: field.name.clone(),
                        key: field.key.clone(),
                        value,
                    });
                }
                None if field.required => {
                    return Err(CertforgeError::MissingRequiredField(field.name.clone()));
                }
                None => debug!("Optional field '{}' left unresolved", field.name),
            }
        }

        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn format() -> AutoIdFormat {
        AutoIdFormat::new("CERT-", 3)
    }

    #[test]
    fn test_lookup_exact_before_contains() {
        let record: RecipientRecord = [("Name of Course", "Rust"), ("NAME", "Ada")]
            .into_iter()
            .collect();
        assert_eq!(lookup("name", &record), Some("Ada"));
    }

    #[test]
    fn test_lookup_separator_insensitive() {
        let record: RecipientRecord = [("full_name", "Ada Lovelace")].into_iter().collect();
        assert_eq!(lookup("full name", &record), Some("Ada Lovelace"));
    }

    #[test]
    fn test_lookup_contains_in_insertion_order() {
        let record: RecipientRecord = [("course_title", "Rust"), ("course", "Go")]
            .into_iter()
            .collect();
        assert_eq!(lookup("title", &record), Some("Rust"));
        // Feldschlüssel enthält den Datenschlüssel
        assert_eq!(lookup("course code", &record), Some("Go"));
    }

    #[test]
    fn test_lookup_skips_internal_and_blank() {
        let record: RecipientRecord = [("_name", "hidden"), ("name", "  ")].into_iter().collect();
        assert_eq!(lookup("name", &record), None);
    }

    #[test]
    fn test_missing_required_field() {
        let fields = vec![TemplateField::new("Name", "{{Name}}")];
        let format = format();
        let resolver = FieldResolver::new(&fields, &format);

        let err = resolver.resolve(&RecipientRecord::new(), 1).unwrap_err();
        assert!(matches!(err, CertforgeError::MissingRequiredField(ref n) if n == "Name"));
    }

    #[test]
    fn test_optional_and_default() {
        let fields = vec![
            TemplateField::new("Nickname", "{{Nickname}}").optional(),
            TemplateField::new("Course", "{{Course}}").with_default("Rust 101"),
        ];
        let format = format();
        let bindings = FieldResolver::new(&fields, &format)
            .resolve(&RecipientRecord::new(), 1)
            .unwrap();

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].value, "Rust 101");
    }

    #[test]
    fn test_auto_id_from_sequence() {
        let fields = vec![TemplateField::new("Certificate No", "{{Certificate No}}")];
        let format = format();
        let resolver = FieldResolver::new(&fields, &format);

        let first = resolver.resolve(&RecipientRecord::new(), 1).unwrap();
        let second = resolver.resolve(&RecipientRecord::new(), 2).unwrap();
        assert_eq!(first[0].value, "CERT-001");
        assert_eq!(second[0].value, "CERT-002");
    }

    #[test]
    fn test_supplied_auto_id_wins() {
        let fields = vec![TemplateField::new("Certificate No", "{{Certificate No}}")];
        let format = format();
        let record: RecipientRecord = [("certificate_no", "X-9")].into_iter().collect();
        let bindings = FieldResolver::new(&fields, &format).resolve(&record, 4).unwrap();
        assert_eq!(bindings[0].value, "X-9");
    }

    #[test]
    fn test_allocator_is_atomic() {
        let allocator = Arc::new(SequenceAllocator::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || (0..100).map(|_| allocator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(allocator.peek(), 401);
    }

    #[test]
    fn test_reserve_block() {
        let allocator = SequenceAllocator::new(10);
        assert_eq!(allocator.reserve(3), 10);
        assert_eq!(allocator.next(), 13);
    }
}
