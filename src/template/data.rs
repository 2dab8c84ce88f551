use crate::error::{CertforgeError, Result};
use crate::markup::placeholder::loose_key;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Schlüssel, die auf einen Namen hindeuten, nach Priorität
const NAME_KEYS: &[&str] = &[
    "name",
    "full_name",
    "fullname",
    "recipient_name",
    "recipient",
    "employee_name",
    "first_name",
    "last_name",
    "firstname",
    "lastname",
    "given_name",
    "family_name",
    "email",
    "employee_id",
    "id",
];

/// Daten eines Empfängers in Eingabereihenfolge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientRecord {
    entries: Vec<(String, String)>,

    /// 1-basierte Position im Batch, nur für Auto-IDs
    pub sequence: Option<u64>,
}

impl RecipientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fügt ein Feld hinzu; ein vorhandener Schlüssel wird überschrieben
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_field(key, value);
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Einträge ohne interne Schlüssel (Präfix `_`)
    pub fn data_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries().filter(|(k, _)| !k.starts_with('_'))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bestimmt einen lesbaren Namen für Ergebnislisten und Dateinamen
    pub fn label(&self) -> String {
        let present = || self.data_entries().filter(|(_, v)| !v.trim().is_empty());

        // Exakte Treffer, dann Teiltreffer
        for pattern in NAME_KEYS {
            if let Some((_, v)) = present().find(|(k, _)| loose_key(k) == *pattern) {
                return v.trim().to_string();
            }
        }
        for pattern in NAME_KEYS {
            if let Some((_, v)) = present().find(|(k, _)| loose_key(k).contains(pattern)) {
                return v.trim().to_string();
            }
        }

        // Vor- und Nachname kombinieren
        let mut first = None;
        let mut last = None;
        for (k, v) in present() {
            let k = k.to_lowercase();
            if k.contains("first") {
                first = Some(v.trim());
            } else if k.contains("last") || k.contains("surname") || k.contains("family") {
                last = Some(v.trim());
            }
        }
        match (first, last) {
            (Some(f), Some(l)) => return format!("{} {}", f, l),
            (Some(name), None) | (None, Some(name)) => return name.to_string(),
            (None, None) => {}
        }

        present()
            .next()
            .map(|(_, v)| v.trim().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Baut einen Datensatz aus einem JSON-Objekt
    ///
    /// Akzeptiert auch `{"email": ..., "certificate": {...}}`; dann zählt
    /// das innere Objekt. `_index` setzt die Sequenznummer.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let object = match value.get("certificate") {
            Some(inner @ Value::Object(_)) => inner,
            _ => value,
        };
        let map = object.as_object().ok_or_else(|| {
            CertforgeError::Serialization(serde::de::Error::custom(
                "expected a JSON object per recipient",
            ))
        })?;

        let mut record = Self::new();
        for (key, value) in map {
            if key == "_index" {
                record.sequence = value.as_u64();
                continue;
            }
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => continue,
            };
            record.add_field(key.clone(), text);
        }
        Ok(record)
    }

    /// Lädt einen Datensatz aus einer JSON-Datei
    pub fn from_json_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_json_value(&value)
    }

    /// Lädt mehrere Datensätze aus einer JSON-Datei (Top-Level-Array)
    pub fn batch_from_json_file(path: &str) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        Self::batch_from_json_str(&content)
    }

    pub fn batch_from_json_str(content: &str) -> Result<Vec<Self>> {
        let value: Value = serde_json::from_str(content)?;
        let items = value.as_array().ok_or_else(|| {
            CertforgeError::Serialization(serde::de::Error::custom(
                "expected top-level JSON array in batch file",
            ))
        })?;
        items.iter().map(Self::from_json_value).collect()
    }
}

impl Serialize for RecipientRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = Map::new();
        for (k, v) in &self.entries {
            map.insert(k.clone(), Value::String(v.clone()));
        }
        if let Some(sequence) = self.sequence {
            map.insert("_index".to_string(), Value::from(sequence));
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RecipientRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json_value(&value).map_err(serde::de::Error::custom)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RecipientRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.add_field(k, v);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_insertion_order() {
        let records = RecipientRecord::batch_from_json_str(
            r#"[{"zeta": "1", "alpha": 2, "mid": null, "flag": true}]"#,
        )
        .unwrap();
        let keys: Vec<(&str, &str)> = records[0].entries().collect();
        assert_eq!(
            keys,
            vec![("zeta", "1"), ("alpha", "2"), ("mid", ""), ("flag", "true")]
        );
    }

    #[test]
    fn test_certificate_wrapper_and_index() {
        let records = RecipientRecord::batch_from_json_str(
            r#"[{"email": "ada@example.org", "certificate": {"name": "Ada", "_index": 7}}]"#,
        )
        .unwrap();
        assert_eq!(records[0].get("name"), Some("Ada"));
        assert_eq!(records[0].get("email"), None);
        assert_eq!(records[0].sequence, Some(7));
    }

    #[test]
    fn test_batch_requires_array() {
        assert!(RecipientRecord::batch_from_json_str(r#"{"name": "Ada"}"#).is_err());
    }

    #[test]
    fn test_label_priority() {
        let record: RecipientRecord = [("Email", "ada@example.org"), ("Full Name", "Ada Lovelace")]
            .into_iter()
            .collect();
        assert_eq!(record.label(), "Ada Lovelace");
    }

    #[test]
    fn test_label_contains_match() {
        let record: RecipientRecord = [("Course", "Rust"), ("Student Name", "Grace Hopper")]
            .into_iter()
            .collect();
        assert_eq!(record.label(), "Grace Hopper");
    }

    #[test]
    fn test_label_fallbacks() {
        let record: RecipientRecord = [("_secret", "x"), ("Course", "Rust")].into_iter().collect();
        assert_eq!(record.label(), "Rust");
        assert_eq!(RecipientRecord::new().label(), "Unknown");
    }

    #[test]
    fn test_serde_round_trip() {
        let record = RecipientRecord::new().with_field("name", "Ada").with_sequence(3);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"Ada","_index":3}"#);
        let back: RecipientRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
