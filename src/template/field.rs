use crate::markup::placeholder::normalize_key;
use serde::{Deserialize, Serialize};

/// Semantischer Typ eines Feldes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Date,
    AutoId,
    Number,
}

impl FieldType {
    /// Rät den Typ aus dem Feldnamen
    pub fn classify(name: &str) -> Self {
        let name = name.to_lowercase();

        if name.contains("date") || name.contains("issued") {
            return FieldType::Date;
        }

        if ["id", "number", "cert"].iter().any(|kw| name.contains(kw)) {
            return FieldType::AutoId;
        }

        FieldType::Text
    }
}

/// Ein im Template gefundenes Feld
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    /// Anzeigename in Originalschreibweise
    pub name: String,

    /// Normalisierter Schlüssel, eindeutig pro Template
    pub key: String,

    /// Platzhalter wie im Dokument gefunden, z.B. `{{ Name }}`
    pub placeholder: String,

    pub field_type: FieldType,

    #[serde(default = "default_required")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    /// Folie, auf der das Feld zuerst vorkommt (nur Präsentationen)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide: Option<u32>,
}

fn default_required() -> bool {
    true
}

impl TemplateField {
    pub fn new(name: impl Into<String>, placeholder: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: normalize_key(&name),
            field_type: FieldType::classify(&name),
            placeholder: placeholder.into(),
            name,
            required: true,
            default_value: None,
            slide: None,
        }
    }

    pub fn on_slide(mut self, slide: Option<u32>) -> Self {
        self.slide = slide;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn is_auto_id(&self) -> bool {
        self.field_type == FieldType::AutoId
    }
}
