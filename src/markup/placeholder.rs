use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Maximale Länge eines normalisierten Feldschlüssels (in Zeichen)
pub const MAX_KEY_LEN: usize = 99;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid placeholder regex"))
}

fn edge_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\{\[\(<_]+|[\}\]\)>_]+$").expect("valid edge regex"))
}

/// Ein `{{...}}`-Vorkommen im flachen Text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// Bereich im flachen Text, inklusive Klammern
    pub range: Range<usize>,
    /// Wörtlicher Platzhaltertext, z.B. `{{ Full Name }}`
    pub literal: String,
    /// Bereinigter Anzeigename, z.B. `Full Name`
    pub name: String,
    /// Normalisierter Schlüssel, z.B. `full name`
    pub key: String,
}

/// Findet alle Platzhalter mit gültigem Namen in Dokumentreihenfolge
pub fn find_placeholders(text: &str) -> Vec<PlaceholderMatch> {
    placeholder_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = clean_name(caps.get(1)?.as_str());
            let key = normalize_key(&name);
            if !is_valid_key(&key) {
                return None;
            }
            Some(PlaceholderMatch {
                range: whole.range(),
                literal: whole.as_str().to_string(),
                name,
                key,
            })
        })
        .collect()
}

/// Entfernt Leerraum sowie verirrte Klammern und Unterstriche an den Rändern
pub fn clean_name(raw: &str) -> String {
    edge_regex().replace_all(raw.trim(), "").trim().to_string()
}

/// Kleinschreibung, getrimmt, innerer Leerraum auf ein Leerzeichen reduziert
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_valid_key(key: &str) -> bool {
    let len = key.chars().count();
    (1..=MAX_KEY_LEN).contains(&len)
}

/// Vergleichsform für Datenschlüssel: `Full Name`, `full_name` und
/// `full-name` werden alle zu `full_name`
pub fn loose_key(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
