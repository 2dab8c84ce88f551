use crate::config::SubstitutionMode;
use crate::error::{CertforgeError, Result};
use crate::generate::resolver::Binding;
use crate::markup::escape::escape_value;
use crate::markup::placeholder::loose_key;
use crate::markup::{find_placeholders, FlatText, PlaceholderMatch};
use crate::package::{DocumentKind, Package};
use crate::template::TemplateField;
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyMatch {
    Partial,
    Exact,
}

fn match_key(placeholder: &str, declared: &str) -> Option<KeyMatch> {
    if placeholder == declared {
        return Some(KeyMatch::Exact);
    }
    let (p, d) = (loose_key(placeholder), loose_key(declared));
    if p.is_empty() || d.is_empty() {
        return None;
    }
    if p == d {
        Some(KeyMatch::Exact)
    } else if p.contains(&d) || d.contains(&p) {
        Some(KeyMatch::Partial)
    } else {
        None
    }
}

/// Wählt den Wert für einen Platzhalter: exakter Name vor Teiltreffer,
/// unter Teiltreffern gewinnt die Deklarationsreihenfolge
pub fn select_binding<'b>(placeholder: &PlaceholderMatch, bindings: &'b [Binding]) -> Option<&'b Binding> {
    let mut partial = None;
    for binding in bindings {
        match match_key(&placeholder.key, &binding.key) {
            Some(KeyMatch::Exact) => return Some(binding),
            Some(KeyMatch::Partial) if partial.is_none() => partial = Some(binding),
            _ => {}
        }
    }
    partial
}

/// Wählt das deklarierte Feld für einen Platzhalter, nach denselben Regeln
pub fn select_field<'f>(placeholder: &PlaceholderMatch, declared: &'f [TemplateField]) -> Option<&'f TemplateField> {
    let mut partial = None;
    for field in declared {
        match match_key(&placeholder.key, &field.key) {
            Some(KeyMatch::Exact) => return Some(field),
            Some(KeyMatch::Partial) if partial.is_none() => partial = Some(field),
            _ => {}
        }
    }
    partial
}

/// Ergebnis für einen XML-Teil
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub markup: String,
    pub replaced: usize,
    /// Platzhalter ohne Wert, bleiben wörtlich stehen
    pub unmatched: Vec<String>,
}

/// Ersetzt Platzhalter direkt im Markup
///
/// Der gesamte Bereich vom ersten `{` bis zum letzten `}` wird ersetzt,
/// inklusive aller Tags dazwischen. Der Lauf mit der öffnenden Klammer
/// behält seine Formatierung.
pub struct PlaceholderReplacer<'a> {
    kind: DocumentKind,
    mode: SubstitutionMode,
    declared: &'a [TemplateField],
}

impl<'a> PlaceholderReplacer<'a> {
    pub fn new(kind: DocumentKind, declared: &'a [TemplateField]) -> Self {
        Self {
            kind,
            mode: SubstitutionMode::BestEffort,
            declared,
        }
    }

    pub fn with_mode(mut self, mode: SubstitutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn replace_all(&self, part: &str, markup: &str, bindings: &[Binding]) -> Result<Replacement> {
        let flat = FlatText::from_markup(part, markup)?;
        let placeholders = find_placeholders(flat.text());

        let mut output = String::with_capacity(markup.len());
        let mut cursor = 0;
        let mut replaced = 0;
        let mut unmatched = Vec::new();

        for placeholder in &placeholders {
            let Some(binding) = self.binding_for(placeholder, bindings)? else {
                warn!("✗ No value for '{}' in {}", placeholder.literal, part);
                unmatched.push(placeholder.name.clone());
                continue;
            };

            let Some(span) = flat.source_range(placeholder.range.clone()) else {
                return Err(CertforgeError::parse(
                    part,
                    format!("cannot map '{}' back to markup", placeholder.literal),
                ));
            };

            debug!("✓ Replacing '{}' with '{}'", placeholder.literal, binding.value);
            output.push_str(&markup[cursor..span.start]);
            output.push_str(&escape_value(&binding.value, self.kind));
            cursor = span.end;
            replaced += 1;
        }
        output.push_str(&markup[cursor..]);

        Ok(Replacement {
            markup: output,
            replaced,
            unmatched,
        })
    }

    /// Füllt alle Text-Teile eines Pakets; liefert die Anzahl Ersetzungen
    pub fn fill_package(&self, package: &mut Package, bindings: &[Binding]) -> Result<usize> {
        let mut total = 0;

        for part in package.content_parts() {
            let result = self.replace_all(&part.name, package.read_part_str(&part.name)?, bindings)?;
            if result.replaced > 0 {
                package.write_part(&part.name, result.markup)?;
                total += result.replaced;
            }
        }

        info!("Replaced {} placeholder(s)", total);
        Ok(total)
    }

    /// Wert für einen Platzhalter
    ///
    /// Zuerst wird das deklarierte Feld bestimmt; hat es keinen Wert, bleibt
    /// der Platzhalter stehen. Nur ohne passendes Feld wird direkt unter den
    /// Werten gesucht (bzw. im Strict-Modus abgelehnt).
    fn binding_for<'b>(&self, placeholder: &PlaceholderMatch, bindings: &'b [Binding]) -> Result<Option<&'b Binding>> {
        if let Some(field) = select_field(placeholder, self.declared) {
            return Ok(bindings.iter().find(|b| b.key == field.key));
        }
        if self.mode == SubstitutionMode::Strict {
            return Err(CertforgeError::UnmatchedPlaceholder(placeholder.name.clone()));
        }
        Ok(select_binding(placeholder, bindings))
    }
}
