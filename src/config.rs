use crate::error::Result;
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

/// Verhalten bei Platzhaltern ohne deklariertes Feld
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionMode {
    /// Platzhalter bleiben stehen
    #[default]
    BestEffort,
    /// Der Empfänger schlägt fehl
    Strict,
}

/// Format automatisch vergebener IDs: `prefix` + Sequenz mit `width` Stellen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoIdFormat {
    pub prefix: String,
    pub width: usize,
}

impl Default for AutoIdFormat {
    fn default() -> Self {
        Self {
            prefix: format!("CERT-{}-", Local::now().year()),
            width: 5,
        }
    }
}

impl AutoIdFormat {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }

    pub fn render(&self, sequence: u64) -> String {
        format!("{}{:0width$}", self.prefix, sequence, width = self.width)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Worker-Threads für Batches, 0 = verfügbare Parallelität
    pub workers: usize,
    pub auto_id: AutoIdFormat,
    pub mode: SubstitutionMode,
    /// Erfolgreiche Batch-Dokumente zu einem Paket zusammenführen
    pub merge: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            auto_id: AutoIdFormat::default(),
            mode: SubstitutionMode::default(),
            merge: true,
        }
    }
}

impl GeneratorConfig {
    /// Lädt die Konfiguration aus einer JSON-Datei
    pub fn from_json_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Tatsächliche Anzahl Worker für `jobs` Aufgaben
    pub fn worker_count(&self, jobs: usize) -> usize {
        let wanted = if self.workers == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.workers
        };
        wanted.min(jobs).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_id_render() {
        let format = AutoIdFormat::new("CERT-2026-", 5);
        assert_eq!(format.render(1), "CERT-2026-00001");
        assert_eq!(format.render(123456), "CERT-2026-123456");
    }

    #[test]
    fn test_default_prefix_has_year() {
        let year = Local::now().year();
        assert!(AutoIdFormat::default().prefix.contains(&year.to_string()));
    }

    #[test]
    fn test_partial_json() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"mode": "strict", "auto_id": {"prefix": "ID-"}}"#).unwrap();
        assert_eq!(config.mode, SubstitutionMode::Strict);
        assert_eq!(config.auto_id.prefix, "ID-");
        assert_eq!(config.auto_id.width, 5);
        assert!(config.merge);
    }

    #[test]
    fn test_worker_count_bounds() {
        let config = GeneratorConfig {
            workers: 8,
            ..GeneratorConfig::default()
        };
        assert_eq!(config.worker_count(3), 3);
        assert_eq!(config.worker_count(0), 1);
        assert!(GeneratorConfig::default().worker_count(100) >= 1);
    }
}
