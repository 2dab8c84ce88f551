use crate::config::GeneratorConfig;
use crate::error::{CertforgeError, Result};
use crate::generate::merger;
use crate::generate::replacer::PlaceholderReplacer;
use crate::generate::resolver::{FieldResolver, SequenceAllocator};
use crate::package::{DocumentKind, Package};
use crate::template::{RecipientRecord, TemplateDocument};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Zustand eines Empfängers während der Generierung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientState {
    Pending,
    Resolving,
    Substituting,
    Generated,
    Failed,
}

impl RecipientState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecipientState::Generated | RecipientState::Failed)
    }
}

/// Ein erzeugtes Dokument
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
    /// Vergebene Sequenznummer für Auto-IDs
    pub sequence: u64,
    pub replaced: usize,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Generated(GeneratedDocument),
    Failed(String),
}

/// Ergebnis pro Empfänger
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Position im Batch (0-basiert)
    pub index: usize,
    pub recipient: String,
    pub outcome: Outcome,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Generated(_))
    }

    pub fn document(&self) -> Option<&GeneratedDocument> {
        match &self.outcome {
            Outcome::Generated(doc) => Some(doc),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed(message) => Some(message),
            Outcome::Generated(_) => None,
        }
    }

    pub fn state(&self) -> RecipientState {
        match self.outcome {
            Outcome::Generated(_) => RecipientState::Generated,
            Outcome::Failed(_) => RecipientState::Failed,
        }
    }
}

/// Alle erfolgreichen Dokumente eines Batches in einem Paket
#[derive(Debug, Clone)]
pub struct MergedBundle {
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
    /// Indizes der enthaltenen Empfänger, in Batch-Reihenfolge
    pub members: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub results: Vec<GenerationResult>,
    pub bundle: Option<MergedBundle>,
    /// Grund, falls die Erfolge nicht zusammengeführt werden konnten
    pub merge_error: Option<String>,
}

impl BatchOutcome {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

/// Erzeugt Zertifikate aus einem Template
///
/// Leiht das Template für die Dauer der Generierung; Felder können
/// währenddessen nicht neu gescannt werden.
pub struct CertificateGenerator<'t> {
    template: &'t TemplateDocument,
    config: GeneratorConfig,
    sequence: Arc<SequenceAllocator>,
}

impl<'t> CertificateGenerator<'t> {
    pub fn new(template: &'t TemplateDocument) -> Self {
        Self::with_config(template, GeneratorConfig::default())
    }

    pub fn with_config(template: &'t TemplateDocument, config: GeneratorConfig) -> Self {
        Self {
            template,
            config,
            sequence: Arc::new(SequenceAllocator::default()),
        }
    }

    /// Gemeinsamer Zähler, z.B. pro Template über mehrere Anfragen
    pub fn with_sequence(mut self, sequence: Arc<SequenceAllocator>) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Erzeugt ein einzelnes Zertifikat; Fehler werden direkt zurückgegeben
    pub fn generate(&self, record: &RecipientRecord) -> Result<GeneratedDocument> {
        let package = self.template.package()?;
        let sequence = record.sequence.unwrap_or_else(|| self.sequence.next());
        self.fill(&package, record, sequence)
    }

    /// Erzeugt ein Zertifikat pro Empfänger und führt die Erfolge zusammen
    ///
    /// Fehler einzelner Empfänger landen im Ergebnis; nur ein unlesbares
    /// Template bricht den ganzen Batch ab.
    pub fn generate_batch(&self, records: &[RecipientRecord]) -> Result<BatchOutcome> {
        let package = self.template.package()?;
        let sequences = self.assign_sequences(records);
        let workers = self.config.worker_count(records.len());
        info!(
            "Generating {} certificate(s) from '{}' with {} worker(s)",
            records.len(),
            self.template.name(),
            workers
        );

        let results = self.run_workers(&package, records, &sequences, workers);

        let successes: Vec<&GenerationResult> = results.iter().filter(|r| r.is_success()).collect();
        info!(
            "{} certificate(s) generated, {} failed",
            successes.len(),
            results.len() - successes.len()
        );

        let mut bundle = None;
        let mut merge_error = None;
        if self.config.merge && !successes.is_empty() {
            match self.bundle(&successes) {
                Ok(merged) => bundle = Some(merged),
                Err(e) => {
                    warn!("Merging {} certificate(s) failed: {}", successes.len(), e);
                    merge_error = Some(e.to_string());
                }
            }
        }

        Ok(BatchOutcome {
            results,
            bundle,
            merge_error,
        })
    }

    /// Sequenznummern für alle Empfänger
    ///
    /// Explizite Indizes bleiben erhalten; alle anderen bekommen in
    /// Batch-Reihenfolge Werte aus einem reservierten Block, wobei explizit
    /// vergebene Nummern übersprungen werden.
    fn assign_sequences(&self, records: &[RecipientRecord]) -> Vec<u64> {
        let taken: HashSet<u64> = records.iter().filter_map(|r| r.sequence).collect();
        let implicit = records.iter().filter(|r| r.sequence.is_none()).count() as u64;
        let start = self.sequence.reserve(implicit);
        let mut block: Range<u64> = start..start + implicit;

        records
            .iter()
            .map(|record| match record.sequence {
                Some(sequence) => sequence,
                None => loop {
                    let candidate = match block.next() {
                        Some(candidate) => candidate,
                        None => self.sequence.next(),
                    };
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                },
            })
            .collect()
    }

    fn run_workers(
        &self,
        package: &Package,
        records: &[RecipientRecord],
        sequences: &[u64],
        workers: usize,
    ) -> Vec<GenerationResult> {
        let next = AtomicUsize::new(0);

        let mut collected: Vec<GenerationResult> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(record) = records.get(index) else {
                                break;
                            };
                            done.push(self.process(package, index, record, sequences[index]));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_default())
                .collect()
        });

        collected.sort_by_key(|r| r.index);

        // Empfänger eines abgestürzten Workers als fehlgeschlagen melden
        let mut results = Vec::with_capacity(records.len());
        let mut collected = collected.into_iter().peekable();
        for (index, record) in records.iter().enumerate() {
            match collected.next_if(|r| r.index == index) {
                Some(result) => results.push(result),
                None => results.push(GenerationResult {
                    index,
                    recipient: record.label(),
                    outcome: Outcome::Failed("worker terminated unexpectedly".to_string()),
                }),
            }
        }
        results
    }

    /// Pending → Resolving → Substituting → Generated | Failed
    fn process(
        &self,
        package: &Package,
        index: usize,
        record: &RecipientRecord,
        sequence: u64,
    ) -> GenerationResult {
        let recipient = record.label();
        let outcome = match self.fill(package, record, sequence) {
            Ok(doc) => {
                debug!("[{}] {} -> {:?}", index, recipient, RecipientState::Generated);
                Outcome::Generated(doc)
            }
            Err(e) => {
                warn!("[{}] {} -> {:?}: {}", index, recipient, RecipientState::Failed, e);
                Outcome::Failed(e.to_string())
            }
        };
        GenerationResult {
            index,
            recipient,
            outcome,
        }
    }

    fn fill(&self, package: &Package, record: &RecipientRecord, sequence: u64) -> Result<GeneratedDocument> {
        let fields = self.template.fields();

        debug!("#{} {:?}", sequence, RecipientState::Resolving);
        let bindings = FieldResolver::new(fields, &self.config.auto_id).resolve(record, sequence)?;

        debug!("#{} {:?}", sequence, RecipientState::Substituting);
        let mut document = package.clone();
        let replaced = PlaceholderReplacer::new(document.kind(), fields)
            .with_mode(self.config.mode)
            .fill_package(&mut document, &bindings)?;

        Ok(GeneratedDocument {
            kind: document.kind(),
            bytes: document.to_bytes()?,
            sequence,
            replaced,
        })
    }

    /// Führt die Erfolge in Batch-Reihenfolge zusammen
    fn bundle(&self, successes: &[&GenerationResult]) -> Result<MergedBundle> {
        let packages = successes
            .iter()
            .filter_map(|r| r.document())
            .map(|doc| Package::open(&doc.bytes))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| CertforgeError::IncompatibleMerge(e.to_string()))?;

        let merged = merger::merge(&packages)?;
        Ok(MergedBundle {
            kind: merged.kind(),
            bytes: merged.to_bytes()?,
            members: successes.iter().map(|r| r.index).collect(),
        })
    }
}
