//! # certforge
//!
//! A library and CLI tool for generating certificates from DOCX and PPTX templates.

pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod markup;
pub mod package;
pub mod template;

#[cfg(test)]
mod fixtures;

// Re-exports
pub use cli::{Cli, Commands};
pub use config::{AutoIdFormat, GeneratorConfig, SubstitutionMode};
pub use error::{CertforgeError, Result};
pub use generate::{BatchOutcome, CertificateGenerator, GenerationResult, SequenceAllocator};
pub use package::{DocumentKind, Package};
pub use template::{FieldType, RecipientRecord, TemplateDocument, TemplateField};
