//! Resolution, substitution and merging of certificates.

pub mod merger;
pub mod orchestrator;
pub mod replacer;
pub mod resolver;

pub use merger::{merge, merge_bytes};
pub use orchestrator::{
    BatchOutcome, CertificateGenerator, GeneratedDocument, GenerationResult, MergedBundle, Outcome,
    RecipientState,
};
pub use replacer::{PlaceholderReplacer, Replacement};
pub use resolver::{Binding, FieldResolver, SequenceAllocator};
