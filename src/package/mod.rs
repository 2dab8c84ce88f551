pub mod archive;
pub mod kind;

pub use archive::Package;
pub use kind::{ContentPart, DocumentKind};
