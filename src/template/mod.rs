pub mod data;
pub mod document;
pub mod field;
pub mod scanner;

pub use data::RecipientRecord;
pub use document::TemplateDocument;
pub use field::{FieldType, TemplateField};
pub use scanner::{scan_markup, scan_package};
