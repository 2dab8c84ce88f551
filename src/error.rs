use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertforgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid document package: {0}")]
    Format(String),

    #[error("Malformed markup in '{part}': {message}")]
    Parse { part: String, message: String },

    #[error("Part '{0}' not found in package")]
    PartNotFound(String),

    #[error("Required field '{0}' is missing")]
    MissingRequiredField(String),

    #[error("Cannot merge documents: {0}")]
    IncompatibleMerge(String),

    #[error("Placeholder '{0}' has no declared field")]
    UnmatchedPlaceholder(String),

    #[error("Template file not found: {0}")]
    TemplateNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CertforgeError {
    pub(crate) fn parse(part: &str, message: impl ToString) -> Self {
        Self::Parse {
            part: part.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CertforgeError>;
