//! Text-level view of Office XML parts.

pub mod escape;
pub mod flatten;
pub mod placeholder;

pub use flatten::FlatText;
pub use placeholder::{find_placeholders, PlaceholderMatch};
