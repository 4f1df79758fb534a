//! Document text extraction seam

use std::fmt::Debug;

use crate::domain::DomainError;

/// Turns an uploaded file into plain text
pub trait TextExtractor: Send + Sync + Debug {
    /// Lowercase extensions without the dot
    fn supported_extensions(&self) -> &[&str];

    fn extract(&self, extension: &str, bytes: &[u8]) -> Result<String, DomainError>;

    fn supports(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == extension)
    }
}
