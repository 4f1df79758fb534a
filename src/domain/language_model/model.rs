//! Language model trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Opaque text generation: prompt in, completion out
#[async_trait]
pub trait LanguageModel: Send + Sync + Debug {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError>;

    fn model_name(&self) -> &str;
}
