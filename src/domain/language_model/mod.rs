//! Answer generation

mod model;

pub use model::LanguageModel;

#[cfg(test)]
pub use model::mock;
