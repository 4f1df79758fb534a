//! Answer generation over HTTP

mod http;

pub use http::{answer_from_error, HttpLanguageModel, LlmSettings};
