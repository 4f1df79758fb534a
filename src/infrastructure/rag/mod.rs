//! Question answering over retrieved context

mod service;

pub use service::{build_prompt, format_context, RagService};
