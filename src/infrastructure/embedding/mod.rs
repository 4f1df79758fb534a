//! Embedding transports

mod cached;
mod http;

pub use cached::CachedEmbedder;
pub use http::HttpEmbedder;
