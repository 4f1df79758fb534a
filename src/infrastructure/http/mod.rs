//! JSON-over-HTTP transport shared by the REST-backed integrations

mod client;

pub use client::{HttpClient, HttpClientTrait, HttpMethod, HttpResponse};

#[cfg(test)]
pub use client::mock;
