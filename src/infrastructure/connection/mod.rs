//! Connection registry, credential cipher and connection stores

mod cipher;
#[cfg(test)]
mod in_memory;
mod registry;
mod repository;

pub use cipher::{AesGcmSecretCipher, MIN_KEY_LEN};
pub use registry::{ConnectionRegistry, ConnectionTestResult};
#[cfg(test)]
pub use in_memory::InMemoryConnectionRepository;
pub use repository::MongoConnectionRepository;
