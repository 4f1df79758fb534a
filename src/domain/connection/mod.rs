//! Registered vector store connections

mod cipher;
mod entity;
mod repository;

pub use cipher::SecretCipher;
pub use entity::{
    validate_connection_id, Connection, ConnectionScope, ConnectionStatus, ConnectionSummary,
    StoredConnection, MAX_CONNECTION_ID_LENGTH,
};
pub use repository::ConnectionRepository;

#[cfg(test)]
pub use repository::MockConnectionRepository;
