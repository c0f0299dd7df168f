//! Error types for rowcast

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowcastError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Meta store error: {0}")]
    Meta(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Replication client error: {0}")]
    Client(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Event channel closed")]
    ChannelClosed,

    #[error("Consumer not initialized")]
    Uninitialized,

    #[error("Server id {0} is already registered")]
    DuplicateServerId(u32),
}

pub type Result<T> = std::result::Result<T, RowcastError>;
