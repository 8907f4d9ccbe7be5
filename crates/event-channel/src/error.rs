use thiserror::Error;

/// Errors that can occur when publishing or consuming events.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The broker rejected or did not acknowledge a write or read.
    #[error("Broker error: {0}")]
    Broker(String),

    /// An error reported by the Kafka client.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A message handler failed to process a message.
    #[error("Handler error: {0}")]
    Handler(String),

    /// The channel was shut down.
    #[error("Channel closed")]
    Closed,
}

/// Result type for event channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
