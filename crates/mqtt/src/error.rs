use std::path::PathBuf;

/// Connection-level transport failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Missing or malformed connection options. Fatal at startup.
    #[error("Invalid MQTT configuration: {0}")]
    Config(String),

    /// A TLS certificate or key file could not be read.
    #[error("Failed to read TLS material from {path}: {source}")]
    TlsMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The broker session failed (network, protocol, refused CONNACK).
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// A request could not be queued on the client.
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// The link dropped for a reason not covered above.
    #[error("MQTT link lost: {0}")]
    Disconnected(String),

    /// `connect` was called without a registered message handler.
    #[error("No message handler registered")]
    NoHandler,

    /// `connect` was called more than once.
    #[error("Transport client already started")]
    AlreadyStarted,
}
