use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Fetch failed, timed out, or returned fewer bars than requested.
    /// The poll loop skips the symbol for this cycle.
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    /// Exchange returned bars that cannot be used (e.g. non-positive low).
    #[error("Malformed market data: {0}")]
    MalformedData(String),

    #[error("Delivery to {sink} failed: {reason}")]
    SinkDelivery { sink: String, reason: String },

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("Invalid command input: {0}")]
    InvalidCommand(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
