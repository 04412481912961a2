use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonetaryError {
    #[error("Monetary error: {0}")]
    InvalidFormat(String),
    #[error("Monetary error: magnitude [{0}] is negative")]
    Negative(String)
}
