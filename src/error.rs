use crate::domain::checkout::CheckoutStep;
use thiserror::Error;

/// Failures reported by the external payment collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Gateway rejected public key: {0}")]
    InvalidKey(String),
    #[error("Gateway rejected request: {0}")]
    Rejected(String),
    #[error("Gateway unreachable: {0}")]
    Unavailable(String),
    #[error("Unknown checkout session: {0}")]
    UnknownSession(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Payment public key is not configured")]
    MissingConfiguration,
    #[error("Checkout failed during {step}: {source}")]
    Collaborator {
        step: CheckoutStep,
        #[source]
        source: GatewayError,
    },
    #[error("Invalid page origin: {0}")]
    InvalidOrigin(String),
}

impl CheckoutError {
    /// Text shown to the customer. Collaborator details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            CheckoutError::MissingConfiguration => {
                "Card payments are not available right now. Please contact us on Telegram."
            }
            CheckoutError::Collaborator { .. } | CheckoutError::InvalidOrigin(_) => {
                "Something went wrong starting the payment. Please try again."
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Invalid contact username: {0:?}")]
    InvalidUsername(String),
    #[error("No page origin available for the share link")]
    MissingOrigin,
    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

pub type Result<T, E = CheckoutError> = std::result::Result<T, E>;
