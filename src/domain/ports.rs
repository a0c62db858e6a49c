use super::checkout::SessionRequest;
use crate::error::GatewayError;
use async_trait::async_trait;

/// The hosted payment processor. Calls are made strictly in declaration order;
/// an error from any of them aborts the attempt.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, public_key: &str) -> Result<(), GatewayError>;
    /// Returns the id of the newly created session.
    async fn create_checkout_session(&self, request: &SessionRequest)
    -> Result<String, GatewayError>;
    /// On success the customer has been handed over to the hosted checkout page.
    async fn redirect_to_checkout(&self, session_id: &str) -> Result<(), GatewayError>;
}

pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
