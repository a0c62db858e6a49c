use crate::domain::checkout::{CheckoutStep, SessionRequest};
use crate::domain::ports::PaymentGateway;
use crate::error::GatewayError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub const HOSTED_CHECKOUT_BASE: &str = "https://checkout.example.com";

/// A call received by [`SimulatedGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Initialize { public_key: String },
    CreateSession(SessionRequest),
    Redirect { session_id: String },
}

#[derive(Debug, Default)]
struct GatewayLog {
    calls: Vec<GatewayCall>,
    public_key: Option<String>,
    sessions: HashMap<String, SessionRequest>,
    redirect_target: Option<String>,
}

/// An in-memory stand-in for the hosted payment processor.
///
/// Clones share the same log, so a test can hand one clone to the orchestrator
/// and inspect the calls through another. Can be told to fail at a given step.
#[derive(Clone)]
pub struct SimulatedGateway {
    log: Arc<RwLock<GatewayLog>>,
    fail_at: Option<CheckoutStep>,
    hosted_base: String,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            log: Arc::default(),
            fail_at: None,
            hosted_base: HOSTED_CHECKOUT_BASE.to_string(),
        }
    }

    /// Makes the given protocol step return an error.
    pub fn failing_at(mut self, step: CheckoutStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.log.read().await.calls.clone()
    }

    pub async fn session_count(&self) -> usize {
        self.log.read().await.sessions.len()
    }

    /// The hosted page the customer was sent to, once a redirect succeeded.
    pub async fn redirect_target(&self) -> Option<String> {
        self.log.read().await.redirect_target.clone()
    }

    fn fails_at(&self, step: CheckoutStep) -> bool {
        self.fail_at == Some(step)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn initialize(&self, public_key: &str) -> Result<(), GatewayError> {
        let mut log = self.log.write().await;
        log.calls.push(GatewayCall::Initialize {
            public_key: public_key.to_string(),
        });
        if self.fails_at(CheckoutStep::Initialize) {
            return Err(GatewayError::Unavailable(
                "payment script failed to load".to_string(),
            ));
        }
        if !public_key.starts_with("pk_") {
            return Err(GatewayError::InvalidKey(public_key.to_string()));
        }
        log.public_key = Some(public_key.to_string());
        Ok(())
    }

    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<String, GatewayError> {
        let mut log = self.log.write().await;
        log.calls.push(GatewayCall::CreateSession(request.clone()));
        if self.fails_at(CheckoutStep::CreateSession) {
            return Err(GatewayError::Rejected("session creation declined".to_string()));
        }
        if log.public_key.is_none() {
            return Err(GatewayError::Rejected("gateway not initialized".to_string()));
        }
        if request.amount == 0 {
            return Err(GatewayError::Rejected("amount must be positive".to_string()));
        }
        let session_id = format!("cs_test_{:06}", log.sessions.len() + 1);
        debug!(%session_id, label = %request.label, "Simulated session created");
        log.sessions.insert(session_id.clone(), request.clone());
        Ok(session_id)
    }

    async fn redirect_to_checkout(&self, session_id: &str) -> Result<(), GatewayError> {
        let mut log = self.log.write().await;
        log.calls.push(GatewayCall::Redirect {
            session_id: session_id.to_string(),
        });
        if self.fails_at(CheckoutStep::Redirect) {
            return Err(GatewayError::Unavailable("navigation blocked".to_string()));
        }
        if !log.sessions.contains_key(session_id) {
            return Err(GatewayError::UnknownSession(session_id.to_string()));
        }
        log.redirect_target = Some(format!("{}/c/pay/{session_id}", self.hosted_base));
        Ok(())
    }
}
