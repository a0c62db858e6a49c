#![allow(dead_code)]

use async_trait::async_trait;
use promo_panel::application::checkout::CheckoutOrchestrator;
use promo_panel::domain::checkout::SessionRequest;
use promo_panel::domain::offer::{OfferConfig, Price};
use promo_panel::domain::ports::PaymentGateway;
use promo_panel::error::GatewayError;
use promo_panel::infrastructure::simulated::SimulatedGateway;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::Notify;

pub const PUBLIC_KEY: &str = "pk_test_51Promo";
pub const ORIGIN: &str = "https://site.example";

pub fn offer() -> OfferConfig {
    OfferConfig::new(Price::new(9500, "usd").expect("valid price"))
}

pub fn orchestrator<G>(gateway: G) -> CheckoutOrchestrator
where
    G: PaymentGateway + 'static,
{
    CheckoutOrchestrator::with_rng(Box::new(gateway), ORIGIN, StdRng::seed_from_u64(17))
}

/// Wraps a [`SimulatedGateway`] and holds `initialize` until released.
#[derive(Clone)]
pub struct GatedGateway {
    pub inner: SimulatedGateway,
    pub gate: Arc<Notify>,
}

impl GatedGateway {
    pub fn new() -> Self {
        Self {
            inner: SimulatedGateway::new(),
            gate: Arc::new(Notify::new()),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl PaymentGateway for GatedGateway {
    async fn initialize(&self, public_key: &str) -> Result<(), GatewayError> {
        self.gate.notified().await;
        self.inner.initialize(public_key).await
    }

    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<String, GatewayError> {
        self.inner.create_checkout_session(request).await
    }

    async fn redirect_to_checkout(&self, session_id: &str) -> Result<(), GatewayError> {
        self.inner.redirect_to_checkout(session_id).await
    }
}
