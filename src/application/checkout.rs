use crate::domain::checkout::{
    CheckoutSession, CheckoutState, CheckoutStep, ReturnUrls, SessionRequest,
    select_product_label,
};
use crate::domain::offer::OfferConfig;
use crate::domain::ports::PaymentGatewayBox;
use crate::error::{CheckoutError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

const TRANSITION_BUFFER: usize = 16;

/// What a call to [`CheckoutOrchestrator::start_checkout`] ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The customer was handed to the hosted checkout page.
    Redirected(CheckoutSession),
    /// The attempt failed and the machine is back to `Idle`.
    Failed(CheckoutError),
    /// Another attempt was already running; nothing was done.
    AlreadyInProgress,
}

/// Drives one checkout attempt at a time against the payment gateway.
///
/// The current state is published on a `watch` channel and every transition on
/// a `broadcast` channel. Only `start_checkout` changes the state.
pub struct CheckoutOrchestrator<R = StdRng> {
    gateway: PaymentGatewayBox,
    page_origin: String,
    rng: Mutex<R>,
    state: watch::Sender<CheckoutState>,
    transitions: broadcast::Sender<CheckoutState>,
}

impl CheckoutOrchestrator<StdRng> {
    /// Creates an orchestrator for a page served from `page_origin`.
    pub fn new(gateway: PaymentGatewayBox, page_origin: impl Into<String>) -> Self {
        Self::with_rng(gateway, page_origin, StdRng::from_entropy())
    }
}

impl<R: Rng + Send> CheckoutOrchestrator<R> {
    /// Same as [`CheckoutOrchestrator::new`] with a caller supplied label generator.
    pub fn with_rng(gateway: PaymentGatewayBox, page_origin: impl Into<String>, rng: R) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            gateway,
            page_origin: page_origin.into(),
            rng: Mutex::new(rng),
            state,
            transitions,
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    /// Every state entered after this call, in order.
    pub fn transitions(&self) -> broadcast::Receiver<CheckoutState> {
        self.transitions.subscribe()
    }

    /// Runs one checkout attempt for `offer`.
    ///
    /// Does nothing while another attempt is in flight. Failures never escape:
    /// the machine passes through `Failed` and settles back on `Idle`.
    pub async fn start_checkout(
        &self,
        offer: &OfferConfig,
        public_key: Option<&str>,
    ) -> CheckoutOutcome {
        // Guard and transition in one step, before the first await.
        let entered = self.state.send_if_modified(|state| {
            if state.is_busy() {
                false
            } else {
                *state = CheckoutState::Loading;
                true
            }
        });
        if !entered {
            debug!("Checkout already in progress, ignoring request");
            return CheckoutOutcome::AlreadyInProgress;
        }
        self.publish(CheckoutState::Loading);
        let attempt = AttemptGuard {
            state: &self.state,
            transitions: &self.transitions,
            armed: true,
        };

        let outcome = match self.run_attempt(offer, public_key).await {
            Ok(session) => {
                info!(session_id = %session.session_id, "Redirecting to hosted checkout");
                self.enter(CheckoutState::Redirecting);
                CheckoutOutcome::Redirected(session)
            }
            Err(error) => {
                warn!(%error, "Checkout attempt failed");
                self.enter(CheckoutState::Failed(error.clone()));
                self.enter(CheckoutState::Idle);
                CheckoutOutcome::Failed(error)
            }
        };
        attempt.disarm();
        outcome
    }

    async fn run_attempt(
        &self,
        offer: &OfferConfig,
        public_key: Option<&str>,
    ) -> Result<CheckoutSession> {
        let public_key = public_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(CheckoutError::MissingConfiguration)?;

        debug!(step = %CheckoutStep::Initialize, "Initializing payment gateway");
        self.gateway
            .initialize(public_key)
            .await
            .map_err(|source| CheckoutError::Collaborator {
                step: CheckoutStep::Initialize,
                source,
            })?;

        let label = {
            let mut rng = self.rng.lock().await;
            select_product_label(&mut *rng)
        };
        let urls = ReturnUrls::for_origin(&self.page_origin)?;
        let request = SessionRequest {
            amount: offer.price.amount(),
            currency: offer.price.currency().to_string(),
            label: label.to_string(),
            success_url: urls.success_url,
            cancel_url: urls.cancel_url,
        };

        debug!(
            step = %CheckoutStep::CreateSession,
            amount = request.amount,
            currency = %request.currency,
            label,
            "Creating checkout session"
        );
        let session_id = self
            .gateway
            .create_checkout_session(&request)
            .await
            .map_err(|source| CheckoutError::Collaborator {
                step: CheckoutStep::CreateSession,
                source,
            })?;

        debug!(step = %CheckoutStep::Redirect, %session_id, "Requesting redirect");
        self.gateway
            .redirect_to_checkout(&session_id)
            .await
            .map_err(|source| CheckoutError::Collaborator {
                step: CheckoutStep::Redirect,
                source,
            })?;

        Ok(CheckoutSession {
            session_id,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
        })
    }

    fn enter(&self, next: CheckoutState) {
        self.state.send_replace(next.clone());
        self.publish(next);
    }

    fn publish(&self, state: CheckoutState) {
        // No subscribers is fine.
        let _ = self.transitions.send(state);
    }
}

/// Puts the machine back to `Idle` if an attempt is dropped mid-flight,
/// e.g. by a timeout or an aborted task.
struct AttemptGuard<'a> {
    state: &'a watch::Sender<CheckoutState>,
    transitions: &'a broadcast::Sender<CheckoutState>,
    armed: bool,
}

impl AttemptGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Checkout attempt interrupted, resetting to idle");
            self.state.send_replace(CheckoutState::Idle);
            let _ = self.transitions.send(CheckoutState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::offer::Price;
    use crate::error::GatewayError;
    use crate::infrastructure::simulated::{GatewayCall, SimulatedGateway};

    fn offer() -> OfferConfig {
        OfferConfig::new(Price::new(9500, "usd").unwrap())
    }

    fn orchestrator(gateway: &SimulatedGateway) -> CheckoutOrchestrator {
        CheckoutOrchestrator::with_rng(
            Box::new(gateway.clone()),
            "https://site.example",
            StdRng::seed_from_u64(1),
        )
    }

    fn drain(rx: &mut broadcast::Receiver<CheckoutState>) -> Vec<CheckoutState> {
        let mut seen = Vec::new();
        while let Ok(state) = rx.try_recv() {
            seen.push(state);
        }
        seen
    }

    #[tokio::test]
    async fn test_successful_checkout() {
        let gateway = SimulatedGateway::new();
        let orchestrator = orchestrator(&gateway);
        let mut rx = orchestrator.transitions();

        let outcome = orchestrator.start_checkout(&offer(), Some("pk_test_123")).await;

        let CheckoutOutcome::Redirected(session) = outcome else {
            panic!("expected redirect, got {outcome:?}");
        };
        assert_eq!(
            session.success_url,
            "https://site.example/payment/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(orchestrator.state(), CheckoutState::Redirecting);
        assert_eq!(
            drain(&mut rx),
            vec![CheckoutState::Loading, CheckoutState::Redirecting]
        );
        assert_eq!(
            gateway.redirect_target().await,
            Some(format!("https://checkout.example.com/c/pay/{}", session.session_id))
        );
    }

    #[tokio::test]
    async fn test_missing_key_never_contacts_gateway() {
        let gateway = SimulatedGateway::new();
        let orchestrator = orchestrator(&gateway);
        let mut rx = orchestrator.transitions();

        let outcome = orchestrator.start_checkout(&offer(), None).await;

        assert_eq!(
            outcome,
            CheckoutOutcome::Failed(CheckoutError::MissingConfiguration)
        );
        assert_eq!(
            drain(&mut rx),
            vec![
                CheckoutState::Loading,
                CheckoutState::Failed(CheckoutError::MissingConfiguration),
                CheckoutState::Idle,
            ]
        );
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_blank_key_counts_as_missing() {
        let gateway = SimulatedGateway::new();
        let orchestrator = orchestrator(&gateway);

        let outcome = orchestrator.start_checkout(&offer(), Some("  ")).await;

        assert_eq!(
            outcome,
            CheckoutOutcome::Failed(CheckoutError::MissingConfiguration)
        );
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_failure_skips_redirect() {
        let gateway = SimulatedGateway::new().failing_at(CheckoutStep::CreateSession);
        let orchestrator = orchestrator(&gateway);
        let mut rx = orchestrator.transitions();

        let outcome = orchestrator.start_checkout(&offer(), Some("pk_test_123")).await;

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(CheckoutError::Collaborator {
                step: CheckoutStep::CreateSession,
                source: GatewayError::Rejected(_),
            })
        ));
        assert_eq!(orchestrator.state(), CheckoutState::Idle);
        let states = drain(&mut rx);
        assert_eq!(states.len(), 3);
        assert_eq!(states[0], CheckoutState::Loading);
        assert!(matches!(states[1], CheckoutState::Failed(_)));
        assert_eq!(states[2], CheckoutState::Idle);
        assert!(
            !gateway
                .calls()
                .await
                .iter()
                .any(|call| matches!(call, GatewayCall::Redirect { .. }))
        );
    }

    #[tokio::test]
    async fn test_can_retry_after_failure() {
        let gateway = SimulatedGateway::new();
        let orchestrator = orchestrator(&gateway);

        let first = orchestrator.start_checkout(&offer(), None).await;
        assert!(matches!(first, CheckoutOutcome::Failed(_)));

        let second = orchestrator.start_checkout(&offer(), Some("pk_test_123")).await;
        assert!(matches!(second, CheckoutOutcome::Redirected(_)));
    }

    #[tokio::test]
    async fn test_new_attempt_after_redirect() {
        let gateway = SimulatedGateway::new();
        let orchestrator = orchestrator(&gateway);

        orchestrator.start_checkout(&offer(), Some("pk_test_123")).await;
        assert_eq!(orchestrator.state(), CheckoutState::Redirecting);

        // The page may survive navigation (new tab, back-forward cache).
        let again = orchestrator.start_checkout(&offer(), Some("pk_test_123")).await;

        assert!(matches!(again, CheckoutOutcome::Redirected(_)));
        assert_eq!(gateway.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_invalid_origin_resets_to_idle() {
        let gateway = SimulatedGateway::new();
        let orchestrator = CheckoutOrchestrator::with_rng(
            Box::new(gateway.clone()),
            "not a url",
            StdRng::seed_from_u64(1),
        );

        let outcome = orchestrator.start_checkout(&offer(), Some("pk_test_123")).await;

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(CheckoutError::InvalidOrigin(_))
        ));
        assert_eq!(orchestrator.state(), CheckoutState::Idle);
        assert_eq!(gateway.session_count().await, 0);
    }
}
