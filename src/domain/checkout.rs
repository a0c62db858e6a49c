use crate::error::CheckoutError;
use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;
use url::Url;

/// Token the payment processor replaces with the real session id on redirect.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Receipt labels. None of them reveal what the page actually sells.
pub const GENERIC_PRODUCT_LABELS: [&str; 4] = [
    "Digital Services",
    "Online Membership",
    "Premium Access",
    "Digital Subscription",
];

pub fn select_product_label<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    GENERIC_PRODUCT_LABELS
        .choose(rng)
        .copied()
        .unwrap_or(GENERIC_PRODUCT_LABELS[0])
}

/// The collaborator calls of one checkout attempt, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutStep {
    Initialize,
    CreateSession,
    Redirect,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStep::Initialize => "initialize",
            CheckoutStep::CreateSession => "create-session",
            CheckoutStep::Redirect => "redirect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    Loading,
    /// Terminal for the attempt: the browser is leaving the page.
    Redirecting,
    Failed(CheckoutError),
}

impl CheckoutState {
    /// Whether a new attempt must be refused. Only a running attempt blocks;
    /// `Redirecting` ends the previous attempt.
    pub fn is_busy(&self) -> bool {
        matches!(self, CheckoutState::Loading)
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutState::Idle => f.write_str("idle"),
            CheckoutState::Loading => f.write_str("loading"),
            CheckoutState::Redirecting => f.write_str("redirecting"),
            CheckoutState::Failed(reason) => write!(f, "failed: {}", reason.user_message()),
        }
    }
}

/// Where the processor sends the customer after paying or backing out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl ReturnUrls {
    pub fn for_origin(page_origin: &str) -> Result<Self, CheckoutError> {
        let parsed = Url::parse(page_origin.trim())
            .map_err(|e| CheckoutError::InvalidOrigin(format!("{page_origin:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CheckoutError::InvalidOrigin(format!(
                "{page_origin:?}: unsupported scheme {}",
                parsed.scheme()
            )));
        }
        let origin = parsed.origin().ascii_serialization();
        Ok(Self {
            success_url: format!("{origin}/payment/success?session_id={SESSION_ID_PLACEHOLDER}"),
            cancel_url: format!("{origin}/payment/cancel"),
        })
    }
}

/// Parameters of the `create_checkout_session` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub amount: u64,
    pub currency: String,
    pub label: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// One checkout attempt that reached the redirect step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub success_url: String,
    pub cancel_url: String,
}
