//! Application layer: the stateful pieces a hosting view drives.
//!
//! `CheckoutOrchestrator` runs the payment protocol as a guarded state machine.
//! `PresenceSession` owns the periodic presence tick and its teardown.

pub mod checkout;
pub mod presence;
