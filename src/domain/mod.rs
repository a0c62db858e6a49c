//! Domain types for the offer panel: the offer itself, the simulated presence
//! signal, the checkout state machine and the payment gateway port.

pub mod checkout;
pub mod offer;
pub mod ports;
pub mod presence;
