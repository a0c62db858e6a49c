//! Outward-facing formats: the messaging deep link handed to the view.

pub mod contact_link;
