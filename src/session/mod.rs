//! Session subsystem: signed, time-bound session tokens.

pub mod claims;
pub mod service;

pub use claims::{Role, SessionData, SessionIdentity, UnknownRole};
pub use service::SessionService;
