//! Cookie subsystem.
//!
//! # Data Flow
//! ```text
//! Request `Cookie` headers → jar.rs (parse, decode) → services read values
//! Services → service.rs (purpose defaults) → options.rs (serialize)
//!          → appended as one `Set-Cookie` line each on the response
//! ```

pub mod jar;
pub mod options;
pub mod service;

pub use jar::CookieJar;
pub use options::{serialize_cookie, CookieOptions, SameSite};
pub use service::{
    CookieService, CONSENT_COOKIE, CSRF_COOKIE, LEGACY_SESSION_COOKIE, ROLE_COOKIE,
    SESSION_COOKIE, TENANT_COOKIE,
};
