//! # meethub-auth
//!
//! Token verification for MeetHub. Token *issuance* belongs to the
//! platform's identity service; this crate carries the claims schema,
//! the decoder used by the realtime gateway, and an encoder for tests
//! and operational tooling.

pub mod jwt;

pub use jwt::claims::Claims;
pub use jwt::decoder::JwtDecoder;
pub use jwt::encoder::JwtEncoder;
