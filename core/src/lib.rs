//! Multi-treasury payout engine.
//!
//! Aggregates community-awarded value into per-recipient payouts and
//! submits them on substrate- or EVM-family chains on behalf of
//! independently configured treasuries. The engine owns orchestration,
//! aggregation, and failure classification; chain transport, signing,
//! and secret decryption are consumed through traits.
//!
//! Entry point: [`engine::PayoutEngine::run`] — one treasury per call.

pub mod aggregate;
pub mod amount;
pub mod connector;
pub mod engine;
pub mod error;
pub mod evm_payout;
pub mod progress;
pub mod record;
pub mod royalty;
pub mod secret;
pub mod store;
pub mod substrate_payout;
pub mod types;
